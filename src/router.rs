//! Confidence-gated query routing.
//!
//! Every query is scored against the summaries retrieved for it. High-scoring
//! result sets are answered directly from the summaries; low-scoring ones are
//! escalated to the tool-augmented conversation over raw file content.
//!
//! The weights and bonuses below are empirical constants carried over from
//! tuning, not derived quantities; the two routing thresholds are
//! configurable (`Config::confidence_threshold`, `structured_threshold`).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::agent;
use crate::models::{QueryResponse, SummaryHit};
use crate::state::AppState;

/// Length component: summaries at or past this many chars score full length credit.
const LENGTH_FULL_CREDIT_CHARS: usize = 1_000;
const LENGTH_WEIGHT: f32 = 0.3;

/// Structural-markers component: flat bonus when the summary carries known headers.
const STRUCTURE_BONUS: f32 = 0.4;
const STRUCTURAL_MARKERS: &[&str] = &["**", "purpose:", "methods:", "dependencies:", "use case:"];

/// Query-term-overlap component weight.
const OVERLAP_WEIGHT: f32 = 0.2;

/// Domain-keyword component: flat bonus when code-structure vocabulary appears.
const KEYWORD_BONUS: f32 = 0.3;
const CODE_KEYWORDS: &[&str] = &[
    "class",
    "function",
    "method",
    "interface",
    "api",
    "endpoint",
    "authentication",
    "database",
];

/// Boost applied when more than one summary was retrieved.
const MULTI_RESULT_BOOST: f32 = 1.2;

/// Routing markers checked on the raw (case-preserved) summary text.
const ROUTING_MARKERS: &[&str] = &["**", "Methods:", "Dependencies:", "Use Case:", "Purpose:"];

const NOT_INDEXED_MESSAGE: &str =
    "No codebase has been indexed yet. Please ingest a repository first.";

/// Running query-frequency counter, reported in statistics.
#[derive(Default)]
pub struct QueryStats {
    counts: Mutex<HashMap<String, u64>>,
}

impl QueryStats {
    pub fn record(&self, query: &str) {
        *self.counts.lock().entry(query.to_string()).or_insert(0) += 1;
    }

    /// Top-n most frequent queries, ties broken alphabetically.
    pub fn most_common(&self, n: usize) -> Vec<(String, u64)> {
        let counts = self.counts.lock();
        let mut entries: Vec<(String, u64)> =
            counts.iter().map(|(q, c)| (q.clone(), *c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}

/// Heuristic [0,1] estimate of whether the retrieved summaries suffice to
/// answer the query without deeper inspection.
pub fn confidence(query: &str, hits: &[SummaryHit]) -> f32 {
    if hits.is_empty() {
        return 0.0;
    }

    let query_lower = query.to_lowercase();
    let query_words: Vec<&str> = query_lower.split_whitespace().collect();

    let mut total = 0.0f32;
    for hit in hits {
        let summary_lower = hit.summary.to_lowercase();

        let length_score =
            (summary_lower.len() as f32 / LENGTH_FULL_CREDIT_CHARS as f32).min(1.0);

        let structure_score = if STRUCTURAL_MARKERS
            .iter()
            .any(|m| summary_lower.contains(m))
        {
            STRUCTURE_BONUS
        } else {
            0.0
        };

        let overlap_score = if query_words.is_empty() {
            0.0
        } else {
            let matching = query_words
                .iter()
                .filter(|w| summary_lower.contains(*w))
                .count();
            matching as f32 / query_words.len() as f32
        };

        let keyword_score = if CODE_KEYWORDS.iter().any(|k| summary_lower.contains(k)) {
            KEYWORD_BONUS
        } else {
            0.0
        };

        total += length_score * LENGTH_WEIGHT
            + structure_score
            + overlap_score * OVERLAP_WEIGHT
            + keyword_score;
    }

    let mut avg = total / hits.len() as f32;
    if hits.len() > 1 {
        avg *= MULTI_RESULT_BOOST;
    }
    avg.min(1.0)
}

/// Whether any retrieved summary carries the structured-format markers that
/// justify the lowered routing threshold.
pub fn has_structured_summaries(hits: &[SummaryHit]) -> bool {
    hits.iter()
        .any(|h| ROUTING_MARKERS.iter().any(|m| h.summary.contains(m)))
}

/// Route a query: answer from summaries when confidence clears the effective
/// threshold, escalate to the tool-augmented conversation otherwise.
pub async fn answer_query(state: &AppState, query: &str, max_results: usize) -> QueryResponse {
    state.query_stats.record(query);

    if state.store.count() == 0 {
        return QueryResponse {
            answer: NOT_INDEXED_MESSAGE.to_string(),
            confidence: 0.0,
            used_summaries: false,
        };
    }

    let llm = state.llm_config.read().clone();
    let hits = state
        .store
        .search(&state.http_client, &llm, query, max_results)
        .await;

    let confidence = confidence(query, &hits);
    let structured = has_structured_summaries(&hits);
    let effective_threshold = if structured {
        state.config.structured_threshold
    } else {
        state.config.confidence_threshold
    };

    tracing::info!(
        "Query confidence: {confidence:.2} (threshold: {effective_threshold:.2}, structured: {structured})"
    );

    if confidence >= effective_threshold || structured {
        tracing::info!("Answering from summaries (confidence: {confidence:.2})");
        return QueryResponse {
            answer: build_summary_answer(&hits),
            confidence,
            used_summaries: true,
        };
    }

    tracing::info!(
        "Summary confidence too low ({confidence:.2}), escalating to repository analysis"
    );
    match agent::escalate(state, query).await {
        Ok(answer) => QueryResponse {
            answer,
            confidence,
            used_summaries: false,
        },
        Err(e) => {
            tracing::error!("Escalation failed: {e:#}");
            QueryResponse {
                answer: escalation_failure_message(query),
                confidence,
                used_summaries: false,
            }
        }
    }
}

/// Fast-answer synthesis: formatted concatenation of the retrieved summary
/// fields, no further LLM call.
fn build_summary_answer(hits: &[SummaryHit]) -> String {
    let mut answer = String::from("**Summary Response**\n\n");
    for hit in hits {
        let _ = write!(
            answer,
            "**Summary:** {}\n\
             **File:** {}\n\
             **Type:** {} ({})\n\
             **Lines:** {} | **Complexity:** {}\n\
             **Purpose:** {}\n\n",
            hit.summary,
            hit.file_path,
            hit.file_type,
            hit.language,
            hit.line_count,
            hit.complexity_score,
            hit.purpose
        );
    }
    answer
}

/// User-facing explanation when escalation itself failed; never a raw error.
fn escalation_failure_message(query: &str) -> String {
    format!(
        "**Repository Analysis**\n\n\
         I couldn't produce a detailed answer for your query: '{query}'\n\n\
         **Suggestions:**\n\
         - Try rephrasing your question with specific keywords\n\
         - Ask about specific files, functions, or concepts\n\
         - Re-ingest the repository to refresh the summaries\n\n\
         **Example queries:**\n\
         - 'What does the config.yaml file configure?'\n\
         - 'Explain the main classes in this project'\n\
         - 'How does authentication work?'"
    )
}
