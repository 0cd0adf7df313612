//! Summary generation for a single file: LLM-backed with a deterministic
//! heuristic fallback, followed by classification and scoring that run on
//! whichever text was produced.

pub mod prompts;

use anyhow::Result;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::llm::completion::{complete, ChatMessage, CompletionParams};
use crate::models::{FileKind, SourceFile, SummaryRecord};

/// Content beyond this many chars is truncated before submission so a single
/// oversized file cannot blow the prompt budget.
const MAX_ANALYSIS_CHARS: usize = 12_000;
const TRUNCATION_MARKER: &str = "\n... [content truncated for analysis]";

/// Token budget for a generated summary.
const SUMMARY_MAX_TOKENS: u32 = 1_500;
const SUMMARY_TEMPERATURE: f32 = 0.1;

/// Complexity score ceiling.
const COMPLEXITY_CAP: u32 = 25;

/// Request an AI-generated summary for a file. Errors are returned to the
/// caller (the coordinator), which converts them into per-file outcomes.
pub async fn summarize_file(
    client: &reqwest::Client,
    config: &LlmConfig,
    timeout: Duration,
    file: &SourceFile,
) -> Result<String> {
    let content = truncate_for_analysis(&file.content);
    let prompt = prompts::analysis_prompt(&file.language, file.line_count, &content);

    let messages = vec![
        ChatMessage::system(prompts::ANALYST_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ];

    let text = complete(
        client,
        config,
        messages,
        CompletionParams {
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: SUMMARY_TEMPERATURE,
            timeout,
        },
    )
    .await?;

    Ok(text.trim().to_string())
}

fn truncate_for_analysis(content: &str) -> String {
    if content.len() <= MAX_ANALYSIS_CHARS {
        return content.to_string();
    }
    let mut end = MAX_ANALYSIS_CHARS;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &content[..end], TRUNCATION_MARKER)
}

/// Deterministic heuristic summary used when no LLM is configured or a call
/// failed. Based only on local inspection of the file.
pub fn fallback_summary(file: &SourceFile) -> String {
    let mut summary = format!(
        "Basic analysis: {} file with {} lines. ",
        title_case(&file.language),
        file.line_count
    );

    match file.language.as_str() {
        "json" | "yaml" | "toml" | "ini" | "config" | "xml" => {
            summary.push_str("Configuration file - requires manual review for detailed analysis.");
        }
        "markdown" => {
            let lead: Vec<&str> = file
                .content
                .lines()
                .take(10)
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .take(3)
                .collect();
            if lead.is_empty() {
                summary.push_str("Documentation file with no extractable headline.");
            } else {
                let mut preview = lead.join(" ");
                if preview.len() > 100 {
                    let mut end = 100;
                    while !preview.is_char_boundary(end) {
                        end -= 1;
                    }
                    preview.truncate(end);
                }
                summary.push_str(&format!("Documentation starting with: {preview}..."));
            }
        }
        "python" | "javascript" | "typescript" | "java" | "rust" | "go" | "ruby" | "c"
        | "cpp" | "csharp" | "php" | "kotlin" | "scala" | "swift" => {
            summary.push_str(
                "Code file - basic structure analysis available but AI summary recommended.",
            );
        }
        _ => {
            summary.push_str("Text-based file - content analysis requires manual review.");
        }
    }

    summary
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Build the final record from whichever summary text was produced.
/// Classification, purpose extraction, and complexity scoring always run.
pub fn build_record(file: &SourceFile, summary: String, ai_generated: bool) -> SummaryRecord {
    let summary_lower = summary.to_lowercase();
    let file_type = classify(&file.language, &summary_lower);
    let purpose = extract_purpose(&summary);
    let complexity_score = complexity(file.line_count, &summary_lower);

    SummaryRecord {
        file_path: file.relative_path.clone(),
        language: file.language.clone(),
        line_count: file.line_count,
        summary,
        purpose,
        file_type,
        complexity_score,
        ai_generated,
    }
}

/// Ordered classification rule table. Language-only rules for config formats
/// and markdown take precedence; keyword rules on the summary text follow;
/// sql/docker language rules close out before the catch-all.
fn classify(language: &str, summary_lower: &str) -> FileKind {
    match language {
        "json" | "yaml" | "xml" | "toml" | "ini" | "config" => return FileKind::Configuration,
        "markdown" => return FileKind::Documentation,
        _ => {}
    }

    let has_class = summary_lower.contains("class");
    let has_function = summary_lower.contains("function");

    if has_class && has_function {
        FileKind::MixedCode
    } else if has_class {
        FileKind::ClassBased
    } else if has_function {
        FileKind::Functional
    } else if language == "sql" {
        FileKind::Database
    } else if language == "docker" {
        FileKind::Container
    } else {
        FileKind::Script
    }
}

/// One-line purpose: everything up to the first sentence terminator, or a
/// 100-char prefix when the summary has no period.
fn extract_purpose(summary: &str) -> String {
    if let Some(idx) = summary.find('.') {
        let sentence = summary[..idx].trim();
        if !sentence.is_empty() {
            return format!("{sentence}.");
        }
    }
    if summary.len() > 100 {
        let mut end = 100;
        while !summary.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &summary[..end])
    } else {
        summary.to_string()
    }
}

/// Complexity: size base plus keyword bonuses from the summary text, capped.
fn complexity(line_count: usize, summary_lower: &str) -> u32 {
    let base = (line_count as u32 / 25).min(15);

    const INDICATORS: &[(&str, u32)] = &[
        ("multiple classes", 5),
        ("inheritance", 3),
        ("design pattern", 4),
        ("algorithm", 3),
        ("database", 2),
        ("api", 2),
        ("authentication", 3),
        ("configuration", 1),
        ("complex logic", 4),
        ("state management", 3),
        ("async", 2),
        ("threading", 4),
        ("security", 2),
        ("performance", 2),
    ];

    let bonus: u32 = INDICATORS
        .iter()
        .filter(|(indicator, _)| summary_lower.contains(indicator))
        .map(|(_, score)| score)
        .sum();

    (base + bonus).min(COMPLEXITY_CAP)
}
