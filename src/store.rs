use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::LlmConfig;
use crate::llm::embeddings;
use crate::models::{SummaryHit, SummaryRecord};

/// Writes are chunked so a single persist never carries an unbounded batch.
const WRITE_BATCH_SIZE: usize = 100;

/// A persisted summary with its embedding. The embedding may be empty when
/// the embeddings service was unavailable at index time; such entries are
/// still reachable through keyword search.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSummary {
    id: Uuid,
    record: SummaryRecord,
    embedding: Vec<f32>,
}

/// Persistent summary collection with vector search and disk persistence.
/// One live record per file path: upserts are delete-then-insert keyed by the
/// path-derived id.
pub struct SummaryStore {
    entries: RwLock<Vec<StoredSummary>>,
    persist_path: PathBuf,
}

impl SummaryStore {
    /// Open the collection under `dir`, creating it when absent. Reuses an
    /// existing persisted collection and reports its size.
    pub fn open_or_create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let persist_path = dir.join("summaries.json");

        let entries: Vec<StoredSummary> = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read summary collection")?;
            serde_json::from_str(&data).unwrap_or_default()
        } else {
            Vec::new()
        };

        if entries.is_empty() {
            tracing::info!("Created new summary collection at {}", persist_path.display());
        } else {
            tracing::info!(
                "Using existing summary collection with {} documents",
                entries.len()
            );
        }

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
        })
    }

    /// Insert or replace records keyed by their path-derived ids.
    /// `embeddings` is parallel with `records`; a missing embedding leaves the
    /// entry keyword-searchable only.
    pub fn upsert_batch(
        &self,
        records: Vec<SummaryRecord>,
        mut embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        embeddings.resize(records.len(), Vec::new());

        let pairs: Vec<(SummaryRecord, Vec<f32>)> =
            records.into_iter().zip(embeddings).collect();

        for batch in pairs.chunks(WRITE_BATCH_SIZE) {
            {
                let mut entries = self.entries.write();
                for (record, embedding) in batch {
                    let id = record.id();
                    entries.retain(|e| e.id != id);
                    entries.push(StoredSummary {
                        id,
                        record: record.clone(),
                        embedding: embedding.clone(),
                    });
                }
            }
            self.persist()?;
        }

        Ok(())
    }

    /// Remove the given ids.
    pub fn delete(&self, ids: &[Uuid]) -> Result<()> {
        {
            let mut entries = self.entries.write();
            entries.retain(|e| !ids.contains(&e.id));
        }
        self.persist()
    }

    /// Remove every record. Self-healing: if the persisted file cannot be
    /// rewritten, it is deleted and recreated empty instead of erroring out.
    pub fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to rewrite summary collection, recreating: {e:#}");
            let _ = std::fs::remove_file(&self.persist_path);
            std::fs::write(&self.persist_path, "[]")
                .context("Failed to recreate summary collection")?;
        }
        Ok(())
    }

    /// Semantic search: embed the query and rank by cosine similarity.
    /// Falls back to keyword-overlap ranking when the embeddings service is
    /// unavailable or no entry carries an embedding.
    pub async fn search(
        &self,
        client: &reqwest::Client,
        llm: &LlmConfig,
        query: &str,
        k: usize,
    ) -> Vec<SummaryHit> {
        match embeddings::embed_single(client, llm, query).await {
            Ok(query_embedding) => {
                let hits = self.search_by_embedding(&query_embedding, k);
                if hits.is_empty() && self.count() > 0 {
                    // Entries indexed without embeddings
                    self.keyword_search(query, k)
                } else {
                    hits
                }
            }
            Err(e) => {
                tracing::warn!("Query embedding failed, using keyword search: {e:#}");
                self.keyword_search(query, k)
            }
        }
    }

    /// Rank entries against a caller-supplied query embedding.
    pub fn search_by_embedding(&self, query: &[f32], k: usize) -> Vec<SummaryHit> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &StoredSummary)> = entries
            .iter()
            .filter(|e| !e.embedding.is_empty())
            .map(|e| (cosine_similarity(query, &e.embedding), e))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, e)| hit_from(&e.record, score))
            .collect()
    }

    /// Deterministic keyword-overlap ranking over summary text and file path.
    pub fn keyword_search(&self, query: &str, k: usize) -> Vec<SummaryHit> {
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let entries = self.entries.read();

        let mut scored: Vec<(f32, &StoredSummary)> = entries
            .iter()
            .map(|e| {
                let summary_lower = e.record.summary.to_lowercase();
                let path_lower = e.record.file_path.to_lowercase();
                let mut score = 0.0f32;
                for word in &words {
                    score += summary_lower.matches(*word).count() as f32 * 2.0;
                    score += path_lower.matches(*word).count() as f32;
                }
                (score, e)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();

        if scored.is_empty() {
            // No overlap at all: return a broad selection rather than nothing
            return entries
                .iter()
                .take(k)
                .map(|e| hit_from(&e.record, 0.0))
                .collect();
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, e)| hit_from(&e.record, score))
            .collect()
    }

    /// Full dump of all records, used for statistics and re-processing.
    pub fn get_all(&self) -> Vec<SummaryRecord> {
        self.entries.read().iter().map(|e| e.record.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Atomic persist: write to a temp file, then rename over the target.
    fn persist(&self) -> Result<()> {
        let entries = self.entries.read();
        let data = serde_json::to_string(&*entries)?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &data).context("Failed to write summary collection")?;
        std::fs::rename(&tmp_path, &self.persist_path)
            .context("Failed to replace summary collection")?;
        Ok(())
    }
}

fn hit_from(record: &SummaryRecord, score: f32) -> SummaryHit {
    SummaryHit {
        file_path: record.file_path.clone(),
        summary: record.summary.clone(),
        language: record.language.clone(),
        file_type: record.file_type,
        line_count: record.line_count,
        complexity_score: record.complexity_score,
        purpose: record.purpose.clone(),
        score,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
