use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file collected from a source tree, ready for summarization.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub relative_path: String,
    pub content: String,
    pub language: String,
    pub line_count: usize,
}

/// Coarse classification of a file derived from its summary text and language.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Configuration,
    Documentation,
    MixedCode,
    ClassBased,
    Functional,
    Database,
    Container,
    Script,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Configuration => "configuration",
            FileKind::Documentation => "documentation",
            FileKind::MixedCode => "mixed_code",
            FileKind::ClassBased => "class_based",
            FileKind::Functional => "functional",
            FileKind::Database => "database",
            FileKind::Container => "container",
            FileKind::Script => "script",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured summary of a single file, as persisted in the summary store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub file_path: String,
    pub language: String,
    pub line_count: usize,
    /// Full summary text (AI-generated or heuristic fallback)
    pub summary: String,
    /// One-line purpose extracted from the summary
    pub purpose: String,
    pub file_type: FileKind,
    pub complexity_score: u32,
    /// Provenance: true when the summary came from the LLM
    pub ai_generated: bool,
}

impl SummaryRecord {
    /// Stable store id derived from the file path alone, so re-indexing the
    /// same path replaces its entry instead of accumulating duplicates.
    pub fn id_for_path(path: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes())
    }

    pub fn id(&self) -> Uuid {
        Self::id_for_path(&self.file_path)
    }
}

/// Outcome of one unit of work in a summarization batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summary(String),
    Failed(String),
}

impl SummaryOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SummaryOutcome::Failed(_))
    }
}

/// A search result from the summary store.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryHit {
    pub file_path: String,
    pub summary: String,
    pub language: String,
    pub file_type: FileKind,
    pub line_count: usize,
    pub complexity_score: u32,
    pub purpose: String,
    pub score: f32,
}

/// Lifecycle of a background ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IngestStatus {
    Idle,
    Collecting,
    Summarizing { completed: usize, total: usize },
    Ready { files: usize, finished_at: DateTime<Utc> },
    Error { message: String },
}

// ─── API request/response types ──────────────────────────

/// Ingest request: a directory or a .zip archive on the local filesystem.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub path: String,
}

/// Query request
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    5
}

/// Query response
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub confidence: f32,
    /// True when the answer was produced from stored summaries without escalation
    pub used_summaries: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchToolRequest {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileContentRequest {
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub result: String,
}
