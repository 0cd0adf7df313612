use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, LlmConfig};
use crate::models::IngestStatus;
use crate::router::QueryStats;
use crate::store::SummaryStore;

/// Raw contents of every indexed file, keyed by relative path. Backs the
/// tool surface (`get_file_content`, `list_project_structure`, explain_*).
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileCatalog {
    files: BTreeMap<String, String>,
}

impl FileCatalog {
    pub fn replace(&mut self, files: impl IntoIterator<Item = (String, String)>) {
        self.files = files.into_iter().collect();
    }

    pub fn get(&self, path: &str) -> Option<&String> {
        self.files.get(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<SummaryStore>,
    pub catalog: Arc<RwLock<FileCatalog>>,
    pub http_client: reqwest::Client,
    pub llm_config: Arc<RwLock<LlmConfig>>,
    pub summary_semaphore: Arc<tokio::sync::Semaphore>,
    pub ingest_status: Arc<RwLock<IngestStatus>>,
    pub query_stats: Arc<QueryStats>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let store = SummaryStore::open_or_create(&config.summaries_dir())?;

        // Load persisted file catalog
        let catalog = if config.catalog_path().exists() {
            let data = std::fs::read_to_string(config.catalog_path())?;
            serde_json::from_str(&data).unwrap_or_default()
        } else {
            FileCatalog::default()
        };

        let llm_config = config.llm.clone();
        let max_concurrent = config.max_concurrent_summaries;

        Ok(Self {
            config,
            store: Arc::new(store),
            catalog: Arc::new(RwLock::new(catalog)),
            http_client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            llm_config: Arc::new(RwLock::new(llm_config)),
            summary_semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent)),
            ingest_status: Arc::new(RwLock::new(IngestStatus::Idle)),
            query_stats: Arc::new(QueryStats::default()),
        })
    }

    /// Persist the file catalog to disk (atomic write via temp file + rename).
    pub fn persist_catalog(&self) {
        let catalog = self.catalog.read();
        if let Ok(data) = serde_json::to_string(&*catalog) {
            let path = self.config.catalog_path();
            let tmp_path = path.with_extension("json.tmp");
            if std::fs::write(&tmp_path, &data).is_ok() {
                let _ = std::fs::rename(&tmp_path, &path);
            }
        }
    }

    pub fn set_ingest_status(&self, status: IngestStatus) {
        *self.ingest_status.write() = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_replace_and_lookup() {
        let mut catalog = FileCatalog::default();
        catalog.replace([
            ("src/main.rs".to_string(), "fn main() {}".to_string()),
            ("README.md".to_string(), "# hi".to_string()),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("README.md").unwrap(), "# hi");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_catalog_paths_sorted() {
        let mut catalog = FileCatalog::default();
        catalog.replace([
            ("b.py".to_string(), String::new()),
            ("a.py".to_string(), String::new()),
        ]);
        assert_eq!(catalog.paths(), vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_catalog_round_trips_through_json() {
        let mut catalog = FileCatalog::default();
        catalog.replace([("x.py".to_string(), "pass".to_string())]);
        let json = serde_json::to_string(&catalog).unwrap();
        let back: FileCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("x.py").unwrap(), "pass");
    }
}
