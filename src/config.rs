use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the summary collection and file catalog are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Maximum concurrent in-flight summarization requests
    pub max_concurrent_summaries: usize,
    /// Per-request timeout for a single summarization call, in seconds
    pub summary_timeout_secs: u64,
    /// Maximum file size to collect, in bytes
    pub max_file_size_bytes: u64,
    /// Base confidence threshold for answering from summaries
    pub confidence_threshold: f32,
    /// Lowered threshold applied when retrieved summaries carry structural markers
    pub structured_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for summarization and tool-augmented chat
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9100".to_string(),
            llm: LlmConfig::default(),
            max_concurrent_summaries: 8,
            summary_timeout_secs: 60,
            max_file_size_bytes: 1_048_576,
            confidence_threshold: 0.6,
            structured_threshold: 0.4,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl LlmConfig {
    /// Whether a summarization service is configured at all. Cloud providers
    /// need an API key; "none" or an empty base URL disables the service.
    pub fn summaries_enabled(&self) -> bool {
        if self.provider == "none" || self.base_url.is_empty() {
            return false;
        }
        !(self.provider == "openai" && self.api_key.is_none())
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("REPO_ASSISTANT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("REPO_ASSISTANT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(val) = std::env::var("REPO_ASSISTANT_MAX_CONCURRENT") {
            if let Ok(v) = val.parse::<usize>() {
                config.max_concurrent_summaries = v.clamp(1, 64);
            }
        }
        if let Ok(val) = std::env::var("REPO_ASSISTANT_SUMMARY_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.summary_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_ASSISTANT_MAX_FILE_SIZE_BYTES") {
            if let Ok(v) = val.parse() {
                config.max_file_size_bytes = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_ASSISTANT_CONFIDENCE_THRESHOLD") {
            if let Ok(v) = val.parse::<f32>() {
                config.confidence_threshold = v.clamp(0.0, 1.0);
            }
        }
        if let Ok(val) = std::env::var("REPO_ASSISTANT_STRUCTURED_THRESHOLD") {
            if let Ok(v) = val.parse::<f32>() {
                config.structured_threshold = v.clamp(0.0, 1.0);
            }
        }

        config
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.data_dir.join("summaries")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_ordered() {
        let config = Config::default();
        assert!(config.structured_threshold < config.confidence_threshold);
    }

    #[test]
    fn test_derived_paths() {
        let config = Config::default();
        assert!(config.summaries_dir().ends_with("summaries"));
        assert!(config.catalog_path().ends_with("catalog.json"));
    }

    #[test]
    fn test_summaries_enabled_rules() {
        let mut llm = LlmConfig::default();
        assert!(llm.summaries_enabled()); // ollama needs no key

        llm.provider = "openai".to_string();
        llm.api_key = None;
        assert!(!llm.summaries_enabled());

        llm.api_key = Some("sk-test".to_string());
        assert!(llm.summaries_enabled());

        llm.provider = "none".to_string();
        assert!(!llm.summaries_enabled());
    }
}
