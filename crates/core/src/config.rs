//! Configuration management for regscout.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.regscout/config.yaml` or `REGSCOUT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Nothing here is global: the resolved `AppConfig` is passed explicitly into
//! every constructor that needs it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .regscout/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider ("ollama" or "openai")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Vector search backend settings
    pub search: SearchConfig,

    /// Fan-out, merge and sufficiency tunables
    pub retrieval: RetrievalConfig,

    /// Partition registry override; `None` means the built-in registry
    pub partitions: Option<Vec<PartitionConfig>>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

/// Vector search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    /// Qdrant REST base URL
    pub endpoint: String,

    /// Environment variable holding the Qdrant API key
    pub api_key_env: String,

    /// Embedding provider used to vectorize partition queries ("ollama", "openai", "mock")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Expected embedding dimensions
    pub embedding_dimensions: usize,

    /// Base URL of the embedding service; provider default when unset
    pub embedding_endpoint: Option<String>,

    /// HTTP timeout for backend requests
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6333".to_string(),
            api_key_env: "QDRANT_API_KEY".to_string(),
            embedding_provider: "ollama".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dimensions: 768,
            embedding_endpoint: None,
            request_timeout_secs: 30,
        }
    }
}

/// Tunables for fan-out, merge/rank and the sufficiency gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Worker capacity of the fan-out pool
    pub max_concurrency: usize,

    /// Per-partition search timeout in milliseconds
    pub per_call_timeout_ms: u64,

    /// Hits requested from each partition
    pub result_limit: usize,

    /// Hits scoring below this are dropped during merge
    pub min_score: f32,

    /// Maximum hits kept per partition during merge
    pub per_partition_quota: usize,

    /// Snippet length kept from each hit's text
    pub snippet_chars: usize,

    /// Merged hits shown by display-oriented callers
    pub display_top_n: usize,

    pub gate: GateConfig,

    pub decomposition_cache: CacheConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            per_call_timeout_ms: 10_000,
            result_limit: 5,
            min_score: 0.60,
            per_partition_quota: 2,
            snippet_chars: 200,
            display_top_n: 10,
            gate: GateConfig::default(),
            decomposition_cache: CacheConfig::default(),
        }
    }
}

/// Sufficiency gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    pub min_results: usize,
    pub min_average_score: f32,
    pub min_distinct_partitions: usize,
    /// At least one of these must contribute evidence
    pub essential_partitions: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_results: 5,
            min_average_score: 0.60,
            min_distinct_partitions: 3,
            essential_partitions: vec![
                "guidance".to_string(),
                "ecfr".to_string(),
                "gras".to_string(),
            ],
        }
    }
}

/// Decomposition cache bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            ttl_secs: 3600,
        }
    }
}

/// One partition entry in a registry override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionConfig {
    pub id: String,
    pub role: String,
    /// Short label used to bias generic queries
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Keyword shape the partition responds to best, shown in listings
    #[serde(default)]
    pub search_pattern: String,
    #[serde(default)]
    pub fallback_url: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    search: Option<SearchConfig>,
    retrieval: Option<RetrievalConfig>,
    partitions: Option<Vec<PartitionConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            search: SearchConfig::default(),
            retrieval: RetrievalConfig::default(),
            partitions: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `REGSCOUT_WORKSPACE`: Override workspace path
    /// - `REGSCOUT_CONFIG`: Path to config file
    /// - `REGSCOUT_PROVIDER`: LLM provider
    /// - `REGSCOUT_MODEL`: Model identifier
    /// - `REGSCOUT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use regscout_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], but an explicit workspace or config file
    /// (from `--workspace` / `--config`) wins over the environment and
    /// decides which YAML file is merged.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("REGSCOUT_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        match config_file {
            Some(config_file) => config.config_file = Some(config_file),
            None => {
                if let Ok(config_file) = std::env::var("REGSCOUT_CONFIG") {
                    config.config_file = Some(PathBuf::from(config_file));
                }
            }
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.regscout_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("REGSCOUT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("REGSCOUT_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("REGSCOUT_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(search) = config_file.search {
            result.search = search;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if config_file.partitions.is_some() {
            result.partitions = config_file.partitions;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .regscout directory.
    pub fn regscout_dir(&self) -> PathBuf {
        self.workspace.join(".regscout")
    }

    /// Get the provider configuration for `provider`, if configured.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint configured for the active provider, if any.
    pub fn provider_endpoint(&self) -> Option<&str> {
        match self.get_provider_config(&self.provider)? {
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
        }
    }

    /// Resolve the LLM API key for `provider`.
    ///
    /// `REGSCOUT_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { api_key_env, .. } => std::env::var(api_key_env).ok(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Resolve the search backend API key from `search.apiKeyEnv`.
    pub fn resolve_search_api_key(&self) -> Option<String> {
        std::env::var(&self.search.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    /// Validate configuration for the active provider and retrieval tunables.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        let retrieval = &self.retrieval;
        if retrieval.max_concurrency == 0 {
            return Err(AppError::Config(
                "retrieval.maxConcurrency must be at least 1".to_string(),
            ));
        }
        if retrieval.per_partition_quota == 0 {
            return Err(AppError::Config(
                "retrieval.perPartitionQuota must be at least 1".to_string(),
            ));
        }
        if retrieval.result_limit == 0 {
            return Err(AppError::Config(
                "retrieval.resultLimit must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("retrieval.minScore", retrieval.min_score),
            ("retrieval.gate.minAverageScore", retrieval.gate.min_average_score),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if let Some(ref partitions) = self.partitions {
            if partitions.is_empty() {
                return Err(AppError::Config(
                    "partitions override must list at least one partition".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Completion model for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } => model,
            Self::Ollama { model, .. } => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert!(!config.verbose);
        assert!(config.partitions.is_none());
        assert_eq!(config.retrieval.max_concurrency, 10);
        assert_eq!(config.retrieval.per_call_timeout_ms, 10_000);
        assert_eq!(config.retrieval.result_limit, 5);
        assert_eq!(config.retrieval.per_partition_quota, 2);
        assert_eq!(config.retrieval.gate.min_results, 5);
        assert_eq!(config.retrieval.gate.min_distinct_partitions, 3);
    }

    #[test]
    fn test_regscout_dir() {
        let config = AppConfig::default();
        assert!(config.regscout_dir().ends_with(".regscout"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_with_explicit_config_file() {
        let workspace = TempDir::new().unwrap();
        let path = workspace.path().join("custom.yaml");
        std::fs::write(&path, "retrieval:\n  minScore: 0.9\n").unwrap();

        let config =
            AppConfig::load_with(Some(workspace.path().to_path_buf()), Some(path.clone())).unwrap();
        assert_eq!(config.workspace, workspace.path());
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.retrieval.min_score, 0.9);
    }

    #[test]
    fn test_load_with_workspace_reads_its_config() {
        let workspace = TempDir::new().unwrap();
        let dir = workspace.path().join(".regscout");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "retrieval:\n  perPartitionQuota: 4\n").unwrap();

        let config = AppConfig::load_with(Some(workspace.path().to_path_buf()), None);
        // REGSCOUT_CONFIG in the environment would point elsewhere
        if std::env::var("REGSCOUT_CONFIG").is_err() {
            assert_eq!(config.unwrap().retrieval.per_partition_quota, 4);
        }
    }

    #[test]
    fn test_load_with_missing_workspace_is_error() {
        let workspace = TempDir::new().unwrap();
        let missing = workspace.path().join("nope");
        let err = AppConfig::load_with(Some(missing), None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://gpu-box:11434
      model: qwen2.5
search:
  endpoint: http://qdrant:6333
  embeddingProvider: mock
retrieval:
  minScore: 0.5
  perPartitionQuota: 3
  gate:
    essentialPartitions: [ecfr]
partitions:
  - id: ecfr
    role: Federal regulations
    label: 21 CFR
    fallbackUrl: https://www.ecfr.gov/current/title-21
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.model, "qwen2.5");
        assert_eq!(merged.provider_endpoint(), Some("http://gpu-box:11434"));
        assert_eq!(merged.search.endpoint, "http://qdrant:6333");
        assert_eq!(merged.search.embedding_provider, "mock");
        // unspecified keys keep their defaults
        assert_eq!(merged.search.api_key_env, "QDRANT_API_KEY");
        assert_eq!(merged.retrieval.min_score, 0.5);
        assert_eq!(merged.retrieval.per_partition_quota, 3);
        assert_eq!(merged.retrieval.result_limit, 5);
        assert_eq!(merged.retrieval.gate.essential_partitions, vec!["ecfr"]);
        assert_eq!(merged.retrieval.gate.min_results, 5);
        let partitions = merged.partitions.unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].description, "");
        assert_eq!(partitions[0].search_pattern, "");
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_quota() {
        let mut config = AppConfig::default();
        config.retrieval.per_partition_quota = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_threshold() {
        let mut config = AppConfig::default();
        config.retrieval.min_score = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.gate.min_average_score = -0.1;
        assert!(config.validate().is_err());
    }
}
