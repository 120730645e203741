//! Application configuration for Leadscout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadscoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini (LLM collaborator) settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Linkd (profile search collaborator) settings.
    #[serde(default)]
    pub linkd: LinkdConfig,

    /// Pipeline tuning knobs.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    /// Model used for keyword/query/refinement stages.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Model used for the larger scoring and assessment payloads.
    #[serde(default = "default_gemini_scoring_model")]
    pub scoring_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            model: default_gemini_model(),
            scoring_model: default_gemini_scoring_model(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_gemini_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_gemini_scoring_model() -> String {
    "gemini-2.5-flash".into()
}

/// `[linkd]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkdConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_linkd_key_env")]
    pub api_key_env: String,

    /// Base URL of the people-search service.
    #[serde(default = "default_linkd_base_url")]
    pub base_url: String,
}

impl Default for LinkdConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_linkd_key_env(),
            base_url: default_linkd_base_url(),
        }
    }
}

fn default_linkd_key_env() -> String {
    "LINKD_API_KEY".into()
}
fn default_linkd_base_url() -> String {
    "https://search.linkd.inc".into()
}

/// `[pipeline]` section — every tunable of the discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Minimum delay between successive search dispatches, in ms.
    #[serde(default = "default_throttle_delay_ms")]
    pub throttle_delay_ms: u64,

    /// Retry budget per search query on transient failure.
    #[serde(default = "default_search_retries")]
    pub search_retries: u32,

    /// Backoff between search retries, in ms.
    #[serde(default = "default_search_backoff_ms")]
    pub search_backoff_ms: u64,

    /// Deadline for the whole search fan-in, in seconds.
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    /// Maximum results requested per search query.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Candidates per scoring batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum refinement rounds before accepting the best available result.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Final result cutoff.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Candidate sample size handed to the quality assessor.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Timeout for scoring and assessment collaborator calls, in seconds.
    /// 0 disables the timeout.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            throttle_delay_ms: default_throttle_delay_ms(),
            search_retries: default_search_retries(),
            search_backoff_ms: default_search_backoff_ms(),
            search_timeout_secs: default_search_timeout_secs(),
            search_limit: default_search_limit(),
            batch_size: default_batch_size(),
            max_rounds: default_max_rounds(),
            top_n: default_top_n(),
            sample_size: default_sample_size(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

fn default_throttle_delay_ms() -> u64 {
    1_000
}
fn default_search_retries() -> u32 {
    3
}
fn default_search_backoff_ms() -> u64 {
    1_000
}
fn default_search_timeout_secs() -> u64 {
    90
}
fn default_search_limit() -> u32 {
    10
}
fn default_batch_size() -> usize {
    20
}
fn default_max_rounds() -> u32 {
    3
}
fn default_top_n() -> usize {
    5
}
fn default_sample_size() -> usize {
    20
}
fn default_stage_timeout_secs() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum delay between successive search dispatches.
    pub throttle_delay: Duration,
    /// Retry budget per search query.
    pub search_retries: u32,
    /// Backoff between search retries.
    pub search_backoff: Duration,
    /// Deadline for the search fan-in.
    pub search_timeout: Duration,
    /// Maximum results requested per query.
    pub search_limit: u32,
    /// Candidates per scoring batch.
    pub batch_size: usize,
    /// Maximum refinement rounds.
    pub max_rounds: u32,
    /// Final result cutoff.
    pub top_n: usize,
    /// Candidate sample size for quality assessment.
    pub sample_size: usize,
    /// Timeout for scoring/assessment calls, `None` when disabled.
    pub stage_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&PipelineSettings::default())
    }
}

impl From<&PipelineSettings> for PipelineConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            throttle_delay: Duration::from_millis(settings.throttle_delay_ms),
            search_retries: settings.search_retries,
            search_backoff: Duration::from_millis(settings.search_backoff_ms),
            search_timeout: Duration::from_secs(settings.search_timeout_secs),
            search_limit: settings.search_limit,
            batch_size: settings.batch_size.max(1),
            max_rounds: settings.max_rounds.max(1),
            top_n: settings.top_n,
            sample_size: settings.sample_size,
            stage_timeout: match settings.stage_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.pipeline)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadscoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadscoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadscoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadscoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadscoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadscoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the env var named in config.
pub fn resolve_api_key(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(LeadscoutError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that both collaborator API keys are available.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    resolve_api_key(&config.gemini.api_key_env, "Gemini")?;
    resolve_api_key(&config.linkd.api_key_env, "Linkd")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("batch_size"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.max_rounds, 3);
        assert_eq!(parsed.pipeline.search_timeout_secs, 90);
        assert_eq!(parsed.linkd.base_url, "https://search.linkd.inc");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[pipeline]
max_rounds = 5
top_n = 10
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pipeline.max_rounds, 5);
        assert_eq!(config.pipeline.top_n, 10);
        // Untouched knobs keep their defaults.
        assert_eq!(config.pipeline.batch_size, 20);
        assert_eq!(config.pipeline.throttle_delay_ms, 1_000);
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.throttle_delay, Duration::from_secs(1));
        assert_eq!(pipeline.search_timeout, Duration::from_secs(90));
        assert_eq!(pipeline.batch_size, 20);
        assert_eq!(pipeline.stage_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn zero_stage_timeout_disables_it() {
        let mut settings = PipelineSettings::default();
        settings.stage_timeout_secs = 0;
        let pipeline = PipelineConfig::from(&settings);
        assert!(pipeline.stage_timeout.is_none());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.gemini.api_key_env = "LS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_keys(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
