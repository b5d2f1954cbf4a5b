use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main startsim configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Market niche the simulated startup works in
    pub niche: String,
    pub paths: PathsConfig,
    pub model: ModelConfig,
    pub simulation: SimulationConfig,
    pub observability: ObservabilityConfig,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Snapshot file holding the shared state
    pub state: PathBuf,
    /// Directory for turn event logs
    pub events: PathBuf,
}

/// Language-model endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Kickoff prompt used when none is given
    pub prompt: String,
    pub max_rounds: u32,
}

/// Turn event sink type
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObservabilitySink {
    /// Write to JSONL file under paths.events
    File,
    /// Print to stdout
    Stdout,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub enabled: bool,
    pub sinks: Vec<ObservabilitySink>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            niche: "AI-powered personal finance assistant".to_string(),
            paths: PathsConfig::default(),
            model: ModelConfig::default(),
            simulation: SimulationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let dir = Config::startsim_dir();

        Self {
            state: dir.join("sim_state.json"),
            events: dir.join("events"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://models.inference.ai.azure.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "GITHUB_TOKEN".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            prompt: "We need to build an AI-powered personal finance assistant.".to_string(),
            max_rounds: 3,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sinks: vec![ObservabilitySink::File],
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("STARTSIM_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from STARTSIM_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("STARTSIM_DIR") {
            let path = PathBuf::from(dir).join("startsim.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from STARTSIM_DIR: {}", e);
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("startsim").join("startsim.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./startsim.yaml (for development)
        let local_config = PathBuf::from("startsim.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Get the startsim directory (config, .env, state and events live here)
    pub fn startsim_dir() -> PathBuf {
        std::env::var("STARTSIM_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("startsim"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    /// Resolved snapshot path
    pub fn state_path(&self) -> PathBuf {
        Self::expand_path(&self.paths.state)
    }

    /// Resolved event log directory
    pub fn events_path(&self) -> PathBuf {
        Self::expand_path(&self.paths.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.simulation.max_rounds, 3);
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.paths.state.ends_with("sim_state.json"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
niche: pet insurance
model:
  model: gpt-4o
simulation:
  max_rounds: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.niche, "pet insurance");
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.api_key_env, "GITHUB_TOKEN");
        assert_eq!(config.simulation.max_rounds, 5);
        assert!(config.simulation.prompt.contains("personal finance"));
        assert!(config.observability.enabled);
    }

    #[test]
    fn test_sinks_parse() {
        let yaml = "observability:\n  sinks: [file, stdout]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.observability.sinks,
            vec![ObservabilitySink::File, ObservabilitySink::Stdout]
        );
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/bin");
        let expanded = Config::expand_path(&path);
        assert_eq!(expanded, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = Config::expand_path(&path);
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("test"));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Off.as_filter(), "off");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.simulation.max_rounds, config.simulation.max_rounds);
        assert_eq!(parsed.model.endpoint, config.model.endpoint);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/startsim.yaml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
