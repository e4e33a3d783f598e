use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::module::predict::{EnumerationPolicy, MAX_PASS_COUNT};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatTrackConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub tle: TleConfig,

    #[serde(default)]
    pub prediction: PredictionConfig,
}

/// Element set sources and refresh schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TleConfig {
    /// Source URLs, concatenated in this order before parsing
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u32,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Window for a single pass search
    #[serde(default = "default_search_horizon_hours")]
    pub search_horizon_hours: u32,

    #[serde(default)]
    pub enumeration_policy: EnumerationPolicy,

    /// Upper bound for the number of enumerated passes
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_refresh_interval_minutes() -> u32 {
    360
}

fn default_cache_dir() -> String {
    "data".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_search_horizon_hours() -> u32 {
    72
}

fn default_max_passes() -> u32 {
    20
}

impl Default for SatTrackConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            tle: TleConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }
}

impl Default for TleConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            cache_dir: default_cache_dir(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            search_horizon_hours: default_search_horizon_hours(),
            enumeration_policy: EnumerationPolicy::default(),
            max_passes: default_max_passes(),
        }
    }
}

impl PredictionConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_PASS_COUNT).contains(&self.max_passes) {
            anyhow::bail!(
                "prediction.max_passes must be between 1 and {}, got {}",
                MAX_PASS_COUNT,
                self.max_passes
            );
        }
        Ok(())
    }
}

impl SatTrackConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: SatTrackConfig = toml::from_str(content)?;
        config.prediction.validate()?;
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub static CONFIG: OnceLock<SatTrackConfig> = OnceLock::new();

/// Load the configuration file once and publish it through `CONFIG`
pub fn read_config(path: &str) -> anyhow::Result<&'static SatTrackConfig> {
    let config = SatTrackConfig::from_file(path)?;
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = SatTrackConfig::from_toml("").unwrap();

        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.log_level, "info");
        assert!(config.tle.urls.is_empty());
        assert_eq!(config.tle.refresh_interval_minutes, 360);
        assert_eq!(config.tle.cache_dir, "data");
        assert_eq!(config.prediction.search_horizon_hours, 72);
        assert_eq!(config.prediction.enumeration_policy, EnumerationPolicy::Strict);
        assert_eq!(config.prediction.max_passes, 20);
    }

    #[test]
    fn test_full_file() {
        let content = r#"
            host = "127.0.0.1"
            port = 9000
            log_level = "debug"

            [tle]
            urls = [
                "https://celestrak.org/NORAD/elements/gp.php?GROUP=amateur&FORMAT=tle",
                "https://celestrak.org/NORAD/elements/gp.php?GROUP=weather&FORMAT=tle",
            ]
            refresh_interval_minutes = 120

            [prediction]
            enumeration_policy = "lenient"
            max_passes = 5
        "#;
        let config = SatTrackConfig::from_toml(content).unwrap();

        assert_eq!(config.server_address(), "127.0.0.1:9000");
        assert_eq!(config.tle.urls.len(), 2);
        assert_eq!(config.tle.refresh_interval_minutes, 120);
        assert_eq!(config.tle.request_timeout_seconds, 30);
        assert_eq!(config.prediction.enumeration_policy, EnumerationPolicy::Lenient);
        assert_eq!(config.prediction.max_passes, 5);
        assert_eq!(config.prediction.search_horizon_hours, 72);
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("sattrack_missing_config.toml");
        let err = SatTrackConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("sattrack_missing_config.toml"));
    }

    #[test]
    fn test_max_passes_is_bounded() {
        assert!(SatTrackConfig::from_toml("[prediction]\nmax_passes = 20\n").is_ok());

        let err = SatTrackConfig::from_toml("[prediction]\nmax_passes = 21\n").unwrap_err();
        assert!(err.to_string().contains("max_passes"));
        assert!(SatTrackConfig::from_toml("[prediction]\nmax_passes = 0\n").is_err());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let content = "[prediction]\nenumeration_policy = \"sometimes\"\n";
        assert!(SatTrackConfig::from_toml(content).is_err());
    }
}
