use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use seat_core::ScoringWeights;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Contents of `<data dir>/config.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringWeights,
    pub session: SessionConfig,
    pub extractor: ExtractorConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Purge sessions idle for longer than this. Unset keeps them until restart.
    pub idle_timeout_secs: Option<u64>,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Remote extraction endpoint. Unset uses the keyword extractor.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` from `dir`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("invalid {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.http.bind, DEFAULT_BIND);
        assert!(config.extractor.endpoint.is_none());
        assert!(config.session.idle_timeout().is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [scoring]
            budget_weight = 40.0
            budget_tolerance = 0.2

            [session]
            idle_timeout_secs = 1800
            "#,
        )
        .unwrap();
        assert_eq!(config.scoring.budget_weight, 40.0);
        assert_eq!(config.scoring.budget_tolerance, 0.2);
        assert_eq!(
            config.scoring.view_weight,
            ScoringWeights::default().view_weight
        );
        assert_eq!(
            config.session.idle_timeout(),
            Some(Duration::from_secs(1800))
        );
        assert_eq!(config.http.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_extractor_and_http() {
        let config = Config::parse(
            r#"
            [extractor]
            endpoint = "http://localhost:7000/extract"

            [http]
            bind = "0.0.0.0:8080"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.extractor.endpoint.as_deref(),
            Some("http://localhost:7000/extract")
        );
        assert_eq!(config.extractor.timeout_secs, 10);
        assert_eq!(config.http.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_idle_timeout_disables_expiry() {
        let config = Config::parse("[session]\nidle_timeout_secs = 0\n").unwrap();
        assert!(config.session.idle_timeout().is_none());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[scoring\nbudget_weight = ").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
