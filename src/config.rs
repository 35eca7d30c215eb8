use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::Timeframe;
use crate::error::{EdgeError, Result};

/// Confidence levels the interval calculators know a z-score for.
pub const SUPPORTED_CONFIDENCE_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    /// Values used when no persisted statistical config exists yet
    #[serde(default)]
    pub statistics: StatisticalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding both JSON documents
    pub data_dir: PathBuf,
    /// File name of the persisted statistical config
    #[serde(default = "default_config_file")]
    pub config_file: String,
    /// File name of the persisted pattern statistics
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

fn default_config_file() -> String {
    "statistical_config.json".to_string()
}

fn default_data_file() -> String {
    "statistical_data.json".to_string()
}

impl StorageConfig {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: dir.as_ref().to_path_buf(),
            config_file: default_config_file(),
            data_file: default_data_file(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(&self.config_file)
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::in_dir("data/statistics")
    }
}

/// Runtime toggles and parameters of the decision engine.
///
/// Persisted as its own JSON document keyed by these field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    /// Master switch for every enhanced query
    pub enabled: bool,
    pub selected_timeframe: Timeframe,
    /// Beta prior pseudo-wins
    pub bayesian_prior_alpha: f64,
    /// Beta prior pseudo-losses
    pub bayesian_prior_beta: f64,
    /// Upper bound for any Kelly fraction, in (0, 1]
    pub max_kelly_fraction: f64,
    pub use_half_kelly: bool,
    /// One of 0.90, 0.95, 0.99
    pub confidence_level: f64,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            selected_timeframe: Timeframe::H1,
            bayesian_prior_alpha: 10.0,
            bayesian_prior_beta: 10.0,
            max_kelly_fraction: 0.25,
            use_half_kelly: true,
            confidence_level: 0.95,
        }
    }
}

impl StatisticalConfig {
    /// Reject out-of-range values. The first violation found is reported.
    pub fn validate(&self) -> Result<()> {
        validate_prior(self.bayesian_prior_alpha, self.bayesian_prior_beta)?;
        validate_kelly_cap(self.max_kelly_fraction)?;
        validate_confidence_level(self.confidence_level)?;
        Ok(())
    }
}

pub(crate) fn validate_prior(alpha: f64, beta: f64) -> Result<()> {
    if !(alpha.is_finite() && alpha > 0.0) || !(beta.is_finite() && beta > 0.0) {
        return Err(EdgeError::InvalidConfig(format!(
            "bayesian prior must be positive, got alpha={alpha} beta={beta}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_kelly_cap(cap: f64) -> Result<()> {
    if !(cap > 0.0 && cap <= 1.0) {
        return Err(EdgeError::InvalidConfig(format!(
            "max_kelly_fraction must be in (0, 1], got {cap}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_confidence_level(level: f64) -> Result<()> {
    if !SUPPORTED_CONFIDENCE_LEVELS
        .iter()
        .any(|l| (l - level).abs() < 1e-9)
    {
        return Err(EdgeError::InvalidConfig(format!(
            "confidence_level must be one of 0.90, 0.95, 0.99, got {level}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("storage.data_dir", "data/statistics")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PATTERNEDGE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // PATTERNEDGE__STORAGE__DATA_DIR, PATTERNEDGE__STATISTICS__ENABLED, ...
            .add_source(
                Environment::with_prefix("PATTERNEDGE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration rooted at `data_dir` with every other value defaulted
    pub fn default_config<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            storage: StorageConfig::in_dir(data_dir),
            statistics: StatisticalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.storage.config_file.trim().is_empty() {
            errors.push("storage.config_file must not be empty".to_string());
        }
        if self.storage.data_file.trim().is_empty() {
            errors.push("storage.data_file must not be empty".to_string());
        }
        if self.storage.config_file == self.storage.data_file {
            errors.push("storage.config_file and storage.data_file must differ".to_string());
        }

        let s = &self.statistics;
        if let Err(e) = validate_prior(s.bayesian_prior_alpha, s.bayesian_prior_beta) {
            errors.push(e.to_string());
        }
        if let Err(e) = validate_kelly_cap(s.max_kelly_fraction) {
            errors.push(e.to_string());
        }
        if let Err(e) = validate_confidence_level(s.confidence_level) {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistical_defaults() {
        let cfg = StatisticalConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.selected_timeframe, Timeframe::H1);
        assert_eq!(cfg.bayesian_prior_alpha, 10.0);
        assert_eq!(cfg.bayesian_prior_beta, 10.0);
        assert_eq!(cfg.max_kelly_fraction, 0.25);
        assert!(cfg.use_half_kelly);
        assert_eq!(cfg.confidence_level, 0.95);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let cfg: StatisticalConfig =
            serde_json::from_str(r#"{"enabled":false,"selected_timeframe":"D1"}"#).unwrap();
        assert!(!cfg.enabled);
        assert_eq!(cfg.selected_timeframe, Timeframe::D1);
        assert_eq!(cfg.max_kelly_fraction, 0.25);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = StatisticalConfig::default();
        cfg.bayesian_prior_alpha = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = StatisticalConfig::default();
        cfg.max_kelly_fraction = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = StatisticalConfig::default();
        cfg.confidence_level = 0.80;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_app_config_validation_collects_errors() {
        let mut app = AppConfig::default_config("/tmp/patternedge");
        assert!(app.validate().is_ok());

        app.storage.data_file = app.storage.config_file.clone();
        app.statistics.bayesian_prior_beta = -1.0;
        let errors = app.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig::in_dir("/var/lib/pe");
        assert_eq!(
            storage.config_path(),
            PathBuf::from("/var/lib/pe/statistical_config.json")
        );
        assert_eq!(
            storage.data_path(),
            PathBuf::from("/var/lib/pe/statistical_data.json")
        );
    }
}
