//! Analytics configuration
//!
//! Loads component settings from TOML with this priority:
//! 1. Explicit path (e.g. `--config`), if it exists
//! 2. User override at `~/.config/plumb/analytics.toml`
//! 3. Embedded defaults (`config/analytics.toml`)
//!
//! Every section and key is optional; missing values keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::BudgetConfig;
use crate::detect::RecurringConfig;
use crate::error::{Error, Result};
use crate::forecast::ForecastConfig;
use crate::simulation::SimulationConfig;
use crate::stability::StabilityConfig;

/// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("../../../config/analytics.toml");

/// Settings for every analytics component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub recurring: RecurringConfig,
    pub forecast: ForecastConfig,
    pub stability: StabilityConfig,
    pub budget: BudgetConfig,
    pub simulation: SimulationConfig,
}

impl AnalyticsConfig {
    /// Resolve and load configuration, then validate it
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match resolve_path(override_path) {
            Some(path) => {
                debug!("Loading analytics config from {}", path.display());
                fs::read_to_string(&path)?
            }
            None => DEFAULT_CONFIG.to_string(),
        };

        parse_config(&content)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.recurring.validate()?;
        self.forecast.validate()?;
        self.stability.validate()?;
        self.budget.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

/// Default user override location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("plumb").join("analytics.toml"))
}

fn resolve_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        debug!("Config {} not found, falling back", path.display());
    }
    default_config_path().filter(|p| p.exists())
}

/// Parse and validate configuration TOML
pub fn parse_config(content: &str) -> Result<AnalyticsConfig> {
    let config: AnalyticsConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Period;
    use crate::simulation::AssetClass;
    use std::io::Write;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, AnalyticsConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let toml = r#"
[forecast]
alpha = 0.5

[budget]
variance_threshold = 10.0
"#;
        let config = parse_config(toml).unwrap();

        assert_eq!(config.forecast.alpha, 0.5);
        assert_eq!(config.forecast.beta, 0.1);
        assert_eq!(config.budget.variance_threshold, 10.0);
        assert_eq!(config.recurring, RecurringConfig::default());
    }

    #[test]
    fn test_table_arrays_replace_lists() {
        let toml = r#"
[[recurring.windows]]
period = "Monthly"
expected_days = 30.0
min_days = 28.0
max_days = 31.0

[[simulation.asset_classes]]
asset_class = "cash"
annual_mean = 0.03
annual_std_dev = 0.005
"#;
        let config = parse_config(toml).unwrap();

        assert_eq!(config.recurring.windows.len(), 1);
        assert_eq!(config.recurring.windows[0].period, Period::Monthly);
        assert_eq!(config.simulation.asset_classes.len(), 1);
        assert_eq!(config.simulation.asset_classes[0].asset_class, AssetClass::Cash);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[forecast]\nalpha = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = parse_config("[forecast\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulation]\nnum_simulations = 250").unwrap();

        let config = AnalyticsConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.simulation.num_simulations, 250);
    }

    #[test]
    fn test_unreadable_path_is_io_error() {
        // A directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();

        let err = AnalyticsConfig::load(Some(dir.path())).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
