//! Configuration file support for FloodShield
//!
//! Loads deployment-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.floodshieldrc.json` in project root
//! 3. `floodshield.config.json` in project root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::risk::RiskThresholds;
use crate::sampler::{Calibration, DEFAULT_OVERLAY_OPACITY};
use crate::scoring::{HeatmapMode, ScoringPolicy};
use crate::weather::ForecastRequest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Open-Meteo serves at most this many forecast days
const MAX_FORECAST_DAYS: u32 = 16;

const CONFIG_FILE_NAMES: &[&str] = &[".floodshieldrc.json", "floodshield.config.json"];

/// FloodShield configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FloodShieldConfig {
    /// Rain-adjusted scoring constants
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,

    /// Custom risk level thresholds
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Rain forecast location and window
    #[serde(default)]
    pub forecast: Option<ForecastConfig>,

    /// Map overlay rendering
    #[serde(default)]
    pub overlay: Option<OverlayConfig>,

    /// Heatmap mode used when none is given on the command line
    #[serde(default)]
    pub default_mode: Option<HeatmapMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Minimum rain scale in realtime mode (default: 0.05)
    pub rain_floor: Option<f64>,
    /// Hourly rain that saturates the rain factor, in mm (default: 20.0)
    pub rain_cap_mm: Option<f64>,
}

/// Inclusive upper bounds of the Low, Moderate and High levels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Highest score still Low (default: 0.5)
    pub low: Option<f64>,
    /// Highest score still Moderate (default: 0.67)
    pub moderate: Option<f64>,
    /// Highest score still High (default: 0.85)
    pub high: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastConfig {
    /// Latitude of the rain gauge point (default: 17.406)
    pub latitude: Option<f64>,
    /// Longitude of the rain gauge point (default: 78.477)
    pub longitude: Option<f64>,
    /// Days of hourly forecast to request (default: 1)
    pub forecast_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayConfig {
    /// Opacity of painted overlay cells (default: 0.6)
    pub opacity: Option<f64>,
}

/// Resolved configuration with every default filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub calibration: Calibration,
    pub forecast: ForecastRequest,
    pub overlay_opacity: f64,
    pub default_mode: HeatmapMode,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        anyhow::bail!("{} must be within [0, 1] (got {})", name, value);
    }
    Ok(())
}

impl FloodShieldConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref s) = self.scoring {
            let defaults = ScoringPolicy::default();
            check_unit(
                "scoring.rain_floor",
                s.rain_floor.unwrap_or(defaults.rain_floor),
            )?;
            let cap = s.rain_cap_mm.unwrap_or(defaults.rain_cap_mm);
            if cap <= 0.0 || !cap.is_finite() {
                anyhow::bail!("scoring.rain_cap_mm must be positive (got {})", cap);
            }
        }

        if let Some(ref t) = self.thresholds {
            let defaults = RiskThresholds::default();
            let low = t.low.unwrap_or(defaults.low);
            let moderate = t.moderate.unwrap_or(defaults.moderate);
            let high = t.high.unwrap_or(defaults.high);

            for (name, val) in [("low", low), ("moderate", moderate), ("high", high)] {
                if val <= 0.0 || val >= 1.0 {
                    anyhow::bail!("thresholds.{} must be within (0, 1) (got {})", name, val);
                }
            }
            if low >= moderate {
                anyhow::bail!(
                    "thresholds.low ({}) must be less than thresholds.moderate ({})",
                    low,
                    moderate
                );
            }
            if moderate >= high {
                anyhow::bail!(
                    "thresholds.moderate ({}) must be less than thresholds.high ({})",
                    moderate,
                    high
                );
            }
        }

        if let Some(ref f) = self.forecast {
            if let Some(lat) = f.latitude {
                if !(-90.0..=90.0).contains(&lat) {
                    anyhow::bail!("forecast.latitude must be within [-90, 90] (got {})", lat);
                }
            }
            if let Some(lng) = f.longitude {
                if !(-180.0..=180.0).contains(&lng) {
                    anyhow::bail!(
                        "forecast.longitude must be within [-180, 180] (got {})",
                        lng
                    );
                }
            }
            if let Some(days) = f.forecast_days {
                if !(1..=MAX_FORECAST_DAYS).contains(&days) {
                    anyhow::bail!(
                        "forecast.forecast_days must be within 1..={} (got {})",
                        MAX_FORECAST_DAYS,
                        days
                    );
                }
            }
        }

        if let Some(opacity) = self.overlay.as_ref().and_then(|o| o.opacity) {
            check_unit("overlay.opacity", opacity)?;
        }

        Ok(())
    }

    /// Resolve config into its ready-to-use form
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let mut policy = ScoringPolicy::default();
        if let Some(ref s) = self.scoring {
            policy.rain_floor = s.rain_floor.unwrap_or(policy.rain_floor);
            policy.rain_cap_mm = s.rain_cap_mm.unwrap_or(policy.rain_cap_mm);
        }

        let mut thresholds = RiskThresholds::default();
        if let Some(ref t) = self.thresholds {
            thresholds.low = t.low.unwrap_or(thresholds.low);
            thresholds.moderate = t.moderate.unwrap_or(thresholds.moderate);
            thresholds.high = t.high.unwrap_or(thresholds.high);
        }

        let mut forecast = ForecastRequest::default();
        if let Some(ref f) = self.forecast {
            forecast.latitude = f.latitude.unwrap_or(forecast.latitude);
            forecast.longitude = f.longitude.unwrap_or(forecast.longitude);
            forecast.forecast_days = f.forecast_days.unwrap_or(forecast.forecast_days);
        }

        Ok(ResolvedConfig {
            calibration: Calibration { policy, thresholds },
            forecast,
            overlay_opacity: self
                .overlay
                .as_ref()
                .and_then(|o| o.opacity)
                .unwrap_or(DEFAULT_OVERLAY_OPACITY),
            default_mode: self.default_mode.unwrap_or_default(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        FloodShieldConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(FloodShieldConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<FloodShieldConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: FloodShieldConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (FloodShieldConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    if let Some(ref path) = source_path {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(json: &str) -> FloodShieldConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let resolved = ResolvedConfig::defaults().expect("default config should resolve");
        assert_eq!(resolved.calibration, Calibration::default());
        assert_eq!(resolved.forecast, ForecastRequest::default());
        assert_eq!(resolved.overlay_opacity, 0.6);
        assert_eq!(resolved.default_mode, HeatmapMode::Realtime);
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"{
            "scoring": {"rain_floor": 0.1, "rain_cap_mm": 30.0},
            "thresholds": {"low": 0.4, "moderate": 0.6, "high": 0.8},
            "forecast": {"latitude": 19.07, "longitude": 72.87, "forecast_days": 7},
            "overlay": {"opacity": 0.75},
            "default_mode": "susceptibility"
        }"#,
        );
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.calibration.policy.rain_floor, 0.1);
        assert_eq!(resolved.calibration.policy.rain_cap_mm, 30.0);
        assert_eq!(resolved.calibration.thresholds.low, 0.4);
        assert_eq!(resolved.calibration.thresholds.high, 0.8);
        assert_eq!(resolved.forecast.latitude, 19.07);
        assert_eq!(resolved.forecast.forecast_days, 7);
        assert_eq!(resolved.overlay_opacity, 0.75);
        assert_eq!(resolved.default_mode, HeatmapMode::Susceptibility);
    }

    #[test]
    fn test_partial_sections_use_defaults_for_rest() {
        let resolved = parse(r#"{"thresholds": {"high": 0.9}, "scoring": {"rain_cap_mm": 10.0}}"#)
            .resolve()
            .unwrap();
        assert_eq!(resolved.calibration.thresholds.low, 0.5);
        assert_eq!(resolved.calibration.thresholds.moderate, 0.67);
        assert_eq!(resolved.calibration.thresholds.high, 0.9);
        assert_eq!(resolved.calibration.policy.rain_floor, 0.05);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<FloodShieldConfig, _> = serde_json::from_str(r#"{"colour": "red"}"#);
        assert!(result.is_err(), "unknown fields should be rejected");

        let nested: Result<FloodShieldConfig, _> =
            serde_json::from_str(r#"{"overlay": {"alpha": 0.5}}"#);
        assert!(nested.is_err());
    }

    #[test]
    fn test_reject_unknown_mode() {
        let result: Result<FloodShieldConfig, _> =
            serde_json::from_str(r#"{"default_mode": "historic"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_unordered_thresholds() {
        let config = parse(r#"{"thresholds": {"low": 0.7, "moderate": 0.6}}"#);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_threshold_out_of_range() {
        assert!(parse(r#"{"thresholds": {"high": 1.0}}"#).validate().is_err());
        assert!(parse(r#"{"thresholds": {"low": 0.0}}"#).validate().is_err());
    }

    #[test]
    fn test_reject_bad_scoring() {
        assert!(parse(r#"{"scoring": {"rain_floor": 1.5}}"#).validate().is_err());
        assert!(parse(r#"{"scoring": {"rain_cap_mm": 0.0}}"#).validate().is_err());
    }

    #[test]
    fn test_reject_bad_forecast() {
        assert!(parse(r#"{"forecast": {"latitude": 91.0}}"#).validate().is_err());
        assert!(parse(r#"{"forecast": {"longitude": -181.0}}"#).validate().is_err());
        assert!(parse(r#"{"forecast": {"forecast_days": 0}}"#).validate().is_err());
        assert!(parse(r#"{"forecast": {"forecast_days": 17}}"#).validate().is_err());
    }

    #[test]
    fn test_reject_bad_opacity() {
        assert!(parse(r#"{"overlay": {"opacity": 1.2}}"#).validate().is_err());
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".floodshieldrc.json");
        fs::write(&config_path, r#"{"overlay": {"opacity": 0.5}}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.overlay.unwrap().opacity, Some(0.5));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".floodshieldrc.json"),
            r#"{"default_mode": "susceptibility"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("floodshield.config.json"),
            r#"{"default_mode": "realtime"}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.default_mode,
            Some(HeatmapMode::Susceptibility),
            ".floodshieldrc.json should take priority"
        );
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("floodshield.config.json"),
            r#"{"thresholds": {"low": 0.9}}"#,
        )
        .unwrap();
        assert!(discover_config(dir.path()).is_err());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"forecast": {"forecast_days": 14}}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.forecast.forecast_days, 14);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_load_and_resolve_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.overlay_opacity, DEFAULT_OVERLAY_OPACITY);
    }
}
