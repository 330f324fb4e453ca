//! Flood score computation
//!
//! Blends a raw susceptibility sample with the live rain factor.
//!
//! Global invariants enforced:
//! - Raw values are clamped to [0, 1] before use
//! - A raw value of exactly 1 always scores 1
//! - Susceptibility mode never reads the rain factor

use crate::color::clamp_unit;
use serde::{Deserialize, Serialize};

/// Which scoring branch the map is painted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapMode {
    /// Terrain susceptibility scaled by live rainfall
    #[default]
    Realtime,
    /// Static terrain susceptibility only
    Susceptibility,
}

impl HeatmapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatmapMode::Realtime => "realtime",
            HeatmapMode::Susceptibility => "susceptibility",
        }
    }

    /// Human-readable title used by map views
    pub fn title(&self) -> &'static str {
        match self {
            HeatmapMode::Realtime => "Real-time Flood Risk",
            HeatmapMode::Susceptibility => "Flood Susceptibility",
        }
    }
}

impl std::str::FromStr for HeatmapMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "realtime" => Ok(HeatmapMode::Realtime),
            "susceptibility" => Ok(HeatmapMode::Susceptibility),
            other => anyhow::bail!(
                "unknown heatmap mode '{}' (expected realtime or susceptibility)",
                other
            ),
        }
    }
}

/// Deployment-tunable constants for rain-adjusted scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    /// Minimum rain scale applied in realtime mode
    pub rain_floor: f64,
    /// Hourly rainfall (mm) that saturates the rain factor
    pub rain_cap_mm: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            rain_floor: 0.05,
            rain_cap_mm: 20.0,
        }
    }
}

/// Compute the normalized flood score with the default policy
pub fn flood_score(raw_value: f64, rain_factor: f64, mode: HeatmapMode) -> f64 {
    flood_score_with_policy(raw_value, rain_factor, mode, &ScoringPolicy::default())
}

/// Compute the normalized flood score
///
/// Formula:
/// - susceptibility: clamp(raw)
/// - realtime:       min(clamp(raw) * max(rain_floor, rain_factor), 1)
pub fn flood_score_with_policy(
    raw_value: f64,
    rain_factor: f64,
    mode: HeatmapMode,
    policy: &ScoringPolicy,
) -> f64 {
    let p = clamp_unit(raw_value);
    if p == 1.0 {
        return 1.0;
    }

    match mode {
        HeatmapMode::Susceptibility => p,
        HeatmapMode::Realtime => {
            let rain_scale = policy.rain_floor.max(rain_factor);
            (p * rain_scale).min(1.0)
        }
    }
}
