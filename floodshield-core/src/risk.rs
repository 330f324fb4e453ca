//! Flood risk level classification
//!
//! Global invariants enforced:
//! - Thresholds are monotonic and exhaustive
//! - Every real number maps to exactly one level
//! - Level colors are fixed swatches, not interpolated

use crate::color::{Rgb, GREEN, ORANGE, RED, YELLOW};
use serde::{Deserialize, Serialize};

/// Discrete flood risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,      // <= 0.50
    Moderate, // <= 0.67
    High,     // <= 0.85
    Severe,   // > 0.85
}

impl RiskLevel {
    /// All levels in ascending order of severity
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Severe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Severe => "Severe",
        }
    }

    /// Representative swatch used for badges and legends
    pub fn color(&self) -> Rgb {
        match self {
            RiskLevel::Low => GREEN,
            RiskLevel::Moderate => YELLOW,
            RiskLevel::High => ORANGE,
            RiskLevel::Severe => RED,
        }
    }
}

/// Configurable upper bounds for the first three levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            low: 0.5,
            moderate: 0.67,
            high: 0.85,
        }
    }
}

/// A classified score: level plus its swatch color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub color: Rgb,
}

/// Classify a normalized score with default thresholds
pub fn classify(score: f64) -> RiskAssessment {
    classify_with_thresholds(score, &RiskThresholds::default())
}

/// Classify a normalized score with custom thresholds
///
/// Comparisons are inclusive upper bounds, so NaN falls through to Severe.
pub fn classify_with_thresholds(score: f64, thresholds: &RiskThresholds) -> RiskAssessment {
    let level = if score <= thresholds.low {
        RiskLevel::Low
    } else if score <= thresholds.moderate {
        RiskLevel::Moderate
    } else if score <= thresholds.high {
        RiskLevel::High
    } else {
        RiskLevel::Severe
    };

    RiskAssessment {
        level,
        color: level.color(),
    }
}
