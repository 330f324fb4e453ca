//! Live rain signal
//!
//! Reduces the current day's hourly rain readings to the normalized factor
//! used by realtime scoring.

use crate::scoring::ScoringPolicy;
use serde::Serialize;

/// Snapshot of current rainfall
///
/// Replaced wholesale on update; readers never observe a partial value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RainSignal {
    /// Peak hourly rain normalized against the cap, in [0, 1]
    pub rain_factor: f64,
    /// Sum of hourly readings (mm)
    pub rain_24h_mm: f64,
    /// Largest hourly reading (mm)
    pub rain_peak_mm: f64,
}

impl RainSignal {
    /// Derive the signal from hourly readings with the default 20 mm/hr cap
    pub fn from_hourly(hourly_mm: &[f64]) -> Self {
        Self::from_hourly_with_policy(hourly_mm, &ScoringPolicy::default())
    }

    /// Derive the signal from hourly readings
    ///
    /// Negative and non-finite readings are treated as 0 mm.
    pub fn from_hourly_with_policy(hourly_mm: &[f64], policy: &ScoringPolicy) -> Self {
        let readings = hourly_mm
            .iter()
            .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 });

        let (total, peak) = readings.fold((0.0_f64, 0.0_f64), |(sum, max), v| (sum + v, max.max(v)));

        RainSignal {
            rain_factor: rain_factor(peak, policy.rain_cap_mm),
            rain_24h_mm: total,
            rain_peak_mm: peak,
        }
    }

    /// Rain factor as a whole percentage, as shown on the info panel
    pub fn factor_percent(&self) -> f64 {
        (self.rain_factor * 100.0).round()
    }
}

/// `min(peak / cap, 1)`; a non-positive cap saturates any rain at 1
pub fn rain_factor(peak_mm: f64, cap_mm: f64) -> f64 {
    if peak_mm <= 0.0 {
        return 0.0;
    }
    if cap_mm <= 0.0 {
        return 1.0;
    }
    (peak_mm / cap_mm).min(1.0)
}
