//! Multi-day rainfall forecast analysis
//!
//! Daily aggregation, calendar levels, an outlook score, and generated alerts
//! for the rain dashboard.
//!
//! Global invariants enforced:
//! - Days are ordered by calendar date
//! - Alert order is fixed: heavy day, hourly peak, sustained rain, cumulative, all-clear
//! - An empty forecast scores 0 and yields only the all-clear alert

use crate::risk::RiskLevel;
use crate::weather::HourlySeries;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Daily totals at or above this are heavy rain days (mm)
pub const HEAVY_DAY_MM: f64 = 15.0;
/// Daily totals at or above this (and below heavy) are moderate (mm)
pub const MODERATE_DAY_MM: f64 = 2.5;
/// Daily totals below this count as dry (mm)
pub const DRY_DAY_MM: f64 = 0.5;
/// Hourly peak above which the wettest day raises a storm alert (mm/hr)
pub const INTENSE_PEAK_MM: f64 = 5.0;
/// Forecast totals above this raise a cumulative alert (mm)
pub const CUMULATIVE_ALERT_MM: f64 = 50.0;
/// Minimum number of moderate days for a sustained-rain alert
pub const SUSTAINED_MODERATE_DAYS: usize = 3;

/// Rain totals for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayRain {
    pub date: NaiveDate,
    pub total_mm: f64,
    pub peak_mm: f64,
}

impl DayRain {
    pub fn level(&self) -> RainLevel {
        RainLevel::from_total(self.total_mm)
    }

    pub fn is_dry(&self) -> bool {
        self.total_mm < DRY_DAY_MM
    }
}

/// Group hourly readings into calendar days
pub fn group_by_day(series: &HourlySeries) -> Vec<DayRain> {
    let mut by_day: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for hour in &series.hours {
        let entry = by_day.entry(hour.time.date()).or_insert((0.0, 0.0));
        entry.0 += hour.rain_mm;
        entry.1 = entry.1.max(hour.rain_mm);
    }

    by_day
        .into_iter()
        .map(|(date, (total_mm, peak_mm))| DayRain {
            date,
            total_mm,
            peak_mm,
        })
        .collect()
}

/// Calendar classification of a day's total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RainLevel {
    Low,      // < 2.5 mm
    Moderate, // 2.5-15 mm
    Heavy,    // >= 15 mm
}

impl RainLevel {
    pub fn from_total(total_mm: f64) -> Self {
        if total_mm < MODERATE_DAY_MM {
            RainLevel::Low
        } else if total_mm < HEAVY_DAY_MM {
            RainLevel::Moderate
        } else {
            RainLevel::Heavy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RainLevel::Low => "Low",
            RainLevel::Moderate => "Moderate",
            RainLevel::Heavy => "Heavy",
        }
    }
}

/// Headline numbers for a forecast window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub days: usize,
    pub total_mm: f64,
    pub heaviest_day_mm: f64,
    pub average_daily_mm: f64,
    pub max_hourly_mm: f64,
    pub heavy_days: usize,
    pub moderate_days: usize,
    pub dry_days: usize,
}

pub fn summarize(days: &[DayRain]) -> ForecastSummary {
    let total_mm: f64 = days.iter().map(|d| d.total_mm).sum();
    let heaviest_day_mm = days.iter().map(|d| d.total_mm).fold(0.0, f64::max);
    let max_hourly_mm = days.iter().map(|d| d.peak_mm).fold(0.0, f64::max);
    let average_daily_mm = if days.is_empty() {
        0.0
    } else {
        total_mm / days.len() as f64
    };

    ForecastSummary {
        days: days.len(),
        total_mm,
        heaviest_day_mm,
        average_daily_mm,
        max_hourly_mm,
        heavy_days: days.iter().filter(|d| d.level() == RainLevel::Heavy).count(),
        moderate_days: days
            .iter()
            .filter(|d| d.level() == RainLevel::Moderate)
            .count(),
        dry_days: days.iter().filter(|d| d.is_dry()).count(),
    }
}

/// One contributing factor of the outlook, as a percentage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlookFactor {
    pub name: &'static str,
    pub percent: u32,
}

/// Forecast-wide flood outlook on a 0-100 scale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutlook {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<OutlookFactor>,
}

fn percent(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

/// Outlook level from a 0-100 score
pub fn outlook_level(score: u32) -> RiskLevel {
    match score {
        0..=30 => RiskLevel::Low,
        31..=60 => RiskLevel::Moderate,
        61..=80 => RiskLevel::High,
        _ => RiskLevel::Severe,
    }
}

/// Compute the outlook score and its factor breakdown
///
/// Score = clamp(round(avg_daily * 8 + heaviest_day * 1.5 + heavy_days * 10), 5, 100)
pub fn outlook(days: &[DayRain]) -> ForecastOutlook {
    let s = summarize(days);

    let score = if days.is_empty() {
        0
    } else {
        let raw = s.average_daily_mm * 8.0 + s.heaviest_day_mm * 1.5 + s.heavy_days as f64 * 10.0;
        percent(raw).max(5)
    };

    let factors = vec![
        OutlookFactor {
            name: "Rainfall Intensity",
            percent: percent(s.heaviest_day_mm * 3.0),
        },
        OutlookFactor {
            name: "Cumulative Volume",
            percent: percent(s.total_mm / 2.0),
        },
        OutlookFactor {
            name: "Heavy Day Frequency",
            percent: percent(s.heavy_days as f64 * 20.0),
        },
        OutlookFactor {
            name: "Storm Consistency",
            percent: percent(s.average_daily_mm * 10.0),
        },
        OutlookFactor {
            name: "Peak Hour Severity",
            percent: percent(s.max_hourly_mm * 5.0),
        },
    ];

    ForecastOutlook {
        score,
        level: outlook_level(score),
        factors,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warn,
    Danger,
}

/// A generated forecast alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub body: String,
}

/// Generate alerts from a daily forecast
pub fn forecast_alerts(days: &[DayRain]) -> Vec<ForecastAlert> {
    let s = summarize(days);
    let mut alerts = Vec::new();

    if let Some(next_heavy) = days.iter().find(|d| d.level() == RainLevel::Heavy) {
        alerts.push(ForecastAlert {
            severity: AlertSeverity::Danger,
            title: format!(
                "Heavy rainfall expected on {}",
                next_heavy.date.format("%A, %b %-d")
            ),
            body: format!(
                "{:.1} mm forecast. Prepare for potential waterlogging in low-lying areas.",
                next_heavy.total_mm
            ),
        });
    }

    // Ties go to the later day
    let wettest = days
        .iter()
        .reduce(|a, b| if a.total_mm > b.total_mm { a } else { b });
    if let Some(day) = wettest.filter(|d| d.peak_mm > INTENSE_PEAK_MM) {
        alerts.push(ForecastAlert {
            severity: AlertSeverity::Danger,
            title: format!("Intense hourly peak: {:.1} mm/hr", day.peak_mm),
            body: "Storm intensity detected. Short-duration flooding risk elevated for urban drainage zones."
                .to_string(),
        });
    }

    if s.moderate_days >= SUSTAINED_MODERATE_DAYS {
        alerts.push(ForecastAlert {
            severity: AlertSeverity::Warn,
            title: format!("{} days of sustained rainfall ahead", s.moderate_days),
            body: "Cumulative saturation risk. Soil absorption capacity may reduce over the period."
                .to_string(),
        });
    }

    if s.total_mm > CUMULATIVE_ALERT_MM {
        alerts.push(ForecastAlert {
            severity: AlertSeverity::Warn,
            title: format!(
                "High cumulative rainfall: {:.0} mm over {} days",
                s.total_mm, s.days
            ),
            body: "Consider alternate routes and monitor water levels near rivers and lakes."
                .to_string(),
        });
    }

    if alerts.is_empty() {
        alerts.push(ForecastAlert {
            severity: AlertSeverity::Info,
            title: "No significant flood risk detected".to_string(),
            body: format!("Rainfall remains low over the next {} days.", s.days),
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::HourlyRain;

    fn day(d: u32, total_mm: f64, peak_mm: f64) -> DayRain {
        DayRain {
            date: NaiveDate::from_ymd_opt(2025, 7, d).unwrap(),
            total_mm,
            peak_mm,
        }
    }

    #[test]
    fn test_group_by_day_sorted() {
        let at = |d: u32, h: u32, mm: f64| HourlyRain {
            time: NaiveDate::from_ymd_opt(2025, 7, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
            rain_mm: mm,
        };
        let series = HourlySeries {
            hours: vec![at(2, 0, 4.0), at(1, 10, 1.0), at(1, 11, 3.0), at(2, 1, 1.0)],
        };

        let days = group_by_day(&series);
        assert_eq!(days, vec![day(1, 4.0, 3.0), day(2, 5.0, 4.0)]);
    }

    #[test]
    fn test_rain_levels() {
        assert_eq!(RainLevel::from_total(0.0), RainLevel::Low);
        assert_eq!(RainLevel::from_total(2.49), RainLevel::Low);
        assert_eq!(RainLevel::from_total(2.5), RainLevel::Moderate);
        assert_eq!(RainLevel::from_total(14.9), RainLevel::Moderate);
        assert_eq!(RainLevel::from_total(15.0), RainLevel::Heavy);
    }

    #[test]
    fn test_summary_counts() {
        let days = [day(1, 0.2, 0.1), day(2, 3.0, 1.0), day(3, 20.0, 6.0)];
        let s = summarize(&days);
        assert_eq!(s.days, 3);
        assert!((s.total_mm - 23.2).abs() < 1e-9);
        assert_eq!(s.heaviest_day_mm, 20.0);
        assert_eq!(s.max_hourly_mm, 6.0);
        assert_eq!(s.dry_days, 1);
        assert_eq!(s.moderate_days, 1);
        assert_eq!(s.heavy_days, 1);
    }

    #[test]
    fn test_outlook_empty_forecast() {
        let o = outlook(&[]);
        assert_eq!(o.score, 0);
        assert_eq!(o.level, RiskLevel::Low);
        assert!(o.factors.iter().all(|f| f.percent == 0));
    }

    #[test]
    fn test_outlook_floor_and_cap() {
        // A dry fortnight still reports the minimum score
        let dry: Vec<DayRain> = (1..=14).map(|d| day(d, 0.0, 0.0)).collect();
        assert_eq!(outlook(&dry).score, 5);

        let soaked: Vec<DayRain> = (1..=5).map(|d| day(d, 60.0, 12.0)).collect();
        let o = outlook(&soaked);
        assert_eq!(o.score, 100);
        assert_eq!(o.level, RiskLevel::Severe);
    }

    #[test]
    fn test_outlook_formula() {
        let days = [day(1, 1.0, 0.5), day(2, 3.0, 1.0)];
        // avg 2 * 8 = 16, heaviest 3 * 1.5 = 4.5 -> 20.5 -> 21
        let o = outlook(&days);
        assert_eq!(o.score, 21);
        assert_eq!(o.level, RiskLevel::Low);
        assert_eq!(o.factors[0].percent, 9); // 3 * 3
        assert_eq!(o.factors[1].percent, 2); // 4 / 2
        assert_eq!(o.factors[2].percent, 0);
        assert_eq!(o.factors[3].percent, 20); // 2 * 10
        assert_eq!(o.factors[4].percent, 5); // 1 * 5
    }

    #[test]
    fn test_outlook_levels() {
        assert_eq!(outlook_level(30), RiskLevel::Low);
        assert_eq!(outlook_level(31), RiskLevel::Moderate);
        assert_eq!(outlook_level(60), RiskLevel::Moderate);
        assert_eq!(outlook_level(80), RiskLevel::High);
        assert_eq!(outlook_level(81), RiskLevel::Severe);
    }

    #[test]
    fn test_all_clear_alert() {
        let days = [day(1, 0.0, 0.0), day(2, 1.0, 0.4)];
        let alerts = forecast_alerts(&days);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
        assert_eq!(alerts[0].body, "Rainfall remains low over the next 2 days.");
    }

    #[test]
    fn test_alert_order() {
        let days = [
            day(1, 3.0, 1.0),
            day(2, 4.0, 1.0),
            day(3, 5.0, 2.0),
            day(4, 45.0, 9.5),
        ];
        let alerts = forecast_alerts(&days);
        let titles: Vec<&str> = alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Heavy rainfall expected on Friday, Jul 4",
                "Intense hourly peak: 9.5 mm/hr",
                "3 days of sustained rainfall ahead",
                "High cumulative rainfall: 57 mm over 4 days",
            ]
        );
        assert_eq!(alerts[0].severity, AlertSeverity::Danger);
        assert_eq!(alerts[3].severity, AlertSeverity::Warn);
    }

    #[test]
    fn test_wettest_tie_prefers_later_day() {
        let days = [day(1, 10.0, 8.0), day(2, 10.0, 2.0)];
        let alerts = forecast_alerts(&days);
        // Later day wins the tie and its peak is below the storm threshold
        assert!(alerts.iter().all(|a| !a.title.starts_with("Intense")));
    }
}
