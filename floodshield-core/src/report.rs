//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering (days by date, alerts in generation order)
//! - Byte-for-byte identical output across runs

use crate::forecast::{
    forecast_alerts, outlook, summarize, AlertSeverity, DayRain, ForecastAlert, ForecastOutlook,
    ForecastSummary, RainLevel,
};
use crate::rain::RainSignal;
use crate::risk::RiskLevel;
use crate::sampler::ClickedFloodInfo;
use chrono::NaiveDate;
use serde::Serialize;

/// Render a map click as text
pub fn render_click_text(info: Option<&ClickedFloodInfo>) -> String {
    match info {
        Some(info) => format!(
            "{:<12} {:.2} ({})\n{:<12} {:.5}, {:.5}\n{:<12} {}\n",
            "Flood score:",
            info.score,
            info.level.as_str(),
            "Location:",
            info.lat,
            info.lng,
            "Color:",
            info.color
        ),
        None => "no data\n".to_string(),
    }
}

/// Render a map click as JSON; `null` when the click hit no data
pub fn render_click_json(info: Option<&ClickedFloodInfo>) -> String {
    serde_json::to_string_pretty(&info).unwrap_or_else(|_| "null".to_string())
}

/// Render the live rain signal the way the map info panel shows it
pub fn render_rain_text(signal: &RainSignal) -> String {
    format!(
        "{:<12} {:.0}%\n{:<12} {:.1} mm\n{:<12} {:.1} mm/hr\n",
        "Rain factor:",
        signal.factor_percent(),
        "Rain 24h:",
        signal.rain_24h_mm,
        "Peak hour:",
        signal.rain_peak_mm
    )
}

/// Render the live rain signal as JSON output
pub fn render_rain_json(signal: &RainSignal) -> String {
    serde_json::to_string_pretty(signal).unwrap_or_else(|_| "{}".to_string())
}

/// Render the risk legend with swatch colors
pub fn render_legend_text() -> String {
    let mut output = String::from("Flood Risk\n");
    for level in RiskLevel::ALL {
        output.push_str(&format!(
            "  {} {}\n",
            truncate_or_pad(level.as_str(), 10),
            level.color()
        ));
    }
    output
}

/// One calendar row of the forecast report
#[derive(Debug, Clone, Serialize)]
pub struct ForecastDayRow {
    pub date: NaiveDate,
    pub total_mm: f64,
    pub peak_mm: f64,
    pub level: RainLevel,
}

/// Everything the rain dashboard shows for a forecast window
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub summary: ForecastSummary,
    pub days: Vec<ForecastDayRow>,
    pub outlook: ForecastOutlook,
    pub alerts: Vec<ForecastAlert>,
}

impl ForecastReport {
    pub fn new(days: &[DayRain]) -> Self {
        ForecastReport {
            summary: summarize(days),
            days: days
                .iter()
                .map(|d| ForecastDayRow {
                    date: d.date,
                    total_mm: d.total_mm,
                    peak_mm: d.peak_mm,
                    level: d.level(),
                })
                .collect(),
            outlook: outlook(days),
            alerts: forecast_alerts(days),
        }
    }
}

/// Render a forecast report as text output
pub fn render_forecast_text(report: &ForecastReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<12} {:<10} {:<10} {}\n",
        "DATE", "TOTAL", "PEAK", "LEVEL"
    ));
    for day in &report.days {
        let date = day.date.format("%Y-%m-%d").to_string();
        let total = format!("{:.1}mm", day.total_mm);
        let peak = format!("{:.1}mm", day.peak_mm);
        output.push_str(&format!(
            "{:<12} {:<10} {:<10} {}\n",
            date,
            total,
            peak,
            day.level.as_str()
        ));
    }

    let s = &report.summary;
    output.push_str(&format!(
        "\nTotal: {:.1} mm over {} days ({} dry)\n",
        s.total_mm, s.days, s.dry_days
    ));

    output.push_str(&format!(
        "\nOutlook: {}/100 ({})\n",
        report.outlook.score,
        report.outlook.level.as_str()
    ));
    for factor in &report.outlook.factors {
        output.push_str(&format!(
            "  {} {:>3}%\n",
            truncate_or_pad(factor.name, 20),
            factor.percent
        ));
    }

    output.push_str("\nAlerts:\n");
    for alert in &report.alerts {
        let tag = format!("[{}]", severity_tag(alert));
        output.push_str(&format!("  {:<9}{}\n", tag, alert.title));
        output.push_str(&format!("  {:<9}{}\n", "", alert.body));
    }

    output
}

/// Render a forecast report as JSON output
pub fn render_forecast_json(report: &ForecastReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

fn severity_tag(alert: &ForecastAlert) -> &'static str {
    match alert.severity {
        AlertSeverity::Info => "info",
        AlertSeverity::Warn => "warn",
        AlertSeverity::Danger => "danger",
    }
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
