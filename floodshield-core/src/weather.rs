//! Open-Meteo hourly rain feed
//!
//! Builds the forecast query and parses the JSON response into an hourly
//! rain series. No network access happens here; callers fetch the document.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Timestamp layout used by Open-Meteo for `timeformat=iso8601`
const OPEN_METEO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Forecast query for a single coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub forecast_days: u32,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        ForecastRequest {
            latitude: 17.406,
            longitude: 78.477,
            forecast_days: 1,
        }
    }
}

impl ForecastRequest {
    /// Query URL for hourly rain at this point
    pub fn url(&self) -> String {
        format!(
            "{}?latitude={}&longitude={}&hourly=rain&forecast_days={}&timezone=auto",
            OPEN_METEO_FORECAST_URL, self.latitude, self.longitude, self.forecast_days
        )
    }
}

/// One hourly rain reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyRain {
    pub time: NaiveDateTime,
    pub rain_mm: f64,
}

/// Ordered hourly rain readings in local time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlySeries {
    pub hours: Vec<HourlyRain>,
}

impl HourlySeries {
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.hours.iter().map(|h| h.rain_mm).collect()
    }

    /// Calendar date of the first reading
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.hours.first().map(|h| h.time.date())
    }

    /// Hourly values for the first calendar day in the series
    pub fn first_day(&self) -> Vec<f64> {
        match self.first_date() {
            Some(date) => self
                .hours
                .iter()
                .filter(|h| h.time.date() == date)
                .map(|h| h.rain_mm)
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: Option<OpenMeteoHourly>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    time: Vec<String>,
    rain: Option<Vec<Option<f64>>>,
}

/// Parse an Open-Meteo forecast document into an hourly rain series
///
/// Null readings count as 0 mm; negative readings are clamped to 0.
pub fn parse_open_meteo(json: &str) -> Result<HourlySeries> {
    let response: OpenMeteoResponse =
        serde_json::from_str(json).context("failed to parse Open-Meteo response")?;

    let hourly = response
        .hourly
        .ok_or_else(|| anyhow::anyhow!("Open-Meteo response has no hourly block"))?;
    let rain = hourly
        .rain
        .ok_or_else(|| anyhow::anyhow!("Open-Meteo response has no hourly.rain series"))?;

    if hourly.time.len() != rain.len() {
        anyhow::bail!(
            "hourly.time and hourly.rain length mismatch ({} vs {})",
            hourly.time.len(),
            rain.len()
        );
    }

    let mut hours = Vec::with_capacity(rain.len());
    for (time, value) in hourly.time.iter().zip(rain) {
        let time = NaiveDateTime::parse_from_str(time, OPEN_METEO_TIME_FORMAT)
            .with_context(|| format!("invalid hourly timestamp: {}", time))?;
        hours.push(HourlyRain {
            time,
            rain_mm: value.unwrap_or(0.0).max(0.0),
        });
    }

    Ok(HourlySeries { hours })
}
