//! FloodShield core library - rain-adjusted flood risk scoring over terrain rasters

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Scores, colors and levels are pure functions of their inputs
// - No global mutable state; map sessions own their snapshots
// - No network access; feeds are read from documents the caller supplies
// - No-data is reported as None, never as a zero score
// - Identical input yields byte-for-byte identical output

pub mod color;
pub mod config;
pub mod forecast;
pub mod rain;
pub mod raster;
pub mod report;
pub mod risk;
pub mod sampler;
pub mod scoring;
pub mod session;
pub mod weather;

pub use color::{flood_color, Rgb};
pub use config::ResolvedConfig;
pub use raster::{load_raster, BoundingBox, LatLng, RasterGrid};
pub use risk::{classify, RiskLevel};
pub use sampler::{resolve_click, ClickedFloodInfo};
pub use scoring::{flood_score, HeatmapMode};
pub use session::MapSession;

use anyhow::{Context, Result};
use std::path::Path;

/// Read and parse an Open-Meteo forecast document from disk
pub fn load_forecast(path: &Path) -> Result<weather::HourlySeries> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read forecast: {}", path.display()))?;
    weather::parse_open_meteo(&json)
        .with_context(|| format!("invalid forecast document: {}", path.display()))
}

/// Open a map session and run both loads from files
///
/// The rain document is optional; when it is missing or unreadable the
/// session degrades to a dry signal. A raster that fails to load leaves the
/// session with no data.
pub fn open_session(
    raster_path: &Path,
    rain_path: Option<&Path>,
    mode: HeatmapMode,
    config: &ResolvedConfig,
) -> MapSession {
    let mut session = MapSession::new(mode, config.calibration);
    session.load(
        || load_raster(raster_path),
        || match rain_path {
            Some(path) => load_forecast(path).map(|series| series.first_day()),
            None => anyhow::bail!("no rain feed configured"),
        },
    );
    session
}
