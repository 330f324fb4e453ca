//! Raster sampling: map-click resolution and overlay painting
//!
//! Both paths run the same pipeline per cell:
//! raster sample -> flood score -> (color ramp | risk level).
//!
//! Global invariants enforced:
//! - No-data is `None`, never an error and never a zero score
//! - An overlay is always painted whole for one mode; there is no partial repaint

use crate::color::{flood_color, Rgb};
use crate::raster::{LatLng, RasterGrid};
use crate::risk::{classify_with_thresholds, RiskLevel, RiskThresholds};
use crate::scoring::{flood_score_with_policy, HeatmapMode, ScoringPolicy};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Overlay opacity used by the map views
pub const DEFAULT_OVERLAY_OPACITY: f64 = 0.6;

/// Scoring constants and level thresholds for one deployment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    pub policy: ScoringPolicy,
    pub thresholds: RiskThresholds,
}

/// Result of a click that landed on a data cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClickedFloodInfo {
    pub lat: f64,
    pub lng: f64,
    pub score: f64,
    pub level: RiskLevel,
    /// Swatch color of `level`
    pub color: Rgb,
}

/// Resolve a map click with default calibration
pub fn resolve_click(
    point: LatLng,
    grid: &RasterGrid,
    rain_factor: f64,
    mode: HeatmapMode,
) -> Option<ClickedFloodInfo> {
    resolve_click_with(point, grid, rain_factor, mode, &Calibration::default())
}

/// Resolve a map click into a flood reading
///
/// Returns None when the click is outside the raster, lands past the backing
/// array, or hits a no-data cell.
pub fn resolve_click_with(
    point: LatLng,
    grid: &RasterGrid,
    rain_factor: f64,
    mode: HeatmapMode,
    calibration: &Calibration,
) -> Option<ClickedFloodInfo> {
    let raw = grid.sample(point)?;
    let score = flood_score_with_policy(raw, rain_factor, mode, &calibration.policy);
    let assessment = classify_with_thresholds(score, &calibration.thresholds);

    Some(ClickedFloodInfo {
        lat: point.lat,
        lng: point.lng,
        score,
        level: assessment.level,
        color: assessment.color,
    })
}

/// A fully painted overlay for one mode and rain factor
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub mode: HeatmapMode,
    pub rain_factor: f64,
    pub width: usize,
    pub height: usize,
    /// Row-major; None is transparent (no data)
    pub pixels: Vec<Option<Rgb>>,
}

impl Overlay {
    pub fn pixel(&self, col: usize, row: usize) -> Option<Rgb> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.pixels[row * self.width + col]
    }

    pub fn painted_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_some()).count()
    }

    /// RGBA image; painted pixels carry `opacity`, no-data pixels are clear
    pub fn to_image(&self, opacity: f64) -> image::RgbaImage {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut img = image::RgbaImage::new(self.width as u32, self.height as u32);
        for (i, pixel) in self.pixels.iter().enumerate() {
            let (x, y) = ((i % self.width) as u32, (i / self.width) as u32);
            let rgba = match pixel {
                Some(c) => image::Rgba([c.r, c.g, c.b, alpha]),
                None => image::Rgba([0, 0, 0, 0]),
            };
            img.put_pixel(x, y, rgba);
        }
        img
    }

    /// Write the overlay as a PNG whatever the file extension
    pub fn save_png(&self, path: &Path, opacity: f64) -> Result<()> {
        self.to_image(opacity)
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write overlay: {}", path.display()))
    }
}

/// Paint every cell of the raster for the given mode
pub fn render_overlay(
    grid: &RasterGrid,
    rain_factor: f64,
    mode: HeatmapMode,
    calibration: &Calibration,
) -> Overlay {
    let (width, height) = (grid.width(), grid.height());
    let mut pixels = Vec::with_capacity(width * height);

    for row in 0..height {
        for col in 0..width {
            let color = grid.cell(col, row).map(|raw| {
                flood_color(flood_score_with_policy(
                    raw,
                    rain_factor,
                    mode,
                    &calibration.policy,
                ))
            });
            pixels.push(color);
        }
    }

    tracing::debug!(
        mode = mode.as_str(),
        rain_factor,
        width,
        height,
        "overlay painted"
    );

    Overlay {
        mode,
        rain_factor,
        width,
        height,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::BoundingBox;

    fn grid() -> RasterGrid {
        let bounds = BoundingBox {
            xmin: 0.0,
            xmax: 3.0,
            ymin: 0.0,
            ymax: 2.0,
        };
        RasterGrid::single_band(
            bounds,
            1.0,
            1.0,
            vec![vec![0.0, 0.4, 1.0], vec![0.9, 0.0, 0.2]],
        )
        .unwrap()
    }

    #[test]
    fn test_click_outside_bounds() {
        assert_eq!(
            resolve_click(LatLng::new(5.0, 1.0), &grid(), 0.5, HeatmapMode::Realtime),
            None
        );
    }

    #[test]
    fn test_click_on_edges() {
        // North edge is inside and maps to row 0
        let north = resolve_click(LatLng::new(2.0, 1.5), &grid(), 0.0, HeatmapMode::Susceptibility);
        assert_eq!(north.map(|i| i.score), Some(0.4));
        // Just past the east edge is outside
        assert_eq!(
            resolve_click(
                LatLng::new(1.5, 3.0 + 1e-9),
                &grid(),
                0.0,
                HeatmapMode::Susceptibility
            ),
            None
        );
    }

    #[test]
    fn test_click_on_no_data_cell() {
        for mode in [HeatmapMode::Realtime, HeatmapMode::Susceptibility] {
            for rain in [0.0, 0.5, 1.0] {
                assert_eq!(resolve_click(LatLng::new(1.5, 0.5), &grid(), rain, mode), None);
            }
        }
    }

    #[test]
    fn test_click_populates_reading() {
        let info = resolve_click(
            LatLng::new(0.5, 0.5),
            &grid(),
            0.0,
            HeatmapMode::Susceptibility,
        )
        .unwrap();
        assert_eq!(info.lat, 0.5);
        assert_eq!(info.lng, 0.5);
        assert_eq!(info.score, 0.9);
        assert_eq!(info.level, RiskLevel::Severe);
        assert_eq!(info.color, RiskLevel::Severe.color());
    }

    #[test]
    fn test_saturated_cell_reads_severe_in_any_mode() {
        let info = resolve_click(LatLng::new(1.5, 2.5), &grid(), 0.0, HeatmapMode::Realtime).unwrap();
        assert_eq!(info.score, 1.0);
        assert_eq!(info.level, RiskLevel::Severe);
    }

    #[test]
    fn test_overlay_leaves_no_data_transparent() {
        let overlay = render_overlay(&grid(), 0.0, HeatmapMode::Susceptibility, &Calibration::default());
        assert_eq!(overlay.width, 3);
        assert_eq!(overlay.height, 2);
        assert_eq!(overlay.pixel(0, 0), None);
        assert_eq!(overlay.pixel(1, 1), None);
        assert_eq!(overlay.pixel(2, 0), Some(flood_color(1.0)));
        assert_eq!(overlay.painted_count(), 4);
        assert_eq!(overlay.pixel(9, 9), None);
    }

    #[test]
    fn test_overlay_depends_on_mode() {
        let g = grid();
        let realtime = render_overlay(&g, 0.0, HeatmapMode::Realtime, &Calibration::default());
        let static_view = render_overlay(&g, 0.0, HeatmapMode::Susceptibility, &Calibration::default());
        // 0.4 * 0.05 = 0.02 vs 0.4
        assert_eq!(realtime.pixel(1, 0), Some(flood_color(0.02)));
        assert_eq!(static_view.pixel(1, 0), Some(flood_color(0.4)));
        assert_ne!(realtime, static_view);
    }

    #[test]
    fn test_save_png_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = render_overlay(&grid(), 0.5, HeatmapMode::Realtime, &Calibration::default());

        for name in ["overlay.out", "overlay"] {
            let path = dir.path().join(name);
            overlay.save_png(&path, DEFAULT_OVERLAY_OPACITY).unwrap();
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        }
    }

    #[test]
    fn test_overlay_image_alpha() {
        let overlay = render_overlay(&grid(), 1.0, HeatmapMode::Realtime, &Calibration::default());
        let img = overlay.to_image(DEFAULT_OVERLAY_OPACITY);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(1, 0)[3], 153);
    }
}
