//! Decoded flood-susceptibility raster
//!
//! Global invariants enforced:
//! - A grid is immutable once constructed
//! - Row 0 is the northern edge; latitude decreases with row index
//! - 0 (and NaN) is the no-data sentinel, distinct from zero risk
//! - Bounds checks are inclusive on all four edges

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

/// Geographic extent of a raster (x = longitude, y = latitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: LatLng) -> bool {
        point.lng >= self.xmin
            && point.lng <= self.xmax
            && point.lat >= self.ymin
            && point.lat <= self.ymax
    }
}

/// Single- or multi-band raster; band 0 carries flood susceptibility
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    bounds: BoundingBox,
    pixel_width: f64,
    pixel_height: f64,
    /// `values[band][row][col]`
    values: Vec<Vec<Vec<f64>>>,
}

/// JSON form of a raster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterDocument {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub values: Vec<Vec<Vec<f64>>>,
}

impl RasterGrid {
    /// Build a grid, rejecting degenerate geometry
    pub fn new(
        bounds: BoundingBox,
        pixel_width: f64,
        pixel_height: f64,
        values: Vec<Vec<Vec<f64>>>,
    ) -> Result<Self> {
        for (name, v) in [("pixel_width", pixel_width), ("pixel_height", pixel_height)] {
            if !v.is_finite() || v <= 0.0 {
                anyhow::bail!("{} must be positive (got {})", name, v);
            }
        }
        if !is_ascending(bounds.xmin, bounds.xmax) {
            anyhow::bail!(
                "xmin ({}) must be less than xmax ({})",
                bounds.xmin,
                bounds.xmax
            );
        }
        if !is_ascending(bounds.ymin, bounds.ymax) {
            anyhow::bail!(
                "ymin ({}) must be less than ymax ({})",
                bounds.ymin,
                bounds.ymax
            );
        }
        if values.is_empty() {
            anyhow::bail!("raster has no bands");
        }

        Ok(RasterGrid {
            bounds,
            pixel_width,
            pixel_height,
            values,
        })
    }

    /// Build a single-band grid from row-major rows
    pub fn single_band(
        bounds: BoundingBox,
        pixel_width: f64,
        pixel_height: f64,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        Self::new(bounds, pixel_width, pixel_height, vec![rows])
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }

    pub fn band_count(&self) -> usize {
        self.values.len()
    }

    /// Number of rows in band 0
    pub fn height(&self) -> usize {
        self.values[0].len()
    }

    /// Widest row in band 0
    pub fn width(&self) -> usize {
        self.values[0].iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Pixel `(col, row)` under a coordinate, or None outside the bounds
    ///
    /// The index is not checked against the backing array; a coordinate on
    /// the east or south edge can land one past the last cell.
    pub fn pixel_index(&self, point: LatLng) -> Option<(usize, usize)> {
        if !self.bounds.contains(point) {
            return None;
        }
        let x = ((point.lng - self.bounds.xmin) / self.pixel_width).floor();
        let y = ((self.bounds.ymax - point.lat) / self.pixel_height).floor();
        Some((x as usize, y as usize))
    }

    /// Band-0 sample at `(col, row)`; None when absent or no-data
    pub fn cell(&self, col: usize, row: usize) -> Option<f64> {
        let v = *self.values[0].get(row)?.get(col)?;
        if v == 0.0 || v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Band-0 sample under a coordinate; None when outside, absent, or no-data
    pub fn sample(&self, point: LatLng) -> Option<f64> {
        let (col, row) = self.pixel_index(point)?;
        self.cell(col, row)
    }

    /// Geographic center of a cell
    pub fn cell_center(&self, col: usize, row: usize) -> LatLng {
        LatLng {
            lat: self.bounds.ymax - (row as f64 + 0.5) * self.pixel_height,
            lng: self.bounds.xmin + (col as f64 + 0.5) * self.pixel_width,
        }
    }

    /// Count of cells in band 0 that hold data
    pub fn data_cell_count(&self) -> usize {
        self.values[0]
            .iter()
            .flatten()
            .filter(|v| **v != 0.0 && !v.is_nan())
            .count()
    }

    pub fn from_document(doc: RasterDocument) -> Result<Self> {
        Self::new(
            BoundingBox {
                xmin: doc.xmin,
                xmax: doc.xmax,
                ymin: doc.ymin,
                ymax: doc.ymax,
            },
            doc.pixel_width,
            doc.pixel_height,
            doc.values,
        )
    }

    pub fn to_document(&self) -> RasterDocument {
        RasterDocument {
            xmin: self.bounds.xmin,
            xmax: self.bounds.xmax,
            ymin: self.bounds.ymin,
            ymax: self.bounds.ymax,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            values: self.values.clone(),
        }
    }
}

/// Strictly ascending; false when either side is NaN
fn is_ascending(lo: f64, hi: f64) -> bool {
    lo.partial_cmp(&hi) == Some(std::cmp::Ordering::Less)
}

/// Load a raster, choosing the decoder by file extension
///
/// Supported: `.tif` / `.tiff` (GeoTIFF) and `.json` (`RasterDocument`)
pub fn load_raster(path: &Path) -> Result<RasterGrid> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let grid = match ext.as_deref() {
        Some("tif") | Some("tiff") => load_geotiff(path)?,
        Some("json") => load_json_raster(path)?,
        _ => anyhow::bail!(
            "unsupported raster format: {} (expected .tif, .tiff or .json)",
            path.display()
        ),
    };

    tracing::debug!(
        path = %path.display(),
        width = grid.width(),
        height = grid.height(),
        bands = grid.band_count(),
        data_cells = grid.data_cell_count(),
        "raster loaded"
    );
    Ok(grid)
}

/// Load a JSON raster document
pub fn load_json_raster(path: &Path) -> Result<RasterGrid> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read raster file: {}", path.display()))?;
    let doc: RasterDocument = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse raster file: {}", path.display()))?;
    RasterGrid::from_document(doc).with_context(|| format!("invalid raster in: {}", path.display()))
}

/// Load a single-band GeoTIFF georeferenced by pixel scale and tiepoint
pub fn load_geotiff(path: &Path) -> Result<RasterGrid> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open GeoTIFF: {}", path.display()))?;
    let mut decoder = Decoder::new(std::io::BufReader::new(file))
        .with_context(|| format!("failed to initialise TIFF decoder: {}", path.display()))?;

    let (width, height) = decoder
        .dimensions()
        .context("GeoTIFF: cannot read dimensions")?;

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .context("GeoTIFF: missing ModelPixelScale tag")?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .context("GeoTIFF: missing ModelTiepoint tag")?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        anyhow::bail!("GeoTIFF: malformed georeferencing tags");
    }

    let samples = match decoder.read_image().context("GeoTIFF: failed to decode image")? {
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect::<Vec<_>>(),
        DecodingResult::F64(v) => v,
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        _ => anyhow::bail!("GeoTIFF: unsupported sample format"),
    };

    let (width, height) = (width as usize, height as usize);
    if samples.len() != width * height {
        anyhow::bail!(
            "GeoTIFF: expected a single band of {} samples, got {}",
            width * height,
            samples.len()
        );
    }

    let (pixel_width, pixel_height) = (scale[0], scale[1]);
    // Tiepoint maps raster (i, j) to model (x, y)
    let xmin = tiepoint[3] - tiepoint[0] * pixel_width;
    let ymax = tiepoint[4] + tiepoint[1] * pixel_height;
    let bounds = BoundingBox {
        xmin,
        xmax: xmin + width as f64 * pixel_width,
        ymin: ymax - height as f64 * pixel_height,
        ymax,
    };

    let rows = samples.chunks(width).map(<[f64]>::to_vec).collect();
    RasterGrid::single_band(bounds, pixel_width, pixel_height, rows)
        .with_context(|| format!("invalid GeoTIFF georeferencing: {}", path.display()))
}
