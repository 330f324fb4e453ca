//! Flood color ramp
//!
//! Maps a normalized risk value to a paint color for the overlay.
//!
//! Global invariants enforced:
//! - Input is clamped to [0, 1]; the ramp is total over `f64`
//! - Segment boundaries belong to the lower segment
//! - Each channel is interpolated independently and rounded to nearest

use serde::{Serialize, Serializer};
use std::fmt;

/// An 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// CSS functional notation, e.g. `rgb(0,200,0)`
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

// Serialized as the CSS string so JSON output can be dropped straight into a style.
impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub const GREEN: Rgb = Rgb::new(0, 200, 0);
pub const YELLOW: Rgb = Rgb::new(255, 230, 0);
pub const ORANGE: Rgb = Rgb::new(255, 140, 0);
pub const RED: Rgb = Rgb::new(200, 0, 0);

/// Upper bound of the green→yellow segment
pub const YELLOW_STOP: f64 = 0.5;
/// Upper bound of the yellow→orange segment
pub const ORANGE_STOP: f64 = 0.67;

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
    v.round().clamp(0.0, 255.0) as u8
}

/// Interpolate each channel between two colors at fraction `t`
pub fn lerp_color(from: Rgb, to: Rgb, t: f64) -> Rgb {
    Rgb {
        r: lerp(from.r, to.r, t),
        g: lerp(from.g, to.g, t),
        b: lerp(from.b, to.b, t),
    }
}

/// Clamp to [0, 1]; NaN collapses to 0
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Map a normalized risk value to its ramp color
///
/// Segments:
/// - [0, 0.5]     green → yellow
/// - (0.5, 0.67]  yellow → orange
/// - (0.67, 1]    orange → red
pub fn flood_color(value: f64) -> Rgb {
    let value = clamp_unit(value);

    if value <= YELLOW_STOP {
        lerp_color(GREEN, YELLOW, value / YELLOW_STOP)
    } else if value <= ORANGE_STOP {
        lerp_color(
            YELLOW,
            ORANGE,
            (value - YELLOW_STOP) / (ORANGE_STOP - YELLOW_STOP),
        )
    } else {
        lerp_color(ORANGE, RED, (value - ORANGE_STOP) / (1.0 - ORANGE_STOP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(flood_color(0.0), GREEN);
        assert_eq!(flood_color(1.0), RED);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(flood_color(-3.0), GREEN);
        assert_eq!(flood_color(7.5), RED);
        assert_eq!(flood_color(f64::NAN), GREEN);
    }

    #[test]
    fn test_boundaries_belong_to_lower_segment() {
        // 0.5 is the end of green→yellow, i.e. exactly yellow
        assert_eq!(flood_color(0.5), YELLOW);
        // 0.67 is the end of yellow→orange, i.e. exactly orange
        assert_eq!(flood_color(0.67), ORANGE);
    }

    #[test]
    fn test_midpoint_rounding() {
        // t = 0.5 between green and yellow: (127.5, 215, 0) -> (128, 215, 0)
        assert_eq!(flood_color(0.25), Rgb::new(128, 215, 0));
        // t = 0.96: (244.8, 228.8, 0)
        assert_eq!(flood_color(0.48), Rgb::new(245, 229, 0));
    }

    #[test]
    fn test_monotonic_progression() {
        let samples = [0.0, 0.25, 0.5, 0.67, 0.85, 1.0];
        let colors: Vec<Rgb> = samples.iter().map(|v| flood_color(*v)).collect();

        // Red never falls on [0, 0.67]
        for pair in colors[..4].windows(2) {
            assert!(pair[1].r >= pair[0].r, "red fell: {:?}", pair);
        }

        // Green rises toward yellow, then never rises again from 0.5 to 1
        assert!(colors[2].g >= colors[0].g);
        for pair in colors[2..].windows(2) {
            assert!(pair[1].g <= pair[0].g, "green rose: {:?}", pair);
        }
    }

    #[test]
    fn test_channels_in_range_across_unit_interval() {
        for i in 0..=100 {
            let c = flood_color(i as f64 / 100.0);
            // u8 guarantees the range; blue stays at zero on this ramp
            assert_eq!(c.b, 0);
        }
    }

    #[test]
    fn test_css_rendering() {
        assert_eq!(GREEN.to_css(), "rgb(0,200,0)");
        assert_eq!(
            serde_json::to_string(&RED).unwrap(),
            "\"rgb(200,0,0)\"".to_string()
        );
    }
}
