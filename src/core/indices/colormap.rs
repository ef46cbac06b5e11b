//! Color ramps for index rendering.
//!
//! Each ramp is a list of color stops sampled by linear interpolation.
//! The diverging red-to-green ramp renders vegetation indices, the cool
//! blue ramps render water and moisture, and the grayscale ramp covers
//! renders that carry no colormap.

/// One anchor of a color ramp, at position `t` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub t: f32,
    pub rgb: [u8; 3],
}

const fn stop(t: f32, r: u8, g: u8, b: u8) -> ColorStop {
    ColorStop { t, rgb: [r, g, b] }
}

/// Diverging red -> yellow -> green ramp for vegetation indices.
pub const RED_YELLOW_GREEN: &[ColorStop] = &[
    stop(0.0, 165, 0, 38),
    stop(0.1, 215, 48, 39),
    stop(0.2, 244, 109, 67),
    stop(0.3, 253, 174, 97),
    stop(0.4, 254, 224, 139),
    stop(0.5, 255, 255, 191),
    stop(0.6, 217, 239, 139),
    stop(0.7, 166, 217, 106),
    stop(0.8, 102, 189, 99),
    stop(0.9, 26, 152, 80),
    stop(1.0, 0, 104, 55),
];

/// Sequential blue -> green "winter" ramp for the water index.
pub const WINTER: &[ColorStop] = &[stop(0.0, 0, 0, 255), stop(1.0, 0, 255, 128)];

/// Sequential light-to-dark blue ramp for the moisture index.
pub const BLUES: &[ColorStop] = &[
    stop(0.0, 247, 251, 255),
    stop(0.125, 222, 235, 247),
    stop(0.25, 198, 219, 239),
    stop(0.375, 158, 202, 225),
    stop(0.5, 107, 174, 214),
    stop(0.625, 66, 146, 198),
    stop(0.75, 33, 113, 181),
    stop(0.875, 8, 81, 156),
    stop(1.0, 8, 48, 107),
];

/// Plain black -> white ramp for renders without a colormap.
pub const GRAYSCALE: &[ColorStop] = &[stop(0.0, 0, 0, 0), stop(1.0, 255, 255, 255)];

/// Sample a ramp at `t`. Values outside [0, 1] clamp to the ramp ends.
pub fn sample(stops: &[ColorStop], t: f32) -> [u8; 3] {
    debug_assert!(!stops.is_empty());
    let t = t.clamp(0.0, 1.0);
    let mut lower = stops[0];
    for &upper in &stops[1..] {
        if t <= upper.t {
            let span = upper.t - lower.t;
            let frac = if span > 0.0 { (t - lower.t) / span } else { 0.0 };
            let mut rgb = [0u8; 3];
            for c in 0..3 {
                let lo = lower.rgb[c] as f32;
                let hi = upper.rgb[c] as f32;
                rgb[c] = (lo + (hi - lo) * frac).round() as u8;
            }
            return rgb;
        }
        lower = upper;
    }
    stops[stops.len() - 1].rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints() {
        assert_eq!(sample(RED_YELLOW_GREEN, 0.0), [165, 0, 38]);
        assert_eq!(sample(RED_YELLOW_GREEN, 1.0), [0, 104, 55]);
        assert_eq!(sample(GRAYSCALE, 0.0), [0, 0, 0]);
        assert_eq!(sample(GRAYSCALE, 1.0), [255, 255, 255]);
    }

    #[test]
    fn test_sample_midpoint_interpolates() {
        assert_eq!(sample(GRAYSCALE, 0.5), [128, 128, 128]);
        let mid = sample(WINTER, 0.5);
        assert_eq!(mid[0], 0);
        assert!(mid[1] > 100 && mid[1] < 155);
    }

    #[test]
    fn test_sample_clamps_out_of_range() {
        assert_eq!(sample(BLUES, -3.0), sample(BLUES, 0.0));
        assert_eq!(sample(BLUES, 42.0), sample(BLUES, 1.0));
    }
}
