//! Rendering of computed index arrays to JPEG images.
//!
//! Scalar arrays are min-max normalized, passed through a color ramp, and
//! written out; the smooth paths run a Lanczos3 resample first. Non-finite
//! pixels render at the low end of the ramp.
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use jpeg_encoder::{ColorType, Encoder};
use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::indices::colormap::{self, ColorStop};
use crate::core::indices::ops;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JPEG encoding error: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),
    #[error("Resize error: {0}")]
    Resize(String),
    #[error("Cannot render an empty array")]
    EmptyArray,
}

/// Target dimensions for a long-side resize, keeping aspect ratio. Upscaling
/// is not performed.
fn resize_dimensions(cols: usize, rows: usize, target_size: usize) -> (usize, usize) {
    let long_side = cols.max(rows);
    if target_size >= long_side {
        return (cols, rows);
    }
    let scale = target_size as f64 / long_side as f64;
    if cols >= rows {
        (target_size, (rows as f64 * scale).round().max(1.0) as usize)
    } else {
        ((cols as f64 * scale).round().max(1.0) as usize, target_size)
    }
}

fn resize_rgb(
    data: Vec<u8>,
    cols: usize,
    rows: usize,
    target_cols: usize,
    target_rows: usize,
) -> Result<Vec<u8>, RenderError> {
    let src = Image::from_vec_u8(cols as u32, rows as u32, data, PixelType::U8x3)
        .map_err(|e| RenderError::Resize(e.to_string()))?;
    let mut dst = Image::new(target_cols as u32, target_rows as u32, PixelType::U8x3);
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    let mut resizer = Resizer::new();
    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|e| RenderError::Resize(e.to_string()))?;
    Ok(dst.into_vec())
}

fn write_rgb_jpeg(output: &Path, cols: usize, rows: usize, rgb: &[u8]) -> Result<(), RenderError> {
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    let encoder = Encoder::new(&mut writer, 100);
    encoder.encode(rgb, cols as u16, rows as u16, ColorType::Rgb)?;
    Ok(())
}

/// Render a scalar index array through a color ramp.
///
/// `smooth` runs a Lanczos3 resample to `target_size` (long side) before
/// encoding; without a target size it is a no-op.
pub fn render_scalar(
    values: &Array2<f64>,
    stops: &[ColorStop],
    smooth: bool,
    target_size: Option<usize>,
    output: &Path,
) -> Result<(), RenderError> {
    let (rows, cols) = values.dim();
    if rows == 0 || cols == 0 {
        return Err(RenderError::EmptyArray);
    }

    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    if !span.is_finite() {
        warn!("index array has no finite samples; rendering flat image");
    }

    let mut rgb = Vec::with_capacity(rows * cols * 3);
    for &v in values.iter() {
        let t = if v.is_finite() && span > 0.0 {
            ((v - min) / span) as f32
        } else {
            0.0
        };
        rgb.extend_from_slice(&colormap::sample(stops, t));
    }

    let (mut out_cols, mut out_rows) = (cols, rows);
    if smooth {
        if let Some(size) = target_size {
            let (tc, tr) = resize_dimensions(cols, rows, size);
            if (tc, tr) != (cols, rows) {
                debug!(from = ?(cols, rows), to = ?(tc, tr), "resampling render");
                rgb = resize_rgb(rgb, cols, rows, tc, tr)?;
                out_cols = tc;
                out_rows = tr;
            }
        }
    }

    write_rgb_jpeg(output, out_cols, out_rows, &rgb)
}

/// Render the true-color composite: per-channel brighten, gamma correction
/// (gamma = 2), min-max normalization, then stacking.
pub fn render_rgb_composite(
    blue: &Array2<f64>,
    green: &Array2<f64>,
    red: &Array2<f64>,
    smooth: bool,
    target_size: Option<usize>,
    output: &Path,
) -> Result<(), RenderError> {
    let (rows, cols) = red.dim();
    if rows == 0 || cols == 0 {
        return Err(RenderError::EmptyArray);
    }

    let red_n = ops::normalize(&ops::gamma_correction(&ops::brighten(red)));
    let green_n = ops::normalize(&ops::gamma_correction(&ops::brighten(green)));
    let blue_n = ops::normalize(&ops::gamma_correction(&ops::brighten(blue)));

    let to_byte = |v: f64| -> u8 {
        if v.is_finite() {
            (v * 255.0).clamp(0.0, 255.0).round() as u8
        } else {
            0
        }
    };

    let mut rgb = Vec::with_capacity(rows * cols * 3);
    for ((&r, &g), &b) in red_n.iter().zip(green_n.iter()).zip(blue_n.iter()) {
        rgb.push(to_byte(r));
        rgb.push(to_byte(g));
        rgb.push(to_byte(b));
    }

    let (mut out_cols, mut out_rows) = (cols, rows);
    if smooth {
        if let Some(size) = target_size {
            let (tc, tr) = resize_dimensions(cols, rows, size);
            if (tc, tr) != (cols, rows) {
                rgb = resize_rgb(rgb, cols, rows, tc, tr)?;
                out_cols = tc;
                out_rows = tr;
            }
        }
    }

    write_rgb_jpeg(output, out_cols, out_rows, &rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::colormap::GRAYSCALE;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_resize_dimensions_keep_aspect() {
        assert_eq!(resize_dimensions(400, 200, 100), (100, 50));
        assert_eq!(resize_dimensions(200, 400, 100), (50, 100));
        // no upscaling
        assert_eq!(resize_dimensions(40, 20, 100), (40, 20));
    }

    #[test]
    fn test_render_scalar_writes_jpeg() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.jpg");
        let values = array![[0.0, 0.5], [1.0, f64::NAN]];
        render_scalar(&values, GRAYSCALE, false, None, &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_render_rgb_composite_writes_jpeg() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("rgb.jpg");
        let band = array![[100.0, 500.0], [1500.0, 3000.0]];
        render_rgb_composite(&band, &band, &band, true, Some(2), &out).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn test_render_empty_array_is_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("empty.jpg");
        let values = Array2::<f64>::zeros((0, 0));
        assert!(matches!(
            render_scalar(&values, GRAYSCALE, false, None, &out),
            Err(RenderError::EmptyArray)
        ));
    }
}
