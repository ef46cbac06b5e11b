//! Element-wise spectral index math over band arrays.
//!
//! All formulas run in `f64`. Division is deliberately not special-cased:
//! degenerate pixels (0/0, +/-inf) are counted and logged as a warning and
//! the raw array proceeds to rendering, since downstream consumers tolerate
//! them. Inputs must share one shape; callers check before invoking.
use ndarray::{Array2, Zip};
use tracing::warn;

fn warn_non_finite(label: &str, values: &Array2<f64>) {
    let degenerate = values.iter().filter(|v| !v.is_finite()).count();
    if degenerate > 0 {
        warn!(
            index = label,
            degenerate,
            "invalid value found during division; computation continues"
        );
    }
}

fn normalized_diff(label: &str, a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let mut result = Array2::zeros(a.dim());
    Zip::from(a).and(b).and(&mut result).for_each(|&a, &b, res| {
        *res = (a - b) / (a + b);
    });
    warn_non_finite(label, &result);
    result
}

/// Normalized Difference Vegetation Index: (NIR - RED) / (NIR + RED).
pub fn ndvi(nir: &Array2<f64>, red: &Array2<f64>) -> Array2<f64> {
    normalized_diff("ndvi", nir, red)
}

/// Gain and correction coefficients for the EVI formula. The Sentinel-2
/// defaults are G=1, C1=C2=2.5, L=1.
#[derive(Debug, Clone, Copy)]
pub struct EviCoefficients {
    pub g: f64,
    pub c1: f64,
    pub c2: f64,
    pub l: f64,
}

impl Default for EviCoefficients {
    fn default() -> Self {
        EviCoefficients {
            g: 1.0,
            c1: 2.5,
            c2: 2.5,
            l: 1.0,
        }
    }
}

/// Enhanced Vegetation Index:
/// G * (NIR - RED) / (NIR + C1*RED - C2*BLUE + L).
pub fn evi(
    blue: &Array2<f64>,
    red: &Array2<f64>,
    nir: &Array2<f64>,
    coeff: EviCoefficients,
) -> Array2<f64> {
    let mut result = Array2::zeros(nir.dim());
    Zip::from(nir)
        .and(red)
        .and(blue)
        .and(&mut result)
        .for_each(|&nir, &red, &blue, res| {
            *res = coeff.g * ((nir - red) / (nir + coeff.c1 * red - coeff.c2 * blue + coeff.l));
        });
    warn_non_finite("evi", &result);
    result
}

/// Normalized Difference Water Index: (GREEN - NIR) / (GREEN + NIR).
pub fn ndwi(green: &Array2<f64>, nir: &Array2<f64>) -> Array2<f64> {
    normalized_diff("ndwi", green, nir)
}

/// Soil Moisture Index: (NIR - SWIR) / (NIR + SWIR).
pub fn smi(nir: &Array2<f64>, swir: &Array2<f64>) -> Array2<f64> {
    normalized_diff("smi", nir, swir)
}

/// Normalized Difference Snow Index: (GREEN - SWIR) / (GREEN + SWIR).
pub fn ndsi(green: &Array2<f64>, swir: &Array2<f64>) -> Array2<f64> {
    normalized_diff("ndsi", green, swir)
}

/// Brighten a raw reflectance band: clamp(0.13 * x, 0, 255).
pub fn brighten(band: &Array2<f64>) -> Array2<f64> {
    band.mapv(|v| (0.13 * v).clamp(0.0, 255.0))
}

/// Gamma correction with gamma = 2: x^(1/2).
pub fn gamma_correction(band: &Array2<f64>) -> Array2<f64> {
    band.mapv(|v| v.powf(0.5))
}

/// Min-max normalize a band to [0, 1]. Non-finite samples are ignored when
/// finding the range.
pub fn normalize(band: &Array2<f64>) -> Array2<f64> {
    let (min, max) = band
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    band.mapv(|v| (v - min) / span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ndvi_of_equal_bands_is_zero() {
        let band = array![[3.0, 7.0], [0.5, 120.0]];
        let result = ndvi(&band, &band);
        assert!(result.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_ndvi_half() {
        let nir = array![[3.0]];
        let red = array![[1.0]];
        let result = ndvi(&nir, &red);
        assert!((result[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ndvi_zero_over_zero_stays_nan() {
        let zeros = array![[0.0, 0.0]];
        let result = ndvi(&zeros, &zeros);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_ndwi_uses_addition_denominator() {
        let green = array![[3.0]];
        let nir = array![[1.0]];
        let result = ndwi(&green, &nir);
        assert!((result[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_evi_defaults() {
        let blue = array![[0.1]];
        let red = array![[0.2]];
        let nir = array![[0.6]];
        let result = evi(&blue, &red, &nir, EviCoefficients::default());
        let expected = 1.0 * (0.6 - 0.2) / (0.6 + 2.5 * 0.2 - 2.5 * 0.1 + 1.0);
        assert!((result[[0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_brighten_clamps() {
        let band = array![[0.0, 100.0, 10000.0]];
        let result = brighten(&band);
        assert_eq!(result[[0, 0]], 0.0);
        assert!((result[[0, 1]] - 13.0).abs() < 1e-12);
        assert_eq!(result[[0, 2]], 255.0);
    }

    #[test]
    fn test_normalize_range() {
        let band = array![[10.0, 20.0, 30.0]];
        let result = normalize(&band);
        assert_eq!(result[[0, 0]], 0.0);
        assert_eq!(result[[0, 2]], 1.0);
        assert!((result[[0, 1]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_ignores_non_finite() {
        let band = array![[f64::NAN, 1.0, 3.0]];
        let result = normalize(&band);
        assert_eq!(result[[0, 1]], 0.0);
        assert_eq!(result[[0, 2]], 1.0);
    }
}
