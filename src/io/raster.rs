//! Raster reading collaborator.
//!
//! Band files arrive in whatever container the mission ships (JP2, GeoTIFF,
//! NetCDF), so the default reader goes through GDAL and hands back plain
//! `f64` arrays for the index math.
use std::path::Path;

use gdal::Dataset;
use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("Band index {index} out of range (dataset has {bands})")]
    BandOutOfRange { index: usize, bands: usize },
    #[error("Dimension mismatch reading {path}: expected {expected_x}x{expected_y}")]
    DimensionMismatch {
        path: String,
        expected_x: usize,
        expected_y: usize,
    },
}

/// Reads one band of a raster file as a 2-D `f64` array (rows, cols).
pub trait RasterReader: Send + Sync {
    fn read_band(&self, path: &Path, band: usize) -> Result<Array2<f64>, RasterError>;
}

/// GDAL-backed reader; opens the dataset per call, which keeps the trait
/// object stateless and shareable across pipeline workers.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalRasterReader;

impl RasterReader for GdalRasterReader {
    fn read_band(&self, path: &Path, band: usize) -> Result<Array2<f64>, RasterError> {
        debug!(path = %path.display(), band, "reading raster band");
        let dataset = Dataset::open(path)?;
        let bands = dataset.raster_count() as usize;
        if band == 0 || band > bands {
            return Err(RasterError::BandOutOfRange { index: band, bands });
        }
        let (size_x, size_y) = dataset.raster_size();
        let rasterband = dataset.rasterband(band)?;
        let buf = rasterband.read_as::<f64>((0, 0), (size_x, size_y), (size_x, size_y), None)?;
        let data = buf.data().to_vec();
        Array2::from_shape_vec((size_y as usize, size_x as usize), data).map_err(|_| {
            RasterError::DimensionMismatch {
                path: path.display().to_string(),
                expected_x: size_x as usize,
                expected_y: size_y as usize,
            }
        })
    }
}
