//! Spectral index computation: pure band math (`ops`), color ramps
//! (`colormap`), JPEG rendering (`render`), and the [`IndexCalculator`]
//! tying them to a record's discovered bands.
pub mod colormap;
pub mod ops;
pub mod render;

use std::path::PathBuf;

use chrono::Utc;
use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::params::IngestParams;
use crate::io::raster::{RasterError, RasterReader};
use crate::record::{BandHandle, ProductRecord};
use crate::types::{IndexKind, ResolutionBucket};
use render::RenderError;

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("No band available for {index}; needs one of {codes:?}")]
    MissingBand {
        index: IndexKind,
        codes: &'static [&'static str],
    },
    #[error("Band shapes differ for {index}: {a:?} vs {b:?}")]
    ShapeMismatch {
        index: IndexKind,
        a: (usize, usize),
        b: (usize, usize),
    },
    #[error("Raster read error: {0}")]
    Raster(#[from] RasterError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

// Acceptable band codes per input slot, tried in order.
const RED: &[&str] = &["b04"];
const GREEN: &[&str] = &["b03"];
const BLUE: &[&str] = &["b02"];
const NIR_WIDE: &[&str] = &["b08", "b8a"];
const NIR_B08: &[&str] = &["b08"];
const NIR_B8A: &[&str] = &["b8a"];
const SWIR_WIDE: &[&str] = &["b11", "b12"];
const SWIR_B11: &[&str] = &["b11"];

/// Computes one rendered index image from a record's registered bands.
pub struct IndexCalculator<'a> {
    pub reader: &'a dyn RasterReader,
    pub params: &'a IngestParams,
}

impl IndexCalculator<'_> {
    /// Compute `kind` for `record` and write one rendered image, returning
    /// its path. A single attempt is made; there is no retry on failure.
    pub fn compute(&self, kind: IndexKind, record: &ProductRecord) -> Result<PathBuf, ComputeError> {
        let save_dir = self
            .params
            .output_dir
            .clone()
            .unwrap_or_else(|| record.extracted_dir.clone());
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let output = save_dir.join(format!("{}_{}_{}.jpg", record.id, kind, stamp));
        debug!(record_id = %record.id, index = %kind, output = %output.display(), "computing index");

        let size = self.params.render_size;
        match kind {
            IndexKind::Ndvi => {
                let [nir, red] = self.load_bands(kind, record, &[NIR_WIDE, RED])?;
                let values = ops::ndvi(&nir, &red);
                render::render_scalar(&values, colormap::RED_YELLOW_GREEN, false, size, &output)?;
            }
            IndexKind::Evi => {
                let [blue, red, nir] = self.load_bands(kind, record, &[BLUE, RED, NIR_B8A])?;
                let values = ops::evi(&blue, &red, &nir, ops::EviCoefficients::default());
                render::render_scalar(&values, colormap::RED_YELLOW_GREEN, false, size, &output)?;
            }
            IndexKind::Ndwi => {
                let [green, nir] = self.load_bands(kind, record, &[GREEN, NIR_B08])?;
                let values = ops::ndwi(&green, &nir);
                render::render_scalar(&values, colormap::WINTER, false, size, &output)?;
            }
            IndexKind::Smi => {
                let [nir, swir] = self.load_bands(kind, record, &[NIR_B8A, SWIR_WIDE])?;
                let values = ops::smi(&nir, &swir);
                render::render_scalar(&values, colormap::BLUES, false, size, &output)?;
            }
            IndexKind::Ndsi => {
                let [green, swir] = self.load_bands(kind, record, &[GREEN, SWIR_B11])?;
                let values = ops::ndsi(&green, &swir);
                render::render_scalar(&values, colormap::GRAYSCALE, true, size, &output)?;
            }
            IndexKind::Rgb => {
                let [blue, green, red] = self.load_bands(kind, record, &[BLUE, GREEN, RED])?;
                render::render_rgb_composite(&blue, &green, &red, true, size, &output)?;
            }
        }

        info!(record_id = %record.id, index = %kind, image = %output.display(), "rendered index image");
        Ok(output)
    }

    /// Resolve one handle per input slot, preferring a single resolution
    /// bucket that can satisfy every slot (band files of one bucket share
    /// their dimensions), then read all arrays and check their shapes.
    fn load_bands<const N: usize>(
        &self,
        kind: IndexKind,
        record: &ProductRecord,
        slots: &[&'static [&'static str]; N],
    ) -> Result<[Array2<f64>; N], ComputeError> {
        let handles = resolve_band_set(kind, record, slots)?;

        let mut arrays = Vec::with_capacity(N);
        for handle in handles {
            arrays.push(self.reader.read_band(&handle.source, 1)?);
        }
        let first_dim = arrays[0].dim();
        for array in &arrays[1..] {
            if array.dim() != first_dim {
                return Err(ComputeError::ShapeMismatch {
                    index: kind,
                    a: first_dim,
                    b: array.dim(),
                });
            }
        }
        // Vec length equals N by construction.
        Ok(arrays.try_into().unwrap_or_else(|_| unreachable!()))
    }
}

fn resolve_band_set<'r, const N: usize>(
    kind: IndexKind,
    record: &'r ProductRecord,
    slots: &[&'static [&'static str]; N],
) -> Result<Vec<&'r BandHandle>, ComputeError> {
    // Try each bucket finest-first; all slots must resolve within one bucket.
    for bucket in ResolutionBucket::FINEST_FIRST {
        if let Some(handles) = record.bands.get(&bucket) {
            let mut picked = Vec::with_capacity(N);
            for slot in slots.iter() {
                match slot
                    .iter()
                    .find_map(|code| handles.iter().find(|h| h.code == *code))
                {
                    Some(handle) => picked.push(handle),
                    None => break,
                }
            }
            if picked.len() == N {
                return Ok(picked);
            }
        }
    }
    // Fall back to per-slot lookup across buckets.
    let mut picked = Vec::with_capacity(N);
    for slot in slots.iter() {
        match record.find_band_any(slot) {
            Some(handle) => picked.push(handle),
            None => {
                return Err(ComputeError::MissingBand {
                    index: kind,
                    codes: slot,
                });
            }
        }
    }
    Ok(picked)
}
