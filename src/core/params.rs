use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::IndexKind;

/// Ingestion parameters suitable for config files and CLI presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestParams {
    /// Indices to compute once bands are registered.
    pub indices: Vec<IndexKind>,
    /// Spatial reference id handed to the raster import utility.
    pub srid: u32,
    /// Where rendered index images land; None means the record's extracted
    /// directory.
    pub output_dir: Option<PathBuf>,
    /// Long-side target in pixels for the smooth render paths; None keeps
    /// the original raster size.
    pub render_size: Option<usize>,
}

impl Default for IngestParams {
    fn default() -> Self {
        IngestParams {
            indices: vec![IndexKind::Ndvi, IndexKind::Smi, IndexKind::Rgb],
            srid: 4326,
            output_dir: None,
            render_size: None,
        }
    }
}
