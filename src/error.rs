//! Crate-level error type and `Result` alias for stable, structured error
//! handling. Converts the per-module I/O, metadata, and collaborator errors
//! and provides semantic variants for pipeline-level failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] crate::io::MetadataError),

    #[error("Raster reader error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("Raster import error: {0}")]
    Import(#[from] crate::io::ImportError),

    #[error("Reverse geocoding error: {0}")]
    Geocode(#[from] crate::io::GeocodeError),

    #[error("Render error: {0}")]
    Render(#[from] crate::core::indices::render::RenderError),

    #[error("Index computation error: {0}")]
    Compute(#[from] crate::core::indices::ComputeError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Pipeline worker panicked for record {record_id}")]
    WorkerPanicked { record_id: String },

    #[error("Processing error: {0}")]
    Processing(String),
}

impl Error {
    pub fn processing<E: std::fmt::Display>(e: E) -> Self {
        Error::Processing(e.to_string())
    }
}
