//! High-level, ergonomic entry points: build a pipeline with the default
//! collaborators, ingest one extracted product synchronously, or spawn a
//! worker per record. Prefer these over wiring `core` modules directly when
//! embedding SATDEX.
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::params::IngestParams;
use crate::core::pipeline::{AttrPipeline, IngestReport, PipelineDeps, PipelineHandle, spawn};
use crate::error::Result;
use crate::io::{
    DbConfig, DryRunImporter, GdalRasterReader, NominatimGeocoder, Raster2PgsqlImporter,
    RasterImporter,
};
use crate::record::ProductRecord;
use crate::store::RecordStore;
use crate::types::Mission;

/// User agent the default reverse geocoder identifies as.
pub const GEOCODER_USER_AGENT: &str = concat!("satdex/", env!("CARGO_PKG_VERSION"));

/// Build a pipeline with the default collaborator implementations: GDAL
/// raster reads, Nominatim reverse geocoding, and either the
/// raster2pgsql-based importer (with a database config) or the dry-run
/// importer (without).
pub fn default_pipeline(
    store: Arc<dyn RecordStore>,
    params: IngestParams,
    db: Option<DbConfig>,
) -> Result<AttrPipeline> {
    let importer: Arc<dyn RasterImporter> = match db {
        Some(db) => Arc::new(Raster2PgsqlImporter::new(db)),
        None => Arc::new(DryRunImporter),
    };
    let deps = PipelineDeps {
        store,
        reader: Arc::new(GdalRasterReader),
        importer,
        geocoder: Arc::new(NominatimGeocoder::new(GEOCODER_USER_AGENT)?),
    };
    Ok(AttrPipeline::new(deps, params))
}

/// Ingest one extracted product synchronously. Builds the record stub and
/// runs the full attribute-resolution sequence on the calling thread.
pub fn ingest_extracted(
    pipeline: &AttrPipeline,
    id: impl Into<String>,
    extracted_dir: impl Into<PathBuf>,
    mission: Mission,
) -> (ProductRecord, IngestReport) {
    let mut record = ProductRecord::new(id, extracted_dir, mission);
    let report = pipeline.run(&mut record);
    (record, report)
}

/// Ingest one extracted product on its own worker thread. The returned
/// handle exposes completion state and the final record/report; the caller
/// (typically the request that triggered ingestion) is never blocked.
pub fn spawn_ingest(
    pipeline: Arc<AttrPipeline>,
    id: impl Into<String>,
    extracted_dir: impl Into<PathBuf>,
    mission: Mission,
) -> PipelineHandle {
    let record = ProductRecord::new(id, extracted_dir, mission);
    spawn(pipeline, record)
}
