#![doc = r#"
SATDEX — attribute resolution and spectral index processing for extracted
satellite product archives.

Given an already-extracted Sentinel-1/2/3-style directory tree and a mission
hint, SATDEX determines which concrete product variant was delivered, locates
the metadata and thumbnail files that variant ships, derives the record's
footprint, capture window, and country, registers every band raster with an
external raster store, and renders spectral indices (NDVI, EVI, NDWI, SMI,
NDSI) plus a true-color RGB composite from the discovered bands.

Requirements
------------
- GDAL development headers and runtime available on your system.
- `raster2pgsql` and `psql` on PATH when importing into a raster database
  (dry runs need neither).
- Rust 2024 edition toolchain.

Quick start: ingest one extracted product
-----------------------------------------
```rust,no_run
use std::sync::Arc;

use satdex::api;
use satdex::{IngestParams, MemoryStore, Mission};

fn main() -> satdex::Result<()> {
    let store = Arc::new(MemoryStore::new());
    // No database config: band imports become logged dry runs.
    let pipeline = api::default_pipeline(store, IngestParams::default(), None)?;

    let (record, report) = api::ingest_extracted(
        &pipeline,
        "3f6c2a1e",
        "/data/extracted/S2B_MSIL2A_20231231T104429.SAFE",
        Mission::Sentinel2B,
    );

    println!(
        "{}: {} bands, {} indices, degraded={}",
        record.id, report.bands_imported, report.indices_rendered, report.degraded
    );
    Ok(())
}
```

Background ingestion
--------------------
Each record runs on its own worker; the triggering caller never blocks.
```rust,no_run
use std::sync::Arc;

use satdex::api;
use satdex::{IngestParams, MemoryStore, Mission};

fn main() -> satdex::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(api::default_pipeline(store, IngestParams::default(), None)?);

    let handle = api::spawn_ingest(
        Arc::clone(&pipeline),
        "3f6c2a1e",
        "/data/extracted/S1A_IW_GRDH_1SDV.SAFE",
        Mission::Sentinel1A,
    );

    // ... serve other requests ...
    let (_record, report) = handle.join()?;
    assert_eq!(report.completed, satdex::Stage::Done);
    Ok(())
}
```

Failure model
-------------
Nothing in a pipeline run is fatal to the record. Missing or malformed
metadata, short coordinate rings, failed band imports, and failed index
computations are logged, reported through the run's `IngestReport`, and the
run still terminates in `Done`. A record that finished with soft failures
carries `degraded = true`.

Useful modules
--------------
- [`api`] — high-level entry points.
- [`core`] — layout tables, geometry, band discovery, index math, pipeline.
- [`io`] — metadata parsing and the external collaborator traits.
- [`store`] — the persistence trait and the in-memory implementation.
- [`types`] — enums shared across the crate.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod record;
pub mod store;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::IngestParams;
pub use error::{Error, Result};
pub use types::{IndexKind, Mission, ResolutionBucket, Stage};

// Data model
pub use record::{BandHandle, CaptureGroup, Footprint, IndexResult, ProductRecord, Ring};

// Pipeline
pub use crate::core::layout::LayoutPaths;
pub use crate::core::pipeline::{
    AttrPipeline, IngestReport, PipelineDeps, PipelineHandle, StepFailure, spawn,
};

// Collaborators
pub use io::{
    DbConfig, DryRunImporter, GdalRasterReader, GeocodeError, ImportError, MetadataError,
    NominatimGeocoder, Raster2PgsqlImporter, RasterError, RasterImporter, RasterReader,
    ReverseGeocoder,
};
pub use store::{MemoryStore, RecordStore, StoreError};

// High-level API re-exports
pub use api::{default_pipeline, ingest_extracted, spawn_ingest};
