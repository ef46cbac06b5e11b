//! The attribute-resolution pipeline.
//!
//! One run walks a strict, non-reentrant stage sequence per record:
//! product type -> layout paths -> metadata -> geometry -> grouping -> band
//! discovery -> index computation -> done. Every stage after product-type
//! resolution fails softly: the failure is logged and reported, the
//! corresponding attribute stays unset, and the run continues. Nothing is
//! rolled back, and `Done` is reached even on partial failure; callers that
//! need to tell a clean run from a degraded one read the report.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::discovery::BandDiscovery;
use crate::core::geometry::{self, RingParse};
use crate::core::indices::IndexCalculator;
use crate::core::layout::{self, LayoutPaths};
use crate::core::params::IngestParams;
use crate::error::Error;
use crate::io::metadata::{self, XmlValue};
use crate::io::{RasterImporter, RasterReader, ReverseGeocoder};
use crate::record::{CaptureGroup, IndexResult, ProductRecord};
use crate::store::RecordStore;
use crate::types::{Stage, UNKNOWN_PRODUCT_TYPE};

/// External collaborators a pipeline run talks to. Shared across worker
/// threads, hence the `Arc`s.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn RecordStore>,
    pub reader: Arc<dyn RasterReader>,
    pub importer: Arc<dyn RasterImporter>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
}

/// One soft failure encountered during a run.
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub stage: Stage,
    pub detail: String,
}

/// What a pipeline run accomplished. `completed` is always `Done`; the
/// failure list and `degraded` flag distinguish best-effort completion from
/// a clean run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub record_id: String,
    pub completed: Stage,
    pub failures: Vec<StepFailure>,
    pub bands_imported: usize,
    pub bands_failed: usize,
    pub indices_rendered: usize,
    pub degraded: bool,
}

/// Sequences attribute resolution for ingested records.
pub struct AttrPipeline {
    pub deps: PipelineDeps,
    pub params: IngestParams,
}

impl AttrPipeline {
    pub fn new(deps: PipelineDeps, params: IngestParams) -> Self {
        AttrPipeline { deps, params }
    }

    /// Run the full stage sequence for one record. The record is mutated in
    /// place and persisted as stages land.
    pub fn run(&self, record: &mut ProductRecord) -> IngestReport {
        info!(record_id = %record.id, mission = %record.mission, "pipeline run starting");
        let mut failures: Vec<StepFailure> = Vec::new();

        record.processing_done = false;
        self.persist(record, Stage::ProductTypeResolved, &mut failures);

        // ProductTypeResolved: always succeeds, falling back to "unknown".
        record.product_type =
            metadata::product_type_from_metadata(record.mission, &record.extracted_dir);
        if record.product_type != UNKNOWN_PRODUCT_TYPE
            && !layout::is_known_product_type(&record.product_type)
        {
            info!(
                record_id = %record.id,
                product_type = %record.product_type,
                "extracted product type is not supported; collapsing to unknown"
            );
            record.product_type = UNKNOWN_PRODUCT_TYPE.to_string();
        }
        debug!(record_id = %record.id, product_type = %record.product_type, "product type resolved");

        // PathsResolved: a pure table lookup, no failure mode.
        let layout = layout::resolve(record.mission, &record.product_type, &record.extracted_dir);
        record.paths = layout.clone();
        if record.paths.thumbnail.is_none() {
            info!(record_id = %record.id, "product variant ships no thumbnail");
        }
        self.persist(record, Stage::PathsResolved, &mut failures);

        // MetadataAttached: parse the manifest when the variant ships one.
        let manifest = self.attach_metadata(record, &layout, &mut failures);

        // GeometryResolved: footprint, capture window, country.
        self.resolve_geometry(record, manifest.as_ref(), &mut failures);
        self.persist(record, Stage::GeometryResolved, &mut failures);

        // GroupingResolved: attach the record to its capture group.
        self.resolve_grouping(record, &mut failures);
        self.persist(record, Stage::GroupingResolved, &mut failures);

        // BandsDiscovered: import and register every band raster.
        let discovery = BandDiscovery {
            importer: self.deps.importer.as_ref(),
            store: self.deps.store.as_ref(),
            srid: self.params.srid,
        };
        let discovery_report = discovery.discover(record, &layout);
        for (path, detail) in &discovery_report.failures {
            failures.push(StepFailure {
                stage: Stage::BandsDiscovered,
                detail: format!("{}: {}", path.display(), detail),
            });
        }

        // One computation per requested index; failures skip to the next.
        let mut indices_rendered = 0;
        let calculator = IndexCalculator {
            reader: self.deps.reader.as_ref(),
            params: &self.params,
        };
        for &kind in &self.params.indices {
            match calculator.compute(kind, record) {
                Ok(image) => {
                    let result = IndexResult {
                        record_id: record.id.clone(),
                        kind,
                        image,
                    };
                    if let Err(e) = self.deps.store.save_index(&result) {
                        warn!(record_id = %record.id, index = %kind, error = %e, "could not persist index result");
                        failures.push(StepFailure {
                            stage: Stage::BandsDiscovered,
                            detail: format!("persisting {kind}: {e}"),
                        });
                        continue;
                    }
                    indices_rendered += 1;
                }
                Err(e) => {
                    warn!(record_id = %record.id, index = %kind, error = %e, "index computation failed");
                    failures.push(StepFailure {
                        stage: Stage::BandsDiscovered,
                        detail: format!("{kind}: {e}"),
                    });
                }
            }
        }

        // Done is reached unconditionally; partial failure only degrades.
        record.processing_done = true;
        record.degraded = !failures.is_empty();
        self.persist(record, Stage::Done, &mut failures);
        // A failed final save still counts against the run.
        record.degraded = !failures.is_empty();

        let report = IngestReport {
            record_id: record.id.clone(),
            completed: Stage::Done,
            bands_imported: discovery_report.imported,
            bands_failed: discovery_report.failures.len(),
            indices_rendered,
            degraded: record.degraded,
            failures,
        };
        info!(
            record_id = %record.id,
            bands = report.bands_imported,
            indices = report.indices_rendered,
            degraded = report.degraded,
            "pipeline run finished"
        );
        report
    }

    fn persist(&self, record: &ProductRecord, stage: Stage, failures: &mut Vec<StepFailure>) {
        if let Err(e) = self.deps.store.save_record(record) {
            warn!(record_id = %record.id, stage = %stage, error = %e, "could not persist record");
            failures.push(StepFailure {
                stage,
                detail: e.to_string(),
            });
        }
    }

    fn attach_metadata(
        &self,
        record: &mut ProductRecord,
        layout: &LayoutPaths,
        failures: &mut Vec<StepFailure>,
    ) -> Option<XmlValue> {
        let Some(rel) = layout.manifest.as_ref() else {
            info!(record_id = %record.id, "no manifest for this variant; skipping metadata attach");
            return None;
        };
        let manifest_path = record.extracted_dir.join(rel);
        let document = match metadata::parse_document(&manifest_path) {
            Ok(document) => document,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "could not attach metadata");
                failures.push(StepFailure {
                    stage: Stage::MetadataAttached,
                    detail: e.to_string(),
                });
                self.persist(record, Stage::MetadataAttached, failures);
                return None;
            }
        };

        let (start, stop) = metadata::capture_window(record.mission, &document);
        record.capture_start = start;
        record.capture_stop = stop;
        if start.is_none() && stop.is_none() {
            debug!(record_id = %record.id, "no capture window in metadata");
        }
        self.persist(record, Stage::MetadataAttached, failures);
        Some(document)
    }

    fn resolve_geometry(
        &self,
        record: &mut ProductRecord,
        manifest: Option<&XmlValue>,
        failures: &mut Vec<StepFailure>,
    ) {
        let Some(document) = manifest else {
            warn!(record_id = %record.id, "no coordinates available");
            return;
        };
        let Some(raw) = metadata::find_first(document, "gml:coordinates")
            .and_then(XmlValue::first_text)
        else {
            warn!(record_id = %record.id, "no coordinates available");
            return;
        };

        match geometry::parse_ring(raw) {
            RingParse::Resolved(footprint) => {
                record.country = geometry::country(&footprint, self.deps.geocoder.as_ref());
                record.footprint = Some(footprint);
            }
            RingParse::Skipped { points } => {
                warn!(record_id = %record.id, points, "footprint skipped");
                failures.push(StepFailure {
                    stage: Stage::GeometryResolved,
                    detail: format!("ring skipped with {points} points"),
                });
            }
        }
    }

    fn resolve_grouping(&self, record: &mut ProductRecord, failures: &mut Vec<StepFailure>) {
        let existing = match self.deps.store.find_group(
            record.mission,
            &record.product_type,
            record.footprint.as_ref(),
        ) {
            Ok(existing) => existing,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "capture group lookup failed");
                failures.push(StepFailure {
                    stage: Stage::GroupingResolved,
                    detail: e.to_string(),
                });
                return;
            }
        };

        match existing {
            Some(group) => {
                debug!(record_id = %record.id, group_id = %group.id, "joined existing capture group");
                record.group_id = Some(group.id);
            }
            None => {
                let group = CaptureGroup {
                    id: Uuid::new_v4().to_string(),
                    mission: record.mission,
                    product_type: record.product_type.clone(),
                    footprint: record.footprint.clone(),
                    thumbnail: record.paths.thumbnail.clone(),
                };
                if let Err(e) = self.deps.store.save_group(&group) {
                    warn!(record_id = %record.id, error = %e, "could not persist capture group");
                    failures.push(StepFailure {
                        stage: Stage::GroupingResolved,
                        detail: e.to_string(),
                    });
                    return;
                }
                debug!(record_id = %record.id, group_id = %group.id, "created capture group");
                record.group_id = Some(group.id);
            }
        }
    }
}

/// Handle to a pipeline run executing on its own worker thread. Unlike a
/// fire-and-forget thread, the handle exposes completion and the final
/// record/report to whoever triggered ingestion.
pub struct PipelineHandle {
    record_id: String,
    finished: Arc<AtomicBool>,
    thread: JoinHandle<(ProductRecord, IngestReport)>,
}

impl PipelineHandle {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait for the run and take its outcome.
    pub fn join(self) -> crate::error::Result<(ProductRecord, IngestReport)> {
        let record_id = self.record_id;
        self.thread
            .join()
            .map_err(|_| Error::WorkerPanicked { record_id })
    }
}

/// Start one pipeline run on a dedicated worker thread. The caller is not
/// blocked; multiple records may run fully in parallel since each run writes
/// only to its own record.
pub fn spawn(pipeline: Arc<AttrPipeline>, mut record: ProductRecord) -> PipelineHandle {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let record_id = record.id.clone();
    let thread = std::thread::spawn(move || {
        let report = pipeline.run(&mut record);
        flag.store(true, Ordering::SeqCst);
        (record, report)
    });
    PipelineHandle {
        record_id,
        finished,
        thread,
    }
}
