//! Band discovery: find every band raster belonging to a record, classify it
//! by spectral code and resolution bucket, and register it with the external
//! raster store.
//!
//! Three mutually exclusive strategies cover the delivered formats: Sentinel-2
//! products enumerate their image files in the MTD document, Sentinel-1
//! products keep one file per channel under `measurement/`, and NetCDF-based
//! products ship self-describing per-band `.nc` files at the archive root.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::core::layout::LayoutPaths;
use crate::io::metadata::{find_all, parse_document};
use crate::io::RasterImporter;
use crate::record::{BandHandle, ProductRecord};
use crate::store::RecordStore;
use crate::types::ResolutionBucket;

/// How band files are located for a product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    /// Image paths enumerated in the MTD document (`IMAGE_FILE` entries plus
    /// the `.jp2` suffix).
    MetadataFileList,
    /// Loose per-channel files in the `measurement/` subdirectory.
    MeasurementScan,
    /// Bare `.nc` files at the extracted root; each file is its own band.
    ExtensionScan,
}

// Product types whose bands are enumerated in the MTD document.
const METADATA_LIST_PROD_TYPES: &[&str] = &["s2msi1c", "s2msi2a"];
// Product types whose bands live under measurement/.
const MEASUREMENT_PROD_TYPES: &[&str] = &["grd", "grd cog", "slc"];

// Band-code substrings for metadata-listed image files, in precedence order;
// the first match wins.
const IMAGE_FILE_TOKENS: &[&str] = &[
    "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B09", "B10", "B11", "B12", "B8A",
    "AOT", "TCI", "WVP", "SCL",
];

// Positional band tokens for measurement/ file names.
const MEASUREMENT_TOKENS: &[&str] = &[
    "b-001", "b-002", "b-003", "b-004", "b-005", "b-006", "b-007", "b-008", "b-009", "b-010",
    "b-011", "b-012", "b01", "b02", "b03", "b04", "b05", "b06", "b07", "b08", "b09", "b10", "b11",
    "b12", "b8a", "b-08a", "aot", "scl", "tci", "wvp",
];

/// Select the discovery strategy for a product type. `None` means the record
/// has no discoverable bands.
pub fn strategy_for(product_type: &str, extracted_dir: &Path) -> Option<DiscoveryStrategy> {
    if METADATA_LIST_PROD_TYPES.contains(&product_type) {
        return Some(DiscoveryStrategy::MetadataFileList);
    }
    if MEASUREMENT_PROD_TYPES.contains(&product_type) {
        return Some(DiscoveryStrategy::MeasurementScan);
    }
    if dir_contains_extension(extracted_dir, "nc") {
        return Some(DiscoveryStrategy::ExtensionScan);
    }
    None
}

fn dir_contains_extension(dir: &Path, ext: &str) -> bool {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .any(|e| e.path().extension().map(|x| x == ext).unwrap_or(false)),
        Err(_) => false,
    }
}

fn bucket_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)R(\d+)m").unwrap())
}

/// Extract the resolution bucket from a band path's parent segment
/// ("GRANULE/.../R10m/..._B04_10m.jp2" -> r10m). Paths without such a
/// segment land in the unknown bucket.
pub fn bucket_from_path(path: &Path) -> ResolutionBucket {
    let Some(segment) = path.parent().and_then(|p| p.file_name()) else {
        return ResolutionBucket::Unknown;
    };
    let segment = segment.to_string_lossy();
    let Some(caps) = bucket_regex().captures(&segment) else {
        return ResolutionBucket::Unknown;
    };
    match caps.get(1).map(|m| m.as_str()) {
        Some("10") => ResolutionBucket::R10m,
        Some("20") => ResolutionBucket::R20m,
        Some("60") => ResolutionBucket::R60m,
        _ => ResolutionBucket::Unknown,
    }
}

/// Deterministic import table name: `{short_mission}_{record_id}_{code}`,
/// lowercased, with anything outside [a-z0-9] folded to underscores so the
/// result is a valid SQL identifier.
pub fn table_name(short_mission: &str, record_id: &str, code: &str) -> String {
    let raw = format!("{}_{}_{}", short_mission, record_id, code).to_lowercase();
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Outcome of one discovery run.
#[derive(Debug, Default, Clone)]
pub struct DiscoveryReport {
    /// Files that matched a band token.
    pub matched: usize,
    /// Bands imported and registered.
    pub imported: usize,
    /// Per-band failures (import or persistence); these bands were skipped.
    pub failures: Vec<(PathBuf, String)>,
}

/// Walks a record's extracted directory for band rasters and registers each
/// one with the external raster store.
pub struct BandDiscovery<'a> {
    pub importer: &'a dyn RasterImporter,
    pub store: &'a dyn RecordStore,
    pub srid: u32,
}

impl<'a> BandDiscovery<'a> {
    /// Discover, import, and register every band belonging to `record`.
    ///
    /// Import failures skip only the affected band. Each successful band is
    /// appended to the record and persisted immediately, so a crash
    /// mid-discovery leaves earlier bands usable. Not idempotent by identity:
    /// running twice appends a second, independent set of handles.
    pub fn discover(&self, record: &mut ProductRecord, layout: &LayoutPaths) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let Some(strategy) = strategy_for(&record.product_type, &record.extracted_dir) else {
            info!(
                record_id = %record.id,
                product_type = %record.product_type,
                "no band discovery strategy for product type"
            );
            return report;
        };
        debug!(record_id = %record.id, ?strategy, "discovering bands");

        let candidates = match self.candidate_paths(record, layout, strategy, &mut report) {
            Some(candidates) => candidates,
            None => return report,
        };

        let short_mission = record.mission.short_code();
        for path in candidates {
            let Some(code) = classify(&path, strategy) else {
                continue;
            };
            report.matched += 1;
            let bucket = bucket_from_path(&path);
            let table = table_name(&short_mission, &record.id, &code);

            if let Err(e) = self.importer.import(&path, &table, self.srid) {
                warn!(
                    record_id = %record.id,
                    band = %code,
                    error = %e,
                    "raster import failed; skipping band"
                );
                report.failures.push((path, e.to_string()));
                continue;
            }

            let handle = BandHandle {
                record_id: record.id.clone(),
                bucket,
                code,
                table,
                source: path.clone(),
            };
            record.push_band(handle.clone());
            // Persist each band as soon as it lands.
            if let Err(e) = self.store.append_band(&handle) {
                warn!(record_id = %record.id, error = %e, "could not persist band handle");
                report.failures.push((path, e.to_string()));
                continue;
            }
            if let Err(e) = self.store.save_record(record) {
                warn!(record_id = %record.id, error = %e, "could not persist record after band");
                report.failures.push((path, e.to_string()));
                continue;
            }
            report.imported += 1;
        }

        info!(
            record_id = %record.id,
            matched = report.matched,
            imported = report.imported,
            failed = report.failures.len(),
            "band discovery finished"
        );
        report
    }

    fn candidate_paths(
        &self,
        record: &ProductRecord,
        layout: &LayoutPaths,
        strategy: DiscoveryStrategy,
        report: &mut DiscoveryReport,
    ) -> Option<Vec<PathBuf>> {
        match strategy {
            DiscoveryStrategy::MetadataFileList => {
                let Some(rel) = layout.img_metadata.as_ref() else {
                    warn!(record_id = %record.id, "no image metadata path in layout");
                    return None;
                };
                let mtd_path = record.extracted_dir.join(rel);
                let document = match parse_document(&mtd_path) {
                    Ok(document) => document,
                    Err(e) => {
                        warn!(record_id = %record.id, error = %e, "could not read image metadata");
                        report.failures.push((mtd_path, e.to_string()));
                        return None;
                    }
                };
                let paths = find_all(&document, "IMAGE_FILE")
                    .into_iter()
                    .filter_map(|v| v.first_text())
                    .map(|rel| record.extracted_dir.join(format!("{}.jp2", rel)))
                    .collect();
                Some(paths)
            }
            DiscoveryStrategy::MeasurementScan => {
                let measurement = record.extracted_dir.join("measurement");
                match list_dir(&measurement) {
                    Ok(paths) => Some(paths),
                    Err(e) => {
                        warn!(record_id = %record.id, error = %e, "could not list measurement dir");
                        report.failures.push((measurement, e.to_string()));
                        None
                    }
                }
            }
            DiscoveryStrategy::ExtensionScan => {
                let paths = list_dir(&record.extracted_dir)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|p| p.extension().map(|x| x == "nc").unwrap_or(false))
                    .collect();
                Some(paths)
            }
        }
    }
}

fn list_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Match a candidate path to its band code. First token match wins; the
/// stored code is the lowercased token, or the file name itself for
/// self-describing per-band files.
fn classify(path: &Path, strategy: DiscoveryStrategy) -> Option<String> {
    let full = path.to_string_lossy();
    match strategy {
        DiscoveryStrategy::MetadataFileList => IMAGE_FILE_TOKENS
            .iter()
            .find(|token| full.contains(*token))
            .map(|token| token.to_lowercase()),
        DiscoveryStrategy::MeasurementScan => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            MEASUREMENT_TOKENS
                .iter()
                .find(|token| name.contains(*token))
                .map(|token| token.to_string())
        }
        DiscoveryStrategy::ExtensionScan => path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase()),
    }
}
