//! Data model for ingested products: `ProductRecord`, `BandHandle`,
//! `IndexResult`, `CaptureGroup`, and the geographic `Footprint`.
//!
//! Records are created from an archive stub when extraction finishes and are
//! mutated exclusively by the attribute-resolution pipeline. Band handles are
//! immutable once created; re-running discovery produces new handles rather
//! than touching existing ones.
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::layout::LayoutPaths;
use crate::types::{IndexKind, Mission, ResolutionBucket, UNKNOWN_PRODUCT_TYPE};

/// An ordered polygon ring of (longitude, latitude) points.
pub type Ring = Vec<(f64, f64)>;

/// A closed geographic footprint.
///
/// `ring` holds (longitude, latitude) tuples; `ring_latlon` is the same ring
/// with the axes swapped for consumers that expect latitude-first ordering.
/// Both rings are derived from the same source points and stay in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub ring: Ring,
    pub ring_latlon: Ring,
}

impl Footprint {
    /// Build a footprint from a (longitude, latitude) ring, closing it if the
    /// first and last points differ. Returns `None` for rings that are still
    /// shorter than 4 points after closing.
    pub fn from_ring(mut ring: Ring) -> Option<Footprint> {
        if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
            if first != last {
                ring.push(first);
            }
        }
        if ring.len() <= 3 {
            return None;
        }
        let ring_latlon = ring.iter().map(|&(lon, lat)| (lat, lon)).collect();
        Some(Footprint { ring, ring_latlon })
    }

    pub fn is_closed(&self) -> bool {
        self.ring.first() == self.ring.last()
    }
}

/// One imported band raster belonging to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandHandle {
    pub record_id: String,
    pub bucket: ResolutionBucket,
    /// Canonical lowercase band code (b04, b8a, aot, ...); for self-describing
    /// per-band files this is the file name itself.
    pub code: String,
    /// Table the raster was imported into by the external import utility.
    pub table: String,
    /// Source raster the import was run against.
    pub source: PathBuf,
}

/// A rendered spectral-index output for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub record_id: String,
    pub kind: IndexKind,
    pub image: PathBuf,
}

/// Groups records that show the same footprint for the same mission and
/// product type, so repeated captures of one area line up as a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureGroup {
    pub id: String,
    pub mission: Mission,
    pub product_type: String,
    pub footprint: Option<Footprint>,
    pub thumbnail: Option<PathBuf>,
}

/// One ingested satellite product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub mission: Mission,
    /// Lowercase product type tag; "unknown" when no table recognized it.
    pub product_type: String,
    /// Extracted archive root, owned by the external extractor. The pipeline
    /// only reads below it.
    pub extracted_dir: PathBuf,
    /// Metadata and thumbnail paths resolved for this variant, relative to
    /// `extracted_dir`.
    pub paths: LayoutPaths,
    pub footprint: Option<Footprint>,
    pub capture_start: Option<NaiveDateTime>,
    pub capture_stop: Option<NaiveDateTime>,
    pub country: String,
    pub group_id: Option<String>,
    /// Imported bands keyed by resolution bucket. The key set is fixed.
    pub bands: BTreeMap<ResolutionBucket, Vec<BandHandle>>,
    pub processing_done: bool,
    /// True when the run completed with one or more soft failures.
    pub degraded: bool,
}

impl ProductRecord {
    /// Create a record stub for a freshly extracted archive. The record name
    /// is the archive basename without its extension.
    pub fn new(id: impl Into<String>, extracted_dir: impl Into<PathBuf>, mission: Mission) -> Self {
        let extracted_dir = extracted_dir.into();
        let name = extracted_dir
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut bands = BTreeMap::new();
        for bucket in ResolutionBucket::ALL {
            bands.insert(bucket, Vec::new());
        }
        ProductRecord {
            id: id.into(),
            name,
            mission,
            product_type: UNKNOWN_PRODUCT_TYPE.to_string(),
            extracted_dir,
            paths: LayoutPaths::default(),
            footprint: None,
            capture_start: None,
            capture_stop: None,
            country: "Unknown".to_string(),
            group_id: None,
            bands,
            processing_done: false,
            degraded: false,
        }
    }

    /// Append a freshly imported band under its bucket.
    pub fn push_band(&mut self, handle: BandHandle) {
        self.bands.entry(handle.bucket).or_default().push(handle);
    }

    /// Find a band by code, preferring finer resolution buckets.
    pub fn find_band(&self, code: &str) -> Option<&BandHandle> {
        for bucket in ResolutionBucket::FINEST_FIRST {
            if let Some(handles) = self.bands.get(&bucket) {
                if let Some(handle) = handles.iter().find(|h| h.code == code) {
                    return Some(handle);
                }
            }
        }
        None
    }

    /// First band present among `codes`, searched in the given order.
    pub fn find_band_any<'a>(&'a self, codes: &[&str]) -> Option<&'a BandHandle> {
        codes.iter().find_map(|code| self.find_band(code))
    }

    pub fn band_count(&self) -> usize {
        self.bands.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_closes_open_ring() {
        let ring = vec![(8.0, 48.0), (9.0, 48.0), (9.0, 49.0), (8.0, 49.0)];
        let fp = Footprint::from_ring(ring).unwrap();
        assert!(fp.is_closed());
        assert_eq!(fp.ring.len(), 5);
        assert_eq!(fp.ring_latlon[0], (48.0, 8.0));
        assert_eq!(fp.ring_latlon.len(), fp.ring.len());
    }

    #[test]
    fn test_footprint_rejects_short_rings() {
        assert!(Footprint::from_ring(vec![(0.0, 0.0), (1.0, 1.0)]).is_none());
        assert!(Footprint::from_ring(vec![]).is_none());
    }

    #[test]
    fn test_record_stub_defaults() {
        let record = ProductRecord::new("abc", "/data/S2B_MSIL2A_X.SAFE", Mission::Sentinel2B);
        assert_eq!(record.name, "S2B_MSIL2A_X");
        assert_eq!(record.product_type, "unknown");
        assert_eq!(record.country, "Unknown");
        assert!(!record.processing_done);
        assert_eq!(record.bands.len(), 4);
        assert!(record.bands.values().all(|v| v.is_empty()));
    }

    #[test]
    fn test_find_band_prefers_finer_bucket() {
        let mut record = ProductRecord::new("abc", "/data/x", Mission::Sentinel2B);
        record.push_band(BandHandle {
            record_id: "abc".into(),
            bucket: ResolutionBucket::R60m,
            code: "b04".into(),
            table: "s2b_abc_b04_60".into(),
            source: PathBuf::from("b04_60m.jp2"),
        });
        record.push_band(BandHandle {
            record_id: "abc".into(),
            bucket: ResolutionBucket::R10m,
            code: "b04".into(),
            table: "s2b_abc_b04_10".into(),
            source: PathBuf::from("b04_10m.jp2"),
        });
        let found = record.find_band("b04").unwrap();
        assert_eq!(found.bucket, ResolutionBucket::R10m);
        assert!(record.find_band("b99").is_none());
    }
}
