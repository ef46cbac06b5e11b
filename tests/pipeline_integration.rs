//! End-to-end pipeline runs over fabricated extracted product trees with
//! stubbed collaborators. The raster reader hands back synthetic arrays, the
//! importer records its calls, and the geocoder answers from a canned
//! address, so the whole attribute-resolution sequence runs without GDAL,
//! PostGIS, or the network.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ndarray::Array2;
use tempfile::TempDir;

use satdex::core::pipeline::{self, AttrPipeline, PipelineDeps};
use satdex::io::{GeocodeError, ImportError, RasterImporter, RasterReader, ReverseGeocoder};
use satdex::io::raster::RasterError;
use satdex::{
    IndexKind, IngestParams, MemoryStore, Mission, ProductRecord, ResolutionBucket, Stage,
};

struct StubReader;

impl RasterReader for StubReader {
    fn read_band(&self, _path: &Path, _band: usize) -> Result<Array2<f64>, RasterError> {
        let mut values = Array2::from_elem((8, 8), 1200.0);
        values[[0, 0]] = 300.0;
        values[[7, 7]] = 4800.0;
        Ok(values)
    }
}

#[derive(Default)]
struct RecordingImporter {
    tables: Mutex<Vec<String>>,
}

impl RasterImporter for RecordingImporter {
    fn import(&self, _source: &Path, table: &str, _srid: u32) -> Result<(), ImportError> {
        self.tables.lock().unwrap().push(table.to_string());
        Ok(())
    }
}

struct StubGeocoder;

impl ReverseGeocoder for StubGeocoder {
    fn reverse(&self, _lat: f64, _lon: f64) -> Result<serde_json::Value, GeocodeError> {
        Ok(serde_json::json!({"address": {"country": "Germany"}}))
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

/// Lay out a minimal Sentinel-2 L2A product: manifest with footprint and
/// capture window, MTD document enumerating the image files, and the image
/// files themselves across two resolution buckets.
fn fake_msil2a_tree(dir: &TempDir) -> PathBuf {
    let root = dir.path().join("S2B_MSIL2A_20231231T104429_T32ULC.SAFE");

    write_file(
        &root.join("manifest.safe"),
        r#"<xfdu:XFDU>
  <metadataSection>
    <safe:acquisitionPeriod>
      <safe:startTime>2023-12-31T10:44:29.024Z</safe:startTime>
      <safe:stopTime>2023-12-31T10:44:29.024Z</safe:stopTime>
    </safe:acquisitionPeriod>
    <safe:frameSet>
      <safe:footPrint>
        <gml:coordinates>48.0 8.0 48.0 9.0 49.0 9.0 49.0 8.0</gml:coordinates>
      </safe:footPrint>
    </safe:frameSet>
  </metadataSection>
</xfdu:XFDU>"#,
    );

    let image_files = [
        ("R10m", "T32ULC_20231231T104429_B02_10m"),
        ("R10m", "T32ULC_20231231T104429_B03_10m"),
        ("R10m", "T32ULC_20231231T104429_B04_10m"),
        ("R10m", "T32ULC_20231231T104429_B08_10m"),
        ("R20m", "T32ULC_20231231T104429_B8A_20m"),
        ("R20m", "T32ULC_20231231T104429_B11_20m"),
    ];
    let entries: String = image_files
        .iter()
        .map(|(bucket, name)| {
            format!("<IMAGE_FILE>GRANULE/L2A_T32ULC/IMG_DATA/{bucket}/{name}</IMAGE_FILE>")
        })
        .collect();
    write_file(
        &root.join("MTD_S2MSI2A.xml"),
        &format!(
            "<n1:Level-2A_User_Product><Product_Info><PRODUCT_TYPE>S2MSI2A</PRODUCT_TYPE>{entries}</Product_Info></n1:Level-2A_User_Product>"
        ),
    );
    for (bucket, name) in image_files {
        write_file(
            &root.join(format!("GRANULE/L2A_T32ULC/IMG_DATA/{bucket}/{name}.jp2")),
            "",
        );
    }
    root
}

fn pipeline_with(
    store: Arc<MemoryStore>,
    importer: Arc<RecordingImporter>,
    params: IngestParams,
) -> AttrPipeline {
    let deps = PipelineDeps {
        store,
        reader: Arc::new(StubReader),
        importer,
        geocoder: Arc::new(StubGeocoder),
    };
    AttrPipeline::new(deps, params)
}

#[test]
fn full_run_resolves_all_attributes() {
    let dir = TempDir::new().unwrap();
    let root = fake_msil2a_tree(&dir);
    let output_dir = TempDir::new().unwrap();

    let store = Arc::new(MemoryStore::new());
    let importer = Arc::new(RecordingImporter::default());
    let params = IngestParams {
        output_dir: Some(output_dir.path().to_path_buf()),
        ..IngestParams::default()
    };
    let pipeline = pipeline_with(Arc::clone(&store), Arc::clone(&importer), params);

    let mut record = ProductRecord::new("rec-42", &root, Mission::Sentinel2B);
    let report = pipeline.run(&mut record);

    assert_eq!(report.completed, Stage::Done);
    assert!(record.processing_done);
    assert!(!report.degraded, "failures: {:?}", report.failures);

    // Product type and layout
    assert_eq!(record.product_type, "s2msi2a");
    assert_eq!(record.paths.manifest, Some(PathBuf::from("manifest.safe")));
    assert_eq!(
        record.paths.img_metadata,
        Some(PathBuf::from("MTD_S2MSI2A.xml"))
    );

    // Geometry and geography
    let footprint = record.footprint.as_ref().expect("footprint resolved");
    assert_eq!(footprint.ring.first(), footprint.ring.last());
    assert!(footprint.ring.len() >= 4);
    assert_eq!(footprint.ring[0], (8.0, 48.0));
    assert_eq!(record.country, "Germany");

    // Capture window
    assert!(record.capture_start.is_some());
    assert_eq!(record.capture_start, record.capture_stop);

    // Grouping
    assert!(record.group_id.is_some());
    assert_eq!(store.group_count(), 1);

    // Bands: six imported, classified into buckets
    assert_eq!(report.bands_imported, 6);
    assert_eq!(record.bands[&ResolutionBucket::R10m].len(), 4);
    assert_eq!(record.bands[&ResolutionBucket::R20m].len(), 2);
    let tables = importer.tables.lock().unwrap();
    assert!(tables.iter().any(|t| t == "s2b_rec_42_b04"));

    // Indices: default set is ndvi + smi + rgb
    assert_eq!(report.indices_rendered, 3);
    let indices = store.indices_for("rec-42");
    assert_eq!(indices.len(), 3);
    for index in &indices {
        assert!(index.image.exists(), "missing {}", index.image.display());
    }
    let kinds: Vec<IndexKind> = indices.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&IndexKind::Ndvi));
    assert!(kinds.contains(&IndexKind::Rgb));

    // The store saw the final state
    let stored = store.record("rec-42").unwrap();
    assert!(stored.processing_done);
    assert!(!stored.degraded);
}

#[test]
fn unknown_product_still_reaches_done() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("mystery_product");
    std::fs::create_dir_all(&root).unwrap();

    let store = Arc::new(MemoryStore::new());
    let importer = Arc::new(RecordingImporter::default());
    let pipeline = pipeline_with(
        Arc::clone(&store),
        Arc::clone(&importer),
        IngestParams::default(),
    );

    let mut record = ProductRecord::new("rec-x", &root, Mission::Unknown);
    let report = pipeline.run(&mut record);

    assert_eq!(report.completed, Stage::Done);
    assert!(record.processing_done);
    // Nothing resolvable: unknown type, no footprint, no bands, failed
    // index computations. Still done, but flagged.
    assert!(report.degraded);
    assert!(record.degraded);
    assert_eq!(record.product_type, "unknown");
    assert!(record.footprint.is_none());
    assert_eq!(record.country, "Unknown");
    assert_eq!(report.bands_imported, 0);
    assert_eq!(report.indices_rendered, 0);
    assert!(importer.tables.lock().unwrap().is_empty());
}

#[test]
fn worker_handle_exposes_completion() {
    let dir = TempDir::new().unwrap();
    let root = fake_msil2a_tree(&dir);
    let output_dir = TempDir::new().unwrap();

    let store = Arc::new(MemoryStore::new());
    let importer = Arc::new(RecordingImporter::default());
    let params = IngestParams {
        indices: vec![IndexKind::Ndvi],
        output_dir: Some(output_dir.path().to_path_buf()),
        ..IngestParams::default()
    };
    let pipeline = Arc::new(pipeline_with(store, importer, params));

    let record = ProductRecord::new("rec-bg", &root, Mission::Sentinel2B);
    let handle = pipeline::spawn(pipeline, record);
    assert_eq!(handle.record_id(), "rec-bg");

    let (record, report) = handle.join().unwrap();
    assert_eq!(report.completed, Stage::Done);
    assert!(record.processing_done);
    assert_eq!(report.indices_rendered, 1);
}

#[test]
fn repeated_captures_share_one_group() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let root_a = fake_msil2a_tree(&dir_a);
    let root_b = fake_msil2a_tree(&dir_b);
    let out = TempDir::new().unwrap();

    let store = Arc::new(MemoryStore::new());
    let importer = Arc::new(RecordingImporter::default());
    let params = IngestParams {
        indices: vec![],
        output_dir: Some(out.path().to_path_buf()),
        ..IngestParams::default()
    };
    let pipeline = pipeline_with(Arc::clone(&store), importer, params);

    let mut record_a = ProductRecord::new("rec-a", &root_a, Mission::Sentinel2B);
    pipeline.run(&mut record_a);
    let mut record_b = ProductRecord::new("rec-b", &root_b, Mission::Sentinel2B);
    pipeline.run(&mut record_b);

    // Same mission, type, and footprint: both land in one capture group.
    assert_eq!(store.group_count(), 1);
    assert!(record_a.group_id.is_some());
    assert_eq!(record_a.group_id, record_b.group_id);
}

#[test]
fn parallel_runs_do_not_interfere() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let root_a = fake_msil2a_tree(&dir_a);
    let root_b = fake_msil2a_tree(&dir_b);
    let out = TempDir::new().unwrap();

    let store = Arc::new(MemoryStore::new());
    let importer = Arc::new(RecordingImporter::default());
    let params = IngestParams {
        indices: vec![IndexKind::Ndvi],
        output_dir: Some(out.path().to_path_buf()),
        ..IngestParams::default()
    };
    let pipeline = Arc::new(pipeline_with(Arc::clone(&store), importer, params));

    let handle_a = pipeline::spawn(
        Arc::clone(&pipeline),
        ProductRecord::new("rec-a", &root_a, Mission::Sentinel2B),
    );
    let handle_b = pipeline::spawn(
        Arc::clone(&pipeline),
        ProductRecord::new("rec-b", &root_b, Mission::Sentinel2B),
    );

    let (record_a, report_a) = handle_a.join().unwrap();
    let (record_b, report_b) = handle_b.join().unwrap();

    assert_eq!(record_a.id, "rec-a");
    assert_eq!(record_b.id, "rec-b");
    assert_eq!(report_a.bands_imported, 6);
    assert_eq!(report_b.bands_imported, 6);
    // Each run wrote only its own record's bands.
    assert_eq!(store.bands_for("rec-a").len(), 6);
    assert_eq!(store.bands_for("rec-b").len(), 6);
    assert!(store.bands_for("rec-a").iter().all(|b| b.record_id == "rec-a"));
}
