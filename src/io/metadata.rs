//! Metadata document parsing and keyword extraction.
//!
//! Product metadata arrives as XML manifests whose schemas differ per mission
//! and product type. Rather than binding to any one schema, documents are
//! parsed into an ordered tree ([`XmlValue`]) and queried by keyword with a
//! depth-first search, so the same lookups work across manifest flavors.
//! First-match order is the document's natural depth-first order; for
//! multi-granule products where a key repeats, the first occurrence wins.
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{Mission, UNKNOWN_PRODUCT_TYPE};

/// Errors encountered when reading metadata documents
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: quick_xml::Error,
    },
}

/// One node of a parsed metadata document.
///
/// Element children keep document order; a repeated child name collapses into
/// a `List` at the position of its first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    Text(String),
    List(Vec<XmlValue>),
    Map(Vec<(String, XmlValue)>),
}

impl XmlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text content of this node, descending into the first element of a
    /// list value (multi-granule documents wrap repeated values this way).
    pub fn first_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(s) => Some(s),
            XmlValue::List(items) => items.first().and_then(XmlValue::first_text),
            XmlValue::Map(_) => None,
        }
    }
}

fn insert_child(children: &mut Vec<(String, XmlValue)>, name: String, value: XmlValue) {
    if let Some((_, existing)) = children.iter_mut().find(|(k, _)| *k == name) {
        match existing {
            XmlValue::List(items) => items.push(value),
            _ => {
                let old = std::mem::replace(existing, XmlValue::List(Vec::new()));
                if let XmlValue::List(items) = existing {
                    items.push(old);
                    items.push(value);
                }
            }
        }
    } else {
        children.push((name, value));
    }
}

/// Parse an XML metadata document into an ordered tree.
///
/// An absent file is `MetadataError::NotFound`; a present but malformed file
/// is `MetadataError::Parse`. Missing keys inside a parsed document are never
/// errors; lookups return `None` instead.
pub fn parse_document(path: &Path) -> Result<XmlValue, MetadataError> {
    if !path.exists() {
        return Err(MetadataError::NotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "parsing metadata document");

    let mut reader = Reader::from_file(path).map_err(|source| MetadataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    reader.trim_text(true);

    // Stack of open elements: (qualified name, children, accumulated text)
    let mut stack: Vec<(String, Vec<(String, XmlValue)>, String)> = Vec::new();
    let mut root: Vec<(String, XmlValue)> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| MetadataError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        match event {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push((name, Vec::new(), String::new()));
            }
            Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let children = match stack.last_mut() {
                    Some((_, children, _)) => children,
                    None => &mut root,
                };
                insert_child(children, name, XmlValue::Text(String::new()));
            }
            Event::Text(e) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    let unescaped = e.unescape().map_err(|source| MetadataError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::End(_) => {
                if let Some((name, children, text)) = stack.pop() {
                    let value = if children.is_empty() {
                        XmlValue::Text(text.trim().to_string())
                    } else {
                        XmlValue::Map(children)
                    };
                    let parent = match stack.last_mut() {
                        Some((_, children, _)) => children,
                        None => &mut root,
                    };
                    insert_child(parent, name, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if root.is_empty() {
        return Err(MetadataError::Parse {
            path: path.to_path_buf(),
            source: quick_xml::Error::UnexpectedEof("empty document".to_string()),
        });
    }
    Ok(XmlValue::Map(root))
}

/// Depth-first search for the first value stored under `key`.
pub fn find_first<'a>(value: &'a XmlValue, key: &str) -> Option<&'a XmlValue> {
    match value {
        XmlValue::Map(entries) => {
            for (k, v) in entries {
                if k == key {
                    return Some(v);
                }
                if let Some(found) = find_first(v, key) {
                    return Some(found);
                }
            }
            None
        }
        XmlValue::List(items) => items.iter().find_map(|item| find_first(item, key)),
        XmlValue::Text(_) => None,
    }
}

/// Collect every value stored under `key`, in document order. A matched list
/// contributes its elements rather than the list itself.
pub fn find_all<'a>(value: &'a XmlValue, key: &str) -> Vec<&'a XmlValue> {
    let mut found = Vec::new();
    collect(value, key, &mut found);
    found
}

fn collect<'a>(value: &'a XmlValue, key: &str, found: &mut Vec<&'a XmlValue>) {
    match value {
        XmlValue::Map(entries) => {
            for (k, v) in entries {
                if k == key {
                    match v {
                        XmlValue::List(items) => found.extend(items.iter()),
                        other => found.push(other),
                    }
                } else {
                    collect(v, key, found);
                }
            }
        }
        XmlValue::List(items) => {
            for item in items {
                collect(item, key, found);
            }
        }
        XmlValue::Text(_) => {}
    }
}

/// Keys and datetime format used to pull a record's capture window out of its
/// manifest.
#[derive(Debug, Clone, Copy)]
pub struct CaptureKeys {
    pub start: &'static str,
    pub stop: &'static str,
    pub format: &'static str,
}

/// Where a mission declares its product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductTypeSource {
    /// A fixed manifest file name at the archive root.
    Manifest(&'static str),
    /// The first file at the archive root whose name starts with "MTD".
    MtdScan,
}

/// Per-mission metadata rules: which document names the product type, under
/// which candidate keys (tried in order), and how capture times are keyed.
#[derive(Debug, Clone, Copy)]
pub struct MissionProfile {
    pub source: ProductTypeSource,
    pub product_type_keys: &'static [&'static str],
    pub capture: Option<CaptureKeys>,
}

/// Metadata rules for a mission, or `None` for missions without a known
/// manifest schema.
pub fn mission_profile(mission: Mission) -> Option<MissionProfile> {
    match mission {
        Mission::Sentinel1A | Mission::Sentinel1B => Some(MissionProfile {
            source: ProductTypeSource::Manifest("manifest.safe"),
            // l1 carries GRD/GRD-COG/SLC, l2 carries OCN; the sub-schemas are
            // mutually exclusive so both keys are tried in order.
            product_type_keys: &["s1sarl1:productType", "s1sarl2:productType"],
            capture: Some(CaptureKeys {
                start: "safe:startTime",
                stop: "safe:stopTime",
                format: "%Y-%m-%dT%H:%M:%S%.f",
            }),
        }),
        Mission::Sentinel2A | Mission::Sentinel2B => Some(MissionProfile {
            source: ProductTypeSource::MtdScan,
            product_type_keys: &["PRODUCT_TYPE"],
            capture: Some(CaptureKeys {
                start: "safe:startTime",
                stop: "safe:stopTime",
                format: "%Y-%m-%dT%H:%M:%S%.fZ",
            }),
        }),
        Mission::Sentinel3A | Mission::Sentinel3B => Some(MissionProfile {
            source: ProductTypeSource::Manifest("xfdumanifest.xml"),
            product_type_keys: &["sentinel3:productType"],
            capture: Some(CaptureKeys {
                start: "sentinel-safe:startTime",
                stop: "sentinel-safe:stopTime",
                format: "%Y-%m-%dT%H:%M:%S%.f",
            }),
        }),
        _ => None,
    }
}

/// Locate the document holding the product type for `mission` under
/// `extracted_dir`.
pub fn product_type_document(mission: Mission, extracted_dir: &Path) -> Option<PathBuf> {
    let profile = mission_profile(mission)?;
    match profile.source {
        ProductTypeSource::Manifest(name) => Some(extracted_dir.join(name)),
        ProductTypeSource::MtdScan => {
            let entries = std::fs::read_dir(extracted_dir).ok()?;
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with("MTD") {
                    return Some(extracted_dir.join(name));
                }
            }
            None
        }
    }
}

/// Resolve a record's product type from its metadata.
///
/// Returns the lowercased product type, or the "unknown" sentinel when the
/// mission is unrecognized, the document is missing or malformed, or no
/// candidate key is present. This is a normal terminal state, not an error.
pub fn product_type_from_metadata(mission: Mission, extracted_dir: &Path) -> String {
    let Some(profile) = mission_profile(mission) else {
        info!(mission = %mission, "no metadata rules for mission; product type stays unknown");
        return UNKNOWN_PRODUCT_TYPE.to_string();
    };
    let Some(doc_path) = product_type_document(mission, extracted_dir) else {
        info!(
            mission = %mission,
            dir = %extracted_dir.display(),
            "no product type document found"
        );
        return UNKNOWN_PRODUCT_TYPE.to_string();
    };

    let document = match parse_document(&doc_path) {
        Ok(document) => document,
        Err(e) => {
            info!(mission = %mission, error = %e, "could not read product type document");
            return UNKNOWN_PRODUCT_TYPE.to_string();
        }
    };

    for key in profile.product_type_keys {
        if let Some(value) = find_first(&document, key) {
            if let Some(text) = value.first_text() {
                if !text.is_empty() {
                    return text.to_lowercase();
                }
            }
        }
    }
    info!(mission = %mission, "no product type key present in metadata");
    UNKNOWN_PRODUCT_TYPE.to_string()
}

/// Extract the capture start/stop window from a parsed manifest. Either side
/// may be absent; a value that fails to parse is treated as absent.
pub fn capture_window(
    mission: Mission,
    document: &XmlValue,
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let Some(keys) = mission_profile(mission).and_then(|p| p.capture) else {
        return (None, None);
    };
    let start = lookup_datetime(document, keys.start, keys.format);
    let stop = lookup_datetime(document, keys.stop, keys.format);
    (start, stop)
}

fn lookup_datetime(document: &XmlValue, key: &str, format: &str) -> Option<NaiveDateTime> {
    let raw = find_first(document, key)?.first_text()?;
    match NaiveDateTime::parse_from_str(raw, format) {
        Ok(dt) => Some(dt),
        Err(e) => {
            debug!(key, raw, error = %e, "could not parse capture time");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_missing_file_is_not_found() {
        let err = parse_document(Path::new("/nonexistent/manifest.safe")).unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }

    #[test]
    fn test_parse_malformed_document() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "broken.xml", "<a><b>no close</a>");
        assert!(parse_document(&path).is_err());
    }

    #[test]
    fn test_find_first_depth_first_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "doc.xml",
            r#"<root><first><target>one</target></first><target>two</target></root>"#,
        );
        let doc = parse_document(&path).unwrap();
        let value = find_first(&doc, "target").unwrap();
        assert_eq!(value.first_text(), Some("one"));
    }

    #[test]
    fn test_repeated_keys_collapse_to_list() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "doc.xml",
            r#"<root><IMAGE_FILE>a/b01</IMAGE_FILE><IMAGE_FILE>a/b02</IMAGE_FILE></root>"#,
        );
        let doc = parse_document(&path).unwrap();
        let all = find_all(&doc, "IMAGE_FILE");
        let names: Vec<_> = all.iter().filter_map(|v| v.as_text()).collect();
        assert_eq!(names, vec!["a/b01", "a/b02"]);
        // first_text of the collapsed list is still the first occurrence
        assert_eq!(
            find_first(&doc, "IMAGE_FILE").unwrap().first_text(),
            Some("a/b01")
        );
    }

    #[test]
    fn test_product_type_from_s1_manifest() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "manifest.safe",
            r#"<xfdu:XFDU><metadataSection><s1sarl1:productType>GRD</s1sarl1:productType></metadataSection></xfdu:XFDU>"#,
        );
        let pt = product_type_from_metadata(Mission::Sentinel1A, dir.path());
        assert_eq!(pt, "grd");
    }

    #[test]
    fn test_product_type_second_candidate_key() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "manifest.safe",
            r#"<xfdu:XFDU><s1sarl2:productType>OCN</s1sarl2:productType></xfdu:XFDU>"#,
        );
        let pt = product_type_from_metadata(Mission::Sentinel1A, dir.path());
        assert_eq!(pt, "ocn");
    }

    #[test]
    fn test_product_type_from_mtd_scan() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "MTD_MSIL2A.xml",
            r#"<n1:Level-2A_User_Product><Product_Info><PRODUCT_TYPE>S2MSI2A</PRODUCT_TYPE></Product_Info></n1:Level-2A_User_Product>"#,
        );
        let pt = product_type_from_metadata(Mission::Sentinel2B, dir.path());
        assert_eq!(pt, "s2msi2a");
    }

    #[test]
    fn test_product_type_unknown_for_unsupported_mission() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            product_type_from_metadata(Mission::Landsat1, dir.path()),
            "unknown"
        );
        assert_eq!(
            product_type_from_metadata(Mission::Sentinel1A, dir.path()),
            "unknown"
        );
    }

    #[test]
    fn test_capture_window_s1() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "manifest.safe",
            r#"<m><safe:startTime>2023-01-15T05:33:01.123456</safe:startTime><safe:stopTime>2023-01-15T05:33:26.654321</safe:stopTime></m>"#,
        );
        let doc = parse_document(&path).unwrap();
        let (start, stop) = capture_window(Mission::Sentinel1A, &doc);
        assert_eq!(
            start.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2023-01-15 05:33:01"
        );
        assert!(stop.unwrap() > start.unwrap());
    }

    #[test]
    fn test_capture_window_s2_zulu_suffix() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "manifest.safe",
            r#"<m><safe:startTime>2023-06-30T10:40:29.024Z</safe:startTime></m>"#,
        );
        let doc = parse_document(&path).unwrap();
        let (start, stop) = capture_window(Mission::Sentinel2B, &doc);
        assert!(start.is_some());
        assert!(stop.is_none());
    }
}
