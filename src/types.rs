//! Shared types and enums used across SATDEX.
//! Includes `Mission`, `ResolutionBucket`, `IndexKind`, and the pipeline
//! `Stage` marker.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Satellite mission an archive was downloaded from.
///
/// The string forms ("sentinel-1a", "landsat-2", ...) are the ones stored on
/// records and used in import table names.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Mission {
    Sentinel1A,
    Sentinel1B,
    Sentinel2A,
    Sentinel2B,
    Sentinel3A,
    Sentinel3B,
    Sentinel5P,
    Landsat1,
    Landsat2,
    Landsat3,
    Unknown,
}

impl Mission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mission::Sentinel1A => "sentinel-1a",
            Mission::Sentinel1B => "sentinel-1b",
            Mission::Sentinel2A => "sentinel-2a",
            Mission::Sentinel2B => "sentinel-2b",
            Mission::Sentinel3A => "sentinel-3a",
            Mission::Sentinel3B => "sentinel-3b",
            Mission::Sentinel5P => "sentinel-5p",
            Mission::Landsat1 => "landsat-1",
            Mission::Landsat2 => "landsat-2",
            Mission::Landsat3 => "landsat-3",
            Mission::Unknown => "unknown",
        }
    }

    /// Short form used when composing import table names,
    /// e.g. "sentinel-2b" -> "s2b", "landsat-1" -> "l1".
    pub fn short_code(&self) -> String {
        let name = self.as_str();
        match name.split_once('-') {
            Some((family, tail)) => {
                let head = family.chars().next().unwrap_or('u');
                format!("{}{}", head, tail)
            }
            None => name.to_string(),
        }
    }

    /// Infer the mission from an archive or directory basename by its
    /// platform token (S1A, S2B, ...). Unrecognized names map to `Unknown`.
    pub fn from_archive_name(name: &str) -> Mission {
        let base = std::path::Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());
        let tokens = [
            ("S1A", Mission::Sentinel1A),
            ("S1B", Mission::Sentinel1B),
            ("S2A", Mission::Sentinel2A),
            ("S2B", Mission::Sentinel2B),
            ("S3A", Mission::Sentinel3A),
            ("S3B", Mission::Sentinel3B),
            ("S5P", Mission::Sentinel5P),
        ];
        for (token, mission) in tokens {
            if base.contains(token) {
                return mission;
            }
        }
        Mission::Unknown
    }

    pub fn parse(value: &str) -> Mission {
        match value.to_lowercase().as_str() {
            "sentinel-1a" => Mission::Sentinel1A,
            "sentinel-1b" => Mission::Sentinel1B,
            "sentinel-2a" => Mission::Sentinel2A,
            "sentinel-2b" => Mission::Sentinel2B,
            "sentinel-3a" => Mission::Sentinel3A,
            "sentinel-3b" => Mission::Sentinel3B,
            "sentinel-5p" => Mission::Sentinel5P,
            "landsat-1" => Mission::Landsat1,
            "landsat-2" => Mission::Landsat2,
            "landsat-3" => Mission::Landsat3,
            _ => Mission::Unknown,
        }
    }
}

impl std::fmt::Display for Mission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Manual implementation so CLI values match the stored mission strings
// ("sentinel-1a", not a case-mangled variant name)
impl ValueEnum for Mission {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Mission::Sentinel1A,
            Mission::Sentinel1B,
            Mission::Sentinel2A,
            Mission::Sentinel2B,
            Mission::Sentinel3A,
            Mission::Sentinel3B,
            Mission::Sentinel5P,
            Mission::Landsat1,
            Mission::Landsat2,
            Mission::Landsat3,
            Mission::Unknown,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Nominal ground sampling distance bucket of a band raster.
///
/// The bucket set is closed: band handles are grouped under exactly these
/// four keys on a record.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum ResolutionBucket {
    Unknown,
    R10m,
    R20m,
    R60m,
}

impl ResolutionBucket {
    pub const ALL: [ResolutionBucket; 4] = [
        ResolutionBucket::Unknown,
        ResolutionBucket::R10m,
        ResolutionBucket::R20m,
        ResolutionBucket::R60m,
    ];

    /// Buckets in lookup-preference order, finest first.
    pub const FINEST_FIRST: [ResolutionBucket; 4] = [
        ResolutionBucket::R10m,
        ResolutionBucket::R20m,
        ResolutionBucket::R60m,
        ResolutionBucket::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionBucket::Unknown => "unknown",
            ResolutionBucket::R10m => "r10m",
            ResolutionBucket::R20m => "r20m",
            ResolutionBucket::R60m => "r60m",
        }
    }

    pub fn meters(&self) -> Option<u32> {
        match self {
            ResolutionBucket::Unknown => None,
            ResolutionBucket::R10m => Some(10),
            ResolutionBucket::R20m => Some(20),
            ResolutionBucket::R60m => Some(60),
        }
    }
}

impl std::fmt::Display for ResolutionBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spectral index (or composite) a record can be rendered into.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
pub enum IndexKind {
    Ndvi,
    Evi,
    Ndwi,
    Smi,
    Ndsi,
    Rgb,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Evi => "evi",
            IndexKind::Ndwi => "ndwi",
            IndexKind::Smi => "smi",
            IndexKind::Ndsi => "ndsi",
            IndexKind::Rgb => "rgb",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline stages in execution order. A run walks this sequence exactly
/// once per record and always terminates in `Done`, even when individual
/// stages fail softly.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Stage {
    ProductTypeResolved,
    PathsResolved,
    MetadataAttached,
    GeometryResolved,
    GroupingResolved,
    BandsDiscovered,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::ProductTypeResolved => "ProductTypeResolved",
            Stage::PathsResolved => "PathsResolved",
            Stage::MetadataAttached => "MetadataAttached",
            Stage::GeometryResolved => "GeometryResolved",
            Stage::GroupingResolved => "GroupingResolved",
            Stage::BandsDiscovered => "BandsDiscovered",
            Stage::Done => "Done",
        };
        write!(f, "{}", s)
    }
}

/// Sentinel value for product types that match no known table.
pub const UNKNOWN_PRODUCT_TYPE: &str = "unknown";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_short_code() {
        assert_eq!(Mission::Sentinel1A.short_code(), "s1a");
        assert_eq!(Mission::Sentinel2B.short_code(), "s2b");
        assert_eq!(Mission::Landsat1.short_code(), "l1");
        assert_eq!(Mission::Unknown.short_code(), "unknown");
    }

    #[test]
    fn test_mission_from_archive_name() {
        assert_eq!(
            Mission::from_archive_name("S2B_MSIL2A_20231231T104429_N0510_R008_T32ULC.SAFE"),
            Mission::Sentinel2B
        );
        assert_eq!(
            Mission::from_archive_name("/data/extracted/S1A_IW_GRDH_1SDV_20230101.SAFE"),
            Mission::Sentinel1A
        );
        assert_eq!(Mission::from_archive_name("random_dir"), Mission::Unknown);
    }

    #[test]
    fn test_mission_parse_roundtrip() {
        for mission in [
            Mission::Sentinel1A,
            Mission::Sentinel3B,
            Mission::Landsat3,
            Mission::Unknown,
        ] {
            assert_eq!(Mission::parse(mission.as_str()), mission);
        }
        assert_eq!(Mission::parse("sentinel-9z"), Mission::Unknown);
    }

    #[test]
    fn test_bucket_strings() {
        assert_eq!(ResolutionBucket::R10m.as_str(), "r10m");
        assert_eq!(ResolutionBucket::Unknown.meters(), None);
        assert_eq!(ResolutionBucket::R60m.meters(), Some(60));
    }
}
