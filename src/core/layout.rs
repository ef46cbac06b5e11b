//! Product layout resolution: which metadata and thumbnail files a concrete
//! product variant ships, and under which literal names.
//!
//! Every file name here is fixed by the delivering ground segment and must
//! match byte-for-byte. Membership in each capability table is keyed on the
//! lowercase product type; unknown product types resolve to an empty layout
//! rather than an error.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Mission;

// Product types shipping a `manifest.safe` at the archive root.
const HAS_MANIFEST: &[&str] = &[
    // Sentinel-1
    "grd",
    "grd cog",
    "ocn",
    "raw",
    "slc",
    // Sentinel-2
    "s2msi1c",
    "s2msi2a",
    // Sentinel-3
    "ol_2_wfr___",
    "ol_2_wrr___",
    "sl_2_aod___",
    "sl_2_frp___",
    "sl_2_wst___",
];

// Product types shipping an `INSPIRE.xml`.
const HAS_INSPIRE: &[&str] = &["s2msi1c", "s2msi2a"];

// Product types shipping an `xfdumanifest.xml`.
const HAS_XFDU: &[&str] = &[
    "sy_2_aod___",
    "ol_1_err___",
    "ol_2_lfr___",
    "ol_2_lrr___",
    "sl_1_rbt___",
    "sl_2_aod___",
    "sl_2_frp___",
    "sl_2_lst___",
    "sl_2_wst___",
    "sy_2_syn___",
    "sy_2_v10___",
    "sy_2_vg1___",
    "sy_2_vgp___",
];

// Product types shipping an `EOPMetadata.xml`.
const HAS_EOP_METADATA: &[&str] = &["sl_2_aod___", "sl_2_frp___", "sl_2_wst___"];

// Product types shipping an image-specific `MTD_{TYPE}.xml`.
const HAS_IMG_METADATA: &[&str] = &["s2msi1c", "s2msi2a"];

// Thumbnail conventions, checked in order.
const HAS_ARCHIVE_QL_THUMB: &[&str] = &["s2msi1c"];
const HAS_QUICK_LOOK_THUMB: &[&str] = &["grd", "grd cog", "slc"];
const HAS_QUICKLOOK_THUMB: &[&str] = &[
    "ol_1_efr___",
    "ol_1_err___",
    "ol_2_lfr___",
    "ol_2_lrr___",
    "sl_1_rbt___",
    "sl_2_frp___",
    "sl_2_lst___",
    "sy_2_syn___",
    "sy_2_v10___",
    "sy_2_vg1___",
];
const HAS_BROWSE_THUMB: &[&str] = &["ol_2_wfr___", "ol_2_wrr___", "sl_2_aod___", "sl_2_frp___", "sl_2_wst___"];

// Every product type any supported mission is known to deliver. Product
// types extracted from metadata but absent here collapse to "unknown".
const KNOWN_PRODUCT_TYPES: &[&str] = &[
    // Sentinel-1
    "grd",
    "grd cog",
    "ocn",
    "raw",
    "slc",
    // Sentinel-2
    "s2msi1c",
    "s2msi2a",
    // Sentinel-3 OLCI
    "ol_1_efr___",
    "ol_1_err___",
    "ol_2_lfr___",
    "ol_2_lrr___",
    "ol_2_wfr___",
    "ol_2_wrr___",
    // Sentinel-3 SLSTR
    "sl_1_rbt___",
    "sl_2_aod___",
    "sl_2_frp___",
    "sl_2_lst___",
    "sl_2_wst___",
    // Sentinel-3 SYNERGY
    "sy_2_aod___",
    "sy_2_syn___",
    "sy_2_v10___",
    "sy_2_vg1___",
    "sy_2_vgp___",
];

/// Whether a lowercase product type string is one any supported mission
/// delivers.
pub fn is_known_product_type(product_type: &str) -> bool {
    KNOWN_PRODUCT_TYPES.contains(&product_type)
}

/// Thumbnail naming convention a product type follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailKind {
    None,
    /// `{archive-basename}-ql.jpg` at the archive root.
    ArchiveQl,
    /// `preview/quick-look-l2-owi.png` (OCN; owi and rvl exist, owi is used).
    OcnQuickLook,
    /// `preview/quick-look.png`.
    QuickLook,
    /// `quicklook.jpg`.
    Quicklook,
    /// `browse.jpg`.
    Browse,
}

/// Capability flags for one product type. This is the single versioned table
/// the resolver works from; each flag corresponds to one literal file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub manifest: bool,
    pub inspire: bool,
    pub xfdu_manifest: bool,
    pub eop_metadata: bool,
    pub img_metadata: bool,
    pub thumbnail: ThumbnailKind,
}

impl Capabilities {
    /// Look up the capability row for a product type. Total: product types
    /// outside every table come back with all flags off.
    pub fn for_product_type(product_type: &str) -> Capabilities {
        let thumbnail = if HAS_ARCHIVE_QL_THUMB.contains(&product_type) {
            ThumbnailKind::ArchiveQl
        } else if product_type == "ocn" {
            ThumbnailKind::OcnQuickLook
        } else if HAS_QUICK_LOOK_THUMB.contains(&product_type) {
            ThumbnailKind::QuickLook
        } else if HAS_QUICKLOOK_THUMB.contains(&product_type) {
            ThumbnailKind::Quicklook
        } else if HAS_BROWSE_THUMB.contains(&product_type) {
            ThumbnailKind::Browse
        } else {
            ThumbnailKind::None
        };
        Capabilities {
            manifest: HAS_MANIFEST.contains(&product_type),
            inspire: HAS_INSPIRE.contains(&product_type),
            xfdu_manifest: HAS_XFDU.contains(&product_type),
            eop_metadata: HAS_EOP_METADATA.contains(&product_type),
            img_metadata: HAS_IMG_METADATA.contains(&product_type),
            thumbnail,
        }
    }
}

/// Metadata and thumbnail paths a product variant is known to contain,
/// relative to the extracted archive root. Absent entries mean the variant
/// does not ship that file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPaths {
    pub manifest: Option<PathBuf>,
    pub inspire: Option<PathBuf>,
    pub xfdu_manifest: Option<PathBuf>,
    pub eop_metadata: Option<PathBuf>,
    pub img_metadata: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
}

/// Archive basename without the trailing extension chain
/// ("S2B_MSIL1C_X.SAFE" -> "S2B_MSIL1C_X").
fn archive_stem(extracted_dir: &Path) -> String {
    let base = extracted_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    base.split('.').next().unwrap_or("").to_string()
}

/// Resolve the layout for a product. A pure table lookup with no failure
/// mode; every (mission, product type) maps to some, possibly mostly empty,
/// result.
pub fn resolve(mission: Mission, product_type: &str, extracted_dir: &Path) -> LayoutPaths {
    let caps = Capabilities::for_product_type(product_type);
    let mut layout = LayoutPaths::default();

    if caps.manifest {
        layout.manifest = Some(PathBuf::from("manifest.safe"));
    }
    if caps.inspire {
        layout.inspire = Some(PathBuf::from("INSPIRE.xml"));
    }
    if caps.xfdu_manifest {
        layout.xfdu_manifest = Some(PathBuf::from("xfdumanifest.xml"));
    }
    if caps.eop_metadata {
        layout.eop_metadata = Some(PathBuf::from("EOPMetadata.xml"));
    }
    if caps.img_metadata {
        layout.img_metadata = Some(PathBuf::from(format!(
            "MTD_{}.xml",
            product_type.to_uppercase()
        )));
    }
    layout.thumbnail = match caps.thumbnail {
        ThumbnailKind::None => None,
        ThumbnailKind::ArchiveQl => {
            Some(PathBuf::from(format!("{}-ql.jpg", archive_stem(extracted_dir))))
        }
        ThumbnailKind::OcnQuickLook => Some(PathBuf::from("preview/quick-look-l2-owi.png")),
        ThumbnailKind::QuickLook => Some(PathBuf::from("preview/quick-look.png")),
        ThumbnailKind::Quicklook => Some(PathBuf::from("quicklook.jpg")),
        ThumbnailKind::Browse => Some(PathBuf::from("browse.jpg")),
    };

    if layout == LayoutPaths::default() {
        info!(
            mission = %mission,
            product_type,
            "product type not in any layout table; resolved an empty layout"
        );
    }
    layout
}

/// Whether a product type's coordinates can be read from `manifest.safe`.
pub fn has_manifest(product_type: &str) -> bool {
    HAS_MANIFEST.contains(&product_type)
}
