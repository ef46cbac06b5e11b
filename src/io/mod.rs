//! I/O layer: metadata document parsing and the external collaborators the
//! pipeline talks to (raster reader, raster import utility, reverse
//! geocoder). Collaborators are traits so deployments and tests can swap the
//! backing services.
pub mod metadata;
pub use metadata::{MetadataError, XmlValue};

pub mod raster;
pub use raster::{GdalRasterReader, RasterError, RasterReader};

pub mod import;
pub use import::{DbConfig, DryRunImporter, ImportError, Raster2PgsqlImporter, RasterImporter};

pub mod geocode;
pub use geocode::{GeocodeError, NominatimGeocoder, ReverseGeocoder};
