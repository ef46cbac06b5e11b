//! Core pipeline building blocks: the layout tables, geometry, band
//! discovery, index computation, and the attribute-resolution pipeline that
//! sequences them. These are consumed by the high-level `api` module.
pub mod discovery;
pub mod geometry;
pub mod indices;
pub mod layout;
pub mod params;
pub mod pipeline;
