//! Command Line Interface (CLI) layer for SATDEX.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for single-product and batch
//! ingestion flows. It wires user-provided options to the underlying
//! library functionality exposed via `satdex::api`.
//!
//! If you are embedding SATDEX into another application, prefer using
//! the high-level `satdex::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
