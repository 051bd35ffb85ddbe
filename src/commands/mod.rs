//! Command implementations
//!
//! Each module corresponds to an action of the CLI.

pub mod export;

pub use export::{run as export_run, ExportArgs};
