//! Run configuration loading and layering.
//!
//! Two layers feed a run:
//! - File: `outfitter.json` in the working directory, falling back to the
//!   user config directory
//! - Overrides: values collected from the command line
//!
//! Overrides win wherever they carry a value; unset override fields leave
//! the file layer in place.

pub mod merge;
pub mod schema;
pub mod store;

pub use merge::merge_configs;
pub use schema::{AppEntry, RunConfig};
pub use store::ConfigStore;

/// File name looked up in both config locations.
pub const CONFIG_FILE_NAME: &str = "outfitter.json";
