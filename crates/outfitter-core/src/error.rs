//! Fatal error conditions that abort a run before or during the roster loop.
//!
//! Per-app problems are not errors at the API boundary; they land in the run
//! report as failed outcomes. Only conditions that make every remaining app
//! pointless to attempt surface as `Err`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatalError {
    /// One or more records have neither a local binary nor a store identity,
    /// detected before any store call is made.
    #[error("no binary found or matched for: {}", missing.join(", "))]
    MissingBinaries { missing: Vec<String> },

    /// Local signing was requested but no zipalign binary could be resolved
    /// under the configured SDK.
    #[error("no zipalign binary found under {}", build_tools.display())]
    AlignToolMissing { build_tools: PathBuf },
}
