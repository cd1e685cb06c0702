//! Local tool invocations behind a trait.
//!
//! The device bridge and the signing toolchain are external binaries; the
//! pipelines only see [`ToolRunner`] so tests can swap in a fake.

pub mod android;

use std::path::Path;

use anyhow::Result;

pub use android::AndroidTools;

/// Result of a device install attempt.
///
/// A rejection is not an `Err`: the bridge ran fine, the device said no.
/// The raw transcript rides along for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Rejected { transcript: String },
}

impl InstallOutcome {
    pub fn ok(&self) -> bool {
        matches!(self, InstallOutcome::Installed)
    }
}

pub trait ToolRunner: Send + Sync {
    /// Sideload a binary onto the connected device.
    fn install(&self, binary: &Path) -> Result<InstallOutcome>;

    /// Launch an installed package on the device.
    fn launch(&self, package: &str) -> Result<()>;

    /// Sign an APK in place against a keystore.
    fn sign_file(&self, binary: &Path, keystore: &Path) -> Result<()>;

    /// Byte-align an APK into `dest`.
    fn align_file(&self, src: &Path, dest: &Path) -> Result<()>;
}
