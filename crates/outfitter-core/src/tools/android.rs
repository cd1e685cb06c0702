//! Android SDK tool discovery and invocation.
//!
//! With `sdk_path` configured, adb lives under `platform-tools` and
//! zipalign under `build-tools` (either directly or in the newest
//! versioned subdirectory). Without it, both are taken from PATH.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::error::FatalError;

use super::{InstallOutcome, ToolRunner};

#[derive(Debug)]
pub struct AndroidTools {
    adb: PathBuf,
    zipalign: Option<PathBuf>,
}

impl AndroidTools {
    /// Locate adb and, when alignment will be needed, zipalign.
    ///
    /// Zipalign resolution happens here, before any app is touched, so a
    /// missing tool aborts the run instead of failing halfway through.
    pub fn discover(
        sdk_path: Option<&Path>,
        zipalign_override: Option<&Path>,
        need_align: bool,
    ) -> Result<Self> {
        let adb = match sdk_path {
            Some(sdk) => sdk.join("platform-tools").join("adb"),
            None => PathBuf::from("adb"),
        };
        debug!(adb = %adb.display(), "device bridge resolved");
        let zipalign = if need_align {
            let path = resolve_zipalign(sdk_path, zipalign_override)?;
            debug!(zipalign = %path.display(), "alignment tool resolved");
            Some(path)
        } else {
            None
        };
        Ok(Self { adb, zipalign })
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb
    }

    pub fn zipalign_path(&self) -> Option<&Path> {
        self.zipalign.as_deref()
    }
}

impl ToolRunner for AndroidTools {
    fn install(&self, binary: &Path) -> Result<InstallOutcome> {
        let output = Command::new(&self.adb)
            .arg("install")
            .arg(binary)
            .output()
            .with_context(|| format!("Failed to run {} install", self.adb.display()))?;
        // The bridge exits 0 even when the device refuses the binary, so
        // the transcript is the only reliable signal.
        let transcript = combined_text(&output);
        if install_reported_success(&transcript) {
            Ok(InstallOutcome::Installed)
        } else {
            Ok(InstallOutcome::Rejected { transcript })
        }
    }

    fn launch(&self, package: &str) -> Result<()> {
        let output = Command::new(&self.adb)
            .args([
                "shell",
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .output()
            .with_context(|| format!("Failed to run {} shell monkey", self.adb.display()))?;
        if !output.status.success() {
            bail!(
                "Launching {} failed: {}",
                package,
                combined_text(&output).trim()
            );
        }
        Ok(())
    }

    fn sign_file(&self, binary: &Path, keystore: &Path) -> Result<()> {
        let output = Command::new("jarsigner")
            .args(["-verbose", "-sigalg", "SHA1withRSA", "-digestalg", "SHA1", "-keystore"])
            .arg(keystore)
            .arg(binary)
            .arg("alias_name")
            .output()
            .context("Failed to run jarsigner")?;
        if !output.status.success() {
            bail!("jarsigner failed: {}", combined_text(&output).trim());
        }
        Ok(())
    }

    fn align_file(&self, src: &Path, dest: &Path) -> Result<()> {
        let Some(zipalign) = self.zipalign.as_deref() else {
            bail!("zipalign was not resolved for this run");
        };
        let output = Command::new(zipalign)
            .args(["-v", "4"])
            .arg(src)
            .arg(dest)
            .output()
            .with_context(|| format!("Failed to run {}", zipalign.display()))?;
        if !output.status.success() {
            bail!("zipalign failed: {}", combined_text(&output).trim());
        }
        Ok(())
    }
}

/// Whether an install transcript indicates success.
///
/// The scan is case-insensitive and substring-based; that is the contract
/// the bridge actually offers.
pub fn install_reported_success(transcript: &str) -> bool {
    transcript.to_lowercase().contains("success")
}

fn combined_text(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn resolve_zipalign(
    sdk_path: Option<&Path>,
    zipalign_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(explicit) = zipalign_override {
        return Ok(explicit.to_path_buf());
    }
    let Some(sdk) = sdk_path else {
        return Ok(PathBuf::from("zipalign"));
    };
    let build_tools = sdk.join("build-tools");
    let direct = build_tools.join("zipalign");
    if direct.is_file() {
        return Ok(direct);
    }
    match newest_build_tools(&build_tools)? {
        Some(version_dir) => Ok(version_dir.join("zipalign")),
        None => Err(FatalError::AlignToolMissing { build_tools }.into()),
    }
}

/// Newest versioned build-tools directory. Parseable versions order by
/// semver and beat unparseable names; unparseable names fall back to
/// lexical order among themselves.
fn newest_build_tools(build_tools: &Path) -> Result<Option<PathBuf>> {
    if !build_tools.is_dir() {
        return Ok(None);
    }
    let mut versions: Vec<(Option<semver::Version>, String)> = Vec::new();
    let entries = std::fs::read_dir(build_tools)
        .with_context(|| format!("Failed to read directory: {}", build_tools.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        versions.push((semver::Version::parse(&name).ok(), name));
    }
    versions.sort_by(|a, b| match (&a.0, &b.0) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => a.1.cmp(&b.1),
    });
    Ok(versions.pop().map(|(_, name)| build_tools.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn success_scan_is_case_insensitive() {
        assert!(install_reported_success("Success"));
        assert!(install_reported_success("   SUCCESS\n"));
        assert!(install_reported_success("Performing Streamed Install\nSuccess"));
        assert!(!install_reported_success(
            "Failure [INSTALL_FAILED_INSUFFICIENT_STORAGE]"
        ));
        assert!(!install_reported_success(""));
    }

    #[test]
    fn newest_build_tools_orders_by_version_not_lexically() {
        let sdk = TempDir::new().unwrap();
        let build_tools = sdk.path().join("build-tools");
        std::fs::create_dir_all(build_tools.join("9.0.0")).unwrap();
        std::fs::create_dir_all(build_tools.join("25.0.3")).unwrap();

        let newest = newest_build_tools(&build_tools).unwrap().unwrap();
        assert!(newest.ends_with("25.0.3"));
    }

    #[test]
    fn versioned_directories_beat_unparseable_names() {
        let sdk = TempDir::new().unwrap();
        let build_tools = sdk.path().join("build-tools");
        std::fs::create_dir_all(build_tools.join("zz-backup")).unwrap();
        std::fs::create_dir_all(build_tools.join("25.0.3")).unwrap();

        let newest = newest_build_tools(&build_tools).unwrap().unwrap();
        assert!(newest.ends_with("25.0.3"));
    }

    #[test]
    fn missing_build_tools_dir_yields_none() {
        let sdk = TempDir::new().unwrap();
        let newest = newest_build_tools(&sdk.path().join("build-tools")).unwrap();
        assert!(newest.is_none());
    }

    #[test]
    fn adb_resolves_under_sdk_platform_tools() {
        let sdk = TempDir::new().unwrap();
        let tools = AndroidTools::discover(Some(sdk.path()), None, false).unwrap();
        assert!(tools.adb_path().ends_with("platform-tools/adb"));
        assert!(tools.zipalign_path().is_none());

        let tools = AndroidTools::discover(None, None, false).unwrap();
        assert_eq!(tools.adb_path(), Path::new("adb"));
    }

    #[test]
    fn discovered_tools_format_for_diagnostics() {
        let tools = AndroidTools::discover(None, None, false).unwrap();
        let rendered = format!("{:?}", tools);
        assert!(rendered.contains("adb"));
    }
}
