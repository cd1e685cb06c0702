//! APK sanity checks and artifact fingerprints.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

/// Check that a file is a plausible APK before shipping it anywhere: a
/// readable zip archive with an `AndroidManifest.xml` entry.
pub fn verify_apk(path: &Path) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid apk archive", path.display()))?;
    archive
        .by_name("AndroidManifest.xml")
        .with_context(|| format!("{} has no AndroidManifest.xml", path.display()))?;
    Ok(())
}

/// Content hash of an artifact, hex-encoded.
pub fn fingerprint(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to hash {}", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_apk(path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("AndroidManifest.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<manifest/>").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn verify_accepts_archive_with_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("good.apk");
        write_apk(&path);
        verify_apk(&path).unwrap();
    }

    #[test]
    fn verify_rejects_non_zip_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.apk");
        std::fs::write(&path, b"plainly not a zip").unwrap();

        let err = verify_apk(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("not a valid apk archive"));
    }

    #[test]
    fn verify_rejects_zip_without_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.apk");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("README.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        writer.finish().unwrap();

        let err = verify_apk(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("AndroidManifest.xml"));
    }

    #[test]
    fn fingerprint_is_stable_per_content() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        std::fs::write(&first, b"identical").unwrap();
        std::fs::write(&second, b"identical").unwrap();

        assert_eq!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());

        std::fs::write(&second, b"different").unwrap();
        assert_ne!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());
    }
}
