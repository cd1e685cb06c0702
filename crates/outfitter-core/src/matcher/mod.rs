//! Reconciles roster records against the working directory and the store.
//!
//! Three passes, all operating on the roster in place: local APK files,
//! store identities, and the signing keystore. Each pass follows the same
//! selection rule: zero candidates leaves the record untouched, exactly one
//! is taken without asking, more than one goes to a numbered prompt.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::gateway::{CatalogEntry, PublishedListing};
use crate::prompt::{Operator, select_numbered};
use crate::types::{AppRecord, AppRole};

/// Operating-system codes a catalog listing may carry.
pub const CATALOG_OS_CODES: [u32; 4] = [102, 103, 104, 105];

pub struct Matcher<'a> {
    operator: &'a dyn Operator,
}

impl<'a> Matcher<'a> {
    pub fn new(operator: &'a dyn Operator) -> Self {
        Self { operator }
    }

    /// Fill in missing `file_name`s from APK files in the given listing.
    pub fn resolve_files(&self, roster: &mut [AppRecord], dir_names: &[String]) -> Result<()> {
        if roster.iter().all(|record| record.file_name.is_some()) {
            return Ok(());
        }
        self.operator
            .notify("Checking local directory for needed APK files...");
        for record in roster.iter_mut() {
            if record.file_name.is_some() {
                continue;
            }
            let candidates: Vec<String> = dir_names
                .iter()
                .filter(|name| is_apk(name) && file_matches_role(record, name))
                .cloned()
                .collect();
            match candidates.len() {
                0 => debug!(role = record.role.slug(), "no local file candidates"),
                1 => {
                    self.operator.notify(&format!("    Using {}", candidates[0]));
                    record.file_name = Some(strip_apk(&candidates[0]));
                }
                _ => {
                    let choice = select_numbered(
                        self.operator,
                        "More than one possible file match found in directory",
                        &candidates,
                    )?;
                    record.file_name = Some(strip_apk(&candidates[choice]));
                }
            }
        }
        Ok(())
    }

    /// Fill in missing identity tokens by joining the app list against the
    /// published list on exact name equality.
    ///
    /// Records already holding both tokens are left alone. A selection
    /// always fills both at once; the pair comes from the same listing.
    pub fn resolve_identities(
        &self,
        roster: &mut [AppRecord],
        apps: &[CatalogEntry],
        published: &[PublishedListing],
    ) -> Result<()> {
        for record in roster.iter_mut() {
            if record.psk.is_some() && record.masked_psk.is_some() {
                continue;
            }
            let candidates = identity_candidates(record, apps, published);
            match candidates.len() {
                0 => debug!(role = record.role.slug(), "no store candidates"),
                1 => {
                    let (app, listing) = &candidates[0];
                    self.operator
                        .notify(&format!("    Matched {} on the store", app.name));
                    record.psk = Some(app.psk.clone());
                    record.masked_psk = Some(listing.id.clone());
                }
                _ => {
                    let labels: Vec<String> = candidates
                        .iter()
                        .map(|(app, _)| format!("{} - PSK: {}", app.name, app.psk))
                        .collect();
                    let choice = select_numbered(
                        self.operator,
                        "Please select the app you would like to update",
                        &labels,
                    )?;
                    let (app, listing) = &candidates[choice];
                    record.psk = Some(app.psk.clone());
                    record.masked_psk = Some(listing.id.clone());
                }
            }
        }
        Ok(())
    }

    /// Resolve the signing keystore when none is configured.
    pub fn resolve_keystore(
        &self,
        configured: Option<String>,
        dir_names: &[String],
    ) -> Result<Option<String>> {
        if configured.is_some() {
            return Ok(configured);
        }
        let candidates: Vec<String> = dir_names
            .iter()
            .filter(|name| name.contains(".keystore"))
            .cloned()
            .collect();
        match candidates.len() {
            0 => {
                debug!("no keystore candidates in directory");
                Ok(None)
            }
            1 => {
                self.operator.notify(&format!("    Using {}", candidates[0]));
                Ok(Some(candidates[0].clone()))
            }
            _ => {
                let choice = select_numbered(
                    self.operator,
                    "More than one keystore found in directory",
                    &candidates,
                )?;
                Ok(Some(candidates[choice].clone()))
            }
        }
    }
}

/// Names in a directory, sorted so selection lists are stable.
pub fn list_dir_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Matching form of a store name: spaces stripped, lower-cased.
pub fn normalize(name: &str) -> String {
    name.replace(' ', "").to_lowercase()
}

fn is_apk(name: &str) -> bool {
    name.len() >= 4
        && name.is_char_boundary(name.len() - 4)
        && name[name.len() - 4..].eq_ignore_ascii_case(".apk")
}

/// Base name with the extension removed, in whatever case [`is_apk`]
/// accepted it.
fn strip_apk(name: &str) -> String {
    if is_apk(name) {
        name[..name.len() - 4].to_string()
    } else {
        name.to_string()
    }
}

fn file_matches_role(record: &AppRecord, name: &str) -> bool {
    let lowered = name.to_lowercase();
    match record.role {
        AppRole::Catalog => lowered.contains("catalog"),
        AppRole::Vpn => lowered.contains("strongswan"),
        AppRole::Custom => match &record.metadata {
            Some(metadata) if !metadata.name.is_empty() => {
                lowered.contains(&normalize(&metadata.name))
            }
            _ => false,
        },
    }
}

fn listing_matches_role(record: &AppRecord, app: &CatalogEntry) -> bool {
    match record.role {
        AppRole::Catalog => {
            app.is_app_catalog && CATALOG_OS_CODES.contains(&app.operating_system)
        }
        AppRole::Vpn => app.name.to_lowercase().contains("strongswan"),
        AppRole::Custom => match &record.metadata {
            Some(metadata) if !metadata.name.is_empty() => {
                normalize(&app.name).contains(&normalize(&metadata.name))
            }
            _ => false,
        },
    }
}

fn identity_candidates<'c>(
    record: &AppRecord,
    apps: &'c [CatalogEntry],
    published: &'c [PublishedListing],
) -> Vec<(&'c CatalogEntry, &'c PublishedListing)> {
    let mut candidates = Vec::new();
    for app in apps {
        if !listing_matches_role(record, app) {
            continue;
        }
        for listing in published {
            if listing.name == app.name {
                candidates.push((app, listing));
            }
        }
    }
    candidates
}
