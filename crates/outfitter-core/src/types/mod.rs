//! Shared domain types for app records and their remote identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role an app record plays in a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    /// Enterprise app catalog client.
    Catalog,
    /// StrongSwan VPN client.
    Vpn,
    /// Caller-defined app, matched by its metadata name.
    Custom,
}

impl AppRole {
    pub fn slug(&self) -> &'static str {
        match self {
            AppRole::Catalog => "catalog",
            AppRole::Vpn => "vpn",
            AppRole::Custom => "custom",
        }
    }
}

/// Identifier of a published store listing.
///
/// Valid for upload/update calls only; wrap, sign, and download reject it.
/// The unmasked form is [`AppPsk`], obtainable only through a details lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskedPsk(String);

impl MaskedPsk {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaskedPsk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the app record itself.
///
/// The token wrap, sign, and download calls require. Never interchangeable
/// with [`MaskedPsk`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppPsk(String);

impl AppPsk {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppPsk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-facing app metadata, required before the first upload.
///
/// Field names follow the store's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub author: String,
    pub name: String,
    #[serde(rename = "shortdescription")]
    pub short_description: String,
    #[serde(rename = "longdescription")]
    pub long_description: String,
    pub version: String,
    #[serde(rename = "versionNotes")]
    pub version_notes: String,
}

/// Whether server-side wrapping has been attempted for a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapState {
    #[default]
    Unknown,
    Succeeded,
    Failed,
}

/// What a run should do, from config or the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunAction {
    /// Sideload onto a connected device.
    Device,
    /// Upload, wrap, and sign against the store.
    #[default]
    Org,
    /// Org update first, then device provisioning.
    Both,
}

/// One app to reconcile and drive through a pipeline.
///
/// Mutated in place across a run: the matcher fills identity fields, the
/// pipelines resolve the unmasked psk and thread file-name suffixes as the
/// binary passes through wrap, sign, and align stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRecord {
    pub role: AppRole,
    /// Local binary identifier without the `.apk` extension.
    pub file_name: Option<String>,
    pub masked_psk: Option<MaskedPsk>,
    pub psk: Option<AppPsk>,
    pub metadata: Option<AppMetadata>,
    /// Wrap-policy codes, applied in order. Empty means do not wrap.
    pub policies: Vec<u32>,
    pub wrapped: WrapState,
}

impl AppRecord {
    pub fn new(role: AppRole) -> Self {
        Self {
            role,
            file_name: None,
            masked_psk: None,
            psk: None,
            metadata: None,
            policies: Vec::new(),
            wrapped: WrapState::Unknown,
        }
    }

    /// Set the local binary identifier.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the unmasked identity token.
    pub fn with_psk(mut self, psk: AppPsk) -> Self {
        self.psk = Some(psk);
        self
    }

    /// Set the masked (published listing) identity token.
    pub fn with_masked_psk(mut self, masked: MaskedPsk) -> Self {
        self.masked_psk = Some(masked);
        self
    }

    /// Set the store metadata.
    pub fn with_metadata(mut self, metadata: AppMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the wrap-policy codes.
    pub fn with_policies(mut self, policies: impl Into<Vec<u32>>) -> Self {
        self.policies = policies.into();
        self
    }

    /// Display name for operator-facing output.
    pub fn display_name(&self) -> String {
        if let Some(metadata) = &self.metadata
            && !metadata.name.is_empty()
        {
            return metadata.name.clone();
        }
        if let Some(file_name) = &self.file_name {
            return file_name.clone();
        }
        self.role.slug().to_string()
    }

    /// Path of the tracked binary, once a file name is resolved.
    pub fn apk_path(&self) -> Option<String> {
        self.file_name.as_ref().map(|name| format!("{}.apk", name))
    }
}
