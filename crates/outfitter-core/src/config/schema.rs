//! Configuration schema for `outfitter.json`.

use serde::{Deserialize, Serialize};

use crate::types::{AppMetadata, AppPsk, AppRole, MaskedPsk, RunAction};

/// Everything a run can be told from config or the command line.
///
/// Every field is optional so partial files parse; resolution of required
/// values (credentials, endpoints) happens after merging, where missing
/// pieces can still be prompted for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Store account name.
    pub user: Option<String>,
    /// Store account password. Prompted for when absent.
    pub password: Option<String>,
    /// Base URL of the upload endpoint.
    pub legacy_endpoint: Option<String>,
    /// Base URL of the management API.
    pub api_endpoint: Option<String>,

    /// Sign downloaded binaries locally instead of through the store.
    pub sign_local: bool,
    /// Keystore file used for local signing.
    pub keystore: Option<String>,
    /// Signing-credentials identifier passed to the store's sign call.
    pub credentials_psk: Option<String>,

    /// Local binary name for the app catalog client, without extension.
    pub catalog_apk: Option<String>,
    /// Known store identity for the app catalog client.
    pub catalog_psk: Option<AppPsk>,
    pub catalog_metadata: Option<AppMetadata>,
    /// Wrap policies for the catalog client; defaults apply when unset.
    pub catalog_policies: Option<Vec<u32>>,

    /// Local binary name for the VPN client, without extension.
    pub vpn_apk: Option<String>,
    /// Known store identity for the VPN client.
    pub vpn_psk: Option<AppPsk>,
    pub vpn_metadata: Option<AppMetadata>,
    /// Wrap policies for the VPN client; defaults apply when unset.
    pub vpn_policies: Option<Vec<u32>>,

    /// Caller-defined roster. Non-empty replaces the default catalog/vpn pair.
    pub apps: Vec<AppEntry>,

    /// Android SDK root, for adb and zipalign discovery.
    pub sdk_path: Option<String>,
    /// Explicit zipalign binary, overriding SDK discovery.
    pub zipalign_path: Option<String>,

    pub verbose: bool,
    /// What to run when no subcommand is given.
    pub action: Option<RunAction>,
}

/// One roster entry from the `apps` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppEntry {
    pub role: AppRole,
    pub file_name: Option<String>,
    pub psk: Option<AppPsk>,
    pub masked_psk: Option<MaskedPsk>,
    pub metadata: Option<AppMetadata>,
    pub policies: Option<Vec<u32>>,
}

impl Default for AppEntry {
    fn default() -> Self {
        Self {
            role: AppRole::Custom,
            file_name: None,
            psk: None,
            masked_psk: None,
            metadata: None,
            policies: None,
        }
    }
}
