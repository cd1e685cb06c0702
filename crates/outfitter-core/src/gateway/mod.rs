//! Remote app store gateway.
//!
//! Pipelines talk to the store exclusively through [`StoreGateway`], so the
//! HTTP client stays swappable for an in-memory fake. Replies keep the
//! store's status/result shape instead of mapping every non-200 to `Err`:
//! a rejected call is a per-app outcome, not a run-level error.

pub mod http;

use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{AppMetadata, AppPsk, MaskedPsk};

pub use http::HttpGateway;

/// Outcome of a single store call.
#[derive(Debug, Clone)]
pub struct StoreReply {
    /// HTTP-style status code.
    pub status: u16,
    /// The call's result payload, `Null` when the store sent none.
    pub result: Value,
}

impl StoreReply {
    pub fn ok(&self) -> bool {
        self.status == 200
    }

    /// Result payload as text, for replies carrying a bare token and for
    /// diagnostics on rejected calls.
    pub fn result_text(&self) -> String {
        match &self.result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// One row of the full app listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub psk: AppPsk,
    pub name: String,
    #[serde(default)]
    pub is_app_catalog: bool,
    #[serde(default)]
    pub operating_system: u32,
}

/// One row of the published listing.
///
/// The listing's ID is the masked token; the unmasked one never appears
/// here.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedListing {
    #[serde(rename = "ID")]
    pub id: MaskedPsk,
    pub name: String,
}

/// Operations the app store exposes.
///
/// Token discipline is encoded in the signatures: upload, update, and the
/// details lookup work on the masked token; wrap, sign, toggle, and
/// download require the unmasked one.
pub trait StoreGateway: Send + Sync {
    /// Full app listing, one entry per app record.
    fn list_apps(&self) -> Result<Vec<CatalogEntry>>;

    /// Published listings only.
    fn list_published(&self) -> Result<Vec<PublishedListing>>;

    /// Upload a new binary with its metadata. A successful reply carries
    /// the new record's masked token.
    fn upload(&self, binary: &Path, metadata: &AppMetadata) -> Result<StoreReply>;

    /// Replace the binary of an existing record.
    fn update(&self, masked: &MaskedPsk, metadata: &AppMetadata, binary: &Path)
    -> Result<StoreReply>;

    /// Record details for a masked token. The reply's `psk` field is the
    /// unmasked token.
    fn app_details(&self, masked: &MaskedPsk) -> Result<StoreReply>;

    /// Download the record's current binary to `dest`.
    fn download(&self, psk: &AppPsk, dest: &Path) -> Result<StoreReply>;

    /// Sign the binary server-side with stored credentials.
    fn sign(&self, psk: &AppPsk, credentials: &str) -> Result<StoreReply>;

    /// Publish or unpublish the record.
    fn toggle_enabled(&self, psk: &AppPsk, enabled: bool) -> Result<()>;

    /// Apply wrap policies to the binary, in order.
    fn wrap(&self, psk: &AppPsk, policies: &[u32]) -> Result<StoreReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_is_exactly_200() {
        let reply = StoreReply {
            status: 200,
            result: Value::Null,
        };
        assert!(reply.ok());

        let reply = StoreReply {
            status: 201,
            result: Value::Null,
        };
        assert!(!reply.ok());
    }

    #[test]
    fn result_text_unwraps_bare_strings() {
        let reply = StoreReply {
            status: 200,
            result: Value::String("masked-42".to_string()),
        };
        assert_eq!(reply.result_text(), "masked-42");

        let reply = StoreReply {
            status: 500,
            result: serde_json::json!({"error": "boom"}),
        };
        assert_eq!(reply.result_text(), r#"{"error":"boom"}"#);
    }

    #[test]
    fn published_listing_reads_uppercase_id() {
        let listing: PublishedListing =
            serde_json::from_str(r#"{"ID": "masked-7", "name": "Expenses"}"#).unwrap();
        assert_eq!(listing.id.as_str(), "masked-7");
    }

    #[test]
    fn catalog_entry_defaults_optional_fields() {
        let entry: CatalogEntry =
            serde_json::from_str(r#"{"psk": "42", "name": "Expenses"}"#).unwrap();
        assert!(!entry.is_app_catalog);
        assert_eq!(entry.operating_system, 0);
    }
}
