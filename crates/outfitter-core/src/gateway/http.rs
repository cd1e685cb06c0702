//! Blocking HTTP implementation of the store gateway.
//!
//! The store is split across two bases: the legacy endpoint accepts binary
//! uploads, the management API everything else. Authentication happens once
//! at connect time; every later call carries the session token in an
//! `X-TOKEN` header.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, Response, multipart::Form};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::types::{AppMetadata, AppPsk, MaskedPsk};

use super::{CatalogEntry, PublishedListing, StoreGateway, StoreReply};

const USER_AGENT: &str = concat!("outfitter/", env!("CARGO_PKG_VERSION"));

pub struct HttpGateway {
    client: Client,
    legacy_base: Url,
    api_base: Url,
    token: String,
}

impl HttpGateway {
    /// Authenticate against the management API and keep the session token.
    pub fn connect(
        legacy_endpoint: &str,
        api_endpoint: &str,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        let legacy_base = normalize_base(legacy_endpoint)?;
        let api_base = normalize_base(api_endpoint)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        debug!(api = %api_base, "authenticating");
        let response = client
            .post(api_base.join("users/authenticate/")?)
            .json(&serde_json::json!({ "user_id": user, "password": password }))
            .send()
            .context("Failed to reach the authentication endpoint")?;
        let reply = reply_from(response)?;
        if !reply.ok() {
            bail!(
                "Authentication failed with status {}: {}",
                reply.status,
                reply.result_text()
            );
        }
        let token = reply
            .result
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Authentication reply did not contain a token"))?
            .to_string();

        Ok(Self {
            client,
            legacy_base,
            api_base,
            token,
        })
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))
    }

    fn legacy_url(&self, path: &str) -> Result<Url> {
        self.legacy_base
            .join(path)
            .with_context(|| format!("Invalid upload path: {}", path))
    }

    fn binary_form(binary: &Path, metadata: &AppMetadata) -> Result<Form> {
        let form = Form::new()
            .text("metadata", serde_json::to_string(metadata)?)
            .file("binary", binary)
            .with_context(|| format!("Failed to read binary: {}", binary.display()))?;
        Ok(form)
    }
}

impl StoreGateway for HttpGateway {
    fn list_apps(&self) -> Result<Vec<CatalogEntry>> {
        let response = self
            .client
            .get(self.api_url("applications/")?)
            .header("X-TOKEN", &self.token)
            .send()
            .context("Failed to list apps")?;
        let reply = reply_from(response)?;
        if !reply.ok() {
            bail!(
                "App listing failed with status {}: {}",
                reply.status,
                reply.result_text()
            );
        }
        let entries = reply
            .result
            .get("applications")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(entries).context("Unexpected app listing shape")
    }

    fn list_published(&self) -> Result<Vec<PublishedListing>> {
        let response = self
            .client
            .get(self.api_url("applications/published/")?)
            .header("X-TOKEN", &self.token)
            .send()
            .context("Failed to list published apps")?;
        let reply = reply_from(response)?;
        if !reply.ok() {
            bail!(
                "Published listing failed with status {}: {}",
                reply.status,
                reply.result_text()
            );
        }
        let entries = reply
            .result
            .get("applications")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(entries).context("Unexpected published listing shape")
    }

    fn upload(&self, binary: &Path, metadata: &AppMetadata) -> Result<StoreReply> {
        debug!(binary = %binary.display(), "uploading new app");
        let response = self
            .client
            .post(self.legacy_url("applications/")?)
            .header("X-TOKEN", &self.token)
            .multipart(Self::binary_form(binary, metadata)?)
            .send()
            .context("Failed to upload binary")?;
        reply_from(response)
    }

    fn update(
        &self,
        masked: &MaskedPsk,
        metadata: &AppMetadata,
        binary: &Path,
    ) -> Result<StoreReply> {
        debug!(binary = %binary.display(), %masked, "updating existing app");
        let response = self
            .client
            .post(self.legacy_url(&format!("applications/{}/", masked))?)
            .header("X-TOKEN", &self.token)
            .multipart(Self::binary_form(binary, metadata)?)
            .send()
            .context("Failed to upload updated binary")?;
        reply_from(response)
    }

    fn app_details(&self, masked: &MaskedPsk) -> Result<StoreReply> {
        let response = self
            .client
            .get(self.api_url(&format!("applications/{}/", masked))?)
            .header("X-TOKEN", &self.token)
            .send()
            .context("Failed to fetch app details")?;
        reply_from(response)
    }

    fn download(&self, psk: &AppPsk, dest: &Path) -> Result<StoreReply> {
        let mut response = self
            .client
            .get(self.api_url(&format!("applications/{}/binary/", psk))?)
            .header("X-TOKEN", &self.token)
            .send()
            .context("Failed to download binary")?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().unwrap_or_default();
            return Ok(StoreReply {
                status,
                result: Value::String(text),
            });
        }
        let mut file = File::create(dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        response
            .copy_to(&mut file)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(StoreReply {
            status,
            result: Value::Null,
        })
    }

    fn sign(&self, psk: &AppPsk, credentials: &str) -> Result<StoreReply> {
        let response = self
            .client
            .post(self.api_url(&format!("applications/{}/sign/", psk))?)
            .header("X-TOKEN", &self.token)
            .json(&serde_json::json!({ "credentials_psk": credentials }))
            .send()
            .context("Failed to request signing")?;
        reply_from(response)
    }

    fn toggle_enabled(&self, psk: &AppPsk, enabled: bool) -> Result<()> {
        let response = self
            .client
            .post(self.api_url(&format!("applications/{}/enabled/", psk))?)
            .header("X-TOKEN", &self.token)
            .json(&serde_json::json!({ "enabled": enabled }))
            .send()
            .context("Failed to toggle publish state")?;
        let reply = reply_from(response)?;
        if !reply.ok() {
            bail!(
                "Publish toggle failed with status {}: {}",
                reply.status,
                reply.result_text()
            );
        }
        Ok(())
    }

    fn wrap(&self, psk: &AppPsk, policies: &[u32]) -> Result<StoreReply> {
        let response = self
            .client
            .post(self.api_url(&format!("applications/{}/wrap/", psk))?)
            .header("X-TOKEN", &self.token)
            .json(&serde_json::json!({ "policies": policies }))
            .send()
            .context("Failed to request wrapping")?;
        reply_from(response)
    }
}

/// Normalize an endpoint into a base URL: default to https when no scheme
/// is given, and keep a trailing slash so joins append instead of replace.
fn normalize_base(raw: &str) -> Result<Url> {
    let mut text = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    if !text.ends_with('/') {
        text.push('/');
    }
    Url::parse(&text).with_context(|| format!("Invalid endpoint: {}", raw))
}

/// Map an HTTP response into the store's status/result shape. A body with a
/// `result` member is unwrapped to it; anything else is kept whole so
/// diagnostics survive.
fn reply_from(response: Response) -> Result<StoreReply> {
    let status = response.status().as_u16();
    let text = response.text().context("Failed to read store reply")?;
    let result = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(mut body)) if body.contains_key("result") => {
            body.remove("result").unwrap_or(Value::Null)
        }
        Ok(other) => other,
        Err(_) => Value::String(text),
    };
    Ok(StoreReply { status, result })
}
