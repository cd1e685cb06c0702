//! Shared fakes for pipeline and matcher tests: an in-memory store
//! gateway, a scripted tool runner, and an event-collecting progress sink.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use outfitter_core::prelude::*;
use serde_json::{Value, json};
use zip::write::SimpleFileOptions;

pub fn reply(status: u16, result: Value) -> StoreReply {
    StoreReply { status, result }
}

pub fn metadata(name: &str) -> AppMetadata {
    AppMetadata {
        author: "QA".to_string(),
        name: name.to_string(),
        short_description: "short".to_string(),
        long_description: "long".to_string(),
        version: "1.0".to_string(),
        version_notes: "notes".to_string(),
    }
}

/// Minimal zip that passes the APK sanity check.
pub fn write_apk(path: &Path) {
    let file = std::fs::File::create(path).expect("create apk");
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("AndroidManifest.xml", SimpleFileOptions::default())
        .expect("start manifest entry");
    writer.write_all(b"<manifest/>").expect("write manifest");
    writer.finish().expect("finish apk");
}

/// Record with a real APK on disk, named by an absolute base path so the
/// pipeline's derived artifact paths stay inside the temp directory.
pub fn apk_record(dir: &Path, base: &str) -> AppRecord {
    let base_path = dir.join(base).display().to_string();
    write_apk(&dir.join(format!("{}.apk", base)));
    AppRecord::new(AppRole::Custom)
        .with_file_name(base_path)
        .with_metadata(metadata(base))
}

// =========================================================================
// Fake store gateway
// =========================================================================

/// In-memory gateway: every call is logged, replies come from per-method
/// queues and fall back to permissive defaults.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<String>>,
    upload_replies: Mutex<VecDeque<StoreReply>>,
    update_replies: Mutex<VecDeque<StoreReply>>,
    details_replies: Mutex<VecDeque<StoreReply>>,
    download_replies: Mutex<VecDeque<StoreReply>>,
    sign_replies: Mutex<VecDeque<StoreReply>>,
    wrap_replies: Mutex<VecDeque<StoreReply>>,
    toggle_errors: Mutex<VecDeque<String>>,
    write_downloads: bool,
    apps: Vec<CatalogEntry>,
    published: Vec<PublishedListing>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload_reply(self, status: u16, result: Value) -> Self {
        self.upload_replies
            .lock()
            .unwrap()
            .push_back(reply(status, result));
        self
    }

    pub fn with_update_reply(self, status: u16, result: Value) -> Self {
        self.update_replies
            .lock()
            .unwrap()
            .push_back(reply(status, result));
        self
    }

    pub fn with_details_reply(self, status: u16, result: Value) -> Self {
        self.details_replies
            .lock()
            .unwrap()
            .push_back(reply(status, result));
        self
    }

    pub fn with_download_reply(self, status: u16, result: Value) -> Self {
        self.download_replies
            .lock()
            .unwrap()
            .push_back(reply(status, result));
        self
    }

    pub fn with_sign_reply(self, status: u16, result: Value) -> Self {
        self.sign_replies
            .lock()
            .unwrap()
            .push_back(reply(status, result));
        self
    }

    pub fn with_wrap_reply(self, status: u16, result: Value) -> Self {
        self.wrap_replies
            .lock()
            .unwrap()
            .push_back(reply(status, result));
        self
    }

    pub fn with_toggle_error(self, message: &str) -> Self {
        self.toggle_errors
            .lock()
            .unwrap()
            .push_back(message.to_string());
        self
    }

    /// Make successful downloads actually write their destination file.
    pub fn with_written_downloads(mut self) -> Self {
        self.write_downloads = true;
        self
    }

    pub fn with_listings(
        mut self,
        apps: Vec<CatalogEntry>,
        published: Vec<PublishedListing>,
    ) -> Self {
        self.apps = apps;
        self.published = published;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(&self, queue: &Mutex<VecDeque<StoreReply>>, default: StoreReply) -> StoreReply {
        queue.lock().unwrap().pop_front().unwrap_or(default)
    }
}

impl StoreGateway for FakeGateway {
    fn list_apps(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        self.log("list_apps".to_string());
        Ok(self.apps.clone())
    }

    fn list_published(&self) -> anyhow::Result<Vec<PublishedListing>> {
        self.log("list_published".to_string());
        Ok(self.published.clone())
    }

    fn upload(&self, binary: &Path, _metadata: &AppMetadata) -> anyhow::Result<StoreReply> {
        self.log(format!("upload {}", binary.display()));
        Ok(self.next(
            &self.upload_replies,
            reply(200, Value::String("masked-77".to_string())),
        ))
    }

    fn update(
        &self,
        masked: &MaskedPsk,
        _metadata: &AppMetadata,
        binary: &Path,
    ) -> anyhow::Result<StoreReply> {
        self.log(format!("update {} {}", masked, binary.display()));
        Ok(self.next(
            &self.update_replies,
            reply(200, Value::String(masked.as_str().to_string())),
        ))
    }

    fn app_details(&self, masked: &MaskedPsk) -> anyhow::Result<StoreReply> {
        self.log(format!("details {}", masked));
        Ok(self.next(&self.details_replies, reply(200, json!({"psk": "psk-7"}))))
    }

    fn download(&self, psk: &AppPsk, dest: &Path) -> anyhow::Result<StoreReply> {
        self.log(format!("download {} {}", psk, dest.display()));
        let reply = self.next(&self.download_replies, reply(200, Value::Null));
        if reply.ok() && self.write_downloads {
            std::fs::write(dest, b"downloaded-binary").expect("write download");
        }
        Ok(reply)
    }

    fn sign(&self, psk: &AppPsk, credentials: &str) -> anyhow::Result<StoreReply> {
        self.log(format!("sign {} {}", psk, credentials));
        Ok(self.next(
            &self.sign_replies,
            reply(200, Value::String("signed".to_string())),
        ))
    }

    fn toggle_enabled(&self, psk: &AppPsk, enabled: bool) -> anyhow::Result<()> {
        self.log(format!("toggle {} {}", psk, enabled));
        match self.toggle_errors.lock().unwrap().pop_front() {
            Some(message) => anyhow::bail!(message),
            None => Ok(()),
        }
    }

    fn wrap(&self, psk: &AppPsk, policies: &[u32]) -> anyhow::Result<StoreReply> {
        self.log(format!("wrap {} {:?}", psk, policies));
        Ok(self.next(
            &self.wrap_replies,
            reply(200, Value::String("wrapped".to_string())),
        ))
    }
}

// =========================================================================
// Fake tool runner
// =========================================================================

#[derive(Default)]
pub struct FakeTools {
    calls: Mutex<Vec<String>>,
    install_outcomes: Mutex<VecDeque<InstallOutcome>>,
    sign_errors: Mutex<VecDeque<String>>,
    align_errors: Mutex<VecDeque<String>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_install_outcome(self, outcome: InstallOutcome) -> Self {
        self.install_outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn with_sign_error(self, message: &str) -> Self {
        self.sign_errors
            .lock()
            .unwrap()
            .push_back(message.to_string());
        self
    }

    pub fn with_align_error(self, message: &str) -> Self {
        self.align_errors
            .lock()
            .unwrap()
            .push_back(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolRunner for FakeTools {
    fn install(&self, binary: &Path) -> anyhow::Result<InstallOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("install {}", binary.display()));
        Ok(self
            .install_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(InstallOutcome::Installed))
    }

    fn launch(&self, package: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("launch {}", package));
        Ok(())
    }

    fn sign_file(&self, binary: &Path, keystore: &Path) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!(
            "sign {} {}",
            binary.display(),
            keystore.display()
        ));
        match self.sign_errors.lock().unwrap().pop_front() {
            Some(message) => anyhow::bail!(message),
            None => Ok(()),
        }
    }

    fn align_file(&self, src: &Path, dest: &Path) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("align {} {}", src.display(), dest.display()));
        match self.align_errors.lock().unwrap().pop_front() {
            Some(message) => anyhow::bail!(message),
            None => Ok(()),
        }
    }
}

// =========================================================================
// Event-collecting progress sink
// =========================================================================

#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<PipelineEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Step labels in emission order.
    pub fn labels(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::StepStarted { label } => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn notes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::Note { text } => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for EventLog {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
