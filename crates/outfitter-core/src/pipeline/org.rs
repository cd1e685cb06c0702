//! Org update pipeline: metadata, upload, identity, wrap, and signing.
//!
//! Walks the roster once, front to back. Each record moves through its
//! stages until one fails; the failure is recorded and the next record
//! starts fresh. Two signing routes exist: the store signs and the result
//! is downloaded, or the binary is downloaded, signed and aligned locally,
//! and re-uploaded.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::apk;
use crate::error::FatalError;
use crate::gateway::{StoreGateway, StoreReply};
use crate::prompt::Operator;
use crate::tools::ToolRunner;
use crate::types::{AppMetadata, AppPsk, AppRecord, MaskedPsk, WrapState};

use super::{
    AppOutcome, AppReport, Halt, NullSink, PipelineEvent, ProgressSink, RunReport, Stage, halt,
};

/// Metadata confirmation rounds before the app fails the stage.
const METADATA_ROUNDS: usize = 3;

pub struct OrgPipeline<'a> {
    gateway: &'a dyn StoreGateway,
    tools: &'a dyn ToolRunner,
    operator: &'a dyn Operator,
    progress: &'a dyn ProgressSink,
    sign_local: bool,
    keystore: Option<PathBuf>,
    credentials_psk: Option<String>,
}

impl<'a> OrgPipeline<'a> {
    pub fn new(
        gateway: &'a dyn StoreGateway,
        tools: &'a dyn ToolRunner,
        operator: &'a dyn Operator,
    ) -> Self {
        Self {
            gateway,
            tools,
            operator,
            progress: &NullSink,
            sign_local: false,
            keystore: None,
            credentials_psk: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Sign downloaded binaries locally against a keystore instead of
    /// through the store.
    pub fn with_local_signing(mut self, keystore: Option<PathBuf>) -> Self {
        self.sign_local = true;
        self.keystore = keystore;
        self
    }

    /// Credentials identifier forwarded to the store's sign call.
    pub fn with_credentials(mut self, credentials_psk: Option<String>) -> Self {
        self.credentials_psk = credentials_psk;
        self
    }

    /// Drive every roster record through the org stages.
    ///
    /// Fails fast, before any store call, when a record still has no local
    /// binary: an org update cannot proceed without one. Per-app stage
    /// failures land in the report instead.
    pub fn run(&self, roster: &mut [AppRecord]) -> Result<RunReport> {
        let missing: Vec<String> = roster
            .iter()
            .filter(|record| record.file_name.is_none())
            .map(|record| record.display_name())
            .collect();
        if !missing.is_empty() {
            return Err(FatalError::MissingBinaries { missing }.into());
        }

        let started_at = Utc::now();
        let total = roster.len();
        let mut apps = Vec::with_capacity(total);
        for (index, record) in roster.iter_mut().enumerate() {
            self.progress.emit(PipelineEvent::AppStarted {
                name: record.display_name(),
                index: index + 1,
                total,
            });
            apps.push(self.run_record(record));
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            apps,
        })
    }

    fn run_record(&self, record: &mut AppRecord) -> AppReport {
        let mut notes = Vec::new();
        let outcome = match self.drive(record, &mut notes) {
            Ok(()) => AppOutcome::Finalized,
            Err(halted) => AppOutcome::Failed {
                stage: halted.stage,
                reason: halted.reason,
            },
        };
        if outcome.is_failure() {
            warn!(app = %record.display_name(), ?outcome, "org update failed");
        }
        AppReport {
            name: record.display_name(),
            role: record.role,
            outcome,
            wrapped: record.wrapped,
            notes,
        }
    }

    fn drive(&self, record: &mut AppRecord, notes: &mut Vec<String>) -> Result<(), Halt> {
        self.collect_metadata(record)?;
        let upload_token = self.upload_binary(record)?;
        self.resolve_identity(record, &upload_token)?;
        self.wrap_binary(record)?;
        if self.sign_local {
            self.sign_locally(record, notes)
        } else {
            self.sign_remotely(record, notes)
        }
    }

    /// Prompt for metadata when the record carries none. The operator gets
    /// [`METADATA_ROUNDS`] chances to confirm a round of answers.
    fn collect_metadata(&self, record: &mut AppRecord) -> Result<(), Halt> {
        if record.metadata.is_some() {
            return Ok(());
        }
        let subject = record.display_name();
        for _ in 0..METADATA_ROUNDS {
            self.operator.notify(&format!(
                "No metadata passed for {}. Enter it below",
                subject
            ));
            let metadata = self
                .prompt_metadata()
                .map_err(|err| halt(Stage::Metadata, format!("{:#}", err)))?;
            let accepted = self
                .operator
                .confirm(&format!("Upload {} with the above metadata?", subject))
                .map_err(|err| halt(Stage::Metadata, format!("{:#}", err)))?;
            if accepted {
                record.metadata = Some(metadata);
                return Ok(());
            }
        }
        Err(halt(
            Stage::Metadata,
            format!("metadata was not confirmed after {} rounds", METADATA_ROUNDS),
        ))
    }

    fn prompt_metadata(&self) -> Result<AppMetadata> {
        Ok(AppMetadata {
            author: self.operator.line("  Author: ")?,
            name: self.operator.line("  App Name: ")?,
            short_description: self.operator.line("  Short Description: ")?,
            long_description: self.operator.line("  Long Description: ")?,
            version: self.operator.line("  Version: ")?,
            version_notes: self.operator.line("  Version Notes: ")?,
        })
    }

    /// Upload a new binary or replace an existing one, depending on whether
    /// a masked token is known. Returns the masked token the store replied
    /// with; the identity lookup must use that one, not the record's.
    fn upload_binary(&self, record: &mut AppRecord) -> Result<MaskedPsk, Halt> {
        let Some(path) = record.apk_path() else {
            return Err(halt(Stage::Upload, "no binary file resolved"));
        };
        let path = PathBuf::from(path);
        if let Err(err) = apk::verify_apk(&path) {
            return Err(halt(Stage::Upload, format!("{:#}", err)));
        }
        let Some(metadata) = record.metadata.clone() else {
            return Err(halt(Stage::Upload, "no metadata available"));
        };

        let reply = match record.masked_psk.clone() {
            None => self.step(Stage::Upload, "Uploading", || {
                self.gateway.upload(&path, &metadata)
            })?,
            Some(masked) => self.step(Stage::Upload, "Uploading", || {
                self.gateway.update(&masked, &metadata, &path)
            })?,
        };

        let token = MaskedPsk::new(reply.result_text());
        if record.masked_psk.is_none() {
            record.masked_psk = Some(token.clone());
        }
        Ok(token)
    }

    /// The single masked-to-unmasked conversion point: a details lookup on
    /// the token the upload reply carried. Always re-resolves, even when
    /// the record already had an unmasked token.
    fn resolve_identity(&self, record: &mut AppRecord, token: &MaskedPsk) -> Result<(), Halt> {
        let details = self.expect_ok(Stage::Identity, || self.gateway.app_details(token))?;
        let psk = match details.result.get("psk") {
            Some(Value::String(text)) => AppPsk::new(text.clone()),
            Some(Value::Number(number)) => AppPsk::new(number.to_string()),
            _ => return Err(halt(Stage::Identity, "details reply did not contain a psk")),
        };
        debug!(app = %record.display_name(), %psk, "identity resolved");
        record.psk = Some(psk);
        Ok(())
    }

    fn wrap_binary(&self, record: &mut AppRecord) -> Result<(), Halt> {
        if record.policies.is_empty() {
            return Ok(());
        }
        let Some(psk) = record.psk.clone() else {
            return Err(halt(Stage::Wrap, "no unmasked token resolved"));
        };
        match self.step(Stage::Wrap, "Wrapping", || {
            self.gateway.wrap(&psk, &record.policies)
        }) {
            Ok(_) => {
                record.wrapped = WrapState::Succeeded;
                Ok(())
            }
            Err(halted) => {
                record.wrapped = WrapState::Failed;
                Err(halted)
            }
        }
    }

    /// Store-side signing: sign, publish, download the signed binary. The
    /// tracked file name gains a `_signed` suffix.
    fn sign_remotely(&self, record: &mut AppRecord, notes: &mut Vec<String>) -> Result<(), Halt> {
        let Some(psk) = record.psk.clone() else {
            return Err(halt(Stage::Sign, "no unmasked token resolved"));
        };
        let Some(credentials) = self.credentials_psk.as_deref() else {
            return Err(halt(Stage::Sign, "no signing credentials configured"));
        };
        let Some(base_name) = record.file_name.clone() else {
            return Err(halt(Stage::Sign, "no binary file resolved"));
        };

        self.step(Stage::Sign, "Signing", || {
            self.gateway.sign(&psk, credentials)
        })?;
        self.gateway
            .toggle_enabled(&psk, true)
            .map_err(|err| halt(Stage::Sign, format!("{:#}", err)))?;

        let dest = PathBuf::from(format!("{}_signed.apk", base_name));
        self.step(Stage::Sign, "Downloading", || {
            self.gateway.download(&psk, &dest)
        })?;
        record.file_name = Some(format!("{}_signed", base_name));
        self.note_fingerprint(&dest, notes);
        Ok(())
    }

    /// Local signing: download the wrapped binary, sign it against the
    /// keystore, align it, and re-upload the aligned result under the
    /// original masked token. The tracked file name moves from `_wrapped`
    /// to `_aligned`.
    fn sign_locally(&self, record: &mut AppRecord, notes: &mut Vec<String>) -> Result<(), Halt> {
        let Some(psk) = record.psk.clone() else {
            return Err(halt(Stage::Sign, "no unmasked token resolved"));
        };
        let Some(keystore) = self.keystore.clone() else {
            return Err(halt(Stage::Sign, "no keystore configured or found"));
        };
        let Some(masked) = record.masked_psk.clone() else {
            return Err(halt(Stage::Sign, "no masked token recorded"));
        };
        let Some(metadata) = record.metadata.clone() else {
            return Err(halt(Stage::Sign, "no metadata available"));
        };
        let Some(base_name) = record.file_name.clone() else {
            return Err(halt(Stage::Sign, "no binary file resolved"));
        };

        self.progress.emit(PipelineEvent::Note {
            text: "Signing app locally".to_string(),
        });

        let wrapped_name = format!("{}_wrapped", base_name);
        let wrapped_path = PathBuf::from(format!("{}.apk", wrapped_name));
        self.step(Stage::Sign, "Downloading", || {
            self.gateway.download(&psk, &wrapped_path)
        })?;
        record.file_name = Some(wrapped_name);
        self.note_fingerprint(&wrapped_path, notes);

        self.tool_step("Signing", || self.tools.sign_file(&wrapped_path, &keystore))?;

        let aligned_name = format!("{}_aligned", base_name);
        let aligned_path = PathBuf::from(format!("{}.apk", aligned_name));
        self.tool_step("Aligning", || {
            self.tools.align_file(&wrapped_path, &aligned_path)
        })?;
        record.file_name = Some(aligned_name);

        self.step(Stage::Upload, "Uploading", || {
            self.gateway.update(&masked, &metadata, &aligned_path)
        })?;
        Ok(())
    }

    /// Run a store call as a visible step. A non-200 reply or a transport
    /// error fails the given stage.
    fn step(
        &self,
        stage: Stage,
        label: &str,
        call: impl FnOnce() -> Result<StoreReply>,
    ) -> Result<StoreReply, Halt> {
        self.progress.emit(PipelineEvent::StepStarted {
            label: label.to_string(),
        });
        match call() {
            Ok(reply) if reply.ok() => {
                self.progress.emit(PipelineEvent::StepFinished { ok: true });
                Ok(reply)
            }
            Ok(reply) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                self.progress.emit(PipelineEvent::Note {
                    text: reply.result_text(),
                });
                Err(halt(
                    stage,
                    format!("store returned {}: {}", reply.status, reply.result_text()),
                ))
            }
            Err(err) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                Err(halt(stage, format!("{:#}", err)))
            }
        }
    }

    /// Run a local tool invocation as a visible step under the sign stage.
    fn tool_step(&self, label: &str, call: impl FnOnce() -> Result<()>) -> Result<(), Halt> {
        self.progress.emit(PipelineEvent::StepStarted {
            label: label.to_string(),
        });
        match call() {
            Ok(()) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: true });
                Ok(())
            }
            Err(err) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                Err(halt(Stage::Sign, format!("{:#}", err)))
            }
        }
    }

    /// Run a store call without progress output; used for lookups that
    /// have no operator-facing step.
    fn expect_ok(
        &self,
        stage: Stage,
        call: impl FnOnce() -> Result<StoreReply>,
    ) -> Result<StoreReply, Halt> {
        match call() {
            Ok(reply) if reply.ok() => Ok(reply),
            Ok(reply) => Err(halt(
                stage,
                format!("store returned {}: {}", reply.status, reply.result_text()),
            )),
            Err(err) => Err(halt(stage, format!("{:#}", err))),
        }
    }

    fn note_fingerprint(&self, path: &Path, notes: &mut Vec<String>) {
        if let Ok(digest) = apk::fingerprint(path) {
            debug!(artifact = %path.display(), %digest, "artifact fingerprint");
            notes.push(format!("{} blake3:{}", path.display(), digest));
        }
    }
}
