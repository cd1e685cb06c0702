//! Device provisioning: sideload the roster, then launch the VPN client.
//!
//! Apps missing a local binary are fetched from the store when an identity
//! is known; otherwise they are skipped. Install rejections fail the app
//! but never the run, and the configuration app is launched regardless so
//! the operator can finish VPN setup on whatever did land.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, warn};

use crate::apk;
use crate::gateway::StoreGateway;
use crate::matcher::normalize;
use crate::prompt::Operator;
use crate::tools::{InstallOutcome, ToolRunner};
use crate::types::AppRecord;

use super::{
    AppOutcome, AppReport, Halt, NullSink, PipelineEvent, ProgressSink, RunReport, Stage, halt,
};

/// Package launched after sideloading so the operator can configure the VPN.
pub const CONFIG_APP_PACKAGE: &str = "org.strongswan.android";

/// Pause between the install loop and the launch, giving the device a
/// moment to settle.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

pub struct DeviceProvisioner<'a> {
    gateway: &'a dyn StoreGateway,
    tools: &'a dyn ToolRunner,
    operator: &'a dyn Operator,
    progress: &'a dyn ProgressSink,
    settle: Duration,
}

impl<'a> DeviceProvisioner<'a> {
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
            settle: SETTLE_DELAY,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Override the post-install settle delay.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Sideload every roster record onto the connected device.
    pub fn run(&self, roster: &mut [AppRecord]) -> Result<RunReport> {
        let started_at = Utc::now();
        self.operator
            .notify(&format!("Preparing to sideload {} apps", roster.len()));
        self.preflight()?;

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

        thread::sleep(self.settle);
        self.progress.emit(PipelineEvent::Note {
            text: "Launching the VPN client on the device for configuration".to_string(),
        });
        if let Err(err) = self.tools.launch(CONFIG_APP_PACKAGE) {
            warn!(error = %format!("{:#}", err), "could not launch the VPN client");
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            apps,
        })
    }

    /// Confirm the device is ready. Declining prints remediation guidance
    /// and waits, then proceeds anyway; only the operator knows when the
    /// cable is actually in.
    fn preflight(&self) -> Result<()> {
        let connected = self
            .operator
            .confirm("Is your device connected with USB Debugging enabled?")?;
        if !connected {
            self.operator.notify(
                "Please connect device and ensure USB Debugging is enabled in the device settings",
            );
            self.operator.pause()?;
        }
        Ok(())
    }

    fn run_record(&self, record: &mut AppRecord) -> AppReport {
        let mut notes = Vec::new();
        let outcome = self.provision(record, &mut notes);
        if outcome.is_failure() {
            warn!(app = %record.display_name(), ?outcome, "sideload failed");
        }
        AppReport {
            name: record.display_name(),
            role: record.role,
            outcome,
            wrapped: record.wrapped,
            notes,
        }
    }

    fn provision(&self, record: &mut AppRecord, notes: &mut Vec<String>) -> AppOutcome {
        if record.file_name.is_none() {
            match self.fetch_binary(record, notes) {
                Ok(true) => {}
                Ok(false) => {
                    return AppOutcome::Skipped {
                        reason: "no local file and no store match".to_string(),
                    };
                }
                Err(halted) => {
                    return AppOutcome::Failed {
                        stage: halted.stage,
                        reason: halted.reason,
                    };
                }
            }
        }

        let Some(path) = record.apk_path() else {
            return AppOutcome::Skipped {
                reason: "no local file and no store match".to_string(),
            };
        };
        let binary = PathBuf::from(path);

        self.progress.emit(PipelineEvent::StepStarted {
            label: "Sideloading".to_string(),
        });
        match self.tools.install(&binary) {
            Ok(InstallOutcome::Installed) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: true });
                AppOutcome::Finalized
            }
            Ok(InstallOutcome::Rejected { transcript }) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                let trimmed = transcript.trim().to_string();
                self.progress.emit(PipelineEvent::Note {
                    text: trimmed.clone(),
                });
                notes.push(trimmed);
                AppOutcome::Failed {
                    stage: Stage::Install,
                    reason: "device rejected the install".to_string(),
                }
            }
            Err(err) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                AppOutcome::Failed {
                    stage: Stage::Install,
                    reason: format!("{:#}", err),
                }
            }
        }
    }

    /// Fetch the binary from the store when only the identity is known.
    /// `Ok(false)` means there is nothing to fetch and the app is skipped.
    fn fetch_binary(&self, record: &mut AppRecord, notes: &mut Vec<String>) -> Result<bool, Halt> {
        let Some(psk) = record.psk.clone() else {
            self.progress.emit(PipelineEvent::Note {
                text: "No file was found locally for app and no match was found on the store"
                    .to_string(),
            });
            self.progress.emit(PipelineEvent::Note {
                text: "Please ensure apk files are in the working directory or named in the config"
                    .to_string(),
            });
            return Ok(false);
        };

        self.progress.emit(PipelineEvent::Note {
            text: "App binary file is missing, but a match was found on the store".to_string(),
        });
        let name = download_name(record);
        let dest = PathBuf::from(format!("{}.apk", name));
        self.progress.emit(PipelineEvent::StepStarted {
            label: "Downloading".to_string(),
        });
        match self.gateway.download(&psk, &dest) {
            Ok(reply) if reply.ok() => {
                self.progress.emit(PipelineEvent::StepFinished { ok: true });
                record.file_name = Some(name);
                if let Ok(digest) = apk::fingerprint(&dest) {
                    debug!(artifact = %dest.display(), %digest, "artifact fingerprint");
                    notes.push(format!("{} blake3:{}", dest.display(), digest));
                }
                Ok(true)
            }
            Ok(reply) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                self.progress.emit(PipelineEvent::Note {
                    text: "Unable to find binary for sideload, skipping...".to_string(),
                });
                Err(halt(
                    Stage::Download,
                    format!("store returned {}: {}", reply.status, reply.result_text()),
                ))
            }
            Err(err) => {
                self.progress.emit(PipelineEvent::StepFinished { ok: false });
                Err(halt(Stage::Download, format!("{:#}", err)))
            }
        }
    }
}

/// File stem for a store-fetched binary: the normalized metadata name when
/// one exists, the role slug otherwise.
fn download_name(record: &AppRecord) -> String {
    match &record.metadata {
        Some(metadata) if !metadata.name.is_empty() => normalize(&metadata.name),
        _ => record.role.slug().to_string(),
    }
}
