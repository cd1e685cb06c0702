//! Provisioning pipelines and their run report.
//!
//! Both pipelines walk the roster strictly in order and never retry. A
//! stage failure ends the app, not the run; the report records where each
//! app ended up. Only fatal preconditions surface as `Err` from `run`.

pub mod device;
pub mod org;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{AppRole, WrapState};

pub use device::DeviceProvisioner;
pub use org::OrgPipeline;

/// Pipeline stage an app can fail at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Metadata,
    Upload,
    Identity,
    Wrap,
    Sign,
    Download,
    Install,
}

/// Where an app ended up after its pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum AppOutcome {
    /// Every applicable stage completed.
    Finalized,
    /// Nothing to do for this app; not an error.
    Skipped { reason: String },
    /// A stage failed and the app went no further.
    Failed { stage: Stage, reason: String },
}

impl AppOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, AppOutcome::Failed { .. })
    }
}

/// Per-app slice of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct AppReport {
    pub name: String,
    pub role: AppRole,
    pub outcome: AppOutcome,
    pub wrapped: WrapState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Everything that happened in one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub apps: Vec<AppReport>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.apps
            .iter()
            .filter(|app| app.outcome.is_failure())
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.failures() == 0
    }
}

/// Progress notifications emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    AppStarted {
        name: String,
        index: usize,
        total: usize,
    },
    StepStarted {
        label: String,
    },
    StepFinished {
        ok: bool,
    },
    Note {
        text: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that drops everything.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Failure of one stage. Internal to the pipelines; the public surface is
/// [`AppOutcome::Failed`].
pub(crate) struct Halt {
    pub(crate) stage: Stage,
    pub(crate) reason: String,
}

pub(crate) fn halt(stage: Stage, reason: impl Into<String>) -> Halt {
    Halt {
        stage,
        reason: reason.into(),
    }
}
