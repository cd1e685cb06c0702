//! Outfitter Core Library
//!
//! Provides the domain logic for enterprise app-store updates and Android
//! device provisioning: roster matching, the org update pipeline, and the
//! device sideload pipeline.

pub mod apk;
pub mod config;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod pipeline;
pub mod prompt;
pub mod roster;
pub mod tools;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{AppEntry, ConfigStore, RunConfig, merge_configs};

    // Domain types
    pub use crate::types::{
        AppMetadata, AppPsk, AppRecord, AppRole, MaskedPsk, RunAction, WrapState,
    };

    // Remote store
    pub use crate::gateway::{
        CatalogEntry, HttpGateway, PublishedListing, StoreGateway, StoreReply,
    };

    // Pipelines
    pub use crate::pipeline::{
        AppOutcome, AppReport, DeviceProvisioner, NullSink, OrgPipeline, PipelineEvent,
        ProgressSink, RunReport, Stage,
    };

    // Operator interaction
    pub use crate::prompt::{Operator, ScriptedOperator, select_numbered};

    // Matching
    pub use crate::matcher::{Matcher, list_dir_names, normalize};

    // Roster
    pub use crate::roster::{build_roster, default_policies};

    // Local tools
    pub use crate::tools::{AndroidTools, InstallOutcome, ToolRunner};

    // Errors
    pub use crate::error::FatalError;
}
