//! Outfitter - Store & Device Provisioning
//!
//! Usage:
//!   outfitter              # Update the configured apps on the store
//!   outfitter org          # Same, explicitly
//!   outfitter device       # Sideload the roster onto a connected device
//!   outfitter both         # Store update, then device provisioning

mod console_ops;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outfitter_core::prelude::*;

use crate::console_ops::{ConsoleRenderer, TerminalOperator};

#[derive(Parser)]
#[command(name = "outfitter")]
#[command(about = "Enterprise app store & Android device provisioning", long_about = None)]
struct Cli {
    /// Store account name
    #[arg(short, long)]
    user: Option<String>,

    /// Store account password (prompted for when omitted)
    #[arg(long)]
    password: Option<String>,

    /// Base URL of the upload endpoint
    #[arg(long)]
    legacy_endpoint: Option<String>,

    /// Base URL of the management API
    #[arg(long)]
    api_endpoint: Option<String>,

    /// Sign downloaded binaries locally instead of through the store
    #[arg(long)]
    local: bool,

    /// Keystore file used for local signing
    #[arg(long)]
    keystore: Option<String>,

    /// Signing-credentials identifier for the store's sign call
    #[arg(long)]
    credentials_psk: Option<String>,

    /// Local binary name for the app catalog client, without extension
    #[arg(long)]
    catalog_apk: Option<String>,

    /// Known store identity for the app catalog client
    #[arg(long)]
    catalog_psk: Option<String>,

    /// Local binary name for the VPN client, without extension
    #[arg(long)]
    vpn_apk: Option<String>,

    /// Known store identity for the VPN client
    #[arg(long)]
    vpn_psk: Option<String>,

    /// Android SDK root, for adb and zipalign discovery
    #[arg(long)]
    sdk_path: Option<String>,

    /// Explicit zipalign binary, overriding SDK discovery
    #[arg(long)]
    zipalign_path: Option<String>,

    /// Config file to use instead of the discovered one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the run reports as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Update the configured apps on the store
    Org,
    /// Sideload the roster onto a connected device
    Device,
    /// Store update first, then device provisioning
    Both,
}

impl From<Commands> for RunAction {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Org => RunAction::Org,
            Commands::Device => RunAction::Device,
            Commands::Both => RunAction::Both,
        }
    }
}

impl Cli {
    /// Flags reshaped into the override layer of the configuration.
    fn overrides(&self) -> RunConfig {
        RunConfig {
            user: self.user.clone(),
            password: self.password.clone(),
            legacy_endpoint: self.legacy_endpoint.clone(),
            api_endpoint: self.api_endpoint.clone(),
            sign_local: self.local,
            keystore: self.keystore.clone(),
            credentials_psk: self.credentials_psk.clone(),
            catalog_apk: self.catalog_apk.clone(),
            catalog_psk: self.catalog_psk.clone().map(AppPsk::new),
            vpn_apk: self.vpn_apk.clone(),
            vpn_psk: self.vpn_psk.clone().map(AppPsk::new),
            sdk_path: self.sdk_path.clone(),
            zipalign_path: self.zipalign_path.clone(),
            verbose: self.verbose,
            action: self.command.map(RunAction::from),
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let store = match &cli.config {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::discover()?,
    };
    let file = store.load()?;
    let config = merge_configs(file, cli.overrides());
    init_tracing(config.verbose);
    debug!(path = %store.config_path().display(), "configuration loaded");

    let action = config.action.unwrap_or_default();
    let runs_org = matches!(action, RunAction::Org | RunAction::Both);
    let runs_device = matches!(action, RunAction::Device | RunAction::Both);
    let need_align = config.sign_local && runs_org;

    let operator = TerminalOperator::new();
    let user = match config.user.clone() {
        Some(user) => user,
        None => operator.line("Username: ")?,
    };
    let password = match config.password.clone() {
        Some(password) => password,
        None => operator.secret("Password: ")?,
    };
    let legacy_endpoint = config.legacy_endpoint.clone().context(
        "No upload endpoint configured; set legacy_endpoint in outfitter.json or pass --legacy-endpoint",
    )?;
    let api_endpoint = config.api_endpoint.clone().context(
        "No API endpoint configured; set api_endpoint in outfitter.json or pass --api-endpoint",
    )?;

    // Tools are resolved before anything touches the store, so a broken
    // SDK setup aborts the run up front.
    let tools = AndroidTools::discover(
        config.sdk_path.as_deref().map(Path::new),
        config.zipalign_path.as_deref().map(Path::new),
        need_align,
    )?;

    let gateway = HttpGateway::connect(&legacy_endpoint, &api_endpoint, &user, &password)?;

    let mut roster = build_roster(&config);
    let matcher = Matcher::new(&operator);
    let dir_names = list_dir_names(&std::env::current_dir()?)?;
    matcher.resolve_files(&mut roster, &dir_names)?;
    let apps = gateway.list_apps()?;
    let published = gateway.list_published()?;
    matcher.resolve_identities(&mut roster, &apps, &published)?;
    let keystore = if need_align {
        matcher.resolve_keystore(config.keystore.clone(), &dir_names)?
    } else {
        None
    };

    let renderer = ConsoleRenderer;
    let mut reports = Vec::new();

    if runs_org {
        let mut pipeline = OrgPipeline::new(&gateway, &tools, &operator)
            .with_progress(&renderer)
            .with_credentials(config.credentials_psk.clone());
        if config.sign_local {
            pipeline = pipeline.with_local_signing(keystore.clone().map(PathBuf::from));
        }
        let report = pipeline.run(&mut roster)?;
        print_summary("Store update", &report);
        reports.push(report);
    }
    if runs_device {
        let report = DeviceProvisioner::new(&gateway, &tools, &operator)
            .with_progress(&renderer)
            .run(&mut roster)?;
        print_summary("Device provisioning", &report);
        reports.push(report);
    }

    if let Some(path) = cli.report.as_deref() {
        write_reports(path, &reports)?;
    }

    let failures: usize = reports.iter().map(RunReport::failures).sum();
    println!();
    if failures > 0 {
        println!("Done, {} app(s) did not finish", failures);
    } else {
        println!("Done");
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "debug"
    } else {
        "outfitter_core=debug,info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_summary(title: &str, report: &RunReport) {
    println!();
    println!("{} summary:", title);
    for app in &report.apps {
        match &app.outcome {
            AppOutcome::Finalized => {
                println!("  {:<24} {}", app.name, style("ok").green());
            }
            AppOutcome::Skipped { reason } => {
                println!("  {:<24} {} ({})", app.name, style("skipped").yellow(), reason);
            }
            AppOutcome::Failed { stage, reason } => {
                println!(
                    "  {:<24} {} at {:?}: {}",
                    app.name,
                    style("failed").red(),
                    stage,
                    reason
                );
            }
        }
    }
}

fn write_reports(path: &Path, reports: &[RunReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    println!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn bare_invocation_parses_without_subcommand() {
        let cli = Cli::try_parse_from(["outfitter"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.overrides().action.is_none());
    }

    #[test]
    fn subcommands_map_to_actions() {
        let cli = Cli::try_parse_from(["outfitter", "org"]).unwrap();
        assert_eq!(cli.overrides().action, Some(RunAction::Org));

        let cli = Cli::try_parse_from(["outfitter", "device"]).unwrap();
        assert_eq!(cli.overrides().action, Some(RunAction::Device));

        let cli = Cli::try_parse_from(["outfitter", "both"]).unwrap();
        assert_eq!(cli.overrides().action, Some(RunAction::Both));
    }

    #[test]
    fn flags_land_in_the_override_layer() {
        let cli = Cli::try_parse_from([
            "outfitter",
            "-u",
            "qa-admin",
            "--local",
            "--keystore",
            "release.keystore",
            "--vpn-psk",
            "vpn-token",
            "--credentials-psk",
            "cred-31",
            "org",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.user.as_deref(), Some("qa-admin"));
        assert!(overrides.sign_local);
        assert_eq!(overrides.keystore.as_deref(), Some("release.keystore"));
        assert_eq!(
            overrides.vpn_psk.as_ref().map(|psk| psk.as_str()),
            Some("vpn-token")
        );
        assert_eq!(overrides.credentials_psk.as_deref(), Some("cred-31"));
        assert_eq!(overrides.action, Some(RunAction::Org));
    }

    #[test]
    fn endpoint_and_sdk_flags_parse() {
        let args = [
            "outfitter",
            "--legacy-endpoint",
            "upload.example.com",
            "--api-endpoint",
            "api.example.com",
            "--sdk-path",
            "/opt/android-sdk/",
            "--zipalign-path",
            "/usr/local/bin/zipalign",
            "device",
        ];

        let result = std::panic::catch_unwind(|| Cli::try_parse_from(args));
        assert!(result.is_ok(), "CLI parsing should not panic");
        assert!(result.unwrap().is_ok(), "CLI parsing should succeed");
    }

    #[test]
    fn report_and_config_flags_take_paths() {
        let cli = Cli::try_parse_from([
            "outfitter",
            "--config",
            "/tmp/alt.json",
            "--report",
            "run-report.json",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/alt.json")));
        assert_eq!(cli.report.as_deref(), Some(Path::new("run-report.json")));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["outfitter", "--php"]).is_err());
        assert!(Cli::try_parse_from(["outfitter", "sideload"]).is_err());
    }

    #[test]
    fn unset_flags_leave_overrides_empty() {
        let cli = Cli::try_parse_from(["outfitter"]).unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides, RunConfig::default());
    }
}
