// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud to NetBox Sync
//!
//! Discovers Azure network inventory and reconciles it into NetBox:
//! - Azure Resource Manager → Topology → Reconciler → NetBox API
//!
//! Run with: cargo run --bin cloud-netbox-sync -- --netbox-url https://netbox.example.com
//!
//! Prerequisites:
//! 1. NetBox API accessible (via --netbox-url or NETBOX_URL)
//! 2. NetBox API token (via --netbox-token or NETBOX_TOKEN)
//! 3. Azure credentials (AZURE_ACCESS_TOKEN, an `az login` session, or --interactive)
//!
//! Exit status is non-zero on any fatal failure. Per-entity failures are
//! logged and only affect the exit status with --strict.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use cim_netbox_sync::{
    adapters::{ArmInventorySource, CredentialMode, NetBoxStore, SnapshotInventorySource},
    discover,
    domain::Subscription,
    InventorySource, MemoryStore, NetBoxConfig, Reconciler, SyncReport, SyncSettings,
    TargetStore, Topology,
};

#[derive(Parser, Debug)]
#[command(name = "cloud-netbox-sync")]
#[command(about = "Sync Azure network inventory into NetBox", long_about = None)]
struct Cli {
    /// NetBox URL
    #[arg(long, env = "NETBOX_URL")]
    netbox_url: Option<String>,

    /// NetBox API token
    #[arg(long, env = "NETBOX_TOKEN", hide_env_values = true)]
    netbox_token: Option<String>,

    /// Only process this Azure subscription
    #[arg(long)]
    subscription_id: Option<String>,

    /// Use interactive Azure login
    #[arg(long)]
    interactive: bool,

    /// Read inventory from a JSON snapshot instead of Azure
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Reconcile against an in-memory store; NetBox is not contacted
    #[arg(long)]
    dry_run: bool,

    /// Skip TLS certificate verification for NetBox
    #[arg(long)]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Upper bound on the whole run in seconds
    #[arg(long, default_value_t = 1800)]
    run_deadline_secs: u64,

    /// Exit non-zero when any entity failed to sync
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn netbox_config(&self) -> Result<NetBoxConfig> {
        let mut config = NetBoxConfig::new(
            self.netbox_url.clone().unwrap_or_default(),
            self.netbox_token.clone().unwrap_or_default(),
        );
        config.timeout_secs = self.timeout_secs;
        config.verify_tls = !self.insecure;
        config.validate()?;
        Ok(config)
    }

    /// NetBox connection settings, or `None` for a dry run
    fn target_config(&self) -> Result<Option<NetBoxConfig>> {
        if self.dry_run {
            return Ok(None);
        }
        self.netbox_config().map(Some)
    }

    fn settings(&self) -> SyncSettings {
        SyncSettings {
            run_deadline: Duration::from_secs(self.run_deadline_secs),
            ..SyncSettings::default()
        }
    }

    fn credential_mode(&self) -> CredentialMode {
        if self.interactive {
            CredentialMode::Interactive
        } else {
            CredentialMode::Default
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ Sync failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    info!("🚀 Starting Azure to NetBox sync");

    // Missing NetBox credentials fail before any inventory call
    let target = cli.target_config()?;
    let settings = cli.settings();
    let only = cli.subscription_id.clone().map(Subscription::from_id);

    // Discover inventory before touching NetBox
    let topologies = match &cli.snapshot {
        Some(path) => {
            let source = SnapshotInventorySource::from_path(path)
                .await
                .context("Failed to load inventory snapshot")?;
            discover_all(&source, only).await?
        }
        None => {
            info!("🔑 Authenticating with Azure");
            let source = ArmInventorySource::connect(
                cli.credential_mode(),
                Duration::from_secs(cli.timeout_secs),
            )
            .await
            .context("Failed to authenticate with Azure")?;
            discover_all(&source, only).await?
        }
    };

    let report = match target {
        None => {
            warn!("🧪 Dry run: reconciling against an in-memory store");
            reconcile(MemoryStore::new(), settings, &topologies).await?
        }
        Some(config) => {
            info!("📋 NetBox URL: {}", config.base_url);
            let store = NetBoxStore::new(config).context("Failed to create NetBox client")?;
            reconcile(store, settings, &topologies).await?
        }
    };

    if report.has_failures() {
        warn!(
            "⚠️ {} entities failed to sync; rerun to converge",
            report.failures.len()
        );
        if cli.strict {
            return Ok(ExitCode::FAILURE);
        }
    }

    info!("✅ Sync completed successfully");
    Ok(ExitCode::SUCCESS)
}

async fn discover_all<I: InventorySource>(
    source: &I,
    only: Option<Subscription>,
) -> Result<Vec<Topology>> {
    info!("📡 Discovering inventory from {}", source.name());
    let topologies = discover(source, only)
        .await
        .context("Failed to enumerate inventory")?;
    info!("✅ Discovered {} subscriptions", topologies.len());
    Ok(topologies)
}

async fn reconcile<S: TargetStore>(
    store: S,
    settings: SyncSettings,
    topologies: &[Topology],
) -> Result<SyncReport> {
    info!("🔧 Initializing {} target store", store.name());
    store
        .initialize()
        .await
        .context("Failed to initialize target store")?;

    let reconciler = Reconciler::new(store, settings);
    let report = reconciler
        .run(topologies)
        .await
        .context("Reconciliation aborted")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["cloud-netbox-sync"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_missing_netbox_settings_fail_before_discovery() {
        // The snapshot does not exist; loading it would fail with a different error
        let cli = cli(&[
            "--netbox-url",
            "",
            "--netbox-token",
            "",
            "--snapshot",
            "/nonexistent/inventory.json",
        ]);

        let err = run(cli).await.unwrap_err();
        assert!(
            err.to_string().contains("NetBox URL and token"),
            "unexpected error: {:#}",
            err
        );
    }

    #[test]
    fn test_dry_run_needs_no_netbox_settings() {
        let cli = cli(&["--dry-run", "--netbox-url", "", "--netbox-token", ""]);
        assert!(cli.target_config().unwrap().is_none());
    }

    #[test]
    fn test_target_config_carries_flags() {
        let cli = cli(&[
            "--netbox-url",
            "https://netbox.example.com",
            "--netbox-token",
            "0123456789abcdef",
            "--insecure",
            "--timeout-secs",
            "5",
        ]);

        let config = cli.target_config().unwrap().unwrap();
        assert_eq!(config.base_url, "https://netbox.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.verify_tls);
    }
}
