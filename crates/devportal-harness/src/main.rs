//! devportal-harness: deploy a plugin build to a plugin host on the LAN and
//! smoke-test it.
//!
//! # Usage
//!
//! ```text
//! devportal-harness [OPTIONS]
//!
//! Options:
//!   --dev-ip <HOST>           Device address; skips discovery
//!   --dev-port <PORT>         Device control-plane port [default: 11337]
//!   --port <PORT>             Local asset server port [default: 3000]
//!   --skip-mdns               Go straight to the subnet scan
//!   --dist <DIR>              Build output directory [default: dist]
//!   --advertise-host <HOST>   Host name the device uses to reach this machine
//!   --config <FILE>           Optional TOML settings [default: devportal.toml]
//!   --no-open                 Do not open the device's control portal in a browser
//!   --exit-after-test         Stop serving once the smoke test finishes
//! ```
//!
//! # Precedence
//!
//! Command-line flag, then its environment variable (`DEVPORTAL_*`), then the
//! TOML file, then the built-in default.
//!
//! # Exit status
//!
//! Non-zero when no device is found, the build output is missing, the asset
//! port cannot be bound, or the configuration is unusable.  Soft failures
//! (portal unreachable, injection reset, failing method calls) are reported
//! but do not change the exit status.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use devportal_core::{HarnessConfig, HarnessError, SessionReport, StepOutcome};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use devportal_harness::application::discover_device::DiscoveryOrchestrator;
use devportal_harness::application::run_session::TestSession;
use devportal_harness::infrastructure::asset_server::AssetServer;
use devportal_harness::infrastructure::browser::open_in_browser;
use devportal_harness::infrastructure::network::control_plane::HttpConnector;
use devportal_harness::infrastructure::network::interfaces::{advertise_host, local_ipv4_addrs};
use devportal_harness::infrastructure::network::mdns::MdnsBrowser;
use devportal_harness::infrastructure::network::subnet_probe::SubnetProber;
use devportal_harness::infrastructure::storage::config::load_config;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Discovers a plugin host, serves the plugin build to it, and exercises the
/// plugin through the host's developer control plane.
#[derive(Debug, Parser)]
#[command(
    name = "devportal-harness",
    about = "Deploy a plugin build to a plugin host on the LAN and smoke-test it",
    version
)]
struct Cli {
    /// Device IP address or host name.  Skips multicast discovery and the
    /// subnet scan.
    #[arg(long, env = "DEVPORTAL_DEV_IP")]
    dev_ip: Option<String>,

    /// Control-plane port on the device.  [default: 11337]
    #[arg(long, env = "DEVPORTAL_DEV_PORT")]
    dev_port: Option<u16>,

    /// Port for the local asset server.  [default: 3000]
    #[arg(long, env = "DEVPORTAL_PORT")]
    port: Option<u16>,

    /// Skip multicast discovery and scan the local network directly.
    #[arg(long)]
    skip_mdns: bool,

    /// Build output directory containing config.json and script.js.
    /// [default: dist]
    #[arg(long, env = "DEVPORTAL_DIST")]
    dist: Option<PathBuf>,

    /// Host name or IP the device should use to fetch the script.
    /// Defaults to the first local IPv4 address.
    #[arg(long, env = "DEVPORTAL_ADVERTISE_HOST")]
    advertise_host: Option<String>,

    /// Optional TOML settings file.  A missing file is not an error.
    #[arg(long, default_value = "devportal.toml", env = "DEVPORTAL_CONFIG")]
    config: PathBuf,

    /// Do not open the device's control portal in the default browser.
    #[arg(long)]
    no_open: bool,

    /// Shut the asset server down as soon as the smoke test finishes instead
    /// of waiting for Ctrl+C.
    #[arg(long)]
    exit_after_test: bool,
}

impl Cli {
    /// Loads the TOML file and applies the flags on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if a value in it is invalid.
    fn into_harness_config(self) -> anyhow::Result<HarnessConfig> {
        let file = load_config(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;
        let mut config = file
            .into_harness_config()
            .with_context(|| format!("invalid settings in {}", self.config.display()))?;

        if let Some(host) = self.dev_ip {
            config.discovery.manual_host = Some(host);
        }
        if let Some(port) = self.dev_port {
            config.discovery.control_port = port;
        }
        if let Some(port) = self.port {
            config.assets.bind_addr.set_port(port);
        }
        if let Some(dir) = self.dist {
            config.assets.artifact_dir = dir;
        }
        if let Some(host) = self.advertise_host {
            config.assets.advertise_host = Some(host);
        }
        config.discovery.skip_multicast |= self.skip_mdns;
        if self.no_open {
            config.session.open_portal = false;
        }
        if self.exit_after_test {
            config.session.keep_serving = false;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_harness_config()?;

    let local = local_ipv4_addrs();
    let advertise = advertise_host(config.assets.advertise_host.as_deref(), &local);
    info!(
        "devportal-harness starting: assets {} advertised as {advertise}",
        config.assets.artifact_dir.display()
    );

    let orchestrator = DiscoveryOrchestrator::new(
        config.discovery.clone(),
        MdnsBrowser::new(&config.discovery),
        SubnetProber::new(config.discovery.clone(), local)?,
    );
    let connector = HttpConnector::new(config.session.clone())?;
    let mut assets = AssetServer::new(config.assets.clone(), advertise);

    let outcome = {
        let mut session =
            TestSession::new(config.session.clone(), &orchestrator, &mut assets, &connector);
        tokio::select! {
            result = session.run() => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    let report = match outcome {
        Some(Ok(report)) => report,
        Some(Err(e)) => {
            report_fatal(&e);
            assets.shutdown().await;
            return Err(e.into());
        }
        None => {
            info!("interrupted; shutting down");
            assets.shutdown().await;
            return Ok(());
        }
    };

    log_summary(&report);

    if config.session.open_portal {
        open_in_browser(&report.device.portal_url());
    }

    if config.session.keep_serving {
        info!("asset server still running so Reload in the portal picks up new builds; press Ctrl+C to stop");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C signal: {e}");
        }
        info!("shutdown signal received");
    }

    assets.shutdown().await;
    Ok(())
}

fn report_fatal(err: &HarnessError) {
    error!("{err}");
    for hint in err.remediation() {
        error!("  - {hint}");
    }
}

fn log_summary(report: &SessionReport) {
    info!("── Session {} ──", report.session_id);
    info!(
        "plugin {} on {}",
        report.plugin.display_name(),
        report.device.control_base_url()
    );
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Passed => info!("  ok    {:<16} {}", step.step.to_string(), step.detail),
            StepOutcome::Soft(reason) => warn!("  soft  {:<16} {reason}", step.step.to_string()),
        }
    }
    info!(
        "method calls: {} passed, {} failed",
        report.calls_passed(),
        report.calls_failed()
    );
    if let Some(count) = report.home_item_count {
        info!("home listing: {count} item(s)");
    }

    info!("next steps:");
    info!("  - open {} to call other methods", report.device.portal_url());
    info!("  - rebuild the plugin, then click Reload in the portal");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
