//! Test session driver: the only component that knows the whole sequence.
//!
//! ```text
//! Idle → Discovering → ServingAssets → PortalLoading → Injecting → InvokingMethods → Done
//! ```
//!
//! Discovery and asset serving are preconditions; failing either moves the
//! session to `Failed` and returns the fatal error.  Every later step records
//! a soft failure and the session carries on to `Done`, because the device is
//! a best-effort developer target and a flaky call should not hide the
//! results of the others.

use std::sync::Arc;

use async_trait::async_trait;
use devportal_core::domain::session::MethodCall;
use devportal_core::{
    DiscoveredDevice, HarnessError, HomeListing, InjectionPayload, PluginManifest,
    RemoteCallResult, SessionConfig, SessionReport, SessionState, SessionTrail, StepReport,
};
use serde_json::Value;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::discover_device::DeviceLocator;

/// Result of the one-shot control portal fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalStatus {
    /// The portal answered 200.
    Ready,
    /// The portal answered with another status.
    Unexpected(u16),
    /// No answer (refused, reset, timed out).
    Unreachable(String),
}

/// Result of the injection request.  None of these abort the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectOutcome {
    /// 2xx from the control plane.
    Accepted { status: u16, body: String },
    /// Non-2xx from the control plane.
    Rejected { status: u16, body: String },
    /// The connection dropped; the device may still have loaded the plugin.
    ConnectionClosed(String),
    /// No response within the injection timeout; the device may still be
    /// processing.
    TimedOut,
}

impl InjectOutcome {
    /// Maps the outcome to the step report for `Injecting`.
    pub fn to_step_report(&self) -> StepReport {
        let step = SessionState::Injecting;
        match self {
            InjectOutcome::Accepted { status, body } if body.is_empty() => {
                StepReport::passed(step, format!("HTTP {status} (no content)"))
            }
            InjectOutcome::Accepted { status, body } => {
                StepReport::passed(step, format!("HTTP {status}: {body}"))
            }
            InjectOutcome::Rejected { status, body } => {
                StepReport::soft(step, HarnessError::Protocol(format!("HTTP {status}: {body}")).to_string())
            }
            InjectOutcome::ConnectionClosed(reason) => StepReport::soft(
                step,
                HarnessError::Transport(format!("{reason} (plugin may still have loaded)"))
                    .to_string(),
            ),
            InjectOutcome::TimedOut => {
                StepReport::soft(step, "timed out (device may still be processing)")
            }
        }
    }
}

/// The device's developer control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetches the control portal page once.
    async fn load_portal(&self) -> PortalStatus;

    /// Sends the plugin script URL and manifest.
    async fn inject(&self, payload: &InjectionPayload) -> InjectOutcome;

    /// Invokes `method` on the loaded plugin.  Never fails: errors are
    /// reported inside the result.
    async fn invoke_method(&self, plugin_id: &str, method: &str, args: Vec<Value>)
        -> RemoteCallResult;
}

/// Builds a [`ControlPlane`] for the device chosen by discovery.
pub trait ControlPlaneConnector: Send + Sync {
    fn connect(&self, device: &DiscoveredDevice) -> Arc<dyn ControlPlane>;
}

/// Build output as published by the local asset server.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedAssets {
    /// Absolute URL of the plugin script, reachable from the device.
    pub script_url: String,
    /// Parsed manifest (`config.json`).
    pub manifest: Value,
}

/// Starts serving the build output.
#[async_trait]
pub trait AssetPublisher: Send {
    /// # Errors
    ///
    /// [`HarnessError::MissingArtifacts`] when the build output is absent,
    /// [`HarnessError::Bind`] when the listening socket cannot be opened.
    async fn publish(&mut self) -> Result<PublishedAssets, HarnessError>;
}

/// One run of discover → serve → portal → inject → smoke test.
pub struct TestSession<'a> {
    config: SessionConfig,
    locator: &'a dyn DeviceLocator,
    assets: &'a mut dyn AssetPublisher,
    connector: &'a dyn ControlPlaneConnector,
    trail: SessionTrail,
    session_id: Uuid,
}

impl<'a> TestSession<'a> {
    pub fn new(
        config: SessionConfig,
        locator: &'a dyn DeviceLocator,
        assets: &'a mut dyn AssetPublisher,
        connector: &'a dyn ControlPlaneConnector,
    ) -> Self {
        Self {
            config,
            locator,
            assets,
            connector,
            trail: SessionTrail::new(),
            session_id: Uuid::new_v4(),
        }
    }

    /// States visited so far, including `Failed` after a fatal error.
    pub fn trail(&self) -> &SessionTrail {
        &self.trail
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Runs the session to `Done` or `Failed`.
    ///
    /// # Errors
    ///
    /// Only the fatal conditions: [`HarnessError::NoDeviceFound`] (or an
    /// invalid manual address) from discovery, and
    /// [`HarnessError::MissingArtifacts`] / [`HarnessError::Bind`] from the
    /// asset server.
    pub async fn run(&mut self) -> Result<SessionReport, HarnessError> {
        let span = tracing::info_span!("session", id = %self.session_id);
        self.run_steps().instrument(span).await
    }

    async fn run_steps(&mut self) -> Result<SessionReport, HarnessError> {
        let mut steps = Vec::new();

        // ── Discovering ──────────────────────────────────────────────────────
        self.enter(SessionState::Discovering);
        let device = match self.locator.locate().await {
            Ok(device) => device,
            Err(e) => return Err(self.fail(e)),
        };
        info!(
            "target device {} ({})",
            device.control_base_url(),
            device.name().unwrap_or("unnamed")
        );
        steps.push(StepReport::passed(
            SessionState::Discovering,
            device.control_base_url(),
        ));

        // ── ServingAssets ────────────────────────────────────────────────────
        self.enter(SessionState::ServingAssets);
        let published = match self.assets.publish().await {
            Ok(published) => published,
            Err(e) => return Err(self.fail(e)),
        };
        let plugin = PluginManifest::from_value(&published.manifest);
        info!("plugin {} served at {}", plugin.display_name(), published.script_url);
        steps.push(StepReport::passed(
            SessionState::ServingAssets,
            published.script_url.clone(),
        ));

        let control = self.connector.connect(&device);

        // ── PortalLoading ────────────────────────────────────────────────────
        self.enter(SessionState::PortalLoading);
        steps.push(self.load_portal(control.as_ref(), &device).await);

        // ── Injecting ────────────────────────────────────────────────────────
        self.enter(SessionState::Injecting);
        let payload = InjectionPayload::new(published.script_url, published.manifest);
        let injected = control.inject(&payload).await;
        let inject_report = injected.to_step_report();
        if inject_report.outcome.is_passed() {
            info!("plugin injected: {}", inject_report.detail);
        } else {
            warn!("injection: {}", inject_report.detail);
            warn!("check the portal manually at {}", device.portal_url());
        }
        steps.push(inject_report);

        // ── InvokingMethods ──────────────────────────────────────────────────
        self.enter(SessionState::InvokingMethods);
        let plugin_id = plugin.id.clone().unwrap_or_else(|| {
            warn!("manifest has no \"id\"; remote calls will not match a plugin");
            String::new()
        });
        let (calls, home_item_count) = self.invoke_smoke_tests(control.as_ref(), &plugin_id).await;
        let failed = calls.iter().filter(|c| !c.result.success).count();
        steps.push(if failed == 0 {
            StepReport::passed(
                SessionState::InvokingMethods,
                format!("{} of {} calls succeeded", calls.len(), calls.len()),
            )
        } else {
            StepReport::soft(
                SessionState::InvokingMethods,
                format!("{failed} of {} calls failed", calls.len()),
            )
        });

        // ── Done ─────────────────────────────────────────────────────────────
        self.enter(SessionState::Done);
        info!("session complete: {}", self.trail.render());

        Ok(SessionReport {
            session_id: self.session_id,
            device,
            plugin,
            trail: self.trail.clone(),
            steps,
            calls,
            home_item_count,
        })
    }

    /// Fetches the portal once, then waits for its client-side code to
    /// initialise.  There is no readiness signal, only the settle delay.
    async fn load_portal(&self, control: &dyn ControlPlane, device: &DiscoveredDevice) -> StepReport {
        info!("loading control portal {}", device.portal_url());
        match control.load_portal().await {
            PortalStatus::Ready => {
                if !self.config.portal_settle.is_zero() {
                    info!(
                        "portal responded; waiting {:?} for it to initialise",
                        self.config.portal_settle
                    );
                    tokio::time::sleep(self.config.portal_settle).await;
                }
                StepReport::passed(SessionState::PortalLoading, "portal ready")
            }
            PortalStatus::Unexpected(status) => {
                warn!("portal returned HTTP {status}");
                StepReport::soft(SessionState::PortalLoading, format!("portal returned HTTP {status}"))
            }
            PortalStatus::Unreachable(reason) => {
                warn!("could not pre-load portal: {reason}");
                StepReport::soft(
                    SessionState::PortalLoading,
                    format!("portal unreachable: {reason}"),
                )
            }
        }
    }

    async fn invoke_smoke_tests(
        &self,
        control: &dyn ControlPlane,
        plugin_id: &str,
    ) -> (Vec<MethodCall>, Option<usize>) {
        let mut calls = Vec::with_capacity(self.config.smoke_methods.len());
        let mut home_item_count = None;

        for method in &self.config.smoke_methods {
            info!("testing {method}()");
            let result = control.invoke_method(plugin_id, method, Vec::new()).await;
            if result.success {
                info!("{method}() succeeded: {}", result.preview(100));
            } else {
                warn!("{method}() failed: {}", result.preview(200));
            }

            if *method == self.config.home_method && result.success {
                if let Some(value) = &result.result {
                    let listing = HomeListing::from_value(value);
                    info!("{method}() returned {} item(s)", listing.item_count());
                    home_item_count = Some(listing.item_count());
                }
            }

            calls.push(MethodCall {
                method: method.clone(),
                result,
            });
        }
        (calls, home_item_count)
    }

    fn enter(&mut self, next: SessionState) {
        if self.trail.advance(next) {
            info!(state = %next, "session state");
        } else {
            error!("illegal session transition {} -> {next}", self.trail.current());
        }
    }

    fn fail(&mut self, err: HarnessError) -> HarnessError {
        self.enter(SessionState::Failed);
        error!("session failed: {err}");
        err
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
