//! HTTP subnet prober: the discovery path of last resort.
//!
//! A host counts as available when *any* HTTP response comes back from the
//! marker path on the control port within the timeout.  The status code is
//! irrelevant; only a transport failure or a timeout means "not there".
//!
//! # Scan order
//!
//! 1. The priority set (`localhost`, `127.0.0.1`, well-known device addresses,
//!    this machine's own addresses) is probed concurrently with the longer
//!    priority timeout.  Any hit ends the scan.
//! 2. Otherwise every host `.1 ..= .254` of the local /24 is probed in
//!    sequential batches.  Hosts inside a batch run concurrently; the next
//!    batch starts only once the previous one has fully finished, which
//!    keeps the number of sockets in flight bounded.

use std::future::Future;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use devportal_core::network::{batch_count, priority_hosts, Subnet24};
use devportal_core::{DiscoveryConfig, HarnessError, ProbeResult};
use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::application::discover_device::HostScanner;

/// Probes hosts over HTTP with a shared `reqwest` client.
pub struct SubnetProber {
    client: reqwest::Client,
    config: DiscoveryConfig,
    local_addrs: Vec<Ipv4Addr>,
}

impl SubnetProber {
    /// Creates a prober for the given local addresses (normally
    /// [`super::interfaces::local_ipv4_addrs`]).
    ///
    /// # Errors
    ///
    /// [`HarnessError::Transport`] if the HTTP client cannot be initialised.
    pub fn new(config: DiscoveryConfig, local_addrs: Vec<Ipv4Addr>) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.priority_probe_timeout)
            .no_proxy()
            .build()
            .map_err(|e| HarnessError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            local_addrs,
        })
    }

    /// One marker probe.  Never fails; every error maps to "unavailable".
    pub async fn probe_with(&self, host: &str, port: u16, limit: Duration) -> ProbeResult {
        let url = marker_url(host, port, &self.config.marker_path);
        let started = Instant::now();
        match timeout(limit, self.client.get(&url).send()).await {
            Ok(Ok(response)) => {
                let elapsed = started.elapsed();
                debug!(%url, status = %response.status(), ?elapsed, "marker endpoint answered");
                ProbeResult::available(host, port, elapsed)
            }
            Ok(Err(e)) => {
                trace!(%url, error = %e, "probe failed");
                ProbeResult::unavailable(host, port)
            }
            Err(_) => {
                trace!(%url, "probe timed out");
                ProbeResult::unavailable(host, port)
            }
        }
    }
}

#[async_trait]
impl HostScanner for SubnetProber {
    async fn scan(&self, port: u16) -> Result<Vec<ProbeResult>, HarnessError> {
        let subnet = Subnet24::from_local_addrs(&self.local_addrs)
            .ok_or(HarnessError::NoNetworkInterface)?;
        info!(
            "scanning for control planes on port {port} (local addresses: {:?})",
            self.local_addrs
        );

        // ── Priority hosts ────────────────────────────────────────────────────
        let priority = priority_hosts(&self.local_addrs, &self.config.well_known_hosts);
        info!("checking {} priority host(s)", priority.len());
        let limit = self.config.priority_probe_timeout;
        let found: Vec<ProbeResult> = join_all(
            priority
                .iter()
                .map(|host| self.probe_with(host, port, limit)),
        )
        .await
        .into_iter()
        .filter(ProbeResult::is_available)
        .collect();

        if !found.is_empty() {
            log_found(&found);
            return Ok(found);
        }

        // ── Full subnet ───────────────────────────────────────────────────────
        info!("no priority host answered; scanning {subnet} (this may take a while)");
        let hosts: Vec<String> = subnet.hosts().iter().map(ToString::to_string).collect();
        let limit = self.config.scan_probe_timeout;
        let found = probe_in_batches(&hosts, self.config.scan_batch_size, |host| async move {
            self.probe_with(&host, port, limit).await
        })
        .await;

        if found.is_empty() {
            info!("no control plane found on {subnet}");
        } else {
            log_found(&found);
        }
        Ok(found)
    }

    async fn probe(&self, host: &str, port: u16) -> ProbeResult {
        self.probe_with(host, port, self.config.priority_probe_timeout)
            .await
    }
}

/// Runs `probe` over `hosts` in sequential batches of `batch_size`, returning
/// the available results in host order.
pub async fn probe_in_batches<F, Fut>(
    hosts: &[String],
    batch_size: usize,
    mut probe: F,
) -> Vec<ProbeResult>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ProbeResult>,
{
    let batch_size = batch_size.max(1);
    let batches = batch_count(hosts.len(), batch_size);
    let mut found = Vec::new();

    for (index, chunk) in hosts.chunks(batch_size).enumerate() {
        let results = join_all(chunk.iter().cloned().map(&mut probe)).await;
        found.extend(results.into_iter().filter(ProbeResult::is_available));
        info!("scan progress: {}%", (index + 1) * 100 / batches);
    }
    found
}

fn marker_url(host: &str, port: u16, path: &str) -> String {
    if host.contains(':') {
        format!("http://[{host}]:{port}{path}")
    } else {
        format!("http://{host}:{port}{path}")
    }
}

fn log_found(found: &[ProbeResult]) {
    info!("found {} control plane(s)", found.len());
    for result in found {
        match result.response_time_ms() {
            Some(ms) => info!("  http://{}:{} ({ms} ms)", result.host, result.port),
            None => info!("  http://{}:{}", result.host, result.port),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
