//! HTTP client for the plugin host's developer control plane.
//!
//! | Operation     | Request                                              |
//! |---------------|------------------------------------------------------|
//! | load portal   | `GET /dev`                                           |
//! | inject        | `POST /plugin/updateTestPlugin` `{url, config}`      |
//! | invoke method | `POST /plugin/remoteCall?id=<id>&method=<m>` `{args}` |
//!
//! None of these return `Err`.  The device is a developer build and
//! routinely drops connections while it reloads a plugin, so every failure
//! is folded into the operation's result type and the session driver decides
//! what it means.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devportal_core::{DiscoveredDevice, HarnessError, InjectionPayload, RemoteCallResult, SessionConfig};
use serde_json::{json, Value};
use tracing::debug;

use crate::application::run_session::{ControlPlane, ControlPlaneConnector, InjectOutcome, PortalStatus};

const INJECT_PATH: &str = "/plugin/updateTestPlugin";
const REMOTE_CALL_PATH: &str = "/plugin/remoteCall";

/// Control-plane client bound to one device.
pub struct HttpControlPlane {
    client: reqwest::Client,
    base_url: String,
    portal_url: String,
    portal_timeout: Duration,
    inject_timeout: Duration,
    call_timeout: Duration,
}

impl HttpControlPlane {
    pub fn new(client: reqwest::Client, device: &DiscoveredDevice, config: &SessionConfig) -> Self {
        Self {
            client,
            base_url: device.control_base_url(),
            portal_url: device.portal_url(),
            portal_timeout: config.portal_timeout,
            inject_timeout: config.inject_timeout,
            call_timeout: config.call_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn load_portal(&self) -> PortalStatus {
        let response = self
            .client
            .get(&self.portal_url)
            .timeout(self.portal_timeout)
            .send()
            .await;
        match response {
            Ok(r) if r.status().is_success() => PortalStatus::Ready,
            Ok(r) => PortalStatus::Unexpected(r.status().as_u16()),
            Err(e) => PortalStatus::Unreachable(describe(&e)),
        }
    }

    async fn inject(&self, payload: &InjectionPayload) -> InjectOutcome {
        let response = self
            .client
            .post(self.url(INJECT_PATH))
            .timeout(self.inject_timeout)
            .json(payload)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return InjectOutcome::TimedOut,
            Err(e) => return InjectOutcome::ConnectionClosed(describe(&e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                // Headers arrived, so the device took the request.
                debug!("injection response body unreadable: {e}");
                String::new()
            }
            Err(e) => return InjectOutcome::ConnectionClosed(describe(&e)),
        };

        if status.is_success() {
            InjectOutcome::Accepted {
                status: status.as_u16(),
                body,
            }
        } else {
            InjectOutcome::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }

    async fn invoke_method(
        &self,
        plugin_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> RemoteCallResult {
        let response = self
            .client
            .post(self.url(REMOTE_CALL_PATH))
            .query(&[("id", plugin_id), ("method", method)])
            .timeout(self.call_timeout)
            .json(&json!({ "args": args }))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return RemoteCallResult::failed(describe(&e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RemoteCallResult::failed(describe(&e)),
        };

        if status.is_success() {
            RemoteCallResult::ok(parse_body(&body))
        } else {
            RemoteCallResult::failed(format!("HTTP {}: {body}", status.as_u16()))
        }
    }
}

/// Builds one [`HttpControlPlane`] per session, sharing a single HTTP client.
pub struct HttpConnector {
    client: reqwest::Client,
    config: SessionConfig,
}

impl HttpConnector {
    /// # Errors
    ///
    /// [`HarnessError::Transport`] if the HTTP client cannot be initialised.
    pub fn new(config: SessionConfig) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| HarnessError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

impl ControlPlaneConnector for HttpConnector {
    fn connect(&self, device: &DiscoveredDevice) -> Arc<dyn ControlPlane> {
        Arc::new(HttpControlPlane::new(self.client.clone(), device, &self.config))
    }
}

/// JSON when the body parses, otherwise the raw text as a JSON string.
/// An empty body becomes `null`.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Flattens a `reqwest` error and its sources into one line, so a reset
/// reads "error sending request: connection reset by peer" rather than only
/// the outer message.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = std::error::Error::source(cause);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_is_parsed() {
        assert_eq!(parse_body(r#"{"ok":true}"#), json!({"ok": true}));
    }

    #[test]
    fn test_non_json_body_becomes_string() {
        assert_eq!(parse_body("done"), json!("done"));
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(parse_body("  "), Value::Null);
    }

    #[test]
    fn test_urls_use_device_control_port() {
        let device = DiscoveredDevice::manual("10.0.0.5", 11337).unwrap();
        let client = reqwest::Client::new();

        let control = HttpControlPlane::new(client, &device, &SessionConfig::default());

        assert_eq!(control.url(INJECT_PATH), "http://10.0.0.5:11337/plugin/updateTestPlugin");
        assert_eq!(control.portal_url, "http://10.0.0.5:11337/dev");
    }
}
