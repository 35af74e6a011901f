//! The plugin bundle as the control plane sees it.

use serde::Serialize;
use serde_json::Value;

/// Body of the `POST /plugin/updateTestPlugin` request.
///
/// Built once per session and sent verbatim.  On the wire the fields are
/// named `url` and `config`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectionPayload {
    /// Absolute URL of the plugin script on the local asset server.
    #[serde(rename = "url")]
    pub script_url: String,
    /// The plugin manifest (`config.json`), passed through untouched.
    #[serde(rename = "config")]
    pub manifest: Value,
}

impl InjectionPayload {
    pub fn new(script_url: impl Into<String>, manifest: Value) -> Self {
        Self {
            script_url: script_url.into(),
            manifest,
        }
    }
}

/// Builds `http://host:port/file` for an artifact served by the local asset
/// server.
pub fn artifact_url(advertise_host: &str, port: u16, file: &str) -> String {
    format!(
        "http://{advertise_host}:{port}/{}",
        file.trim_start_matches('/')
    )
}

/// The handful of manifest fields the harness reads for logging and for the
/// `id=` parameter of remote calls.  Everything else in the manifest is
/// opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginManifest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

impl PluginManifest {
    /// Extracts the summary fields.  `version` may be a number or a string
    /// in real manifests; both are accepted.
    pub fn from_value(manifest: &Value) -> Self {
        let text = |key: &str| -> Option<String> {
            match manifest.get(key)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        Self {
            id: text("id"),
            name: text("name"),
            version: text("version"),
        }
    }

    /// `name vVERSION`, with placeholders for absent fields.
    pub fn display_name(&self) -> String {
        format!(
            "{} v{}",
            self.name.as_deref().unwrap_or("<unnamed plugin>"),
            self.version.as_deref().unwrap_or("?")
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
