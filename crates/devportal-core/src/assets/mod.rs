//! Pure helpers behind the local asset server.
//!
//! - **`resolve`** – maps request paths to files, rejecting traversal.
//! - [`content_type_for`] – picks the `Content-Type` from a file extension.

pub mod resolve;

use std::path::Path;

pub use resolve::{resolve_request_path, PathRejection};

/// Fallback content type for unrecognised extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for a served artifact, chosen by extension
/// (case-insensitive).
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("html" | "htm") => "text/html",
        _ => OCTET_STREAM,
    }
}
