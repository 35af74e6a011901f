//! Request-path resolution for the local asset server.
//!
//! Resolution is purely lexical: the request path is percent-decoded, split
//! into segments, and normalised against the artifact root without touching
//! the file system.  A path whose `..` segments would climb above the root is
//! rejected before any file is opened.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Why a request path was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    /// The normalised path leaves the artifact root.
    #[error("path escapes the artifact directory")]
    Traversal,
    /// The path contains bytes that cannot name a file (NUL, drive
    /// prefixes, invalid UTF-8 after decoding).
    #[error("malformed request path")]
    Malformed,
}

/// Maps a URL path onto a file under `root`.
///
/// `/` (or an empty path) maps to `index_file`.
///
/// # Errors
///
/// [`PathRejection::Traversal`] when `..` segments climb above `root`;
/// [`PathRejection::Malformed`] for undecodable or suspicious segments.
pub fn resolve_request_path(
    root: &Path,
    request_path: &str,
    index_file: &str,
) -> Result<PathBuf, PathRejection> {
    let decoded = percent_decode(request_path).ok_or(PathRejection::Malformed)?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathRejection::Traversal);
                }
            }
            s if s.contains('\0') || s.contains(':') => return Err(PathRejection::Malformed),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Ok(root.join(index_file));
    }
    Ok(segments.iter().fold(root.to_path_buf(), |acc, s| acc.join(s)))
}

/// Decodes `%XX` escapes.  Returns `None` when an escape is not exactly two
/// hex digits or the decoded bytes are not UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }
    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
