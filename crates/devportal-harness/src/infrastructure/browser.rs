//! Opens URLs in the operator's default browser.

use tracing::{info, warn};

/// Best-effort: a missing browser or headless session only logs a warning.
pub fn open_in_browser(url: &str) {
    match open::that(url) {
        Ok(()) => info!("opened {url} in the default browser"),
        Err(e) => warn!("could not open {url} in a browser: {e}; open it manually"),
    }
}
