//! Adapter configuration and chrome discovery.

use std::env;
use std::path::PathBuf;

use which::which;

#[derive(Clone, Debug)]
pub struct CdpConfig {
    /// Chromium executable. Empty path lets the launcher auto-detect.
    pub executable: PathBuf,
    pub user_data_dir: PathBuf,
    pub headless: bool,
    pub default_deadline_ms: u64,
    /// Attach to an already-running browser instead of launching one.
    pub websocket_url: Option<String>,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: default_chrome_path(),
            user_data_dir: PathBuf::from("./formpilot-profile"),
            headless: false,
            default_deadline_ms: 30_000,
            websocket_url: None,
        }
    }
}

/// Resolve a chromium executable: explicit env override first, then PATH.
pub fn default_chrome_path() -> PathBuf {
    if let Ok(path) = env::var("FORMPILOT_CHROME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    for candidate in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
    ] {
        if let Ok(found) = which(candidate) {
            return found;
        }
    }

    PathBuf::new()
}
