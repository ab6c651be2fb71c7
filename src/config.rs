//! Application settings.
//!
//! Layered like the rest of the configuration surface: built-in defaults,
//! then `config/settings.yaml` if present, then environment overrides.
//! The Gemini API key deliberately never lives in the settings file; it is
//! read from `GEMINI_API_KEY` when a command needs the live service.

use std::env;
use std::path::{Path, PathBuf};

use formpilot_core_types::FillMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file invalid: {0}")]
    Invalid(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gemini: GeminiSettings,
    pub index: IndexSettings,
    pub browser: BrowserSettings,
    pub auto_fill: AutoFillSettings,
    pub history_file: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_base: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub endpoint: String,
    pub top_k: usize,
    pub similarity_threshold: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub timeout_ms: u64,
    pub websocket_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFillSettings {
    pub mode: FillMode,
    pub use_history: bool,
    pub highlight_fields: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini: GeminiSettings::default(),
            index: IndexSettings::default(),
            browser: BrowserSettings::default(),
            auto_fill: AutoFillSettings::default(),
            history_file: PathBuf::from("data/answer_history.json"),
        }
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            api_base: llm_gateway::gemini::DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8900".to_string(),
            top_k: 5,
            similarity_threshold: 0.3,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            slow_mo_ms: 500,
            timeout_ms: 30_000,
            websocket_url: None,
        }
    }
}

impl Default for AutoFillSettings {
    fn default() -> Self {
        Self {
            mode: FillMode::Interactive,
            use_history: true,
            highlight_fields: false,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the YAML file if it exists, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_PATH));

        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_yaml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "settings file absent, using defaults");
            Self::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(mode) = env::var("FORMPILOT_MODE") {
            if let Ok(parsed) = mode.parse::<FillMode>() {
                self.auto_fill.mode = parsed;
            }
        }
        if let Ok(headless) = env::var("FORMPILOT_HEADLESS") {
            let lowered = headless.to_ascii_lowercase();
            self.browser.headless = !matches!(lowered.as_str(), "0" | "false" | "no" | "off");
        }
        if let Ok(endpoint) = env::var("FORMPILOT_INDEX_ENDPOINT") {
            if !endpoint.is_empty() {
                self.index.endpoint = endpoint;
            }
        }
    }
}

/// The Gemini API key, from the environment only.
pub fn gemini_api_key() -> Option<String> {
    env::var("GEMINI_API_KEY")
        .ok()
        .filter(|key| !key.is_empty() && key != "your_api_key_here")
}
