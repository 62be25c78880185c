//! Persistent application settings (JSON file in the app data directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tilawa_core::{RestartPolicy, SessionConfig, StatusMessages};

const DEFAULT_LOG_FILTER: &str = "info,tilawa_core=info";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Passage to recite; the built-in Al-Fatiha when unset.
    pub passage_path: Option<PathBuf>,
    pub restart_policy: String,
    pub auto_retry_delay_ms: u64,
    pub language: String,
    pub show_reference_text: bool,
    pub log_filter: String,
    pub messages: StatusMessages,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            passage_path: None,
            restart_policy: "resume".into(),
            auto_retry_delay_ms: 1_000,
            language: "ar".into(),
            show_reference_text: true,
            log_filter: DEFAULT_LOG_FILTER.into(),
            messages: StatusMessages::default(),
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.restart_policy = normalize_restart_policy(&self.restart_policy);
        self.auto_retry_delay_ms = self.auto_retry_delay_ms.clamp(100, 10_000);
        self.language = normalize_language(&self.language);
        self.log_filter = {
            let filter = self.log_filter.trim();
            if filter.is_empty() {
                DEFAULT_LOG_FILTER.into()
            } else {
                filter.into()
            }
        };
        self.passage_path = self
            .passage_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            restart_policy: match self.restart_policy.as_str() {
                "from_start" => RestartPolicy::FromStart,
                _ => RestartPolicy::Resume,
            },
            auto_retry_delay: Duration::from_millis(self.auto_retry_delay_ms),
            messages: self.messages.clone(),
            ..SessionConfig::default()
        };
        config.request.language = self.language.clone();
        config
    }
}

pub fn normalize_restart_policy(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "from_start" | "fromstart" | "restart" | "beginning" => "from_start".into(),
        _ => "resume".into(),
    }
}

pub fn normalize_language(raw: &str) -> String {
    let language = raw.trim();
    if language.is_empty() {
        "ar".into()
    } else {
        language.replace('_', "-")
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Tilawa")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("tilawa")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
