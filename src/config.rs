//! Configuration - Run mode and persisted user settings

use serde::{Deserialize, Serialize};

/// Environment variable selecting the run mode
pub const MODE_ENV_VAR: &str = "IMAGE_RESIZER_ENV";

const SETTINGS_KEY: &str = "image_resizer_settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    /// Anything other than `development`/`dev` means production
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("development") | Some("dev") => RunMode::Development,
            _ => RunMode::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == RunMode::Development
    }

    pub fn main_window_size(self) -> [f32; 2] {
        match self {
            RunMode::Production => [500.0, 600.0],
            RunMode::Development => [1000.0, 600.0],
        }
    }
}

/// Settings remembered between launches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub last_width: String,
    pub last_height: String,
    pub open_folder_after_resize: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_width: String::new(),
            last_height: String::new(),
            open_folder_after_resize: true,
        }
    }
}

impl AppSettings {
    pub fn load(storage: Option<&dyn eframe::Storage>) -> Self {
        let Some(json) = storage.and_then(|s| s.get_string(SETTINGS_KEY)) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring unreadable saved settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn eframe::Storage) {
        match serde_json::to_string(self) {
            Ok(json) => storage.set_string(SETTINGS_KEY, json),
            Err(e) => log::error!("Failed to serialize settings: {}", e),
        }
    }
}
