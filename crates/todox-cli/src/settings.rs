//! Settings persistence.
//!
//! Settings live in `settings.toml` under the platform config folder:
//! - macOS: ~/Library/Application Support/com.todox.Todox/
//! - Windows: %APPDATA%/todox/Todox/config/
//! - Linux: ~/.config/todox/
//!
//! Every section is optional; missing keys take their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use todox_container::ExportOptions;
use todox_queue::{DEFAULT_DB_FILE, QueueConfig};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "todox";
const APP_NAME: &str = "Todox";
const CONFIG_FILENAME: &str = "settings.toml";

/// Effective CLI settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub export: ExportSettings,
    pub queue: QueueSettings,
    pub sync: SyncSettings,
}

/// Metadata written into every export envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub app_identifier: String,
    pub app_version: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let options = ExportOptions::default();
        Self {
            app_identifier: options.app_identifier,
            app_version: options.app_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Store location; defaults to the platform data folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: QueueConfig::default().busy_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Endpoint that receives queued documents as a JSON array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

impl SyncSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::default()
            .with_app_identifier(self.export.app_identifier.clone())
            .with_app_version(self.export.app_version.clone())
    }

    pub fn queue_config(&self) -> QueueConfig {
        let path = self
            .queue
            .path
            .clone()
            .unwrap_or_else(default_queue_path);
        QueueConfig::new(path).with_busy_timeout_ms(self.queue.busy_timeout_ms)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
}

/// Get the path to the settings file.
///
/// Returns `None` if the platform-specific directory cannot be determined.
pub fn settings_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Default offline store: `offline.db` in the platform data folder, or in
/// the working directory when that folder is unknown.
pub fn default_queue_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from(DEFAULT_DB_FILE),
        |dirs| dirs.data_dir().join(DEFAULT_DB_FILE),
    )
}

/// Load settings from `path`, or from [`settings_path`] when `None`.
///
/// Returns defaults when the file is missing, unreadable or unparsable.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path.map(Path::to_path_buf).or_else(settings_path) else {
        tracing::warn!("Could not determine settings path, using defaults");
        return Settings::default();
    };

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file: {e}, using defaults");
                Settings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No settings file found at {}, using defaults", path.display());
            Settings::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read settings file: {e}, using defaults");
            Settings::default()
        }
    }
}

/// Save settings to `path`, creating its parent directory.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    tracing::info!("Saved settings to {}", path.display());
    Ok(())
}
