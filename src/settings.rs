//! Loader settings persisted in the data directory

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apkg::browse::DEFAULT_PAGE_SIZE;
use crate::apkg::decode::DEFAULT_MAX_ARCHIVE_BYTES;
use crate::apkg::store::DEFAULT_CHUNK_SIZE;
use crate::apkg::DecodeOptions;

pub const APP_DIR_NAME: &str = "apkg-study";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl From<SettingsError> for String {
    fn from(err: SettingsError) -> String {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Tunables for decoding and browsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderSettings {
    /// Largest package accepted, in bytes
    pub max_archive_bytes: u64,
    /// Notes fetched per query chunk
    pub chunk_size: usize,
    /// Cards per browse page
    pub page_size: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LoaderSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_archive_bytes == 0 {
            return Err(SettingsError::Invalid {
                name: "maxArchiveBytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(SettingsError::Invalid {
                name: "chunkSize",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(SettingsError::Invalid {
                name: "pageSize",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_archive_bytes: self.max_archive_bytes,
            chunk_size: self.chunk_size,
            ..DecodeOptions::default()
        }
    }
}

/// Default data directory (e.g. ~/.local/share/apkg-study)
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .ok_or(SettingsError::DataDirNotFound)
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

/// Load settings from file, falling back to defaults when it is missing
pub fn load_settings(data_dir: &Path) -> Result<LoaderSettings> {
    let path = settings_path(data_dir);

    if !path.exists() {
        return Ok(LoaderSettings::default());
    }

    let content = fs::read_to_string(&path)?;
    let settings: LoaderSettings = serde_json::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

/// Save settings to file
pub fn save_settings(data_dir: &Path, settings: &LoaderSettings) -> Result<()> {
    settings.validate()?;
    fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(settings_path(data_dir), content)?;
    Ok(())
}
