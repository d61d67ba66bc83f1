//! Persistence for study progress
//!
//! All decks share one file in the data directory:
//! ```text
//! {data-dir}/
//! └── study_data.json   # { "deck-...": { "cardStates": {...}, "updatedAt": "..." } }
//! ```
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a deck's record is replaced all-or-nothing.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::models::{CardState, StudyData};

pub const STUDY_DATA_FILE: &str = "study_data.json";

#[derive(Error, Debug)]
pub enum StudyStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Study data unavailable at {path}: {reason}")]
    PersistenceUnavailable { path: PathBuf, reason: String },
}

impl From<StudyStorageError> for String {
    fn from(err: StudyStorageError) -> String {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, StudyStorageError>;

type StudyFile = BTreeMap<String, StudyData>;

/// Storage manager for per-deck study data
pub struct StudyStorage {
    data_dir: PathBuf,
}

impl StudyStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file_path(&self) -> PathBuf {
        self.data_dir.join(STUDY_DATA_FILE)
    }

    fn unavailable(&self, reason: impl ToString) -> StudyStorageError {
        StudyStorageError::PersistenceUnavailable {
            path: self.file_path(),
            reason: reason.to_string(),
        }
    }

    fn read_all(&self) -> Result<StudyFile> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(StudyFile::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| self.unavailable(e))?;
        if content.trim().is_empty() {
            return Ok(StudyFile::new());
        }
        serde_json::from_str(&content).map_err(|e| self.unavailable(e))
    }

    fn write_all(&self, data: &StudyFile) -> Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| self.unavailable(e))?;

        let json = serde_json::to_string_pretty(data)?;
        let mut tmp = NamedTempFile::new_in(&self.data_dir).map_err(|e| self.unavailable(e))?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.file_path()).map_err(|e| self.unavailable(e.error))?;
        Ok(())
    }

    /// Load study data for a deck. `None` means no prior history.
    pub fn load(&self, deck_key: &str) -> Result<Option<StudyData>> {
        let mut all = self.read_all()?;
        Ok(all.remove(deck_key))
    }

    /// Like `load`, but an unreadable store counts as no history. The
    /// failure is logged and handed back alongside.
    pub fn load_or_empty(&self, deck_key: &str) -> (Option<StudyData>, Option<StudyStorageError>) {
        match self.load(deck_key) {
            Ok(data) => (data, None),
            Err(e) => {
                warn!("Could not load study data for {}: {}", deck_key, e);
                (None, Some(e))
            }
        }
    }

    /// Replace a deck's card states, stamping the update time
    pub fn save(&self, deck_key: &str, card_states: &BTreeMap<String, CardState>) -> Result<StudyData> {
        let mut all = self.read_all()?;
        let data = StudyData {
            card_states: card_states.clone(),
            updated_at: Some(Utc::now()),
        };
        all.insert(deck_key.to_string(), data.clone());
        self.write_all(&all)?;

        debug!("Saved {} card states for {}", card_states.len(), deck_key);
        Ok(data)
    }

    /// Forget a deck. Returns whether anything was stored for it.
    pub fn remove(&self, deck_key: &str) -> Result<bool> {
        let mut all = self.read_all()?;
        if all.remove(deck_key).is_none() {
            return Ok(false);
        }
        self.write_all(&all)?;
        Ok(true)
    }

    /// Keys of every deck with stored progress
    pub fn deck_keys(&self) -> Result<Vec<String>> {
        Ok(self.read_all()?.into_keys().collect())
    }
}
