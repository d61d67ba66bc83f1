use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use apkg_study_lib::apkg::{decode_apkg_file, Deck, NoProgress, Stage};
use apkg_study_lib::flashcards::StudyStorage;
use apkg_study_lib::settings::{default_data_dir, load_settings, LoaderSettings};

use crate::render::terminal::Color;

/// Shared application state for CLI commands
pub struct App {
    pub data_dir: PathBuf,
    pub settings: LoaderSettings,
}

impl App {
    /// Initialize from the given or default data directory
    pub fn new(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_data_dir().context("Failed to get data directory")?,
        };

        let settings = load_settings(&data_dir)
            .with_context(|| format!("Failed to load settings from {}", data_dir.display()))?;

        Ok(Self { data_dir, settings })
    }

    /// Decode a package quietly
    pub fn decode(&self, file: &Path) -> Result<Deck> {
        decode_apkg_file(file, &self.settings.decode_options(), &mut NoProgress)
            .with_context(|| format!("Failed to decode {}", file.display()))
    }

    /// Decode a package, printing each finished stage to stderr
    pub fn decode_verbose(&self, file: &Path, use_color: bool) -> Result<Deck> {
        let mut report = |stage: Stage, percent: u8| {
            if percent < 100 {
                return;
            }
            if use_color {
                eprintln!("{}  {} done{}", Color::GRAY, stage, Color::RESET);
            } else {
                eprintln!("  {} done", stage);
            }
        };

        decode_apkg_file(file, &self.settings.decode_options(), &mut report)
            .with_context(|| format!("Failed to decode {}", file.display()))
    }

    pub fn study_storage(&self) -> StudyStorage {
        StudyStorage::new(self.data_dir.clone())
    }
}
