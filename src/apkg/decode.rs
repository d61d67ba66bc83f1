//! The decode pipeline: bytes in, [`Deck`] out.
//!
//! Stages run strictly in order and report progress at entry and completion;
//! the query stage also reports once per chunk and checks for cancellation
//! between chunks.

use std::fs;
use std::path::{Path, PathBuf};

use super::archive::read_archive;
use super::errors::{DecodeError, Result};
use super::media::bind_media;
use super::models::Deck;
use super::normalize::normalize_rows;
use super::progress::{CancelFlag, ProgressSink, Stage};
use super::store::{StagedStore, DEFAULT_CHUNK_SIZE};

/// Default upper bound on package size (300 MiB)
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 300 * 1024 * 1024;

/// Expected package extension
pub const PACKAGE_EXTENSION: &str = "apkg";

/// Knobs for a single decode
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub max_archive_bytes: u64,
    pub chunk_size: usize,
    pub cancel: Option<CancelFlag>,
    /// Where the collection is staged for SQLite; the system temp dir if unset
    pub staging_dir: Option<PathBuf>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: None,
            staging_dir: None,
        }
    }
}

impl DecodeOptions {
    fn check_cancelled(&self, stage: Stage) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => {
                log::info!("Decode cancelled during {}", stage);
                Err(DecodeError::Cancelled(stage))
            }
            _ => Ok(()),
        }
    }
}

/// Reject inputs that are not `.apkg` files or exceed the size limit
pub fn validate_input(name: &str, len: u64, max_archive_bytes: u64) -> Result<()> {
    let has_extension = Path::new(name)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION));
    if !has_extension {
        return Err(DecodeError::InvalidInput(format!(
            "'{}' is not an .{} package",
            name, PACKAGE_EXTENSION
        )));
    }

    if len == 0 {
        return Err(DecodeError::InvalidInput(format!("'{}' is empty", name)));
    }

    if len > max_archive_bytes {
        return Err(DecodeError::InvalidInput(format!(
            "'{}' is {:.2} MB, larger than the {:.0} MB limit",
            name,
            len as f64 / 1024.0 / 1024.0,
            max_archive_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

/// Read and decode a package from disk
pub fn decode_apkg_file(
    path: &Path,
    options: &DecodeOptions,
    progress: &mut dyn ProgressSink,
) -> Result<Deck> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let io_err = |e: std::io::Error| DecodeError::io(Stage::Read, path.display().to_string(), e);
    let len = fs::metadata(path).map_err(io_err)?.len();
    validate_input(&name, len, options.max_archive_bytes)?;

    progress.report(Stage::Read, 0);
    let data = fs::read(path).map_err(io_err)?;
    progress.report(Stage::Read, 100);

    decode_archive(&data, options, progress)
}

/// Decode a package already held in memory
pub fn decode_apkg(
    name: &str,
    data: &[u8],
    options: &DecodeOptions,
    progress: &mut dyn ProgressSink,
) -> Result<Deck> {
    validate_input(name, data.len() as u64, options.max_archive_bytes)?;

    progress.report(Stage::Read, 0);
    progress.report(Stage::Read, 100);

    decode_archive(data, options, progress)
}

fn decode_archive(data: &[u8], options: &DecodeOptions, progress: &mut dyn ProgressSink) -> Result<Deck> {
    progress.report(Stage::Unpack, 0);
    let mut entries = read_archive(data)?;
    progress.report(Stage::Unpack, 100);
    options.check_cancelled(Stage::Unpack)?;

    progress.report(Stage::LocateStore, 0);
    let store_entry = entries.store_entry_name()?;
    let store_bytes = entries.take(store_entry).unwrap_or_default();
    log::info!("Using {} ({} bytes)", store_entry, store_bytes.len());
    progress.report(Stage::LocateStore, 100);

    // Media only needs the archive entries
    let media = bind_media(&mut entries);
    drop(entries);

    let mut deck = Deck {
        media: media.binding,
        media_index: media.index,
        ..Deck::default()
    };
    deck.warnings.extend(media.warning);

    progress.report(Stage::LoadEngine, 0);
    let staged = StagedStore::write(store_entry, &store_bytes, options.staging_dir.as_deref())?;
    drop(store_bytes);
    progress.report(Stage::LoadEngine, 100);
    options.check_cancelled(Stage::LoadEngine)?;

    progress.report(Stage::OpenStore, 0);
    let session = staged.open()?;
    progress.report(Stage::OpenStore, 100);

    progress.report(Stage::Query, 0);
    deck.note_types = match session.note_types() {
        Ok(note_types) => note_types,
        Err(warning) => {
            log::warn!("{}", warning);
            deck.warnings.push(warning);
            Default::default()
        }
    };

    let total = session.count_notes()?;
    for chunk in session.notes(options.chunk_size).with_total(total) {
        let chunk = chunk?;
        deck.cards.extend(normalize_rows(chunk.rows, &deck.note_types));
        progress.report(Stage::Query, chunk.percent);
        options.check_cancelled(Stage::Query)?;
    }
    session.close();
    progress.report(Stage::Query, 100);

    log::info!(
        "Decoded {} cards, {} note types, {} media files",
        deck.cards.len(),
        deck.note_types.len(),
        deck.media.len()
    );
    progress.report(Stage::Done, 100);

    Ok(deck)
}
