//! Media binding
//!
//! Packages store media under numeric entry names and ship a `media` JSON
//! index mapping those names to the filenames that card fields reference.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use super::archive::{ArchiveEntries, MEDIA_INDEX_ENTRY};
use super::errors::DecodeWarning;

/// A bound media file
#[derive(Debug, Clone)]
pub struct MediaHandle {
    /// Locator unique to the decode that produced this handle
    pub locator: String,
    pub filename: String,
    pub data: Bytes,
}

impl MediaHandle {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.filename)
    }
}

/// Filename to handle mapping owned by a deck
#[derive(Debug)]
pub struct MediaBinding {
    binding_id: Uuid,
    handles: BTreeMap<String, MediaHandle>,
}

impl Default for MediaBinding {
    fn default() -> Self {
        Self {
            binding_id: Uuid::new_v4(),
            handles: BTreeMap::new(),
        }
    }
}

impl MediaBinding {
    pub fn binding_id(&self) -> Uuid {
        self.binding_id
    }

    pub fn get(&self, filename: &str) -> Option<&MediaHandle> {
        self.handles.get(filename)
    }

    /// Locator for a filename, if bound
    pub fn resolve(&self, filename: &str) -> Option<&str> {
        self.handles.get(filename).map(|h| h.locator.as_str())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaHandle> {
        self.handles.values()
    }

    fn insert(&mut self, filename: String, data: Bytes) {
        let locator = format!("apkg-media://{}/{}", self.binding_id, filename);
        self.handles.insert(
            filename.clone(),
            MediaHandle {
                locator,
                filename,
                data,
            },
        );
    }

    /// Drop every handle, returning how many were released
    pub fn release(&mut self) -> usize {
        let count = self.handles.len();
        self.handles.clear();
        if count > 0 {
            log::debug!("Released {} media handles for binding {}", count, self.binding_id);
        }
        count
    }

    /// Write every bound file into `dir`, returning the written paths.
    ///
    /// Filenames that would escape `dir` are skipped with a warning.
    pub fn export_to_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.handles.len());
        for handle in self.handles.values() {
            if !is_safe_filename(&handle.filename) {
                log::warn!("Skipping media file with unsafe name: {:?}", handle.filename);
                continue;
            }
            let path = dir.join(&handle.filename);
            fs::write(&path, &handle.data)?;
            written.push(path);
        }

        log::info!("Exported {} media files to {:?}", written.len(), dir);
        Ok(written)
    }
}

fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Parse the `media` index entry (numeric key to filename)
pub fn parse_media_index(data: &[u8]) -> Result<BTreeMap<String, String>, DecodeWarning> {
    serde_json::from_slice(data).map_err(|e| DecodeWarning::MediaIndexParseFailed {
        detail: e.to_string(),
    })
}

/// Result of binding a package's media
#[derive(Debug, Default)]
pub struct BoundMedia {
    pub index: BTreeMap<String, String>,
    pub binding: MediaBinding,
    pub warning: Option<DecodeWarning>,
}

/// Bind media files out of the archive entries.
///
/// A missing or unreadable index yields an empty binding. Index entries whose
/// numeric file is absent from the archive are skipped.
pub fn bind_media(entries: &mut ArchiveEntries) -> BoundMedia {
    let mut bound = BoundMedia::default();

    let Some(raw_index) = entries.take(MEDIA_INDEX_ENTRY) else {
        log::debug!("Package has no media index");
        return bound;
    };

    bound.index = match parse_media_index(&raw_index) {
        Ok(index) => index,
        Err(warning) => {
            log::warn!("{}", warning);
            bound.warning = Some(warning);
            return bound;
        }
    };

    let mut skipped = 0;
    for (key, filename) in &bound.index {
        match entries.take(key) {
            Some(data) => bound.binding.insert(filename.clone(), Bytes::from(data)),
            None => skipped += 1,
        }
    }

    log::info!(
        "Bound {} media files ({} index entries without data)",
        bound.binding.len(),
        skipped
    );
    bound
}

/// Guess a MIME type from a media filename
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
