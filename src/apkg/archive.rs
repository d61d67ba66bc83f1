//! Package archive reading
//!
//! An `.apkg` is a ZIP container holding the collection database
//! (`collection.anki21` or `collection.anki2`), a JSON `media` index and the
//! media files themselves, stored under numeric names (`0`, `1`, ...).

use std::collections::HashMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use super::errors::{DecodeError, Result};
use super::progress::Stage;

/// Current collection format
pub const CURRENT_STORE_ENTRY: &str = "collection.anki21";
/// Legacy collection format
pub const LEGACY_STORE_ENTRY: &str = "collection.anki2";
/// Numeric key to filename index
pub const MEDIA_INDEX_ENTRY: &str = "media";

const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Decompressed archive entries keyed by path
#[derive(Debug, Default)]
pub struct ArchiveEntries {
    entries: HashMap<String, Vec<u8>>,
}

impl ArchiveEntries {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove an entry, handing its bytes to the caller
    pub fn take(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the collection entry, preferring the current format
    pub fn store_entry_name(&self) -> Result<&'static str> {
        [CURRENT_STORE_ENTRY, LEGACY_STORE_ENTRY]
            .into_iter()
            .find(|name| self.contains(name))
            .ok_or(DecodeError::StoreNotFound {
                current: CURRENT_STORE_ENTRY,
                legacy: LEGACY_STORE_ENTRY,
            })
    }
}

impl FromIterator<(String, Vec<u8>)> for ArchiveEntries {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Decompress every file entry of a ZIP buffer.
///
/// Entries are inflated one at a time directly from `data`; any container or
/// entry failure is reported as [`DecodeError::ArchiveCorrupt`].
pub fn read_archive(data: &[u8]) -> Result<ArchiveEntries> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| DecodeError::corrupt(Stage::Unpack, "Not a valid package archive", e))?;

    let mut entries = HashMap::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| DecodeError::corrupt(Stage::Unpack, format!("Unreadable entry #{}", i), e))?;

        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        // Declared sizes are untrusted, so the preallocation is capped
        let mut content = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut content).map_err(|e| {
            DecodeError::corrupt(Stage::Unpack, format!("Entry '{}' failed to decompress", name), e)
        })?;

        entries.insert(name, content);
    }

    log::debug!("Unpacked {} archive entries", entries.len());
    Ok(ArchiveEntries { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apkg::test_support::zip_bytes;

    #[test]
    fn test_read_archive_entries() {
        let data = zip_bytes(&[("a.txt", b"hello".as_slice()), ("0", b"\x89PNG".as_slice())]);
        let entries = read_archive(&data).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("a.txt"), Some(b"hello".as_slice()));
        assert_eq!(entries.get("0"), Some(b"\x89PNG".as_slice()));
    }

    #[test]
    fn test_read_archive_rejects_garbage() {
        let result = read_archive(b"definitely not a zip file");
        assert!(matches!(result, Err(DecodeError::ArchiveCorrupt { stage: Stage::Unpack, .. })));
    }

    #[test]
    fn test_corrupt_entry_checksum() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;
        use zip::{CompressionMethod, ZipWriter};

        let payload = b"collection payload that will be damaged";
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(CURRENT_STORE_ENTRY, options).unwrap();
        zip.write_all(payload).unwrap();
        let mut data = zip.finish().unwrap().into_inner();

        let at = data
            .windows(payload.len())
            .position(|w| w == payload)
            .unwrap();
        data[at + 5] ^= 0xff;

        match read_archive(&data) {
            Err(DecodeError::ArchiveCorrupt { stage, summary, .. }) => {
                assert_eq!(stage, Stage::Unpack);
                assert_eq!(summary, format!("Entry '{}' failed to decompress", CURRENT_STORE_ENTRY));
            }
            other => panic!("unexpected result: {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn test_store_entry_prefers_current_format() {
        let data = zip_bytes(&[
            (LEGACY_STORE_ENTRY, b"old".as_slice()),
            (CURRENT_STORE_ENTRY, b"new".as_slice()),
        ]);
        let entries = read_archive(&data).unwrap();
        assert_eq!(entries.store_entry_name().unwrap(), CURRENT_STORE_ENTRY);
    }

    #[test]
    fn test_store_entry_falls_back_to_legacy() {
        let data = zip_bytes(&[(LEGACY_STORE_ENTRY, b"old".as_slice())]);
        let entries = read_archive(&data).unwrap();
        assert_eq!(entries.store_entry_name().unwrap(), LEGACY_STORE_ENTRY);
    }

    #[test]
    fn test_store_entry_missing() {
        let data = zip_bytes(&[("media", b"{}".as_slice())]);
        let entries = read_archive(&data).unwrap();
        assert!(matches!(
            entries.store_entry_name(),
            Err(DecodeError::StoreNotFound { .. })
        ));
    }
}
