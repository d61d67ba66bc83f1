//! Read-only access to the collection database embedded in a package.
//!
//! SQLite needs a file, so the collection bytes are staged in a private
//! temporary file that lives exactly as long as the session.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::Deserialize;
use tempfile::NamedTempFile;

use super::errors::{DecodeError, DecodeWarning, Result};
use super::models::{split_fields, NoteTypeSchema};
use super::progress::Stage;

/// Rows fetched per query
pub const DEFAULT_CHUNK_SIZE: usize = 500;

const NOTES_QUERY: &str = r#"
    SELECT
        CAST(notes.id AS TEXT),
        CAST(notes.mid AS TEXT),
        notes.flds,
        CAST(MIN(cards.did) AS TEXT)
    FROM notes
    JOIN cards ON notes.id = cards.nid
    GROUP BY notes.id
    ORDER BY notes.id ASC
    LIMIT ?1 OFFSET ?2
"#;

const NOTES_COUNT_QUERY: &str = r#"
    SELECT COUNT(DISTINCT notes.id)
    FROM notes
    JOIN cards ON notes.id = cards.nid
"#;

/// One note joined with its cards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub note_id: String,
    pub note_type_id: String,
    pub fields: Vec<String>,
    pub deck_id: String,
}

/// Collection bytes written to disk, ready to open
pub struct StagedStore {
    entry: String,
    file: NamedTempFile,
}

impl StagedStore {
    /// Write `data` to a fresh temporary file, in `dir` or the system temp dir
    pub fn write(entry: &str, data: &[u8], dir: Option<&Path>) -> Result<Self> {
        let io_err = |e: std::io::Error| DecodeError::io(Stage::LoadEngine, entry, e);

        let mut file = match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(io_err)?;
        file.write_all(data).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        let staged = Self {
            entry: entry.to_string(),
            file,
        };
        log::debug!("Staged {} ({} bytes) at {:?}", entry, data.len(), staged.path());
        Ok(staged)
    }

    /// Location of the staged database file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Open the staged collection.
    ///
    /// The connection is write-capable at the SQLite level (so rollback
    /// journals and WAL files can be handled) but `query_only` is enforced.
    pub fn open(self) -> Result<StoreSession> {
        let conn = Connection::open_with_flags(
            self.file.path(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DecodeError::corrupt(Stage::OpenStore, format!("Cannot open {}", self.entry), e))?;

        let session = StoreSession {
            conn,
            entry: self.entry,
            _file: self.file,
        };

        // Forces SQLite to read the header, so a non-database entry fails here
        session
            .conn
            .pragma_update(None, "query_only", true)
            .and_then(|_| {
                session
                    .conn
                    .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            })
            .map_err(|e| {
                DecodeError::corrupt(
                    Stage::OpenStore,
                    format!("{} is not a readable collection database", session.entry),
                    e,
                )
            })?;

        Ok(session)
    }
}

/// An open collection. Closed on drop or via [`StoreSession::close`].
pub struct StoreSession {
    // Declared before the file so the connection closes first
    conn: Connection,
    entry: String,
    _file: NamedTempFile,
}

impl StoreSession {
    /// Read note type definitions.
    ///
    /// Failure here is non-fatal: the caller falls back to generic field names.
    pub fn note_types(&self) -> std::result::Result<HashMap<String, NoteTypeSchema>, DecodeWarning> {
        let warn = |detail: String| DecodeWarning::SchemaParseFailed {
            entry: self.entry.clone(),
            detail,
        };

        let models: Option<String> = self
            .conn
            .query_row("SELECT models FROM col LIMIT 1", [], |row| row.get(0))
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })
            .map_err(|e| warn(e.to_string()))?;

        let models = models.unwrap_or_default();
        let trimmed = models.trim();
        if trimmed.is_empty() || trimmed == "{}" {
            if self.has_table("notetypes").map_err(|e| warn(e.to_string()))? {
                return self.note_types_from_tables().map_err(|e| warn(e.to_string()));
            }
            return Ok(HashMap::new());
        }

        parse_models_json(trimmed).map_err(|e| warn(e.to_string()))
    }

    /// Newer collections keep note types in `notetypes` and `fields` tables
    fn note_types_from_tables(&self) -> rusqlite::Result<HashMap<String, NoteTypeSchema>> {
        let conn = &self.conn;
        let mut schemas = HashMap::new();

        let mut stmt = conn.prepare("SELECT CAST(id AS TEXT), name FROM notetypes")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, name) = row?;
            schemas.insert(
                id.clone(),
                NoteTypeSchema {
                    id,
                    name,
                    field_names: Vec::new(),
                },
            );
        }

        let mut stmt = conn.prepare("SELECT CAST(ntid AS TEXT), name FROM fields ORDER BY ntid, ord")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (ntid, name) = row?;
            if let Some(schema) = schemas.get_mut(&ntid) {
                schema.field_names.push(name);
            }
        }

        Ok(schemas)
    }

    fn has_table(&self, name: &str) -> rusqlite::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of distinct notes that have at least one card
    pub fn count_notes(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(NOTES_COUNT_QUERY, [], |row| row.get(0))
            .map_err(|e| DecodeError::query(&self.entry, "Could not count notes", e))?;
        Ok(count.max(0) as usize)
    }

    /// Iterate over notes in chunks of `chunk_size`, ascending by note id
    pub fn notes(&self, chunk_size: usize) -> NoteChunks<'_> {
        NoteChunks {
            session: self,
            chunk_size: chunk_size.max(1),
            offset: 0,
            total: None,
            finished: false,
        }
    }

    fn fetch_chunk(&self, limit: usize, offset: usize) -> Result<Vec<NoteRow>> {
        let query_err = |e: rusqlite::Error| DecodeError::query(&self.entry, "Could not read notes and cards", e);

        let mut stmt = self.conn.prepare_cached(NOTES_QUERY).map_err(query_err)?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], note_row)
            .map_err(query_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    /// Close the connection and remove the staged file.
    ///
    /// Dropping a session releases the same resources; this variant logs a
    /// failed close instead of ignoring it.
    pub fn close(self) {
        let StoreSession { conn, entry, _file } = self;
        match conn.close() {
            Ok(()) => log::debug!("Closed {}", entry),
            Err((_, e)) => log::warn!("Failed to close {} cleanly: {}", entry, e),
        }
    }
}

fn note_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    let note_id: String = row.get(0)?;
    let fields = split_fields(&text_column(row, 2, &note_id)?);
    Ok(NoteRow {
        note_id,
        note_type_id: row.get(1)?,
        fields,
        deck_id: row.get(3)?,
    })
}

/// Read a column as text, accepting BLOB-typed values from older exporters.
/// Invalid UTF-8 is replaced with U+FFFD and logged against the note.
fn text_column(row: &Row<'_>, idx: usize, note_id: &str) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(t) | ValueRef::Blob(t) => match std::str::from_utf8(t) {
            Ok(text) => text.to_string(),
            Err(e) => {
                log::warn!(
                    "Note {} has invalid UTF-8 in column {} at byte {}; replacing bad sequences",
                    note_id,
                    idx,
                    e.valid_up_to()
                );
                String::from_utf8_lossy(t).into_owned()
            }
        },
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
    })
}

/// Chunked note iterator. Stops after the first short chunk.
pub struct NoteChunks<'a> {
    session: &'a StoreSession,
    chunk_size: usize,
    offset: usize,
    total: Option<usize>,
    finished: bool,
}

/// One page of notes plus how far through the query the iterator is
#[derive(Debug)]
pub struct NoteChunk {
    pub rows: Vec<NoteRow>,
    /// Query progress, held below 100 until the caller finishes
    pub percent: u8,
}

impl NoteChunks<'_> {
    /// Provide the total note count so chunk progress is proportional
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    fn percent(&self) -> u8 {
        match self.total {
            Some(total) if total > 0 => ((self.offset * 100 / total).min(99)) as u8,
            _ => 99,
        }
    }
}

impl Iterator for NoteChunks<'_> {
    type Item = Result<NoteChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let rows = match self.session.fetch_chunk(self.chunk_size, self.offset) {
            Ok(rows) => rows,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        if rows.len() < self.chunk_size {
            self.finished = true;
        }
        if rows.is_empty() {
            return None;
        }

        self.offset += rows.len();
        Some(Ok(NoteChunk {
            percent: self.percent(),
            rows,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct RawNoteType {
    #[serde(default)]
    name: String,
    #[serde(default)]
    flds: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    ord: Option<i64>,
}

/// Parse the `col.models` JSON object, keyed by note type id
pub fn parse_models_json(json: &str) -> serde_json::Result<HashMap<String, NoteTypeSchema>> {
    let raw: HashMap<String, RawNoteType> = serde_json::from_str(json)?;

    Ok(raw
        .into_iter()
        .map(|(id, model)| {
            let mut fields = model.flds;
            // Stable, so entries without `ord` keep their listed order
            fields.sort_by_key(|f| f.ord.unwrap_or(i64::MAX));
            let schema = NoteTypeSchema {
                id: id.clone(),
                name: model.name,
                field_names: fields.into_iter().map(|f| f.name).collect(),
            };
            (id, schema)
        })
        .collect())
}
