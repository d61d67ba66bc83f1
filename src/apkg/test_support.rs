//! Fixture packages for tests

use std::io::{Cursor, Write};

use rusqlite::{params, Connection};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const BASIC_MODELS_JSON: &str = r#"{"1000": {"id": 1000, "name": "Basic", "flds": [
    {"name": "Front", "ord": 0},
    {"name": "Back", "ord": 1}
]}}"#;

/// Description of a collection database to build
pub struct CollectionFixture {
    pub models_json: String,
    /// (note id, note type id, raw fields)
    pub notes: Vec<(i64, i64, String)>,
    /// Notes whose fields are stored as raw BLOB bytes
    pub blob_notes: Vec<(i64, i64, Vec<u8>)>,
    /// Additional (note id, deck id) cards beyond the one each note gets
    pub extra_cards: Vec<(i64, i64)>,
    /// Also create the newer `notetypes` and `fields` tables
    pub notetype_tables: bool,
    pub without_cards_table: bool,
}

impl CollectionFixture {
    /// `count` notes of the Basic type, ids `1..=count`
    pub fn basic(count: i64) -> Self {
        Self {
            models_json: BASIC_MODELS_JSON.to_string(),
            notes: (1..=count)
                .map(|i| (i, 1000, format!("front {}\u{1f}back {}", i, i)))
                .collect(),
            blob_notes: Vec::new(),
            extra_cards: Vec::new(),
            notetype_tables: false,
            without_cards_table: false,
        }
    }
}

/// Build a collection database and return its bytes
pub fn collection_bytes(fixture: &CollectionFixture) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("collection.anki2");
    let conn = Connection::open(&path).unwrap();

    conn.execute_batch(
        r#"
        CREATE TABLE col (id integer primary key, models text not null);
        CREATE TABLE notes (
            id integer primary key,
            mid integer not null,
            flds text not null
        );
        "#,
    )
    .unwrap();
    if !fixture.without_cards_table {
        conn.execute_batch(
            "CREATE TABLE cards (id integer primary key, nid integer not null, did integer not null);",
        )
        .unwrap();
    }

    conn.execute(
        "INSERT INTO col (id, models) VALUES (1, ?1)",
        params![fixture.models_json],
    )
    .unwrap();

    let text_notes = fixture
        .notes
        .iter()
        .map(|(id, mid, flds)| (*id, *mid, rusqlite::types::Value::Text(flds.clone())));
    let blob_notes = fixture
        .blob_notes
        .iter()
        .map(|(id, mid, flds)| (*id, *mid, rusqlite::types::Value::Blob(flds.clone())));
    for (id, mid, flds) in text_notes.chain(blob_notes) {
        conn.execute(
            "INSERT INTO notes (id, mid, flds) VALUES (?1, ?2, ?3)",
            params![id, mid, flds],
        )
        .unwrap();
        if !fixture.without_cards_table {
            conn.execute(
                "INSERT INTO cards (id, nid, did) VALUES (?1, ?2, 1)",
                params![id * 10, id],
            )
            .unwrap();
        }
    }

    for (i, (nid, did)) in fixture.extra_cards.iter().enumerate() {
        conn.execute(
            "INSERT INTO cards (id, nid, did) VALUES (?1, ?2, ?3)",
            params![nid * 10 + 1 + i as i64, nid, did],
        )
        .unwrap();
    }

    if fixture.notetype_tables {
        conn.execute_batch(
            r#"
            CREATE TABLE notetypes (id integer primary key, name text not null);
            CREATE TABLE fields (ntid integer not null, ord integer not null, name text not null);
            INSERT INTO notetypes (id, name) VALUES (1000, 'Basic');
            INSERT INTO fields (ntid, ord, name) VALUES (1000, 1, 'Back');
            INSERT INTO fields (ntid, ord, name) VALUES (1000, 0, 'Front');
            "#,
        )
        .unwrap();
    }

    drop(conn);
    std::fs::read(&path).unwrap()
}

/// Build a ZIP archive from name/content pairs
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Build a complete `.apkg` from a collection plus optional media
pub fn apkg_bytes(
    store_entry: &str,
    fixture: &CollectionFixture,
    media_index: Option<&str>,
    media_files: &[(&str, &[u8])],
) -> Vec<u8> {
    let collection = collection_bytes(fixture);
    let mut entries: Vec<(&str, &[u8])> = vec![(store_entry, collection.as_slice())];
    if let Some(index) = media_index {
        entries.push(("media", index.as_bytes()));
    }
    entries.extend_from_slice(media_files);
    zip_bytes(&entries)
}
