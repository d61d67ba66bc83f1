//! Data models for decoded packages

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::DecodeWarning;
use super::media::MediaBinding;

/// ASCII unit separator between note fields
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// A note type (Anki "model") and its ordered field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTypeSchema {
    /// Opaque identifier, kept as a string to avoid precision loss
    pub id: String,
    pub name: String,
    /// Authoritative field order
    pub field_names: Vec<String>,
}

/// One position of a note's name/value view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum FieldSlot {
    Present(String),
    /// The schema names more fields than the note carries
    Absent,
}

impl FieldSlot {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

/// A named field in schema order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedField {
    pub name: String,
    pub slot: FieldSlot,
}

/// A normalized note, one per note id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub note_id: String,
    pub note_type_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_type_name: Option<String>,
    pub deck_id: String,
    /// Raw field values, markup preserved
    pub fields: Vec<String>,
    /// Positional name/value pairs covering the longer of names and values
    pub named_fields: Vec<NamedField>,
}

impl CardRecord {
    /// First present value for a field name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.named_fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.slot.as_str())
    }

    /// Name to value lookup. Duplicate names keep their first value.
    pub fn field_map(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::with_capacity(self.named_fields.len());
        for field in &self.named_fields {
            if let Some(value) = field.slot.as_str() {
                map.entry(field.name.as_str()).or_insert(value);
            }
        }
        map
    }

    /// Whether any raw field contains `query`, ignoring case
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.fields.iter().any(|f| f.to_lowercase().contains(&query))
    }
}

/// Split a raw `flds` blob. N separators always yield N + 1 fields.
pub fn split_fields(raw: &str) -> Vec<String> {
    raw.split(FIELD_SEPARATOR).map(str::to_string).collect()
}

/// A decoded package
#[derive(Debug, Default)]
pub struct Deck {
    /// Cards in ascending note id order
    pub cards: Vec<CardRecord>,
    /// Note types keyed by id
    pub note_types: HashMap<String, NoteTypeSchema>,
    pub media: MediaBinding,
    /// Raw numeric key to filename index, for diagnostics
    pub media_index: BTreeMap<String, String>,
    /// Non-fatal problems absorbed while decoding
    pub warnings: Vec<DecodeWarning>,
}

impl Deck {
    /// Stable identifier used to key study data.
    ///
    /// Built from the first five note ids and the card count, so decoding the
    /// same package again yields the same key.
    pub fn deck_key(&self) -> String {
        deck_key(self.cards.iter().map(|c| c.note_id.as_str()), self.cards.len())
    }

    pub fn card_ids(&self) -> Vec<String> {
        self.cards.iter().map(|c| c.note_id.clone()).collect()
    }

    pub fn card(&self, note_id: &str) -> Option<&CardRecord> {
        self.cards.iter().find(|c| c.note_id == note_id)
    }

    /// Drop every media handle held by this deck
    pub fn release_media(&mut self) -> usize {
        self.media.release()
    }
}

/// Build a deck key from note ids (in deck order) and the total card count
pub fn deck_key<'a>(note_ids: impl Iterator<Item = &'a str>, card_count: usize) -> String {
    let sample: Vec<&str> = note_ids.take(5).collect();
    format!("deck-{}-{}", sample.join("-"), card_count)
}
