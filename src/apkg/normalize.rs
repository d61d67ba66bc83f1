//! Joins extracted note rows with their note types

use std::collections::HashMap;

use super::models::{CardRecord, FieldSlot, NamedField, NoteTypeSchema};
use super::store::NoteRow;

/// Generic name for the field at `index` (0-based)
pub fn synthesized_field_name(index: usize) -> String {
    format!("Field {}", index + 1)
}

/// Build a card record from a note row.
///
/// Field names come from the note type when known. The named view covers the
/// longer of names and values: extra values get synthesized names, extra
/// names are marked absent. Raw field values are never altered or dropped.
pub fn normalize_row(row: NoteRow, note_types: &HashMap<String, NoteTypeSchema>) -> CardRecord {
    let schema = note_types.get(&row.note_type_id);
    let names: &[String] = schema.map(|s| s.field_names.as_slice()).unwrap_or(&[]);

    let width = names.len().max(row.fields.len());
    let named_fields = (0..width)
        .map(|i| NamedField {
            name: names
                .get(i)
                .cloned()
                .unwrap_or_else(|| synthesized_field_name(i)),
            slot: row
                .fields
                .get(i)
                .map_or(FieldSlot::Absent, |v| FieldSlot::Present(v.clone())),
        })
        .collect();

    CardRecord {
        note_id: row.note_id,
        note_type_id: row.note_type_id,
        note_type_name: schema.map(|s| s.name.clone()),
        deck_id: row.deck_id,
        fields: row.fields,
        named_fields,
    }
}

/// Normalize a batch of rows, preserving order
pub fn normalize_rows(
    rows: impl IntoIterator<Item = NoteRow>,
    note_types: &HashMap<String, NoteTypeSchema>,
) -> Vec<CardRecord> {
    rows.into_iter().map(|row| normalize_row(row, note_types)).collect()
}
