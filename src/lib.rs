//! Decode Anki `.apkg` packages and study them with SM-2 scheduling.

pub mod apkg;
pub mod fields;
pub mod flashcards;
pub mod settings;
