//! Anki package (`.apkg`) decoding
//!
//! This module provides:
//! - Archive unpacking (ZIP)
//! - Chunked note extraction from the embedded SQLite collection
//! - Media binding from the package's media index
//! - Normalization of notes against their note types
//! - Searching, paging and JSON export of decoded cards

pub mod archive;
pub mod browse;
pub mod decode;
mod errors;
pub mod media;
mod models;
pub mod normalize;
pub mod progress;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use decode::{decode_apkg, decode_apkg_file, validate_input, DecodeOptions};
pub use errors::{DecodeError, DecodeWarning, Result};
pub use media::{MediaBinding, MediaHandle};
pub use models::*;
pub use progress::{CancelFlag, NoProgress, ProgressSink, Stage};
