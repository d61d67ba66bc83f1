//! Helpers for reading raw note field markup
//!
//! Pure functions only; nothing here touches a deck or the filesystem.

mod references;
pub use references::*;
