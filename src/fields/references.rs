//! Media reference scanning and markup stripping for note fields.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of media a field references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Audio,
}

/// A media file referenced from field markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub kind: MediaKind,
    pub filename: String,
}

// Group 1-3: <img src> with double, single or no quotes. Group 4: [sound:...]
const REFERENCE_PATTERN: &str =
    r#"(?i:<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))[^>]*>)|\[sound:([^\]]+)\]"#;
const SOUND_PATTERN: &str = r"\[sound:[^\]]+\]";
const TAG_PATTERN: &str = r"<[^>]*>";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {}: {}", pattern, e)))
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, REFERENCE_PATTERN)
}

fn sound_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, SOUND_PATTERN)
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, TAG_PATTERN)
}

/// Every image and audio reference in `field`, in document order
pub fn extract_media_refs(field: &str) -> Vec<MediaRef> {
    reference_re()
        .captures_iter(field)
        .filter_map(|caps| {
            if let Some(sound) = caps.get(4) {
                return Some(MediaRef {
                    kind: MediaKind::Audio,
                    filename: sound.as_str().to_string(),
                });
            }
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .filter(|m| !m.as_str().is_empty())
                .map(|m| MediaRef {
                    kind: MediaKind::Image,
                    filename: m.as_str().to_string(),
                })
        })
        .collect()
}

/// References of one kind, in document order
pub fn refs_of_kind(field: &str, kind: MediaKind) -> Vec<MediaRef> {
    extract_media_refs(field)
        .into_iter()
        .filter(|r| r.kind == kind)
        .collect()
}

/// Remove sound directives and all tags, leaving the remaining text untouched
pub fn strip_markup(field: &str) -> String {
    let without_sound = sound_re().replace_all(field, "");
    tag_re().replace_all(&without_sound, "").into_owned()
}
