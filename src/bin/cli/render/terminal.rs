use std::sync::OnceLock;

use apkg_study_lib::fields::{extract_media_refs, strip_markup, MediaKind};
use regex::Regex;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in a color when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</div>|</p>").unwrap())
}

/// Render a raw field for the terminal: line breaks kept, markup removed,
/// media shown as placeholders
pub fn field_to_terminal(raw: &str, use_color: bool) -> String {
    let with_breaks = line_break_re().replace_all(raw, "\n");
    let text = decode_entities(&strip_markup(&with_breaks));

    let mut out = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    for media in extract_media_refs(raw) {
        let label = match media.kind {
            MediaKind::Image => format!("[image: {}]", media.filename),
            MediaKind::Audio => format!("[audio: {}]", media.filename),
        };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&paint(&label, Color::CYAN, use_color));
    }

    out
}

/// Single-line preview of a field, cut to `max_chars`
pub fn field_preview(raw: &str, max_chars: usize) -> String {
    let text = decode_entities(&strip_markup(raw));
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, max_chars)
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Horizontal rule of box-drawing characters
pub fn rule(width: usize) -> String {
    "\u{2500}".repeat(width)
}
