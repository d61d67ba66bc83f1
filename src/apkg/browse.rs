//! Searching, paging and exporting decoded cards

use std::fs;
use std::path::Path;

use super::models::CardRecord;

/// Cards shown per page by default
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One page of a (possibly filtered) card list
#[derive(Debug)]
pub struct CardPage<'a> {
    pub cards: Vec<&'a CardRecord>,
    /// Zero-based page index, clamped to the last page
    pub page: usize,
    pub total_pages: usize,
    /// Cards matching the filter across all pages
    pub total_matches: usize,
}

/// Cards with any raw field containing `query`, ignoring case.
/// A blank query matches everything.
pub fn search_cards<'a>(cards: &'a [CardRecord], query: &str) -> Vec<&'a CardRecord> {
    let query = query.trim();
    if query.is_empty() {
        return cards.iter().collect();
    }
    cards.iter().filter(|card| card.matches(query)).collect()
}

/// Slice the search results for `query` into pages of `page_size`
pub fn page_cards<'a>(cards: &'a [CardRecord], query: &str, page: usize, page_size: usize) -> CardPage<'a> {
    let matches = search_cards(cards, query);
    let page_size = page_size.max(1);
    let total_matches = matches.len();
    let total_pages = total_matches.div_ceil(page_size);
    let page = page.min(total_pages.saturating_sub(1));

    let cards = matches
        .into_iter()
        .skip(page * page_size)
        .take(page_size)
        .collect();

    CardPage {
        cards,
        page,
        total_pages,
        total_matches,
    }
}

/// Serialize cards as pretty-printed JSON
pub fn cards_to_json(cards: &[CardRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(cards)
}

/// Write cards as JSON to `path`
pub fn export_cards_json(cards: &[CardRecord], path: &Path) -> std::io::Result<()> {
    let content = cards_to_json(cards)?;
    fs::write(path, content)?;
    log::info!("Exported {} cards to {:?}", cards.len(), path);
    Ok(())
}
