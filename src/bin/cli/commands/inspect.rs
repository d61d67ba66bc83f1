use std::path::Path;

use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, rule, Color};
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck = app.decode_verbose(file, use_color)?;

    let mut note_types: Vec<_> = deck.note_types.values().collect();
    note_types.sort_by(|a, b| a.name.cmp(&b.name));

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deckKey": deck.deck_key(),
                "cardCount": deck.cards.len(),
                "noteTypes": note_types,
                "mediaCount": deck.media.len(),
                "mediaIndexCount": deck.media_index.len(),
                "warnings": deck.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let title = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            println!("{}", paint(&title, Color::BOLD, use_color));
            println!("{}", rule(title.chars().count().max(20)));
            println!("Deck key:   {}", deck.deck_key());
            println!("Cards:      {}", deck.cards.len());
            println!("Media:      {} of {} indexed", deck.media.len(), deck.media_index.len());
            println!("Note types: {}", note_types.len());

            for nt in &note_types {
                println!(
                    "  {} {}",
                    nt.name,
                    paint(&format!("({})", nt.field_names.join(", ")), Color::GRAY, use_color)
                );
            }

            if !deck.warnings.is_empty() {
                println!();
                for warning in &deck.warnings {
                    println!("{} {}", paint("warning:", Color::YELLOW, use_color), warning);
                }
            }
        }
    }

    Ok(())
}
