use std::path::Path;

use anyhow::Result;
use chrono::Local;

use apkg_study_lib::flashcards::{review_stats, CardState};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck = app.decode(file)?;
    let deck_key = deck.deck_key();
    let today = Local::now().date_naive();

    let (stored, load_err) = app.study_storage().load_or_empty(&deck_key);
    if let Some(err) = load_err {
        eprintln!(
            "{}",
            paint(&format!("Progress unavailable: {}", err), Color::YELLOW, use_color)
        );
    }
    let updated_at = stored.as_ref().and_then(|d| d.updated_at);
    let mut states = stored.map(|d| d.card_states).unwrap_or_default();
    for id in deck.card_ids() {
        states
            .entry(id.clone())
            .or_insert_with(|| CardState::new(id, today));
    }

    let stats = review_stats(states.values(), today);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deckKey": deck_key,
                "stats": stats,
                "updatedAt": updated_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", paint(&deck_key, Color::BOLD, use_color));
            println!("Total:    {}", stats.total);
            println!("New:      {}", paint(&stats.new.to_string(), Color::BLUE, use_color));
            println!("Learning: {}", paint(&stats.learning.to_string(), Color::YELLOW, use_color));
            println!("Mature:   {}", paint(&stats.mature.to_string(), Color::GREEN, use_color));
            println!("Due:      {}", stats.due);
            println!("Overdue:  {}", paint(&stats.overdue.to_string(), Color::RED, use_color));
            match updated_at {
                Some(at) => println!("Last studied {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
                None => println!("Not studied yet"),
            }
        }
    }

    Ok(())
}
