use std::path::Path;

use anyhow::{bail, Result};

use apkg_study_lib::apkg::browse::page_cards;

use crate::app::App;
use crate::render::terminal::{field_preview, paint, rule, Color};
use crate::OutputFormat;

pub fn run(
    app: &App,
    file: &Path,
    search: Option<&str>,
    page: usize,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    if page == 0 {
        bail!("Pages are numbered from 1");
    }

    let deck = app.decode(file)?;
    let result = page_cards(&deck.cards, search.unwrap_or(""), page - 1, app.settings.page_size);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "page": result.page + 1,
                "totalPages": result.total_pages,
                "totalMatches": result.total_matches,
                "cards": result.cards,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if result.cards.is_empty() {
                match search {
                    Some(q) => println!("No cards matching '{}'.", q),
                    None => println!("No cards."),
                }
                return Ok(());
            }

            let id_w = result.cards.iter().map(|c| c.note_id.len()).max().unwrap_or(2).max(2);
            let front_w = 36;

            println!("{:<id_w$} {:<front_w$} {}", "Id", "Front", "Back", id_w = id_w, front_w = front_w);
            println!("{} {} {}", rule(id_w), rule(front_w), rule(36));

            for card in &result.cards {
                let front = card.fields.first().map(|f| field_preview(f, front_w)).unwrap_or_default();
                let back = card.fields.get(1).map(|f| field_preview(f, 36)).unwrap_or_default();
                println!(
                    "{} {:<front_w$} {}",
                    paint(&format!("{:<id_w$}", card.note_id, id_w = id_w), Color::GRAY, use_color),
                    front,
                    back,
                    front_w = front_w
                );
            }

            println!(
                "\nPage {} of {} ({} cards)",
                result.page + 1,
                result.total_pages,
                result.total_matches
            );
        }
    }

    Ok(())
}
