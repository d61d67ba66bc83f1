use std::path::Path;

use anyhow::{Context, Result};

use apkg_study_lib::apkg::browse::export_cards_json;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, out: &Path, format: &OutputFormat) -> Result<()> {
    let deck = app.decode(file)?;

    export_cards_json(&deck.cards, out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": out.to_string_lossy(),
                "cardCount": deck.cards.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Exported {} cards to {}", deck.cards.len(), out.display());
        }
    }

    Ok(())
}
