use std::path::Path;

use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, file: &Path, dir: &Path, format: &OutputFormat, use_color: bool) -> Result<()> {
    let mut deck = app.decode(file)?;

    let written = deck
        .media
        .export_to_dir(dir)
        .with_context(|| format!("Failed to write media to {}", dir.display()))?;
    let skipped = deck.media.len().saturating_sub(written.len());
    deck.release_media();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "written": written.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
                "skipped": skipped,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for path in &written {
                println!("  {}", path.display());
            }
            println!("Wrote {} media files to {}", written.len(), dir.display());
            if skipped > 0 {
                println!(
                    "{}",
                    paint(
                        &format!("Skipped {} files with unsafe names", skipped),
                        Color::YELLOW,
                        use_color
                    )
                );
            }
        }
    }

    Ok(())
}
