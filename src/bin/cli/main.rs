mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "apkg-study-cli", about = "Inspect and study Anki packages", version)]
struct Cli {
    /// Use a specific data directory (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a package and summarize its contents
    Inspect {
        /// Path to the .apkg file
        file: PathBuf,
    },

    /// List cards, optionally filtered
    Cards {
        /// Path to the .apkg file
        file: PathBuf,
        /// Case-insensitive text to look for in any field
        #[arg(long)]
        search: Option<String>,
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Export all cards as JSON
    Export {
        /// Path to the .apkg file
        file: PathBuf,
        /// Output JSON file
        out: PathBuf,
    },

    /// Write bundled media files to a directory
    Media {
        /// Path to the .apkg file
        file: PathBuf,
        /// Target directory
        dir: PathBuf,
    },

    /// Show scheduling statistics for a package
    Stats {
        /// Path to the .apkg file
        file: PathBuf,
    },

    /// Review due cards interactively
    Study {
        /// Path to the .apkg file
        file: PathBuf,
        /// Maximum number of cards to review
        #[arg(long)]
        limit: Option<usize>,
        /// Forget stored progress for this package before starting
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Inspect { file } => {
            commands::inspect::run(&app, &file, &cli.format, use_color)?;
        }
        Command::Cards { file, search, page } => {
            commands::cards::run(&app, &file, search.as_deref(), page, &cli.format, use_color)?;
        }
        Command::Export { file, out } => {
            commands::export::run(&app, &file, &out, &cli.format)?;
        }
        Command::Media { file, dir } => {
            commands::media::run(&app, &file, &dir, &cli.format, use_color)?;
        }
        Command::Stats { file } => {
            commands::stats::run(&app, &file, &cli.format, use_color)?;
        }
        Command::Study { file, limit, reset } => {
            commands::study::run(&app, &file, limit, reset, use_color)?;
        }
    }

    Ok(())
}
