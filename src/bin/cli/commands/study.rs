use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use chrono::Local;

use apkg_study_lib::apkg::{CardRecord, Deck};
use apkg_study_lib::flashcards::{format_interval, Rating, ReviewSession};

use crate::app::App;
use crate::render::terminal::{field_to_terminal, paint, rule, Color};

enum Input {
    Continue,
    Rate(Rating),
    Quit,
}

pub fn run(app: &App, file: &Path, limit: Option<usize>, reset: bool, use_color: bool) -> Result<()> {
    let deck = app.decode(file)?;
    let today = Local::now().date_naive();

    let mut session = ReviewSession::open(&deck, Some(app.study_storage()), today);
    if let Some(limit) = limit {
        session = session.with_limit(limit);
    }
    if reset {
        session.reset();
    }
    if let Some(err) = session.persistence_error() {
        eprintln!(
            "{}",
            paint(&format!("Progress will not be saved: {}", err), Color::YELLOW, use_color)
        );
    }

    if session.is_complete() {
        println!("Nothing due today.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(state) = session.current() {
        let Some(card) = deck.card(&state.card_id) else {
            break;
        };

        println!();
        println!(
            "{}",
            paint(&format!("{} left", session.remaining()), Color::GRAY, use_color)
        );
        print_side(card, 0..1, use_color);

        print!("{}", paint("[enter] show answer, [q] quit: ", Color::DIM, use_color));
        io::stdout().flush()?;
        if matches!(read_input(&mut lines)?, Input::Quit) {
            break;
        }

        println!("{}", rule(40));
        print_side(card, 1..card.named_fields.len(), use_color);

        let Some(previews) = session.current_previews() else {
            break;
        };
        let choices: Vec<String> = previews
            .iter()
            .enumerate()
            .map(|(i, (rating, days))| format!("[{}] {} ({})", i + 1, rating.label(), format_interval(*days)))
            .collect();

        let rating = loop {
            print!("{}: ", choices.join("  "));
            io::stdout().flush()?;
            match read_input(&mut lines)? {
                Input::Rate(rating) => break Some(rating),
                Input::Quit => break None,
                Input::Continue => continue,
            }
        };
        let Some(rating) = rating else {
            break;
        };

        let answered = session.answer_rating(rating)?;
        if answered.requeued {
            println!("{}", paint("Again later in this session", Color::YELLOW, use_color));
        } else {
            println!(
                "{}",
                paint(
                    &format!("Next review in {}", format_interval(answered.state.interval)),
                    Color::GREEN,
                    use_color
                )
            );
        }
    }

    print_summary(&session, &deck, use_color);
    Ok(())
}

fn print_side(card: &CardRecord, range: std::ops::Range<usize>, use_color: bool) {
    for field in card.named_fields.get(range).unwrap_or_default() {
        let Some(value) = field.slot.as_str() else {
            continue;
        };
        let text = field_to_terminal(value, use_color);
        if text.is_empty() {
            continue;
        }
        println!("{}", paint(&field.name, Color::BOLD, use_color));
        println!("{}", text);
    }
}

fn read_input(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<Input> {
    let Some(line) = lines.next().transpose()? else {
        return Ok(Input::Quit);
    };
    let line = line.trim();

    if line.eq_ignore_ascii_case("q") {
        return Ok(Input::Quit);
    }
    let rating = line.parse::<u8>().ok().and_then(Rating::from_key);
    Ok(rating.map(Input::Rate).unwrap_or(Input::Continue))
}

fn print_summary(session: &ReviewSession, deck: &Deck, use_color: bool) {
    let stats = session.stats();
    println!();
    println!("{}", paint("Session summary", Color::BOLD, use_color));
    println!("Reviewed: {}", stats.reviewed);
    println!("Correct:  {}", stats.correct);
    println!("Accuracy: {}%", stats.accuracy_percent());

    let overall = session.review_stats();
    println!(
        "{} cards: {} new, {} learning, {} mature, {} due",
        deck.cards.len(),
        overall.new,
        overall.learning,
        overall.mature,
        overall.due
    );
}
