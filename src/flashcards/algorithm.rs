//! SM-2 Spaced Repetition Algorithm
//!
//! Classical SuperMemo 2 scheduling with whole-day intervals.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation

use chrono::{Days, NaiveDate};
use thiserror::Error;

use super::models::{CardState, CardStatus, Rating, ReviewStats};

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Highest valid SM-2 quality
pub const MAX_QUALITY: u8 = 5;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Quality must be between 0 and 5, got {0}")]
    InvalidQuality(u8),

    #[error("Next due date for card {0} is out of range")]
    DateOutOfRange(String),

    #[error("No card left to review in this session")]
    QueueEmpty,
}

impl From<ReviewError> for String {
    fn from(err: ReviewError) -> String {
        err.to_string()
    }
}

/// Apply one review to a card state.
///
/// Failed reviews (quality < 3) reset the repetition streak and make the card
/// due again today. Successful reviews step through 1 day, 6 days, then the
/// previous interval times the new ease factor.
pub fn apply_review(state: &CardState, quality: u8, today: NaiveDate) -> Result<CardState, ReviewError> {
    if quality > MAX_QUALITY {
        return Err(ReviewError::InvalidQuality(quality));
    }

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let miss = f64::from(MAX_QUALITY - quality);
    let ease_factor = (state.ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

    let (repetition, interval) = if quality < 3 {
        (0, 0)
    } else {
        let repetition = state.repetition.saturating_add(1);
        let interval = match repetition {
            1 => 1,
            2 => 6,
            _ => (f64::from(state.interval) * ease_factor).round() as u32,
        };
        (repetition, interval)
    };

    let due_date = today
        .checked_add_days(Days::new(u64::from(interval)))
        .ok_or_else(|| ReviewError::DateOutOfRange(state.card_id.clone()))?;

    Ok(CardState {
        card_id: state.card_id.clone(),
        ease_factor: round_to_hundredths(ease_factor),
        interval,
        repetition,
        due_date,
        last_review: Some(today),
        review_count: state.review_count.saturating_add(1),
    })
}

/// Round half up at two decimals, judged on the exact binary value.
fn round_to_hundredths(value: f64) -> f64 {
    // Enough digits to print the exact expansion of any ease factor
    let exact = format!("{:.60}", value);
    let Some((whole, fraction)) = exact.split_once('.') else {
        return value;
    };
    let digits: Vec<u32> = fraction.chars().filter_map(|c| c.to_digit(10)).collect();
    let (Ok(whole), [d1, d2, d3, ..]) = (whole.parse::<i64>(), digits.as_slice()) else {
        return value;
    };

    // Too large to carry hundredths; such values have no fractional part anyway
    let Some(hundredths) = whole
        .checked_mul(100)
        .and_then(|h| h.checked_add(i64::from(d1 * 10 + d2 + u32::from(*d3 >= 5))))
    else {
        return value;
    };
    hundredths as f64 / 100.0
}

/// Intervals each answer button would produce, in Again/Hard/Good/Easy order
pub fn preview_intervals(state: &CardState, today: NaiveDate) -> [(Rating, u32); 4] {
    Rating::ALL.map(|rating| {
        let interval = apply_review(state, rating.quality(), today)
            .map(|next| next.interval)
            .unwrap_or(state.interval);
        (rating, interval)
    })
}

/// Cards due on or before `today`, most overdue first.
/// Cards sharing a due date keep their input order.
pub fn due_cards<'a>(states: impl IntoIterator<Item = &'a CardState>, today: NaiveDate) -> Vec<&'a CardState> {
    let mut due: Vec<&CardState> = states.into_iter().filter(|s| s.is_due(today)).collect();
    due.sort_by_key(|s| s.due_date);
    due
}

/// Aggregate statistics. New, learning and mature partition the states;
/// due and overdue are counted independently.
pub fn review_stats<'a>(states: impl IntoIterator<Item = &'a CardState>, today: NaiveDate) -> ReviewStats {
    let mut stats = ReviewStats::default();

    for state in states {
        stats.total += 1;
        match state.status() {
            CardStatus::New => stats.new += 1,
            CardStatus::Learning => stats.learning += 1,
            CardStatus::Mature => stats.mature += 1,
        }
        if state.is_due(today) {
            stats.due += 1;
        }
        if state.is_overdue(today) {
            stats.overdue += 1;
        }
    }

    stats
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    let rounded = |unit: f64| (f64::from(days) / unit).round() as u32;

    if days == 0 {
        "<1m".to_string()
    } else if days == 1 {
        "1d".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", rounded(7.0))
    } else if days < 365 {
        format!("{}mo", rounded(30.0))
    } else {
        format!("{:.1}y", f64::from(days) / 365.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    fn new_card_state() -> CardState {
        CardState::new("1700000000001", today())
    }

    #[test]
    fn test_first_review_correct() {
        let state = apply_review(&new_card_state(), 3, today()).unwrap();

        assert_eq!(state.interval, 1);
        assert_eq!(state.repetition, 1);
        assert_eq!(state.due_date, NaiveDate::from_ymd_opt(2026, 5, 11).unwrap());
        assert_eq!(state.last_review, Some(today()));
        assert_eq!(state.review_count, 1);
        assert_eq!(state.ease_factor, 2.36);
    }

    #[test]
    fn test_good_trajectory() {
        let first = apply_review(&new_card_state(), 3, today()).unwrap();
        let second = apply_review(&first, 3, today()).unwrap();
        let third = apply_review(&second, 3, today()).unwrap();

        assert_eq!(first.interval, 1);
        assert_eq!(second.interval, 6);
        assert_eq!(second.ease_factor, 2.22);

        let expected_ease = (second.ease_factor - 0.14_f64).max(MIN_EASE_FACTOR);
        assert_eq!(third.interval, (6.0 * expected_ease).round() as u32);
        assert_eq!(third.interval, 12);
        assert_eq!(third.ease_factor, 2.08);
        assert_eq!(third.review_count, 3);
    }

    #[test]
    fn test_easy_raises_ease() {
        let state = apply_review(&new_card_state(), 5, today()).unwrap();
        assert_eq!(state.ease_factor, 2.6);
    }

    #[test]
    fn test_failure_resets() {
        let mut state = new_card_state();
        state.interval = 40;
        state.repetition = 6;
        state.review_count = 9;
        state.ease_factor = 2.7;

        for quality in [0, 1, 2] {
            let next = apply_review(&state, quality, today()).unwrap();
            assert_eq!(next.interval, 0);
            assert_eq!(next.repetition, 0);
            assert_eq!(next.due_date, today());
            assert_eq!(next.review_count, 10);
        }
    }

    #[test]
    fn test_ease_factor_minimum() {
        let mut state = new_card_state();
        state.ease_factor = 1.4;

        let once = apply_review(&state, 0, today()).unwrap();
        assert_eq!(once.ease_factor, MIN_EASE_FACTOR);
        let twice = apply_review(&once, 0, today()).unwrap();
        assert_eq!(twice.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_same_input_same_output() {
        let state = new_card_state();
        assert_eq!(
            apply_review(&state, 4, today()).unwrap(),
            apply_review(&state, 4, today()).unwrap()
        );
    }

    #[test]
    fn test_quality_out_of_range() {
        assert_eq!(
            apply_review(&new_card_state(), 6, today()),
            Err(ReviewError::InvalidQuality(6))
        );
    }

    #[test]
    fn test_mature_interval_uses_previous_interval() {
        let mut state = new_card_state();
        state.repetition = 5;
        state.interval = 10;
        state.ease_factor = 2.5;

        // Quality 4 leaves the ease unchanged: 10 * 2.5 = 25
        let next = apply_review(&state, 4, today()).unwrap();
        assert_eq!(next.interval, 25);
        assert_eq!(next.ease_factor, 2.5);
    }

    #[test]
    fn test_round_to_hundredths() {
        assert_eq!(round_to_hundredths(2.5 - 0.14), 2.36);
        assert_eq!(round_to_hundredths(2.125), 2.13);
        assert_eq!(round_to_hundredths(1.005), 1.0);
        assert_eq!(round_to_hundredths(1.3), 1.3);
        assert_eq!(round_to_hundredths(2.999), 3.0);
    }

    #[test]
    fn test_huge_ease_factor_does_not_overflow() {
        let mut state = new_card_state();
        state.ease_factor = 1e17;

        let next = apply_review(&state, 5, today()).unwrap();
        assert!(next.ease_factor >= 1e17);
        assert_eq!(round_to_hundredths(1e300), 1e300);
    }

    #[test]
    fn test_counters_saturate() {
        let mut state = new_card_state();
        state.review_count = u32::MAX;
        state.repetition = u32::MAX;
        state.interval = 3;

        let next = apply_review(&state, 3, today()).unwrap();
        assert_eq!(next.review_count, u32::MAX);
        assert_eq!(next.repetition, u32::MAX);
        assert_eq!(next.interval, 7);
    }

    #[test]
    fn test_due_cards_filters_and_sorts() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 5, d).unwrap();
        let mut states = Vec::new();
        for (id, due) in [("a", 12), ("b", 8), ("c", 10), ("d", 3), ("e", 8)] {
            let mut s = CardState::new(id, day(1));
            s.due_date = day(due);
            states.push(s);
        }

        let due = due_cards(&states, today());
        let ids: Vec<&str> = due.iter().map(|s| s.card_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "e", "c"]);
        assert!(due.iter().all(|s| s.due_date <= today()));
        assert!(due.windows(2).all(|w| w[0].due_date <= w[1].due_date));
    }

    #[test]
    fn test_review_stats() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 5, d).unwrap();
        let fresh = CardState::new("new", today());
        let mut learning = CardState::new("learning", day(1));
        learning.review_count = 2;
        learning.interval = 6;
        learning.due_date = day(4);
        let mut mature = CardState::new("mature", day(1));
        mature.review_count = 5;
        mature.interval = 30;
        mature.due_date = day(30);

        let stats = review_stats([&fresh, &learning, &mature], today());

        assert_eq!(
            stats,
            ReviewStats {
                total: 3,
                new: 1,
                learning: 1,
                mature: 1,
                due: 2,
                overdue: 1,
            }
        );
    }

    #[test]
    fn test_preview_intervals() {
        let mut state = new_card_state();
        state.repetition = 2;
        state.interval = 6;
        state.review_count = 2;

        let preview = preview_intervals(&state, today());
        assert_eq!(preview[0], (Rating::Again, 0));
        assert_eq!(preview[1], (Rating::Hard, 0));
        // Good: ease 2.36, 6 * 2.36 = 14.16
        assert_eq!(preview[2], (Rating::Good, 14));
        // Easy: ease 2.6, 6 * 2.6 = 15.6
        assert_eq!(preview[3], (Rating::Easy, 16));
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "<1m");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(11), "2w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(100), "3mo");
        assert_eq!(format_interval(365), "1.0y");
        assert_eq!(format_interval(900), "2.5y");
    }
}
