//! Data models for the study scheduler

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days of interval at which a card counts as mature
pub const MATURE_INTERVAL_DAYS: u32 = 21;

/// Default SM-2 ease factor
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Answer ratings surfaced to users, mapped onto the SM-2 0-5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// SM-2 quality for this rating
    pub fn quality(self) -> u8 {
        match self {
            Rating::Again => 0,
            Rating::Hard => 2,
            Rating::Good => 3,
            Rating::Easy => 5,
        }
    }

    /// Map UI keys 1-4 to ratings
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            1 => Some(Rating::Again),
            2 => Some(Rating::Hard),
            3 => Some(Rating::Good),
            4 => Some(Rating::Easy),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }
}

/// Where a card sits in the learning process, derived from its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    /// Never reviewed
    New,
    /// Interval below the maturity threshold
    Learning,
    /// Interval at or above the maturity threshold
    Mature,
}

/// Spaced repetition state for one card, keyed by note id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    pub card_id: String,
    /// SM-2 ease factor, never below 1.3
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Current interval in days
    #[serde(default)]
    pub interval: u32,
    /// Consecutive successful reviews
    #[serde(default)]
    pub repetition: u32,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub last_review: Option<NaiveDate>,
    #[serde(default)]
    pub review_count: u32,
}

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

impl CardState {
    /// Fresh state, due on `today`
    pub fn new(card_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            card_id: card_id.into(),
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            repetition: 0,
            due_date: today,
            last_review: None,
            review_count: 0,
        }
    }

    pub fn status(&self) -> CardStatus {
        if self.review_count == 0 {
            CardStatus::New
        } else if self.interval < MATURE_INTERVAL_DAYS {
            CardStatus::Learning
        } else {
            CardStatus::Mature
        }
    }

    /// Due on or before `today`
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.due_date <= today
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today
    }
}

/// Population statistics over a set of card states
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub mature: usize,
    pub due: usize,
    pub overdue: usize,
}

/// Persisted study data for one deck
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyData {
    #[serde(default)]
    pub card_states: BTreeMap<String, CardState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Answers given during one study session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub reviewed: usize,
    pub correct: usize,
}

impl SessionStats {
    /// Share of correct answers, rounded to a whole percent
    pub fn accuracy_percent(&self) -> u32 {
        if self.reviewed == 0 {
            return 0;
        }
        (self.correct as f64 / self.reviewed as f64 * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_new_state_defaults() {
        let state = CardState::new("123", day(1));
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.interval, 0);
        assert_eq!(state.due_date, day(1));
        assert_eq!(state.status(), CardStatus::New);
        assert!(state.is_due(day(1)));
        assert!(!state.is_overdue(day(1)));
    }

    #[test]
    fn test_status_thresholds() {
        let mut state = CardState::new("1", day(1));
        state.review_count = 3;
        state.interval = 20;
        assert_eq!(state.status(), CardStatus::Learning);
        state.interval = 21;
        assert_eq!(state.status(), CardStatus::Mature);
    }

    #[test]
    fn test_state_json_shape() {
        let state = CardState::new("1", day(5));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["cardId"], "1");
        assert_eq!(json["dueDate"], "2026-03-05");
        assert_eq!(json["lastReview"], serde_json::Value::Null);
        assert_eq!(json["easeFactor"], 2.5);
    }

    #[test]
    fn test_state_defaults_when_fields_missing() {
        let state: CardState = serde_json::from_str(r#"{"cardId": "9", "dueDate": "2026-03-02"}"#).unwrap();
        assert_eq!(state.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(state.review_count, 0);
    }

    #[test]
    fn test_rating_qualities() {
        let qualities: Vec<u8> = Rating::ALL.iter().map(|r| r.quality()).collect();
        assert_eq!(qualities, vec![0, 2, 3, 5]);
        assert_eq!(Rating::from_key(3), Some(Rating::Good));
        assert_eq!(Rating::from_key(7), None);
    }

    #[test]
    fn test_accuracy_percent() {
        assert_eq!(SessionStats::default().accuracy_percent(), 0);
        let stats = SessionStats { reviewed: 3, correct: 2 };
        assert_eq!(stats.accuracy_percent(), 67);
    }
}
