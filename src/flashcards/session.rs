//! A study session over one decoded deck

use std::collections::{BTreeMap, VecDeque};

use chrono::NaiveDate;
use log::{info, warn};

use super::algorithm::{apply_review, due_cards, preview_intervals, review_stats, ReviewError};
use super::models::{CardState, Rating, ReviewStats, SessionStats, StudyData};
use super::storage::StudyStorage;
use crate::apkg::Deck;

/// Outcome of answering the current card
#[derive(Debug, Clone, PartialEq)]
pub struct Answered {
    pub state: CardState,
    /// The card failed and was put back at the end of the queue
    pub requeued: bool,
}

/// Review queue plus the card states it updates.
///
/// Every answer persists the whole state map when a store is attached. A
/// failed write is logged and the session carries on in memory.
pub struct ReviewSession {
    deck_key: String,
    card_ids: Vec<String>,
    states: BTreeMap<String, CardState>,
    queue: VecDeque<String>,
    stats: SessionStats,
    today: NaiveDate,
    limit: Option<usize>,
    storage: Option<StudyStorage>,
    persistence_error: Option<String>,
}

impl ReviewSession {
    /// Start a session for `deck`, loading prior progress from `storage`
    pub fn open(deck: &Deck, storage: Option<StudyStorage>, today: NaiveDate) -> Self {
        let deck_key = deck.deck_key();
        let (stored, persistence_error) = match &storage {
            Some(storage) => storage.load_or_empty(&deck_key),
            None => (None, None),
        };

        let mut session = Self::from_study_data(deck_key, deck.card_ids(), stored, today);
        session.storage = storage;
        session.persistence_error = persistence_error.map(|e| e.to_string());
        session
    }

    /// Build a session without persistence from already loaded data
    pub fn from_study_data(
        deck_key: impl Into<String>,
        card_ids: Vec<String>,
        stored: Option<StudyData>,
        today: NaiveDate,
    ) -> Self {
        let mut states = stored.map(|d| d.card_states).unwrap_or_default();
        let mut created = 0;
        for id in &card_ids {
            if !states.contains_key(id) {
                states.insert(id.clone(), CardState::new(id.as_str(), today));
                created += 1;
            }
        }

        let deck_key = deck_key.into();
        info!(
            "Study session for {}: {} cards, {} new states",
            deck_key,
            card_ids.len(),
            created
        );

        let mut session = Self {
            deck_key,
            card_ids,
            states,
            queue: VecDeque::new(),
            stats: SessionStats::default(),
            today,
            limit: None,
            storage: None,
            persistence_error: None,
        };
        session.rebuild_queue();
        session
    }

    /// Cap the number of distinct cards queued for this session
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self.rebuild_queue();
        self
    }

    fn rebuild_queue(&mut self) {
        let deck_states = self.card_ids.iter().filter_map(|id| self.states.get(id));
        let mut queue: VecDeque<String> = due_cards(deck_states, self.today)
            .into_iter()
            .map(|s| s.card_id.clone())
            .collect();
        if let Some(limit) = self.limit {
            queue.truncate(limit);
        }
        self.queue = queue;
    }

    pub fn deck_key(&self) -> &str {
        &self.deck_key
    }

    /// Card at the front of the queue
    pub fn current(&self) -> Option<&CardState> {
        self.queue.front().and_then(|id| self.states.get(id))
    }

    /// Intervals the current card would get for each rating
    pub fn current_previews(&self) -> Option<[(Rating, u32); 4]> {
        self.current().map(|state| preview_intervals(state, self.today))
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_complete(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn states(&self) -> &BTreeMap<String, CardState> {
        &self.states
    }

    /// Statistics across every stored state, including ids no longer in the deck
    pub fn review_stats(&self) -> ReviewStats {
        review_stats(self.states.values(), self.today)
    }

    /// Last persistence failure, if the session is running in memory only
    pub fn persistence_error(&self) -> Option<&str> {
        self.persistence_error.as_deref()
    }

    /// Answer the current card with an SM-2 quality (0-5)
    pub fn answer(&mut self, quality: u8) -> Result<Answered, ReviewError> {
        let card_id = self.queue.front().cloned().ok_or(ReviewError::QueueEmpty)?;
        let current = self
            .states
            .get(&card_id)
            .cloned()
            .unwrap_or_else(|| CardState::new(card_id.as_str(), self.today));

        let next = apply_review(&current, quality, self.today)?;
        self.queue.pop_front();
        self.states.insert(card_id.clone(), next.clone());

        self.stats.reviewed += 1;
        if quality >= 3 {
            self.stats.correct += 1;
        }

        let requeued = quality < 3;
        if requeued {
            self.queue.push_back(card_id);
        }

        self.persist();
        Ok(Answered { state: next, requeued })
    }

    pub fn answer_rating(&mut self, rating: Rating) -> Result<Answered, ReviewError> {
        self.answer(rating.quality())
    }

    /// Forget all progress for the deck's cards and start over
    pub fn reset(&mut self) {
        self.states = self
            .card_ids
            .iter()
            .map(|id| (id.clone(), CardState::new(id.as_str(), self.today)))
            .collect();
        self.stats = SessionStats::default();
        self.rebuild_queue();
        self.persist();
        info!("Reset study progress for {}", self.deck_key);
    }

    fn persist(&mut self) {
        let Some(storage) = &self.storage else {
            return;
        };
        match storage.save(&self.deck_key, &self.states) {
            Ok(_) => self.persistence_error = None,
            Err(e) => {
                warn!("Could not save study data for {}: {}", self.deck_key, e);
                self.persistence_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_missing_states_created() {
        let session = ReviewSession::from_study_data("deck-1-2-3-3", ids(3), None, today());
        assert_eq!(session.states().len(), 3);
        assert_eq!(session.remaining(), 3);
        assert_eq!(session.current().unwrap().card_id, "1");
    }

    #[test]
    fn test_orphan_states_kept() {
        let mut stored = StudyData::default();
        stored
            .card_states
            .insert("gone".to_string(), CardState::new("gone", today()));

        let session = ReviewSession::from_study_data("deck-1-1", ids(1), Some(stored), today());
        assert!(session.states().contains_key("gone"));
        // Only the deck's own cards are queued
        assert_eq!(session.remaining(), 1);
        assert_eq!(session.review_stats().total, 2);
    }

    #[test]
    fn test_queue_most_overdue_first() {
        let mut stored = StudyData::default();
        for (id, day) in [("1", 14), ("2", 2), ("3", 20)] {
            let mut state = CardState::new(id, today());
            state.due_date = NaiveDate::from_ymd_opt(2026, 6, day).unwrap();
            state.review_count = 1;
            stored.card_states.insert(id.to_string(), state);
        }

        let session = ReviewSession::from_study_data("k", ids(3), Some(stored), today());
        assert_eq!(session.remaining(), 2);
        assert_eq!(session.current().unwrap().card_id, "2");
    }

    #[test]
    fn test_failed_card_requeued() {
        let mut session = ReviewSession::from_study_data("k", ids(2), None, today());

        let failed = session.answer(0).unwrap();
        assert!(failed.requeued);
        assert_eq!(failed.state.interval, 0);
        assert_eq!(session.remaining(), 2);
        assert_eq!(session.current().unwrap().card_id, "2");

        let passed = session.answer(3).unwrap();
        assert!(!passed.requeued);
        assert_eq!(session.current().unwrap().card_id, "1");

        session.answer(5).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.stats(), SessionStats { reviewed: 3, correct: 2 });
        assert_eq!(session.stats().accuracy_percent(), 67);
        assert_eq!(session.answer(3), Err(ReviewError::QueueEmpty));
    }

    #[test]
    fn test_invalid_quality_keeps_card() {
        let mut session = ReviewSession::from_study_data("k", ids(1), None, today());
        assert_eq!(session.answer(9), Err(ReviewError::InvalidQuality(9)));
        assert_eq!(session.remaining(), 1);
        assert_eq!(session.stats().reviewed, 0);
    }

    #[test]
    fn test_limit() {
        let session = ReviewSession::from_study_data("k", ids(10), None, today()).with_limit(4);
        assert_eq!(session.remaining(), 4);
    }

    #[test]
    fn test_answers_persisted() {
        let dir = TempDir::new().unwrap();
        let mut session = ReviewSession::from_study_data("deck-1-2-2", ids(2), None, today());
        session.storage = Some(StudyStorage::new(dir.path()));

        session.answer_rating(Rating::Good).unwrap();

        let stored = StudyStorage::new(dir.path()).load("deck-1-2-2").unwrap().unwrap();
        assert_eq!(stored.card_states["1"].review_count, 1);
        assert_eq!(stored.card_states["2"].review_count, 0);
        assert!(session.persistence_error().is_none());
    }

    #[test]
    fn test_persistence_failure_keeps_session_going() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let mut session = ReviewSession::from_study_data("k", ids(2), None, today());
        session.storage = Some(StudyStorage::new(blocker.join("data")));

        session.answer(3).unwrap();
        assert!(session.persistence_error().is_some());
        session.answer(3).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.states()["1"].review_count, 1);
    }

    #[test]
    fn test_unreadable_progress_starts_fresh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(crate::flashcards::storage::STUDY_DATA_FILE), "{ not json").unwrap();
        let deck = Deck::default();

        let session = ReviewSession::open(&deck, Some(StudyStorage::new(dir.path())), today());
        assert!(session.persistence_error().is_some());
        assert!(session.is_complete());
        assert_eq!(session.review_stats().total, 0);
    }

    #[test]
    fn test_reset() {
        let mut session = ReviewSession::from_study_data("k", ids(2), None, today());
        session.answer(5).unwrap();
        session.answer(5).unwrap();
        assert!(session.is_complete());

        session.reset();
        assert_eq!(session.remaining(), 2);
        assert!(session.states().values().all(|s| s.review_count == 0));
        assert_eq!(session.stats(), SessionStats::default());
    }

    #[test]
    fn test_previews_for_current_card() {
        let session = ReviewSession::from_study_data("k", ids(1), None, today());
        let previews = session.current_previews().unwrap();
        assert_eq!(previews[0], (Rating::Again, 0));
        assert_eq!(previews[2], (Rating::Good, 1));
    }
}
