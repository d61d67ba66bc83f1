//! Spaced repetition for decoded decks
//!
//! This module provides:
//! - SM-2 scheduling over per-card states
//! - Due queues, statistics and answer previews
//! - Review sessions with requeueing of failed cards
//! - Per-deck persistence of study progress

pub mod algorithm;
pub mod models;
pub mod session;
pub mod storage;

pub use algorithm::{apply_review, due_cards, format_interval, preview_intervals, review_stats, ReviewError};
pub use models::*;
pub use session::{Answered, ReviewSession};
pub use storage::{StudyStorage, StudyStorageError};
