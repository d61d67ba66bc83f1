//! Progress reporting and cooperative cancellation for package decoding

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Decode stages, reported in this fixed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Read,
    Unpack,
    LocateStore,
    LoadEngine,
    OpenStore,
    Query,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Read,
        Stage::Unpack,
        Stage::LocateStore,
        Stage::LoadEngine,
        Stage::OpenStore,
        Stage::Query,
        Stage::Done,
    ];

    /// Stage index in `0..=6`
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Unpack => "unpack",
            Stage::LocateStore => "locate-store",
            Stage::LoadEngine => "load-engine",
            Stage::OpenStore => "open-store",
            Stage::Query => "query",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives `(stage, percent)` checkpoints from a decode
pub trait ProgressSink {
    fn report(&mut self, stage: Stage, percent: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(Stage, u8),
{
    fn report(&mut self, stage: Stage, percent: u8) {
        self(stage, percent.min(100))
    }
}

/// Sink that discards every checkpoint
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: Stage, _percent: u8) {}
}

/// Shared flag a caller sets to stop a decode between query chunks
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
