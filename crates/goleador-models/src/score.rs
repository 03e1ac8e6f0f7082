//! Scoreboard values read from video frames.
//!
//! Frame streams are long and almost every reading is a low score, so the
//! common values are interned in a [`ScoreTable`] and handed out as shared
//! `Arc`s instead of being allocated per frame.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Scores with both sides below this bound are interned.
pub const CACHE_DIMENSION: u32 = 10;

/// Goal counts shown on a scoreboard, home side first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreValue {
    pub left: u32,
    pub right: u32,
}

impl ScoreValue {
    /// Build a standalone value. Prefer [`ScoreTable::of`] on hot paths.
    pub const fn new(left: u32, right: u32) -> Self {
        Self { left, right }
    }

    /// The score every match starts from.
    pub const fn kickoff() -> Self {
        Self::new(0, 0)
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.left, self.right)
    }
}

/// Interning table for frequently seen scores.
///
/// Owned by whoever parses frames; share it with `Arc<ScoreTable>` when
/// several parsers should hand out the same instances.
#[derive(Debug)]
pub struct ScoreTable {
    cache: Vec<Arc<ScoreValue>>,
}

impl ScoreTable {
    /// Create a table with every score below [`CACHE_DIMENSION`] preallocated.
    pub fn new() -> Self {
        let mut cache = Vec::with_capacity((CACHE_DIMENSION * CACHE_DIMENSION) as usize);
        for left in 0..CACHE_DIMENSION {
            for right in 0..CACHE_DIMENSION {
                cache.push(Arc::new(ScoreValue::new(left, right)));
            }
        }
        Self { cache }
    }

    /// Canonical instance for `left`-`right`.
    ///
    /// Inside the cached range repeated calls return the same allocation;
    /// outside it a fresh value is allocated every time.
    pub fn of(&self, left: u32, right: u32) -> Arc<ScoreValue> {
        if left < CACHE_DIMENSION && right < CACHE_DIMENSION {
            return Arc::clone(&self.cache[(left * CACHE_DIMENSION + right) as usize]);
        }
        Arc::new(ScoreValue::new(left, right))
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoreboard reading for one analyzed frame.
///
/// `score` is `None` when no scoreboard could be recognized in the frame,
/// which is different from a legible 0-0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReading {
    pub frame: u32,
    pub score: Option<Arc<ScoreValue>>,
}

impl FrameReading {
    pub fn new(frame: u32, score: Option<Arc<ScoreValue>>) -> Self {
        Self { frame, score }
    }

    /// Reading with no recognized scoreboard.
    pub fn unreadable(frame: u32) -> Self {
        Self { frame, score: None }
    }
}
