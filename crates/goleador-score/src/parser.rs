//! Score detection in OCR text.
//!
//! A score is a digit-like token, a separator and another digit-like token,
//! bounded on both sides by a non-word character or the end of the text.
//! OCR regularly reads the zero of a scoreboard as a letter, so `Q`, `O` and
//! `o` count as digits and are read as `0`.
//!
//! The leftmost match wins: scoreboards sit near a fixed corner and come
//! early in the recognized text, while stray digit pairs from the pitch
//! advertising tend to come later.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use goleador_models::{ScoreTable, ScoreValue};

/// Characters OCR tends to produce in place of `0`.
const ZERO_LOOKALIKES: [char; 3] = ['Q', 'O', 'o'];

// Word characters are ASCII only, like the scoreboard fonts.
static SCORE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^A-Za-z0-9_])(?P<left>[0-9QOo])(?: ?[- :=] ?)(?P<right>[0-9QOo])(?:[^A-Za-z0-9_]|$)",
    )
    .expect("score pattern is valid")
});

/// Finds scores in frame text, interning results through a [`ScoreTable`].
#[derive(Debug, Clone)]
pub struct ScoreParser {
    table: Arc<ScoreTable>,
}

impl ScoreParser {
    /// Parser handing out values from `table`. Parsers that share a table
    /// return the same `Arc` for the same small score.
    pub fn new(table: Arc<ScoreTable>) -> Self {
        Self { table }
    }

    /// The first score in `text`, or `None` when the frame shows no legible
    /// scoreboard.
    pub fn find(&self, text: &str) -> Option<Arc<ScoreValue>> {
        let caps = SCORE_PATTERN.captures(text)?;
        let left = digit_value(caps.name("left")?.as_str())?;
        let right = digit_value(caps.name("right")?.as_str())?;
        Some(self.table.of(left, right))
    }
}

impl Default for ScoreParser {
    fn default() -> Self {
        Self::new(Arc::new(ScoreTable::new()))
    }
}

fn digit_value(token: &str) -> Option<u32> {
    let normalized: String = token
        .chars()
        .map(|c| if ZERO_LOOKALIKES.contains(&c) { '0' } else { c })
        .collect();
    normalized.parse().ok()
}
