//! Player-input classification.
//!
//! The ritual never asks the player to press buttons; it reads free text.
//! Short affirmations advance, linger words (or anything long enough to be
//! new material) keep the current level open, and the closing choice is
//! matched against a small synonym lexicon per stance.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static YES_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(yes|y|okay|ok|sure|continue|next|proceed|go on|move on|deeper|ready|let'?s (go|continue|move))\b",
    )
    .expect("static pattern")
});

static MORE_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no|not yet|wait|more|another|add|stay|one more)\b").expect("static pattern")
});

static FLOAT_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(float|accept|integrate|keep|let it float)\b").expect("static pattern")
});
static SINK_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sink|release|let go|submerge|drop)\b").expect("static pattern")
});
static HOLD_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(hold|keep awhile|not yet|later|wait|pause)\b").expect("static pattern")
});

/// `true` for a short affirmation ("continue", "yes", "let's go"…).
/// Anything longer than five words is treated as content, not consent.
pub fn is_yes(text: &str) -> bool {
    YES_RX.is_match(text) && text.split_whitespace().count() <= 5
}

/// `true` when the player wants to linger: an explicit linger word, or a
/// reply long enough to be another detail rather than a decision.
pub fn is_more(text: &str) -> bool {
    let t = text.trim();
    MORE_RX.is_match(t) || t.split_whitespace().count() > 5
}

/// The archival stance chosen at the end of the ritual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveChoice {
    /// Accepted and held lightly.
    Float,
    /// Released and set down.
    Sink,
    /// Kept close for now.
    Hold,
}

impl ArchiveChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveChoice::Float => "float",
            ArchiveChoice::Sink => "sink",
            ArchiveChoice::Hold => "hold",
        }
    }

    /// Stance line echoed in the final artifact card.
    pub fn stance(self) -> &'static str {
        match self {
            ArchiveChoice::Float => "You chose to let it float: accepted and held lightly.",
            ArchiveChoice::Sink => "You chose to let it sink: released and set down.",
            ArchiveChoice::Hold => "You chose to hold it awhile: kept close for now.",
        }
    }
}

impl fmt::Display for ArchiveChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the player's archival choice. Lexicons are checked float → sink →
/// hold, then an exact lowercase keyword; anything else is no choice.
pub fn parse_archive_choice(text: &str) -> Option<ArchiveChoice> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    if FLOAT_RX.is_match(t) {
        return Some(ArchiveChoice::Float);
    }
    if SINK_RX.is_match(t) {
        return Some(ArchiveChoice::Sink);
    }
    if HOLD_RX.is_match(t) {
        return Some(ArchiveChoice::Hold);
    }
    match t.to_lowercase().as_str() {
        "float" => Some(ArchiveChoice::Float),
        "sink" => Some(ArchiveChoice::Sink),
        "hold" => Some(ArchiveChoice::Hold),
        _ => None,
    }
}
