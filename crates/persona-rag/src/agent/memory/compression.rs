//! History compaction
//!
//! Long sessions are bounded by folding the oldest turns into a single
//! summary marker. The functions here are pure; the repository decides when
//! to call them and the summarizer produces the text.

use super::conversation::ConversationTurn;

/// When and how much history to compact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionConfig {
    /// Compact once the stored turn count exceeds this
    pub threshold: usize,

    /// Raw turns kept verbatim after compaction
    pub keep_recent: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            keep_recent: 5,
        }
    }
}

impl CompactionConfig {
    /// Override the threshold
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the number of recent turns kept
    pub fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent;
        self
    }
}

/// Whether `turns` is long enough to compact
pub fn needs_compaction(turns: &[ConversationTurn], threshold: usize) -> bool {
    turns.len() > threshold
}

/// Raw turns to keep when compacting against `threshold`
///
/// Never more than `threshold - 1`, so the compacted sequence (marker plus
/// kept turns) is itself within the threshold and is not compacted again.
pub fn keep_count(threshold: usize, keep_recent: usize) -> usize {
    keep_recent.min(threshold.saturating_sub(1))
}

/// Split into (turns to summarize, turns to keep verbatim)
///
/// An existing summary marker at the head lands in the first half so it is
/// folded into the next summary.
pub fn split_for_compaction(
    turns: &[ConversationTurn],
    keep_recent: usize,
) -> (&[ConversationTurn], &[ConversationTurn]) {
    let boundary = turns.len().saturating_sub(keep_recent);
    turns.split_at(boundary)
}

/// Build the compacted sequence: summary marker first, then `recent`
pub fn compact(summary: impl Into<String>, recent: &[ConversationTurn]) -> Vec<ConversationTurn> {
    let mut compacted = Vec::with_capacity(recent.len() + 1);
    compacted.push(ConversationTurn::summary(summary));
    compacted.extend_from_slice(recent);
    compacted
}
