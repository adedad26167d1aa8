//! Append-only transcript of render-process output.

use chrono::Utc;
use renderwatch_types::{Classification, LogLine};

/// Ordered record of raw lines plus their classification.
///
/// Sequence numbers are assigned here, in arrival order, never by the
/// transport. Lines are immutable once appended; appending continues even
/// after the owning job latches a terminal state, since the transcript is
/// display state, not lifecycle state.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<LogLine>,
    next_seq: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, assigning the next sequence number.
    pub fn push(&mut self, text: impl Into<String>, classification: Classification) -> &LogLine {
        let line = LogLine {
            seq: self.next_seq,
            text: text.into(),
            classification,
            received_at: Utc::now(),
        };
        self.next_seq += 1;
        let idx = self.lines.len();
        self.lines.push(line);
        &self.lines[idx]
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.last()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_are_dense_and_ordered() {
        let mut t = Transcript::new();
        t.push("first", Classification::Neutral);
        t.push("second", Classification::Progress);
        t.push("third", Classification::Error);

        let seqs: Vec<u64> = t.lines().iter().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(t.last().unwrap().text, "third");
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_push_returns_the_appended_line() {
        let mut t = Transcript::new();
        let line = t.push("hello", Classification::Neutral);
        assert_eq!(line.seq, 0);
        assert_eq!(line.classification, Classification::Neutral);
    }
}
