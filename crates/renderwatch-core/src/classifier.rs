//! Heuristic line classifier for render-process output.
//!
//! The render backend emits progress bars, library warnings, stage
//! transitions, and stack traces through one text channel with no schema,
//! and several keywords are misleading ("failed" inside a success
//! sentence, "completed" for a non-terminal stage). Classification is a
//! fixed-precedence rule list (Progress > Completion > Error > Neutral)
//! with each rule's phrase sets held as data so they stay auditable and
//! tunable from config.

use crate::{RenderWatchError, Result};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use renderwatch_types::Classification;
use serde::{Deserialize, Serialize};

/// Progress-bar percentage with its separator, e.g. `10%|`.
static PERCENT_BAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\s*%\|").unwrap());

/// Phrase sets driving line classification.
///
/// All matching is case-insensitive substring matching. The defaults are
/// the canonical sets for the Manim/P5 render backend; every set can be
/// overridden from the CLI config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Markers naming the animation stage; required for a Progress match.
    stage_markers: Vec<String>,
    /// Rate markers that qualify a stage line as Progress ("it/s").
    rate_markers: Vec<String>,
    /// Phrases announcing the terminal artifact-ready state.
    completion_phrases: Vec<String>,
    /// Similar wording used by non-terminal pipeline stages; suppresses a
    /// Completion match.
    non_terminal_phrases: Vec<String>,
    /// Genuine failure indicators.
    error_patterns: Vec<String>,
    /// Success wording that suppresses an Error match ("failed" can appear
    /// inside a sentence reporting success).
    success_exclusions: Vec<String>,
    /// Lowercased completion phrases, longest first. Filled on first use;
    /// the phrase sets cannot change afterwards, so it never goes stale.
    #[serde(skip)]
    sorted_positives: OnceCell<Vec<String>>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            stage_markers: vec!["animation".into()],
            rate_markers: vec!["it/s".into()],
            completion_phrases: vec![
                "video generation completed successfully".into(),
                "video generation completed".into(),
                "video saved successfully".into(),
                "video created successfully".into(),
                "render complete".into(),
                "video saved to".into(),
                "ffmpeg encoding completed".into(),
                "video file created".into(),
                "video output saved".into(),
            ],
            non_terminal_phrases: vec![
                "code generation completed".into(),
                "code generation finished".into(),
                "generation complete".into(),
            ],
            error_patterns: vec![
                "error:".into(),
                "error ".into(),
                "failed".into(),
                "traceback".into(),
                "exception:".into(),
                "syntax error".into(),
                "module not found".into(),
                "command not found".into(),
                "process exited with code".into(),
            ],
            success_exclusions: vec![
                "completed successfully".into(),
                "generation completed".into(),
                "video generation".into(),
                "code 0".into(),
            ],
            sorted_positives: OnceCell::new(),
        }
    }
}

impl ClassifierRules {
    /// Classify one raw line. Pure, total, no memory of prior lines.
    ///
    /// Rule order is load-bearing: progress-bar lines can carry error or
    /// completion vocabulary, and completion sentences can carry error
    /// vocabulary. Collapsing any two rules into unordered boolean logic
    /// reintroduces those false positives.
    pub fn classify(&self, line: &str) -> Classification {
        let lower = line.to_lowercase();

        if self.is_progress(&lower) {
            Classification::Progress
        } else if self.is_completion(&lower) {
            Classification::Completion
        } else if self.is_error(&lower) {
            Classification::Error
        } else {
            Classification::Neutral
        }
    }

    /// Reject rule sets that would make terminal detection impossible.
    pub fn validate(&self) -> Result<()> {
        if self.completion_phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(RenderWatchError::InvalidRules(
                "completion_phrases must contain at least one phrase".into(),
            ));
        }
        if self.error_patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(RenderWatchError::InvalidRules(
                "error_patterns must contain at least one pattern".into(),
            ));
        }
        Ok(())
    }

    fn is_progress(&self, lower: &str) -> bool {
        contains_any(lower, &self.stage_markers)
            && (PERCENT_BAR.is_match(lower) || contains_any(lower, &self.rate_markers))
    }

    fn is_completion(&self, lower: &str) -> bool {
        if !contains_any(lower, &self.completion_phrases) {
            return false;
        }
        // A non-terminal phrase only suppresses the match when it occurs
        // outside a positive phrase: "generation complete" is a substring
        // of "video generation completed", which must still count.
        let mut stripped = lower.to_string();
        for p in self.sorted_positives() {
            stripped = stripped.replace(p.as_str(), " ");
        }
        !contains_any(&stripped, &self.non_terminal_phrases)
    }

    fn sorted_positives(&self) -> &[String] {
        self.sorted_positives.get_or_init(|| {
            let mut positives: Vec<String> = self
                .completion_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.trim().is_empty())
                .collect();
            positives.sort_by_key(|p| std::cmp::Reverse(p.len()));
            positives
        })
    }

    fn is_error(&self, lower: &str) -> bool {
        contains_any(lower, &self.error_patterns)
            && !contains_any(lower, &self.success_exclusions)
    }
}

fn contains_any(haystack: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| {
        let p = p.to_lowercase();
        !p.trim().is_empty() && haystack.contains(p.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(line: &str) -> Classification {
        ClassifierRules::default().classify(line)
    }

    #[test]
    fn test_progress_bar_line() {
        assert_eq!(
            classify("Animation 10%|\u{2588}\u{2588}\u{2588}     | it/s: 3.2"),
            Classification::Progress
        );
        assert_eq!(classify("Animation 2: 55%| rendering"), Classification::Progress);
    }

    #[test]
    fn test_progress_wins_over_error_vocabulary() {
        // tqdm-style bars can contain arbitrary text; progress must win.
        assert_eq!(
            classify("Animation 1: 40%| retrying failed frame, 2.1 it/s"),
            Classification::Progress
        );
    }

    #[test]
    fn test_completion_positive_phrases() {
        assert_eq!(
            classify("video generation completed successfully"),
            Classification::Completion
        );
        assert_eq!(classify("Video saved to /tmp/out.mp4"), Classification::Completion);
        assert_eq!(classify("FFmpeg encoding completed"), Classification::Completion);
    }

    #[test]
    fn test_non_terminal_stage_is_not_completion() {
        // The authoring stage announces itself with completion-like
        // wording; it must stay Neutral.
        assert_eq!(classify("code generation completed"), Classification::Neutral);
        assert_eq!(classify("Code generation finished."), Classification::Neutral);
    }

    #[test]
    fn test_success_sentence_with_error_vocabulary() {
        assert_eq!(
            classify("process failed but video generation completed successfully"),
            Classification::Completion
        );
    }

    #[test]
    fn test_error_patterns() {
        assert_eq!(
            classify("Traceback (most recent call last):"),
            Classification::Error
        );
        assert_eq!(classify("SyntaxError: invalid syntax"), Classification::Error);
        assert_eq!(classify("ERROR: render pipeline aborted"), Classification::Error);
        assert_eq!(classify("ffmpeg: command not found"), Classification::Error);
        assert_eq!(classify("Process exited with code 1"), Classification::Error);
    }

    #[test]
    fn test_exit_code_zero_is_not_an_error() {
        assert_eq!(classify("Process exited with code 0"), Classification::Neutral);
    }

    #[test]
    fn test_error_suppressed_by_success_exclusions() {
        assert_eq!(
            classify("stage failed count: 0, generation completed"),
            Classification::Neutral
        );
    }

    #[test]
    fn test_plain_chatter_is_neutral() {
        assert_eq!(classify("Initializing render"), Classification::Neutral);
        assert_eq!(classify(""), Classification::Neutral);
        assert_eq!(classify("Loading scene objects..."), Classification::Neutral);
    }

    #[test]
    fn test_validate_rejects_empty_terminal_sets() {
        let rules = ClassifierRules {
            completion_phrases: vec![],
            ..ClassifierRules::default()
        };
        assert!(rules.validate().is_err());

        let rules = ClassifierRules {
            error_patterns: vec!["".into()],
            ..ClassifierRules::default()
        };
        assert!(rules.validate().is_err());

        assert!(ClassifierRules::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        // Rule sets are tunable config data; overriding one set must not
        // clear the others.
        let rules: ClassifierRules =
            serde_json::from_str(r#"{"completion_phrases":["render done"]}"#).unwrap();
        assert_eq!(rules.classify("render done"), Classification::Completion);
        assert_eq!(
            classify("render done"),
            Classification::Neutral,
            "default set does not know the custom phrase"
        );
        // Error patterns still come from the defaults.
        assert_eq!(
            rules.classify("Traceback (most recent call last):"),
            Classification::Error
        );
    }

    #[test]
    fn test_repeated_classification_is_stable() {
        // The sorted positive list is computed once per rule set and
        // reused; later lines must see the same decisions.
        let rules: ClassifierRules =
            serde_json::from_str(r#"{"completion_phrases":["video generation completed"]}"#)
                .unwrap();
        for _ in 0..3 {
            assert_eq!(
                rules.classify("video generation completed"),
                Classification::Completion
            );
            assert_eq!(rules.classify("generation complete"), Classification::Neutral);
        }
    }

    proptest! {
        #[test]
        fn classify_is_total(line in ".*") {
            // Never panics, always yields one of the four tags.
            let _ = ClassifierRules::default().classify(&line);
        }

        #[test]
        fn progress_precedence_holds_for_any_suffix(suffix in ".*") {
            let line = format!("Animation 42%|\u{2588}\u{2588} {}", suffix);
            prop_assert_eq!(
                ClassifierRules::default().classify(&line),
                Classification::Progress
            );
        }
    }
}
