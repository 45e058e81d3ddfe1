//! Rule-based detection of a naturally concluded bot-to-bot conversation.
//!
//! Five independent detectors score the tail of a transcript:
//!
//! | detector          | window        | weight |
//! |-------------------|---------------|--------|
//! | farewell          | last 2 turns  | 0.30   |
//! | repetition        | last 4 turns  | 0.20   |
//! | resolution        | last turn     | 0.20   |
//! | meta-conversation | last 4 turns  | 0.20   |
//! | waiting pattern   | last 4 turns  | 0.10   |
//!
//! The weighted sum is compared against the configured end threshold. The
//! analyzer keeps no state between calls, so the same transcript always
//! yields the same verdict.

#[path = "analyzer/detectors.rs"]
mod detectors;

#[path = "analyzer/signal.rs"]
mod signal;

#[path = "analyzer/similarity.rs"]
mod similarity;

pub use signal::{EndReason, EndSignal, SignalScores};

use crate::{conversation::Turn, error::SelfPlayError};

const FAREWELL_WINDOW: usize = 2;
const CONTEXT_WINDOW: usize = 4;

/// Decides whether a two-agent conversation has run its course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversationAnalyzer {
    end_threshold: f64,
}

impl Default for ConversationAnalyzer {
    fn default() -> Self {
        Self {
            end_threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

fn tail(turns: &[Turn], n: usize) -> &[Turn] {
    &turns[turns.len().saturating_sub(n)..]
}

fn responses(turns: &[Turn]) -> Vec<&str> {
    turns.iter().map(|t| t.response.as_str()).collect()
}

impl ConversationAnalyzer {
    pub const DEFAULT_THRESHOLD: f64 = 0.6;

    /// Creates an analyzer ending conversations once the combined score
    /// reaches `end_threshold`.
    ///
    /// # Errors
    ///
    /// [`SelfPlayError::InvalidThreshold`] when the threshold is NaN or
    /// outside `[0, 1]`.
    pub fn new(end_threshold: f64) -> Result<Self, SelfPlayError> {
        if !(0.0..=1.0).contains(&end_threshold) {
            return Err(SelfPlayError::InvalidThreshold(end_threshold));
        }
        Ok(Self { end_threshold })
    }

    pub fn end_threshold(&self) -> f64 {
        self.end_threshold
    }

    /// Scores the transcript and decides whether to stop.
    ///
    /// `current_turn` is the 1-based number of the turn just completed;
    /// anything before turn 2 is never ended.
    pub fn detect_end_signals(&self, transcript: &[Turn], current_turn: usize) -> EndSignal {
        if current_turn < 2 {
            return EndSignal::too_early();
        }

        let scores = self.score(transcript);
        let confidence = scores.combined();
        let signal = EndSignal {
            should_end: confidence >= self.end_threshold,
            confidence,
            reason: scores.primary_reason(),
        };
        log::debug!(
            "turn {current_turn}: farewell={:.2} repetition={:.2} resolution={:.2} meta={:.2} waiting={:.2} -> {signal}",
            scores.farewell,
            scores.repetition,
            scores.resolution,
            scores.meta_conversation,
            scores.waiting_pattern,
        );
        signal
    }

    /// Per-detector breakdown for `transcript`. Empty transcripts score zero
    /// everywhere.
    pub fn score(&self, transcript: &[Turn]) -> SignalScores {
        let recent = responses(tail(transcript, FAREWELL_WINDOW));
        let context = responses(tail(transcript, CONTEXT_WINDOW));
        let last = transcript.last().map(|t| t.response.as_str()).unwrap_or("");

        SignalScores {
            farewell: detectors::farewell(&recent),
            repetition: detectors::repetition(&context),
            resolution: detectors::resolution(last),
            meta_conversation: detectors::meta_conversation(&context),
            waiting_pattern: detectors::waiting_pattern(&context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn transcript(responses: &[&str]) -> Vec<Turn> {
        responses
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let speaker = if i % 2 == 0 { "Bot A" } else { "Bot B" };
                Turn::new(speaker, "", *r)
            })
            .collect()
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(ConversationAnalyzer::new(-0.1).is_err());
        assert!(ConversationAnalyzer::new(1.01).is_err());
        assert!(ConversationAnalyzer::new(f64::NAN).is_err());
        assert!(ConversationAnalyzer::new(0.0).is_ok());
        assert!(ConversationAnalyzer::new(1.0).is_ok());
    }

    #[test]
    fn default_threshold() {
        assert_eq!(ConversationAnalyzer::default().end_threshold(), 0.6);
    }

    #[test]
    fn first_turn_is_too_early() {
        let analyzer = ConversationAnalyzer::new(0.0).unwrap();
        let signal = analyzer.detect_end_signals(&transcript(&["Goodbye!"]), 1);
        assert_eq!(signal, EndSignal::too_early());
        assert_eq!(signal.reason.to_string(), "Too early in conversation");
    }

    #[test]
    fn empty_transcript_scores_zero() {
        let analyzer = ConversationAnalyzer::default();
        let signal = analyzer.detect_end_signals(&[], 5);
        assert!(!signal.should_end);
        assert_eq!(signal.confidence, 0.0);
        assert_eq!(signal.reason, EndReason::MultipleFactors);
    }

    #[test]
    fn farewell_exchange_is_detected() {
        let analyzer = ConversationAnalyzer::default();
        let turns = transcript(&[
            "Rust's borrow checker enforces aliasing rules at compile time.",
            "Thank you so much, goodbye!",
        ]);
        let scores = analyzer.score(&turns);
        assert_eq!(scores.farewell, 1.0);
        let signal = analyzer.detect_end_signals(&turns, 2);
        assert_eq!(signal.reason, EndReason::Farewell);
        // farewell alone carries at most its 0.3 weight plus the brevity bonus
        assert!(!signal.should_end);
        assert!((signal.confidence - 0.34).abs() < 1e-9);
    }

    #[test]
    fn farewell_exchange_ends_below_its_score() {
        let analyzer = ConversationAnalyzer::new(0.3).unwrap();
        let turns = transcript(&["Here is the answer.", "Thank you so much, goodbye!"]);
        let signal = analyzer.detect_end_signals(&turns, 2);
        assert!(signal.should_end);
        assert_eq!(signal.reason, EndReason::Farewell);
    }

    #[test]
    fn repeated_goodbyes_end_at_default_threshold() {
        let analyzer = ConversationAnalyzer::default();
        let reply = "I hope that helps. In summary, that's all. Goodbye!";
        let turns = transcript(&[reply, reply, reply, reply]);
        let scores = analyzer.score(&turns);
        assert_eq!(scores.repetition, 1.0);
        let signal = analyzer.detect_end_signals(&turns, 4);
        assert!(signal.should_end);
        assert!(signal.confidence >= 0.6);
    }

    #[test]
    fn trailing_question_keeps_resolution_at_zero() {
        let analyzer = ConversationAnalyzer::default();
        let turns = transcript(&["Hope that helps.", "In summary it works, but why?"]);
        assert_eq!(analyzer.score(&turns).resolution, 0.0);
    }

    #[test]
    fn waiting_bots_are_reported() {
        let analyzer = ConversationAnalyzer::default();
        let turns = transcript(&[
            "Let's pause here and continue with the plan.",
            "I will now wait for your next question and need new input to proceed with it.",
            "Likewise, standing by for human input before proceeding further with any task.",
        ]);
        let scores = analyzer.score(&turns);
        assert_eq!(scores.waiting_pattern, 0.8);
    }

    proptest! {
        #[test]
        fn confidence_stays_in_unit_interval(
            responses in proptest::collection::vec(".{0,80}", 0..8),
            turn in 0usize..12,
        ) {
            let refs: Vec<&str> = responses.iter().map(String::as_str).collect();
            let turns = transcript(&refs);
            let signal = ConversationAnalyzer::default().detect_end_signals(&turns, turn);
            prop_assert!((0.0..=1.0).contains(&signal.confidence));
        }

        #[test]
        fn verdict_is_deterministic(
            responses in proptest::collection::vec("[a-z ,.!?']{0,60}", 0..8),
            turn in 2usize..12,
            threshold in 0.0f64..=1.0,
        ) {
            let refs: Vec<&str> = responses.iter().map(String::as_str).collect();
            let turns = transcript(&refs);
            let analyzer = ConversationAnalyzer::new(threshold).unwrap();
            let first = analyzer.detect_end_signals(&turns, turn);
            let second = analyzer.detect_end_signals(&turns, turn);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.should_end, first.confidence >= threshold);
        }

        #[test]
        fn early_turns_never_end(responses in proptest::collection::vec(".{0,40}", 0..4), turn in 0usize..2) {
            let refs: Vec<&str> = responses.iter().map(String::as_str).collect();
            let signal = ConversationAnalyzer::new(0.0).unwrap().detect_end_signals(&transcript(&refs), turn);
            prop_assert_eq!(signal, EndSignal::too_early());
        }
    }
}
