use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the analyzer thinks a conversation is (or is not) over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    TooEarly,
    Farewell,
    Repetition,
    Resolution,
    MetaConversation,
    WaitingForInput,
    MultipleFactors,
}

impl EndReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EndReason::TooEarly => "Too early in conversation",
            EndReason::Farewell => "Farewell detected",
            EndReason::Repetition => "Repetitive conversation",
            EndReason::Resolution => "Topic resolved",
            EndReason::MetaConversation => "Meta-conversation about ending",
            EndReason::WaitingForInput => "Both participants waiting for input",
            EndReason::MultipleFactors => "Multiple factors",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of one analyzer pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndSignal {
    pub should_end: bool,
    /// Weighted combination of the detector scores, within `[0, 1]`.
    pub confidence: f64,
    pub reason: EndReason,
}

impl EndSignal {
    pub(crate) const fn too_early() -> Self {
        Self {
            should_end: false,
            confidence: 0.0,
            reason: EndReason::TooEarly,
        }
    }
}

impl fmt::Display for EndSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (confidence {:.2}, end={})",
            self.reason, self.confidence, self.should_end
        )
    }
}

/// Per-detector scores, each within `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub farewell: f64,
    pub repetition: f64,
    pub resolution: f64,
    pub meta_conversation: f64,
    pub waiting_pattern: f64,
}

const FAREWELL_WEIGHT: f64 = 0.3;
const REPETITION_WEIGHT: f64 = 0.2;
const RESOLUTION_WEIGHT: f64 = 0.2;
const META_WEIGHT: f64 = 0.2;
const WAITING_WEIGHT: f64 = 0.1;

/// A category must score above this to be named as the reason.
const REASON_FLOOR: f64 = 0.3;

impl SignalScores {
    pub fn combined(&self) -> f64 {
        let total = self.farewell * FAREWELL_WEIGHT
            + self.repetition * REPETITION_WEIGHT
            + self.resolution * RESOLUTION_WEIGHT
            + self.meta_conversation * META_WEIGHT
            + self.waiting_pattern * WAITING_WEIGHT;
        total.clamp(0.0, 1.0)
    }

    /// Highest-scoring category, first one winning ties.
    pub fn primary_reason(&self) -> EndReason {
        let ranked = [
            (EndReason::Farewell, self.farewell),
            (EndReason::Repetition, self.repetition),
            (EndReason::Resolution, self.resolution),
            (EndReason::MetaConversation, self.meta_conversation),
            (EndReason::WaitingForInput, self.waiting_pattern),
        ];
        let (reason, score) = ranked
            .into_iter()
            .fold((EndReason::MultipleFactors, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if score > REASON_FLOOR {
            reason
        } else {
            EndReason::MultipleFactors
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings() {
        assert_eq!(EndReason::Farewell.to_string(), "Farewell detected");
        assert_eq!(
            EndReason::WaitingForInput.to_string(),
            "Both participants waiting for input"
        );
    }

    #[test]
    fn ties_go_to_earlier_category() {
        let scores = SignalScores {
            resolution: 0.8,
            meta_conversation: 0.8,
            ..Default::default()
        };
        assert_eq!(scores.primary_reason(), EndReason::Resolution);
    }

    #[test]
    fn weak_scores_are_multiple_factors() {
        let scores = SignalScores {
            farewell: 0.3,
            repetition: 0.3,
            ..Default::default()
        };
        assert_eq!(scores.primary_reason(), EndReason::MultipleFactors);
    }

    #[test]
    fn all_ones_combine_to_one() {
        let scores = SignalScores {
            farewell: 1.0,
            repetition: 1.0,
            resolution: 1.0,
            meta_conversation: 1.0,
            waiting_pattern: 1.0,
        };
        assert!((scores.combined() - 1.0).abs() < 1e-9);
        assert!(scores.combined() <= 1.0);
    }
}
