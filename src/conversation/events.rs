//! Progress notifications emitted by the interaction loop.

use std::fmt;

use serde::Serialize;

use crate::analyzer::EndSignal;

/// Events emitted while two agents converse.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// The loop is about to call the first agent.
    Started {
        agent_a: String,
        agent_b: String,
        /// Hard upper bound on the number of turns.
        turn_cap: usize,
    },

    /// A turn was appended to the transcript.
    TurnCompleted {
        /// 1-based turn number.
        turn: usize,
        speaker: String,
        response: String,
    },

    /// An agent failed; its turn carries the error text instead.
    GenerationFailed {
        turn: usize,
        speaker: String,
        error: String,
    },

    /// The analyzer judged the conversation finished.
    AutoEnded { turn: usize, signal: EndSignal },

    /// The loop returned.
    Finished { turns: usize, cause: StopCause },
}

/// Why the interaction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum StopCause {
    /// The transcript reached the turn cap.
    TurnLimit,
    /// The conversation analyzer detected a natural ending.
    AutoEnd(EndSignal),
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnLimit => write!(f, "Turn limit reached"),
            Self::AutoEnd(signal) => write!(
                f,
                "Conversation ended naturally: {} (confidence {:.2})",
                signal.reason, signal.confidence
            ),
        }
    }
}
