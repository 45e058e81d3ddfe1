use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// One completed exchange step: `speaker` answered `prior_message` with
/// `response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub prior_message: String,
    pub response: String,
}

impl Turn {
    pub fn new(
        speaker: impl Into<String>,
        prior_message: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            speaker: speaker.into(),
            prior_message: prior_message.into(),
            response: response.into(),
        }
    }
}

/// Ordered record of an interaction.
///
/// Only the interaction loop appends to a transcript; everyone else sees it
/// through `&[Turn]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }

    /// Response of the most recent turn.
    pub fn last_response(&self) -> Option<&str> {
        self.turns.last().map(|t| t.response.as_str())
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl Deref for Transcript {
    type Target = [Turn];

    fn deref(&self) -> &Self::Target {
        &self.turns
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_array() {
        let transcript = Transcript::from(vec![Turn::new("A", "hi", "hello")]);
        let json = serde_json::to_string(&transcript).unwrap();
        assert_eq!(
            json,
            r#"[{"speaker":"A","prior_message":"hi","response":"hello"}]"#
        );
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, transcript);
    }

    #[test]
    fn last_response_tracks_appends() {
        let mut transcript = Transcript::new();
        assert!(transcript.last_response().is_none());
        transcript.push(Turn::new("A", "start", "one"));
        transcript.push(Turn::new("B", "one", "two"));
        assert_eq!(transcript.last_response(), Some("two"));
        assert_eq!(transcript.len(), 2);
    }
}
