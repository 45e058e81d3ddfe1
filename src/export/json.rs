use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{conversation::Turn, error::SelfPlayError};

/// One bot taking part in an exported conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub system_message: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub turns: usize,
    /// The message that opened the conversation.
    pub initial_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTurn {
    /// 1-based.
    pub turn: usize,
    pub speaker: String,
    pub message: String,
    pub previous_message: String,
}

/// Serializable form of a finished conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub metadata: RecordMetadata,
    pub conversation: Vec<RecordTurn>,
}

impl ConversationRecord {
    pub fn from_transcript(turns: &[Turn], participants: Vec<Participant>) -> Self {
        let conversation = turns
            .iter()
            .enumerate()
            .map(|(i, turn)| RecordTurn {
                turn: i + 1,
                speaker: turn.speaker.clone(),
                message: turn.response.clone(),
                previous_message: turn.prior_message.clone(),
            })
            .collect();

        Self {
            metadata: RecordMetadata {
                timestamp: Utc::now(),
                participants,
                turns: turns.len(),
                initial_prompt: turns
                    .first()
                    .map(|t| t.prior_message.clone())
                    .unwrap_or_default(),
            },
            conversation,
        }
    }

    /// Back to transcript form, e.g. for re-analysis of a saved run.
    pub fn to_turns(&self) -> Vec<Turn> {
        self.conversation
            .iter()
            .map(|t| Turn::new(&t.speaker, &t.previous_message, &t.message))
            .collect()
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_string(&self) -> Result<String, SelfPlayError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
        let path = path.as_ref();
        fs::write(path, self.to_json_string()?)?;
        log::info!("Conversation saved to JSON: {}", path.display());
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SelfPlayError> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}
