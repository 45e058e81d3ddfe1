//! Transcript artifacts: a standalone HTML page and a structured JSON record.

#[path = "export/html.rs"]
mod html;

#[path = "export/json.rs"]
mod json;

pub use html::{save_html, to_html};
pub use json::{ConversationRecord, Participant, RecordMetadata, RecordTurn};
