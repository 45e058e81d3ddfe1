mod message;
mod traits;

pub use message::{split_system, ChatMessage, ChatMessageBuilder, ChatRole};
pub use traits::{ChatProvider, ChatResponse, TextResponse};
