#[path = "resilient_llm/config.rs"]
mod config;

#[path = "resilient_llm/wrapper.rs"]
mod wrapper;

#[path = "resilient_llm/chat.rs"]
mod chat;

pub use config::ResilienceConfig;
pub use wrapper::ResilientLLM;
