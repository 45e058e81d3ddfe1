//! SelfPlay drives conversations between two LLM-backed bots.
//!
//! The pieces:
//!
//! - [`chat`] and [`backends`]: the provider trait and one adapter per vendor API
//! - [`builder`]: turns a backend name plus settings into a `Box<dyn ChatProvider>`
//! - [`conversation`]: [`Chatbot`] agents and the [`InteractionLoop`] that alternates them
//! - [`analyzer`]: decides when an autonomous conversation has run its course
//! - [`export`]: HTML and JSON renderings of a finished transcript
//! - [`roleplay`]: ready-made two-role scenarios
//! - [`socialsim`]: simulated surveys and A/B tests over a persona population
//!
//! ```no_run
//! use selfplay::{builder::LLMBuilder, builder::LLMBackend, Chatbot, InteractionConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = || {
//!     LLMBuilder::new()
//!         .backend(LLMBackend::OpenAI)
//!         .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
//!         .build()
//! };
//! let mut a = Chatbot::new("Ada", "You are a curious student.", provider()?);
//! let mut b = Chatbot::new("Bob", "You are a patient teacher.", provider()?);
//! let config = InteractionConfig::new(10).auto_end(true);
//! let transcript = selfplay::interact(&mut a, &mut b, "What is a monad?", config).await?;
//! println!("{}", selfplay::export::to_html(&transcript));
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod backends;
pub mod builder;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod export;
pub mod resilient_llm;
pub mod roleplay;
pub mod socialsim;

pub use analyzer::{ConversationAnalyzer, EndReason, EndSignal, SignalScores};
pub use chat::{ChatMessage, ChatProvider, ChatRole};
pub use conversation::{
    interact, Agent, Chatbot, InteractionConfig, InteractionEvent, InteractionLoop,
    InteractionOutcome, StopCause, Transcript, Turn,
};
pub use error::{GenerationError, LLMError, SelfPlayError};
