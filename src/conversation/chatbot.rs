use std::fmt;
use std::fs;
use std::path::Path;

use async_trait::async_trait;

use crate::{
    chat::{ChatMessage, ChatProvider, ChatRole},
    error::{GenerationError, SelfPlayError},
    export::Participant,
};

use super::agent::Agent;

/// An LLM-backed agent: a name, a system instruction and a private memory
/// of every message it has received and sent.
pub struct Chatbot {
    name: String,
    system_message: String,
    memory: Vec<ChatMessage>,
    provider: Box<dyn ChatProvider>,
}

impl Chatbot {
    pub fn new(
        name: impl Into<String>,
        system_message: impl Into<String>,
        provider: Box<dyn ChatProvider>,
    ) -> Self {
        let name = name.into();
        log::info!(
            "{name} using {} provider with model {}",
            provider.provider_name(),
            provider.model()
        );
        Self {
            name,
            system_message: system_message.into(),
            memory: Vec::new(),
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn provider(&self) -> &dyn ChatProvider {
        self.provider.as_ref()
    }

    /// Metadata describing this bot in exported transcripts.
    pub fn participant(&self) -> Participant {
        Participant {
            name: self.name.clone(),
            system_message: self.system_message.clone(),
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model().to_string(),
        }
    }

    /// Sends `message` and records the exchange in memory.
    ///
    /// With `use_memory` the provider sees the system instruction followed by
    /// the whole memory; without it, only the instruction and `message`.
    /// On failure the memory is left as it was before the call.
    pub async fn chat(
        &mut self,
        message: &str,
        use_memory: bool,
    ) -> Result<String, GenerationError> {
        self.memory
            .push(ChatMessage::user().content(message).build());

        let mut request = Vec::with_capacity(self.memory.len() + 1);
        request.push(ChatMessage::system().content(&self.system_message).build());
        if use_memory {
            request.extend(self.memory.iter().cloned());
        } else {
            request.push(ChatMessage::user().content(message).build());
        }

        match self.provider.generate_response(&request).await {
            Ok(response) => {
                self.memory
                    .push(ChatMessage::assistant().content(&response).build());
                Ok(response)
            }
            Err(err) => {
                self.memory.pop();
                Err(GenerationError::new(&self.name, err))
            }
        }
    }

    pub fn memory(&self) -> &[ChatMessage] {
        &self.memory
    }

    pub fn reset_memory(&mut self) {
        self.memory.clear();
        log::info!("{}: memory has been reset", self.name);
    }

    /// Writes the memory as a JSON array of `{role, content}` objects.
    pub fn save_memory(&self, path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
        let path = path.as_ref();
        let payload = serde_json::to_vec_pretty(&self.memory)?;
        fs::write(path, payload)?;
        log::info!("{}: memory saved to {}", self.name, path.display());
        Ok(())
    }

    /// Replaces the memory with the contents of a file written by
    /// [`Chatbot::save_memory`].
    pub fn load_memory(&mut self, path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        self.memory = serde_json::from_slice(&data)?;
        log::info!("{}: memory loaded from {}", self.name, path.display());
        Ok(())
    }

    /// Completed request/response pairs in memory.
    pub fn num_turns(&self) -> usize {
        self.memory.len() / 2
    }
}

impl fmt::Display for Chatbot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.memory.is_empty() {
            return write!(f, "NOTHING TO REMEMBER");
        }
        for (i, msg) in self.memory.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let who = match msg.role {
                ChatRole::Assistant => self.name.as_str(),
                _ => "USER",
            };
            write!(f, "{who}: {}", msg.content)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Chatbot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chatbot")
            .field("name", &self.name)
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model())
            .field("memory_len", &self.memory.len())
            .finish()
    }
}

#[async_trait]
impl Agent for Chatbot {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&mut self, message: &str) -> Result<String, GenerationError> {
        self.chat(message, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::ScriptedProvider;
    use crate::error::LLMError;

    #[tokio::test]
    async fn memory_alternates_and_feeds_provider() {
        let provider = ScriptedProvider::echo();
        let calls = provider.calls();
        let mut bot = Chatbot::new("Echo", "Repeat things.", Box::new(provider));

        assert_eq!(bot.chat("one", true).await.unwrap(), "echo: one");
        assert_eq!(bot.chat("two", true).await.unwrap(), "echo: two");

        assert_eq!(bot.num_turns(), 2);
        let roles: Vec<ChatRole> = bot.memory().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );

        let calls = calls.lock().unwrap();
        let second = &calls[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[0].role, ChatRole::System);
        assert_eq!(second[0].content, "Repeat things.");
        assert_eq!(second[3].content, "two");
    }

    #[tokio::test]
    async fn without_memory_sends_only_the_message() {
        let provider = ScriptedProvider::echo();
        let calls = provider.calls();
        let mut bot = Chatbot::new("Echo", "sys", Box::new(provider));
        bot.chat("first", true).await.unwrap();
        bot.chat("second", false).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[1].len(), 2);
        assert_eq!(calls[1][1].content, "second");
        assert_eq!(bot.memory().len(), 4);
    }

    #[tokio::test]
    async fn failure_rolls_back_pending_message() {
        let mut bot = Chatbot::new(
            "Broken",
            "sys",
            Box::new(ScriptedProvider::failing(|| {
                LLMError::ProviderError("overloaded".into())
            })),
        );
        let err = bot.chat("hello", true).await.unwrap_err();
        assert_eq!(err.agent, "Broken");
        assert!(bot.memory().is_empty());
    }

    #[tokio::test]
    async fn display_lists_memory() {
        let mut bot = Chatbot::new("Echo", "sys", Box::new(ScriptedProvider::echo()));
        assert_eq!(bot.to_string(), "NOTHING TO REMEMBER");
        bot.chat("hi", true).await.unwrap();
        assert_eq!(bot.to_string(), "USER: hi\nEcho: echo: hi");
    }

    #[tokio::test]
    async fn memory_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut bot = Chatbot::new("Echo", "sys", Box::new(ScriptedProvider::echo()));
        bot.chat("remember me", true).await.unwrap();
        bot.save_memory(&path).unwrap();

        let mut other = Chatbot::new("Other", "sys", Box::new(ScriptedProvider::echo()));
        other.load_memory(&path).unwrap();
        assert_eq!(other.memory(), bot.memory());

        other.reset_memory();
        assert_eq!(other.num_turns(), 0);
    }

    #[test]
    fn load_memory_reports_missing_file() {
        let mut bot = Chatbot::new("Echo", "sys", Box::new(ScriptedProvider::echo()));
        let err = bot.load_memory("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SelfPlayError::Io(_)));
    }

    #[test]
    fn participant_metadata() {
        let bot = Chatbot::new("Echo", "sys", Box::new(ScriptedProvider::echo()));
        let p = bot.participant();
        assert_eq!(p.provider, "Scripted");
        assert_eq!(p.model, "scripted-1");
        assert_eq!(p.system_message, "sys");
    }
}
