use tokio::sync::mpsc;

use crate::{
    chat::ChatProvider,
    conversation::{Chatbot, InteractionConfig, InteractionEvent, InteractionLoop, InteractionOutcome},
    error::SelfPlayError,
    export::Participant,
};

use super::templates::RoleTemplate;

/// Two bots playing the roles of a [`RoleTemplate`].
pub struct RolePlay {
    template_name: String,
    first: Chatbot,
    second: Chatbot,
    start_message: String,
    config: InteractionConfig,
}

impl RolePlay {
    /// Casts the template's first role on `provider_a` and its second on
    /// `provider_b`. The template's start message opens the conversation
    /// unless overridden.
    pub fn new(
        template: &RoleTemplate,
        provider_a: Box<dyn ChatProvider>,
        provider_b: Box<dyn ChatProvider>,
    ) -> Result<Self, SelfPlayError> {
        let [role_a, role_b] = &template.roles;
        let first = Chatbot::new(role_a, template.system_message(role_a)?, provider_a);
        let second = Chatbot::new(role_b, template.system_message(role_b)?, provider_b);
        Ok(Self {
            template_name: template.name.clone(),
            first,
            second,
            start_message: template.start.clone(),
            config: InteractionConfig::new(3),
        })
    }

    pub fn with_start_message(mut self, start: impl Into<String>) -> Self {
        self.start_message = start.into();
        self
    }

    pub fn with_config(mut self, config: InteractionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn start_message(&self) -> &str {
        &self.start_message
    }

    pub fn bots(&self) -> (&Chatbot, &Chatbot) {
        (&self.first, &self.second)
    }

    pub fn participants(&self) -> Vec<Participant> {
        vec![self.first.participant(), self.second.participant()]
    }

    pub async fn run(&mut self) -> Result<InteractionOutcome, SelfPlayError> {
        let runner = InteractionLoop::new(self.config.clone())?;
        Ok(self.play(&runner).await)
    }

    /// Like [`RolePlay::run`], reporting progress on `events`.
    pub async fn run_with_events(
        &mut self,
        events: mpsc::UnboundedSender<InteractionEvent>,
    ) -> Result<InteractionOutcome, SelfPlayError> {
        let mut runner = InteractionLoop::new(self.config.clone())?;
        runner.set_event_sender(events);
        Ok(self.play(&runner).await)
    }

    async fn play(&mut self, runner: &InteractionLoop) -> InteractionOutcome {
        log::info!("Role-play {}: {}", self.template_name, self.start_message);
        runner
            .run(&mut self.first, &mut self.second, &self.start_message)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::ScriptedProvider;
    use crate::chat::ChatRole;

    #[tokio::test]
    async fn plays_template_roles_in_order() {
        let template = RoleTemplate::find("Coach | Athlete").unwrap();
        let coach = ScriptedProvider::echo();
        let coach_calls = coach.calls();
        let mut play = RolePlay::new(template, Box::new(coach), Box::new(ScriptedProvider::echo()))
            .unwrap();

        let outcome = play.run().await.unwrap();
        let speakers: Vec<&str> = outcome.transcript.iter().map(|t| t.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["Coach", "Athlete", "Coach"]);
        assert_eq!(outcome.transcript[0].prior_message, template.start);

        let calls = coach_calls.lock().unwrap();
        assert_eq!(calls[0][0].role, ChatRole::System);
        assert_eq!(calls[0][0].content, "You are a coach providing performance advice.");
    }

    #[tokio::test]
    async fn start_message_and_config_overrides() {
        let template = RoleTemplate::find("Host | Guest").unwrap();
        let mut play = RolePlay::new(
            template,
            Box::new(ScriptedProvider::echo()),
            Box::new(ScriptedProvider::echo()),
        )
        .unwrap()
        .with_start_message("Tonight we talk about gardening.")
        .with_config(InteractionConfig::new(2));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = play.run_with_events(tx).await.unwrap();
        assert_eq!(outcome.transcript.len(), 2);
        assert_eq!(outcome.transcript[0].prior_message, "Tonight we talk about gardening.");
        assert!(matches!(rx.try_recv(), Ok(InteractionEvent::Started { .. })));

        let participants = play.participants();
        assert_eq!(participants[0].name, "Host");
        assert_eq!(participants[1].system_message, "You are a guest being interviewed about your work.");
    }

    #[test]
    fn incomplete_template_is_rejected() {
        let mut template = RoleTemplate::find("Buyer | Seller").unwrap().clone();
        template.system_messages.remove("Seller");
        let err = RolePlay::new(
            &template,
            Box::new(ScriptedProvider::echo()),
            Box::new(ScriptedProvider::echo()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SelfPlayError::IncompleteTemplate { .. }));
    }
}
