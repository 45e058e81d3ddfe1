//! The bot-to-bot interaction loop.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::{analyzer::ConversationAnalyzer, error::SelfPlayError};

use super::agent::Agent;
use super::events::{InteractionEvent, StopCause};
use super::turn::{Transcript, Turn};

/// Opening line used when the caller does not supply one.
pub const DEFAULT_START_MESSAGE: &str = "Hello! How can I assist you today?";

/// Settings for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionConfig {
    /// Turns to run when `auto_end` is off.
    pub requested_turns: usize,
    /// Consult the conversation analyzer after every turn from the second on.
    pub auto_end: bool,
    /// Hard cap when `auto_end` is on; defaults to `requested_turns`.
    pub max_turns: Option<usize>,
    /// Pause before every agent call after the first.
    pub turn_delay: Duration,
    pub end_threshold: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

impl InteractionConfig {
    pub fn new(requested_turns: usize) -> Self {
        Self {
            requested_turns,
            auto_end: false,
            max_turns: None,
            turn_delay: Duration::ZERO,
            end_threshold: ConversationAnalyzer::DEFAULT_THRESHOLD,
        }
    }

    pub fn auto_end(mut self, enabled: bool) -> Self {
        self.auto_end = enabled;
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    pub fn end_threshold(mut self, threshold: f64) -> Self {
        self.end_threshold = threshold;
        self
    }

    /// The number of turns after which the loop stops unconditionally.
    pub fn turn_cap(&self) -> usize {
        if self.auto_end {
            self.max_turns.unwrap_or(self.requested_turns)
        } else {
            self.requested_turns
        }
    }
}

/// Finished interaction: the transcript and why it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOutcome {
    pub transcript: Transcript,
    pub cause: StopCause,
}

impl InteractionOutcome {
    pub fn ended_early(&self) -> bool {
        matches!(self.cause, StopCause::AutoEnd(_))
    }
}

/// Drives two agents in strict alternation.
///
/// Agent A answers the start message, then B answers A, A answers B, and so
/// on. Every turn awaits the previous one. A failed generation is written
/// into the transcript as `"An error occurred: <error>"` and the loop moves
/// on; the only ways out are the turn cap and, with auto-end, a positive
/// analyzer verdict.
pub struct InteractionLoop {
    config: InteractionConfig,
    analyzer: Option<ConversationAnalyzer>,
    event_sender: Option<mpsc::UnboundedSender<InteractionEvent>>,
}

impl InteractionLoop {
    /// Validates `config` before any agent is called.
    ///
    /// # Errors
    ///
    /// [`SelfPlayError::InvalidTurnCount`] for a zero turn cap and
    /// [`SelfPlayError::InvalidThreshold`] for a threshold outside `[0, 1]`.
    pub fn new(config: InteractionConfig) -> Result<Self, SelfPlayError> {
        if config.turn_cap() == 0 {
            return Err(SelfPlayError::InvalidTurnCount);
        }
        let analyzer = ConversationAnalyzer::new(config.end_threshold)?;
        Ok(Self {
            analyzer: config.auto_end.then_some(analyzer),
            config,
            event_sender: None,
        })
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<InteractionEvent>) {
        self.event_sender = Some(sender);
    }

    /// Creates an event receiver channel.
    #[must_use]
    pub fn create_event_channel(&mut self) -> mpsc::UnboundedReceiver<InteractionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_sender = Some(tx);
        rx
    }

    fn emit_event(&self, event: InteractionEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    pub async fn run<A, B>(
        &self,
        agent_a: &mut A,
        agent_b: &mut B,
        start_message: &str,
    ) -> InteractionOutcome
    where
        A: Agent + ?Sized,
        B: Agent + ?Sized,
    {
        let cap = self.config.turn_cap();
        log::info!(
            "Starting interaction between {} and {} (cap {cap}, auto_end={})",
            agent_a.name(),
            agent_b.name(),
            self.config.auto_end
        );
        self.emit_event(InteractionEvent::Started {
            agent_a: agent_a.name().to_string(),
            agent_b: agent_b.name().to_string(),
            turn_cap: cap,
        });

        let mut transcript = Transcript::new();
        let mut message = start_message.to_string();
        let mut cause = StopCause::TurnLimit;

        while transcript.len() < cap {
            let turn = transcript.len() + 1;
            if turn > 1 && !self.config.turn_delay.is_zero() {
                tokio::time::sleep(self.config.turn_delay).await;
            }

            let (speaker, response) = if turn % 2 == 1 {
                self.take_turn(agent_a, &message, turn).await
            } else {
                self.take_turn(agent_b, &message, turn).await
            };

            transcript.push(Turn::new(speaker.clone(), message, response.clone()));
            self.emit_event(InteractionEvent::TurnCompleted {
                turn,
                speaker,
                response: response.clone(),
            });
            message = response;

            if let Some(analyzer) = &self.analyzer {
                if turn >= 2 {
                    let signal = analyzer.detect_end_signals(&transcript, turn);
                    if signal.should_end {
                        log::info!("Conversation ended naturally after {turn} turns: {signal}");
                        self.emit_event(InteractionEvent::AutoEnded { turn, signal });
                        cause = StopCause::AutoEnd(signal);
                        break;
                    }
                }
            }
        }

        log::info!("Interaction finished after {} turns: {cause}", transcript.len());
        self.emit_event(InteractionEvent::Finished {
            turns: transcript.len(),
            cause,
        });

        InteractionOutcome { transcript, cause }
    }

    async fn take_turn<G>(&self, agent: &mut G, message: &str, turn: usize) -> (String, String)
    where
        G: Agent + ?Sized,
    {
        let speaker = agent.name().to_string();
        match agent.respond(message).await {
            Ok(response) => {
                log::debug!("turn {turn}: {speaker} replied ({} chars)", response.len());
                (speaker, response)
            }
            Err(err) => {
                log::warn!("turn {turn}: {err}");
                self.emit_event(InteractionEvent::GenerationFailed {
                    turn,
                    speaker: speaker.clone(),
                    error: err.to_string(),
                });
                (speaker, err.transcript_text())
            }
        }
    }
}

/// Runs one interaction and returns its transcript.
///
/// # Errors
///
/// Only configuration errors; provider failures end up in the transcript.
pub async fn interact<A, B>(
    agent_a: &mut A,
    agent_b: &mut B,
    start_message: &str,
    config: InteractionConfig,
) -> Result<Transcript, SelfPlayError>
where
    A: Agent + ?Sized,
    B: Agent + ?Sized,
{
    let runner = InteractionLoop::new(config)?;
    Ok(runner.run(agent_a, agent_b, start_message).await.transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::ScriptedProvider;
    use crate::conversation::Chatbot;
    use crate::error::LLMError;

    fn bot(name: &str, provider: ScriptedProvider) -> Chatbot {
        Chatbot::new(name, format!("You are {name}."), Box::new(provider))
    }

    #[tokio::test]
    async fn alternates_speakers_for_requested_turns() {
        let mut a = bot("Alice", ScriptedProvider::echo());
        let mut b = bot("Bob", ScriptedProvider::echo());

        let transcript = interact(&mut a, &mut b, "Hi", InteractionConfig::new(5))
            .await
            .unwrap();

        let speakers: Vec<&str> = transcript.iter().map(|t| t.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["Alice", "Bob", "Alice", "Bob", "Alice"]);
        assert_eq!(transcript[0].prior_message, "Hi");
        assert_eq!(transcript[0].response, "echo: Hi");
        for pair in transcript.windows(2) {
            assert_eq!(pair[1].prior_message, pair[0].response);
        }
        assert_eq!(a.num_turns(), 3);
        assert_eq!(b.num_turns(), 2);
    }

    #[tokio::test]
    async fn single_turn_only_calls_first_agent() {
        let provider_b = ScriptedProvider::echo();
        let b_calls = provider_b.calls();
        let mut a = bot("Alice", ScriptedProvider::echo());
        let mut b = bot("Bob", provider_b);

        let transcript = interact(&mut a, &mut b, "Hi", InteractionConfig::new(1))
            .await
            .unwrap();
        assert_eq!(transcript.len(), 1);
        assert!(b_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_cap_is_rejected_before_any_call() {
        let provider = ScriptedProvider::echo();
        let calls = provider.calls();
        let mut a = bot("Alice", provider);
        let mut b = bot("Bob", ScriptedProvider::echo());

        let err = interact(&mut a, &mut b, "Hi", InteractionConfig::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, SelfPlayError::InvalidTurnCount));
        assert!(calls.lock().unwrap().is_empty());

        let err = InteractionLoop::new(InteractionConfig::new(5).auto_end(true).max_turns(0))
            .err()
            .unwrap();
        assert!(matches!(err, SelfPlayError::InvalidTurnCount));
    }

    #[tokio::test]
    async fn invalid_threshold_is_rejected() {
        let err = InteractionLoop::new(InteractionConfig::new(3).end_threshold(2.0))
            .err()
            .unwrap();
        assert!(matches!(err, SelfPlayError::InvalidThreshold(_)));
    }

    #[tokio::test]
    async fn auto_end_stops_on_natural_ending() {
        let closing = "I hope that helps. In summary, that's all. Goodbye!";
        let mut a = bot("Alice", ScriptedProvider::constant(closing));
        let mut b = bot("Bob", ScriptedProvider::constant(closing));

        let runner =
            InteractionLoop::new(InteractionConfig::new(4).auto_end(true).max_turns(10)).unwrap();
        let outcome = runner.run(&mut a, &mut b, "Hi").await;

        // repetition only kicks in once four turns exist
        assert_eq!(outcome.transcript.len(), 4);
        assert!(outcome.ended_early());
        match outcome.cause {
            StopCause::AutoEnd(signal) => {
                assert!(signal.should_end);
                assert!(signal.confidence >= 0.6);
            }
            StopCause::TurnLimit => panic!("expected auto end"),
        }
    }

    #[tokio::test]
    async fn huge_turn_cap_still_ends_naturally() {
        let closing = "I hope that helps. In summary, that's all. Goodbye!";
        let mut a = bot("Alice", ScriptedProvider::constant(closing));
        let mut b = bot("Bob", ScriptedProvider::constant(closing));

        let config = InteractionConfig::new(4)
            .auto_end(true)
            .max_turns(usize::MAX / 2);
        let runner = InteractionLoop::new(config).unwrap();
        let outcome = runner.run(&mut a, &mut b, "Hi").await;

        assert_eq!(outcome.transcript.len(), 4);
        assert!(matches!(outcome.cause, StopCause::AutoEnd(_)));
    }

    #[tokio::test]
    async fn auto_end_off_ignores_endings() {
        let mut a = bot("Alice", ScriptedProvider::constant("Goodbye! Thanks!"));
        let mut b = bot("Bob", ScriptedProvider::constant("Goodbye! Thanks!"));

        let outcome = InteractionLoop::new(InteractionConfig::new(6).max_turns(2))
            .unwrap()
            .run(&mut a, &mut b, "Hi")
            .await;
        assert_eq!(outcome.transcript.len(), 6);
        assert_eq!(outcome.cause, StopCause::TurnLimit);
    }

    #[tokio::test]
    async fn auto_end_respects_hard_cap() {
        let mut a = bot("Alice", ScriptedProvider::echo());
        let mut b = bot("Bob", ScriptedProvider::echo());

        let outcome = InteractionLoop::new(InteractionConfig::new(20).auto_end(true).max_turns(3))
            .unwrap()
            .run(&mut a, &mut b, "Let us discuss compilers in depth, covering every phase.")
            .await;
        assert_eq!(outcome.transcript.len(), 3);
        assert_eq!(outcome.cause, StopCause::TurnLimit);
    }

    #[tokio::test]
    async fn failed_generation_is_inlined_and_loop_continues() {
        let mut a = bot("Alice", ScriptedProvider::echo());
        let mut b = bot(
            "Bob",
            ScriptedProvider::failing(|| LLMError::HttpError("connection reset".into())),
        );

        let mut runner = InteractionLoop::new(InteractionConfig::new(4)).unwrap();
        let mut events = runner.create_event_channel();
        let outcome = runner.run(&mut a, &mut b, "Hi").await;

        assert_eq!(outcome.transcript.len(), 4);
        assert_eq!(
            outcome.transcript[1].response,
            "An error occurred: HTTP error: connection reset"
        );
        assert_eq!(
            outcome.transcript[2].prior_message,
            "An error occurred: HTTP error: connection reset"
        );
        assert!(b.memory().is_empty());

        let mut failures = 0;
        let mut finished = false;
        while let Ok(event) = events.try_recv() {
            match event {
                InteractionEvent::GenerationFailed { speaker, .. } => {
                    assert_eq!(speaker, "Bob");
                    failures += 1;
                }
                InteractionEvent::Finished { turns, .. } => {
                    assert_eq!(turns, 4);
                    finished = true;
                }
                _ => {}
            }
        }
        assert_eq!(failures, 2);
        assert!(finished);
    }

    #[tokio::test(start_paused = true)]
    async fn turn_delay_separates_calls() {
        let mut a = bot("Alice", ScriptedProvider::echo());
        let mut b = bot("Bob", ScriptedProvider::echo());
        let config = InteractionConfig::new(3).turn_delay(Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        interact(&mut a, &mut b, "Hi", config).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn works_with_boxed_trait_objects() {
        let mut a: Box<dyn Agent> = Box::new(bot("Alice", ScriptedProvider::echo()));
        let mut b: Box<dyn Agent> = Box::new(bot("Bob", ScriptedProvider::echo()));
        let transcript = interact(a.as_mut(), b.as_mut(), "Hi", InteractionConfig::new(2))
            .await
            .unwrap();
        assert_eq!(transcript[1].speaker, "Bob");
    }
}
