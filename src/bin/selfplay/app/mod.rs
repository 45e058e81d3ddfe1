mod analyze;
mod chat;
mod roleplay;
mod socialsim;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use selfplay::export::{save_html, ConversationRecord, Participant};
use selfplay::{InteractionConfig, InteractionEvent, Turn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::args::{CliArgs, Command, LoopArgs, OutputArgs};
use crate::config::{load_config, InteractionSettings};
use crate::logging::init_logging;

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let loaded = load_config(args.config.clone())?;
    let _logger = init_logging(&loaded.config.logging, &loaded.paths)?;
    if !loaded.config_exists {
        log::debug!(
            "No config at {}, using defaults",
            loaded.paths.config_file.display()
        );
    }

    let config = &loaded.config;
    match &args.command {
        Command::Chat(chat) => chat::run(&args, config, chat).await,
        Command::Roleplay(play) => roleplay::run(&args, config, play).await,
        Command::Templates(list) => roleplay::list(list),
        Command::Analyze(analyze) => analyze::run(config, analyze),
        Command::Survey(survey) => socialsim::survey(&args, config, survey).await,
        Command::AbTest(test) => socialsim::ab_test(&args, config, test).await,
        Command::MultiVariant(test) => socialsim::multi_variant(&args, config, test).await,
    }
}

/// Command-line flags take precedence over the `[interaction]` section.
fn interaction_config(
    settings: &InteractionSettings,
    flags: &LoopArgs,
    delay_ms: Option<u64>,
) -> InteractionConfig {
    let mut config = InteractionConfig::new(flags.turns.unwrap_or(settings.turns))
        .auto_end(flags.auto_end || settings.auto_end)
        .end_threshold(flags.end_threshold.unwrap_or(settings.end_threshold))
        .turn_delay(Duration::from_millis(
            delay_ms.unwrap_or(settings.turn_delay_ms),
        ));
    if let Some(max_turns) = flags.max_turns.or(settings.max_turns) {
        config = config.max_turns(max_turns);
    }
    config
}

/// Prints the conversation as it happens. Ends once every sender is dropped.
fn print_events(mut events: mpsc::UnboundedReceiver<InteractionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                InteractionEvent::Started {
                    agent_a,
                    agent_b,
                    turn_cap,
                } => println!("{agent_a} and {agent_b}, up to {turn_cap} turns\n"),
                InteractionEvent::TurnCompleted {
                    turn,
                    speaker,
                    response,
                } => println!("[{turn}] {speaker}:\n{response}\n"),
                InteractionEvent::GenerationFailed { speaker, error, .. } => {
                    eprintln!("warning: {speaker} failed: {error}")
                }
                InteractionEvent::AutoEnded { .. } => {}
                InteractionEvent::Finished { turns, cause } => {
                    println!("{cause} ({turns} turns)")
                }
            }
        }
    })
}

fn write_outputs(
    turns: &[Turn],
    participants: Vec<Participant>,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    if let Some(path) = &output.html {
        save_html(turns, path).with_context(|| describe("write HTML to", path))?;
        eprintln!("Conversation saved to {}", path.display());
    }
    if output.json.is_none() && !output.print_json {
        return Ok(());
    }
    let record = ConversationRecord::from_transcript(turns, participants);
    if let Some(path) = &output.json {
        record
            .save_json(path)
            .with_context(|| describe("write JSON to", path))?;
        eprintln!("Conversation saved to {}", path.display());
    }
    if output.print_json {
        println!("{}", record.to_json_string()?);
    }
    Ok(())
}

fn describe(action: &str, path: &Path) -> String {
    format!("failed to {action} {}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let settings = InteractionSettings {
            turns: 8,
            auto_end: false,
            max_turns: Some(20),
            end_threshold: 0.6,
            turn_delay_ms: 500,
        };
        let flags = LoopArgs {
            turns: Some(4),
            auto_end: true,
            max_turns: None,
            end_threshold: Some(0.8),
        };
        let config = interaction_config(&settings, &flags, Some(0));
        assert_eq!(config.requested_turns, 4);
        assert!(config.auto_end);
        assert_eq!(config.max_turns, Some(20));
        assert_eq!(config.end_threshold, 0.8);
        assert!(config.turn_delay.is_zero());
        assert_eq!(config.turn_cap(), 20);
    }

    #[test]
    fn settings_fill_missing_flags() {
        let config = interaction_config(&InteractionSettings::default(), &LoopArgs::default(), None);
        assert_eq!(config.requested_turns, 10);
        assert!(!config.auto_end);
        assert_eq!(config.turn_cap(), 10);
    }

    #[test]
    fn writes_html_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputArgs {
            html: Some(dir.path().join("chat.html")),
            json: Some(dir.path().join("chat.json")),
            print_json: false,
        };
        let turns = vec![Turn::new("Bot A", "Hi", "Hello there")];
        write_outputs(&turns, Vec::new(), &output).unwrap();

        let html = std::fs::read_to_string(dir.path().join("chat.html")).unwrap();
        assert!(html.contains("Hello there"));
        let record = ConversationRecord::load_json(dir.path().join("chat.json")).unwrap();
        assert_eq!(record.to_turns(), turns);
    }
}
