use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use selfplay::conversation::DEFAULT_START_MESSAGE;
use selfplay::socialsim::QuestionType;

#[derive(Parser, Debug)]
#[command(
    name = "selfplay",
    version,
    about = "Let two LLM-backed bots talk to each other, play scripted roles or answer simulated surveys"
)]
pub struct CliArgs {
    /// Provider to use, as `name` or `name:model`. A name is either a
    /// `[providers.<name>]` entry of the config file or a backend
    /// (azure, openai, anthropic, google, meta, aws).
    #[arg(long, short = 'p', global = true)]
    pub provider: Option<String>,
    #[arg(long, short = 'm', global = true)]
    pub model: Option<String>,
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,
    /// Pause between agent calls, in milliseconds.
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a free-form conversation between two bots.
    Chat(ChatArgs),
    /// Play out a role-play template.
    Roleplay(RoleplayArgs),
    /// List the available role-play templates.
    Templates(TemplatesArgs),
    /// Re-run the end-of-conversation analyzer over a saved JSON transcript.
    Analyze(AnalyzeArgs),
    /// Ask a sample of personas one question.
    Survey(SurveyArgs),
    /// Compare two phrasings of a question on random halves of a sample.
    AbTest(AbTestArgs),
    /// Compare several variants appended to a base question.
    MultiVariant(MultiVariantArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoopArgs {
    /// Number of turns (the hard cap unless --max-turns is given with --auto-end).
    #[arg(long, short = 't')]
    pub turns: Option<usize>,
    /// Stop early once the conversation has naturally concluded.
    #[arg(long)]
    pub auto_end: bool,
    #[arg(long)]
    pub max_turns: Option<usize>,
    #[arg(long)]
    pub end_threshold: Option<f64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Save the conversation as an HTML page.
    #[arg(long)]
    pub html: Option<PathBuf>,
    /// Save the conversation as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,
    /// Print the conversation as JSON to stdout.
    #[arg(long)]
    pub print_json: bool,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[arg(long, default_value = "Bot A")]
    pub name_a: String,
    #[arg(long, default_value = "You are a helpful assistant.")]
    pub system_a: String,
    #[arg(long, default_value = "Bot B")]
    pub name_b: String,
    #[arg(long, default_value = "You are a helpful assistant.")]
    pub system_b: String,
    /// Provider for the second bot; defaults to --provider.
    #[arg(long)]
    pub provider_b: Option<String>,
    #[arg(long, short = 's', default_value = DEFAULT_START_MESSAGE)]
    pub start: String,
    #[command(flatten)]
    pub interaction: LoopArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct RoleplayArgs {
    /// Template name, e.g. "Doctor | Patient".
    pub template: String,
    /// Opening message; defaults to the template's.
    #[arg(long, short = 's')]
    pub start: Option<String>,
    /// Extra templates (YAML) added to the built-in catalogue.
    #[arg(long)]
    pub templates_file: Option<PathBuf>,
    /// Provider for the second role; defaults to --provider.
    #[arg(long)]
    pub provider_b: Option<String>,
    #[command(flatten)]
    pub interaction: LoopArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct TemplatesArgs {
    #[arg(long)]
    pub templates_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Transcript written with --json.
    pub transcript: PathBuf,
    #[arg(long)]
    pub end_threshold: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum QuestionKind {
    #[default]
    MultipleChoice,
    Likert,
    Numeric,
    OpenEnded,
}

impl From<QuestionKind> for QuestionType {
    fn from(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::MultipleChoice => QuestionType::MultipleChoice,
            QuestionKind::Likert => QuestionType::Likert,
            QuestionKind::Numeric => QuestionType::Numeric,
            QuestionKind::OpenEnded => QuestionType::OpenEnded,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExperimentArgs {
    /// Persona file: a JSON array, or PersonaHub JSON Lines (`.jsonl`).
    #[arg(long)]
    pub personas: PathBuf,
    /// Comma-separated answer options.
    #[arg(long, value_delimiter = ',')]
    pub options: Vec<String>,
    #[arg(long, value_enum, default_value_t = QuestionKind::MultipleChoice)]
    pub question_type: QuestionKind,
    /// Personas to sample (per variant for multi-variant tests).
    #[arg(long, short = 'n', default_value_t = 100)]
    pub sample: usize,
    #[arg(long)]
    pub stratify_by: Option<String>,
    /// Attribute filter as `name=value`; repeatable.
    #[arg(long = "filter")]
    pub filters: Vec<String>,
    /// Concurrent provider requests.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,
    /// Seed for reproducible sampling.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Write the full results as JSON.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Write one CSV row per response.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SurveyArgs {
    #[arg(long, short = 'q')]
    pub question: String,
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

#[derive(Args, Debug)]
pub struct AbTestArgs {
    #[arg(long)]
    pub control: String,
    #[arg(long)]
    pub test: String,
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

#[derive(Args, Debug)]
pub struct MultiVariantArgs {
    #[arg(long)]
    pub base: String,
    /// Variant as `name=text`; repeatable.
    #[arg(long = "variant", required = true)]
    pub variants: Vec<String>,
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

/// Splits `name=value`.
pub fn parse_pair(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_with_global_flags() {
        let args = CliArgs::try_parse_from([
            "selfplay", "chat", "--provider", "anthropic:claude-3-opus", "--turns", "4",
            "--auto-end", "--html", "out.html", "--delay-ms", "250",
        ])
        .unwrap();
        assert_eq!(args.provider.as_deref(), Some("anthropic:claude-3-opus"));
        assert_eq!(args.delay_ms, Some(250));
        match args.command {
            Command::Chat(chat) => {
                assert_eq!(chat.interaction.turns, Some(4));
                assert!(chat.interaction.auto_end);
                assert_eq!(chat.start, DEFAULT_START_MESSAGE);
                assert_eq!(chat.output.html, Some(PathBuf::from("out.html")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_survey_options_and_filters() {
        let args = CliArgs::try_parse_from([
            "selfplay", "survey", "-q", "Do you cycle?", "--personas", "p.json",
            "--options", "Yes,No", "--filter", "gender=female", "-n", "20",
        ])
        .unwrap();
        match args.command {
            Command::Survey(survey) => {
                assert_eq!(survey.experiment.options, vec!["Yes", "No"]);
                assert_eq!(survey.experiment.filters, vec!["gender=female"]);
                assert_eq!(survey.experiment.sample, 20);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn pairs() {
        assert_eq!(
            parse_pair("free = It is free."),
            Some(("free".to_string(), "It is free.".to_string()))
        );
        assert_eq!(parse_pair("novalue"), None);
        assert_eq!(parse_pair("=x"), None);
    }
}
