use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chat::{ChatMessage, ChatProvider},
    error::{LLMError, SelfPlayError},
};

use super::persona::Persona;
use super::persona_db::PersonaDb;
use super::results::{ExperimentConfig, ExperimentKind, ResultsCollector};

const ROLEPLAY_INSTRUCTION: &str =
    "You are roleplaying as a specific person. Answer the question as that person would.";

const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    Likert,
    Numeric,
    OpenEnded,
}

impl QuestionType {
    fn has_options(self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Likert)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub question_type: QuestionType,
}

impl Question {
    pub fn multiple_choice(text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            text: text.into(),
            options,
            question_type: QuestionType::MultipleChoice,
        }
    }

    pub fn open_ended(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
            question_type: QuestionType::OpenEnded,
        }
    }

    pub fn with_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = question_type;
        self
    }

    /// Stable id: hex MD5 digest of the question text.
    pub fn id(&self) -> String {
        format!("{:x}", md5::compute(self.text.as_bytes()))
    }

    fn validate(&self) -> Result<(), SelfPlayError> {
        if self.question_type.has_options() && self.options.is_empty() {
            return Err(SelfPlayError::NoOptions);
        }
        Ok(())
    }

    /// Reduces a reply to the first option (in option order) it contains;
    /// anything else is kept verbatim, trimmed.
    pub fn normalize(&self, reply: &str) -> String {
        let reply = reply.trim();
        if self.question_type.has_options() {
            if let Some(option) = self.options.iter().find(|o| reply.contains(o.as_str())) {
                return option.clone();
            }
        }
        reply.to_string()
    }

    fn prompt_for(&self, persona: &Persona) -> String {
        let mut prompt = format!(
            "You are the following person:\n{}\n\nPlease answer the following question as this person would:\n\nQuestion: {}\n",
            persona.prompt_description(),
            self.text
        );
        match self.question_type {
            QuestionType::OpenEnded => prompt.push_str("\nAnswer in a few sentences."),
            QuestionType::Numeric => prompt.push_str("\nRespond with only a number."),
            QuestionType::MultipleChoice | QuestionType::Likert => {
                prompt.push_str(&format!(
                    "\nOptions:\n{}\n\nChoose exactly one option from the list above. Respond with only the chosen option.",
                    self.options.join(", ")
                ));
            }
        }
        prompt
    }
}

/// Which personas an experiment draws.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSpec {
    pub n: usize,
    pub stratify_by: Option<String>,
    pub filter_by: BTreeMap<String, Value>,
}

impl SampleSpec {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ..Self::default()
        }
    }

    pub fn stratify_by(mut self, attribute: impl Into<String>) -> Self {
        self.stratify_by = Some(attribute.into());
        self
    }

    pub fn filter(mut self, attribute: impl Into<String>, value: Value) -> Self {
        self.filter_by.insert(attribute.into(), value);
        self
    }

    fn draw<'db, R: Rng + ?Sized>(
        &self,
        db: &'db PersonaDb,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<&'db Persona>, SelfPlayError> {
        let personas = db.sample(n, self.stratify_by.as_deref(), &self.filter_by, rng);
        if personas.is_empty() {
            log::error!("No personas match the specified criteria");
            return Err(SelfPlayError::NoPersonas);
        }
        log::info!("Sampled {} personas", personas.len());
        Ok(personas)
    }
}

/// One persona's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub survey_id: String,
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_options: Vec<String>,
    pub question_variant: Option<String>,
    pub persona_id: String,
    pub persona_attributes: Persona,
    /// Normalized answer.
    pub response_value: String,
    pub raw_response: String,
    /// Seconds spent waiting on the provider.
    pub response_time: f64,
    pub timestamp: DateTime<Utc>,
    pub group: Option<String>,
}

struct Assignment<'a> {
    persona: &'a Persona,
    question: &'a Question,
    question_id: String,
    group: Option<String>,
}

/// Puts questions to sampled personas through one provider.
pub struct ExperimentRunner {
    provider: Box<dyn ChatProvider>,
    concurrency: usize,
}

impl ExperimentRunner {
    pub fn new(provider: Box<dyn ChatProvider>) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of persona requests in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn config(
        &self,
        kind: ExperimentKind,
        questions: BTreeMap<String, String>,
        template: &Question,
        sample: &SampleSpec,
        sample_size: usize,
    ) -> ExperimentConfig {
        ExperimentConfig {
            kind,
            questions,
            options: template.options.clone(),
            question_type: template.question_type,
            sample_size,
            stratify_by: sample.stratify_by.clone(),
            filter_by: sample.filter_by.clone(),
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model().to_string(),
        }
    }

    /// Asks every sampled persona the same question.
    pub async fn run_survey<R: Rng + ?Sized>(
        &self,
        db: &PersonaDb,
        question: &Question,
        sample: &SampleSpec,
        rng: &mut R,
    ) -> Result<ResultsCollector, SelfPlayError> {
        question.validate()?;
        log::info!("Sampling {} personas...", sample.n);
        let personas = sample.draw(db, sample.n, rng)?;

        let questions = BTreeMap::from([("survey".to_string(), question.text.clone())]);
        let config = self.config(ExperimentKind::Survey, questions, question, sample, personas.len());
        let question_id = question.id();
        let jobs = personas
            .into_iter()
            .map(|persona| Assignment {
                persona,
                question,
                question_id: question_id.clone(),
                group: None,
            })
            .collect();

        Ok(self.execute(config, jobs).await)
    }

    /// Splits the sample at random into a control half asked `control` and
    /// a test half asked `test`. An odd sample gives the extra persona to
    /// the test group.
    pub async fn ab_test<R: Rng + ?Sized>(
        &self,
        db: &PersonaDb,
        control: &Question,
        test: &Question,
        sample: &SampleSpec,
        rng: &mut R,
    ) -> Result<ResultsCollector, SelfPlayError> {
        control.validate()?;
        test.validate()?;
        log::info!("Sampling {} personas for A/B test...", sample.n);
        let mut personas = sample.draw(db, sample.n, rng)?;
        personas.shuffle(rng);
        let midpoint = personas.len() / 2;
        log::info!(
            "Control group: {} personas, test group: {} personas",
            midpoint,
            personas.len() - midpoint
        );

        let questions = BTreeMap::from([
            ("control".to_string(), control.text.clone()),
            ("test".to_string(), test.text.clone()),
        ]);
        let config = self.config(ExperimentKind::AbTest, questions, control, sample, personas.len());
        let (control_id, test_id) = (control.id(), test.id());
        let jobs = personas
            .into_iter()
            .enumerate()
            .map(|(i, persona)| {
                if i < midpoint {
                    Assignment {
                        persona,
                        question: control,
                        question_id: control_id.clone(),
                        group: Some("control".to_string()),
                    }
                } else {
                    Assignment {
                        persona,
                        question: test,
                        question_id: test_id.clone(),
                        group: Some("test".to_string()),
                    }
                }
            })
            .collect();

        Ok(self.execute(config, jobs).await)
    }

    /// Asks `sample.n` personas per variant the base question followed by
    /// the variant's text. `variants` pairs a variant name with its text;
    /// the last variant absorbs any remainder of an uneven split.
    pub async fn multi_variant_test<R: Rng + ?Sized>(
        &self,
        db: &PersonaDb,
        base: &Question,
        variants: &[(String, String)],
        sample: &SampleSpec,
        rng: &mut R,
    ) -> Result<ResultsCollector, SelfPlayError> {
        base.validate()?;
        if variants.is_empty() {
            return Err(SelfPlayError::NoVariants);
        }
        let total = sample
            .n
            .checked_mul(variants.len())
            .ok_or(SelfPlayError::SampleTooLarge {
                per_variant: sample.n,
                variants: variants.len(),
            })?;
        log::info!("Sampling {total} personas for multi-variant test...");
        let mut personas = sample.draw(db, total, rng)?;
        personas.shuffle(rng);

        let questions: Vec<Question> = variants
            .iter()
            .map(|(_, text)| Question {
                text: format!("{} {}", base.text, text),
                ..base.clone()
            })
            .collect();
        let config = self.config(
            ExperimentKind::MultiVariantTest,
            variants
                .iter()
                .zip(&questions)
                .map(|((name, _), q)| (name.clone(), q.text.clone()))
                .collect(),
            base,
            sample,
            personas.len(),
        );

        let per_variant = personas.len() / variants.len();
        let mut jobs = Vec::with_capacity(personas.len());
        for (i, ((name, _), question)) in variants.iter().zip(&questions).enumerate() {
            let start = i * per_variant;
            let end = if i + 1 == variants.len() {
                personas.len()
            } else {
                start + per_variant
            };
            log::info!("Variant '{name}': {} personas", end - start);
            let question_id = question.id();
            jobs.extend(personas[start..end].iter().copied().map(|persona| Assignment {
                persona,
                question,
                question_id: question_id.clone(),
                group: Some(name.clone()),
            }));
        }

        Ok(self.execute(config, jobs).await)
    }

    async fn execute(&self, config: ExperimentConfig, jobs: Vec<Assignment<'_>>) -> ResultsCollector {
        let survey_id = uuid::Uuid::new_v4().to_string();
        let mut collector = ResultsCollector::new(config);
        let total = jobs.len();
        log::info!("Running {} experiment with {total} personas...", collector.config().kind);

        let mut answers = stream::iter(jobs)
            .map(|job| self.ask(job, &survey_id))
            .buffer_unordered(self.concurrency);

        let mut done = 0usize;
        while let Some((persona_id, result)) = answers.next().await {
            done += 1;
            match result {
                Ok(response) => {
                    log::debug!("{done}/{total}: {persona_id} answered {}", response.response_value);
                    collector.add_response(response);
                }
                Err(err) => {
                    log::warn!("{done}/{total}: {persona_id} failed: {err}");
                    collector.record_failure(persona_id, err.to_string());
                }
            }
        }

        collector.finalize();
        collector
    }

    async fn ask(
        &self,
        job: Assignment<'_>,
        survey_id: &str,
    ) -> (String, Result<SurveyResponse, LLMError>) {
        let persona_id = job.persona.id.clone();
        let messages = [
            ChatMessage::system().content(ROLEPLAY_INSTRUCTION).build(),
            ChatMessage::user()
                .content(job.question.prompt_for(job.persona))
                .build(),
        ];
        log::trace!("{persona_id}: {}", messages[1].content);

        let started = Instant::now();
        let reply = match self.provider.generate_response(&messages).await {
            Ok(reply) => reply,
            Err(err) => return (persona_id, Err(err)),
        };
        let response_time = started.elapsed().as_secs_f64();

        let response = SurveyResponse {
            survey_id: survey_id.to_string(),
            question_id: job.question_id,
            question_text: job.question.text.clone(),
            question_type: job.question.question_type,
            question_options: job.question.options.clone(),
            question_variant: job.group.clone(),
            persona_id: persona_id.clone(),
            persona_attributes: job.persona.clone(),
            response_value: job.question.normalize(&reply),
            raw_response: reply.trim().to_string(),
            response_time,
            timestamp: Utc::now(),
            group: job.group,
        };
        (persona_id, Ok(response))
    }
}
