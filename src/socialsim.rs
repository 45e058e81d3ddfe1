//! Simulated surveys: ask a population of textual personas the same question
//! through an LLM and tabulate the answers.

#[path = "socialsim/experiment.rs"]
mod experiment;

#[path = "socialsim/persona.rs"]
mod persona;

#[path = "socialsim/persona_db.rs"]
mod persona_db;

#[path = "socialsim/results.rs"]
mod results;

pub use experiment::{ExperimentRunner, Question, QuestionType, SampleSpec, SurveyResponse};
pub use persona::Persona;
pub use persona_db::PersonaDb;
pub use results::{
    ChiSquare, ContingencyTable, ExperimentConfig, ExperimentKind, GroupDistribution,
    NumericSummary, ResultsCollector, SummaryStatistics,
};
