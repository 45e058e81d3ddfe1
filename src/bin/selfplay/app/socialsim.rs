use std::path::Path;

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::SeedableRng;
use selfplay::socialsim::{
    ExperimentRunner, PersonaDb, Question, QuestionType, ResultsCollector, SampleSpec,
};
use serde_json::Value;

use crate::args::{parse_pair, AbTestArgs, CliArgs, ExperimentArgs, MultiVariantArgs, SurveyArgs};
use crate::config::AppConfig;
use crate::provider::build_provider;

/// Everything a SocialSim run needs besides its questions.
struct Setup {
    db: PersonaDb,
    sample: SampleSpec,
    runner: ExperimentRunner,
    rng: StdRng,
}

fn load_personas(path: &Path) -> anyhow::Result<PersonaDb> {
    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl"));
    let db = if is_jsonl {
        let source = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("hub");
        PersonaDb::from_jsonl(path, source, None)
    } else {
        PersonaDb::load(path)
    };
    db.with_context(|| format!("failed to load personas from {}", path.display()))
}

/// Filter values are read as JSON when they parse (`age=30`), as plain
/// strings otherwise (`gender=female`).
fn sample_spec(exp: &ExperimentArgs) -> anyhow::Result<SampleSpec> {
    let mut sample = SampleSpec::new(exp.sample);
    if let Some(attribute) = &exp.stratify_by {
        sample = sample.stratify_by(attribute);
    }
    for raw in &exp.filters {
        let Some((name, value)) = parse_pair(raw) else {
            bail!("invalid filter '{raw}', expected name=value");
        };
        let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
        sample = sample.filter(name, value);
    }
    Ok(sample)
}

fn question(text: &str, exp: &ExperimentArgs) -> Question {
    match QuestionType::from(exp.question_type) {
        QuestionType::OpenEnded => Question::open_ended(text),
        kind => Question::multiple_choice(text, exp.options.clone()).with_type(kind),
    }
}

fn setup(args: &CliArgs, config: &AppConfig, exp: &ExperimentArgs) -> anyhow::Result<Setup> {
    let db = load_personas(&exp.personas)?;
    let provider = build_provider(args.provider.as_deref(), args.model.as_deref(), config)?;
    let rng = match exp.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(Setup {
        db,
        sample: sample_spec(exp)?,
        runner: ExperimentRunner::new(provider).with_concurrency(exp.concurrency),
        rng,
    })
}

pub async fn survey(args: &CliArgs, config: &AppConfig, survey: &SurveyArgs) -> anyhow::Result<()> {
    let exp = &survey.experiment;
    let mut setup = setup(args, config, exp)?;
    let results = setup
        .runner
        .run_survey(&setup.db, &question(&survey.question, exp), &setup.sample, &mut setup.rng)
        .await?;
    report(&results, exp)
}

pub async fn ab_test(args: &CliArgs, config: &AppConfig, test: &AbTestArgs) -> anyhow::Result<()> {
    let exp = &test.experiment;
    let mut setup = setup(args, config, exp)?;
    let results = setup
        .runner
        .ab_test(
            &setup.db,
            &question(&test.control, exp),
            &question(&test.test, exp),
            &setup.sample,
            &mut setup.rng,
        )
        .await?;
    report(&results, exp)
}

pub async fn multi_variant(
    args: &CliArgs,
    config: &AppConfig,
    test: &MultiVariantArgs,
) -> anyhow::Result<()> {
    let exp = &test.experiment;
    let variants = test
        .variants
        .iter()
        .map(|raw| {
            parse_pair(raw).with_context(|| format!("invalid variant '{raw}', expected name=text"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut setup = setup(args, config, exp)?;
    let results = setup
        .runner
        .multi_variant_test(
            &setup.db,
            &question(&test.base, exp),
            &variants,
            &setup.sample,
            &mut setup.rng,
        )
        .await?;
    report(&results, exp)
}

fn report(results: &ResultsCollector, exp: &ExperimentArgs) -> anyhow::Result<()> {
    let stats = results.summary_statistics();
    println!(
        "{} responses, {} failed",
        stats.total_responses, stats.failed_requests
    );
    for (value, count) in &stats.response_counts {
        let share = stats.response_percentages.get(value).copied().unwrap_or(0.0);
        println!("  {value:<40} {count:>5}  {share:>5.1}%");
    }
    if let Some(numeric) = &stats.numeric {
        println!(
            "  mean {:.2}, median {:.2}, sd {:.2}, range {:.2}..{:.2} (n={})",
            numeric.mean, numeric.median, numeric.std_dev, numeric.min, numeric.max, numeric.count
        );
    }

    for (group, distribution) in results.group_distributions() {
        println!("\n{group} ({} responses)", distribution.total);
        for (value, count) in &distribution.counts {
            let share = distribution.percentages.get(value).copied().unwrap_or(0.0);
            println!("  {value:<40} {count:>5}  {share:>5.1}%");
        }
    }
    if let Some(chi) = results.chi_square() {
        println!(
            "\nchi-square = {:.3}, df = {}{}",
            chi.statistic,
            chi.degrees_of_freedom,
            if chi.yates_corrected { " (Yates-corrected)" } else { "" }
        );
    }

    if let Some(path) = &exp.output {
        results
            .export_json(path)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        eprintln!("Results saved to {}", path.display());
    }
    if let Some(path) = &exp.csv {
        results
            .export_csv(path)
            .with_context(|| format!("failed to write responses to {}", path.display()))?;
        eprintln!("Responses saved to {}", path.display());
    }
    Ok(())
}
