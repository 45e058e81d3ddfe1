use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SelfPlayError;

use super::experiment::{QuestionType, SurveyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentKind {
    Survey,
    AbTest,
    MultiVariantTest,
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Survey => "survey",
            Self::AbTest => "A/B test",
            Self::MultiVariantTest => "multi-variant test",
        })
    }
}

/// How an experiment was set up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(rename = "type")]
    pub kind: ExperimentKind,
    /// Question text per group; a plain survey uses the key `survey`.
    pub questions: BTreeMap<String, String>,
    pub options: Vec<String>,
    pub question_type: QuestionType,
    pub sample_size: usize,
    pub stratify_by: Option<String>,
    pub filter_by: BTreeMap<String, Value>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub persona_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; zero for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_responses: usize,
    pub failed_requests: usize,
    pub response_counts: BTreeMap<String, usize>,
    /// Share of `total_responses`, in percent.
    pub response_percentages: BTreeMap<String, f64>,
    pub mean_response_time: Option<f64>,
    /// Only for numeric questions with at least one parseable answer.
    pub numeric: Option<NumericSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub total: usize,
    pub counts: BTreeMap<String, usize>,
    pub percentages: BTreeMap<String, f64>,
}

/// Group × answer counts. Rows follow `groups`, columns follow `values`,
/// both sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub groups: Vec<String>,
    pub values: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquare {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    /// Yates' continuity correction applies to 2×2 tables.
    pub yates_corrected: bool,
}

/// Accumulates the answers of one experiment.
#[derive(Debug, Clone)]
pub struct ResultsCollector {
    config: ExperimentConfig,
    responses: Vec<SurveyResponse>,
    failures: Vec<FailedRequest>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ExportMetadata {
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    total_responses: usize,
    duration_seconds: Option<f64>,
}

#[derive(Serialize)]
struct Export<'a> {
    experiment_config: &'a ExperimentConfig,
    metadata: ExportMetadata,
    summary: SummaryStatistics,
    responses: &'a [SurveyResponse],
    failures: &'a [FailedRequest],
}

/// One flat CSV line per response. List and persona columns hold JSON.
#[derive(Serialize)]
struct CsvRow<'a> {
    survey_id: &'a str,
    question_id: &'a str,
    question_text: &'a str,
    question_type: QuestionType,
    question_options: String,
    question_variant: Option<&'a str>,
    persona_id: &'a str,
    persona_attributes: String,
    response_value: &'a str,
    raw_response: &'a str,
    response_time: f64,
    timestamp: DateTime<Utc>,
    group: Option<&'a str>,
}

impl<'a> CsvRow<'a> {
    fn from_response(response: &'a SurveyResponse) -> Result<Self, SelfPlayError> {
        Ok(Self {
            survey_id: &response.survey_id,
            question_id: &response.question_id,
            question_text: &response.question_text,
            question_type: response.question_type,
            question_options: serde_json::to_string(&response.question_options)?,
            question_variant: response.question_variant.as_deref(),
            persona_id: &response.persona_id,
            persona_attributes: serde_json::to_string(&response.persona_attributes)?,
            response_value: &response.response_value,
            raw_response: &response.raw_response,
            response_time: response.response_time,
            timestamp: response.timestamp,
            group: response.group.as_deref(),
        })
    }
}

fn frequencies<'a>(values: impl Iterator<Item = &'a str>) -> (usize, BTreeMap<String, usize>) {
    let mut counts = BTreeMap::new();
    let mut total = 0;
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
        total += 1;
    }
    (total, counts)
}

fn percentages(counts: &BTreeMap<String, usize>, total: usize) -> BTreeMap<String, f64> {
    counts
        .iter()
        .map(|(k, &v)| (k.clone(), v as f64 / total as f64 * 100.0))
        .collect()
}

fn numeric_summary(mut values: Vec<f64>) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    } else {
        values[count / 2]
    };
    let std_dev = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    Some(NumericSummary {
        count,
        mean,
        median,
        std_dev,
        min: values[0],
        max: values[count - 1],
    })
}

impl ResultsCollector {
    pub fn new(config: ExperimentConfig) -> Self {
        Self {
            config,
            responses: Vec::new(),
            failures: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn add_response(&mut self, response: SurveyResponse) {
        self.responses.push(response);
    }

    pub fn record_failure(&mut self, persona_id: impl Into<String>, error: impl Into<String>) {
        self.failures.push(FailedRequest {
            persona_id: persona_id.into(),
            error: error.into(),
        });
    }

    pub fn responses(&self) -> &[SurveyResponse] {
        &self.responses
    }

    pub fn failures(&self) -> &[FailedRequest] {
        &self.failures
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Seconds between creation and [`ResultsCollector::finalize`].
    pub fn duration(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
    }

    pub fn finalize(&mut self) {
        self.end_time = Some(Utc::now());
        log::info!(
            "Collected {} responses ({} failed) in {:.2} seconds",
            self.responses.len(),
            self.failures.len(),
            self.duration().unwrap_or_default()
        );
    }

    pub fn summary_statistics(&self) -> SummaryStatistics {
        let (total, counts) = frequencies(self.responses.iter().map(|r| r.response_value.as_str()));
        let mean_response_time = (total > 0).then(|| {
            self.responses.iter().map(|r| r.response_time).sum::<f64>() / total as f64
        });
        let numeric = match self.config.question_type {
            QuestionType::Numeric => numeric_summary(
                self.responses
                    .iter()
                    .filter_map(|r| r.response_value.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .collect(),
            ),
            _ => None,
        };

        SummaryStatistics {
            total_responses: total,
            failed_requests: self.failures.len(),
            response_percentages: percentages(&counts, total),
            response_counts: counts,
            mean_response_time,
            numeric,
        }
    }

    /// Answer distribution per experimental group. Responses without a
    /// group are left out.
    pub fn group_distributions(&self) -> BTreeMap<String, GroupDistribution> {
        let mut by_group: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for response in &self.responses {
            if let Some(group) = &response.group {
                by_group
                    .entry(group.as_str())
                    .or_default()
                    .push(response.response_value.as_str());
            }
        }
        by_group
            .into_iter()
            .map(|(group, values)| {
                let (total, counts) = frequencies(values.into_iter());
                let percentages = percentages(&counts, total);
                (
                    group.to_string(),
                    GroupDistribution {
                        total,
                        counts,
                        percentages,
                    },
                )
            })
            .collect()
    }

    pub fn contingency_table(&self) -> ContingencyTable {
        let distributions = self.group_distributions();
        let values: Vec<String> = distributions
            .values()
            .flat_map(|d| d.counts.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let counts = distributions
            .values()
            .map(|d| {
                values
                    .iter()
                    .map(|v| d.counts.get(v).copied().unwrap_or(0))
                    .collect()
            })
            .collect();
        ContingencyTable {
            groups: distributions.into_keys().collect(),
            values,
            counts,
        }
    }

    /// Pearson's chi-square statistic of independence between group and
    /// answer. `None` unless there are at least two groups and two distinct
    /// answers.
    pub fn chi_square(&self) -> Option<ChiSquare> {
        self.contingency_table().chi_square()
    }

    pub fn to_json(&self) -> Result<String, SelfPlayError> {
        let export = Export {
            experiment_config: &self.config,
            metadata: ExportMetadata {
                start_time: self.start_time,
                end_time: self.end_time,
                total_responses: self.responses.len(),
                duration_seconds: self.duration(),
            },
            summary: self.summary_statistics(),
            responses: &self.responses,
            failures: &self.failures,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!("Exported {} responses to {}", self.responses.len(), path.display());
        Ok(())
    }

    /// Writes every response as one CSV row, header first. Failed requests
    /// are not included.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        for response in &self.responses {
            writer.serialize(CsvRow::from_response(response)?)?;
        }
        writer.flush()?;
        log::info!("Exported {} responses to {}", self.responses.len(), path.display());
        Ok(())
    }
}

impl ContingencyTable {
    pub fn chi_square(&self) -> Option<ChiSquare> {
        let rows = self.counts.len();
        let cols = self.values.len();
        if rows < 2 || cols < 2 {
            return None;
        }

        let row_totals: Vec<usize> = self.counts.iter().map(|r| r.iter().sum()).collect();
        let col_totals: Vec<usize> = (0..cols)
            .map(|c| self.counts.iter().map(|r| r[c]).sum())
            .collect();
        let grand = row_totals.iter().sum::<usize>() as f64;

        let degrees_of_freedom = (rows - 1) * (cols - 1);
        let yates_corrected = degrees_of_freedom == 1;
        let mut statistic = 0.0;
        for (r, row) in self.counts.iter().enumerate() {
            for (c, &observed) in row.iter().enumerate() {
                let expected = row_totals[r] as f64 * col_totals[c] as f64 / grand;
                let mut diff = (observed as f64 - expected).abs();
                if yates_corrected {
                    diff -= diff.min(0.5);
                }
                statistic += diff * diff / expected;
            }
        }

        Some(ChiSquare {
            statistic,
            degrees_of_freedom,
            yates_corrected,
        })
    }
}
