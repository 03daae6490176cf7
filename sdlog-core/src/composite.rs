//! Weighted composite score
//!
//! For each weighted metric the reading's value is graded with the metric's
//! rubric, and the sub-score is multiplied by the weight. The composite is
//! the plain sum: weights are not normalised, so doubling every weight
//! doubles the result.

use serde::Serialize;
use tracing::warn;

use crate::error::MissingMetricError;
use crate::threshold::{Rubric, ScoringContext};
use crate::types::{Metric, SensorReading};

#[derive(Debug, Clone, PartialEq)]
struct WeightedRubric {
    name: String,
    metric: Metric,
    weight: f64,
    rubric: Rubric,
}

/// Contribution of one metric to a composite score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricScore {
    pub metric: String,
    pub value: f64,
    pub label: String,
    pub score: f64,
    pub weight: f64,
}

impl MetricScore {
    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }
}

/// Composite score of one reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub reading: usize,
    pub total: f64,
    /// One entry per weighted metric, in scorer order; a scorer compiled
    /// from a [`ConfigBundle`](crate::ConfigBundle) is sorted by metric name
    pub breakdown: Vec<MetricScore>,
}

/// Read-only scoring table shared by every reading of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeScorer {
    entries: Vec<WeightedRubric>,
}

impl CompositeScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a metric; the caller validates the rubric and weight
    pub fn push(&mut self, name: impl Into<String>, metric: Metric, weight: f64, rubric: Rubric) {
        self.entries.push(WeightedRubric {
            name: name.into(),
            metric,
            weight,
            rubric,
        });
    }

    pub fn with_metric(
        mut self,
        name: impl Into<String>,
        metric: Metric,
        weight: f64,
        rubric: Rubric,
    ) -> Self {
        self.push(name, metric, weight, rubric);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metric names with their weights
    pub fn weights(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|e| (e.name.as_str(), e.weight))
    }

    /// Scores one reading
    ///
    /// Zero-weight metrics are skipped and never need a value. Any other
    /// metric the reading cannot resolve fails this reading only.
    pub fn score(
        &self,
        reading: &SensorReading,
        context: ScoringContext,
    ) -> Result<CompositeScore, MissingMetricError> {
        let mut breakdown = Vec::with_capacity(self.entries.len());
        let mut total = 0.0;

        for entry in self.entries.iter().filter(|e| e.weight != 0.0) {
            let value = entry
                .metric
                .value_in(reading)
                .map_err(|reason| MissingMetricError {
                    reading: reading.index,
                    metric: entry.name.clone(),
                    reason,
                })?;

            let grade = entry.rubric.classify(value, context);
            total += grade.score * entry.weight;
            breakdown.push(MetricScore {
                metric: entry.name.clone(),
                value,
                label: grade.label.to_string(),
                score: grade.score,
                weight: entry.weight,
            });
        }

        Ok(CompositeScore {
            reading: reading.index,
            total,
            breakdown,
        })
    }

    /// Scores every reading independently, results aligned by index
    pub fn score_all(
        &self,
        readings: &[SensorReading],
        context: ScoringContext,
    ) -> Vec<Result<CompositeScore, MissingMetricError>> {
        readings
            .iter()
            .map(|reading| {
                let result = self.score(reading, context);
                if let Err(error) = &result {
                    warn!(%error, "reading not scored");
                }
                result
            })
            .collect()
    }
}
