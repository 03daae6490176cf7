//! Parse-then-score batch runs
//!
//! A [`Pipeline`] owns the compiled tables of one configuration. Each run
//! parses a finite log, aligns and calibrates the readings, then scores
//! them. Runs always complete: skipped lines, a truncated final group and
//! unscorable rows are collected in the [`RunManifest`].

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::calibration::CalibrationTable;
use crate::composite::{CompositeScore, CompositeScorer};
use crate::config::{ConfigBundle, EngineTables};
use crate::error::{ConfigurationError, MissingMetricError, SdlogResult};
use crate::parser::{BankAliases, ParseWarning, ParsedLog, Series, TruncationPolicy, parse_lines};
use crate::threshold::ScoringContext;
use crate::types::{Bank, SensorReading};

/// How a bank group cut short by the end of input was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncationNote {
    pub bank: Bank,
    pub header_line: usize,
    pub channels_received: usize,
    pub policy: TruncationPolicy,
    pub message: String,
}

/// Diagnostics of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunManifest {
    pub lines_read: usize,
    pub readings: usize,
    pub scored: usize,
    pub warnings: Vec<ParseWarning>,
    pub truncated: Option<TruncationNote>,
    pub failed_rows: Vec<MissingMetricError>,
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub context: ScoringContext,
    pub series: Vec<Series>,
    pub readings: Vec<SensorReading>,
    /// Aligned with `readings`; `None` where the row failed
    pub scores: Vec<Option<CompositeScore>>,
    pub manifest: RunManifest,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn score(&self, reading: usize) -> Option<&CompositeScore> {
        self.scores.get(reading)?.as_ref()
    }
}

/// Compiled configuration, shared read-only by every run
#[derive(Debug, Clone)]
pub struct Pipeline {
    tables: EngineTables,
}

impl Pipeline {
    pub fn new(tables: EngineTables) -> Self {
        Self { tables }
    }

    pub fn from_config(bundle: &ConfigBundle) -> Result<Self, ConfigurationError> {
        Ok(Self::new(bundle.compile()?))
    }

    pub fn from_config_file(path: &Path) -> SdlogResult<Self> {
        let bundle = ConfigBundle::from_file(path)?;
        Ok(Self::from_config(&bundle)?)
    }

    pub fn aliases(&self) -> &BankAliases {
        &self.tables.aliases
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.tables.calibration
    }

    pub fn scorer(&self) -> &CompositeScorer {
        &self.tables.scorer
    }

    /// Parses `lines`, resolving a truncated final group with `policy`
    pub fn parse<I, S>(&self, lines: I, policy: TruncationPolicy) -> (ParsedLog, Option<TruncationNote>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match parse_lines(lines, &self.tables.aliases) {
            Ok(log) => (log, None),
            Err(truncated) => {
                let note = TruncationNote {
                    bank: truncated.bank,
                    header_line: truncated.header_line,
                    channels_received: truncated.received.received(),
                    policy,
                    message: truncated.to_string(),
                };
                (truncated.recover(policy), Some(note))
            }
        }
    }

    /// Runs the whole batch
    pub fn run<I, S>(&self, lines: I, context: ScoringContext, policy: TruncationPolicy) -> RunReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (log, truncated) = self.parse(lines, policy);

        let mut readings = log.readings();
        self.tables.calibration.apply_all(&mut readings);

        let mut failed_rows = Vec::new();
        let scores: Vec<Option<CompositeScore>> = self
            .tables
            .scorer
            .score_all(&readings, context)
            .into_iter()
            .map(|result| result.map_err(|e| failed_rows.push(e)).ok())
            .collect();

        let manifest = RunManifest {
            lines_read: log.lines_read,
            readings: readings.len(),
            scored: scores.iter().flatten().count(),
            warnings: log.warnings.clone(),
            truncated,
            failed_rows,
        };

        info!(
            lines = manifest.lines_read,
            readings = manifest.readings,
            scored = manifest.scored,
            warnings = manifest.warnings.len(),
            truncated = manifest.truncated.is_some(),
            "run complete"
        );

        RunReport {
            context,
            series: log.series(),
            readings,
            scores,
            manifest,
        }
    }
}
