//! Error taxonomy for ingestion and scoring
//!
//! Line and row scoped errors never abort a batch; only a
//! [`ConfigurationError`] stops a run, and it does so before the first
//! line is read.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::parser::ParsedLog;
use crate::types::{Bank, BankRecord, CHANNELS_PER_BANK};

pub type SdlogResult<T> = Result<T, SdlogError>;

/// A line or fragment that violates the log grammar (recoverable)
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ParseError {
    #[error("no numeric literal in {0:?}")]
    NoNumericLiteral(String),

    #[error("unrecognized line")]
    UnrecognizedLine,

    #[error("malformed channel line, expected `Channel <n>: <value>`")]
    MalformedChannel,

    #[error("channel {0} out of range 0-3")]
    ChannelOutOfRange(String),

    #[error("unknown bank {0:?}")]
    UnknownBank(String),

    #[error("channel {channel} repeated within one bank {bank} group")]
    DuplicateChannel { bank: Bank, channel: usize },
}

/// Input ended while a `<Bank> Values:` group still expected channel lines
///
/// Carries the log parsed so far and the channels that did arrive, so the
/// caller picks what happens to the incomplete group via
/// [`recover`](TruncatedRecordError::recover).
#[derive(Debug, Error)]
#[error(
    "input ended after {consumed} of {expected} channel lines for bank {bank} (header at line {header_line})",
    expected = CHANNELS_PER_BANK
)]
pub struct TruncatedRecordError {
    pub bank: Bank,
    pub header_line: usize,
    /// Channel lines consumed before the input ended
    pub consumed: usize,
    /// Channels that parsed; the rest stay `None`
    pub received: BankRecord,
    pub(crate) partial: Box<ParsedLog>,
}

/// Why a metric could not be resolved for a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    Absent,
    NotCalibrated,
    NotFinite,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::Absent => f.write_str("was never reported"),
            MissingReason::NotCalibrated => f.write_str("has no calibration"),
            MissingReason::NotFinite => f.write_str("is not a finite number"),
        }
    }
}

/// A reading lacks a value its composite score needs (row scoped)
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("reading {reading}: metric {metric:?} {reason}")]
pub struct MissingMetricError {
    pub reading: usize,
    pub metric: String,
    pub reason: MissingReason,
}

/// Calibration, rubric or weight tables are malformed (fatal at startup)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to serialize configuration: {0}")]
    Serialize(String),

    #[error("rubric {0:?} has no bands")]
    EmptyRubric(String),

    #[error("rubric {rubric:?} band {index} has invalid bounds [{low}, {high}]")]
    InvalidBand {
        rubric: String,
        index: usize,
        low: f64,
        high: f64,
    },

    #[error("band {index} of rubric {rubric:?} has a non-finite score")]
    InvalidScore { rubric: String, index: usize },

    #[error("weight for {metric:?} must be finite and non-negative, got {weight}")]
    InvalidWeight { metric: String, weight: f64 },

    #[error("unknown metric {0:?}")]
    UnknownMetric(String),

    #[error("metric {0:?} is weighted but has no rubric")]
    MissingRubric(String),

    #[error("channel {bank}{channel} calibrated more than once")]
    DuplicateCalibration { bank: Bank, channel: usize },

    #[error("channel index {0} out of range 0-3")]
    ChannelOutOfRange(usize),

    #[error("calibration {0:?} has non-finite bounds")]
    InvalidCalibration(String),

    #[error("metric name {0:?} defined more than once")]
    DuplicateMetric(String),

    #[error("bank alias {0:?} assigned more than once")]
    DuplicateBankAlias(String),
}

/// Any error raised by this crate
#[derive(Debug, Error)]
pub enum SdlogError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Truncated(#[from] TruncatedRecordError),

    #[error(transparent)]
    MissingMetric(#[from] MissingMetricError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
