//! # sdlog-core - SD logger ingestion and air quality scoring
//!
//! Turns the line-oriented capture written by the environmental logger into
//! typed readings, maps raw ADC counts onto calibrated concentrations and
//! grades every reading with threshold-banded rubrics.
//!
//! ## Pipeline
//!
//! ```text
//! log lines ──► LogParser ──► ParsedLog ──► readings()
//!                  │                            │
//!            extract_number              CalibrationTable::apply
//!                                               │
//!                                        CompositeScorer::score ──► CompositeScore
//! ```
//!
//! The log grammar:
//!
//! ```text
//! <Label>: <number>[<unit>]            Label ∈ {Temperature, Humidity, Pressure, Gas}
//! <Bank> Values:                       followed by 4 lines `Channel <0-3>: <integer>`
//! <Bank> Channel <0-3>: <integer>      inline form
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sdlog_core::{ConfigBundle, Pipeline, ScoringContext, TruncationPolicy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_config(&ConfigBundle::default())?;
//! let lines = ["Temperature: 22.5 C", "Humidity: 45 %"];
//! let report = pipeline.run(lines, ScoringContext::DAY, TruncationPolicy::Discard);
//!
//! assert_eq!(report.readings.len(), 1);
//! assert_eq!(report.readings[0].temperature, Some(22.5));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`extract`] - numeric literal extraction
//! - [`parser`] - line classifier and record parser
//! - [`calibration`] - ADC to concentration mapping
//! - [`threshold`] - banded rubrics
//! - [`composite`] - weighted composite score
//! - [`config`] - configuration bundle (TOML)
//! - [`pipeline`] - parse-then-score batch runs
//! - [`types`] - sensor record types
//! - [`error`] - error taxonomy

pub mod error;
pub mod types;
pub mod extract;
pub mod parser;
pub mod calibration;
pub mod threshold;
pub mod composite;
pub mod config;
pub mod pipeline;

pub use error::{
    ConfigurationError, MissingMetricError, MissingReason, ParseError, SdlogError, SdlogResult,
    TruncatedRecordError,
};
pub use types::{
    ADC_FULL_SCALE, Bank, BankRecord, CHANNELS_PER_BANK, ChannelBank, Field, Metric, SensorReading,
};
pub use extract::extract_number;
pub use parser::{
    BankAliases, LogParser, ParseWarning, ParsedLog, Series, SeriesKey, TruncationPolicy,
    parse_lines, parse_str,
};
pub use calibration::{CalibrationTable, ChannelCalibration};
pub use threshold::{Grade, Rubric, ScoringContext, ThresholdBand, UNCLASSIFIED, classify};
pub use composite::{CompositeScore, CompositeScorer, MetricScore};
pub use config::{ChannelSpec, ConfigBundle, EngineTables};
pub use pipeline::{Pipeline, RunManifest, RunReport, TruncationNote};
