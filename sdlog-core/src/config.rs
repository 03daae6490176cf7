//! Configuration bundle (TOML)
//!
//! Bank aliases, channel calibrations, rubrics and weights in one file:
//!
//! ```toml
//! [banks]
//! a = ["ADC72", "ADC1"]
//! b = ["ADC73", "ADC2"]
//!
//! [[channels]]
//! name = "co"
//! bank = "a"
//! channel = 0
//! min = 0.0
//! max = 1000.0
//!
//! [weights]
//! co = 0.5
//! humidity = 0.5
//!
//! [rubrics.humidity]
//! bands = [{ low = 30.0, high = 60.0, label = "Green", score = 10.0 }]
//!
//! [rubrics.co]
//! bands = [{ low = -inf, high = 9.0, label = "Green", score = 10.0 }]
//! ```
//!
//! Temperature-style rubrics use `day = [...]` and `night = [...]` instead
//! of `bands`. Metric names are the scalar field keys (`temperature`,
//! `humidity`, `pressure`, `gas`) or a calibrated channel's `name`.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{CalibrationTable, ChannelCalibration};
use crate::composite::CompositeScorer;
use crate::error::ConfigurationError;
use crate::parser::BankAliases;
use crate::threshold::{Rubric, ThresholdBand};
use crate::types::{Bank, Field, Metric};

const INF: f64 = f64::INFINITY;

/// Calibration entry of one bank channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Metric name the channel is scored under
    pub name: String,
    pub bank: Bank,
    pub channel: usize,
    pub min: f64,
    pub max: f64,
}

impl ChannelSpec {
    pub fn new(name: &str, bank: Bank, channel: usize, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            bank,
            channel,
            min,
            max,
        }
    }
}

/// Everything a run needs besides the log itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBundle {
    #[serde(default)]
    pub banks: BankAliases,

    #[serde(default)]
    pub channels: Vec<ChannelSpec>,

    /// Sorted by name; breakdowns follow this order
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    #[serde(default)]
    pub rubrics: BTreeMap<String, Rubric>,
}

/// Validated, immutable tables compiled from a [`ConfigBundle`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineTables {
    pub aliases: BankAliases,
    pub calibration: CalibrationTable,
    pub scorer: CompositeScorer,
}

impl FromStr for ConfigBundle {
    type Err = ConfigurationError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }
}

impl ConfigBundle {
    /// Load a bundle from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        content.parse()
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::Serialize(e.to_string()))
    }

    /// Checks every table and compiles it for a run
    pub fn compile(&self) -> Result<EngineTables, ConfigurationError> {
        self.banks.validate()?;

        let mut calibration = CalibrationTable::new();
        for spec in &self.channels {
            if Field::from_key(&spec.name).is_some() {
                return Err(ConfigurationError::DuplicateMetric(spec.name.clone()));
            }
            calibration.insert(
                spec.bank,
                spec.channel,
                spec.name.as_str(),
                ChannelCalibration::new(spec.min, spec.max),
            )?;
        }

        for (name, rubric) in &self.rubrics {
            resolve_metric(name, &calibration)?;
            rubric.validate(name)?;
        }

        let mut scorer = CompositeScorer::new();
        for (name, &weight) in &self.weights {
            let metric = resolve_metric(name, &calibration)?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigurationError::InvalidWeight {
                    metric: name.clone(),
                    weight,
                });
            }
            let rubric = self
                .rubrics
                .get(name)
                .ok_or_else(|| ConfigurationError::MissingRubric(name.clone()))?;
            scorer.push(name.as_str(), metric, weight, rubric.clone());
        }

        debug!(
            channels = calibration.len(),
            rubrics = self.rubrics.len(),
            weighted = scorer.len(),
            "configuration compiled"
        );

        Ok(EngineTables {
            aliases: self.banks.clone(),
            calibration,
            scorer,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.compile().map(|_| ())
    }
}

fn resolve_metric(name: &str, calibration: &CalibrationTable) -> Result<Metric, ConfigurationError> {
    Field::from_key(name)
        .map(Metric::Field)
        .or_else(|| {
            calibration
                .find(name)
                .map(|(bank, channel)| Metric::Channel { bank, channel })
        })
        .ok_or_else(|| ConfigurationError::UnknownMetric(name.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEFAULT BUNDLE
// ═══════════════════════════════════════════════════════════════════════════════

fn band(low: f64, high: f64, label: &str, score: f64) -> ThresholdBand {
    ThresholdBand::new(low, high, label, score)
}

fn default_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec::new("co", Bank::A, 0, 0.0, 1000.0),
        ChannelSpec::new("no2", Bank::A, 1, 0.0, 20.0),
        ChannelSpec::new("o3", Bank::A, 2, 0.0, 20.0),
        ChannelSpec::new("so2", Bank::A, 3, 0.0, 20.0),
        ChannelSpec::new("nh3", Bank::B, 0, 0.0, 100.0),
        ChannelSpec::new("h2s", Bank::B, 1, 0.0, 100.0),
        ChannelSpec::new("b2", Bank::B, 2, 0.0, 0.0),
        ChannelSpec::new("b3", Bank::B, 3, 0.0, 0.0),
    ]
}

fn default_rubrics() -> BTreeMap<String, Rubric> {
    let mut rubrics = BTreeMap::new();

    rubrics.insert(
        "temperature".to_string(),
        Rubric::day_night(
            vec![
                band(20.0, 26.0, "Green", 10.0),
                band(16.0, 30.0, "Yellow", 6.0),
                band(10.0, 35.0, "Orange", 3.0),
                band(-INF, INF, "Red", 1.0),
            ],
            vec![
                band(16.0, 22.0, "Green", 10.0),
                band(12.0, 26.0, "Yellow", 6.0),
                band(5.0, 30.0, "Orange", 3.0),
                band(-INF, INF, "Red", 1.0),
            ],
        ),
    );
    rubrics.insert(
        "humidity".to_string(),
        Rubric::fixed(vec![
            band(30.0, 60.0, "Green", 10.0),
            band(20.0, 70.0, "Yellow", 6.0),
            band(10.0, 80.0, "Orange", 3.0),
            band(-INF, INF, "Red", 1.0),
        ]),
    );
    rubrics.insert(
        "pressure".to_string(),
        Rubric::fixed(vec![
            band(1000.0, 1030.0, "Green", 10.0),
            band(980.0, 1045.0, "Yellow", 6.0),
            band(-INF, INF, "Orange", 3.0),
        ]),
    );
    rubrics.insert(
        "gas".to_string(),
        Rubric::fixed(vec![
            band(50.0, INF, "Green", 10.0),
            band(20.0, 50.0, "Yellow", 6.0),
            band(10.0, 20.0, "Orange", 3.0),
            band(-INF, 10.0, "Red", 1.0),
        ]),
    );
    rubrics.insert(
        "co".to_string(),
        Rubric::fixed(vec![
            band(-INF, 9.0, "Green", 10.0),
            band(9.0, 35.0, "Yellow", 6.0),
            band(35.0, 200.0, "Orange", 3.0),
            band(200.0, INF, "Red", 1.0),
        ]),
    );
    rubrics.insert(
        "no2".to_string(),
        Rubric::fixed(vec![
            band(-INF, 0.1, "Green", 10.0),
            band(0.1, 1.0, "Yellow", 6.0),
            band(1.0, 5.0, "Orange", 3.0),
            band(5.0, INF, "Red", 1.0),
        ]),
    );
    rubrics.insert(
        "o3".to_string(),
        Rubric::fixed(vec![
            band(-INF, 0.07, "Green", 10.0),
            band(0.07, 0.2, "Yellow", 6.0),
            band(0.2, 1.0, "Orange", 3.0),
            band(1.0, INF, "Red", 1.0),
        ]),
    );
    rubrics.insert(
        "so2".to_string(),
        Rubric::fixed(vec![
            band(-INF, 0.5, "Green", 10.0),
            band(0.5, 2.0, "Yellow", 6.0),
            band(2.0, 5.0, "Orange", 3.0),
            band(5.0, INF, "Red", 1.0),
        ]),
    );

    rubrics
}

fn default_weights() -> BTreeMap<String, f64> {
    [
        ("temperature", 0.15),
        ("humidity", 0.15),
        ("pressure", 0.05),
        ("gas", 0.15),
        ("co", 0.2),
        ("no2", 0.15),
        ("o3", 0.1),
        ("so2", 0.05),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect()
}

impl Default for ConfigBundle {
    /// Sample deployment: four gas sensors on bank A, two on bank B and two
    /// unconnected bank B channels
    fn default() -> Self {
        Self {
            banks: BankAliases::default(),
            channels: default_channels(),
            weights: default_weights(),
            rubrics: default_rubrics(),
        }
    }
}
