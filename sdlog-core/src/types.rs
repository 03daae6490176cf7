//! Sensor record types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MissingReason;

/// Channels reported by one ADC bank
pub const CHANNELS_PER_BANK: usize = 4;

/// Full-scale count of the 16-bit converters
pub const ADC_FULL_SCALE: f64 = 65535.0;

/// Scalar fields reported as `<Label>: <value>` lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Temperature,
    Humidity,
    Pressure,
    Gas,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
        Field::Gas,
    ];

    /// Label as written by the logger
    pub fn label(self) -> &'static str {
        match self {
            Field::Temperature => "Temperature",
            Field::Humidity => "Humidity",
            Field::Pressure => "Pressure",
            Field::Gas => "Gas",
        }
    }

    /// Lowercase key used by configuration and exports
    pub fn key(self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
            Field::Gas => "gas",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The two ADC banks carried by the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    A,
    B,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::A, Bank::B];

    pub fn key(self) -> &'static str {
        match self {
            Bank::A => "a",
            Bank::B => "b",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Bank::A => 0,
            Bank::B => 1,
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw counts of one bank group, in channel order
///
/// A slot stays `None` when the log never reported that channel for the
/// group. Values are kept as `u32` so counts above the converter range
/// survive parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRecord {
    pub channels: [Option<u32>; CHANNELS_PER_BANK],
}

impl BankRecord {
    pub fn new(channels: [Option<u32>; CHANNELS_PER_BANK]) -> Self {
        Self { channels }
    }

    /// All four channels present
    pub fn complete(values: [u32; CHANNELS_PER_BANK]) -> Self {
        Self {
            channels: values.map(Some),
        }
    }

    pub fn get(&self, channel: usize) -> Option<u32> {
        self.channels.get(channel).copied().flatten()
    }

    /// Number of channels present
    pub fn received(&self) -> usize {
        self.channels.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.received() == CHANNELS_PER_BANK
    }

    /// Fills absent channels with zero
    pub fn zero_padded(self) -> Self {
        Self {
            channels: self.channels.map(|c| Some(c.unwrap_or(0))),
        }
    }
}

/// Raw counts and derived concentrations of one bank within a reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelBank {
    pub raw: [Option<u32>; CHANNELS_PER_BANK],
    /// Filled by [`CalibrationTable::apply`](crate::CalibrationTable::apply)
    pub concentration: [Option<f64>; CHANNELS_PER_BANK],
}

impl From<BankRecord> for ChannelBank {
    fn from(record: BankRecord) -> Self {
        Self {
            raw: record.channels,
            concentration: [None; CHANNELS_PER_BANK],
        }
    }
}

/// One logical reading, assembled positionally from the parsed sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Position of the reading in the log
    pub index: usize,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// Pressure as logged (hPa)
    pub pressure: Option<f64>,
    /// Gas sensor output as logged
    pub gas: Option<f64>,
    pub bank_a: ChannelBank,
    pub bank_b: ChannelBank,
}

impl SensorReading {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn field(&self, field: Field) -> Option<f64> {
        match field {
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Pressure => self.pressure,
            Field::Gas => self.gas,
        }
    }

    pub fn set_field(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Pressure => &mut self.pressure,
            Field::Gas => &mut self.gas,
        };
        *slot = value;
    }

    pub fn bank(&self, bank: Bank) -> &ChannelBank {
        match bank {
            Bank::A => &self.bank_a,
            Bank::B => &self.bank_b,
        }
    }

    pub fn bank_mut(&mut self, bank: Bank) -> &mut ChannelBank {
        match bank {
            Bank::A => &mut self.bank_a,
            Bank::B => &mut self.bank_b,
        }
    }
}

/// A value a rubric can be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Field(Field),
    /// Calibrated concentration of a bank channel
    Channel { bank: Bank, channel: usize },
}

impl Metric {
    /// Resolves the metric for one reading
    pub fn value_in(&self, reading: &SensorReading) -> Result<f64, MissingReason> {
        let value = match *self {
            Metric::Field(field) => reading.field(field).ok_or(MissingReason::Absent)?,
            Metric::Channel { bank, channel } => {
                let bank = reading.bank(bank);
                match (bank.raw.get(channel).copied().flatten(), bank.concentration.get(channel).copied().flatten()) {
                    (_, Some(concentration)) => concentration,
                    (Some(_), None) => return Err(MissingReason::NotCalibrated),
                    (None, None) => return Err(MissingReason::Absent),
                }
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(MissingReason::NotFinite)
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Field(field) => write!(f, "{field}"),
            Metric::Channel { bank, channel } => write!(f, "{bank}{channel}"),
        }
    }
}
