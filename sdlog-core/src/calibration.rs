//! ADC to concentration mapping
//!
//! Each calibrated channel maps the raw domain `[0, 65535]` linearly onto
//! `[min, max]`:
//!
//! ```text
//! concentration = min + (raw / 65535) * (max - min)
//! ```
//!
//! Counts outside the converter range are not clamped; they extrapolate so
//! that out-of-range hardware shows up as an out-of-band concentration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::types::{ADC_FULL_SCALE, Bank, CHANNELS_PER_BANK, SensorReading};

/// Linear range of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    pub min: f64,
    pub max: f64,
}

impl ChannelCalibration {
    /// Unconnected channel: every count maps to zero
    pub const NOT_CONNECTED: Self = Self { min: 0.0, max: 0.0 };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `min == max`, the range collapses to a single value
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Concentration for a raw count
    #[inline]
    pub fn concentration(&self, raw: u32) -> f64 {
        if self.is_degenerate() {
            return self.min;
        }
        // Full scale lands on max without rounding drift
        if f64::from(raw) == ADC_FULL_SCALE {
            return self.max;
        }
        self.min + (f64::from(raw) / ADC_FULL_SCALE) * (self.max - self.min)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NamedCalibration {
    name: String,
    calibration: ChannelCalibration,
}

/// Calibrations of both banks, loaded once per run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    channels: [[Option<NamedCalibration>; CHANNELS_PER_BANK]; 2],
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel under a metric name
    pub fn insert(
        &mut self,
        bank: Bank,
        channel: usize,
        name: impl Into<String>,
        calibration: ChannelCalibration,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if channel >= CHANNELS_PER_BANK {
            return Err(ConfigurationError::ChannelOutOfRange(channel));
        }
        if !calibration.is_finite() {
            return Err(ConfigurationError::InvalidCalibration(name));
        }
        if self.find(&name).is_some() {
            return Err(ConfigurationError::DuplicateMetric(name));
        }

        let slot = &mut self.channels[bank.index()][channel];
        if slot.is_some() {
            return Err(ConfigurationError::DuplicateCalibration { bank, channel });
        }
        *slot = Some(NamedCalibration { name, calibration });
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_channel(
        mut self,
        bank: Bank,
        channel: usize,
        name: impl Into<String>,
        calibration: ChannelCalibration,
    ) -> Result<Self, ConfigurationError> {
        self.insert(bank, channel, name, calibration)?;
        Ok(self)
    }

    pub fn get(&self, bank: Bank, channel: usize) -> Option<&ChannelCalibration> {
        self.entry(bank, channel).map(|e| &e.calibration)
    }

    pub fn name(&self, bank: Bank, channel: usize) -> Option<&str> {
        self.entry(bank, channel).map(|e| e.name.as_str())
    }

    /// Channel registered under `name`
    pub fn find(&self, name: &str) -> Option<(Bank, usize)> {
        Bank::ALL.into_iter().find_map(|bank| {
            (0..CHANNELS_PER_BANK)
                .find(|&channel| self.name(bank, channel) == Some(name))
                .map(|channel| (bank, channel))
        })
    }

    pub fn len(&self) -> usize {
        self.channels.iter().flatten().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, bank: Bank, channel: usize) -> Option<&NamedCalibration> {
        self.channels[bank.index()].get(channel)?.as_ref()
    }

    /// Attaches concentrations to every calibrated channel the reading has
    pub fn apply(&self, reading: &mut SensorReading) {
        for bank in Bank::ALL {
            let values = reading.bank_mut(bank);
            for channel in 0..CHANNELS_PER_BANK {
                values.concentration[channel] = match (values.raw[channel], self.get(bank, channel)) {
                    (Some(raw), Some(calibration)) => Some(calibration.concentration(raw)),
                    _ => None,
                };
            }
        }
    }

    pub fn apply_all(&self, readings: &mut [SensorReading]) {
        for reading in readings {
            self.apply(reading);
        }
    }
}
