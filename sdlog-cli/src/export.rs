//! CSV and JSON writers for run outputs
//!
//! Tables hold only numbers and fixed identifiers, so CSV needs no quoting.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sdlog_core::{BankAliases, CHANNELS_PER_BANK, Bank, Field, RunReport, Series, SeriesKey};

/// Marker written for an absent cell
pub const MISSING: &str = "missing";

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// File name of one split series: `temperature_data.csv`, `adc72_channel_0.csv`
pub fn split_file_name(key: &SeriesKey, aliases: &BankAliases) -> String {
    match key {
        SeriesKey::Field(field) => format!("{}_data.csv", field.key()),
        SeriesKey::Channel { bank, channel } => {
            format!("{}_channel_{channel}.csv", aliases.primary(*bank).to_lowercase())
        }
    }
}

/// Writes one single-column CSV per series, returning the paths written
pub fn write_split(dir: &Path, series: &[Series], aliases: &BankAliases) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(series.len());
    for s in series {
        let path = dir.join(split_file_name(&s.key, aliases));
        let mut out = create(&path)?;
        writeln!(out, "value")?;
        for value in &s.values {
            writeln!(out, "{value}")?;
        }
        out.flush()?;
        written.push(path);
    }
    Ok(written)
}

fn readings_header() -> String {
    let mut columns = vec!["reading".to_string()];
    columns.extend(Field::ALL.iter().map(|f| f.key().to_string()));
    for bank in Bank::ALL {
        for channel in 0..CHANNELS_PER_BANK {
            columns.push(format!("{bank}{channel}_raw"));
        }
        for channel in 0..CHANNELS_PER_BANK {
            columns.push(format!("{bank}{channel}_concentration"));
        }
    }
    columns.join(",")
}

/// One row per reading: scalar fields, then raw and calibrated channels
pub fn write_readings(path: &Path, report: &RunReport) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "{}", readings_header())?;

    for reading in &report.readings {
        let mut row = vec![reading.index.to_string()];
        row.extend(Field::ALL.iter().map(|&f| cell(reading.field(f))));
        for bank in Bank::ALL {
            let values = reading.bank(bank);
            row.extend(values.raw.iter().map(|raw| cell(raw.map(f64::from))));
            row.extend(values.concentration.iter().map(|&c| cell(c)));
        }
        writeln!(out, "{}", row.join(","))?;
    }

    out.flush()?;
    Ok(())
}

/// `reading,score`, with [`MISSING`] for rows that could not be scored
pub fn write_scores(path: &Path, report: &RunReport) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "reading,score")?;
    for (index, score) in report.scores.iter().enumerate() {
        writeln!(out, "{index},{}", cell(score.as_ref().map(|s| s.total)))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_manifest(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&report.manifest)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
