//! sdlog - SD logger capture tools
//! Splits captures into per-field CSV files and scores air quality readings

mod export;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sdlog_core::{ConfigBundle, Pipeline, ScoringContext, TruncationNote, TruncationPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sdlog")]
#[command(author = "Silvano Neto <dev@silvanoneto.com>")]
#[command(version)]
#[command(about = "Parse, calibrate and score environmental logger captures", long_about = None)]
struct Cli {
    /// Configuration file (TOML); built-in defaults when absent
    #[arg(short, long, global = true, env = "SDLOG_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one CSV per field and bank channel
    Split {
        /// Logger capture
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },

    /// Calibrate and score every reading
    Score {
        /// Logger capture
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Use night bands for day/night rubrics
        #[arg(long)]
        night: bool,

        /// Keep a truncated final bank group, zero-filling missing channels
        #[arg(long)]
        zero_pad: bool,
    },

    /// Validate and print the effective configuration
    Config,

    /// Show supported log grammar
    Info,
}

fn main() {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Split { log, output } => split_command(cli.config.as_deref(), &log, &output),
        Commands::Score {
            log,
            output,
            night,
            zero_pad,
        } => score_command(cli.config.as_deref(), &log, &output, night, zero_pad),
        Commands::Config => config_command(cli.config.as_deref()),
        Commands::Info => {
            print_info();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "sdlog=debug,sdlog_core=debug"
    } else {
        "sdlog=info,sdlog_core=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<ConfigBundle> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            Ok(ConfigBundle::from_file(path)?)
        }
        None => Ok(ConfigBundle::default()),
    }
}

fn load_pipeline(config: Option<&Path>) -> Result<Pipeline> {
    let bundle = load_config(config)?;
    Pipeline::from_config(&bundle).context("invalid configuration")
}

/// Reads a capture, replacing invalid UTF-8 so corrupted lines reach the
/// parser and come back as warnings
fn read_log(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), "capture contains invalid UTF-8");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(text)
}

fn report_truncation(note: &TruncationNote) {
    eprintln!("{} {}", "warning:".yellow().bold(), note.message);
}

// ============================================================================
// Commands
// ============================================================================

fn split_command(config: Option<&Path>, log: &Path, output: &Path) -> Result<()> {
    let pipeline = load_pipeline(config)?;
    let text = read_log(log)?;

    let (parsed, truncated) = pipeline.parse(text.lines(), TruncationPolicy::Discard);
    if let Some(note) = &truncated {
        report_truncation(note);
    }

    let written = export::write_split(output, &parsed.series(), pipeline.aliases())?;

    println!(
        "{} {} lines, {} warnings",
        "Parsed".green().bold(),
        parsed.lines_read,
        parsed.warnings.len()
    );
    for path in &written {
        println!("{} {}", "   Wrote".green().bold(), path.display().to_string().cyan());
    }
    Ok(())
}

fn score_command(
    config: Option<&Path>,
    log: &Path,
    output: &Path,
    night: bool,
    zero_pad: bool,
) -> Result<()> {
    let pipeline = load_pipeline(config)?;
    let text = read_log(log)?;

    let policy = if zero_pad {
        TruncationPolicy::ZeroPad
    } else {
        TruncationPolicy::Discard
    };
    let report = pipeline.run(text.lines(), ScoringContext::new(!night), policy);
    if let Some(note) = &report.manifest.truncated {
        report_truncation(note);
    }

    fs::create_dir_all(output).with_context(|| format!("failed to create {}", output.display()))?;
    let readings = output.join("readings.csv");
    let scores = output.join("scores.csv");
    let manifest = output.join("manifest.json");
    export::write_readings(&readings, &report)?;
    export::write_scores(&scores, &report)?;
    export::write_manifest(&manifest, &report)?;

    let m = &report.manifest;
    println!(
        "{} {} readings from {} lines ({} scored, {} failed, {} warnings)",
        "Scored".green().bold(),
        m.readings,
        m.lines_read,
        m.scored,
        m.failed_rows.len(),
        m.warnings.len()
    );
    for path in [&readings, &scores, &manifest] {
        println!("{} {}", "   Wrote".green().bold(), path.display().to_string().cyan());
    }
    Ok(())
}

fn config_command(config: Option<&Path>) -> Result<()> {
    let bundle = load_config(config)?;
    bundle.validate().context("invalid configuration")?;
    print!("{}", bundle.to_toml_string()?);
    Ok(())
}

fn print_info() {
    println!("{} {}", "sdlog".bold(), env!("CARGO_PKG_VERSION"));
    println!();
    println!("{}", "Log grammar:".bold());
    println!("  Temperature: <number>[unit]");
    println!("  Humidity: <number>[unit]");
    println!("  Pressure: <number>[unit]");
    println!("  Gas: <number>[unit]");
    println!("  <Bank> Values:                   followed by 4 lines `Channel <0-3>: <count>`");
    println!("  <Bank> Channel <0-3>: <count>    inline form");
    println!();
    println!("{}", "Banks:".bold());
    let aliases = ConfigBundle::default().banks;
    println!("  A  {}", aliases.a.join(", "));
    println!("  B  {}", aliases.b.join(", "));
    println!();
    println!("{}", "Commands:".bold());
    println!("  sdlog split capture.txt -o out/          # Per-field CSV files");
    println!("  sdlog score capture.txt -o out/          # Readings, scores and manifest");
    println!("  sdlog score capture.txt --night          # Night bands");
    println!("  sdlog config --config sdlog.toml         # Validate configuration");
}
