use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use klash_models::config::KlashConfig;
use klash_models::resolution::{ResolutionFailure, ResolutionRecord};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/klash.toml";

#[derive(Parser, Debug)]
#[command(name = "klash", about = "Resolve prediction markets from reply sentiment")]
struct Cli {
    /// Path to configuration file [default: config/klash.toml, if present]
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a market request and print its resolution record
    Resolve(IoArgs),
    /// Split tweets into teams around a controversy and print the report
    ClassifyTeams(IoArgs),
    /// Summarize the polarity of a JSON array of tweets
    AnalyzeSentiment(IoArgs),
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Read request JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the output record.
    let filter = EnvFilter::from_default_env();
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = load_config(cli.config.as_deref())?;
    let engine = klash::build_engine(&config);

    match cli.command {
        Command::Resolve(io) => {
            let input = read_input(io.input.as_deref())?;
            let record = klash::resolve_input(&engine, &input).await;
            print_json(&record, io.pretty)?;
            Ok(exit_code(&record))
        }
        Command::ClassifyTeams(io) => {
            let input = read_input(io.input.as_deref())?;
            let report = klash::classify_teams_input(&engine, &input).await;
            print_report(report, io.pretty, "Team classification failed")
        }
        Command::AnalyzeSentiment(io) => {
            let input = read_input(io.input.as_deref())?;
            let report = klash::analyze_sentiment_input(&engine, &input).await;
            print_report(report, io.pretty, "Sentiment analysis failed")
        }
    }
}

fn load_config(path: Option<&str>) -> Result<KlashConfig> {
    let path = match path {
        Some(explicit) => explicit,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH,
        None => {
            tracing::debug!("No config file found, using defaults");
            return Ok(KlashConfig::default());
        }
    };

    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

/// Raw input bytes; decoding is left to the library so bad encodings still
/// produce an error record.
fn read_input(path: Option<&str>) -> Result<Vec<u8>> {
    if let Some(path) = path {
        return std::fs::read(path).with_context(|| format!("Failed to read input: {path}"));
    }

    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

fn print_report<T: Serialize>(
    report: Result<T, ResolutionFailure>,
    pretty: bool,
    failure_message: &str,
) -> Result<ExitCode> {
    match report {
        Ok(report) => {
            print_json(&report, pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            tracing::error!(error = %failure.error, "{failure_message}");
            print_json(&ResolutionRecord::Error(failure), pretty)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

fn exit_code(record: &ResolutionRecord) -> ExitCode {
    if record.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
