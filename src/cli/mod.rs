use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::conversation::output_filename;
use crate::media::{display_size, ConversionRequest, FitEngine, FitSettings};

#[derive(Parser)]
#[command(name = "sizefit", version, about = "Telegram bot that re-encodes images into a target size range")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Telegram bot.
    Run(RunOpts),
    /// Fit a local image into a size range without Telegram.
    Convert(ConvertOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args)]
pub struct RunOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Overrides the configured bot token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(clap::Args)]
pub struct ConvertOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    pub input: PathBuf,
    /// Size range such as `500KB-1MB`.
    pub range: String,
    /// JPG, JPEG, PNG or WEBP.
    pub format: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}

/// Runs the fitting engine on a local file and writes the result.
///
/// Returns the path written. Without `--output` the file is named like the
/// bot's replies and placed next to the input.
pub fn run_convert(config: &Config, opts: &ConvertOpts) -> Result<PathBuf> {
    let request = ConversionRequest::parse(&format!("{} {}", opts.range, opts.format))?;
    let input = std::fs::read(&opts.input)
        .with_context(|| format!("cannot read '{}'", opts.input.display()))?;
    info!(
        "Converting {} ({}) into {} as {}",
        opts.input.display(),
        display_size(input.len() as u64),
        request.target,
        request.format
    );

    let engine = FitEngine::new(FitSettings::from(&config.fitting));
    let outcome = engine.fit(&input, request.target, request.format)?;

    let output = match &opts.output {
        Some(path) => path.clone(),
        None => default_output(&opts.input, &request.extension),
    };
    std::fs::write(&output, &outcome.bytes)
        .with_context(|| format!("cannot write '{}'", output.display()))?;

    info!(
        "Wrote {} ({}, {} after {} trials)",
        output.display(),
        display_size(outcome.bytes.len() as u64),
        outcome.strategy,
        outcome.trials
    );
    Ok(output)
}

fn default_output(input: &Path, extension: &str) -> PathBuf {
    let name = output_filename(Local::now(), extension);
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
