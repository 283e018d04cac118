use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, info};
use sheetscript::{SavedStep, StepError, StepHistory, config::Config};

/// Replay a saved spreadsheet analysis and print the equivalent pandas code
#[derive(Debug, Parser)]
#[command(name = "sheetscript", version, about, long_about = LONG_ABOUT)]
struct Cli {
    /// Saved analysis: a JSON list of steps
    analysis: PathBuf,

    /// Write the generated code to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (defaults to sheetscript.toml, then the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit one chunk per step without combining adjacent chunks
    #[arg(long)]
    no_optimize: bool,

    /// Leave out the description comment above each chunk
    #[arg(long)]
    no_comments: bool,

    /// Fail if the generated code is not valid Python
    #[arg(long)]
    check: bool,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const LONG_ABOUT: &str = "Replay a saved spreadsheet analysis and print the equivalent pandas code.

No importers are registered on the command line, so analyses containing \
user_defined_import steps fail to replay. Replay those through the library \
with the importers registered on the StepHistory.";

const NO_CLI_IMPORTERS: &str =
    "The command line has no importers; replay this analysis through the library instead.";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.no_optimize {
        config.optimize = false;
    }
    if cli.no_comments {
        config.description_comments = false;
    }
    if cli.check {
        config.validate_syntax = true;
    }
    debug!("Using configuration: {config:?}");

    let content = fs::read_to_string(&cli.analysis)
        .with_context(|| format!("Failed to read analysis {}", cli.analysis.display()))?;
    let saved_steps: Vec<SavedStep> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse analysis {}", cli.analysis.display()))?;

    let mut history = StepHistory::default();
    history.replay(&saved_steps).map_err(|err| {
        let mut message = err.to_string();
        if let StepError::StepExecution {
            step_type, params, ..
        } = &err
        {
            message = format!("{step_type} step failed: {message}\n  params: {params}");
        }
        if let Some(hint) = err.to_fix() {
            message.push('\n');
            message.push_str(hint);
        }
        if matches!(err.root(), StepError::UnknownImporter { .. }) {
            message.push('\n');
            message.push_str(NO_CLI_IMPORTERS);
        }
        anyhow!(message)
    })?;
    info!("Replayed {} steps", history.len());

    let program = history.transpile(&config)?;
    if config.validate_syntax {
        program.validate()?;
    }

    match &cli.output {
        Some(path) => {
            fs::write(path, program.to_code())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote generated code to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(program.to_code().as_bytes())
                .context("Failed to write generated code to stdout")?;
        }
    }

    Ok(())
}
