use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use flexi_logger::{colored_default_format, Logger, LoggerHandle, WriteMode};
use log::Level;

#[derive(Args)]
#[derive(Debug)]
#[group(id = "logging")]
pub struct Params {
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// flexi_logger spec file (TOML) to configure log levels per module, e.g. `cidr_crab::shuffle = "trace"`.
    /// Overrides -v/-q and RUST_LOG. The file is watched and can be changed while running.
    #[arg(long, value_name = "TOML FILE", env = "CIDR_BUDDY_LOG_SPEC", global = true)]
    log_spec_file: Option<PathBuf>,
}

/// Starts the logger. Logs go to stderr, since stdout carries the results.
pub fn configure_from(params: &Params) -> Result<LoggerHandle> {
    // log_level() returns None iff verbosity < 0, i.e. being most quiet seems reasonable
    let cli_level = params.verbose.log_level()
        .unwrap_or(Level::Error);

    let log_builder = Logger::try_with_env_or_str(cli_level.to_string())
        .context("Failed to parse log level from env RUST_LOG or -v/-q")?
        .log_to_stderr()
        .write_mode(WriteMode::Async)
        .format_for_stderr(colored_default_format);

    match &params.log_spec_file {
        Some(specfile_path) => log_builder
            .start_with_specfile(specfile_path)
            .with_context(|| format!("Failed to start logger with spec file {:?}", specfile_path)),
        None => log_builder
            .start().context("Failed to start logger")
    }
}
