use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use human_panic::setup_panic;
use log::debug;

use crate::helpers::logging;

/// Common entry point of the binaries: loads `.env`, parses the CLI, starts logging and a
/// Tokio runtime, then runs `fn_run` inside that runtime.
pub fn run<CliType>(
    fn_cli_parse: fn() -> CliType,
    fn_extract_logging: fn(&CliType) -> &logging::Params,
    fn_run: fn(CliType) -> Result<()>,
) -> Result<()> {
    setup_panic!();
    // parsed after loading, so that `env = ...` args can come from the file
    let env_file = load_env_file()?;

    let cli = fn_cli_parse();
    let logger_handle = logging::configure_from(fn_extract_logging(&cli))?;
    match env_file {
        Some(path) => debug!("Loaded environment from {:?}", path),
        None => debug!("No `.env` file found (recursively), using process environment only"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "Failed to start Tokio runtime")?;
    let _guard = runtime.enter();

    let command_result = fn_run(cli);

    debug!("Waiting up to 5 seconds for remaining tasks to finish");
    runtime.shutdown_timeout(Duration::from_secs(5));

    // Important with non-direct write mode
    // Handle needs to be kept alive until end of program
    logger_handle.flush();

    command_result
}

fn load_env_file() -> Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(env_err) if env_err.not_found() => Ok(None),
        Err(env_err) => Err(env_err).with_context(|| "Failed to load `.env` file"),
    }
}
