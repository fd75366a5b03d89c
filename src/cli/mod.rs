//! CLI module for paramguard
//!
//! Provides command-line interface for:
//! - check: validate one payload against a named form
//! - forms: list the registered forms and their fields
//!
//! stdout carries exactly one JSON object per invocation; logs go to stderr.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    capabilities, check, describe_form, evaluate, list_forms, load_config, load_store,
    run_command, CheckOptions,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{
    failure_envelope, read_request, success_envelope, write_error, write_failure, write_response,
};

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "PARAMGUARD_LOG";

/// Install the stderr log subscriber. `PARAMGUARD_LOG` wins over the
/// configured filter.
pub fn init_logging(config: &EngineConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Parse arguments, load configuration and run the command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    let config_path = match &cli.command {
        Command::Check { config, .. } => config.clone(),
        Command::Forms { .. } => None,
    };
    let result = load_config(config_path.as_deref()).and_then(|config| {
        init_logging(&config);
        run_command(cli.command, config)
    });
    if let Err(err) = &result {
        if err.code() != CliErrorCode::Rejected {
            write_error(err)?;
        }
    }
    result
}
