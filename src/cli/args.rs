//! CLI argument definitions using clap
//!
//! Commands:
//! - paramguard check --form <name> [--input <path>] [--config <path>] [--fixtures <path>] [--as-user <id>]
//! - paramguard forms [--form <name>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::store::RecordId;

/// paramguard - declarative request parameter validation
#[derive(Parser, Debug)]
#[command(name = "paramguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one JSON payload against a form
    Check {
        /// Name of the form (see `paramguard forms`)
        #[arg(long)]
        form: String,

        /// Payload file; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Path to engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON fixture with the records visible to existence and
        /// uniqueness rules
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Validate as this authenticated user id
        #[arg(long = "as-user")]
        as_user: Option<RecordId>,
    },

    /// List the available forms and their fields
    Forms {
        /// Show a single form
        #[arg(long)]
        form: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from([
            "paramguard",
            "check",
            "--form",
            "create_user",
            "--fixtures",
            "db.json",
            "--as-user",
            "7",
        ])
        .unwrap();
        match cli.command {
            Command::Check {
                form,
                input,
                fixtures,
                as_user,
                ..
            } => {
                assert_eq!(form, "create_user");
                assert!(input.is_none());
                assert_eq!(fixtures, Some(PathBuf::from("db.json")));
                assert_eq!(as_user, Some(7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_requires_form() {
        assert!(Cli::try_parse_from(["paramguard", "check"]).is_err());
    }
}
