//! paramguard CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors are printed to
//! stderr and the process exits non-zero; a rejected payload also exits
//! non-zero after its report was written to stdout.

use paramguard::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
