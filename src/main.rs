//! nbstream CLI entry point
//!
//! Parses arguments, dispatches to the command, prints any error to
//! stderr and exits non-zero on failure. Everything else lives in the
//! library's `cli` module.

use nbstream::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
