//! CLI module for nbstream
//!
//! Provides command-line interface for:
//! - serve: Run the notebook streaming server
//! - repair: Complete a truncated notebook from a file or stdin
//! - generate: Produce one notebook without serving it

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_state, generate, repair, resolve_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, write_line};
