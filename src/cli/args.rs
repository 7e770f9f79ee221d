//! CLI argument definitions using clap
//!
//! Commands:
//! - nbstream serve [--config <path>] [--port <port>] [--gen-dir <dir>]
//! - nbstream repair [FILE]
//! - nbstream generate <LOCATOR> [--config <path>] [--gen-dir <dir>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// nbstream - Stream generated notebooks as progressively rendered HTML
#[derive(Parser, Debug)]
#[command(name = "nbstream")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Directory for session artifacts (overrides config)
        #[arg(long)]
        gen_dir: Option<PathBuf>,
    },

    /// Complete a truncated notebook and print it; exits non-zero when
    /// the input was not already a complete document
    Repair {
        /// Notebook prefix to repair (stdin when omitted)
        input: Option<PathBuf>,
    },

    /// Generate one notebook and print the path of the final document
    Generate {
        /// Resource locator (path plus query) to generate for
        locator: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for session artifacts (overrides config)
        #[arg(long)]
        gen_dir: Option<PathBuf>,
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
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["nbstream", "serve", "--port", "9000", "--gen-dir", "/tmp/nb"])
            .unwrap();
        match cli.command {
            Command::Serve {
                config,
                port,
                gen_dir,
            } => {
                assert!(config.is_none());
                assert_eq!(port, Some(9000));
                assert_eq!(gen_dir, Some(PathBuf::from("/tmp/nb")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_repair_reads_stdin_by_default() {
        let cli = Cli::try_parse_from(["nbstream", "repair"]).unwrap();
        assert!(matches!(cli.command, Command::Repair { input: None }));
    }

    #[test]
    fn test_generate_requires_locator() {
        assert!(Cli::try_parse_from(["nbstream", "generate"]).is_err());
        let cli = Cli::try_parse_from(["nbstream", "generate", "/topic?x=1"]).unwrap();
        assert!(matches!(cli.command, Command::Generate { ref locator, .. } if locator == "/topic?x=1"));
    }
}
