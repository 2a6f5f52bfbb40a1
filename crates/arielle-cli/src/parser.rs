//! Main CLI parser and top-level argument handling.

use clap::Parser;

use arielle_download::{DEFAULT_BACKEND_URL, DEFAULT_PUSH_URL};

use crate::commands::Commands;

/// Command-line interface for the Arielle download coordinator.
#[derive(Parser, Debug)]
#[command(name = "arielle")]
#[command(about = "Download models through the Arielle backend and follow their progress")]
#[command(version)]
pub struct Cli {
    /// Backend base URL
    #[arg(
        long = "backend-url",
        env = "ARIELLE_BACKEND_URL",
        default_value = DEFAULT_BACKEND_URL,
        global = true
    )]
    pub backend_url: String,

    /// Socket.IO WebSocket URL of the push channel
    #[arg(
        long = "push-url",
        env = "ARIELLE_PUSH_URL",
        default_value = DEFAULT_PUSH_URL,
        global = true
    )]
    pub push_url: String,

    /// Do not connect to the push channel
    #[arg(long = "no-push", global = true)]
    pub no_push: bool,

    /// Hugging Face token; falls back to the HF_TOKEN environment variable
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Log lines instead of progress bars
    #[arg(long, global = true)]
    pub plain: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "arielle",
            "--backend-url",
            "http://10.0.0.2:8000",
            "--no-push",
            "--plain",
            "watch",
            "org/model",
        ]);
        assert_eq!(cli.backend_url, "http://10.0.0.2:8000");
        assert!(cli.no_push);
        assert!(cli.plain);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::parse_from(["arielle", "download", "org/model", "--token", "hf_x", "-v"]);
        assert_eq!(cli.token.as_deref(), Some("hf_x"));
        assert!(cli.verbose);
    }
}
