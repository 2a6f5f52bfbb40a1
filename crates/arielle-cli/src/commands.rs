//! Subcommands.

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Download a model through the backend
    Download {
        /// Model repository id (e.g. "openai/whisper-small")
        model_id: String,
        /// Label shown while downloading (defaults to the model id)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Follow downloads started elsewhere until they finish
    Watch {
        /// Model ids to follow
        #[arg(required = true)]
        model_ids: Vec<String>,
    },
}
