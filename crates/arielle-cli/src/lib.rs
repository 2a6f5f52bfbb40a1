//! Command-line front end for the Arielle download coordinator.
//!
//! - `parser`, `commands` - clap definitions
//! - `bootstrap` - composition root wiring the real adapters
//! - `handlers` - one module per command
//! - `progress` - terminal rendering of task state

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod progress;

pub use bootstrap::{CliConfig, CliContext, OutputMode, bootstrap};
pub use commands::Commands;
pub use parser::Cli;
