//! Command handlers.
//!
//! Handlers follow the pattern `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`:
//! they build requests, drive the coordinator, and report the outcome.

pub mod download;
pub mod watch;
