//! Download task model and registry.

mod registry;
mod types;

pub use registry::TaskRegistry;
pub use types::{DownloadTask, ErrorCode, TaskId, TaskStatus};
