//! Download command handler.

use anyhow::{Result, anyhow, bail};

use arielle_download::{DownloadTask, HttpTransfer, TaskRequest, TaskStatus};

use crate::bootstrap::CliContext;

/// Execute the download command.
///
/// Ctrl-C cancels the transfer (locally and on the backend) and waits for the
/// task to settle.
pub async fn execute(ctx: &CliContext, model_id: &str, name: Option<&str>) -> Result<()> {
    let transfer = HttpTransfer::new(ctx.backend.clone());
    let request = TaskRequest::new(model_id, name.unwrap_or(model_id), transfer);
    let run = ctx
        .coordinator
        .create_task(request)
        .map_err(|err| anyhow!(err.user_message()))?;
    let id = run.id().clone();

    let wait = run.wait();
    tokio::pin!(wait);

    let settled = tokio::select! {
        task = &mut wait => task,
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                tracing::warn!(error = %err, "Could not listen for Ctrl-C");
            }
            if !ctx.coordinator.cancel(&id) {
                // Not started yet: nothing to cancel, drop it instead.
                ctx.coordinator.remove_task(&id);
            }
            wait.await
        }
    };

    let task = settled.ok_or_else(|| anyhow!("Download of {id} was interrupted"))?;
    println!("{}", summarize(&task)?);
    Ok(())
}

/// One-line result for a settled task, or an error for anything but `done`.
fn summarize(task: &DownloadTask) -> Result<String> {
    match task.status {
        TaskStatus::Done => Ok(task.path.as_ref().map_or_else(
            || format!("Downloaded {}", task.id),
            |path| format!("Downloaded {} to {path}", task.id),
        )),
        TaskStatus::Canceled => bail!("Download of {} was canceled", task.id),
        TaskStatus::Error => match task.error_code {
            Some(code) => bail!("Download of {} failed ({code})", task.id),
            None => bail!("Download of {} failed", task.id),
        },
        TaskStatus::Pending | TaskStatus::InProgress => {
            bail!("Download of {} did not finish", task.id)
        }
    }
}
