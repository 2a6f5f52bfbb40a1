//! Watch command handler.
//!
//! Follows downloads started by another client (e.g. the desktop app). Each
//! model id is registered with a transfer that only waits, so the task's
//! progress comes entirely from the push channel.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use arielle_download::{
    DownloadTask, TaskId, TaskRequest, TransferContext, TransferError, TransferOperation,
    transfer_fn,
};

use crate::bootstrap::CliContext;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Execute the watch command.
pub async fn execute(ctx: &CliContext, model_ids: &[String]) -> Result<()> {
    if !ctx.has_push_channel() {
        bail!("watch needs the push channel; remove --no-push");
    }

    let ids: Vec<TaskId> = model_ids.iter().map(|id| TaskId::new(id.as_str())).collect();
    for id in &ids {
        ctx.coordinator
            .create_task(TaskRequest::new(id.clone(), id.to_string(), follow()))
            .map_err(|err| anyhow!(err.user_message()))?;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let push_stopped = ctx.push_stopped();
    tokio::pin!(push_stopped);
    let mut tick = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if all_settled(&ctx.coordinator.snapshot(), &ids) {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                println!("Stopped watching; downloads keep running on the backend.");
                return Ok(());
            }
            result = &mut push_stopped => {
                // Without the channel no further progress can arrive
                return match result {
                    Ok(()) => Err(anyhow!("Push channel closed before the downloads finished")),
                    Err(err) => Err(anyhow!(err).context("Lost the push channel while watching")),
                };
            }
        }
    }

    println!("All {} download(s) finished.", ids.len());
    Ok(())
}

/// Transfer that never reports anything and ends only when cancelled.
fn follow() -> impl TransferOperation + 'static {
    transfer_fn(|ctx: TransferContext| async move {
        ctx.cancelled().await;
        Err::<String, _>(TransferError::cancelled("stopped watching"))
    })
}

/// Whether every watched id has reached a terminal state.
fn all_settled(tasks: &[DownloadTask], ids: &[TaskId]) -> bool {
    ids.iter().all(|id| {
        tasks
            .iter()
            .find(|task| &task.id == id)
            .is_some_and(|task| task.status.is_terminal())
    })
}
