//! Merging push-channel events into task state.
//!
//! `reconcile` is a pure reducer over one task: it takes the current snapshot
//! (if any) and one event and returns what the registry should store next.
//!
//! Progress is the furthest known overall percentage for the task. It never
//! rewinds: `start` only relabels, `chunk` applies only strictly higher
//! values, and `end` takes the maximum with the file-count percentage.
//! Terminal tasks ignore phase events. `complete` is authoritative and always
//! lands the task in `done`, even after a local `error` or `canceled`.

use crate::progress::BYTES_PER_MB;
use crate::push::{CompleteEvent, Phase, ProgressEvent, PushEvent};
use crate::task::{DownloadTask, TaskStatus};

/// Outcome of reconciling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Nothing to store.
    Unchanged,
    /// Store the new snapshot; no status transition worth announcing.
    Updated(DownloadTask),
    /// The task transitioned into `done`.
    Completed(DownloadTask),
    /// A `complete` arrived for an unknown task; a terminal task was created.
    Recovered(DownloadTask),
}

impl Reconciled {
    /// The snapshot to store, if any.
    #[must_use]
    pub const fn task(&self) -> Option<&DownloadTask> {
        match self {
            Self::Unchanged => None,
            Self::Updated(t) | Self::Completed(t) | Self::Recovered(t) => Some(t),
        }
    }

    /// Whether this outcome should produce a completion notification.
    #[must_use]
    pub const fn is_completion(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Recovered(_))
    }
}

/// Reduce one event against the current task snapshot.
#[must_use]
pub fn reconcile(current: Option<&DownloadTask>, event: &PushEvent) -> Reconciled {
    match event {
        PushEvent::Progress(progress) => match current {
            Some(task) if !task.is_terminal() => reconcile_phase(task, progress),
            _ => Reconciled::Unchanged,
        },
        PushEvent::Complete(complete) => reconcile_complete(current, complete),
    }
}

fn reconcile_phase(task: &DownloadTask, event: &ProgressEvent) -> Reconciled {
    match event.phase {
        Phase::Start => {
            let Some(label) = event.detail_label() else {
                return Reconciled::Unchanged;
            };
            let mut next = task.clone();
            next.detail_label = label;
            Reconciled::Updated(next)
        }
        Phase::Chunk => reconcile_chunk(task, event),
        Phase::End => reconcile_end(task, event),
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn reconcile_chunk(task: &DownloadTask, event: &ProgressEvent) -> Reconciled {
    let (Some(loaded), Some(total)) = (event.loaded, event.total_bytes) else {
        return Reconciled::Unchanged;
    };
    if total == 0 {
        return Reconciled::Unchanged;
    }

    let percent = (loaded as f64 / total as f64 * 100.0).round().clamp(0.0, 100.0) as u8;
    if percent <= task.progress {
        return Reconciled::Unchanged;
    }

    let mut next = task.clone();
    if let Some(label) = event.detail_label() {
        next.detail_label = label;
    }
    next.progress = percent;
    next.status = TaskStatus::InProgress;
    Reconciled::Updated(next)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn reconcile_end(task: &DownloadTask, event: &ProgressEvent) -> Reconciled {
    let (Some(index), Some(total), Some(size_bytes), Some(speed)) =
        (event.index, event.total, event.size_bytes, event.speed_mbps)
    else {
        return Reconciled::Unchanged;
    };
    if total == 0 {
        return Reconciled::Unchanged;
    }

    let percent = (f64::from(index) / f64::from(total) * 100.0)
        .round()
        .clamp(0.0, 100.0) as u8;
    let file_mb = size_bytes as f64 / BYTES_PER_MB;
    let remaining_files = total.saturating_sub(index);

    let mut next = task.clone();
    if let Some(label) = event.detail_label() {
        next.detail_label = label;
    }
    next.raise_progress(percent);

    if percent >= 100 {
        next.complete(None);
        return Reconciled::Completed(next);
    }

    next.status = TaskStatus::InProgress;
    next.speed_mbps = Some(speed);
    next.eta_sec = (speed.is_finite() && speed > 0.0)
        .then(|| (f64::from(remaining_files) * file_mb / speed).ceil());
    Reconciled::Updated(next)
}

#[allow(clippy::cast_precision_loss)]
fn reconcile_complete(current: Option<&DownloadTask>, event: &CompleteEvent) -> Reconciled {
    let size_mb = event.total_size_bytes as f64 / BYTES_PER_MB;

    let Some(task) = current else {
        let mut recovered = DownloadTask::pending(event.task_id.clone(), event.task_id.as_str());
        recovered.complete(Some(event.path.clone()));
        recovered.size_mb = Some(size_mb);
        return Reconciled::Recovered(recovered);
    };

    let already_done = task.status == TaskStatus::Done;
    let mut next = task.clone();
    next.complete(Some(event.path.clone()));
    next.size_mb = Some(task.size_mb.unwrap_or(0.0).max(size_mb));

    if already_done {
        Reconciled::Updated(next)
    } else {
        Reconciled::Completed(next)
    }
}
