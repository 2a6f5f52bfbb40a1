//! Terminal rendering of task state.
//!
//! One progress bar per task, driven by registry events; notifications are
//! printed above the bars so they do not tear the display.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;

use arielle_core::Variant;
use arielle_download::{
    DownloadTask, Notification, NotifierPort, TaskEvent, TaskEventEmitterPort, TaskId, TaskStatus,
};

const MAX_LABEL: usize = 32;

struct Inner {
    multi: MultiProgress,
    hidden: bool,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
}

/// Progress bars and notification lines on the terminal.
///
/// Cheap to clone; clones share the same bars.
#[derive(Clone)]
pub struct TerminalRenderer {
    inner: Arc<Inner>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    /// Render to stderr.
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Render to `target`.
    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let hidden = target.is_hidden();
        Self {
            inner: Arc::new(Inner {
                multi: MultiProgress::with_draw_target(target),
                hidden,
                bars: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of bars currently shown.
    pub fn bar_count(&self) -> usize {
        self.inner.bars.lock().len()
    }

    fn render(&self, task: &DownloadTask) {
        let mut bars = self.inner.bars.lock();
        let bar = bars.entry(task.id.clone()).or_insert_with(|| {
            let bar = self.inner.multi.add(ProgressBar::new(100));
            bar.set_style(bar_style());
            bar.set_prefix(truncate_label(&task.display_name));
            bar
        });

        bar.set_position(u64::from(task.progress));
        bar.set_message(status_line(task));

        if task.is_terminal() {
            if let Some(bar) = bars.remove(&task.id) {
                bar.finish();
            }
        }
    }

    fn clear(&self, id: &TaskId) {
        if let Some(bar) = self.inner.bars.lock().remove(id) {
            bar.finish_and_clear();
            self.inner.multi.remove(&bar);
        }
    }

    fn print(&self, line: &str) {
        if self.inner.hidden {
            println!("{line}");
        } else {
            let _ = self.inner.multi.println(line);
        }
    }
}

impl TaskEventEmitterPort for TerminalRenderer {
    fn emit(&self, event: TaskEvent) {
        match event {
            TaskEvent::Updated { task } => self.render(&task),
            TaskEvent::Removed { id } => self.clear(&id),
        }
    }

    fn clone_box(&self) -> Box<dyn TaskEventEmitterPort> {
        Box::new(self.clone())
    }
}

impl NotifierPort for TerminalRenderer {
    fn notify(&self, notification: Notification) {
        self.print(&notification_line(&notification));
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<32.bold} [{bar:28.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Short description of where a task stands.
pub fn status_line(task: &DownloadTask) -> String {
    match task.status {
        TaskStatus::Pending => "queued".to_string(),
        TaskStatus::InProgress => {
            let mut line = task.detail_label.clone();
            if let Some(speed) = task.speed_mbps {
                let _ = write!(line, " @ {speed:.1} MB/s");
            }
            if let Some(eta) = task.eta_sec {
                let _ = write!(line, " ETA {}", format_eta(eta));
            }
            line
        }
        TaskStatus::Done => task
            .path
            .as_ref()
            .map_or_else(|| "done".to_string(), |path| format!("done: {path}")),
        TaskStatus::Error => task
            .error_code
            .map_or_else(|| "failed".to_string(), |code| format!("failed ({code})")),
        TaskStatus::Canceled => "canceled".to_string(),
    }
}

/// Render remaining seconds as `42s`, `3m 05s` or `1h 02m`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_eta(seconds: f64) -> String {
    let total = seconds.max(0.0).ceil() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

fn notification_line(notification: &Notification) -> String {
    let icon = match notification.variant {
        Variant::Success => "✔",
        Variant::Error => "✖",
        Variant::Warning => "⚠",
        Variant::Info => "ℹ",
    };
    let mut line = match &notification.title {
        Some(title) => format!("{icon} {title}: {}", notification.description),
        None => format!("{icon} {}", notification.description),
    };
    if let Some(action) = &notification.action {
        let _ = write!(line, " ({}: {})", action.text, action.target);
    }
    line
}

fn truncate_label(raw: &str) -> String {
    if raw.chars().count() <= MAX_LABEL {
        return raw.to_string();
    }
    let mut buf: String = raw.chars().take(MAX_LABEL - 1).collect();
    buf.push('…');
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use arielle_download::ErrorCode;

    fn task(status: TaskStatus) -> DownloadTask {
        let mut task = DownloadTask::pending("org/model".into(), "Model");
        task.status = status;
        task
    }

    #[test]
    fn test_status_line_in_progress() {
        let mut t = task(TaskStatus::InProgress);
        t.detail_label = "org/model/a.bin".to_string();
        t.speed_mbps = Some(12.34);
        t.eta_sec = Some(65.2);
        assert_eq!(status_line(&t), "org/model/a.bin @ 12.3 MB/s ETA 1m 06s");
    }

    #[test]
    fn test_status_line_terminal_states() {
        let mut done = task(TaskStatus::Done);
        done.path = Some("/models/org/model".to_string());
        assert_eq!(status_line(&done), "done: /models/org/model");

        let mut failed = task(TaskStatus::Error);
        failed.error_code = Some(ErrorCode::AuthRequired);
        assert_eq!(status_line(&failed), "failed (auth-required)");

        assert_eq!(status_line(&task(TaskStatus::Canceled)), "canceled");
        assert_eq!(status_line(&task(TaskStatus::Pending)), "queued");
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(0.0), "0s");
        assert_eq!(format_eta(41.2), "42s");
        assert_eq!(format_eta(185.0), "3m 05s");
        assert_eq!(format_eta(3720.0), "1h 02m");
        assert_eq!(format_eta(-3.0), "0s");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short"), "short");
        let long = "x".repeat(50);
        let label = truncate_label(&long);
        assert_eq!(label.chars().count(), MAX_LABEL);
        assert!(label.ends_with('…'));
    }

    #[test]
    fn test_notification_line_includes_action() {
        let n = Notification::credential_missing(&"org/model".into(), "/settings/huggingface");
        let line = notification_line(&n);
        assert!(line.starts_with('⚠'));
        assert!(line.ends_with("/settings/huggingface)"));
    }

    #[test]
    fn test_bars_follow_task_events() {
        let renderer = TerminalRenderer::with_draw_target(ProgressDrawTarget::hidden());
        let mut t = task(TaskStatus::InProgress);
        renderer.emit(TaskEvent::Updated { task: t.clone() });
        assert_eq!(renderer.bar_count(), 1);

        t.complete(Some("/m".to_string()));
        renderer.emit(TaskEvent::Updated { task: t });
        assert_eq!(renderer.bar_count(), 0);

        renderer.emit(TaskEvent::Updated {
            task: task(TaskStatus::Pending),
        });
        renderer.emit(TaskEvent::Removed {
            id: "org/model".into(),
        });
        assert_eq!(renderer.bar_count(), 0);
    }
}
