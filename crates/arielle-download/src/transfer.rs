//! Transfer operations driven by the coordinator.
//!
//! An operation performs one attempt of a task's transfer. It reports byte
//! samples through its context, watches the context's cancellation token, and
//! resolves to the final artifact path.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use arielle_core::{TaskId, TransferError};

/// Callback receiving `(loaded, total)` byte samples.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Everything one attempt needs from the coordinator.
#[derive(Clone)]
pub struct TransferContext {
    id: TaskId,
    token: Option<String>,
    cancel: CancellationToken,
    progress: ProgressFn,
}

impl TransferContext {
    /// Create a context.
    pub fn new(
        id: TaskId,
        token: Option<String>,
        cancel: CancellationToken,
        progress: ProgressFn,
    ) -> Self {
        Self {
            id,
            token,
            cancel,
            progress,
        }
    }

    /// Task being transferred.
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Credential to attach to the request, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The attempt's cancellation token.
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the attempt was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the attempt is asked to stop.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Report a byte sample.
    ///
    /// `loaded` should not decrease within one attempt.
    pub fn report(&self, loaded: u64, total: u64) {
        (self.progress)(loaded, total);
    }
}

impl fmt::Debug for TransferContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferContext")
            .field("id", &self.id)
            .field("has_token", &self.token.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// One attempt of a task's transfer.
#[async_trait]
pub trait TransferOperation: Send + Sync {
    /// Run the attempt and return the final artifact path.
    ///
    /// Must fail with [`TransferError::Cancelled`] once the context's token
    /// fires.
    async fn run(&self, ctx: TransferContext) -> Result<String, TransferError>;
}

/// Adapter turning an async closure into a [`TransferOperation`].
pub struct FnTransfer<F> {
    f: F,
}

impl<F, Fut> FnTransfer<F>
where
    F: Fn(TransferContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, TransferError>> + Send,
{
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TransferOperation for FnTransfer<F>
where
    F: Fn(TransferContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, TransferError>> + Send,
{
    async fn run(&self, ctx: TransferContext) -> Result<String, TransferError> {
        (self.f)(ctx).await
    }
}

/// Shorthand for [`FnTransfer::new`].
pub const fn transfer_fn<F, Fut>(f: F) -> FnTransfer<F>
where
    F: Fn(TransferContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, TransferError>> + Send,
{
    FnTransfer::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_fn_transfer_reports_progress() {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);
        let ctx = TransferContext::new(
            "m1".into(),
            Some("hf_x".into()),
            CancellationToken::new(),
            Arc::new(move |loaded, total| sink.lock().push((loaded, total))),
        );

        let op = transfer_fn(|ctx: TransferContext| async move {
            assert_eq!(ctx.token(), Some("hf_x"));
            ctx.report(5, 10);
            ctx.report(10, 10);
            Ok(format!("/models/{}", ctx.id()))
        });

        let path = op.run(ctx).await.unwrap();
        assert_eq!(path, "/models/m1");
        assert_eq!(*samples.lock(), vec![(5, 10), (10, 10)]);
    }

    #[test]
    fn test_cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let ctx = TransferContext::new("m1".into(), None, token.clone(), Arc::new(|_, _| {}));

        let mut waiting = tokio_test::task::spawn(ctx.cancelled());
        tokio_test::assert_pending!(waiting.poll());

        token.cancel();
        assert!(waiting.is_woken());
        tokio_test::assert_ready!(waiting.poll());
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_debug_hides_token() {
        let ctx = TransferContext::new(
            "m1".into(),
            Some("secret".into()),
            CancellationToken::new(),
            Arc::new(|_, _| {}),
        );
        let rendered = format!("{ctx:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("has_token: true"));
    }
}
