//! CLI bootstrap - the composition root.
//!
//! The only place where concrete adapters are instantiated:
//! - Backend HTTP transfer and remote cancel (via arielle-download)
//! - Push-channel client feeding the coordinator's pump
//! - Credential store, notifier and task renderer

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use arielle_download::{
    BackendConfig, CoordinatorDeps, CredentialStorePort, DedupNotifier, DownloadCoordinator,
    EnvCredentialStore, HttpRemoteCancel, NoopTaskEmitter, NotifierPort, PushChannelConfig,
    PushChannelError, PushClient, StaticCredentialStore, TaskEventEmitterPort, TracingNotifier,
};

use crate::parser::Cli;
use crate::progress::TerminalRenderer;

/// Capacity of the push message channel.
const PUSH_BUFFER: usize = 64;

/// How task state is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress bars and notification lines.
    Terminal,
    /// Log lines only.
    Plain,
}

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Backend connection settings.
    pub backend: BackendConfig,
    /// Push channel settings; `None` disables the channel.
    pub push: Option<PushChannelConfig>,
    /// Token given on the command line.
    pub token: Option<String>,
    /// Output style.
    pub output: OutputMode,
}

impl CliConfig {
    /// Build the configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            backend: BackendConfig::new().with_base_url(cli.backend_url.clone()),
            push: (!cli.no_push).then(|| PushChannelConfig::new().with_url(cli.push_url.clone())),
            token: cli.token.clone().filter(|token| !token.trim().is_empty()),
            output: if cli.plain {
                OutputMode::Plain
            } else {
                OutputMode::Terminal
            },
        }
    }

    /// Credential store for this run.
    ///
    /// An explicit token wins; otherwise `HF_TOKEN` is read on every attempt.
    pub fn credentials(&self) -> Arc<dyn CredentialStorePort> {
        match &self.token {
            Some(token) => Arc::new(StaticCredentialStore::new(token.clone())),
            None => Arc::new(EnvCredentialStore::default()),
        }
    }
}

/// How the push client ended; `None` while it is still running.
type PushOutcome = Option<Result<(), PushChannelError>>;

struct PushHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    outcome: watch::Receiver<PushOutcome>,
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// The download coordinator.
    pub coordinator: Arc<DownloadCoordinator>,
    /// Backend settings for building transfers.
    pub backend: BackendConfig,
    push: Option<PushHandle>,
}

impl CliContext {
    /// Whether a push channel was started.
    pub const fn has_push_channel(&self) -> bool {
        self.push.is_some()
    }

    /// Resolve once the push client stops on its own, with its result.
    ///
    /// Never resolves when no push channel was started.
    pub async fn push_stopped(&self) -> Result<(), PushChannelError> {
        let Some(push) = &self.push else {
            return std::future::pending().await;
        };
        let mut outcome = push.outcome.clone();
        match outcome.wait_for(Option::is_some).await {
            Ok(ended) => (*ended).clone().unwrap_or(Ok(())),
            // Client task is gone without reporting
            Err(_) => Ok(()),
        }
    }

    /// Stop the push channel and wait for pending remote cancels.
    pub async fn shutdown(self) {
        self.coordinator.shutdown().await;
        if let Some(push) = self.push {
            push.shutdown.cancel();
            if let Err(err) = push.task.await {
                tracing::warn!(error = %err, "Push channel task failed");
            }
            if let Some(Err(err)) = push.outcome.borrow().as_ref() {
                tracing::warn!(error = %err, "Push channel ended with error");
            }
        }
    }
}

/// Wire the coordinator and its adapters. Must run inside a tokio runtime.
pub fn bootstrap(config: CliConfig) -> CliContext {
    let (notifier, emitter): (Arc<dyn NotifierPort>, Arc<dyn TaskEventEmitterPort>) =
        match config.output {
            OutputMode::Terminal => {
                let renderer = TerminalRenderer::new();
                (
                    Arc::new(DedupNotifier::new(renderer.clone())),
                    Arc::new(renderer),
                )
            }
            OutputMode::Plain => (
                Arc::new(DedupNotifier::new(TracingNotifier)),
                Arc::new(NoopTaskEmitter::new()),
            ),
        };

    let deps = CoordinatorDeps::new(Arc::new(HttpRemoteCancel::new(config.backend.clone())))
        .with_notifier(notifier)
        .with_emitter(emitter)
        .with_credentials(config.credentials());
    let coordinator = Arc::new(DownloadCoordinator::new(deps));

    let push = config.push.map(|push_config| {
        let (tx, rx) = mpsc::channel(PUSH_BUFFER);
        let shutdown = CancellationToken::new();
        tracing::debug!(url = %push_config.url, "Starting push channel");
        let client = PushClient::new(push_config);
        let (outcome_tx, outcome) = watch::channel(None);
        let stop = shutdown.clone();
        let task = tokio::spawn(async move {
            let result = client.run(tx, stop).await;
            outcome_tx.send_replace(Some(result));
        });
        coordinator.init(rx);
        PushHandle {
            shutdown,
            task,
            outcome,
        }
    });

    CliContext {
        coordinator,
        backend: config.backend,
        push,
    }
}
