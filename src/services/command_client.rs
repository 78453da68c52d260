//! Per-tenant command client.
//!
//! A [`CommandClient`] owns two rendezvous queues, one per external API
//! (Control and Catalog), and one consumer task per queue. Each consumer:
//!
//! 1. repeats its bootstrap probe until it succeeds, sleeping
//!    `bootstrap_interval` between attempts; nothing on the queue is consumed
//!    until then, so producers block
//! 2. then takes commands one at a time and runs them; a failed command with
//!    `requeue` set is handed to a timer task that sends it back onto the same
//!    queue after `requeue_delay`
//!
//! Every task (consumers and requeue timers) is tracked by the client and
//! selects on the client's cancellation token at each suspension point.
//! Cancelling is the only teardown: queued commands are abandoned, not drained.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::domain::errors::{ClientError, QueueError};
use crate::domain::models::{Command, Config, Mesh, QueueKind};
use crate::domain::ports::CommandRunner;
use crate::services::command_queue::{rendezvous, QueueReceiver, QueueSender};
use crate::services::commands;

/// Default delay between bootstrap attempts and before a requeue.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Timing and probe settings for a [`CommandClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub bootstrap_interval: Duration,
    pub requeue_delay: Duration,
    /// Overrides the default Control probe.
    pub control_probe: Option<Command>,
    /// Overrides the default Catalog probe.
    pub catalog_probe: Option<Command>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            bootstrap_interval: DEFAULT_RETRY_INTERVAL,
            requeue_delay: DEFAULT_RETRY_INTERVAL,
            control_probe: None,
            catalog_probe: None,
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            bootstrap_interval: config.bootstrap_interval(),
            requeue_delay: config.requeue_delay(),
            ..Self::default()
        }
    }
}

/// Command client for one tenant mesh.
///
/// Dropping the client cancels it.
pub struct CommandClient {
    mesh: Arc<str>,
    bootstrap_flags: Vec<String>,
    control: QueueSender,
    catalog: QueueSender,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl CommandClient {
    /// Start the client's two queue consumers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        mesh: &Mesh,
        options: ClientOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, ClientError> {
        if mesh.name.trim().is_empty() {
            return Err(ClientError::EmptyMeshName);
        }
        Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let name: Arc<str> = Arc::from(mesh.name.as_str());
        let extra_args: Arc<[String]> = Arc::from(mesh.bootstrap_flags.clone());
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        let (control, control_rx) = rendezvous(Arc::clone(&name), QueueKind::Control);
        let (catalog, catalog_rx) = rendezvous(Arc::clone(&name), QueueKind::Catalog);

        let workers = [
            (
                control.clone(),
                control_rx,
                options
                    .control_probe
                    .clone()
                    .unwrap_or_else(|| commands::control_probe(&name)),
            ),
            (
                catalog.clone(),
                catalog_rx,
                options
                    .catalog_probe
                    .clone()
                    .unwrap_or_else(|| commands::catalog_probe(&name)),
            ),
        ];

        for (sender, receiver, probe) in workers {
            let worker = QueueWorker {
                mesh: Arc::clone(&name),
                queue: sender.queue(),
                probe,
                receiver,
                requeue: sender,
                runner: Arc::clone(&runner),
                extra_args: Arc::clone(&extra_args),
                token: token.clone(),
                tracker: tracker.clone(),
                bootstrap_interval: options.bootstrap_interval,
                requeue_delay: options.requeue_delay,
            };
            let span = info_span!("command_queue", mesh = %name, queue = %worker.queue);
            tracker.spawn(worker.run().instrument(span));
        }

        info!(mesh = %name, "command client started");

        Ok(Self {
            mesh: name,
            bootstrap_flags: mesh.bootstrap_flags.clone(),
            control,
            catalog,
            token,
            tracker,
        })
    }

    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    /// Connection flags every command is run with.
    pub fn bootstrap_flags(&self) -> &[String] {
        &self.bootstrap_flags
    }

    /// Hand `command` to `queue`, waiting until its consumer accepts it.
    ///
    /// Fails once the client has been cancelled.
    pub async fn send(&self, queue: QueueKind, command: Command) -> Result<(), QueueError> {
        let sender = match queue {
            QueueKind::Control => &self.control,
            QueueKind::Catalog => &self.catalog,
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(QueueError::Closed {
                mesh: self.mesh.to_string(),
                queue,
            }),
            result = sender.send(command) => result,
        }
    }

    /// Cancel every task owned by this client without waiting.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(mesh = %self.mesh, "cancelling command client");
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the queue consumers and all pending requeue timers to exit.
    pub async fn shutdown(&self) {
        self.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(mesh = %self.mesh, "command client stopped");
    }

    /// Number of live tasks (consumers plus pending requeues).
    pub fn task_count(&self) -> usize {
        self.tracker.len()
    }
}

impl Drop for CommandClient {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("mesh", &self.mesh)
            .field("bootstrap_flags", &self.bootstrap_flags)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Consumer state for one queue.
struct QueueWorker {
    mesh: Arc<str>,
    queue: QueueKind,
    probe: Command,
    receiver: QueueReceiver,
    requeue: QueueSender,
    runner: Arc<dyn CommandRunner>,
    extra_args: Arc<[String]>,
    token: CancellationToken,
    tracker: TaskTracker,
    bootstrap_interval: Duration,
    requeue_delay: Duration,
}

impl QueueWorker {
    async fn run(mut self) {
        if !self.bootstrap().await {
            debug!("cancelled during bootstrap");
            return;
        }

        loop {
            let command = tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                command = self.receiver.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            self.execute(command).await;
        }

        debug!("queue consumer stopped");
    }

    /// Repeat the probe until it succeeds. Returns false if cancelled first.
    async fn bootstrap(&self) -> bool {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let result = tokio::select! {
                biased;
                () = self.token.cancelled() => return false,
                result = self.probe.run(self.runner.as_ref(), &self.extra_args) => result,
            };

            match result {
                Ok(_) => {
                    info!(
                        attempts,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "connected"
                    );
                    return true;
                }
                Err(err) => {
                    warn!(
                        attempt = attempts,
                        error = %err,
                        retry_in_secs = self.bootstrap_interval.as_secs(),
                        "bootstrap probe failed"
                    );
                }
            }

            tokio::select! {
                biased;
                () = self.token.cancelled() => return false,
                () = sleep(self.bootstrap_interval) => {}
            }
        }
    }

    async fn execute(&self, command: Command) {
        let action = command.action();
        let result = tokio::select! {
            biased;
            () = self.token.cancelled() => return,
            result = command.run(self.runner.as_ref(), &self.extra_args) => result,
        };

        match result {
            Ok(_) => debug!(action = %action, "command succeeded"),
            Err(err) if command.requeue => {
                warn!(
                    action = %action,
                    error = %err,
                    retry_in_secs = self.requeue_delay.as_secs(),
                    "command failed, requeueing"
                );
                self.schedule_requeue(command);
            }
            Err(err) => error!(action = %action, error = %err, "command failed, dropping"),
        }
    }

    fn schedule_requeue(&self, command: Command) {
        let sender = self.requeue.clone();
        let token = self.token.clone();
        let delay = self.requeue_delay;

        self.tracker.spawn(
            async move {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    () = sleep(delay) => {}
                }
                let action = command.action();
                tokio::select! {
                    biased;
                    () = token.cancelled() => {}
                    result = sender.send(command) => {
                        if let Err(err) = result {
                            debug!(action = %action, error = %err, "requeue abandoned");
                        }
                    }
                }
            }
            .instrument(Span::current()),
        );
    }
}
