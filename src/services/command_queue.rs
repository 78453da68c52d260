//! Zero-capacity command queue.
//!
//! A send completes only once a consumer has taken the command, so producers
//! can never run ahead of a queue whose consumer is still bootstrapping or
//! busy. Tokio channels need a capacity of at least one, so the handoff is
//! acknowledged through a oneshot: the slot may hold a command but the sender
//! stays blocked until the consumer accepts it. A command whose producer
//! stopped waiting before the handoff was never delivered and is discarded.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::errors::QueueError;
use crate::domain::models::{Command, QueueKind};

struct Handoff {
    command: Command,
    accepted: oneshot::Sender<()>,
}

/// Producer half. Cheap to clone.
#[derive(Clone)]
pub struct QueueSender {
    mesh: Arc<str>,
    queue: QueueKind,
    tx: mpsc::Sender<Handoff>,
}

/// Consumer half, owned by exactly one queue task.
pub struct QueueReceiver {
    rx: mpsc::Receiver<Handoff>,
}

/// Create a rendezvous queue for `mesh`.
pub fn rendezvous(mesh: Arc<str>, queue: QueueKind) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (QueueSender { mesh, queue, tx }, QueueReceiver { rx })
}

impl QueueSender {
    pub const fn queue(&self) -> QueueKind {
        self.queue
    }

    /// Hand `command` to the consumer, waiting until it has been accepted.
    pub async fn send(&self, command: Command) -> Result<(), QueueError> {
        let (accepted, acknowledged) = oneshot::channel();
        self.tx
            .send(Handoff { command, accepted })
            .await
            .map_err(|_| self.closed())?;
        acknowledged.await.map_err(|_| self.closed())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn closed(&self) -> QueueError {
        QueueError::Closed {
            mesh: self.mesh.to_string(),
            queue: self.queue,
        }
    }
}

impl QueueReceiver {
    /// Take the next command, releasing its producer. `None` once every sender is gone.
    ///
    /// Commands left in the slot by a producer that has since given up are skipped.
    pub async fn recv(&mut self) -> Option<Command> {
        loop {
            let handoff = self.rx.recv().await?;
            if handoff.accepted.send(()).is_ok() {
                return Some(handoff.command);
            }
            debug!(action = %handoff.command.action(), "producer abandoned send, discarding");
        }
    }
}
