//! Convergence dispatcher: turns rendered objects into queued commands.
//!
//! Each `(kind, payload)` pair is resolved against the [`KindTable`], keyed by
//! the kind's identity field, and sent to the Control or Catalog queue of the
//! tenant's [`CommandClient`]. Sending blocks until the queue's consumer takes
//! the command. Bad input (unknown kind, missing key) is logged and skipped;
//! a batch is never aborted. An apply whose payload checksum matches the one
//! already recorded for its revision is not sent at all.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::errors::CommandError;
use crate::domain::models::{Command, KindTable, Revision};
use crate::domain::ports::RenderedObject;
use crate::services::command_client::CommandClient;
use crate::services::commands;
use crate::services::revision_cache::RevisionCache;

/// What a dispatched command did to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    Apply,
    Delete,
}

/// Outcome of one execution of a dispatched command.
///
/// Requeued applies report every failed attempt before their final success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub revision: Revision,
    pub action: DispatchAction,
    pub error: Option<String>,
}

impl Completion {
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// No further execution will follow this one.
    pub const fn is_final(&self) -> bool {
        self.error.is_none() || matches!(self.action, DispatchAction::Delete)
    }
}

/// Summary of one batch.
#[derive(Debug)]
pub struct DispatchReport {
    /// Revisions whose command was accepted by a queue.
    pub dispatched: Vec<Revision>,
    /// Revisions already applied with the same payload, not sent again.
    pub unchanged: Vec<Revision>,
    /// Objects rejected before sending, with the reason.
    pub skipped: Vec<String>,
    /// Revisions whose queue was closed before accepting the command.
    pub undelivered: Vec<Revision>,
    /// Completions of the dispatched commands, in the order they finish.
    pub completions: mpsc::UnboundedReceiver<Completion>,
}

/// Routes rendered objects to a tenant's command queues.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    kinds: Arc<KindTable>,
    cache: Arc<RevisionCache>,
}

impl Dispatcher {
    /// Dispatcher routing by `kinds` and recording outcomes in `cache`.
    pub const fn new(kinds: Arc<KindTable>, cache: Arc<RevisionCache>) -> Self {
        Self { kinds, cache }
    }

    /// Apply every object. Successful applies are recorded in the revision cache.
    pub async fn apply_all(&self, client: &CommandClient, objects: &[RenderedObject]) -> DispatchReport {
        self.dispatch(client, objects, DispatchAction::Apply).await
    }

    /// Delete every object. Successful deletes are forgotten by the revision cache.
    pub async fn unapply_all(
        &self,
        client: &CommandClient,
        objects: &[RenderedObject],
    ) -> DispatchReport {
        self.dispatch(client, objects, DispatchAction::Delete).await
    }

    async fn dispatch(
        &self,
        client: &CommandClient,
        objects: &[RenderedObject],
        action: DispatchAction,
    ) -> DispatchReport {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let mut report = DispatchReport {
            dispatched: Vec::new(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
            undelivered: Vec::new(),
            completions,
        };

        for object in objects {
            let Some(spec) = self.kinds.lookup(&object.kind) else {
                error!(mesh = client.mesh(), kind = %object.kind, "unrecognized kind, skipping");
                report.skipped.push(format!("unrecognized kind '{}'", object.kind));
                continue;
            };
            let Some(key) = spec.key_of(&object.payload) else {
                error!(
                    mesh = client.mesh(),
                    kind = %spec.name,
                    field = %spec.key_field,
                    "payload has no identity key, skipping"
                );
                report
                    .skipped
                    .push(format!("{} payload without '{}'", spec.name, spec.key_field));
                continue;
            };

            let revision = Revision::new(client.mesh(), &spec.name, key.clone());
            let checksum = checksum(&object.payload);
            if action == DispatchAction::Apply && self.cache.is_current(&revision, &checksum) {
                debug!(revision = %revision, "already applied, skipping");
                report.unchanged.push(revision);
                continue;
            }

            let command = match action {
                DispatchAction::Apply => commands::apply_object(spec, object.payload.clone()),
                DispatchAction::Delete => commands::delete_object(spec, &key, client.mesh()),
            };
            let command = self.observe(command, revision.clone(), action, checksum, completions_tx.clone());

            match client.send(spec.queue, command).await {
                Ok(()) => report.dispatched.push(revision),
                Err(err) => {
                    warn!(revision = %revision, error = %err, "command not delivered");
                    report.undelivered.push(revision);
                }
            }
        }

        report
    }

    /// Attach logging, cache bookkeeping and completion reporting to `command`.
    fn observe(
        &self,
        command: Command,
        revision: Revision,
        action: DispatchAction,
        checksum: String,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Command {
        let cache = Arc::clone(&self.cache);
        command.on_complete(move |result: &Result<String, CommandError>| {
            match (action, result) {
                (DispatchAction::Apply, Ok(_)) => {
                    info!(kind = %revision.kind, key = %revision.key, "applied");
                    cache.record_applied(revision.clone(), checksum.clone());
                }
                (DispatchAction::Delete, Ok(_)) => {
                    info!(kind = %revision.kind, key = %revision.key, "deleted");
                    cache.forget(&revision);
                }
                (DispatchAction::Apply, Err(err)) => {
                    warn!(kind = %revision.kind, key = %revision.key, error = %err, "apply failed");
                }
                (DispatchAction::Delete, Err(err)) => {
                    error!(kind = %revision.kind, key = %revision.key, error = %err, "delete failed");
                }
            }
            // The receiver may have been dropped by a caller that does not wait.
            let _ = completions.send(Completion {
                revision: revision.clone(),
                action,
                error: result.as_ref().err().map(ToString::to_string),
            });
        })
    }
}

/// Hex SHA-256 of a payload.
pub fn checksum(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
