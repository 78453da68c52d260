//! CLI command implementations.

pub mod apply;
pub mod check_config;
pub mod remove;
pub mod resources;
pub mod trust;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::domain::models::{Config, Mesh, Revision};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::process::ProcessRunner;
use crate::services::{
    ClientOptions, CommandClient, DispatchReport, Dispatcher, MeshRegistry, RevisionCache,
};

/// Load configuration from `path`, or from the default project locations.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Arguments identifying the tenant mesh a command targets.
#[derive(Args, Debug, Clone)]
pub struct TenantArgs {
    /// Tenant mesh name
    #[arg(long, short)]
    pub mesh: String,

    /// Namespace the mesh is deployed to
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Connection flag prepended to every command (repeatable)
    #[arg(long = "flag", allow_hyphen_values = true)]
    pub flags: Vec<String>,
}

impl TenantArgs {
    pub fn to_mesh(&self) -> Mesh {
        let mesh = Mesh::new(&self.mesh).with_bootstrap_flags(self.flags.iter().cloned());
        match &self.namespace {
            Some(namespace) => mesh.with_namespace(namespace),
            None => mesh,
        }
    }
}

/// The convergence engine wired to the process runner.
pub struct Engine {
    pub cache: Arc<RevisionCache>,
    pub registry: MeshRegistry,
    pub dispatcher: Dispatcher,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        let cache = Arc::new(RevisionCache::new(config.revisions.clone()));
        let runner = Arc::new(ProcessRunner::new(&config.executable));
        let registry = MeshRegistry::new(runner, Arc::clone(&cache), ClientOptions::from(config));
        let dispatcher = Dispatcher::new(Arc::new(config.kinds.clone()), Arc::clone(&cache));
        Self {
            cache,
            registry,
            dispatcher,
        }
    }

    pub async fn client(&self, mesh: &Mesh) -> Result<Arc<CommandClient>> {
        self.registry
            .configure(mesh)
            .await
            .with_context(|| format!("Failed to start command client for mesh {}", mesh.name))
    }
}

/// How the dispatched commands of one batch ended.
#[derive(Debug, Default, Serialize)]
pub struct Settled {
    pub succeeded: Vec<Revision>,
    pub failed: Vec<Revision>,
    pub pending: Vec<Revision>,
    pub failed_attempts: usize,
}

/// Collect completions until every dispatched command has settled or `deadline` passes.
///
/// A failed apply is requeued, so it stays pending until a later attempt
/// succeeds. A failed delete is final.
pub async fn settle(report: &mut DispatchReport, deadline: Instant) -> Settled {
    let mut pending: BTreeSet<Revision> = report.dispatched.iter().cloned().collect();
    let mut settled = Settled::default();

    while !pending.is_empty() {
        let completion = match timeout_at(deadline, report.completions.recv()).await {
            Ok(Some(completion)) => completion,
            Ok(None) | Err(_) => break,
        };
        if !completion.is_final() {
            settled.failed_attempts += 1;
            continue;
        }
        if pending.remove(&completion.revision) {
            if completion.succeeded() {
                settled.succeeded.push(completion.revision);
            } else {
                settled.failed.push(completion.revision);
            }
        }
    }

    debug!(remaining = pending.len(), "stopped waiting for completions");
    settled.pending = pending.into_iter().collect();
    settled
}

pub fn deadline_after(wait_secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(wait_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Completion, DispatchAction};
    use tokio::sync::mpsc;

    fn report(revisions: &[Revision]) -> (DispatchReport, mpsc::UnboundedSender<Completion>) {
        let (tx, completions) = mpsc::unbounded_channel();
        let report = DispatchReport {
            dispatched: revisions.to_vec(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
            undelivered: Vec::new(),
            completions,
        };
        (report, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_waits_for_final_completions() {
        let domain = Revision::new("m1", "domain", "m1.edge");
        let listener = Revision::new("m1", "listener", "m1.edge");
        let (mut report, tx) = report(&[domain.clone(), listener.clone()]);

        tx.send(Completion {
            revision: domain.clone(),
            action: DispatchAction::Apply,
            error: Some("503".to_string()),
        })
        .unwrap();
        tx.send(Completion {
            revision: domain.clone(),
            action: DispatchAction::Apply,
            error: None,
        })
        .unwrap();

        let settled = settle(&mut report, deadline_after(5)).await;

        assert_eq!(settled.succeeded, vec![domain]);
        assert_eq!(settled.pending, vec![listener]);
        assert_eq!(settled.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_failed_delete_is_final() {
        let route = Revision::new("m1", "route", "m1.edge");
        let (mut report, tx) = report(&[route.clone()]);
        tx.send(Completion {
            revision: route.clone(),
            action: DispatchAction::Delete,
            error: Some("not found".to_string()),
        })
        .unwrap();

        let settled = settle(&mut report, deadline_after(5)).await;

        assert_eq!(settled.failed, vec![route]);
        assert!(settled.pending.is_empty());
    }

    #[test]
    fn test_tenant_args_build_mesh() {
        let args = TenantArgs {
            mesh: "m1".to_string(),
            namespace: Some("tenants".to_string()),
            flags: vec!["--api".to_string(), "http://cp:5555".to_string()],
        };
        let mesh = args.to_mesh();
        assert_eq!(mesh.name, "m1");
        assert_eq!(mesh.namespace, "tenants");
        assert_eq!(mesh.bootstrap_flags, vec!["--api", "http://cp:5555"]);
    }
}
