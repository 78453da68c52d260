//! Registry of live command clients, one per tenant mesh.
//!
//! Configuring a mesh whose connection flags changed cancels the old client
//! before the new one is installed, so each tenant runs at most one pair of
//! queue consumers at steady state. Removing a mesh cancels its client and
//! drops its revisions from the cache.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::errors::ClientError;
use crate::domain::models::Mesh;
use crate::domain::ports::CommandRunner;
use crate::services::command_client::{ClientOptions, CommandClient};
use crate::services::revision_cache::RevisionCache;

/// Owns one [`CommandClient`] per tenant mesh, sharing a runner and revision cache.
pub struct MeshRegistry {
    runner: Arc<dyn CommandRunner>,
    cache: Arc<RevisionCache>,
    options: ClientOptions,
    clients: Mutex<HashMap<String, Arc<CommandClient>>>,
}

impl MeshRegistry {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        cache: Arc<RevisionCache>,
        options: ClientOptions,
    ) -> Self {
        Self {
            runner,
            cache,
            options,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Revision cache tenants are registered in.
    pub fn cache(&self) -> &Arc<RevisionCache> {
        &self.cache
    }

    /// Return the mesh's client, starting or replacing it as needed.
    ///
    /// An existing client is reused while it is alive and its bootstrap flags
    /// match the mesh. Otherwise it is cancelled and a new one takes its place.
    pub async fn configure(&self, mesh: &Mesh) -> Result<Arc<CommandClient>, ClientError> {
        let mut clients = self.clients.lock().await;

        if let Some(existing) = clients.get(&mesh.name) {
            let unchanged = existing.bootstrap_flags() == mesh.bootstrap_flags.as_slice();
            if unchanged && !existing.is_cancelled() {
                return Ok(Arc::clone(existing));
            }
            info!(mesh = %mesh.name, "connection parameters changed, replacing command client");
            existing.cancel();
        }

        let client = Arc::new(CommandClient::new(
            mesh,
            self.options.clone(),
            Arc::clone(&self.runner),
        )?);
        self.cache.register(&mesh.name);
        clients.insert(mesh.name.clone(), Arc::clone(&client));
        Ok(client)
    }

    /// The running client for `mesh`, if configured.
    pub async fn get(&self, mesh: &str) -> Option<Arc<CommandClient>> {
        self.clients.lock().await.get(mesh).cloned()
    }

    /// Tear down the mesh's client and forget its revisions. Returns false if unknown.
    pub async fn remove(&self, mesh: &str) -> bool {
        let removed = self.clients.lock().await.remove(mesh);
        match removed {
            Some(client) => {
                client.cancel();
                self.cache.deregister(mesh);
                info!(mesh, "mesh removed");
                true
            }
            None => false,
        }
    }

    /// Names of every configured mesh.
    pub async fn meshes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Cancel every client and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        let clients: Vec<Arc<CommandClient>> =
            self.clients.lock().await.drain().map(|(_, c)| c).collect();
        for client in clients {
            client.shutdown().await;
        }
    }
}
