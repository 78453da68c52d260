//! Meshward - mesh control-plane convergence engine
//!
//! Meshward drives a mesh control plane toward a declared desired state. It
//! sends configuration commands to two external APIs (Control and Catalog)
//! through per-tenant queues that wait for the control plane to come up,
//! retry transient failures and stop cleanly on cancellation. Alongside it, a
//! declarative reconciler converges Kubernetes-style managed resources.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Service Layer** (`services`): command client, dispatcher, revision cache, reconciler
//! - **Adapters** (`adapters`): in-memory object store, bundle file renderer
//! - **Infrastructure Layer** (`infrastructure`): config loading, logging, process execution
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use meshward::{ClientOptions, Dispatcher, MeshRegistry, RevisionCache};
//! use meshward::domain::models::{KindTable, Mesh};
//! use meshward::infrastructure::process::ProcessRunner;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(RevisionCache::default());
//!     let registry = MeshRegistry::new(
//!         Arc::new(ProcessRunner::new("greymatter")),
//!         Arc::clone(&cache),
//!         ClientOptions::default(),
//!     );
//!     let client = registry.configure(&Mesh::new("m1")).await?;
//!     let dispatcher = Dispatcher::new(Arc::new(KindTable::default()), cache);
//!     let report = dispatcher.apply_all(&client, &[]).await;
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ClientError, CommandError, QueueError, RenderError, StoreError};
pub use domain::models::{
    Command, Config, KindSpec, KindTable, LoggingConfig, Mesh, QueueKind, Revision, RevisionPlan,
};
pub use domain::ports::{CommandRunner, ObjectRenderer, ObjectStore, RenderedObject};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    reconcile, ClientOptions, CommandClient, Completion, Dispatcher, MeshRegistry,
    ReconcileOutcome, RevisionCache,
};
