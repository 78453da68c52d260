//! Service layer: the convergence engine.
//!
//! - `command_queue`: zero-capacity handoff queue
//! - `command_client`: per-tenant Control/Catalog consumers with bootstrap and requeue
//! - `commands`: argument vectors for the mesh CLI
//! - `dispatcher`: routes rendered objects to queues as apply/delete commands
//! - `revision_cache`: idempotency cache of applied objects
//! - `mesh_registry`: one live client per tenant
//! - `reconciler`: generic get-or-create-or-mutate loop for managed objects

pub mod command_client;
pub mod command_queue;
pub mod commands;
pub mod dispatcher;
pub mod mesh_registry;
pub mod reconciler;
pub mod revision_cache;

pub use command_client::{ClientOptions, CommandClient};
pub use dispatcher::{Completion, DispatchAction, DispatchReport, Dispatcher};
pub use mesh_registry::MeshRegistry;
pub use reconciler::{
    reconcile, reconcile_mesh, ReconcileOutcome, ReconcilePass, ReconcileSummary,
};
pub use revision_cache::RevisionCache;
