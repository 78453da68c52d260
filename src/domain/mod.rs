//! Domain layer for the meshward convergence engine
//!
//! This module contains the command, revision, kind and managed-object models
//! together with the port traits adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ClientError, CommandError, QueueError, RenderError, StoreError};
