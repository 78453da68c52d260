//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that infrastructure adapters implement:
//! - CommandRunner: executes the external mesh CLI
//! - ObjectStore: the live-object API the reconciler converges against
//! - ObjectRenderer: the templating collaborator producing configuration payloads
//!
//! These traits keep the convergence engine independent of any particular
//! process launcher, cluster API or template language.

pub mod command_runner;
pub mod object_store;
pub mod renderer;

pub use command_runner::CommandRunner;
pub use object_store::ObjectStore;
pub use renderer::{ObjectRenderer, RenderedBundle, RenderedObject};
