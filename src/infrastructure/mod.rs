//! Infrastructure layer module
//!
//! This module contains the concrete integrations the engine runs on:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Process execution of the mesh CLI
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod process;
