//! Adapters implementing the domain ports.

pub mod bundle;
pub mod memory;
