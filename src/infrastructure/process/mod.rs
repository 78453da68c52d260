//! Subprocess execution of the mesh configuration CLI.

pub mod runner;

pub use runner::ProcessRunner;
