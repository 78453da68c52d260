//! File-backed templating collaborator.

pub mod file_renderer;

pub use file_renderer::BundleFileRenderer;
