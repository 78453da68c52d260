use serde::{Deserialize, Serialize};

use crate::domain::errors::RenderError;
use crate::domain::models::Mesh;

/// One rendered configuration object: a kind tag plus an opaque JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedObject {
    pub kind: String,
    pub payload: Vec<u8>,
}

impl RenderedObject {
    pub fn new(kind: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }

    /// Build from a JSON value.
    pub fn from_json(kind: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self::new(kind, payload.to_string().into_bytes())
    }
}

/// Ordered objects to apply and to remove for one workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBundle {
    pub apply: Vec<RenderedObject>,
    pub remove: Vec<RenderedObject>,
}

/// Port for the templating collaborator.
///
/// The engine treats rendered payloads as opaque; only the identity field
/// named by the kind table is ever read from them.
pub trait ObjectRenderer: Send + Sync {
    fn render(&self, mesh: &Mesh, workload: &str) -> Result<RenderedBundle, RenderError>;
}
