//! Renders workloads from JSON bundle files on disk.
//!
//! A bundle directory holds one `<workload>.json` per workload:
//!
//! ```json
//! {
//!   "apply":  [{ "kind": "domain", "payload": { "domain_key": "{{mesh}}.edge" } }],
//!   "remove": [{ "kind": "route",  "payload": { "route_key": "{{mesh}}.edge" } }]
//! }
//! ```
//!
//! The placeholders `{{mesh}}`, `{{namespace}}` and `{{workload}}` are
//! substituted inside string values (kinds, payload strings and object keys)
//! after parsing, so substituted text is never interpreted as JSON. Payloads
//! are otherwise passed through untouched.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::errors::RenderError;
use crate::domain::models::Mesh;
use crate::domain::ports::{ObjectRenderer, RenderedBundle, RenderedObject};

#[derive(Debug, Deserialize)]
struct BundleDocument {
    #[serde(default)]
    apply: Vec<ObjectDocument>,
    #[serde(default)]
    remove: Vec<ObjectDocument>,
}

#[derive(Debug, Deserialize)]
struct ObjectDocument {
    kind: String,
    payload: Value,
}

impl From<ObjectDocument> for RenderedObject {
    fn from(doc: ObjectDocument) -> Self {
        Self::from_json(doc.kind, &doc.payload)
    }
}

/// [`ObjectRenderer`] backed by a directory of JSON bundle files.
#[derive(Debug, Clone)]
pub struct BundleFileRenderer {
    dir: PathBuf,
}

impl BundleFileRenderer {
    /// Renderer reading bundles from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bundle_path(&self, workload: &str) -> PathBuf {
        self.dir.join(format!("{workload}.json"))
    }
}

impl ObjectRenderer for BundleFileRenderer {
    fn render(&self, mesh: &Mesh, workload: &str) -> Result<RenderedBundle, RenderError> {
        let path = self.bundle_path(workload);
        if !path.is_file() {
            return Err(RenderError::UnknownWorkload(workload.to_string()));
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| RenderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parse_error = |source| RenderError::Parse {
            path: path.display().to_string(),
            source,
        };
        let mut value: Value = serde_json::from_str(&raw).map_err(parse_error)?;
        let vars = [
            ("{{mesh}}", mesh.name.as_str()),
            ("{{namespace}}", mesh.namespace.as_str()),
            ("{{workload}}", workload),
        ];
        substitute(&mut value, &vars);
        let document: BundleDocument = serde_json::from_value(value).map_err(parse_error)?;

        debug!(
            mesh = %mesh.name,
            workload,
            apply = document.apply.len(),
            remove = document.remove.len(),
            "rendered bundle"
        );

        Ok(RenderedBundle {
            apply: document.apply.into_iter().map(Into::into).collect(),
            remove: document.remove.into_iter().map(Into::into).collect(),
        })
    }
}

fn substitute_str(text: &str, vars: &[(&str, &str)]) -> String {
    vars.iter()
        .fold(text.to_string(), |text, (placeholder, value)| text.replace(placeholder, value))
}

/// Replace placeholders in every string of `value`, recursively.
fn substitute(value: &mut Value, vars: &[(&str, &str)]) {
    match value {
        Value::String(text) => *text = substitute_str(text, vars),
        Value::Array(items) => items.iter_mut().for_each(|item| substitute(item, vars)),
        Value::Object(fields) => {
            let renamed: Map<String, Value> = std::mem::take(fields)
                .into_iter()
                .map(|(key, mut item)| {
                    substitute(&mut item, vars);
                    (substitute_str(&key, vars), item)
                })
                .collect();
            *fields = renamed;
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
