//! Kind table: which queue a configuration kind belongs to and where its identity lives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two independent external APIs a tenant is configured through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Control,
    Catalog,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Catalog => write!(f, "catalog"),
        }
    }
}

/// Static description of one configuration kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KindSpec {
    /// Kind tag as produced by the templating collaborator.
    pub name: String,

    /// JSON field in the payload holding the object's unique key.
    pub key_field: String,

    /// Queue the kind's commands are routed to.
    #[serde(default = "default_queue")]
    pub queue: QueueKind,

    /// Deletion must carry the tenant scoping parameter.
    #[serde(default)]
    pub scoped_delete: bool,
}

const fn default_queue() -> QueueKind {
    QueueKind::Control
}

impl KindSpec {
    pub fn control(name: &str, key_field: &str) -> Self {
        Self {
            name: name.to_string(),
            key_field: key_field.to_string(),
            queue: QueueKind::Control,
            scoped_delete: false,
        }
    }

    pub fn catalog(name: &str, key_field: &str) -> Self {
        Self {
            name: name.to_string(),
            key_field: key_field.to_string(),
            queue: QueueKind::Catalog,
            scoped_delete: true,
        }
    }

    /// Extract this kind's identity key from a JSON payload.
    ///
    /// Returns `None` when the payload is not a JSON object or the field is
    /// missing, empty, or not a string.
    pub fn key_of(&self, payload: &[u8]) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
        value
            .get(&self.key_field)
            .and_then(serde_json::Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

/// Lookup table from kind tag to [`KindSpec`].
///
/// Lookups are case-insensitive so `Domain` and `domain` name the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindTable {
    kinds: Vec<KindSpec>,
}

impl KindTable {
    pub const fn new(kinds: Vec<KindSpec>) -> Self {
        Self { kinds }
    }

    pub fn lookup(&self, kind: &str) -> Option<&KindSpec> {
        let kind = kind.trim();
        if kind.is_empty() {
            return None;
        }
        self.kinds.iter().find(|k| k.name.eq_ignore_ascii_case(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindSpec> {
        self.kinds.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::new(vec![
            KindSpec::control("zone", "zone_key"),
            KindSpec::control("domain", "domain_key"),
            KindSpec::control("listener", "listener_key"),
            KindSpec::control("proxy", "proxy_key"),
            KindSpec::control("cluster", "cluster_key"),
            KindSpec::control("route", "route_key"),
            KindSpec::catalog("catalogservice", "service_id"),
        ])
    }
}
