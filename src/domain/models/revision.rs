//! Revisions: the idempotency records of externally applied objects, and the
//! plan that says which ones a tenant must eventually have.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Idempotency record for one externally-applied configuration object.
///
/// Kinds are stored lowercased so revisions built from `Domain` and `domain`
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision {
    pub tenant: String,
    pub kind: String,
    pub key: String,
}

impl Revision {
    pub fn new(tenant: impl Into<String>, kind: &str, key: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            kind: kind.trim().to_ascii_lowercase(),
            key: key.into(),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.kind, self.key)
    }
}

/// Rule that expands a tenant name into the revisions it must eventually have.
///
/// The edge proxy and every system component need one revision per sidecar
/// kind; system components additionally need one revision per component kind.
/// Keys take the form `<tenant>.<workload>`, except for kinds listed in
/// `workload_keyed_kinds`, which are already scoped to the tenant by the API
/// and are keyed by the bare workload name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RevisionPlan {
    #[serde(default = "default_edge_workload")]
    pub edge_workload: String,

    #[serde(default = "default_system_components")]
    pub system_components: Vec<String>,

    #[serde(default = "default_sidecar_kinds")]
    pub sidecar_kinds: Vec<String>,

    #[serde(default = "default_component_kinds")]
    pub component_kinds: Vec<String>,

    #[serde(default = "default_workload_keyed_kinds")]
    pub workload_keyed_kinds: Vec<String>,
}

fn default_edge_workload() -> String {
    "edge".to_string()
}

fn default_system_components() -> Vec<String> {
    vec![
        "control".to_string(),
        "catalog".to_string(),
        "dashboard".to_string(),
    ]
}

fn default_sidecar_kinds() -> Vec<String> {
    vec![
        "domain".to_string(),
        "listener".to_string(),
        "proxy".to_string(),
        "cluster".to_string(),
    ]
}

fn default_component_kinds() -> Vec<String> {
    vec!["catalogservice".to_string(), "route".to_string()]
}

fn default_workload_keyed_kinds() -> Vec<String> {
    vec!["catalogservice".to_string()]
}

impl Default for RevisionPlan {
    fn default() -> Self {
        Self {
            edge_workload: default_edge_workload(),
            system_components: default_system_components(),
            sidecar_kinds: default_sidecar_kinds(),
            component_kinds: default_component_kinds(),
            workload_keyed_kinds: default_workload_keyed_kinds(),
        }
    }
}

impl RevisionPlan {
    /// Plan with only an edge proxy and the given sidecar kinds.
    pub fn edge_only<I, S>(sidecar_kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            edge_workload: default_edge_workload(),
            system_components: Vec::new(),
            sidecar_kinds: sidecar_kinds.into_iter().map(Into::into).collect(),
            component_kinds: Vec::new(),
            workload_keyed_kinds: default_workload_keyed_kinds(),
        }
    }

    /// Expand the plan for `tenant`, preserving order and dropping duplicates.
    pub fn expand(&self, tenant: &str) -> Vec<Revision> {
        let mut revisions: Vec<Revision> = Vec::new();
        let mut push = |kind: &str, workload: &str| {
            let key = if self.is_workload_keyed(kind) {
                workload.to_string()
            } else {
                format!("{tenant}.{workload}")
            };
            let revision = Revision::new(tenant, kind, key);
            if !revisions.contains(&revision) {
                revisions.push(revision);
            }
        };

        let workloads =
            std::iter::once(&self.edge_workload).chain(self.system_components.iter());
        for workload in workloads {
            for kind in &self.sidecar_kinds {
                push(kind, workload);
            }
        }
        for component in &self.system_components {
            for kind in &self.component_kinds {
                push(kind, component);
            }
        }

        revisions
    }

    fn is_workload_keyed(&self, kind: &str) -> bool {
        let kind = kind.trim();
        self.workload_keyed_kinds
            .iter()
            .any(|k| k.eq_ignore_ascii_case(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_only_plan() {
        let plan = RevisionPlan::edge_only(["Domain", "Listener"]);
        assert_eq!(
            plan.expand("m1"),
            vec![
                Revision::new("m1", "domain", "m1.edge"),
                Revision::new("m1", "listener", "m1.edge"),
            ]
        );
    }

    #[test]
    fn test_default_plan_covers_components() {
        let revisions = RevisionPlan::default().expand("m2");
        // 4 workloads * 4 sidecar kinds + 3 components * 2 component kinds
        assert_eq!(revisions.len(), 22);
        assert!(revisions.contains(&Revision::new("m2", "proxy", "m2.dashboard")));
        assert!(revisions.contains(&Revision::new("m2", "catalogservice", "control")));
        assert!(revisions.contains(&Revision::new("m2", "route", "m2.control")));
        assert!(!revisions.contains(&Revision::new("m2", "route", "m2.edge")));
    }

    #[test]
    fn test_expand_dedupes_overlapping_kinds() {
        let plan = RevisionPlan {
            edge_workload: "edge".to_string(),
            system_components: vec!["control".to_string()],
            sidecar_kinds: vec!["route".to_string()],
            component_kinds: vec!["route".to_string()],
            workload_keyed_kinds: Vec::new(),
        };
        assert_eq!(plan.expand("m3").len(), 2);
    }

    #[test]
    fn test_revision_display_and_normalization() {
        let revision = Revision::new("m1", " Listener ", "m1.edge");
        assert_eq!(revision.kind, "listener");
        assert_eq!(revision.to_string(), "m1/listener/m1.edge");
    }
}
