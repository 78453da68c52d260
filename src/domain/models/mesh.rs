use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::object::{DesiredState, OwnerReference};

/// Desired state of one tenant mesh.
///
/// Only the fields the convergence engine and the built-in resource
/// descriptors read are modelled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Mesh {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Stable identity used for owner references.
    #[serde(default = "new_uid")]
    pub uid: String,

    #[serde(default = "default_proxy_image")]
    pub proxy_image: String,

    #[serde(default = "default_replicas")]
    pub replicas: u32,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Namespaces whose service accounts are granted access to the mesh.
    #[serde(default)]
    pub watch_namespaces: Vec<String>,

    /// Connection flags prepended to every command sent for this mesh.
    #[serde(default)]
    pub bootstrap_flags: Vec<String>,
}

fn default_namespace() -> String {
    "meshward-system".to_string()
}

fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

fn default_proxy_image() -> String {
    "docker.io/envoyproxy/envoy:v1.29-latest".to_string()
}

const fn default_replicas() -> u32 {
    1
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            uid: new_uid(),
            proxy_image: default_proxy_image(),
            replicas: default_replicas(),
            labels: BTreeMap::new(),
            watch_namespaces: Vec::new(),
            bootstrap_flags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_bootstrap_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Labels every object managed for this mesh carries.
    pub fn selector_labels(&self, workload: &str) -> BTreeMap<String, String> {
        let mut labels = self.labels.clone();
        labels.insert("meshward.io/mesh".to_string(), self.name.clone());
        labels.insert("meshward.io/workload".to_string(), workload.to_string());
        labels
    }
}

impl DesiredState for Mesh {
    fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: "meshward.io/v1".to_string(),
            kind: "Mesh".to_string(),
            name: self.name.clone(),
            uid: self.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        }
    }
}
