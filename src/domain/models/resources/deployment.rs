use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ResourceDescriptor, PROXY_PORT};
use crate::domain::models::mesh::Mesh;
use crate::domain::models::object::{ManagedObject, ObjectKey, ObjectMeta};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub replicas: u32,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// Apps/v1 Deployment, reduced to the fields the mesh manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
}

impl ManagedObject for Deployment {
    const KIND: &'static str = "Deployment";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Proxy deployment for one mesh workload (`<mesh>-<workload>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    namespace: String,
    mesh: String,
    workload: String,
}

impl DeploymentDescriptor {
    pub fn for_workload(mesh: &Mesh, workload: &str) -> Self {
        Self {
            namespace: mesh.namespace.clone(),
            mesh: mesh.name.clone(),
            workload: workload.to_string(),
        }
    }

    fn proxy_container(&self, desired: &Mesh) -> Container {
        Container {
            name: "proxy".to_string(),
            image: desired.proxy_image.clone(),
            args: vec![format!("--service-cluster={}.{}", self.mesh, self.workload)],
            ports: vec![PROXY_PORT],
        }
    }
}

impl ResourceDescriptor<Mesh> for DeploymentDescriptor {
    type Object = Deployment;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, format!("{}-{}", self.mesh, self.workload))
    }

    fn empty_object(&self) -> Deployment {
        Deployment::default()
    }

    fn build(&self, desired: &Mesh) -> Deployment {
        let labels = desired.selector_labels(&self.workload);
        let mut metadata = ObjectMeta::new(&self.key());
        metadata.labels = labels.clone();
        Deployment {
            metadata,
            spec: DeploymentSpec {
                replicas: desired.replicas,
                selector: labels,
                containers: vec![self.proxy_container(desired)],
            },
        }
    }

    fn is_converged(&self, desired: &Mesh, observed: &Deployment) -> bool {
        let proxy = observed.spec.containers.iter().find(|c| c.name == "proxy");
        observed.spec.replicas == desired.replicas
            && proxy.is_some_and(|c| c.image == desired.proxy_image)
            && observed
                .metadata
                .has_labels(&desired.selector_labels(&self.workload))
    }

    fn mutate(&self, desired: &Mesh, mut observed: Deployment) -> Deployment {
        observed.spec.replicas = desired.replicas;
        observed
            .metadata
            .labels
            .extend(desired.selector_labels(&self.workload));

        let wanted = self.proxy_container(desired);
        match observed.spec.containers.iter_mut().find(|c| c.name == "proxy") {
            Some(proxy) => proxy.image = wanted.image,
            None => observed.spec.containers.push(wanted),
        }
        observed
    }
}
