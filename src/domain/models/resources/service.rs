use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ResourceDescriptor, PROXY_PORT};
use crate::domain::models::mesh::Mesh;
use crate::domain::models::object::{ManagedObject, ObjectKey, ObjectMeta};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub target_port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

/// Core/v1 Service, reduced to the fields the mesh manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

impl ManagedObject for Service {
    const KIND: &'static str = "Service";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Service fronting one workload's proxy port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    namespace: String,
    mesh: String,
    workload: String,
}

impl ServiceDescriptor {
    pub fn for_workload(mesh: &Mesh, workload: &str) -> Self {
        Self {
            namespace: mesh.namespace.clone(),
            mesh: mesh.name.clone(),
            workload: workload.to_string(),
        }
    }

    fn proxy_port() -> ServicePort {
        ServicePort {
            name: "proxy".to_string(),
            port: PROXY_PORT,
            target_port: PROXY_PORT,
        }
    }
}

impl ResourceDescriptor<Mesh> for ServiceDescriptor {
    type Object = Service;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, format!("{}-{}", self.mesh, self.workload))
    }

    fn empty_object(&self) -> Service {
        Service::default()
    }

    fn build(&self, desired: &Mesh) -> Service {
        let labels = desired.selector_labels(&self.workload);
        let mut metadata = ObjectMeta::new(&self.key());
        metadata.labels = labels.clone();
        Service {
            metadata,
            spec: ServiceSpec {
                selector: labels,
                ports: vec![Self::proxy_port()],
            },
        }
    }

    fn is_converged(&self, desired: &Mesh, observed: &Service) -> bool {
        observed.spec.selector == desired.selector_labels(&self.workload)
            && observed.spec.ports.contains(&Self::proxy_port())
    }

    fn mutate(&self, desired: &Mesh, mut observed: Service) -> Service {
        observed.spec.selector = desired.selector_labels(&self.workload);
        observed.spec.ports.retain(|p| p.name != "proxy");
        observed.spec.ports.push(Self::proxy_port());
        observed
    }
}
