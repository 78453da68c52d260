use serde::{Deserialize, Serialize};

use super::ResourceDescriptor;
use crate::domain::models::mesh::Mesh;
use crate::domain::models::object::{ManagedObject, ObjectKey, ObjectMeta};

/// Core/v1 ServiceAccount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub automount_service_account_token: bool,
}

impl ManagedObject for ServiceAccount {
    const KIND: &'static str = "ServiceAccount";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Account the mesh's proxies run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountDescriptor {
    namespace: String,
    mesh: String,
}

impl ServiceAccountDescriptor {
    pub fn for_mesh(mesh: &Mesh) -> Self {
        Self {
            namespace: mesh.namespace.clone(),
            mesh: mesh.name.clone(),
        }
    }
}

impl ResourceDescriptor<Mesh> for ServiceAccountDescriptor {
    type Object = ServiceAccount;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, format!("{}-proxy", self.mesh))
    }

    fn empty_object(&self) -> ServiceAccount {
        ServiceAccount::default()
    }

    fn build(&self, desired: &Mesh) -> ServiceAccount {
        let mut metadata = ObjectMeta::new(&self.key());
        metadata.labels = desired.selector_labels("proxy");
        ServiceAccount {
            metadata,
            automount_service_account_token: true,
        }
    }

    fn is_converged(&self, desired: &Mesh, observed: &ServiceAccount) -> bool {
        observed.automount_service_account_token
            && observed.metadata.has_labels(&desired.selector_labels("proxy"))
    }

    fn mutate(&self, desired: &Mesh, mut observed: ServiceAccount) -> ServiceAccount {
        observed.automount_service_account_token = true;
        observed.metadata.labels.extend(desired.selector_labels("proxy"));
        observed
    }
}
