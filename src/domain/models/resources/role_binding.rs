use serde::{Deserialize, Serialize};

use super::ResourceDescriptor;
use crate::domain::models::mesh::Mesh;
use crate::domain::models::object::{ManagedObject, ObjectKey, ObjectMeta};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub kind: String,
    pub name: String,
}

/// Account, user or group a binding applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

/// RBAC RoleBinding granting a role to a list of subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    pub metadata: ObjectMeta,
    pub role_ref: RoleRef,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl ManagedObject for RoleBinding {
    const KIND: &'static str = "RoleBinding";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Grants the proxy role to the mesh's service account in every watched namespace.
///
/// Subjects added by other controllers are left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBindingDescriptor {
    namespace: String,
    mesh: String,
}

impl RoleBindingDescriptor {
    pub fn for_mesh(mesh: &Mesh) -> Self {
        Self {
            namespace: mesh.namespace.clone(),
            mesh: mesh.name.clone(),
        }
    }

    fn role_ref(&self) -> RoleRef {
        RoleRef {
            kind: "ClusterRole".to_string(),
            name: format!("{}-proxy", self.mesh),
        }
    }

    fn wanted_subjects(&self, desired: &Mesh) -> Vec<Subject> {
        std::iter::once(&desired.namespace)
            .chain(desired.watch_namespaces.iter())
            .map(|ns| Subject {
                kind: "ServiceAccount".to_string(),
                name: format!("{}-proxy", self.mesh),
                namespace: ns.clone(),
            })
            .collect()
    }
}

impl ResourceDescriptor<Mesh> for RoleBindingDescriptor {
    type Object = RoleBinding;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, format!("{}-proxy", self.mesh))
    }

    fn empty_object(&self) -> RoleBinding {
        RoleBinding::default()
    }

    fn build(&self, desired: &Mesh) -> RoleBinding {
        let mut metadata = ObjectMeta::new(&self.key());
        metadata.labels = desired.selector_labels("proxy");
        RoleBinding {
            metadata,
            role_ref: self.role_ref(),
            subjects: self.wanted_subjects(desired),
        }
    }

    fn is_converged(&self, desired: &Mesh, observed: &RoleBinding) -> bool {
        observed.role_ref == self.role_ref()
            && self
                .wanted_subjects(desired)
                .iter()
                .all(|s| observed.subjects.contains(s))
    }

    fn mutate(&self, desired: &Mesh, mut observed: RoleBinding) -> RoleBinding {
        observed.role_ref = self.role_ref();
        for subject in self.wanted_subjects(desired) {
            if !observed.subjects.contains(&subject) {
                observed.subjects.push(subject);
            }
        }
        observed
    }
}
