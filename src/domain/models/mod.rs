pub mod command;
pub mod config;
pub mod kind;
pub mod mesh;
pub mod object;
pub mod resources;
pub mod revision;

pub use command::{Command, CompletionHook, OutputTransform};
pub use config::{Config, LoggingConfig};
pub use kind::{KindSpec, KindTable, QueueKind};
pub use mesh::Mesh;
pub use object::{DesiredState, ManagedObject, ObjectKey, ObjectMeta, OwnerReference};
pub use resources::{
    Deployment, DeploymentDescriptor, ResourceDescriptor, RoleBinding, RoleBindingDescriptor,
    Service, ServiceAccount, ServiceAccountDescriptor, ServiceDescriptor,
};
pub use revision::{Revision, RevisionPlan};
