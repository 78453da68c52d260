//! Resource descriptors for the declarative reconciler.
//!
//! Each descriptor is a small stateless value naming one live object and
//! describing how it should look for a given desired state. The reconciler
//! owns fetching, creating and updating; a descriptor only says what the
//! object should contain and whether an observed copy already matches.

mod deployment;
mod role_binding;
mod service;
mod service_account;

pub use deployment::{Container, Deployment, DeploymentDescriptor, DeploymentSpec};
pub use role_binding::{RoleBinding, RoleBindingDescriptor, RoleRef, Subject};
pub use service::{Service, ServiceDescriptor, ServicePort, ServiceSpec};
pub use service_account::{ServiceAccount, ServiceAccountDescriptor};

use super::object::{ManagedObject, ObjectKey};

/// Capability set of one managed-object kind.
///
/// Implementations must be pure: every method derives its result only from
/// its arguments.
pub trait ResourceDescriptor<S>: Send + Sync {
    type Object: ManagedObject;

    /// Identity of the live object.
    fn key(&self) -> ObjectKey;

    /// Zero value of the right kind, filled in by a fetch.
    fn empty_object(&self) -> Self::Object;

    /// Fresh object for `desired`, used when nothing exists yet.
    fn build(&self, desired: &S) -> Self::Object;

    /// True when `observed` already satisfies `desired`.
    fn is_converged(&self, desired: &S, observed: &Self::Object) -> bool;

    /// Bring `observed` in line with `desired`, keeping unrelated fields.
    fn mutate(&self, desired: &S, observed: Self::Object) -> Self::Object;
}

/// Port the mesh proxies listen on.
pub const PROXY_PORT: u16 = 10808;
