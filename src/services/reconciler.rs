//! Declarative get-or-create-or-mutate reconciler.
//!
//! Converges one live object per [`ResourceDescriptor`] against a desired
//! state. The reconciler never retries: any store error is returned as-is and
//! the caller decides when to run again.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::errors::StoreError;
use crate::domain::models::{
    DeploymentDescriptor, DesiredState, ManagedObject, Mesh, ResourceDescriptor,
    RoleBindingDescriptor, ServiceAccountDescriptor, ServiceDescriptor,
};
use crate::domain::ports::ObjectStore;

/// What a reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Converge the object named by `descriptor` to `desired`.
#[instrument(skip_all, fields(key = %descriptor.key()))]
pub async fn reconcile<S, D, St>(
    store: &St,
    descriptor: &D,
    desired: &S,
) -> Result<ReconcileOutcome, StoreError>
where
    S: DesiredState,
    D: ResourceDescriptor<S>,
    St: ObjectStore + ?Sized,
{
    let kind = <D::Object as ManagedObject>::KIND;
    let key = descriptor.key();
    let mut observed = descriptor.empty_object();

    match store.get(&key, &mut observed).await {
        Err(err) if err.is_not_found() => {
            let mut object = descriptor.build(desired);
            object.meta_mut().set_owner(desired.owner_reference());
            store.create(&object).await?;
            info!(kind, "created");
            Ok(ReconcileOutcome::Created)
        }
        Err(err) => Err(err),
        Ok(()) => {
            if descriptor.is_converged(desired, &observed) {
                debug!(kind, "already converged");
                return Ok(ReconcileOutcome::Unchanged);
            }

            let uid = observed.meta().uid.clone();
            let resource_version = observed.meta().resource_version.clone();
            let mut object = descriptor.mutate(desired, observed);
            object.meta_mut().uid = uid;
            object.meta_mut().resource_version = resource_version;

            store.update(&object).await?;
            info!(kind, "updated");
            Ok(ReconcileOutcome::Updated)
        }
    }
}

/// Outcomes of one pass over a heterogeneous descriptor set.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ReconcileSummary {
    fn record<O: ManagedObject>(&mut self, key: String, outcome: ReconcileOutcome) {
        let entry = format!("{}/{key}", O::KIND);
        match outcome {
            ReconcileOutcome::Created => self.created.push(entry),
            ReconcileOutcome::Updated => self.updated.push(entry),
            ReconcileOutcome::Unchanged => self.unchanged.push(entry),
        }
    }

    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.updated.is_empty()
    }
}

/// Reconciles a sequence of descriptors of different kinds, stopping at the first error.
pub struct ReconcilePass<'a, St: ObjectStore + ?Sized, S: DesiredState> {
    store: &'a St,
    desired: &'a S,
    summary: ReconcileSummary,
}

impl<'a, St: ObjectStore + ?Sized, S: DesiredState> ReconcilePass<'a, St, S> {
    pub fn new(store: &'a St, desired: &'a S) -> Self {
        Self {
            store,
            desired,
            summary: ReconcileSummary::default(),
        }
    }

    pub async fn run<D: ResourceDescriptor<S>>(
        &mut self,
        descriptor: &D,
    ) -> Result<&mut Self, StoreError> {
        let outcome = reconcile(self.store, descriptor, self.desired).await?;
        self.summary
            .record::<D::Object>(descriptor.key().to_string(), outcome);
        Ok(self)
    }

    pub fn finish(self) -> ReconcileSummary {
        self.summary
    }
}

/// Reconcile every built-in resource of `mesh`: the shared service account
/// and role binding, then one deployment and service per workload.
pub async fn reconcile_mesh<St: ObjectStore + ?Sized>(
    store: &St,
    mesh: &Mesh,
    workloads: &[String],
) -> Result<ReconcileSummary, StoreError> {
    let mut pass = ReconcilePass::new(store, mesh);
    pass.run(&ServiceAccountDescriptor::for_mesh(mesh))
        .await?
        .run(&RoleBindingDescriptor::for_mesh(mesh))
        .await?;
    for workload in workloads {
        pass.run(&DeploymentDescriptor::for_workload(mesh, workload))
            .await?
            .run(&ServiceDescriptor::for_workload(mesh, workload))
            .await?;
    }
    Ok(pass.finish())
}
