//! Integration tests for the declarative reconciler against the in-memory store.

use async_trait::async_trait;

use meshward::adapters::memory::{InMemoryObjectStore, StoreStats};
use meshward::domain::errors::StoreError;
use meshward::domain::models::{
    Deployment, DeploymentDescriptor, ManagedObject, Mesh, ObjectKey, ResourceDescriptor,
    RoleBinding, RoleBindingDescriptor, Service, ServiceAccountDescriptor, ServiceDescriptor,
};
use meshward::domain::ports::ObjectStore;
use meshward::services::{reconcile, reconcile_mesh, ReconcileOutcome, ReconcilePass};

fn mesh() -> Mesh {
    Mesh::new("m1").with_namespace("mesh-system")
}

#[tokio::test]
async fn test_creates_missing_object_with_owner() {
    let store = InMemoryObjectStore::new();
    let mesh = mesh();
    let descriptor = DeploymentDescriptor::for_workload(&mesh, "edge");

    let outcome = reconcile(&store, &descriptor, &mesh).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Created);

    let created: Deployment = store.peek(&descriptor.key()).await.unwrap();
    assert_eq!(created.metadata.name, "m1-edge");
    assert_eq!(created.metadata.namespace, "mesh-system");
    assert_eq!(created.spec.replicas, 1);
    assert_eq!(created.metadata.owner_references.len(), 1);
    assert_eq!(created.metadata.owner_references[0].uid, mesh.uid);
    assert!(created.metadata.owner_references[0].controller);
}

#[tokio::test]
async fn test_converged_object_is_not_updated() {
    let store = InMemoryObjectStore::new();
    let mesh = mesh();
    let descriptor = ServiceDescriptor::for_workload(&mesh, "edge");

    reconcile(&store, &descriptor, &mesh).await.unwrap();
    let before: Service = store.peek(&descriptor.key()).await.unwrap();

    let outcome = reconcile(&store, &descriptor, &mesh).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unchanged);
    assert_eq!(
        store.stats(),
        StoreStats {
            gets: 2,
            creates: 1,
            updates: 0
        }
    );
    let after: Service = store.peek(&descriptor.key()).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_drift_is_mutated_in_place() {
    let store = InMemoryObjectStore::new();
    let mut mesh = mesh();
    let descriptor = DeploymentDescriptor::for_workload(&mesh, "edge");
    reconcile(&store, &descriptor, &mesh).await.unwrap();
    let created: Deployment = store.peek(&descriptor.key()).await.unwrap();

    // Someone else adds a label; the desired replica count changes.
    let mut edited = created.clone();
    edited
        .metadata
        .labels
        .insert("team".to_string(), "edge".to_string());
    store.update(&edited).await.unwrap();
    mesh.replicas = 3;

    let outcome = reconcile(&store, &descriptor, &mesh).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated);

    let updated: Deployment = store.peek(&descriptor.key()).await.unwrap();
    assert_eq!(updated.spec.replicas, 3);
    assert_eq!(updated.metadata.uid, created.metadata.uid);
    assert_eq!(
        updated.metadata.labels.get("team").map(String::as_str),
        Some("edge")
    );
    assert_ne!(
        updated.metadata.resource_version,
        created.metadata.resource_version
    );
}

#[tokio::test]
async fn test_role_binding_keeps_foreign_subjects() {
    let store = InMemoryObjectStore::new();
    let mut mesh = mesh();
    let descriptor = RoleBindingDescriptor::for_mesh(&mesh);
    reconcile(&store, &descriptor, &mesh).await.unwrap();

    let mut binding: RoleBinding = store.peek(&descriptor.key()).await.unwrap();
    binding.subjects.push(meshward::domain::models::resources::Subject {
        kind: "User".to_string(),
        name: "ops".to_string(),
        namespace: String::new(),
    });
    store.update(&binding).await.unwrap();

    mesh.watch_namespaces.push("apps".to_string());
    let outcome = reconcile(&store, &descriptor, &mesh).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated);

    let binding: RoleBinding = store.peek(&descriptor.key()).await.unwrap();
    let namespaces: Vec<&str> = binding
        .subjects
        .iter()
        .map(|s| s.namespace.as_str())
        .collect();
    assert_eq!(namespaces, vec!["mesh-system", "", "apps"]);
}

/// Store whose reads always fail with a backend error.
struct UnavailableStore;

#[async_trait]
impl ObjectStore for UnavailableStore {
    async fn get<O: ManagedObject>(&self, _: &ObjectKey, _: &mut O) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    async fn create<O: ManagedObject>(&self, _: &O) -> Result<O, StoreError> {
        panic!("create must not be called after a failed read")
    }

    async fn update<O: ManagedObject>(&self, _: &O) -> Result<O, StoreError> {
        panic!("update must not be called after a failed read")
    }
}

#[tokio::test]
async fn test_store_errors_are_returned_unchanged() {
    let mesh = mesh();
    let err = reconcile(
        &UnavailableStore,
        &ServiceAccountDescriptor::for_mesh(&mesh),
        &mesh,
    )
    .await
    .unwrap_err();

    assert_eq!(err, StoreError::Backend("connection reset".to_string()));
}

#[tokio::test]
async fn test_pass_stops_at_first_error() {
    let mesh = mesh();
    let mut pass = ReconcilePass::new(&UnavailableStore, &mesh);
    let result = pass.run(&ServiceAccountDescriptor::for_mesh(&mesh)).await;
    assert!(result.is_err());
    assert!(!pass.finish().changed());
}

#[tokio::test]
async fn test_reconcile_mesh_converges_in_one_pass() {
    let store = InMemoryObjectStore::new();
    let mesh = mesh();
    let workloads = vec!["edge".to_string(), "control".to_string()];

    let first = reconcile_mesh(&store, &mesh, &workloads).await.unwrap();
    assert_eq!(first.created.len(), 6);
    assert!(first.changed());
    assert!(first.created.contains(&"Deployment/mesh-system/m1-control".to_string()));

    let second = reconcile_mesh(&store, &mesh, &workloads).await.unwrap();
    assert!(!second.changed());
    assert_eq!(second.unchanged.len(), 6);
    assert_eq!(store.len().await, 6);
}
