//! Implementation of the `meshward resources` command.
//!
//! Reconciles the tenant's managed resources against an empty in-memory
//! store and prints the objects that result. A second pass is run to show
//! that the descriptors converge.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::TenantArgs;
use crate::adapters::memory::InMemoryObjectStore;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{
    Config, Deployment, DeploymentDescriptor, ManagedObject, ObjectKey, ResourceDescriptor,
    RoleBinding, RoleBindingDescriptor, Service, ServiceAccount, ServiceAccountDescriptor,
    ServiceDescriptor,
};
use crate::services::{reconcile_mesh, ReconcileSummary};

#[derive(Args, Debug)]
pub struct ResourcesArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Proxy image override
    #[arg(long)]
    pub image: Option<String>,

    /// Proxy replicas per workload
    #[arg(long)]
    pub replicas: Option<u32>,

    /// Additional namespace granted access to the mesh (repeatable)
    #[arg(long = "watch-namespace")]
    pub watch_namespaces: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ResourcesOutput {
    pub mesh: String,
    pub first_pass: ReconcileSummary,
    pub second_pass: ReconcileSummary,
    pub objects: Vec<Value>,
}

impl CommandOutput for ResourcesOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Mesh {}: {} created, {} unchanged on second pass",
            self.mesh,
            self.first_pass.created.len(),
            self.second_pass.unchanged.len()
        )];
        for entry in &self.first_pass.created {
            lines.push(format!("  + {entry}"));
        }
        lines.join("\n")
    }
}

async fn collect<O: ManagedObject>(
    store: &InMemoryObjectStore,
    key: &ObjectKey,
    objects: &mut Vec<Value>,
) -> Result<()> {
    if let Some(object) = store.peek::<O>(key).await {
        let mut value = serde_json::to_value(&object)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("kind".to_string(), Value::from(O::KIND));
        }
        objects.push(value);
    }
    Ok(())
}

pub async fn execute(args: ResourcesArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut mesh = args.tenant.to_mesh();
    if let Some(image) = args.image {
        mesh.proxy_image = image;
    }
    if let Some(replicas) = args.replicas {
        mesh.replicas = replicas;
    }
    mesh.watch_namespaces = args.watch_namespaces;

    let workloads: Vec<String> = std::iter::once(config.revisions.edge_workload.clone())
        .chain(config.revisions.system_components.iter().cloned())
        .collect();

    let store = InMemoryObjectStore::new();
    let first_pass = reconcile_mesh(&store, &mesh, &workloads)
        .await
        .context("Failed to reconcile mesh resources")?;
    let second_pass = reconcile_mesh(&store, &mesh, &workloads)
        .await
        .context("Failed to reconcile mesh resources")?;

    let mut objects = Vec::new();
    collect::<ServiceAccount>(
        &store,
        &ServiceAccountDescriptor::for_mesh(&mesh).key(),
        &mut objects,
    )
    .await?;
    collect::<RoleBinding>(
        &store,
        &RoleBindingDescriptor::for_mesh(&mesh).key(),
        &mut objects,
    )
    .await?;
    for workload in &workloads {
        collect::<Deployment>(
            &store,
            &DeploymentDescriptor::for_workload(&mesh, workload).key(),
            &mut objects,
        )
        .await?;
        collect::<Service>(
            &store,
            &ServiceDescriptor::for_workload(&mesh, workload).key(),
            &mut objects,
        )
        .await?;
    }

    let result = ResourcesOutput {
        mesh: mesh.name.clone(),
        first_pass,
        second_pass,
        objects,
    };
    output(&result, json_mode);
    Ok(())
}
