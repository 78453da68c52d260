//! Implementation of the `meshward remove` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::time::timeout_at;
use tracing::info;

use super::{deadline_after, settle, Engine, Settled, TenantArgs};
use crate::adapters::bundle::BundleFileRenderer;
use crate::cli::output::{bullet_section, output, CommandOutput};
use crate::domain::models::Config;
use crate::domain::ports::{ObjectRenderer, RenderedObject};

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory holding `<workload>.json` bundles
    #[arg(long, short = 'd')]
    pub bundle_dir: PathBuf,

    /// Workload to render
    #[arg(long, short, default_value = "edge")]
    pub workload: String,

    /// Seconds to wait for the control plane to accept the deletes
    #[arg(long, default_value = "60")]
    pub wait_secs: u64,

    /// Also stop tracking the mesh once its objects are deleted
    #[arg(long)]
    pub deregister: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct RemoveOutput {
    pub success: bool,
    pub mesh: String,
    pub workload: String,
    pub dispatched: usize,
    pub skipped: Vec<String>,
    #[serde(flatten)]
    pub settled: Settled,
}

impl CommandOutput for RemoveOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Deleted {}/{} object(s) for workload '{}' on mesh {}",
            self.settled.succeeded.len(),
            self.dispatched,
            self.workload,
            self.mesh
        )];
        lines.extend(bullet_section("Skipped", &self.skipped));
        lines.extend(bullet_section("Failed", &self.settled.failed));
        lines.extend(bullet_section("Still pending", &self.settled.pending));
        lines.join("\n")
    }
}

/// Objects to delete: the bundle's removal list, or its apply list in reverse.
fn removal_order(apply: Vec<RenderedObject>, remove: Vec<RenderedObject>) -> Vec<RenderedObject> {
    if remove.is_empty() {
        apply.into_iter().rev().collect()
    } else {
        remove
    }
}

pub async fn execute(args: RemoveArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mesh = args.tenant.to_mesh();
    let bundle = BundleFileRenderer::new(&args.bundle_dir)
        .render(&mesh, &args.workload)
        .context("Failed to render bundle")?;
    let objects = removal_order(bundle.apply, bundle.remove);

    let engine = Engine::new(config);
    let client = engine.client(&mesh).await?;
    let deadline = deadline_after(args.wait_secs);

    info!(mesh = %mesh.name, workload = %args.workload, objects = objects.len(), "removing");

    let result = match timeout_at(deadline, engine.dispatcher.unapply_all(&client, &objects)).await {
        Ok(mut report) => {
            let settled = settle(&mut report, deadline).await;
            RemoveOutput {
                success: settled.pending.is_empty()
                    && settled.failed.is_empty()
                    && report.undelivered.is_empty(),
                mesh: mesh.name.clone(),
                workload: args.workload.clone(),
                dispatched: report.dispatched.len(),
                skipped: report.skipped,
                settled,
            }
        }
        Err(_) => RemoveOutput {
            success: false,
            mesh: mesh.name.clone(),
            workload: args.workload.clone(),
            dispatched: 0,
            skipped: Vec::new(),
            settled: Settled::default(),
        },
    };

    if args.deregister {
        engine.registry.remove(&mesh.name).await;
    }
    engine.registry.shutdown().await;
    output(&result, json_mode);

    if !result.success {
        anyhow::bail!("not every object of mesh {} was deleted", mesh.name);
    }
    Ok(())
}
