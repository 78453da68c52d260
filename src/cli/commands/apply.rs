//! Implementation of the `meshward apply` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::time::timeout_at;
use tracing::info;

use super::{deadline_after, settle, Engine, Settled, TenantArgs};
use crate::adapters::bundle::BundleFileRenderer;
use crate::cli::output::{bullet_section, output, CommandOutput};
use crate::domain::models::{Config, Revision};
use crate::domain::ports::ObjectRenderer;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory holding `<workload>.json` bundles
    #[arg(long, short = 'd')]
    pub bundle_dir: PathBuf,

    /// Workload to render
    #[arg(long, short, default_value = "edge")]
    pub workload: String,

    /// Seconds to wait for every object to be applied
    #[arg(long, default_value = "120")]
    pub wait_secs: u64,
}

#[derive(Debug, serde::Serialize)]
pub struct ApplyOutput {
    pub success: bool,
    pub mesh: String,
    pub workload: String,
    pub dispatched: usize,
    pub unchanged: usize,
    pub skipped: Vec<String>,
    #[serde(flatten)]
    pub settled: Settled,
    pub missing: Vec<Revision>,
}

impl CommandOutput for ApplyOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Applied {}/{} object(s) for workload '{}' on mesh {}",
            self.settled.succeeded.len(),
            self.dispatched,
            self.workload,
            self.mesh
        )];
        if self.unchanged > 0 {
            lines.push(format!("{} object(s) already up to date", self.unchanged));
        }
        if self.settled.failed_attempts > 0 {
            lines.push(format!(
                "{} failed attempt(s) were retried",
                self.settled.failed_attempts
            ));
        }
        lines.extend(bullet_section("Skipped", &self.skipped));
        lines.extend(bullet_section("Still pending", &self.settled.pending));
        lines.extend(bullet_section("Missing for mesh", &self.missing));
        lines.join("\n")
    }
}

pub async fn execute(args: ApplyArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mesh = args.tenant.to_mesh();
    let bundle = BundleFileRenderer::new(&args.bundle_dir)
        .render(&mesh, &args.workload)
        .context("Failed to render bundle")?;

    let engine = Engine::new(config);
    let client = engine.client(&mesh).await?;
    let deadline = deadline_after(args.wait_secs);

    info!(mesh = %mesh.name, workload = %args.workload, objects = bundle.apply.len(), "applying");

    // Dispatch itself blocks until both queues have bootstrapped.
    let dispatched = timeout_at(
        deadline,
        engine.dispatcher.apply_all(&client, &bundle.apply),
    )
    .await;

    let result = match dispatched {
        Ok(mut report) => {
            let settled = settle(&mut report, deadline).await;
            let missing = engine.cache.missing(&mesh.name).into_iter().collect();
            ApplyOutput {
                success: settled.pending.is_empty() && report.undelivered.is_empty(),
                mesh: mesh.name.clone(),
                workload: args.workload.clone(),
                dispatched: report.dispatched.len(),
                unchanged: report.unchanged.len(),
                skipped: report.skipped,
                settled,
                missing,
            }
        }
        Err(_) => ApplyOutput {
            success: false,
            mesh: mesh.name.clone(),
            workload: args.workload.clone(),
            dispatched: 0,
            unchanged: 0,
            skipped: Vec::new(),
            settled: Settled::default(),
            missing: engine.cache.missing(&mesh.name).into_iter().collect(),
        },
    };

    engine.registry.shutdown().await;
    output(&result, json_mode);

    if !result.success {
        anyhow::bail!(
            "mesh {} did not converge within {}s",
            mesh.name,
            args.wait_secs
        );
    }
    Ok(())
}
