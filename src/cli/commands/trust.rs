//! Implementation of the `meshward trust` command.

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::mpsc;
use tokio::time::timeout_at;

use super::{deadline_after, Engine, TenantArgs};
use crate::cli::output::{output, CommandOutput};
use crate::domain::errors::CommandError;
use crate::domain::models::{Config, QueueKind};
use crate::services::commands;

#[derive(Args, Debug)]
pub struct TrustArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Listener to update
    #[arg(long, short)]
    pub listener: String,

    /// Subject name to trust
    #[arg(long, short)]
    pub subject: String,

    /// Seconds to wait for the listener to be updated
    #[arg(long, default_value = "60")]
    pub wait_secs: u64,
}

#[derive(Debug, serde::Serialize)]
pub struct TrustOutput {
    pub success: bool,
    pub mesh: String,
    pub listener: String,
    pub subject: String,
    pub attempts: usize,
    pub last_error: Option<String>,
}

impl CommandOutput for TrustOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!(
                "Listener {} on mesh {} now trusts {}",
                self.listener, self.mesh, self.subject
            )
        } else {
            format!(
                "Listener {} on mesh {} was not updated after {} attempt(s): {}",
                self.listener,
                self.mesh,
                self.attempts,
                self.last_error.as_deref().unwrap_or("timed out")
            )
        }
    }
}

pub async fn execute(args: TrustArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mesh = args.tenant.to_mesh();
    let engine = Engine::new(config);
    let client = engine.client(&mesh).await?;
    let deadline = deadline_after(args.wait_secs);

    let (tx, mut results) = mpsc::unbounded_channel();
    let command = commands::merge_listener_trust(&args.listener, &args.subject).on_complete(
        move |result: &Result<String, CommandError>| {
            let _ = tx.send(result.as_ref().err().map(ToString::to_string));
        },
    );

    let mut outcome = TrustOutput {
        success: false,
        mesh: mesh.name.clone(),
        listener: args.listener.clone(),
        subject: args.subject.clone(),
        attempts: 0,
        last_error: None,
    };

    let sent = timeout_at(deadline, client.send(QueueKind::Control, command)).await;
    if let Ok(sent) = sent {
        sent.context("Control queue closed")?;
        while let Ok(Some(error)) = timeout_at(deadline, results.recv()).await {
            outcome.attempts += 1;
            match error {
                None => {
                    outcome.success = true;
                    outcome.last_error = None;
                    break;
                }
                Some(error) => outcome.last_error = Some(error),
            }
        }
    }

    engine.registry.shutdown().await;
    output(&outcome, json_mode);

    if !outcome.success {
        anyhow::bail!("listener {} was not updated", args.listener);
    }
    Ok(())
}
