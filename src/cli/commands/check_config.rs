//! Implementation of the `meshward check-config` command.

use anyhow::Result;
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, KindSpec};

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Also list the revisions expected for this mesh
    #[arg(long)]
    pub mesh: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct CheckConfigOutput {
    pub valid: bool,
    pub executable: String,
    pub bootstrap_interval_secs: u64,
    pub requeue_delay_secs: u64,
    pub kinds: Vec<KindSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_revisions: Option<Vec<String>>,
}

impl CommandOutput for CheckConfigOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            "Configuration is valid".to_string(),
            format!("  executable:          {}", self.executable),
            format!("  bootstrap interval:  {}s", self.bootstrap_interval_secs),
            format!("  requeue delay:       {}s", self.requeue_delay_secs),
            "  kinds:".to_string(),
        ];
        for kind in &self.kinds {
            lines.push(format!(
                "    {:<16} key={:<14} queue={}{}",
                kind.name,
                kind.key_field,
                kind.queue,
                if kind.scoped_delete { " (scoped delete)" } else { "" }
            ));
        }
        if let Some(revisions) = &self.expected_revisions {
            lines.push(format!("  expected revisions ({}):", revisions.len()));
            lines.extend(revisions.iter().map(|r| format!("    {r}")));
        }
        lines.join("\n")
    }
}

/// Validation already happened while loading; this reports what was loaded.
pub async fn execute(args: CheckConfigArgs, config: &Config, json_mode: bool) -> Result<()> {
    let result = CheckConfigOutput {
        valid: true,
        executable: config.executable.clone(),
        bootstrap_interval_secs: config.bootstrap_interval_secs,
        requeue_delay_secs: config.requeue_delay_secs,
        kinds: config.kinds.iter().cloned().collect(),
        expected_revisions: args.mesh.map(|mesh| {
            config
                .revisions
                .expand(&mesh)
                .iter()
                .map(ToString::to_string)
                .collect()
        }),
    };
    output(&result, json_mode);
    Ok(())
}
