use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::domain::errors::CommandError;
use crate::domain::ports::CommandRunner;

/// Runs commands by spawning the configured executable.
///
/// Stdout is returned on success. On a non-zero exit the error carries
/// stdout followed by stderr, so the caller sees whatever the tool printed.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute(&self, args: &[String], stdin: Option<&[u8]>) -> Result<Vec<u8>, CommandError> {
        trace!(program = %self.program, args = ?args, "spawning");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let pipe = child.stdin.take();
        let write_stdin = async move {
            if let (Some(mut pipe), Some(payload)) = (pipe, stdin) {
                pipe.write_all(payload).await?;
                pipe.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        // Write and read concurrently so a large payload cannot fill both pipes.
        let (written, output) = tokio::join!(write_stdin, child.wait_with_output());
        let output = output.map_err(|e| CommandError::Spawn {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);
            let mut message = String::from_utf8_lossy(&combined).trim_end().to_string();
            if message.is_empty() {
                message = format!("{} exited with {}", self.program, output.status);
            }
            debug!(program = %self.program, status = %output.status, "command exited unsuccessfully");
            return Err(CommandError::Failed(message));
        }

        // A child that exits successfully without reading its input is not an error.
        if let Err(e) = written {
            debug!(program = %self.program, error = %e, "stdin not fully consumed");
        }

        Ok(output.stdout)
    }
}
