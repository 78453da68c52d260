//! Common test utilities for integration tests
//!
//! Provides a scripted [`CommandRunner`] and small helpers shared across the
//! integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

use meshward::domain::errors::CommandError;
use meshward::domain::models::Command;
use meshward::domain::ports::CommandRunner;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub at: Instant,
}

impl Call {
    pub fn line(&self) -> String {
        self.args.join(" ")
    }

    pub fn stdin_json(&self) -> serde_json::Value {
        self.stdin
            .as_deref()
            .map(|raw| serde_json::from_slice(raw).expect("stdin should be JSON"))
            .unwrap_or_default()
    }
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    failures_left: Option<usize>,
    output: Option<Vec<u8>>,
}

/// Fake mesh CLI.
///
/// Every invocation succeeds with `{}` unless a rule matches. A rule matches
/// when the space-joined arguments contain its pattern; the first matching
/// rule wins.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the first `times` invocations matching `pattern`.
    pub fn fail_times(&self, pattern: &str, times: usize) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            failures_left: Some(times),
            output: None,
        });
        self
    }

    /// Fail every invocation matching `pattern`.
    pub fn always_fail(&self, pattern: &str) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            failures_left: None,
            output: None,
        });
        self
    }

    /// Answer invocations matching `pattern` with `output`.
    pub fn respond(&self, pattern: &str, output: impl Into<Vec<u8>>) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            failures_left: Some(0),
            output: Some(output.into()),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.line().contains(pattern))
            .collect()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.calls_matching(pattern).len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn execute(&self, args: &[String], stdin: Option<&[u8]>) -> Result<Vec<u8>, CommandError> {
        let call = Call {
            args: args.to_vec(),
            stdin: stdin.map(<[u8]>::to_vec),
            at: Instant::now(),
        };
        let line = call.line();
        self.calls.lock().unwrap().push(call);

        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules.iter_mut().find(|r| line.contains(&r.pattern)) else {
            return Ok(b"{}".to_vec());
        };
        match rule.failures_left.as_mut() {
            None => Err(CommandError::Failed(format!("{line}: connection refused"))),
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(CommandError::Failed(format!("{line}: 503 Service Unavailable")))
            }
            Some(_) => Ok(rule.output.clone().unwrap_or_else(|| b"{}".to_vec())),
        }
    }
}

/// Attach a hook to `command` that forwards each result to the returned receiver.
pub fn observed(
    command: Command,
) -> (
    Command,
    mpsc::UnboundedReceiver<Result<String, CommandError>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let command = command.on_complete(move |result: &Result<String, CommandError>| {
        let _ = tx.send(result.clone());
    });
    (command, rx)
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
