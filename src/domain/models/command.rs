//! External configuration commands.
//!
//! A [`Command`] is one invocation of the mesh CLI: an argument vector, an
//! optional stdin payload, and two optional extensions:
//!
//! - `modify` rewrites successful output before it is returned or forwarded
//! - `next` chains a follow-up command that receives the (modified) output on
//!   stdin, which is how read-modify-write updates are expressed against an
//!   API with no native patch support
//!
//! `on_complete` fires exactly once per top-level [`Command::run`] with the
//! final result of the whole chain. Hooks on chained links are not invoked.

use std::fmt;
use std::sync::Arc;

use crate::domain::errors::CommandError;
use crate::domain::ports::CommandRunner;

/// Callback receiving the final outcome of a command run.
pub type CompletionHook = Arc<dyn Fn(&Result<String, CommandError>) + Send + Sync>;

/// Pure transform applied to successful output.
pub type OutputTransform = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, CommandError> + Send + Sync>;

/// A configuration action executed through a [`CommandRunner`].
///
/// Commands are cheap to clone; a requeued command is the same value run again.
#[derive(Clone, Default)]
pub struct Command {
    /// Arguments passed to the executable after any bootstrap flags.
    pub arguments: Vec<String>,
    /// Optional payload piped to the executable.
    pub stdin: Option<Vec<u8>>,
    /// Retry this command after a delay when it fails.
    pub requeue: bool,
    on_complete: Option<CompletionHook>,
    modify: Option<OutputTransform>,
    next: Option<Box<Command>>,
}

impl Command {
    /// Command with the given arguments and no stdin, hooks or chain.
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Pipe `stdin` to the executable.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Retry after the client's requeue delay when the command fails.
    #[must_use]
    pub const fn with_requeue(mut self, requeue: bool) -> Self {
        self.requeue = requeue;
        self
    }

    /// Hook called with the final result of the command and its chain.
    #[must_use]
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Result<String, CommandError>) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Transform the output before it is returned or piped to the next command.
    ///
    /// A transform error fails the command.
    #[must_use]
    pub fn modify<F>(mut self, transform: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, CommandError> + Send + Sync + 'static,
    {
        self.modify = Some(Arc::new(transform));
        self
    }

    /// Chain `next` to run with this command's output as its stdin.
    #[must_use]
    pub fn then(mut self, next: Self) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// The command chained after this one, if any.
    pub fn next(&self) -> Option<&Self> {
        self.next.as_deref()
    }

    /// Short human label used in logs, e.g. `apply listener`.
    pub fn action(&self) -> String {
        self.arguments
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command (and any chained links) with `extra_args` prepended.
    ///
    /// Returns the output of the last link that ran. A non-zero exit or a
    /// failing `modify` stops the chain.
    pub async fn run(
        &self,
        runner: &dyn CommandRunner,
        extra_args: &[String],
    ) -> Result<String, CommandError> {
        let result = self.run_chain(runner, extra_args).await;
        if let Some(hook) = &self.on_complete {
            hook(&result);
        }
        result
    }

    async fn run_chain(
        &self,
        runner: &dyn CommandRunner,
        extra_args: &[String],
    ) -> Result<String, CommandError> {
        let mut link = self;
        let mut stdin = self.stdin.clone();

        loop {
            if link.arguments.is_empty() && extra_args.is_empty() {
                return Err(CommandError::EmptyArguments);
            }

            let args: Vec<String> = extra_args
                .iter()
                .chain(link.arguments.iter())
                .cloned()
                .collect();

            let raw = runner.execute(&args, stdin.as_deref()).await?;
            let output = match &link.modify {
                Some(transform) => transform(&raw)?,
                None => raw,
            };

            match link.next.as_deref() {
                Some(next) => {
                    stdin = Some(output);
                    link = next;
                }
                None => return Ok(String::from_utf8_lossy(&output).into_owned()),
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("arguments", &self.arguments)
            .field("stdin_len", &self.stdin.as_ref().map(Vec::len))
            .field("requeue", &self.requeue)
            .field("modify", &self.modify.is_some())
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}
