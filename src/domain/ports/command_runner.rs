use async_trait::async_trait;

use crate::domain::errors::CommandError;

/// Port for invoking the external configuration executable.
///
/// Implementations run `<program> <args...>` with `stdin` piped when present
/// and return raw stdout on a zero exit status. Any other exit status maps to
/// [`CommandError::Failed`] carrying the combined stdout/stderr text.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, args: &[String], stdin: Option<&[u8]>)
        -> Result<Vec<u8>, CommandError>;
}
