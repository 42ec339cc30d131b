//! Command runner seam used by resolvers

use super::{ExecutionError, ExecutionOptions, ExecutionResult};

/// Runs external commands on behalf of resolvers.
///
/// Resolvers hold an `Arc<dyn CommandRunner>` so tests can substitute canned
/// command output for the real system.
pub trait CommandRunner: Send + Sync {
    fn each_line(
        &self,
        command: &str,
        args: &[&str],
        options: &ExecutionOptions,
        callback: &mut dyn FnMut(&str) -> bool,
    ) -> Result<ExecutionResult, ExecutionError>;

    fn execute(
        &self,
        command: &str,
        args: &[&str],
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut lines = Vec::new();
        let mut result = self.each_line(command, args, options, &mut |line| {
            lines.push(line.to_string());
            true
        })?;
        result.output = lines.join("\n");
        Ok(result)
    }
}

/// Runs commands on the local system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn each_line(
        &self,
        command: &str,
        args: &[&str],
        options: &ExecutionOptions,
        callback: &mut dyn FnMut(&str) -> bool,
    ) -> Result<ExecutionResult, ExecutionError> {
        super::each_line(command, args, options, callback)
    }
}
