//! Executable fact scripts
//!
//! Any executable file is run without arguments; its output is read as
//! `key=value` lines.

use super::{add_key_value_lines, ExternalFactError, ExternalResolver};
use crate::facts::Collection;
use crate::process::{CommandRunner, ExecutionOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct ExecutionResolver {
    runner: Arc<dyn CommandRunner>,
    options: ExecutionOptions,
}

impl ExecutionResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Option<Duration>) -> Self {
        Self {
            runner,
            options: ExecutionOptions::default()
                .throw_on_failure()
                .with_timeout(timeout),
        }
    }
}

impl ExternalResolver for ExecutionResolver {
    fn name(&self) -> &'static str {
        "executable"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        is_executable(path)
    }

    fn resolve(&self, path: &Path, facts: &mut Collection) -> Result<(), ExternalFactError> {
        let command = path.to_string_lossy();
        run_fact_script(
            self.runner.as_ref(),
            &command,
            &[],
            &self.options,
            path,
            facts,
        )
    }
}

/// Runs a fact script and adds the `key=value` lines it prints.
pub(crate) fn run_fact_script(
    runner: &dyn CommandRunner,
    command: &str,
    args: &[&str],
    options: &ExecutionOptions,
    path: &Path,
    facts: &mut Collection,
) -> Result<(), ExternalFactError> {
    let mut lines = Vec::new();
    runner
        .each_line(command, args, options, &mut |line| {
            lines.push(line.to_string());
            true
        })
        .map_err(|e| ExternalFactError::from_execution(path, e))?;

    add_key_value_lines(path, lines.iter().map(String::as_str), facts);
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    super::has_extension(path, &["exe", "bat", "cmd", "com"])
}
