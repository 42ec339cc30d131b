//! `.ps1` fact scripts, run through Windows PowerShell

use super::execution::run_fact_script;
use super::{has_extension, ExternalFactError, ExternalResolver};
use crate::facts::Collection;
use crate::process::{CommandRunner, ExecutionOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct PowershellResolver {
    runner: Arc<dyn CommandRunner>,
    options: ExecutionOptions,
}

impl PowershellResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Option<Duration>) -> Self {
        Self {
            runner,
            options: ExecutionOptions::default()
                .throw_on_failure()
                .with_timeout(timeout),
        }
    }
}

impl ExternalResolver for PowershellResolver {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        has_extension(path, &["ps1"])
    }

    fn resolve(&self, path: &Path, facts: &mut Collection) -> Result<(), ExternalFactError> {
        let powershell = powershell_command();
        let script = path.to_string_lossy();
        let args = script_arguments(&script);
        run_fact_script(
            self.runner.as_ref(),
            &powershell,
            &args,
            &self.options,
            path,
            facts,
        )
    }
}

/// Arguments that keep banners, profiles and execution policy prompts out of
/// the script's output.
pub fn script_arguments(script: &str) -> Vec<&str> {
    vec![
        "-NoProfile",
        "-NonInteractive",
        "-NoLogo",
        "-ExecutionPolicy",
        "Bypass",
        "-File",
        script,
    ]
}

/// A 32-bit process on 64-bit Windows must go through `sysnative` to reach
/// the 64-bit PowerShell.
fn powershell_command() -> String {
    if let Some(system_root) = std::env::var_os("SYSTEMROOT") {
        let sysnative: PathBuf = [
            PathBuf::from(system_root),
            PathBuf::from("sysnative"),
            PathBuf::from("WindowsPowerShell"),
            PathBuf::from("v1.0"),
            PathBuf::from("powershell.exe"),
        ]
        .iter()
        .collect();
        if sysnative.is_file() {
            return sysnative.to_string_lossy().into_owned();
        }
    }
    "powershell".to_string()
}
