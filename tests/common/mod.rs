#![allow(dead_code)]

use rustle_facts::facts::{HostContext, SysRoot};
use rustle_facts::process::{CommandRunner, ExecutionError, ExecutionOptions, ExecutionResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replays canned output keyed by `"command arg1 arg2"`. Unknown commands
/// behave like a missing executable.
#[derive(Default)]
pub struct ScriptedRunner {
    outputs: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, command_line: &str, output: &str) -> Self {
        self.outputs.insert(
            command_line.to_string(),
            output.lines().map(str::to_string).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn each_line(
        &self,
        command: &str,
        args: &[&str],
        options: &ExecutionOptions,
        callback: &mut dyn FnMut(&str) -> bool,
    ) -> Result<ExecutionResult, ExecutionError> {
        let command_line = std::iter::once(command)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(command_line.clone());

        let Some(lines) = self.outputs.get(&command_line) else {
            if options.throw_on_failure {
                return Err(ExecutionError::NotFound {
                    command: command.to_string(),
                });
            }
            return Ok(ExecutionResult {
                success: false,
                exit_code: None,
                output: String::new(),
            });
        };

        for line in lines {
            if !callback(line) {
                break;
            }
        }
        Ok(ExecutionResult {
            success: true,
            exit_code: Some(0),
            output: String::new(),
        })
    }
}

/// Writes `files` under a fresh temporary root.
pub fn image(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, content) in files {
        write(temp_dir.path(), path, content);
    }
    temp_dir
}

pub fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path.trim_start_matches('/'));
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

pub fn host(root: &TempDir, runner: ScriptedRunner) -> HostContext {
    HostContext::new(SysRoot::new(root.path()), Arc::new(runner))
}
