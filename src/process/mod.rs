//! External process execution
//!
//! Commands are resolved against `PATH` and started directly, never through a
//! shell. Output is streamed line by line to a callback which may stop the
//! child early; an optional timeout kills the child when it runs too long.

pub mod error;
pub mod runner;

pub use error::ExecutionError;
pub use runner::{CommandRunner, SystemRunner};

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How often a finished-output child is polled while waiting on a deadline.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Options controlling a single command execution.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Return an error for missing commands, spawn failures, non-zero exits
    /// and timeouts instead of an unsuccessful result.
    pub throw_on_failure: bool,
    /// Interleave stderr into the captured stream.
    pub merge_stderr: bool,
    /// Trim whitespace from each line and drop blank lines.
    pub trim_output: bool,
    /// Kill the child once this much time has passed.
    pub timeout: Option<Duration>,
    /// Extra environment for the child.
    pub environment: HashMap<String, String>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let mut environment = HashMap::new();
        environment.insert("LC_ALL".to_string(), "C".to_string());
        environment.insert("LANG".to_string(), "C".to_string());

        Self {
            throw_on_failure: false,
            merge_stderr: false,
            trim_output: true,
            timeout: None,
            environment,
        }
    }
}

impl ExecutionOptions {
    pub fn throw_on_failure(mut self) -> Self {
        self.throw_on_failure = true;
        self
    }

    pub fn merge_stderr(mut self) -> Self {
        self.merge_stderr = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of a command that was allowed to fail.
///
/// `output` is only filled by [`execute`]; [`each_line`] hands lines to its
/// callback instead.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output: String,
}

impl ExecutionResult {
    fn failed(exit_code: Option<i32>) -> Self {
        Self {
            success: false,
            exit_code,
            output: String::new(),
        }
    }
}

/// Resolves a command against the executable search path.
///
/// Absolute and relative paths are accepted when they name an executable file.
pub fn which(command: &str) -> Option<PathBuf> {
    which::which(command).ok()
}

/// Runs a command and captures its whole output.
pub fn execute(
    command: &str,
    args: &[&str],
    options: &ExecutionOptions,
) -> Result<ExecutionResult, ExecutionError> {
    let mut lines = Vec::new();
    let mut result = each_line(command, args, options, |line| {
        lines.push(line.to_string());
        true
    })?;
    result.output = lines.join("\n");
    Ok(result)
}

/// Runs a command, passing each output line to `callback`.
///
/// The callback returns `false` to stop reading; the child is then killed and
/// the run still counts as successful.
pub fn each_line<F>(
    command: &str,
    args: &[&str],
    options: &ExecutionOptions,
    mut callback: F,
) -> Result<ExecutionResult, ExecutionError>
where
    F: FnMut(&str) -> bool,
{
    let Some(executable) = which(command) else {
        debug!("{command}: command not found");
        if options.throw_on_failure {
            return Err(ExecutionError::NotFound {
                command: command.to_string(),
            });
        }
        return Ok(ExecutionResult::failed(None));
    };

    let (reader, writer) = std::io::pipe()?;

    let mut cmd = Command::new(&executable);
    cmd.args(args)
        .envs(&options.environment)
        .stdin(Stdio::null());
    if options.merge_stderr {
        cmd.stderr(writer.try_clone()?);
    } else {
        cmd.stderr(Stdio::piped());
    }
    cmd.stdout(writer);

    trace!("executing {} {}", executable.display(), args.join(" "));
    let spawned = cmd.spawn();
    // The command holds copies of the pipe writer; EOF only arrives once they are gone.
    drop(cmd);

    let mut child = match spawned {
        Ok(child) => child,
        Err(source) => {
            debug!("{command}: failed to start: {source}");
            if options.throw_on_failure {
                return Err(ExecutionError::Spawn {
                    command: command.to_string(),
                    source,
                });
            }
            return Ok(ExecutionResult::failed(None));
        }
    };

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    });

    let (sender, receiver) = mpsc::channel::<String>();
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let mut stopped = false;
    let mut timed_out = false;

    loop {
        let received = match deadline {
            Some(deadline) => {
                receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(line) => {
                let line = if options.trim_output {
                    line.trim()
                } else {
                    line.as_str()
                };
                if options.trim_output && line.is_empty() {
                    continue;
                }
                if !callback(line) {
                    stopped = true;
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    drop(receiver);

    let status = if stopped || timed_out {
        let _ = child.kill();
        child.wait()?
    } else {
        match wait_until(&mut child, deadline)? {
            Some(status) => status,
            None => {
                timed_out = true;
                let _ = child.kill();
                child.wait()?
            }
        }
    };

    if timed_out {
        let timeout = options.timeout.unwrap_or_default();
        debug!("{command}: timed out after {timeout:?}");
        if options.throw_on_failure {
            return Err(ExecutionError::Timeout {
                command: command.to_string(),
                timeout,
            });
        }
        return Ok(ExecutionResult::failed(None));
    }

    let stderr = match (stopped, stderr_reader) {
        (false, Some(handle)) => handle.join().unwrap_or_default(),
        _ => String::new(),
    };
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        debug!("{command} stderr: {stderr}");
    }

    let exit_code = status.code();
    let success = stopped || status.success();
    if !success {
        debug!("{command}: exited with code {exit_code:?}");
        if options.throw_on_failure {
            return Err(ExecutionError::Failed {
                command: command.to_string(),
                code: exit_code,
                stderr: stderr.to_string(),
            });
        }
    }

    Ok(ExecutionResult {
        success,
        exit_code,
        output: String::new(),
    })
}

fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_execute_captures_output() {
        let result = execute("echo", &["hello", "world"], &ExecutionOptions::default()).unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.output, "hello world");
    }

    #[test]
    fn test_missing_command_is_unsuccessful() {
        let result = execute(
            "rustle-facts-no-such-command",
            &[],
            &ExecutionOptions::default(),
        )
        .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
    }

    #[test]
    fn test_missing_command_throws_when_requested() {
        let error = execute(
            "rustle-facts-no-such-command",
            &[],
            &ExecutionOptions::default().throw_on_failure(),
        )
        .unwrap_err();
        assert!(matches!(error, ExecutionError::NotFound { .. }));
        assert!(error.is_invocation_failure());
    }

    #[test]
    fn test_arguments_are_not_word_split() {
        let result = execute("echo", &["a  b; echo c"], &ExecutionOptions::default()).unwrap();
        assert_eq!(result.output, "a  b; echo c");
    }
}
