//! External facts loaded from fact directories
//!
//! Every regular file directly inside a fact directory is handed to the first
//! [`ExternalResolver`] that accepts it. Files are visited in file-name
//! order so later files win when two define the same fact.

pub mod execution;
pub mod json;
pub mod powershell;
pub mod text;
pub mod yaml;

pub use execution::ExecutionResolver;
pub use json::JsonResolver;
pub use powershell::PowershellResolver;
pub use text::TextResolver;
pub use yaml::YamlResolver;

use super::platform::Platform;
use super::{Collection, HostContext};
use crate::process::ExecutionError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};
use walkdir::WalkDir;

#[derive(thiserror::Error, Debug)]
pub enum ExternalFactError {
    #[error("{path}: could not run fact script: {source}")]
    NotInvoked {
        path: String,
        #[source]
        source: ExecutionError,
    },

    #[error("{path}: fact script failed: {source}")]
    ScriptFailed {
        path: String,
        #[source]
        source: ExecutionError,
    },

    #[error("{path}: {message}")]
    Parse { path: String, message: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExternalFactError {
    pub(crate) fn from_execution(path: &Path, source: ExecutionError) -> Self {
        let path = path.display().to_string();
        if source.is_invocation_failure() {
            Self::NotInvoked { path, source }
        } else {
            Self::ScriptFailed { path, source }
        }
    }

    pub(crate) fn parse(path: &Path, message: impl ToString) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Turns one kind of fact file into facts.
pub trait ExternalResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_resolve(&self, path: &Path) -> bool;

    fn resolve(&self, path: &Path, facts: &mut Collection) -> Result<(), ExternalFactError>;
}

/// The external resolvers in dispatch order.
#[derive(Default)]
pub struct ExternalFacts {
    resolvers: Vec<Box<dyn ExternalResolver>>,
}

impl ExternalFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl ExternalResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Resolvers available on `platform`. Scripts run with `timeout`.
    pub fn for_platform(platform: Platform, host: &HostContext, timeout: Option<Duration>) -> Self {
        let external = Self::new()
            .with(TextResolver)
            .with(JsonResolver)
            .with(YamlResolver);

        let external = if platform == Platform::Windows {
            external.with(PowershellResolver::new(host.runner.clone(), timeout))
        } else {
            external
        };

        external.with(ExecutionResolver::new(host.runner.clone(), timeout))
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Loads every fact file found directly inside `directories`.
    ///
    /// Missing directories are skipped; a file that fails to load is logged
    /// and the scan continues.
    pub fn load(&self, directories: &[PathBuf], facts: &mut Collection) {
        for directory in directories {
            if !directory.is_dir() {
                debug!("{}: external fact directory not found", directory.display());
                continue;
            }

            let entries = WalkDir::new(directory)
                .min_depth(1)
                .max_depth(1)
                .follow_links(true)
                .sort_by_file_name();

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("{}: {e}", directory.display());
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                self.load_file(entry.path(), facts);
            }
        }
    }

    fn load_file(&self, path: &Path, facts: &mut Collection) {
        let Some(resolver) = self
            .resolvers
            .iter()
            .find(|resolver| resolver.can_resolve(path))
        else {
            debug!("{}: no external fact resolver accepts this file", path.display());
            return;
        };

        debug!(
            "loading external facts from {} with the {} resolver",
            path.display(),
            resolver.name()
        );
        if let Err(e) = resolver.resolve(path, facts) {
            error!("{e}");
        }
    }
}

/// Parses a `key=value` line. Keys are lower-cased; the value is everything
/// after the first `=`, untouched.
pub fn parse_key_value(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), value))
}

/// Adds facts from `key=value` lines, skipping anything else.
pub(crate) fn add_key_value_lines<'a>(
    path: &Path,
    lines: impl IntoIterator<Item = &'a str>,
    facts: &mut Collection,
) {
    for line in lines {
        match parse_key_value(line) {
            Some((key, value)) => facts.add(key, value),
            None => debug!("{}: ignoring line without a key: {line}", path.display()),
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extensions
                .iter()
                .any(|candidate| extension.eq_ignore_ascii_case(candidate))
        })
}
