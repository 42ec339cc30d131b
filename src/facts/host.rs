//! Host data sources shared by resolvers

use crate::config::FactsConfig;
use crate::process::{CommandRunner, ExecutionOptions, SystemRunner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Filesystem root that procfs/sysfs/etc paths are read under.
///
/// Always `/` in production; tests point it at a temporary directory laid out
/// like a host image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysRoot {
    root: PathBuf,
}

impl SysRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn host() -> Self {
        Self::new("/")
    }

    /// Maps an absolute host path under this root.
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }

    /// Reads a file, treating any failure as "unavailable".
    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        let full = self.path(&path);
        match fs::read_to_string(&full) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("{}: {e}", full.display());
                None
            }
        }
    }

    /// Reads a file and trims surrounding whitespace.
    pub fn read_trimmed(&self, path: impl AsRef<Path>) -> Option<String> {
        self.read(path).map(|content| content.trim().to_string())
    }

    /// Calls `callback` for each line until it returns `false`.
    ///
    /// Returns `false` when the file could not be read.
    pub fn each_line<F>(&self, path: impl AsRef<Path>, mut callback: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        let Some(content) = self.read(path) else {
            return false;
        };
        for line in content.lines() {
            if !callback(line) {
                break;
            }
        }
        true
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.path(path).exists()
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        self.path(path).is_file()
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.path(path).is_dir()
    }

    /// True when the directory is missing or has no entries.
    pub fn is_empty_dir(&self, path: impl AsRef<Path>) -> bool {
        fs::read_dir(self.path(path))
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

impl Default for SysRoot {
    fn default() -> Self {
        Self::host()
    }
}

/// `uname(2)` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uname {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

impl Uname {
    #[cfg(unix)]
    pub fn current() -> Option<Self> {
        match nix::sys::utsname::uname() {
            Ok(uts) => Some(Self {
                sysname: uts.sysname().to_string_lossy().into_owned(),
                nodename: uts.nodename().to_string_lossy().into_owned(),
                release: uts.release().to_string_lossy().into_owned(),
                version: uts.version().to_string_lossy().into_owned(),
                machine: uts.machine().to_string_lossy().into_owned(),
            }),
            Err(e) => {
                debug!("uname failed: {e}");
                None
            }
        }
    }

    #[cfg(not(unix))]
    pub fn current() -> Option<Self> {
        None
    }
}

/// Everything a resolver may consult about the host: the filesystem root,
/// the command runner, command options and `uname` data captured at startup.
#[derive(Clone)]
pub struct HostContext {
    pub root: SysRoot,
    pub runner: Arc<dyn CommandRunner>,
    pub options: ExecutionOptions,
    pub uname: Option<Uname>,
}

impl HostContext {
    pub fn new(root: SysRoot, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root,
            runner,
            options: ExecutionOptions::default(),
            uname: None,
        }
    }

    /// Context for the running host.
    pub fn from_config(config: &FactsConfig) -> Self {
        let root = config
            .root
            .as_ref()
            .map(SysRoot::new)
            .unwrap_or_else(SysRoot::host);

        Self {
            root,
            runner: Arc::new(SystemRunner),
            options: ExecutionOptions::default().with_timeout(Some(config.command_timeout())),
            uname: Uname::current(),
        }
    }

    pub fn with_uname(mut self, uname: Uname) -> Self {
        self.uname = Some(uname);
        self
    }

    /// Runs a command with the context's options and returns its trimmed
    /// output, or `None` when it is missing, fails or prints nothing.
    pub fn command_output(&self, command: &str, args: &[&str]) -> Option<String> {
        match self.runner.execute(command, args, &self.options) {
            Ok(result) if result.success && !result.output.is_empty() => Some(result.output),
            Ok(_) => None,
            Err(e) => {
                debug!("{command}: {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("uname", &self.uname)
            .finish()
    }
}
