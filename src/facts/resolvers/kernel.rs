//! Kernel facts
//!
//! The pipeline is kernel name -> release -> version -> major version. Each
//! step has a POSIX default in [`KernelSteps`]; platforms override only the
//! steps that differ.

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver, Uname};

pub trait KernelSteps: Send + Sync {
    fn kernel(&self, uname: Option<&Uname>) -> Option<String> {
        uname.map(|u| u.sysname.clone())
    }

    fn release(&self, uname: Option<&Uname>) -> Option<String> {
        uname.map(|u| u.release.clone())
    }

    fn version(&self, release: &str) -> Option<String> {
        Some(release.to_string())
    }

    /// First two dotted components of the version.
    fn major_version(&self, version: &str) -> Option<String> {
        let mut parts = version.split('.');
        let major = parts.next().filter(|major| !major.is_empty())?;
        match parts.next() {
            Some(minor) => Some(format!("{major}.{minor}")),
            None => Some(major.to_string()),
        }
    }
}

/// Plain POSIX behaviour (macOS, Solaris, other Unix).
pub struct PosixKernel;

impl KernelSteps for PosixKernel {}

/// `5.15.0-91-generic` -> `5.15.0`.
pub struct LinuxKernel;

impl KernelSteps for LinuxKernel {
    fn version(&self, release: &str) -> Option<String> {
        release_prefix(release)
    }
}

/// `13.2-RELEASE-p4` -> `13.2`.
pub struct BsdKernel;

impl KernelSteps for BsdKernel {
    fn version(&self, release: &str) -> Option<String> {
        release_prefix(release)
    }
}

/// Hosts without `uname`; only the kernel name is known.
pub struct GenericKernel;

impl KernelSteps for GenericKernel {
    fn kernel(&self, _uname: Option<&Uname>) -> Option<String> {
        Some(std::env::consts::OS.to_string())
    }

    fn release(&self, _uname: Option<&Uname>) -> Option<String> {
        None
    }
}

fn release_prefix(release: &str) -> Option<String> {
    let version = release.split('-').next().unwrap_or(release);
    (!version.is_empty()).then(|| version.to_string())
}

pub struct KernelResolver {
    host: HostContext,
    steps: Box<dyn KernelSteps>,
}

impl KernelResolver {
    pub fn new(host: HostContext, steps: Box<dyn KernelSteps>) -> Self {
        Self { host, steps }
    }
}

impl Resolver for KernelResolver {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn names(&self) -> &[&'static str] {
        &[
            names::KERNEL,
            names::KERNEL_RELEASE,
            names::KERNEL_VERSION,
            names::KERNEL_MAJOR_VERSION,
        ]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        let uname = self.host.uname.as_ref();

        if let Some(kernel) = self.steps.kernel(uname) {
            facts.add(names::KERNEL, kernel);
        }

        let Some(release) = self.steps.release(uname) else {
            return Ok(());
        };

        if let Some(version) = self.steps.version(&release) {
            if let Some(major) = self.steps.major_version(&version) {
                facts.add(names::KERNEL_MAJOR_VERSION, major);
            }
            facts.add(names::KERNEL_VERSION, version);
        }
        facts.add(names::KERNEL_RELEASE, release);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_version_strips_suffix() {
        assert_eq!(
            LinuxKernel.version("5.15.0-91-generic").as_deref(),
            Some("5.15.0")
        );
        assert_eq!(LinuxKernel.major_version("5.15.0").as_deref(), Some("5.15"));
    }

    #[test]
    fn test_bsd_version() {
        assert_eq!(BsdKernel.version("13.2-RELEASE-p4").as_deref(), Some("13.2"));
        assert_eq!(BsdKernel.major_version("13.2").as_deref(), Some("13.2"));
    }

    #[test]
    fn test_posix_version_is_release() {
        assert_eq!(PosixKernel.version("21.6.0").as_deref(), Some("21.6.0"));
        assert_eq!(PosixKernel.major_version("21.6.0").as_deref(), Some("21.6"));
        assert_eq!(PosixKernel.major_version("7").as_deref(), Some("7"));
        assert_eq!(PosixKernel.major_version(""), None);
    }
}
