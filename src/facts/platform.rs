//! Platform detection and the per-platform resolver set
//!
//! The platform is decided once at startup. Each fact domain gets exactly one
//! strategy for it; nothing re-dispatches afterwards.

use super::resolvers::kernel::{BsdKernel, GenericKernel, KernelSteps, LinuxKernel, PosixKernel};
use super::resolvers::networking::{
    BaseNetworking, BsdNetworking, LinuxNetworking, NetworkingSteps,
};
use super::resolvers::operating_system::{
    BaseOperatingSystem, LinuxOperatingSystem, OperatingSystemSteps,
};
use super::resolvers::virtualization::{HypervisorDetector, LinuxHypervisor, NoHypervisor};
use super::resolvers::{
    DmiResolver, KernelResolver, MemoryResolver, NetworkingResolver, OperatingSystemResolver,
    ProcessorResolver, VirtualizationResolver,
};
use super::{HostContext, ResolverRegistry};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    FreeBsd,
    OpenBsd,
    NetBsd,
    MacOs,
    Windows,
    OtherUnix,
    Other,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "freebsd") {
            Self::FreeBsd
        } else if cfg!(target_os = "openbsd") {
            Self::OpenBsd
        } else if cfg!(target_os = "netbsd") {
            Self::NetBsd
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(unix) {
            Self::OtherUnix
        } else {
            Self::Other
        }
    }

    pub fn is_bsd(self) -> bool {
        matches!(self, Self::FreeBsd | Self::OpenBsd | Self::NetBsd)
    }

    fn kernel_steps(self) -> Box<dyn KernelSteps> {
        match self {
            Self::Linux => Box::new(LinuxKernel),
            platform if platform.is_bsd() => Box::new(BsdKernel),
            Self::MacOs | Self::OtherUnix => Box::new(PosixKernel),
            _ => Box::new(GenericKernel),
        }
    }

    fn operating_system_steps(self) -> Box<dyn OperatingSystemSteps> {
        match self {
            Self::Linux => Box::new(LinuxOperatingSystem),
            _ => Box::new(BaseOperatingSystem),
        }
    }

    fn networking_steps(self) -> Box<dyn NetworkingSteps> {
        match self {
            Self::Linux => Box::new(LinuxNetworking),
            Self::MacOs => Box::new(BsdNetworking),
            platform if platform.is_bsd() => Box::new(BsdNetworking),
            _ => Box::new(BaseNetworking),
        }
    }

    fn hypervisor_detector(self) -> Box<dyn HypervisorDetector> {
        match self {
            Self::Linux => Box::new(LinuxHypervisor),
            _ => Box::new(NoHypervisor),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linux => "linux",
            Self::FreeBsd => "freebsd",
            Self::OpenBsd => "openbsd",
            Self::NetBsd => "netbsd",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::OtherUnix => "unix",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Builds the resolver set for `platform`, in registration order.
///
/// Virtualization comes last since it reads DMI facts.
pub fn default_registry(platform: Platform, host: &HostContext) -> ResolverRegistry {
    let mut registry = ResolverRegistry::new()
        .with(KernelResolver::new(host.clone(), platform.kernel_steps()))
        .with(OperatingSystemResolver::new(
            host.clone(),
            platform.operating_system_steps(),
        ))
        .with(NetworkingResolver::new(host.clone(), platform.networking_steps()));

    if platform == Platform::Linux {
        registry.register(DmiResolver::new(host.clone()));
        registry.register(MemoryResolver::new(host.clone()));
    }

    registry
        .with(ProcessorResolver::new(host.clone()))
        .with(VirtualizationResolver::new(
            host.clone(),
            platform.hypervisor_detector(),
        ))
}
