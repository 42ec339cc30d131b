//! Operating system facts
//!
//! The base steps derive everything from the kernel facts. Linux replaces the
//! name and release steps with a distribution decision chain over
//! `/etc/os-release` and the distribution release files.

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver, SysRoot};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static VERSION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)*)").expect("valid version regex"));

pub trait OperatingSystemSteps: Send + Sync {
    fn operating_system(&self, _host: &HostContext, facts: &mut Resolution<'_>) -> Option<String> {
        facts.get_str(names::KERNEL).map(str::to_string)
    }

    fn family(&self, facts: &mut Resolution<'_>, os: &str) -> Option<String> {
        match os_family(os) {
            Some(family) => Some(family.to_string()),
            None => facts.get_str(names::KERNEL).map(str::to_string),
        }
    }

    fn release(
        &self,
        _host: &HostContext,
        facts: &mut Resolution<'_>,
        _os: &str,
    ) -> Option<String> {
        facts.get_str(names::KERNEL_RELEASE).map(str::to_string)
    }

    fn major_release(&self, _os: &str, release: &str) -> Option<String> {
        release
            .split(['.', '-'])
            .next()
            .filter(|major| !major.is_empty())
            .map(str::to_string)
    }

    fn hardware_model(&self, host: &HostContext) -> Option<String> {
        match &host.uname {
            Some(uname) if !uname.machine.is_empty() => Some(uname.machine.clone()),
            _ => Some(std::env::consts::ARCH.to_string()),
        }
    }
}

/// Kernel-derived behaviour used by every non-Linux platform.
pub struct BaseOperatingSystem;

impl OperatingSystemSteps for BaseOperatingSystem {}

pub struct LinuxOperatingSystem;

impl OperatingSystemSteps for LinuxOperatingSystem {
    fn operating_system(&self, host: &HostContext, facts: &mut Resolution<'_>) -> Option<String> {
        let root = &host.root;
        check_cumulus_linux(root)
            .or_else(|| check_os_release(root))
            .or_else(|| check_debian_linux(root))
            .or_else(|| check_oracle_linux(root))
            .or_else(|| check_redhat_linux(root))
            .or_else(|| check_suse_linux(root))
            .or_else(|| check_other_linux(root))
            .or_else(|| facts.get_str(names::KERNEL).map(str::to_string))
    }

    fn release(&self, host: &HostContext, facts: &mut Resolution<'_>, os: &str) -> Option<String> {
        let root = &host.root;
        let from_release_file = match os {
            "Debian" => root.read_trimmed("/etc/debian_version"),
            "OracleLinux" => version_in(root, "/etc/oracle-release"),
            "OVS" => version_in(root, "/etc/ovs-release"),
            "Amazon" => version_in(root, "/etc/system-release"),
            "SLES" | "SLED" | "OpenSuSE" | "SuSE" => suse_release(root),
            "Alpine" => root.read_trimmed("/etc/alpine-release"),
            "Gentoo" => version_in(root, "/etc/gentoo-release"),
            "Slackware" => version_in(root, "/etc/slackware-version"),
            os if os_family(os) == Some("RedHat") => version_in(root, "/etc/redhat-release"),
            _ => None,
        };

        from_release_file
            .filter(|release| !release.is_empty())
            .or_else(|| release_value(root, "/etc/os-release", "VERSION_ID"))
            .or_else(|| release_value(root, "/etc/lsb-release", "DISTRIB_RELEASE"))
            .or_else(|| facts.get_str(names::KERNEL_RELEASE).map(str::to_string))
    }

    fn major_release(&self, os: &str, release: &str) -> Option<String> {
        let mut parts = release.split('.');
        let major = parts.next().filter(|major| !major.is_empty())?;
        // Ubuntu releases are named by year and month ("22.04").
        if os == "Ubuntu" {
            if let Some(minor) = parts.next() {
                return Some(format!("{major}.{minor}"));
            }
        }
        Some(major.to_string())
    }
}

pub struct OperatingSystemResolver {
    host: HostContext,
    steps: Box<dyn OperatingSystemSteps>,
}

impl OperatingSystemResolver {
    pub fn new(host: HostContext, steps: Box<dyn OperatingSystemSteps>) -> Self {
        Self { host, steps }
    }
}

impl Resolver for OperatingSystemResolver {
    fn name(&self) -> &'static str {
        "operating system"
    }

    fn names(&self) -> &[&'static str] {
        &[
            names::OPERATING_SYSTEM,
            names::OS_FAMILY,
            names::OPERATING_SYSTEM_RELEASE,
            names::OPERATING_SYSTEM_MAJOR_RELEASE,
            names::HARDWARE_MODEL,
            names::ARCHITECTURE,
        ]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        if let Some(model) = self.steps.hardware_model(&self.host) {
            facts.add(names::HARDWARE_MODEL, model);
        }

        let Some(os) = self.steps.operating_system(&self.host, facts) else {
            return Ok(());
        };

        let family = self.steps.family(facts, &os);
        if let Some(model) = facts.get_str(names::HARDWARE_MODEL).map(str::to_string) {
            facts.add(names::ARCHITECTURE, architecture(family.as_deref(), &model));
        }
        if let Some(family) = family {
            facts.add(names::OS_FAMILY, family);
        }

        if let Some(release) = self.steps.release(&self.host, facts, &os) {
            if let Some(major) = self.steps.major_release(&os, &release) {
                facts.add(names::OPERATING_SYSTEM_MAJOR_RELEASE, major);
            }
            facts.add(names::OPERATING_SYSTEM_RELEASE, release);
        }

        facts.add(names::OPERATING_SYSTEM, os);
        Ok(())
    }
}

/// Maps an operating system name to its family.
pub fn os_family(os: &str) -> Option<&'static str> {
    let family = match os {
        "RedHat" | "Fedora" | "CentOS" | "Scientific" | "SLC" | "Ascendos" | "CloudLinux"
        | "PSBM" | "OracleLinux" | "OVS" | "OEL" | "Amazon" | "XenServer" | "XCP" | "Rocky"
        | "AlmaLinux" => "RedHat",
        "LinuxMint" | "Ubuntu" | "Debian" | "CumulusLinux" => "Debian",
        "SLES" | "SLED" | "OpenSuSE" | "SuSE" => "Suse",
        "Solaris" | "Nexenta" | "OmniOS" | "OpenIndiana" | "SmartOS" => "Solaris",
        "Gentoo" => "Gentoo",
        "Archlinux" | "ManjaroLinux" => "Archlinux",
        "Mandrake" | "Mandriva" | "Mageia" => "Mandrake",
        "Alpine" => "Alpine",
        _ => return None,
    };
    Some(family)
}

fn architecture(family: Option<&str>, hardware_model: &str) -> String {
    match (family, hardware_model) {
        (Some("Debian") | Some("Gentoo"), "x86_64") => "amd64".to_string(),
        (_, "i486" | "i586" | "i686") => "i386".to_string(),
        _ => hardware_model.to_string(),
    }
}

/// Parses `KEY=value` files such as `/etc/os-release` and `/etc/lsb-release`.
pub fn parse_release_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

fn release_value(root: &SysRoot, path: &str, key: &str) -> Option<String> {
    let content = root.read(path)?;
    parse_release_file(&content)
        .remove(key)
        .filter(|value| !value.is_empty())
}

fn version_in(root: &SysRoot, path: &str) -> Option<String> {
    let content = root.read(path)?;
    VERSION_NUMBER
        .captures(&content)
        .map(|captures| captures[1].to_string())
}

fn normalize_distribution(id: &str) -> Option<&'static str> {
    let name = match id.to_lowercase().as_str() {
        "ubuntu" => "Ubuntu",
        "debian" => "Debian",
        "linuxmint" => "LinuxMint",
        "centos" => "CentOS",
        "rhel" | "redhat" => "RedHat",
        "fedora" => "Fedora",
        "ol" => "OracleLinux",
        "amzn" => "Amazon",
        "rocky" => "Rocky",
        "almalinux" => "AlmaLinux",
        "sles" => "SLES",
        "sled" => "SLED",
        "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => "OpenSuSE",
        "arch" => "Archlinux",
        "manjaro" => "ManjaroLinux",
        "alpine" => "Alpine",
        "gentoo" => "Gentoo",
        "cumulus-linux" => "CumulusLinux",
        _ => return None,
    };
    Some(name)
}

fn check_cumulus_linux(root: &SysRoot) -> Option<String> {
    let name = release_value(root, "/etc/os-release", "NAME")?;
    (name == "Cumulus Linux").then(|| "CumulusLinux".to_string())
}

fn check_os_release(root: &SysRoot) -> Option<String> {
    let id = release_value(root, "/etc/os-release", "ID")?;
    normalize_distribution(&id).map(str::to_string)
}

fn check_debian_linux(root: &SysRoot) -> Option<String> {
    if !root.is_file("/etc/debian_version") {
        return None;
    }
    let name = match release_value(root, "/etc/lsb-release", "DISTRIB_ID").as_deref() {
        Some("Ubuntu") => "Ubuntu",
        Some("LinuxMint") => "LinuxMint",
        _ => "Debian",
    };
    Some(name.to_string())
}

fn check_oracle_linux(root: &SysRoot) -> Option<String> {
    if root.is_file("/etc/oracle-release") || root.is_file("/etc/enterprise-release") {
        return Some("OracleLinux".to_string());
    }
    if root.is_file("/etc/ovs-release") {
        return Some("OVS".to_string());
    }
    None
}

fn check_redhat_linux(root: &SysRoot) -> Option<String> {
    const DISTRIBUTIONS: &[(&str, &str)] = &[
        ("centos", "CentOS"),
        ("scientific linux cern", "SLC"),
        ("scientific", "Scientific"),
        ("cloudlinux", "CloudLinux"),
        ("ascendos", "Ascendos"),
        ("xenserver", "XenServer"),
        ("xcp", "XCP"),
        ("parallels server bare metal", "PSBM"),
        ("fedora", "Fedora"),
        ("rocky", "Rocky"),
        ("almalinux", "AlmaLinux"),
    ];

    let content = root.read("/etc/redhat-release")?.to_lowercase();
    let name = DISTRIBUTIONS
        .iter()
        .find(|(needle, _)| content.contains(needle))
        .map(|(_, name)| *name)
        .unwrap_or("RedHat");
    Some(name.to_string())
}

fn check_suse_linux(root: &SysRoot) -> Option<String> {
    let content = root.read("/etc/SuSE-release")?.to_lowercase();
    let name = if content.contains("suse linux enterprise server") {
        "SLES"
    } else if content.contains("suse linux enterprise desktop") {
        "SLED"
    } else if content.contains("opensuse") {
        "OpenSuSE"
    } else {
        "SuSE"
    };
    Some(name.to_string())
}

fn check_other_linux(root: &SysRoot) -> Option<String> {
    const RELEASE_FILES: &[(&str, &str)] = &[
        ("/etc/arch-release", "Archlinux"),
        ("/etc/gentoo-release", "Gentoo"),
        ("/etc/alpine-release", "Alpine"),
        ("/etc/slackware-version", "Slackware"),
        ("/etc/mageia-release", "Mageia"),
        ("/etc/mandriva-release", "Mandriva"),
        ("/etc/mandrake-release", "Mandrake"),
        ("/etc/meego-release", "MeeGo"),
        ("/etc/vmware-release", "VMWareESX"),
        ("/etc/bluewhite64-version", "Bluewhite64"),
        ("/etc/slamd64-version", "Slamd64"),
    ];

    if let Some(name) = RELEASE_FILES
        .iter()
        .find(|(path, _)| root.is_file(path))
        .map(|(_, name)| name.to_string())
    {
        return Some(name);
    }

    root.read("/etc/system-release")
        .filter(|content| content.contains("Amazon"))
        .map(|_| "Amazon".to_string())
}

fn suse_release(root: &SysRoot) -> Option<String> {
    let content = root.read("/etc/SuSE-release")?;
    let mut version = None;
    let mut patch_level = None;
    for line in content.lines() {
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "VERSION" => version = Some(value.trim().to_string()),
                "PATCHLEVEL" => patch_level = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }
    match (version, patch_level) {
        (Some(version), Some(patch_level)) => Some(format!("{version}.{patch_level}")),
        (version, _) => version,
    }
}
