//! Virtualization facts
//!
//! `virtual` names the hypervisor or container technology the host runs
//! under, `physical` when nothing was detected. Detection is a platform
//! strategy ([`HypervisorDetector`]); only Linux has one.

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver, SysRoot};
use tracing::debug;

/// Canonical `virtual` values.
pub mod vm {
    pub const DOCKER: &str = "docker";
    pub const LXC: &str = "lxc";
    pub const GCE: &str = "gce";
    pub const XEN_HARDWARE: &str = "xenhvm";
    pub const XEN_PRIVILEGED: &str = "xen0";
    pub const XEN_UNPRIVILEGED: &str = "xenu";
    pub const ZLINUX: &str = "zlinux";
    pub const VSERVER: &str = "vserver";
    pub const VSERVER_HOST: &str = "vserver_host";
    pub const OPENVZ_HN: &str = "openvzhn";
    pub const OPENVZ_VE: &str = "openvzve";
    pub const VMWARE: &str = "vmware";
    pub const VMWARE_SERVER: &str = "vmware_server";
    pub const VMWARE_WORKSTATION: &str = "vmware_workstation";
    pub const VIRTUALBOX: &str = "virtualbox";
    pub const PARALLELS: &str = "parallels";
    pub const KVM: &str = "kvm";
    pub const HYPERV: &str = "hyperv";
    pub const REDHAT_EV: &str = "rhev";
    pub const OVIRT: &str = "ovirt";
    pub const PHYSICAL: &str = "physical";
}

/// Product name substrings of known virtual machines; first match wins.
const PRODUCT_NAMES: &[(&str, &str)] = &[
    ("VMware", vm::VMWARE),
    ("VirtualBox", vm::VIRTUALBOX),
    ("Parallels", vm::PARALLELS),
    ("KVM", vm::KVM),
    ("Virtual Machine", vm::HYPERV),
    ("RHEV Hypervisor", vm::REDHAT_EV),
    ("oVirt Node", vm::OVIRT),
    ("HVM domU", vm::XEN_HARDWARE),
];

pub trait HypervisorDetector: Send + Sync {
    fn hypervisor(&self, host: &HostContext, facts: &mut Resolution<'_>) -> Option<String>;
}

/// Platforms without detection support report `physical`.
pub struct NoHypervisor;

impl HypervisorDetector for NoHypervisor {
    fn hypervisor(&self, _host: &HostContext, _facts: &mut Resolution<'_>) -> Option<String> {
        None
    }
}

/// Ordered fallback chain; the first check with an answer wins.
pub struct LinuxHypervisor;

impl HypervisorDetector for LinuxHypervisor {
    fn hypervisor(&self, host: &HostContext, facts: &mut Resolution<'_>) -> Option<String> {
        cgroup_vm(&host.root)
            .or_else(|| gce_vm(facts))
            .or_else(|| what_vm(host))
            .or_else(|| vmware_vm(host))
            .or_else(|| openvz_vm(&host.root))
            .or_else(|| vserver_vm(&host.root))
            .or_else(|| xen_vm(&host.root))
            .or_else(|| product_name_vm(facts))
    }
}

/// Docker and LXC from the control group path of PID 1.
pub fn cgroup_vm(root: &SysRoot) -> Option<String> {
    let mut value = None;
    root.each_line("/proc/1/cgroup", |line| {
        let mut parts = line.splitn(3, ':');
        let Some(path) = parts.nth(2) else {
            return true;
        };
        if path.starts_with("/docker/") {
            value = Some(vm::DOCKER.to_string());
            return false;
        }
        if path.starts_with("/lxc/") {
            value = Some(vm::LXC.to_string());
            return false;
        }
        true
    });
    value
}

pub fn gce_vm(facts: &mut Resolution<'_>) -> Option<String> {
    facts
        .get_str(names::BIOS_VENDOR)
        .filter(|vendor| vendor.contains("Google"))
        .map(|_| vm::GCE.to_string())
}

/// Asks `virt-what` and normalizes its answer.
pub fn what_vm(host: &HostContext) -> Option<String> {
    let mut value = None;
    let result = host
        .runner
        .each_line("virt-what", &[], &host.options, &mut |line| {
            // Some versions print their own warnings on stdout.
            if line.starts_with("virt-what:") {
                return true;
            }
            value = Some(line.to_string());
            false
        });
    if let Err(e) = result {
        debug!("virt-what: {e}");
    }

    let value = value?.to_lowercase();
    match value.as_str() {
        "linux_vserver" => vserver_vm(&host.root),
        "xen-hvm" => Some(vm::XEN_HARDWARE.to_string()),
        "xen-dom0" => Some(vm::XEN_PRIVILEGED.to_string()),
        "xen-domu" => Some(vm::XEN_UNPRIVILEGED.to_string()),
        "ibm_systemz" => Some(vm::ZLINUX.to_string()),
        _ => Some(value),
    }
}

/// `vmware -v` prints e.g. `VMware Workstation 17.0.0 build-...`.
pub fn vmware_vm(host: &HostContext) -> Option<String> {
    let output = host.command_output("vmware", &["-v"])?;
    let mut parts = output.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(vendor), Some(product)) => Some(format!("{vendor}_{product}").to_lowercase()),
        _ => None,
    }
}

/// OpenVZ hardware node or container, skipping CloudLinux LVE hosts.
///
/// Without an `envID` entry the process runs on the hardware node.
pub fn openvz_vm(root: &SysRoot) -> Option<String> {
    if !root.is_dir("/proc/vz") || root.is_file("/proc/lve/list") || root.is_empty_dir("/proc/vz")
    {
        return None;
    }
    status_role(root, &["envID"], vm::OPENVZ_HN, vm::OPENVZ_VE)
        .or_else(|| Some(vm::OPENVZ_HN.to_string()))
}

/// Linux-VServer host or guest.
pub fn vserver_vm(root: &SysRoot) -> Option<String> {
    status_role(root, &["s_context", "VxID"], vm::VSERVER_HOST, vm::VSERVER)
}

/// Reads the first of `keys` from `/proc/self/status`; context `0` is the host.
fn status_role(root: &SysRoot, keys: &[&str], host: &str, guest: &str) -> Option<String> {
    let mut value = None;
    root.each_line("/proc/self/status", |line| {
        let Some((key, id)) = line.split_once(':') else {
            return true;
        };
        if !keys.contains(&key.trim()) {
            return true;
        }
        let role = if id.trim() == "0" { host } else { guest };
        value = Some(role.to_string());
        false
    });
    value
}

pub fn xen_vm(root: &SysRoot) -> Option<String> {
    if !root.exists("/proc/sys/xen") && !root.exists("/sys/bus/xen") && !root.exists("/proc/xen")
    {
        return None;
    }
    if root.exists("/dev/xen/evtchn") {
        return Some(vm::XEN_PRIVILEGED.to_string());
    }
    if root.exists("/proc/xen") {
        return Some(vm::XEN_UNPRIVILEGED.to_string());
    }
    None
}

pub fn product_name_vm(facts: &mut Resolution<'_>) -> Option<String> {
    let product_name = facts.get_str(names::PRODUCT_NAME)?;
    PRODUCT_NAMES
        .iter()
        .find(|(needle, _)| product_name.contains(needle))
        .map(|(_, vm)| vm.to_string())
}

/// False for bare metal and for the host side of a virtualization technology.
pub fn is_virtual(hypervisor: &str) -> bool {
    !matches!(
        hypervisor,
        vm::PHYSICAL
            | vm::XEN_PRIVILEGED
            | vm::VMWARE_SERVER
            | vm::VMWARE_WORKSTATION
            | vm::OPENVZ_HN
            | vm::VSERVER_HOST
    )
}

pub struct VirtualizationResolver {
    host: HostContext,
    detector: Box<dyn HypervisorDetector>,
}

impl VirtualizationResolver {
    pub fn new(host: HostContext, detector: Box<dyn HypervisorDetector>) -> Self {
        Self { host, detector }
    }
}

impl Resolver for VirtualizationResolver {
    fn name(&self) -> &'static str {
        "virtualization"
    }

    fn names(&self) -> &[&'static str] {
        &[names::VIRTUAL, names::IS_VIRTUAL]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        let hypervisor = self
            .detector
            .hypervisor(&self.host, facts)
            .filter(|hypervisor| !hypervisor.is_empty())
            .unwrap_or_else(|| vm::PHYSICAL.to_string());

        debug!("detected virtualization: {hypervisor}");
        facts.add(names::IS_VIRTUAL, is_virtual(&hypervisor));
        facts.add(names::VIRTUAL, hypervisor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &TempDir, path: &str, content: &str) {
        let full = root.path().join(path.trim_start_matches('/'));
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_cgroup_docker_and_lxc() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "/proc/1/cgroup",
            "12:pids:/\n11:memory:/docker/0123456789abcdef\n",
        );
        assert_eq!(cgroup_vm(&SysRoot::new(temp_dir.path())).as_deref(), Some("docker"));

        write(&temp_dir, "/proc/1/cgroup", "1:name=systemd:/lxc/web01\n");
        assert_eq!(cgroup_vm(&SysRoot::new(temp_dir.path())).as_deref(), Some("lxc"));

        write(&temp_dir, "/proc/1/cgroup", "0::/init.scope\n");
        assert_eq!(cgroup_vm(&SysRoot::new(temp_dir.path())), None);
    }

    #[test]
    fn test_openvz_roles() {
        let temp_dir = TempDir::new().unwrap();
        let root = SysRoot::new(temp_dir.path());
        assert_eq!(openvz_vm(&root), None);

        write(&temp_dir, "/proc/vz/veinfo", "");
        write(&temp_dir, "/proc/self/status", "Name:\tcat\nenvID:\t0\n");
        assert_eq!(openvz_vm(&root).as_deref(), Some("openvzhn"));

        write(&temp_dir, "/proc/self/status", "Name:\tcat\nenvID:\t101\n");
        assert_eq!(openvz_vm(&root).as_deref(), Some("openvzve"));

        write(&temp_dir, "/proc/lve/list", "");
        assert_eq!(openvz_vm(&root), None);
    }

    #[test]
    fn test_openvz_without_env_id_is_hardware_node() {
        let temp_dir = TempDir::new().unwrap();
        let root = SysRoot::new(temp_dir.path());
        write(&temp_dir, "/proc/vz/veinfo", "");
        write(&temp_dir, "/proc/self/status", "Name:\tcat\n");
        assert_eq!(openvz_vm(&root).as_deref(), Some("openvzhn"));

        fs::remove_file(temp_dir.path().join("proc/self/status")).unwrap();
        assert_eq!(openvz_vm(&root).as_deref(), Some("openvzhn"));
    }

    #[test]
    fn test_vserver_roles() {
        let temp_dir = TempDir::new().unwrap();
        let root = SysRoot::new(temp_dir.path());
        write(&temp_dir, "/proc/self/status", "VxID:\t0\n");
        assert_eq!(vserver_vm(&root).as_deref(), Some("vserver_host"));

        write(&temp_dir, "/proc/self/status", "s_context:\t40000\n");
        assert_eq!(vserver_vm(&root).as_deref(), Some("vserver"));

        write(&temp_dir, "/proc/self/status", "Name:\tcat\n");
        assert_eq!(vserver_vm(&root), None);
    }

    #[test]
    fn test_xen_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = SysRoot::new(temp_dir.path());
        assert_eq!(xen_vm(&root), None);

        fs::create_dir_all(temp_dir.path().join("proc/xen")).unwrap();
        assert_eq!(xen_vm(&root).as_deref(), Some("xenu"));

        write(&temp_dir, "/dev/xen/evtchn", "");
        assert_eq!(xen_vm(&root).as_deref(), Some("xen0"));
    }

    #[test]
    fn test_is_virtual() {
        assert!(!is_virtual("physical"));
        assert!(!is_virtual("xen0"));
        assert!(!is_virtual("openvzhn"));
        assert!(is_virtual("docker"));
        assert!(is_virtual("kvm"));
        assert!(is_virtual("vmware"));
    }
}
