//! Networking facts
//!
//! Host name and domain come from the base steps on every platform. Interface
//! enumeration and the primary interface are platform overrides: `ip addr
//! show` and `/proc/net/route` on Linux, `ifconfig` and `route -n get default`
//! on the BSDs and macOS.

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;
use tracing::debug;

static INTERFACE_FACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(ipaddress|ipaddress6|macaddress|netmask|network|mtu)_.+$")
        .expect("valid interface fact regex")
});

static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9a-fA-F]{2}[:-]){5}[0-9a-fA-F]{2}$").expect("valid mac address regex")
});

static IFCONFIG_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s:]+(?::\d+)?): flags=").expect("valid ifconfig header regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Binding {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl Ipv4Binding {
    pub fn network(&self) -> Ipv4Addr {
        calculate_network(self.address, self.netmask)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub loopback: bool,
    pub ipv4: Option<Ipv4Binding>,
    pub ipv6: Option<String>,
    pub macaddress: Option<String>,
    pub mtu: Option<i64>,
}

impl Interface {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn set_ipv6(&mut self, address: &str) {
        let address = address.split(['/', '%']).next().unwrap_or(address);
        // Link-local addresses are only kept while nothing better is known.
        let replace = match &self.ipv6 {
            None => true,
            Some(current) => current.starts_with("fe80") && !address.starts_with("fe80"),
        };
        if replace {
            self.ipv6 = Some(address.to_string());
        }
    }
}

pub trait NetworkingSteps: Send + Sync {
    /// Host name as reported by the system, possibly fully qualified.
    fn hostname(&self, host: &HostContext) -> Option<String> {
        if let Some(uname) = &host.uname {
            if !uname.nodename.is_empty() {
                return Some(uname.nodename.clone());
            }
        }
        match hostname::get() {
            Ok(name) => name.into_string().ok().filter(|name| !name.is_empty()),
            Err(e) => {
                debug!("hostname lookup failed: {e}");
                None
            }
        }
    }

    /// Domain from `/etc/resolv.conf`, used when the host name is not
    /// fully qualified.
    fn resolver_domain(&self, host: &HostContext) -> Option<String> {
        let mut domain = None;
        let mut search = None;
        host.root.each_line("/etc/resolv.conf", |line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("domain"), Some(value)) => domain = Some(value.to_string()),
                (Some("search"), Some(value)) if search.is_none() => {
                    search = Some(value.to_string())
                }
                _ => {}
            }
            true
        });
        domain.or(search)
    }

    fn interfaces(&self, _host: &HostContext) -> Vec<Interface> {
        Vec::new()
    }

    /// Name of the interface carrying the default route.
    fn primary_interface(&self, _host: &HostContext, interfaces: &[Interface]) -> Option<String> {
        first_routable(interfaces)
    }
}

/// Host name and domain only.
pub struct BaseNetworking;

impl NetworkingSteps for BaseNetworking {}

pub struct LinuxNetworking;

impl NetworkingSteps for LinuxNetworking {
    fn interfaces(&self, host: &HostContext) -> Vec<Interface> {
        let mut lines = Vec::new();
        let result = host
            .runner
            .each_line("ip", &["addr", "show"], &host.options, &mut |line| {
                lines.push(line.to_string());
                true
            });
        match result {
            Ok(result) if result.success => parse_ip_addr(&lines.join("\n")),
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!("ip addr show: {e}");
                Vec::new()
            }
        }
    }

    fn primary_interface(&self, host: &HostContext, interfaces: &[Interface]) -> Option<String> {
        let mut primary = None;
        host.root.each_line("/proc/net/route", |line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() > 2 && fields[1] == "00000000" {
                primary = Some(fields[0].to_string());
                return false;
            }
            true
        });
        primary.or_else(|| first_routable(interfaces))
    }
}

/// FreeBSD, OpenBSD, NetBSD and macOS.
pub struct BsdNetworking;

impl NetworkingSteps for BsdNetworking {
    fn interfaces(&self, host: &HostContext) -> Vec<Interface> {
        host.command_output("ifconfig", &["-a"])
            .map(|output| parse_ifconfig(&output))
            .unwrap_or_default()
    }

    fn primary_interface(&self, host: &HostContext, interfaces: &[Interface]) -> Option<String> {
        let mut primary = None;
        let result = host.runner.each_line(
            "route",
            &["-n", "get", "default"],
            &host.options,
            &mut |line| {
                if let Some(name) = line.trim().strip_prefix("interface:") {
                    primary = Some(name.trim().to_string());
                    return false;
                }
                true
            },
        );
        if let Err(e) = result {
            debug!("route -n get default: {e}");
        }
        primary.or_else(|| first_routable(interfaces))
    }
}

pub struct NetworkingResolver {
    host: HostContext,
    steps: Box<dyn NetworkingSteps>,
}

impl NetworkingResolver {
    pub fn new(host: HostContext, steps: Box<dyn NetworkingSteps>) -> Self {
        Self { host, steps }
    }
}

impl Resolver for NetworkingResolver {
    fn name(&self) -> &'static str {
        "networking"
    }

    fn names(&self) -> &[&'static str] {
        &[
            names::HOSTNAME,
            names::DOMAIN,
            names::FQDN,
            names::INTERFACES,
            names::IPADDRESS,
            names::IPADDRESS6,
            names::MACADDRESS,
            names::NETMASK,
            names::NETWORK,
            names::MTU,
        ]
    }

    fn patterns(&self) -> &[Regex] {
        std::slice::from_ref(&*INTERFACE_FACT)
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        if let Some(name) = self.steps.hostname(&self.host) {
            let (short, domain) = match name.split_once('.') {
                Some((short, domain)) => (short.to_string(), Some(domain.to_string())),
                None => (name.clone(), self.steps.resolver_domain(&self.host)),
            };
            let fqdn = match &domain {
                Some(domain) => format!("{short}.{domain}"),
                None => short.clone(),
            };
            facts.add(names::HOSTNAME, short);
            facts.add(names::FQDN, fqdn);
            if let Some(domain) = domain {
                facts.add(names::DOMAIN, domain);
            }
        }

        let mut interfaces = self.steps.interfaces(&self.host);
        if interfaces.is_empty() {
            return Ok(());
        }
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        let suffixes: Vec<String> = interfaces
            .iter()
            .map(|interface| fact_suffix(&interface.name))
            .collect();
        facts.add(names::INTERFACES, suffixes.join(","));

        for (interface, suffix) in interfaces.iter().zip(&suffixes) {
            add_interface_facts(facts, interface, Some(suffix));
        }

        let primary = self.steps.primary_interface(&self.host, &interfaces);
        if let Some(interface) = primary
            .as_deref()
            .and_then(|name| interfaces.iter().find(|interface| interface.name == name))
        {
            debug!("primary interface is {}", interface.name);
            add_interface_facts(facts, interface, None);
        }

        Ok(())
    }
}

fn add_interface_facts(facts: &mut Resolution<'_>, interface: &Interface, suffix: Option<&str>) {
    let mut add = |name: &str, value: Value| match suffix {
        Some(suffix) => facts.add(format!("{name}_{suffix}"), value),
        None => facts.add(name, value),
    };

    if let Some(ipv4) = &interface.ipv4 {
        add(names::IPADDRESS, ipv4.address.to_string().into());
        add(names::NETMASK, ipv4.netmask.to_string().into());
        add(names::NETWORK, ipv4.network().to_string().into());
    }
    if let Some(ipv6) = &interface.ipv6 {
        add(names::IPADDRESS6, ipv6.as_str().into());
    }
    if let Some(mac) = &interface.macaddress {
        add(names::MACADDRESS, mac.as_str().into());
    }
    if let Some(mtu) = interface.mtu {
        add(names::MTU, mtu.into());
    }
}

/// Interface names may carry characters that are awkward in fact names
/// (`eth0.100`, `eth0:1`).
fn fact_suffix(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn first_routable(interfaces: &[Interface]) -> Option<String> {
    interfaces
        .iter()
        .find(|interface| !interface.loopback && interface.ipv4.is_some())
        .map(|interface| interface.name.clone())
}

pub fn calculate_network(address: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(address) & u32::from(netmask))
}

fn prefix_to_netmask(prefix: u8) -> Ipv4Addr {
    let bits = match prefix {
        0 => 0,
        prefix if prefix >= 32 => u32::MAX,
        prefix => u32::MAX << (32 - prefix),
    };
    Ipv4Addr::from(bits)
}

/// Parses a netmask written either dotted (`255.255.255.0`) or in the hex
/// form the BSDs use (`0xffffff00`).
fn parse_netmask(value: &str) -> Option<Ipv4Addr> {
    match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(Ipv4Addr::from),
        None => value.parse().ok(),
    }
}

fn value_after<'a>(fields: &[&'a str], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .position(|field| *field == key)
        .and_then(|index| fields.get(index + 1).copied())
}

/// Parses `ip addr show` output.
pub fn parse_ip_addr(output: &str) -> Vec<Interface> {
    let mut interfaces: Vec<Interface> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = fields.first() else {
            continue;
        };

        let is_header = first
            .strip_suffix(':')
            .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()));
        if is_header {
            let Some(name) = fields.get(1) else {
                continue;
            };
            let name = name.trim_end_matches(':');
            let name = name.split('@').next().unwrap_or(name);
            let mut interface = Interface::new(name);
            interface.loopback = line.contains("LOOPBACK");
            interface.mtu = value_after(&fields, "mtu").and_then(|mtu| mtu.parse().ok());
            interfaces.push(interface);
            continue;
        }

        let Some(current) = interfaces.last_mut() else {
            continue;
        };

        match *first {
            "inet" if current.ipv4.is_none() => {
                let Some((address, prefix)) = fields.get(1).and_then(|cidr| cidr.split_once('/'))
                else {
                    debug!("skipping inet line without a prefix: {line}");
                    continue;
                };
                match (address.parse(), prefix.parse()) {
                    (Ok(address), Ok(prefix)) => {
                        current.ipv4 = Some(Ipv4Binding {
                            address,
                            netmask: prefix_to_netmask(prefix),
                        })
                    }
                    _ => debug!("skipping unparsable inet line: {line}"),
                }
            }
            "inet6" => {
                if let Some(address) = fields.get(1) {
                    current.set_ipv6(address);
                }
            }
            link if link.starts_with("link/") => {
                current.macaddress = fields
                    .get(1)
                    .filter(|mac| MAC_ADDRESS.is_match(mac) && !mac.starts_with("00:00:00:00:00:00"))
                    .map(|mac| mac.to_string());
            }
            _ => {}
        }
    }

    interfaces
}

/// Parses BSD and macOS `ifconfig` output.
pub fn parse_ifconfig(output: &str) -> Vec<Interface> {
    let mut interfaces: Vec<Interface> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        let fields: Vec<&str> = line.split_whitespace().collect();

        if let Some(captures) = IFCONFIG_HEADER.captures(line) {
            let mut interface = Interface::new(&captures[1]);
            interface.loopback = line.contains("LOOPBACK");
            interface.mtu = value_after(&fields, "mtu").and_then(|mtu| mtu.parse().ok());
            interfaces.push(interface);
            continue;
        }

        let Some(current) = interfaces.last_mut() else {
            continue;
        };

        match fields.first().copied() {
            Some("inet") if current.ipv4.is_none() => {
                let address = fields.get(1).and_then(|address| address.parse().ok());
                let netmask = value_after(&fields, "netmask").and_then(parse_netmask);
                if let (Some(address), Some(netmask)) = (address, netmask) {
                    current.ipv4 = Some(Ipv4Binding { address, netmask });
                }
            }
            Some("inet6") => {
                if let Some(address) = fields.get(1) {
                    current.set_ipv6(address);
                }
            }
            Some("ether") | Some("lladdr") | Some("address:") => {
                current.macaddress = fields
                    .get(1)
                    .filter(|mac| MAC_ADDRESS.is_match(mac))
                    .map(|mac| mac.to_string());
            }
            _ => {}
        }
    }

    interfaces
}
