//! Memory facts from `/proc/meminfo`

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver, Value};
use std::collections::BTreeMap;
use tracing::debug;

const UNITS: &[&str] = &["bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Byte counts read from `/proc/meminfo`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total: Option<u64>,
    pub free: Option<u64>,
    pub swap_total: Option<u64>,
    pub swap_free: Option<u64>,
}

impl MemoryInfo {
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();
        for line in content.lines() {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(amount)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(kilobytes) = amount.parse::<u64>() else {
                debug!("skipping unparsable meminfo line: {line}");
                continue;
            };
            let Some(bytes) = kilobytes.checked_mul(1024) else {
                debug!("skipping out of range meminfo line: {line}");
                continue;
            };
            let bytes = Some(bytes);
            match key {
                "MemTotal:" => info.total = bytes,
                "MemFree:" => info.free = bytes,
                "SwapTotal:" => info.swap_total = bytes,
                "SwapFree:" => info.swap_free = bytes,
                _ => {}
            }
        }
        info
    }
}

pub struct MemoryResolver {
    host: HostContext,
}

impl MemoryResolver {
    pub fn new(host: HostContext) -> Self {
        Self { host }
    }
}

impl Resolver for MemoryResolver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn names(&self) -> &[&'static str] {
        &[
            names::MEMORY,
            names::MEMORY_SIZE,
            names::MEMORY_FREE,
            names::MEMORY_SIZE_MB,
            names::MEMORY_FREE_MB,
            names::SWAP_SIZE,
            names::SWAP_FREE,
            names::SWAP_SIZE_MB,
            names::SWAP_FREE_MB,
        ]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        let Some(content) = self.host.root.read("/proc/meminfo") else {
            return Ok(());
        };
        let info = MemoryInfo::parse(&content);
        let mut memory = BTreeMap::new();

        if let Some(total) = info.total {
            facts.add(names::MEMORY_SIZE, human_readable(total));
            facts.add(names::MEMORY_SIZE_MB, megabytes(total));
        }
        if let Some(free) = info.free {
            facts.add(names::MEMORY_FREE, human_readable(free));
            facts.add(names::MEMORY_FREE_MB, megabytes(free));
        }
        if let Some(system) = usage(info.total, info.free) {
            memory.insert("system".to_string(), system);
        }

        if let Some(total) = info.swap_total {
            facts.add(names::SWAP_SIZE, human_readable(total));
            facts.add(names::SWAP_SIZE_MB, megabytes(total));
        }
        if let Some(free) = info.swap_free {
            facts.add(names::SWAP_FREE, human_readable(free));
            facts.add(names::SWAP_FREE_MB, megabytes(free));
        }
        if let Some(swap) = usage(info.swap_total, info.swap_free) {
            memory.insert("swap".to_string(), swap);
        }

        if !memory.is_empty() {
            facts.add(names::MEMORY, memory);
        }
        if info.total.is_none() {
            return Err(FactError::ParseError(
                "/proc/meminfo has no MemTotal entry".to_string(),
            ));
        }
        Ok(())
    }
}

fn usage(total: Option<u64>, free: Option<u64>) -> Option<Value> {
    let (total, free) = (total?, free?);
    // A host without swap reports a zero total; there is no capacity to show.
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(free);

    let mut map = BTreeMap::new();
    map.insert("total".to_string(), human_readable(total).into());
    map.insert("total_bytes".to_string(), to_integer(total));
    map.insert("available".to_string(), human_readable(free).into());
    map.insert("available_bytes".to_string(), to_integer(free));
    map.insert("used".to_string(), human_readable(used).into());
    map.insert("used_bytes".to_string(), to_integer(used));
    map.insert(
        "capacity".to_string(),
        format!("{:.2}%", used as f64 / total as f64 * 100.0).into(),
    );
    Some(Value::Map(map))
}

fn to_integer(bytes: u64) -> Value {
    Value::Integer(i64::try_from(bytes).unwrap_or(i64::MAX))
}

fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Formats a byte count with binary units, e.g. `7.77 GiB`.
pub fn human_readable(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:        8147468 kB
MemFree:         1948736 kB
MemAvailable:    5402496 kB
Buffers:          205496 kB
Cached:          3395488 kB
SwapTotal:       2097148 kB
SwapFree:        2097148 kB
HugePages_Total:       0
";

    #[test]
    fn test_parse_meminfo() {
        let info = MemoryInfo::parse(MEMINFO);
        assert_eq!(info.total, Some(8147468 * 1024));
        assert_eq!(info.free, Some(1948736 * 1024));
        assert_eq!(info.swap_total, Some(2097148 * 1024));
        assert_eq!(info.swap_free, Some(2097148 * 1024));
    }

    #[test]
    fn test_parse_skips_overflowing_sizes() {
        let info = MemoryInfo::parse(
            "MemTotal:       18446744073709551615 kB\nSwapTotal:       2097148 kB\n",
        );
        assert_eq!(info.total, None);
        assert_eq!(info.swap_total, Some(2097148 * 1024));
    }

    #[test]
    fn test_human_readable() {
        assert_eq!(human_readable(512), "512 bytes");
        assert_eq!(human_readable(2048), "2.00 KiB");
        assert_eq!(human_readable(8147468 * 1024), "7.77 GiB");
        assert_eq!(human_readable(2097148 * 1024), "2.00 GiB");
    }

    #[test]
    fn test_usage_capacity() {
        let usage = usage(Some(1000), Some(250)).unwrap();
        let map = usage.as_map().unwrap();
        assert_eq!(map["capacity"].as_str(), Some("75.00%"));
        assert_eq!(map["used_bytes"].as_integer(), Some(750));
        assert!(super::usage(Some(0), Some(0)).is_none());
    }

    #[test]
    fn test_megabytes_rounds_to_two_places() {
        assert_eq!(megabytes(8147468 * 1024), 7956.51);
    }

    fn resolve_meminfo(content: &str) -> crate::facts::Collection {
        use crate::facts::{Collection, ResolverRegistry, SysRoot};
        use crate::process::SystemRunner;
        use std::sync::Arc;

        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("proc")).unwrap();
        std::fs::write(temp_dir.path().join("proc/meminfo"), content).unwrap();

        let host = HostContext::new(SysRoot::new(temp_dir.path()), Arc::new(SystemRunner));
        let registry = ResolverRegistry::new().with(MemoryResolver::new(host));
        let mut collection = Collection::new(registry).unwrap();
        collection.resolve_all();
        collection
    }

    #[test]
    fn test_missing_total_keeps_swap_facts() {
        let mut collection =
            resolve_meminfo("SwapTotal:       2097148 kB\nSwapFree:        2097148 kB\n");

        assert!(collection.get(names::MEMORY_SIZE).is_none());
        assert_eq!(
            collection.get(names::SWAP_SIZE).and_then(Value::as_str),
            Some("2.00 GiB")
        );
    }

    #[test]
    fn test_huge_total_does_not_abort_resolution() {
        let mut collection = resolve_meminfo(
            "MemTotal:       18446744073709551615 kB\nMemFree:         1948736 kB\n",
        );

        assert!(collection.get(names::MEMORY_SIZE).is_none());
        assert_eq!(
            collection.get(names::MEMORY_FREE_MB).and_then(Value::as_double),
            Some(1903.06)
        );
    }
}
