//! Processor facts
//!
//! Linux reads `/proc/cpuinfo`; every other host (or a Linux host without
//! procfs) only gets the logical count from `num_cpus`.

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver, Value};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    pub logical_count: usize,
    pub physical_count: usize,
    pub models: Vec<String>,
}

impl CpuInfo {
    /// Parses `/proc/cpuinfo`. Models are listed once per logical processor.
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();
        let mut packages = HashSet::new();

        for line in content.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key.trim() {
                "processor" => info.logical_count += 1,
                "model name" | "cpu model" => info.models.push(value.trim().to_string()),
                "physical id" => {
                    packages.insert(value.trim().to_string());
                }
                _ => {}
            }
        }

        info.physical_count = match packages.len() {
            0 if info.logical_count > 0 => 1,
            count => count,
        };
        info
    }
}

pub struct ProcessorResolver {
    host: HostContext,
}

impl ProcessorResolver {
    pub fn new(host: HostContext) -> Self {
        Self { host }
    }
}

impl Resolver for ProcessorResolver {
    fn name(&self) -> &'static str {
        "processor"
    }

    fn names(&self) -> &[&'static str] {
        &[
            names::PROCESSORS,
            names::PROCESSOR_COUNT,
            names::PHYSICAL_PROCESSOR_COUNT,
        ]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        let info = match self.host.root.read("/proc/cpuinfo") {
            Some(content) => CpuInfo::parse(&content),
            None => CpuInfo::default(),
        };

        let logical = match info.logical_count {
            0 => num_cpus::get(),
            count => count,
        };
        let mut processors = BTreeMap::new();

        facts.add(names::PROCESSOR_COUNT, logical as i64);
        processors.insert("count".to_string(), Value::Integer(logical as i64));

        if info.physical_count > 0 {
            facts.add(names::PHYSICAL_PROCESSOR_COUNT, info.physical_count as i64);
            processors.insert(
                "physicalcount".to_string(),
                Value::Integer(info.physical_count as i64),
            );
        }
        if !info.models.is_empty() {
            let models = info.models.into_iter().map(Value::from).collect::<Vec<_>>();
            processors.insert("models".to_string(), Value::Array(models));
        }

        facts.add(names::PROCESSORS, processors);
        Ok(())
    }
}
