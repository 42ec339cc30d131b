//! Resolver contract

use super::{Collection, FactError, Value};
use regex::Regex;
use std::collections::BTreeMap;

/// A unit of platform knowledge producing a fixed set of facts.
///
/// `resolve` runs at most once per [`Collection`]. A fact the resolver cannot
/// determine is simply not added; returning an error is logged by the
/// collection and whatever was already added is kept.
pub trait Resolver: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// Fact names this resolver owns.
    fn names(&self) -> &[&'static str];

    /// Patterns for dynamically named facts (e.g. `mtu_eth0`).
    fn patterns(&self) -> &[Regex] {
        &[]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError>;
}

/// The view of the fact set a resolver gets while it runs.
///
/// Reads go through the owning collection, resolving other facts on demand.
/// Writes are staged and merged into the collection only after the resolver
/// returns, so nobody observes half of a resolver's output.
pub struct Resolution<'a> {
    collection: &'a mut Collection,
    staged: BTreeMap<String, Value>,
}

impl<'a> Resolution<'a> {
    pub(crate) fn new(collection: &'a mut Collection) -> Self {
        Self {
            collection,
            staged: BTreeMap::new(),
        }
    }

    /// Looks up a fact, preferring values this resolver already added.
    pub fn get(&mut self, name: &str) -> Option<&Value> {
        if self.staged.contains_key(name) {
            return self.staged.get(name);
        }
        self.collection.get(name)
    }

    pub fn get_str(&mut self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.staged.insert(name.into(), value.into());
    }

    pub(crate) fn into_staged(self) -> BTreeMap<String, Value> {
        self.staged
    }
}
