//! Fact collection: resolver registry, on-demand resolution and the fact map

use super::external::ExternalFacts;
use super::resolver::{Resolution, Resolver};
use super::{FactError, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Resolvers in the order they were registered.
///
/// Built once at startup (see [`platform::default_registry`](super::platform::default_registry))
/// and handed to [`Collection::new`].
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Arc::new(resolver));
    }

    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.register(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn resolver_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resolvers.iter().map(|resolver| resolver.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolverState {
    Pending,
    Running,
    Done,
}

/// Owns the resolved facts and drives resolution.
///
/// Every resolver runs at most once; a fact is looked up in the cache first
/// and only an uncached name triggers its owner. Facts never expire.
///
/// Resolution is single-threaded. Running resolvers concurrently would need
/// the per-resolver state to become an atomically claimed guard, with readers
/// blocking on facts another thread is still producing.
pub struct Collection {
    resolvers: Vec<Arc<dyn Resolver>>,
    states: Vec<ResolverState>,
    owners: HashMap<&'static str, usize>,
    facts: BTreeMap<String, Value>,
    external: HashSet<String>,
    blocked: HashSet<String>,
}

impl Collection {
    /// Builds a collection, rejecting two resolvers that claim the same fact.
    pub fn new(registry: ResolverRegistry) -> Result<Self, FactError> {
        let resolvers = registry.resolvers;
        let mut owners = HashMap::new();

        for (index, resolver) in resolvers.iter().enumerate() {
            for name in resolver.names() {
                if let Some(previous) = owners.insert(*name, index) {
                    return Err(FactError::DuplicateFact {
                        name: name.to_string(),
                        first: resolvers[previous].name().to_string(),
                        second: resolver.name().to_string(),
                    });
                }
            }
        }

        Ok(Self {
            states: vec![ResolverState::Pending; resolvers.len()],
            resolvers,
            owners,
            facts: BTreeMap::new(),
            external: HashSet::new(),
            blocked: HashSet::new(),
        })
    }

    /// A collection without resolvers; only added facts are available.
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
            states: Vec::new(),
            owners: HashMap::new(),
            facts: BTreeMap::new(),
            external: HashSet::new(),
            blocked: HashSet::new(),
        }
    }

    /// Adds or replaces a fact from outside the resolvers (external facts,
    /// embedding hosts). Such facts win over resolver output for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if self.blocked.contains(&name) {
            debug!("{name} is blocked and will not be added");
            return;
        }
        self.external.insert(name.clone());
        self.facts.insert(name, value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.external.remove(name);
        self.facts.remove(name)
    }

    /// Prevents the named facts from ever being reported.
    pub fn block<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            self.facts.remove(&name);
            self.external.remove(&name);
            self.blocked.insert(name);
        }
    }

    /// Returns a fact, running its owning resolver first if needed.
    pub fn get(&mut self, name: &str) -> Option<&Value> {
        if self.blocked.contains(name) {
            return None;
        }
        if !self.facts.contains_key(name) {
            for index in self.owners_of(name) {
                self.run(index, name);
            }
        }
        self.facts.get(name)
    }

    /// Returns a fact only if it has already been resolved or added.
    pub fn cached(&self, name: &str) -> Option<&Value> {
        self.facts.get(name)
    }

    /// Runs every resolver that has not run yet, in registration order.
    pub fn resolve_all(&mut self) {
        for index in 0..self.resolvers.len() {
            let name = self.resolvers[index].name();
            self.run(index, name);
        }
    }

    /// Loads external facts from the given directories.
    pub fn add_external_facts(&mut self, external: &ExternalFacts, directories: &[PathBuf]) {
        external.load(directories, self);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.facts.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn owners_of(&self, name: &str) -> Vec<usize> {
        let mut owners: Vec<usize> = self.owners.get(name).copied().into_iter().collect();
        for (index, resolver) in self.resolvers.iter().enumerate() {
            if !owners.contains(&index)
                && resolver.patterns().iter().any(|pattern| pattern.is_match(name))
            {
                owners.push(index);
            }
        }
        owners
    }

    fn run(&mut self, index: usize, requested: &str) {
        match self.states[index] {
            ResolverState::Done => return,
            ResolverState::Running => panic!(
                "circular fact dependency: the {} resolver was asked for `{requested}` while it was still resolving",
                self.resolvers[index].name()
            ),
            ResolverState::Pending => {}
        }

        let resolver = Arc::clone(&self.resolvers[index]);
        self.states[index] = ResolverState::Running;
        debug!("resolving facts with the {} resolver", resolver.name());

        let mut resolution = Resolution::new(self);
        let result = resolver.resolve(&mut resolution);
        let staged = resolution.into_staged();

        if let Err(e) = result {
            warn!("the {} resolver failed: {e}", resolver.name());
        }
        self.states[index] = ResolverState::Done;
        self.merge(resolver.name(), staged);
    }

    fn merge(&mut self, resolver: &str, staged: BTreeMap<String, Value>) {
        for (name, value) in staged {
            if self.blocked.contains(&name) {
                continue;
            }
            if self.external.contains(&name) {
                debug!("keeping the added value of {name} over the {resolver} resolver");
                continue;
            }
            trace!("{name} => {value}");
            self.facts.insert(name, value);
        }
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: Arc<AtomicUsize>,
    }

    impl Resolver for CountingResolver {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn names(&self) -> &[&'static str] {
            &["alpha", "beta"]
        }

        fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            facts.add("alpha", "a");
            facts.add("beta", 2_i64);
            Ok(())
        }
    }

    #[test]
    fn test_get_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ResolverRegistry::new().with(CountingResolver {
            calls: Arc::clone(&calls),
        });
        let mut collection = Collection::new(registry).unwrap();

        assert_eq!(collection.get("alpha").and_then(Value::as_str), Some("a"));
        assert_eq!(collection.get("beta").and_then(Value::as_integer), Some(2));
        assert_eq!(collection.get("alpha").and_then(Value::as_str), Some("a"));
        collection.resolve_all();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_fact_is_absent() {
        let mut collection = Collection::empty();
        assert!(collection.get("nothing").is_none());
    }

    #[test]
    fn test_added_fact_overrides_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ResolverRegistry::new().with(CountingResolver {
            calls: Arc::clone(&calls),
        });
        let mut collection = Collection::new(registry).unwrap();
        collection.add("alpha", "external");
        collection.resolve_all();

        assert_eq!(
            collection.get("alpha").and_then(Value::as_str),
            Some("external")
        );
        assert_eq!(collection.get("beta").and_then(Value::as_integer), Some(2));
    }

    #[test]
    fn test_blocked_fact_is_never_reported() {
        let registry = ResolverRegistry::new().with(CountingResolver {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let mut collection = Collection::new(registry).unwrap();
        collection.block(["beta"]);
        collection.add("beta", "added");

        assert!(collection.get("beta").is_none());
        collection.resolve_all();
        assert!(collection.cached("beta").is_none());
        assert!(collection.cached("alpha").is_some());
    }

    #[test]
    fn test_duplicate_ownership_is_rejected() {
        let registry = ResolverRegistry::new()
            .with(CountingResolver {
                calls: Arc::new(AtomicUsize::new(0)),
            })
            .with(CountingResolver {
                calls: Arc::new(AtomicUsize::new(0)),
            });

        match Collection::new(registry) {
            Err(FactError::DuplicateFact { name, .. }) => assert_eq!(name, "alpha"),
            _ => panic!("expected a duplicate fact error"),
        }
    }
}
