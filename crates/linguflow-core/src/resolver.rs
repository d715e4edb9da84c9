//! Read-only query facade over the [`Registry`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::Registry;
use crate::types::TypeDescriptor;

/// A thread-safe, memoized view over the frozen [`Registry`]. Resolvers are
/// cheap to clone (an `Arc` and an empty cache) and safe to share across
/// tasks: the registry itself never changes after bootstrap, and the
/// `candidates()` cache is guarded by a mutex.
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
    candidates_cache: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl Resolver {
    /// Builds a resolver over the process-wide registry, bootstrapping it on
    /// first use.
    pub fn new() -> Self {
        Self { registry: Registry::bootstrap(), candidates_cache: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Builds a resolver over a caller-supplied registry rather than the
    /// process-wide one. Used by `linguflow-service` to bootstrap a registry
    /// that extends the core builtins with its own descriptors (the
    /// sub-application invocation blocks, which depend on the Async Invoker
    /// and therefore cannot live in `linguflow-core` without an upward
    /// dependency).
    pub fn from_registry(registry: Arc<Registry>) -> Self {
        Self { registry, candidates_cache: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names().to_vec()
    }

    /// Looks up the descriptor registered under `name`, or `None`.
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.registry.descriptor(name)
    }

    /// Reverse-maps a descriptor's `impl_tag` back to its registered name.
    pub fn relookup(&self, impl_tag: &str) -> Option<&str> {
        self.registry.relookup(impl_tag)
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.registry.descriptor(name).map(|d| d.abstract_).unwrap_or(false)
    }

    /// For an abstract or concrete registered type `name`, returns every
    /// registered non-abstract type whose descriptor declares it implements
    /// `name`. Memoized, since it's the only query that isn't a direct index
    /// hit.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if let Some(hit) = self.candidates_cache.lock().get(name) {
            return hit.clone();
        }
        let found: Vec<String> = self
            .registry
            .names()
            .iter()
            .filter(|candidate| {
                self.registry
                    .descriptor(candidate)
                    .map(|d| !d.abstract_ && d.implements.iter().any(|s| s == name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        self.candidates_cache.lock().insert(name.to_string(), found.clone());
        found
    }

    pub fn slots(&self, name: &str) -> Option<&[crate::types::SlotDescriptor]> {
        self.registry.descriptor(name).map(|d| d.slots.as_slice())
    }

    pub fn inports(&self, name: &str) -> Option<&[crate::types::PortDescriptor]> {
        self.registry.descriptor(name).map(|d| d.inports.as_slice())
    }

    pub fn outport(&self, name: &str) -> Option<&str> {
        self.registry.descriptor(name).and_then(|d| d.outport.as_deref())
    }

    pub fn is_subtype(&self, name: &str, of: &str) -> bool {
        self.registry.is_subtype(name, of)
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
