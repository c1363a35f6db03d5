//! The instantiated object graph.
//!
//! [`Graph::new`] invokes every provider of a [`Registry`] exactly once,
//! resolving dependencies recursively and memoizing each instance. The
//! instances are recorded in instantiation order, which is a topological
//! order of the dependency graph: every instance appears after everything it
//! depends on. Lifecycle hooks run in that order (start) and in reverse
//! (stop).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_graph::prelude::*;
//!
//! struct Config;
//! struct Database;
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let module = module_fn("app", |m| {
//!     m.instance(Config)?;
//!     m.provide(|_: Arc<Config>| Database)?;
//!     m.provide(|db: Arc<Database>| UserService { db })?;
//!     Ok(())
//! });
//!
//! let registry = Registry::resolve(module).unwrap();
//! let graph = Graph::new(&registry).unwrap();
//!
//! let users = graph.must_get::<UserService>();
//! assert!(Arc::ptr_eq(&users.db, &graph.must_get::<Database>()));
//! ```

use crate::capability::Capabilities;
use crate::error::{BuildError, MissingInstance};
use crate::inject::Inject;
use crate::key::TypeKey;
use crate::module::ModuleId;
use crate::provider::{Injectable, Instance, Provider};
use crate::registry::Registry;
use hashbrown::HashMap;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// GraphEntry
// ─────────────────────────────────────────────────────────────────────────────

/// One instance in the graph, with the metadata of the provider that built it.
#[derive(Clone)]
pub struct GraphEntry {
    key: TypeKey,
    instance: Instance,
    provider: &'static str,
    module: ModuleId,
    capabilities: Capabilities,
}

impl GraphEntry {
    /// Returns the type of the instance.
    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Returns the type-erased instance.
    #[must_use]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Returns the type name of the factory that built the instance.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the module that registered the provider.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Returns the lifecycle hooks registered for the provider.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl core::fmt::Debug for GraphEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GraphEntry")
            .field("key", &self.key)
            .field("provider", &self.provider)
            .field("module", &self.module)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph
// ─────────────────────────────────────────────────────────────────────────────

/// Every instance produced from a registry, keyed by type.
///
/// A graph is immutable once built and can be shared across threads.
#[derive(Debug, Default)]
pub struct Graph {
    instances: HashMap<TypeKey, Instance>,
    ordered: Vec<GraphEntry>,
}

impl Graph {
    /// Instantiates every provider in `registry`.
    ///
    /// Providers are visited in registry order; each one first instantiates
    /// its dependencies (recursively) and then runs its own factory. Each
    /// provider runs at most once.
    ///
    /// # Errors
    ///
    /// - [`BuildError::MissingProvider`] if a dependency has no provider.
    /// - [`BuildError::CyclicDependency`] if providers depend on each other
    ///   in a loop.
    /// - [`BuildError::ProviderFailed`] if a factory returns an error. The
    ///   factory's error is kept as the source.
    pub fn new(registry: &Registry) -> Result<Self, BuildError> {
        let mut builder = GraphBuilder {
            registry,
            graph: Graph::default(),
            resolving: Vec::new(),
        };
        for provider in registry.providers() {
            builder.get_or_init(provider.output())?;
        }

        tracing::debug!(instances = builder.graph.len(), "object graph built");
        Ok(builder.graph)
    }

    /// Returns the instance of `T`, if the graph holds one.
    #[must_use]
    pub fn get<T: Injectable>(&self) -> Option<Arc<T>> {
        self.instances
            .get(&TypeKey::of::<T>())
            .and_then(|instance| Arc::clone(instance).downcast::<T>().ok())
    }

    /// Returns the instance of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingInstance`] if the graph holds no `T`.
    pub fn require<T: Injectable>(&self) -> Result<Arc<T>, MissingInstance> {
        self.get::<T>().ok_or(MissingInstance {
            key: TypeKey::of::<T>(),
        })
    }

    /// Returns the instance of `T`.
    ///
    /// # Panics
    ///
    /// Panics if the graph holds no `T`.
    #[must_use]
    pub fn must_get<T: Injectable>(&self) -> Arc<T> {
        self.require::<T>().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Returns the type-erased instance for a key.
    #[must_use]
    pub fn get_by_key(&self, key: &TypeKey) -> Option<&Instance> {
        self.instances.get(key)
    }

    /// Returns `true` if the graph holds a `T`.
    #[must_use]
    pub fn contains<T: Injectable>(&self) -> bool {
        self.instances.contains_key(&TypeKey::of::<T>())
    }

    /// Fills the injectable fields of `target` from this graph.
    ///
    /// Fields whose type has no instance are left untouched.
    pub fn fill<I: Inject + ?Sized>(&self, target: &mut I) {
        target.inject(self);
    }

    /// Returns the entries in instantiation order.
    #[must_use]
    pub fn ordered(&self) -> &[GraphEntry] {
        &self.ordered
    }

    /// Returns the instance types in instantiation order.
    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.ordered.iter().map(GraphEntry::key)
    }

    /// Returns the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Returns `true` if the graph holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal: instantiation
// ─────────────────────────────────────────────────────────────────────────────

struct GraphBuilder<'r> {
    registry: &'r Registry,
    graph: Graph,
    /// Types whose dependencies are being instantiated, outermost first.
    resolving: Vec<TypeKey>,
}

impl GraphBuilder<'_> {
    fn get_or_init(&mut self, key: TypeKey) -> Result<Instance, BuildError> {
        if let Some(instance) = self.graph.instances.get(&key) {
            return Ok(Arc::clone(instance));
        }

        if let Some(start) = self.resolving.iter().position(|k| *k == key) {
            let mut chain = self.resolving[start..].to_vec();
            chain.push(key);
            return Err(BuildError::CyclicDependency { chain });
        }

        let provider = Arc::clone(
            self.registry
                .provider(&key)
                .ok_or(BuildError::MissingProvider { key })?,
        );

        self.resolving.push(key);
        let args = self.resolve_args(&provider);
        self.resolving.pop();
        let args = args?;

        let instance = provider
            .invoke(&args)
            .map_err(|source| BuildError::ProviderFailed {
                provider: provider.name(),
                key,
                source,
            })?;

        tracing::trace!(
            key = %key,
            module = %provider.module(),
            "instance created"
        );

        self.graph.instances.insert(key, Arc::clone(&instance));
        self.graph.ordered.push(GraphEntry {
            key,
            instance: Arc::clone(&instance),
            provider: provider.name(),
            module: provider.module().clone(),
            capabilities: provider.capabilities().clone(),
        });
        Ok(instance)
    }

    fn resolve_args(&mut self, provider: &Provider) -> Result<Vec<Instance>, BuildError> {
        provider
            .dependencies()
            .iter()
            .map(|&dependency| self.get_or_init(dependency))
            .collect()
    }
}
