//! Module resolution and validation.
//!
//! [`Registry::resolve`] walks the root modules depth-first, runs each
//! definition once, and produces a validated table of providers:
//!
//! 1. Imports are resolved before the importing module is recorded, so the
//!    resolution order lists every module after the modules it imports.
//! 2. An import that leads back to a module still being resolved is a
//!    [`BuildError::CyclicImport`].
//! 3. Providers from all modules are flattened into one table keyed by
//!    output type. A type may be provided by only one module.
//! 4. Every explicit requirement must be provided by some module in the
//!    registry, imported or not.
//! 5. Every provider dependency must be visible from its module: provided by
//!    the module itself, by a module it imports (directly or transitively),
//!    or named by one of the module's explicit requirements.
//!
//! Resolution never instantiates anything; see [`Graph`](crate::graph::Graph).

use crate::error::{BuildError, Requester};
use crate::key::TypeKey;
use crate::module::{BoxedModule, ModuleBuilder, ModuleId, Modules};
use crate::provider::Provider;
use core::fmt::Write as _;
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// ResolvedModule
// ─────────────────────────────────────────────────────────────────────────────

/// A module after its definition has run.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    id: ModuleId,
    definition: TypeKey,
    imports: Vec<ModuleId>,
    provides: Vec<TypeKey>,
    requires: Vec<TypeKey>,
}

impl ResolvedModule {
    /// Returns the module id.
    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Returns the type name of the module definition.
    #[must_use]
    pub fn definition_name(&self) -> &'static str {
        self.definition.type_name()
    }

    /// Returns the ids of the directly imported modules.
    #[must_use]
    pub fn imports(&self) -> &[ModuleId] {
        &self.imports
    }

    /// Returns the types this module provides, in registration order.
    #[must_use]
    pub fn provides(&self) -> &[TypeKey] {
        &self.provides
    }

    /// Returns the explicitly required types.
    #[must_use]
    pub fn requires(&self) -> &[TypeKey] {
        &self.requires
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// The resolved, validated set of modules and their providers.
#[derive(Debug, Default)]
pub struct Registry {
    modules: HashMap<ModuleId, ResolvedModule>,
    order: Vec<ModuleId>,
    providers: HashMap<TypeKey, Arc<Provider>>,
    provider_order: Vec<TypeKey>,
}

impl Registry {
    /// Resolves the given root modules and everything they import.
    ///
    /// # Errors
    ///
    /// - [`BuildError::CyclicImport`] if an import path revisits a module.
    /// - [`BuildError::ConflictingModuleId`] if two definitions share an id.
    /// - [`BuildError::Module`] if a definition reports an error.
    /// - [`BuildError::DuplicateProvider`] if two modules provide one type.
    /// - [`BuildError::UnresolvedDependency`] if a dependency is not visible
    ///   from the module that needs it.
    pub fn resolve(modules: impl Modules) -> Result<Self, BuildError> {
        let mut roots = Vec::new();
        modules.collect_into(&mut roots);

        let mut resolver = Resolver::default();
        let mut path = Vec::new();
        for root in roots {
            resolver.resolve_module(root, &mut path)?;
        }

        let registry = resolver.flatten()?;
        registry.validate()?;

        tracing::debug!(
            modules = registry.order.len(),
            providers = registry.provider_order.len(),
            "resolved module registry"
        );
        Ok(registry)
    }

    /// Returns the modules in resolution order.
    pub fn modules(&self) -> impl Iterator<Item = &ResolvedModule> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    /// Returns a module by id.
    #[must_use]
    pub fn module(&self, id: &str) -> Option<&ResolvedModule> {
        self.modules.get(&ModuleId::new(id.to_owned()))
    }

    /// Returns `true` if a module with the given id was resolved.
    #[must_use]
    pub fn contains_module(&self, id: &str) -> bool {
        self.module(id).is_some()
    }

    /// Returns all providers: modules in resolution order, providers in
    /// registration order within each module.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<Provider>> {
        self.provider_order
            .iter()
            .filter_map(|key| self.providers.get(key))
    }

    /// Returns the provider for a type.
    #[must_use]
    pub fn provider(&self, key: &TypeKey) -> Option<&Arc<Provider>> {
        self.providers.get(key)
    }

    /// Returns `true` if some module provides `T`.
    #[must_use]
    pub fn provides<T: 'static>(&self) -> bool {
        self.providers.contains_key(&TypeKey::of::<T>())
    }

    /// Returns the number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.provider_order.len()
    }

    /// Returns `true` if no module provides anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provider_order.is_empty()
    }

    /// Renders the module and provider structure in Graphviz DOT format.
    ///
    /// Modules are boxes and providers are ellipses. Solid edges are imports,
    /// dashed edges connect a module to what it provides, and dotted edges
    /// point from a provider to each of its dependencies.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph trellis {\n    rankdir=LR;\n");

        for module in self.modules() {
            let id = dot_escape(module.id.as_str());
            let _ = writeln!(out, "    \"module:{id}\" [shape=box, label=\"{id}\"];");
            for import in &module.imports {
                let import = dot_escape(import.as_str());
                let _ = writeln!(out, "    \"module:{id}\" -> \"module:{import}\";");
            }
            for key in &module.provides {
                let name = dot_escape(key.type_name());
                let _ = writeln!(out, "    \"module:{id}\" -> \"type:{name}\" [style=dashed];");
            }
        }

        for provider in self.providers() {
            let name = dot_escape(provider.output().type_name());
            let _ = writeln!(out, "    \"type:{name}\" [shape=ellipse, label=\"{name}\"];");
            for dependency in provider.dependencies() {
                let dependency = dot_escape(dependency.type_name());
                let _ = writeln!(out, "    \"type:{name}\" -> \"type:{dependency}\" [style=dotted];");
            }
        }

        out.push_str("}\n");
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal: validation
    // ─────────────────────────────────────────────────────────────────────────

    fn validate(&self) -> Result<(), BuildError> {
        for module in self.modules() {
            let mut visible = self.visible_from(module);

            // Explicit requirements may be satisfied by any module, imported
            // or not, and then count as visible to the module's providers.
            for &key in &module.requires {
                if !self.providers.contains_key(&key) {
                    return Err(BuildError::UnresolvedDependency {
                        dependency: key,
                        requested_by: Requester::Module,
                        module: module.id.clone(),
                    });
                }
                visible.insert(key);
            }

            for key in &module.provides {
                let Some(provider) = self.providers.get(key) else {
                    continue;
                };
                for &dependency in provider.dependencies() {
                    if !visible.contains(&dependency) {
                        return Err(BuildError::UnresolvedDependency {
                            dependency,
                            requested_by: Requester::Provider {
                                name: provider.name(),
                                output: provider.output(),
                            },
                            module: module.id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Collects the types provided by `module` and every module it imports,
    /// transitively.
    fn visible_from(&self, module: &ResolvedModule) -> HashSet<TypeKey> {
        let mut visible = HashSet::new();
        let mut seen = HashSet::new();
        let mut stack = vec![&module.id];

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(current) = self.modules.get(id) else {
                continue;
            };
            visible.extend(current.provides.iter().copied());
            stack.extend(current.imports.iter());
        }
        visible
    }
}

fn dot_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Resolver {
    modules: HashMap<ModuleId, ResolvedModule>,
    order: Vec<ModuleId>,
    pending: Vec<Provider>,
}

impl Resolver {
    /// Resolves one module and its imports. `path` holds the modules whose
    /// resolution is in progress, outermost first.
    fn resolve_module(
        &mut self,
        module: BoxedModule,
        path: &mut Vec<(ModuleId, TypeKey)>,
    ) -> Result<(), BuildError> {
        let BoxedModule {
            id,
            definition,
            module,
        } = module;

        if let Some(start) = path.iter().position(|(on_path, _)| *on_path == id) {
            if path[start].1 != definition {
                return Err(BuildError::ConflictingModuleId { id });
            }
            let mut cycle: Vec<ModuleId> = path[start..].iter().map(|(p, _)| p.clone()).collect();
            cycle.push(id);
            return Err(BuildError::CyclicImport { path: cycle });
        }

        if let Some(existing) = self.modules.get(&id) {
            if existing.definition != definition {
                return Err(BuildError::ConflictingModuleId { id });
            }
            return Ok(());
        }

        let mut builder = ModuleBuilder::new(id.clone());
        module
            .define(&mut builder)
            .map_err(|source| BuildError::Module {
                module: id.clone(),
                source,
            })?;
        let parts = builder.into_parts();

        let imports: Vec<ModuleId> = parts.imports.iter().map(|m| m.id.clone()).collect();
        path.push((id.clone(), definition));
        for import in parts.imports {
            self.resolve_module(import, path)?;
        }
        path.pop();

        tracing::trace!(
            module = %id,
            providers = parts.providers.len(),
            imports = imports.len(),
            "module defined"
        );

        self.order.push(id.clone());
        self.modules.insert(
            id.clone(),
            ResolvedModule {
                id,
                definition,
                imports,
                provides: parts.providers.iter().map(Provider::output).collect(),
                requires: parts.requires,
            },
        );
        self.pending.extend(parts.providers);
        Ok(())
    }

    /// Moves every provider into one table, rejecting types provided twice.
    fn flatten(self) -> Result<Registry, BuildError> {
        let mut providers: HashMap<TypeKey, Arc<Provider>> = HashMap::new();
        let mut provider_order = Vec::with_capacity(self.pending.len());

        for provider in self.pending {
            let key = provider.output();
            if let Some(existing) = providers.get(&key) {
                return Err(BuildError::DuplicateProvider {
                    key,
                    first: existing.module().clone(),
                    second: provider.module().clone(),
                });
            }
            provider_order.push(key);
            providers.insert(key, Arc::new(provider));
        }

        Ok(Registry {
            modules: self.modules,
            order: self.order,
            providers,
            provider_order,
        })
    }
}
