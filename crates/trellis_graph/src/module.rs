//! Modules: named bundles of providers, imports and explicit requirements.
//!
//! A module is anything implementing [`Module`]. Its [`define`](Module::define)
//! method receives a [`ModuleBuilder`] and registers what the module offers:
//!
//! ```
//! use std::sync::Arc;
//! use trellis_graph::prelude::*;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct StorageModule;
//!
//! impl Module for StorageModule {
//!     fn id(&self) -> ModuleId {
//!         ModuleId::new("storage")
//!     }
//!
//!     fn define(&self, m: &mut ModuleBuilder) -> Result<(), ModuleError> {
//!         m.instance(Config { url: "sqlite::memory:".into() })?;
//!         m.provide(|config: Arc<Config>| Database { url: config.url.clone() })?;
//!         Ok(())
//!     }
//! }
//!
//! let graph = build_graph(StorageModule).unwrap();
//! assert_eq!(graph.must_get::<Database>().url, "sqlite::memory:");
//! ```
//!
//! Small modules can skip the struct and use [`module_fn`].
//!
//! Module identity is the [`ModuleId`]. Importing the same definition twice is
//! harmless; two different definitions under one id are rejected.

use crate::capability::{Starter, Stopper};
use crate::error::ModuleError;
use crate::key::{IntoTypeKeys, TypeKey};
use crate::provider::{Injectable, IntoProvider, IntoTryProvider, Provider};
use core::fmt;
use core::marker::PhantomData;
use std::borrow::Cow;
use variadics_please::all_tuples;

// ─────────────────────────────────────────────────────────────────────────────
// ModuleId
// ─────────────────────────────────────────────────────────────────────────────

/// The name that identifies a module within one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Cow<'static, str>);

impl ModuleId {
    /// Creates a module id.
    #[must_use]
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ModuleId {
    fn from(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(Cow::Owned(id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A named bundle of providers.
///
/// `define` is called exactly once per resolution, the first time the module
/// is reached. It may be called again in a later resolution, so it should not
/// consume state.
pub trait Module: Send + Sync + 'static {
    /// Returns the id of this module.
    fn id(&self) -> ModuleId;

    /// Registers this module's providers, imports and requirements.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] if a registration is rejected or the module
    /// cannot be defined.
    fn define(&self, m: &mut ModuleBuilder) -> Result<(), ModuleError>;
}

/// A [`Module`] built from an id and a closure. See [`module_fn`].
pub struct ModuleFn<F> {
    id: ModuleId,
    define: F,
}

/// Creates a module from an id and a definition closure.
///
/// ```
/// use trellis_graph::prelude::*;
///
/// struct Clock;
///
/// let clock = module_fn("clock", |m| {
///     m.provide(|| Clock)?;
///     Ok(())
/// });
/// assert_eq!(clock.id().as_str(), "clock");
/// ```
pub fn module_fn<F>(id: impl Into<ModuleId>, define: F) -> ModuleFn<F>
where
    F: Fn(&mut ModuleBuilder) -> Result<(), ModuleError> + Send + Sync + 'static,
{
    ModuleFn {
        id: id.into(),
        define,
    }
}

impl<F> Module for ModuleFn<F>
where
    F: Fn(&mut ModuleBuilder) -> Result<(), ModuleError> + Send + Sync + 'static,
{
    fn id(&self) -> ModuleId {
        self.id.clone()
    }

    fn define(&self, m: &mut ModuleBuilder) -> Result<(), ModuleError> {
        (self.define)(m)
    }
}

/// A type-erased module along with the identity captured before boxing.
pub struct BoxedModule {
    pub(crate) id: ModuleId,
    pub(crate) definition: TypeKey,
    pub(crate) module: Box<dyn Module>,
}

impl BoxedModule {
    /// Boxes a module.
    pub fn new<M: Module>(module: M) -> Self {
        Self {
            id: module.id(),
            definition: TypeKey::of::<M>(),
            module: Box::new(module),
        }
    }

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
}

impl fmt::Debug for BoxedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedModule")
            .field("id", &self.id)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ModuleBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Collects what a module registers during [`Module::define`].
pub struct ModuleBuilder {
    id: ModuleId,
    providers: Vec<Provider>,
    imports: Vec<BoxedModule>,
    requires: Vec<TypeKey>,
}

/// The collected registrations of one module.
pub(crate) struct ModuleParts {
    pub(crate) providers: Vec<Provider>,
    pub(crate) imports: Vec<BoxedModule>,
    pub(crate) requires: Vec<TypeKey>,
}

impl ModuleBuilder {
    pub(crate) fn new(id: ModuleId) -> Self {
        Self {
            id,
            providers: Vec::new(),
            imports: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> ModuleParts {
        ModuleParts {
            providers: self.providers,
            imports: self.imports,
            requires: self.requires,
        }
    }

    /// Returns the id of the module being defined.
    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Registers an infallible factory.
    ///
    /// The factory's return type is the provided type as written. A factory
    /// returning `Result<T, E>` therefore provides the `Result` itself and
    /// its error never aborts construction; register it with
    /// [`try_provide`](Self::try_provide) to provide `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::DuplicateProvider`] if this module already
    /// provides the factory's output type.
    pub fn provide<F, M>(&mut self, factory: F) -> Result<ProviderEntry<'_, F::Output>, ModuleError>
    where
        F: IntoProvider<M>,
    {
        let provider = Provider::from_factory(factory, self.id.clone());
        if returns_result(provider.output().type_name()) {
            tracing::debug!(
                module = %self.id,
                output = provider.output().type_name(),
                "factory returns a Result and provides it as-is; use try_provide to unwrap it"
            );
        }
        self.push(provider)
    }

    /// Registers a fallible factory. Its error aborts graph construction.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::DuplicateProvider`] if this module already
    /// provides the factory's output type.
    pub fn try_provide<F, M>(
        &mut self,
        factory: F,
    ) -> Result<ProviderEntry<'_, F::Output>, ModuleError>
    where
        F: IntoTryProvider<M>,
    {
        let provider = Provider::from_try_factory(factory, self.id.clone());
        self.push(provider)
    }

    /// Registers a ready-made value. Every consumer shares this value.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::DuplicateProvider`] if this module already
    /// provides `T`.
    pub fn instance<T: Injectable>(&mut self, value: T) -> Result<ProviderEntry<'_, T>, ModuleError> {
        let provider = Provider::from_instance(value, self.id.clone());
        self.push(provider)
    }

    /// Imports another module, making its providers visible to this one.
    ///
    /// Importing the same definition under the same id twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::DuplicateImport`] if a different definition was
    /// already imported under the same id.
    pub fn import<M: Module>(&mut self, module: M) -> Result<&mut Self, ModuleError> {
        let boxed = BoxedModule::new(module);
        if let Some(existing) = self.imports.iter().find(|m| m.id == boxed.id) {
            if existing.definition != boxed.definition {
                return Err(ModuleError::DuplicateImport { id: boxed.id });
            }
            tracing::trace!(module = %self.id, import = %boxed.id, "import already declared");
            return Ok(self);
        }
        self.imports.push(boxed);
        Ok(self)
    }

    /// Declares that this module needs `T` from somewhere in the graph.
    ///
    /// `T` may come from any module, including one this module does not
    /// import. Once required, `T` is visible to this module's providers.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::DuplicateDependency`] if `T` was already
    /// declared.
    pub fn require<T: 'static>(&mut self) -> Result<&mut Self, ModuleError> {
        self.push_requirement(TypeKey::of::<T>())?;
        Ok(self)
    }

    /// Declares several requirements at once, e.g. `require_all::<(A, B)>()`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::DuplicateDependency`] on the first type that
    /// was already declared.
    pub fn require_all<T: IntoTypeKeys>(&mut self) -> Result<&mut Self, ModuleError> {
        for key in T::type_keys() {
            self.push_requirement(key)?;
        }
        Ok(self)
    }

    /// Returns the output types registered so far.
    pub fn provided(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.providers.iter().map(Provider::output)
    }

    fn push_requirement(&mut self, key: TypeKey) -> Result<(), ModuleError> {
        if self.requires.contains(&key) {
            return Err(ModuleError::DuplicateDependency { key });
        }
        self.requires.push(key);
        Ok(())
    }

    fn push<T>(&mut self, provider: Provider) -> Result<ProviderEntry<'_, T>, ModuleError> {
        let key = provider.output();
        if self.providers.iter().any(|p| p.output() == key) {
            return Err(ModuleError::DuplicateProvider { key });
        }
        let index = self.providers.len();
        self.providers.push(provider);
        Ok(ProviderEntry {
            provider: &mut self.providers[index],
            _marker: PhantomData,
        })
    }
}

impl fmt::Debug for ModuleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBuilder")
            .field("id", &self.id)
            .field("providers", &self.providers)
            .field("imports", &self.imports)
            .field("requires", &self.requires)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProviderEntry
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to a just-registered provider, used to attach lifecycle hooks.
///
/// The hook methods are only available when the provided type implements the
/// matching trait.
pub struct ProviderEntry<'a, T> {
    provider: &'a mut Provider,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> ProviderEntry<'a, T> {
    /// Returns the registered provider.
    #[must_use]
    pub fn provider(&self) -> &Provider {
        self.provider
    }
}

impl<'a, T: Starter> ProviderEntry<'a, T> {
    /// Runs [`Starter::start`] on this instance when the application starts.
    pub fn with_start(self) -> Self {
        self.provider.capabilities_mut().set_start::<T>();
        self
    }
}

impl<'a, T: Stopper> ProviderEntry<'a, T> {
    /// Runs [`Stopper::stop`] on this instance when the application stops.
    pub fn with_stop(self) -> Self {
        self.provider.capabilities_mut().set_stop::<T>();
        self
    }
}

impl<'a, T: Starter + Stopper> ProviderEntry<'a, T> {
    /// Registers both the start and the stop hook.
    pub fn with_lifecycle(self) -> Self {
        self.with_start().with_stop()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Modules Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can be handed to resolution as a set of root modules: a
/// single module, a [`ModuleGroup`], or a tuple of either.
pub trait Modules {
    /// Appends these modules to `roots`, in order.
    fn collect_into(self, roots: &mut Vec<BoxedModule>);
}

impl<M: Module> Modules for M {
    fn collect_into(self, roots: &mut Vec<BoxedModule>) {
        roots.push(BoxedModule::new(self));
    }
}

impl Modules for ModuleGroup {
    fn collect_into(self, roots: &mut Vec<BoxedModule>) {
        roots.extend(self.modules);
    }
}

macro_rules! impl_modules_for_tuple {
    ($(($M:ident, $m:ident)),*) => {
        impl<$($M: Modules),*> Modules for ($($M,)*) {
            fn collect_into(self, roots: &mut Vec<BoxedModule>) {
                let ($($m,)*) = self;
                $($m.collect_into(roots);)*
            }
        }
    };
}

all_tuples!(impl_modules_for_tuple, 1, 12, M, m);

// ─────────────────────────────────────────────────────────────────────────────
// ModuleGroup
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered set of modules passed around as one unit.
///
/// ```
/// use trellis_graph::prelude::*;
///
/// struct Clock;
/// struct Metrics;
///
/// let group = ModuleGroup::new()
///     .add(module_fn("clock", |m| m.provide(|| Clock).map(|_| ())))
///     .add(module_fn("metrics", |m| m.provide(|| Metrics).map(|_| ())));
///
/// let graph = build_graph(group).unwrap();
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ModuleGroup {
    modules: Vec<BoxedModule>,
}

impl ModuleGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<M: Module>(mut self, module: M) -> Self {
        self.modules.push(BoxedModule::new(module));
        self
    }

    /// Appends every module of another group.
    #[must_use]
    pub fn merge(mut self, other: ModuleGroup) -> Self {
        self.modules.extend(other.modules);
        self
    }

    /// Removes the module with the given id, if present.
    #[must_use]
    pub fn disable(mut self, id: &str) -> Self {
        self.modules.retain(|m| m.id.as_str() != id);
        self
    }

    /// Returns `true` if a module with the given id is in the group.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id.as_str() == id)
    }

    /// Returns the ids of the modules in the group, in order.
    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter().map(|m| &m.id)
    }

    /// Returns the number of modules in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn returns_result(type_name: &str) -> bool {
    type_name.starts_with("core::result::Result<")
}
