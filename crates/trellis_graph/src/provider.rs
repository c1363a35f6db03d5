//! Providers: recipes for producing one instance of one type.
//!
//! A provider is built from a factory function. Each parameter of the
//! factory is an `Arc<T>` of another provided type, and those parameter types
//! become the provider's dependencies:
//!
//! ```
//! use std::sync::Arc;
//! use trellis_graph::key::TypeKey;
//! use trellis_graph::provider::IntoProvider;
//!
//! struct Config;
//! struct Database;
//!
//! fn connect(_config: Arc<Config>) -> Database {
//!     Database
//! }
//!
//! assert_eq!(
//!     <fn(Arc<Config>) -> Database as IntoProvider<_>>::dependencies(),
//!     vec![TypeKey::of::<Config>()],
//! );
//! # let _ = connect;
//! ```
//!
//! Factories returning `Result<T, E>` are registered through
//! [`IntoTryProvider`]; their error is reported when the graph is built.
//! Factories may take up to twelve dependencies.

use crate::capability::Capabilities;
use crate::error::{DynError, InvocationError};
use crate::key::TypeKey;
use crate::module::ModuleId;
use core::any::Any;
use core::cell::Cell;
use core::fmt;
use std::sync::Arc;
use variadics_please::all_tuples;

// ─────────────────────────────────────────────────────────────────────────────
// Core types
// ─────────────────────────────────────────────────────────────────────────────

/// A type-erased, shared instance held by the graph.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// The type-erased call that produces a provider's instance from its
/// resolved dependencies.
pub type Invoker = Box<dyn Fn(&[Instance]) -> Result<Instance, DynError> + Send + Sync>;

/// Marker trait for types that can be provided and injected.
///
/// Automatically implemented for every `Send + Sync + 'static` type.
pub trait Injectable: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Injectable for T {}

/// A registered recipe for producing one instance of one type.
pub struct Provider {
    output: TypeKey,
    dependencies: Vec<TypeKey>,
    name: &'static str,
    module: ModuleId,
    invoker: Invoker,
    capabilities: Capabilities,
}

impl Provider {
    pub(crate) fn new(
        output: TypeKey,
        dependencies: Vec<TypeKey>,
        name: &'static str,
        module: ModuleId,
        invoker: Invoker,
    ) -> Self {
        Self {
            output,
            dependencies,
            name,
            module,
            invoker,
            capabilities: Capabilities::default(),
        }
    }

    /// Builds a provider from an infallible factory.
    pub(crate) fn from_factory<F, M>(factory: F, module: ModuleId) -> Self
    where
        F: IntoProvider<M>,
    {
        Self::new(
            TypeKey::of::<F::Output>(),
            F::dependencies(),
            core::any::type_name::<F>(),
            module,
            factory.into_invoker(),
        )
    }

    /// Builds a provider from a fallible factory.
    pub(crate) fn from_try_factory<F, M>(factory: F, module: ModuleId) -> Self
    where
        F: IntoTryProvider<M>,
    {
        Self::new(
            TypeKey::of::<F::Output>(),
            F::dependencies(),
            core::any::type_name::<F>(),
            module,
            factory.into_invoker(),
        )
    }

    /// Builds a provider that hands out an existing value.
    pub(crate) fn from_instance<T: Injectable>(value: T, module: ModuleId) -> Self {
        let instance: Instance = Arc::new(value);
        Self::new(
            TypeKey::of::<T>(),
            Vec::new(),
            core::any::type_name::<T>(),
            module,
            Box::new(move |args: &[Instance]| {
                ArgCursor::new(args, 0).check_len()?;
                Ok(Arc::clone(&instance))
            }),
        )
    }

    /// Returns the type this provider produces.
    #[must_use]
    pub fn output(&self) -> TypeKey {
        self.output
    }

    /// Returns the dependency types, in parameter order.
    #[must_use]
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    /// Returns the type name of the factory (or of the value, for instance
    /// providers).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the id of the module that registered this provider.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Returns the lifecycle hooks registered for this provider.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub(crate) fn capabilities_mut(&mut self) -> &mut Capabilities {
        &mut self.capabilities
    }

    /// Invokes the factory with already-resolved dependency instances.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError`] (boxed) if `args` does not match the
    /// declared dependencies, or the factory's own error for fallible
    /// providers.
    pub fn invoke(&self, args: &[Instance]) -> Result<Instance, DynError> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("output", &self.output)
            .field("dependencies", &self.dependencies)
            .field("name", &self.name)
            .field("module", &self.module)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument cursor
// ─────────────────────────────────────────────────────────────────────────────

/// Walks the resolved arguments of a provider call, downcasting each one to
/// the declared parameter type.
#[doc(hidden)]
pub struct ArgCursor<'a> {
    args: &'a [Instance],
    expected: usize,
    position: Cell<usize>,
}

impl<'a> ArgCursor<'a> {
    /// Creates a cursor over `args` for a call expecting `expected` values.
    pub fn new(args: &'a [Instance], expected: usize) -> Self {
        Self {
            args,
            expected,
            position: Cell::new(0),
        }
    }

    /// Checks the argument count. Call once before taking arguments.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::ArgumentCount`] on a mismatch.
    pub fn check_len(&self) -> Result<(), InvocationError> {
        if self.args.len() == self.expected {
            Ok(())
        } else {
            Err(InvocationError::ArgumentCount {
                expected: self.expected,
                actual: self.args.len(),
            })
        }
    }

    /// Takes the next argument as an `Arc<T>`.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::Downcast`] if the argument is missing or
    /// holds another type.
    pub fn take<T: Injectable>(&self) -> Result<Arc<T>, InvocationError> {
        let index = self.position.get();
        self.position.set(index + 1);
        let mismatch = || InvocationError::Downcast {
            index,
            expected: core::any::type_name::<T>(),
        };
        let instance = self.args.get(index).ok_or_else(mismatch)?;
        Arc::clone(instance).downcast::<T>().map_err(|_| mismatch())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoProvider / IntoTryProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion from an infallible factory function into a provider.
///
/// Implemented for `Fn(Arc<P0>, ..., Arc<Pn>) -> T` with up to twelve
/// parameters. The `Marker` parameter keeps the per-arity implementations
/// from overlapping.
///
/// A factory returning `Result<T, E>` also satisfies this trait, producing a
/// provider of the `Result` itself. Register such factories with
/// [`ModuleBuilder::try_provide`](crate::module::ModuleBuilder::try_provide).
pub trait IntoProvider<Marker>: Sized {
    /// The type this factory produces.
    type Output: Injectable;

    /// Returns the parameter types of the factory, in order.
    fn dependencies() -> Vec<TypeKey>;

    /// Erases the factory into an [`Invoker`].
    fn into_invoker(self) -> Invoker;
}

/// Conversion from a fallible factory function into a provider.
///
/// Implemented for `Fn(Arc<P0>, ..., Arc<Pn>) -> Result<T, E>` with up to
/// twelve parameters, where `E` converts into [`DynError`].
pub trait IntoTryProvider<Marker>: Sized {
    /// The type this factory produces on success.
    type Output: Injectable;

    /// Returns the parameter types of the factory, in order.
    fn dependencies() -> Vec<TypeKey>;

    /// Erases the factory into an [`Invoker`].
    fn into_invoker(self) -> Invoker;
}

/// Marker for infallible factories.
#[doc(hidden)]
pub struct FactoryMarker;

/// Marker for fallible factories.
#[doc(hidden)]
pub struct TryFactoryMarker;

macro_rules! impl_into_provider {
    ($(($P:ident, $p:ident)),*) => {
        impl<F, O, $($P),*> IntoProvider<(FactoryMarker, $($P,)*)> for F
        where
            F: Fn($(Arc<$P>),*) -> O + Send + Sync + 'static,
            O: Injectable,
            $($P: Injectable,)*
        {
            type Output = O;

            fn dependencies() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$P>()),*]
            }

            fn into_invoker(self) -> Invoker {
                Box::new(move |args: &[Instance]| {
                    let cursor = ArgCursor::new(args, Self::dependencies().len());
                    cursor.check_len()?;
                    $(let $p = cursor.take::<$P>()?;)*
                    let instance: Instance = Arc::new((self)($($p),*));
                    Ok(instance)
                })
            }
        }

        impl<F, O, E, $($P),*> IntoTryProvider<(TryFactoryMarker, $($P,)*)> for F
        where
            F: Fn($(Arc<$P>),*) -> Result<O, E> + Send + Sync + 'static,
            O: Injectable,
            E: Into<DynError>,
            $($P: Injectable,)*
        {
            type Output = O;

            fn dependencies() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$P>()),*]
            }

            fn into_invoker(self) -> Invoker {
                Box::new(move |args: &[Instance]| {
                    let cursor = ArgCursor::new(args, Self::dependencies().len());
                    cursor.check_len()?;
                    $(let $p = cursor.take::<$P>()?;)*
                    let value = (self)($($p),*).map_err(Into::<DynError>::into)?;
                    let instance: Instance = Arc::new(value);
                    Ok(instance)
                })
            }
        }
    };
}

all_tuples!(impl_into_provider, 0, 12, P, p);
