//! Errors raised while defining modules, resolving them, and building graphs.

use crate::key::TypeKey;
use crate::module::ModuleId;
use core::fmt;

/// Boxed error returned by fallible factories and lifecycle hooks.
pub type DynError = Box<dyn core::error::Error + Send + Sync + 'static>;

// ─────────────────────────────────────────────────────────────────────────────
// Module definition errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by a [`ModuleBuilder`](crate::module::ModuleBuilder) while
/// a module definition runs.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module registered two providers for the same output type.
    #[error("type '{key}' is already provided by this module")]
    DuplicateProvider {
        /// The output type registered twice.
        key: TypeKey,
    },

    /// The module declared the same explicit dependency twice.
    #[error("dependency '{key}' is already required by this module")]
    DuplicateDependency {
        /// The type required twice.
        key: TypeKey,
    },

    /// The module imported two different module definitions under one id.
    #[error("another module with id '{id}' is already imported")]
    DuplicateImport {
        /// The id claimed by both imports.
        id: ModuleId,
    },

    /// A custom error raised by the definition itself.
    #[error("{0}")]
    Custom(String),
}

impl ModuleError {
    /// Creates a [`ModuleError::Custom`] from any displayable message.
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::Custom(message.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Build errors
// ─────────────────────────────────────────────────────────────────────────────

/// Who asked for a dependency that could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// A provider's factory parameter.
    Provider {
        /// Type name of the factory.
        name: &'static str,
        /// The type the factory produces.
        output: TypeKey,
    },
    /// An explicit `require` declaration on the module.
    Module,
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Provider { output, .. } => write!(f, "provider of '{output}'"),
            Requester::Module => f.write_str("explicit requirement"),
        }
    }
}

/// Errors that abort registry resolution or graph construction.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A module imports itself, directly or through other modules.
    #[error("cyclic import: {}", join_ids(path))]
    CyclicImport {
        /// The import path, starting and ending with the same module.
        path: Vec<ModuleId>,
    },

    /// Two different module definitions share one id.
    #[error("module id '{id}' is used by two different module definitions")]
    ConflictingModuleId {
        /// The contested id.
        id: ModuleId,
    },

    /// A module definition reported an error.
    #[error("module '{module}' failed to define: {source}")]
    Module {
        /// The module whose definition failed.
        module: ModuleId,
        /// The underlying definition error.
        #[source]
        source: ModuleError,
    },

    /// Two modules provide the same type.
    #[error("type '{key}' is provided by both module '{first}' and module '{second}'")]
    DuplicateProvider {
        /// The contested output type.
        key: TypeKey,
        /// The module that registered the provider first.
        first: ModuleId,
        /// The module that tried to register it again.
        second: ModuleId,
    },

    /// A dependency is not visible from the module that needs it.
    #[error("unresolved dependency '{dependency}' of {requested_by} in module '{module}'")]
    UnresolvedDependency {
        /// The missing type.
        dependency: TypeKey,
        /// The provider or declaration that asked for it.
        requested_by: Requester,
        /// The module being validated.
        module: ModuleId,
    },

    /// No provider exists for a type needed during instantiation.
    #[error("no provider for type '{key}'")]
    MissingProvider {
        /// The type that has no provider.
        key: TypeKey,
    },

    /// Providers depend on each other in a loop.
    #[error("cyclic dependency: {}", join_keys(chain))]
    CyclicDependency {
        /// The dependency chain, starting and ending with the same type.
        chain: Vec<TypeKey>,
    },

    /// A fallible factory returned an error.
    #[error("provider '{provider}' of type '{key}' failed: {source}")]
    ProviderFailed {
        /// Type name of the failing factory.
        provider: &'static str,
        /// The type the factory was building.
        key: TypeKey,
        /// The error the factory returned.
        #[source]
        source: DynError,
    },
}

impl BuildError {
    /// Returns the error reported by a failing factory, if this is a
    /// [`BuildError::ProviderFailed`].
    #[must_use]
    pub fn provider_error(&self) -> Option<&(dyn core::error::Error + Send + Sync + 'static)> {
        match self {
            BuildError::ProviderFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

fn join_ids(path: &[ModuleId]) -> String {
    path.iter()
        .map(ModuleId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn join_keys(chain: &[TypeKey]) -> String {
    chain
        .iter()
        .map(TypeKey::type_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised when a provider is invoked with arguments that do not match
/// its declared dependencies.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// Fewer or more arguments than dependencies.
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Number of declared dependencies.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// An argument was not an instance of the declared type.
    #[error("argument {index} is not an instance of '{expected}'")]
    Downcast {
        /// Position of the argument.
        index: usize,
        /// The declared type name.
        expected: &'static str,
    },
}

/// Error returned by [`Graph::require`](crate::graph::Graph::require) when
/// the graph holds no instance of the requested type.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no instance of type '{key}' in the graph")]
pub struct MissingInstance {
    /// The requested type.
    pub key: TypeKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn cyclic_import_lists_path() {
        let err = BuildError::CyclicImport {
            path: vec![ModuleId::new("a"), ModuleId::new("b"), ModuleId::new("a")],
        };
        assert_eq!(err.to_string(), "cyclic import: a -> b -> a");
    }

    #[test]
    fn duplicate_provider_names_both_modules() {
        let err = BuildError::DuplicateProvider {
            key: TypeKey::of::<Alpha>(),
            first: ModuleId::new("storage"),
            second: ModuleId::new("cache"),
        };
        let message = err.to_string();
        assert!(message.contains("Alpha"));
        assert!(message.contains("'storage'"));
        assert!(message.contains("'cache'"));
    }

    #[test]
    fn unresolved_dependency_names_requester() {
        let err = BuildError::UnresolvedDependency {
            dependency: TypeKey::of::<Alpha>(),
            requested_by: Requester::Provider {
                name: "make_beta",
                output: TypeKey::of::<Beta>(),
            },
            module: ModuleId::new("app"),
        };
        let message = err.to_string();
        assert!(message.contains("Alpha"));
        assert!(message.contains("provider of"));
        assert!(message.contains("Beta"));
        assert!(message.contains("'app'"));
    }

    #[test]
    fn provider_failed_keeps_source() {
        let err = BuildError::ProviderFailed {
            provider: "open_db",
            key: TypeKey::of::<Alpha>(),
            source: "connection refused".into(),
        };
        assert_eq!(
            err.provider_error().map(ToString::to_string).as_deref(),
            Some("connection refused")
        );
        assert!(core::error::Error::source(&err).is_some());
    }

    #[test]
    fn other_errors_have_no_provider_error() {
        let err = BuildError::MissingProvider {
            key: TypeKey::of::<Alpha>(),
        };
        assert!(err.provider_error().is_none());
    }
}
