//! Tests for module resolution.
//!
//! These tests verify `Registry::resolve()`:
//! - Import cycles and module identity
//! - Duplicate providers across modules
//! - Dependency visibility through imports
//! - Errors raised inside module definitions

use std::sync::Arc;
use trellis_graph::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Test Types
// ─────────────────────────────────────────────────────────────────────────────

struct Config;
struct Database;
struct Cache;
struct Api;

fn config_module(m: &mut ModuleBuilder) -> Result<(), ModuleError> {
    m.instance(Config)?;
    Ok(())
}

fn database_module(m: &mut ModuleBuilder) -> Result<(), ModuleError> {
    m.import(module_fn("config", config_module))?;
    m.provide(|_: Arc<Config>| Database)?;
    Ok(())
}

struct Recursive {
    id: &'static str,
    imports: &'static [&'static str],
}

impl Module for Recursive {
    fn id(&self) -> ModuleId {
        ModuleId::new(self.id)
    }

    fn define(&self, m: &mut ModuleBuilder) -> Result<(), ModuleError> {
        for &import in self.imports {
            m.import(recursive(import))?;
        }
        Ok(())
    }
}

/// Module graph: a -> b -> c -> a, and d standing alone.
fn recursive(id: &'static str) -> Recursive {
    let imports: &'static [&'static str] = match id {
        "a" => &["b"],
        "b" => &["c"],
        "c" => &["a"],
        "self" => &["self"],
        _ => &[],
    };
    Recursive { id, imports }
}

// ─────────────────────────────────────────────────────────────────────────────
// Import Cycles and Identity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn cyclic_import_reports_path() {
    let err = Registry::resolve(recursive("a")).unwrap_err();

    match &err {
        BuildError::CyclicImport { path } => {
            let path: Vec<_> = path.iter().map(ModuleId::as_str).collect();
            assert_eq!(path, vec!["a", "b", "c", "a"]);
        }
        other => panic!("expected CyclicImport, got {other:?}"),
    }
    assert_eq!(err.to_string(), "cyclic import: a -> b -> c -> a");
}

#[test]
fn self_import_is_a_cycle() {
    let err = Registry::resolve(recursive("self")).unwrap_err();
    assert!(matches!(err, BuildError::CyclicImport { ref path } if path.len() == 2));
}

#[test]
fn standalone_recursive_module_resolves() {
    let registry = Registry::resolve(recursive("d")).unwrap();
    assert!(registry.contains_module("d"));
}

#[test]
fn conflicting_module_ids_are_rejected() {
    let err = Registry::resolve((
        module_fn("storage", |m| m.provide(|| Database).map(|_| ())),
        module_fn("storage", |m| m.provide(|| Cache).map(|_| ())),
    ))
    .unwrap_err();

    assert!(matches!(err, BuildError::ConflictingModuleId { ref id } if id.as_str() == "storage"));
}

#[test]
fn shared_import_is_resolved_once() {
    let registry = Registry::resolve((
        module_fn("db", database_module),
        module_fn("api", |m| {
            m.import(module_fn("config", config_module))?;
            m.provide(|_: Arc<Config>| Api)?;
            Ok(())
        }),
    ))
    .unwrap();

    let order: Vec<_> = registry.modules().map(|m| m.id().as_str()).collect();
    assert_eq!(order, vec!["config", "db", "api"]);
    assert_eq!(registry.len(), 3);
}

// ─────────────────────────────────────────────────────────────────────────────
// Duplicate Providers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn duplicate_provider_names_both_modules() {
    let err = Registry::resolve((
        module_fn("primary", |m| m.provide(|| Cache).map(|_| ())),
        module_fn("secondary", |m| m.provide(|| Cache).map(|_| ())),
    ))
    .unwrap_err();

    match err {
        BuildError::DuplicateProvider { key, first, second } => {
            assert_eq!(key, TypeKey::of::<Cache>());
            assert_eq!(first.as_str(), "primary");
            assert_eq!(second.as_str(), "secondary");
        }
        other => panic!("expected DuplicateProvider, got {other:?}"),
    }
}

#[test]
fn duplicate_provider_within_module_is_a_module_error() {
    let err = Registry::resolve(module_fn("twice", |m| {
        m.provide(|| Cache)?;
        m.provide(|| Cache)?;
        Ok(())
    }))
    .unwrap_err();

    match err {
        BuildError::Module { module, source } => {
            assert_eq!(module.as_str(), "twice");
            assert!(matches!(source, ModuleError::DuplicateProvider { .. }));
        }
        other => panic!("expected Module error, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn dependency_from_sibling_module_is_unresolved() {
    // "api" needs Config, which only "config" provides, but "api" does not
    // import it.
    let err = Registry::resolve((
        module_fn("config", config_module),
        module_fn("api", |m| m.provide(|_: Arc<Config>| Api).map(|_| ())),
    ))
    .unwrap_err();

    match err {
        BuildError::UnresolvedDependency {
            dependency,
            requested_by,
            module,
        } => {
            assert_eq!(dependency, TypeKey::of::<Config>());
            assert_eq!(module.as_str(), "api");
            assert!(
                matches!(requested_by, Requester::Provider { output, .. } if output == TypeKey::of::<Api>())
            );
        }
        other => panic!("expected UnresolvedDependency, got {other:?}"),
    }
}

#[test]
fn transitive_imports_are_visible() {
    let registry = Registry::resolve(module_fn("api", |m| {
        m.import(module_fn("db", database_module))?;
        // Config comes from "config", imported by "db".
        m.provide(|_: Arc<Config>, _: Arc<Database>| Api)?;
        Ok(())
    }))
    .unwrap();

    assert!(registry.provides::<Api>());
    assert_eq!(registry.len(), 3);
}

#[test]
fn missing_explicit_requirement() {
    let err = Registry::resolve(module_fn("api", |m| {
        m.require::<Database>()?;
        Ok(())
    }))
    .unwrap_err();

    assert!(matches!(
        err,
        BuildError::UnresolvedDependency {
            requested_by: Requester::Module,
            ..
        }
    ));
}

#[test]
fn satisfied_explicit_requirements() {
    let registry = Registry::resolve(module_fn("api", |m| {
        m.import(module_fn("db", database_module))?;
        m.require_all::<(Config, Database)>()?;
        Ok(())
    }))
    .unwrap();

    let api = registry.module("api").unwrap();
    assert_eq!(
        api.requires(),
        &[TypeKey::of::<Config>(), TypeKey::of::<Database>()]
    );
}

#[test]
fn explicit_requirement_reaches_sibling_module() {
    // "api" does not import "config", but requiring Config makes it visible
    // to the Api provider.
    let registry = Registry::resolve((
        module_fn("config", config_module),
        module_fn("api", |m| {
            m.require::<Config>()?;
            m.provide(|_: Arc<Config>| Api)?;
            Ok(())
        }),
    ))
    .unwrap();

    assert!(registry.provides::<Api>());
    assert_eq!(
        registry.module("api").unwrap().requires(),
        &[TypeKey::of::<Config>()]
    );
}

#[test]
fn explicit_requirement_without_any_provider() {
    let err = Registry::resolve((
        module_fn("config", config_module),
        module_fn("api", |m| {
            m.require::<Cache>()?;
            m.provide(|_: Arc<Cache>| Api)?;
            Ok(())
        }),
    ))
    .unwrap_err();

    match err {
        BuildError::UnresolvedDependency {
            dependency,
            requested_by: Requester::Module,
            module,
        } => {
            assert_eq!(dependency, TypeKey::of::<Cache>());
            assert_eq!(module.as_str(), "api");
        }
        other => panic!("expected UnresolvedDependency from the module, got {other:?}"),
    }
}

#[test]
fn explicit_requirement_does_not_leak_to_other_modules() {
    let err = Registry::resolve((
        module_fn("config", config_module),
        module_fn("api", |m| m.require::<Config>().map(|_| ())),
        module_fn("db", |m| m.provide(|_: Arc<Config>| Database).map(|_| ())),
    ))
    .unwrap_err();

    assert!(matches!(
        err,
        BuildError::UnresolvedDependency { ref module, .. } if module.as_str() == "db"
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Definition Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn custom_definition_error_is_wrapped() {
    let err = Registry::resolve(module_fn("app", |m| {
        m.import(module_fn("broken", |_| Err(ModuleError::custom("missing env var"))))?;
        Ok(())
    }))
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "module 'broken' failed to define: missing env var"
    );
}

#[test]
fn conflicting_import_inside_module() {
    let err = Registry::resolve(module_fn("app", |m| {
        m.import(module_fn("storage", |m| m.provide(|| Database).map(|_| ())))?;
        m.import(module_fn("storage", |m| m.provide(|| Cache).map(|_| ())))?;
        Ok(())
    }))
    .unwrap_err();

    assert!(matches!(
        err,
        BuildError::Module {
            source: ModuleError::DuplicateImport { .. },
            ..
        }
    ));
}
