//! Module resolution and object graph construction.
//!
//! `trellis_graph` turns a set of modules into a fully wired object graph:
//!
//! - [`key`] - type identity shared by providers and instances
//! - [`provider`] - factories and fixed instances
//! - [`module`] - named bundles of providers, imports and requirements
//! - [`registry`] - resolution and validation of a module set
//! - [`graph`] - instantiation and typed lookup
//! - [`inject`] - filling struct fields from a graph
//! - [`capability`] - start and stop hooks attached to providers
//! - [`error`] - error types for every phase
//!
//! Construction happens in two phases. [`Registry::resolve`](registry::Registry::resolve)
//! runs the module definitions and checks that every dependency is visible;
//! [`Graph::new`](graph::Graph::new) then calls each factory exactly once, in
//! dependency order. [`build_graph`] does both.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_graph::prelude::*;
//!
//! struct Config {
//!     greeting: &'static str,
//! }
//!
//! struct Greeter {
//!     config: Arc<Config>,
//! }
//!
//! fn config(m: &mut ModuleBuilder) -> Result<(), ModuleError> {
//!     m.instance(Config { greeting: "hello" })?;
//!     Ok(())
//! }
//!
//! let app = module_fn("app", |m| {
//!     m.import(module_fn("config", config))?;
//!     m.provide(|config: Arc<Config>| Greeter { config })?;
//!     Ok(())
//! });
//!
//! let graph = build_graph(app).unwrap();
//! assert_eq!(graph.must_get::<Greeter>().config.greeting, "hello");
//! ```

// Self-reference so `#[derive(Inject)]` output can use `trellis_graph::` paths
// within this crate.
extern crate self as trellis_graph;

/// Lifecycle hooks attached to providers.
pub mod capability;

/// Error types.
pub mod error;

/// Instantiated object graphs.
pub mod graph;

/// Struct field injection.
pub mod inject;

/// Type identity.
pub mod key;

/// Modules and the module builder.
pub mod module;

/// Providers and factory conversion.
pub mod provider;

/// Module resolution.
pub mod registry;

/// Re-export the `#[derive(Inject)]` macro.
pub use trellis_inject_macros::Inject;

/// Re-export of `async_trait` for implementing [`Starter`](capability::Starter)
/// and [`Stopper`](capability::Stopper).
pub use async_trait::async_trait;

use error::BuildError;
use graph::Graph;
use module::Modules;
use registry::Registry;

/// Resolves `modules` and instantiates every provider.
///
/// # Errors
///
/// Returns the first [`BuildError`] from resolution or instantiation.
pub fn build_graph(modules: impl Modules) -> Result<Graph, BuildError> {
    let registry = Registry::resolve(modules)?;
    Graph::new(&registry)
}

/// Builds a graph from `modules` and fills `target` from it.
///
/// The graph is dropped afterwards; the filled fields keep their instances
/// alive.
///
/// # Errors
///
/// Returns the first [`BuildError`] from resolution or instantiation. On
/// error `target` is untouched.
pub fn fill<I: inject::Inject + ?Sized>(target: &mut I, modules: impl Modules) -> Result<(), BuildError> {
    let graph = build_graph(modules)?;
    graph.fill(target);
    Ok(())
}

/// Like [`fill`], but panics on error. Intended for tests and program setup.
///
/// # Panics
///
/// Panics if the graph cannot be built.
pub fn must_fill<I: inject::Inject + ?Sized>(target: &mut I, modules: impl Modules) {
    if let Err(err) = fill(target, modules) {
        panic!("failed to build object graph: {err}");
    }
}

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::capability::*;
    pub use crate::error::*;
    pub use crate::graph::*;
    pub use crate::inject::{Inject, InjectField};
    pub use crate::key::*;
    pub use crate::module::*;
    pub use crate::provider::{Injectable, Instance, IntoProvider, IntoTryProvider, Provider};
    pub use crate::registry::*;
    pub use crate::{async_trait, build_graph, fill, must_fill};
    pub use trellis_inject_macros::Inject;
}
