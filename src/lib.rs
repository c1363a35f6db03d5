//! Module-based dependency injection for Rust.
//!
//! Services are declared in [`Module`](trellis_graph::module::Module)s, resolved
//! into a [`Registry`](trellis_graph::registry::Registry), built into a
//! [`Graph`](trellis_graph::graph::Graph) of shared singletons, and run by an
//! [`App`](trellis_app::App) that starts and stops them in dependency order.
//!
//! ```
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! struct Config {
//!     url: &'static str,
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! let graph = build_graph(module_fn("db", |m| {
//!     m.instance(Config { url: "postgres://localhost" })?;
//!     m.provide(|config: Arc<Config>| Database { config })?;
//!     Ok(())
//! }))
//! .unwrap();
//!
//! assert_eq!(graph.must_get::<Database>().config.url, "postgres://localhost");
//! ```

pub use trellis_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_internal::prelude::*;
}
