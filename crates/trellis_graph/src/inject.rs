//! Filling structs from a graph.
//!
//! A type implementing [`Inject`] can have its fields populated from a
//! [`Graph`]. The usual way to get an implementation is the derive macro,
//! which fills every `pub` field whose type is `Arc<T>` or `Option<Arc<T>>`:
//!
//! ```
//! use std::sync::Arc;
//! use trellis_graph::prelude::*;
//!
//! struct Database;
//!
//! #[derive(Default, Inject)]
//! struct Handlers {
//!     pub db: Option<Arc<Database>>,
//!     #[inject(skip)]
//!     pub cached: Option<Arc<Database>>,
//!     requests: u64,
//! }
//!
//! let mut handlers = Handlers::default();
//! fill(&mut handlers, module_fn("db", |m| m.provide(|| Database).map(|_| ()))).unwrap();
//!
//! assert!(handlers.db.is_some());
//! assert!(handlers.cached.is_none());
//! assert_eq!(handlers.requests, 0);
//! ```
//!
//! Private fields and fields marked `#[inject(skip)]` are never touched. A
//! public field whose type has no instance in the graph keeps its value.

use crate::graph::Graph;
use crate::provider::Injectable;
use std::sync::Arc;

/// A type whose fields can be filled from a [`Graph`].
pub trait Inject {
    /// Replaces each injectable field with the matching graph instance.
    fn inject(&mut self, graph: &Graph);
}

/// A field type that can be filled from a [`Graph`].
///
/// Implemented for `Arc<T>` and `Option<Arc<T>>`. Returns `true` if the field
/// was assigned.
pub trait InjectField {
    /// Assigns the matching graph instance to this field, if there is one.
    fn inject_field(&mut self, graph: &Graph) -> bool;
}

impl<T: Injectable> InjectField for Arc<T> {
    fn inject_field(&mut self, graph: &Graph) -> bool {
        match graph.get::<T>() {
            Some(instance) => {
                *self = instance;
                true
            }
            None => false,
        }
    }
}

impl<T: Injectable> InjectField for Option<Arc<T>> {
    fn inject_field(&mut self, graph: &Graph) -> bool {
        match graph.get::<T>() {
            Some(instance) => {
                *self = Some(instance);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::module_fn;
    use crate::registry::Registry;

    #[derive(Debug, PartialEq)]
    struct Config(&'static str);

    struct Missing;

    fn graph() -> Graph {
        let registry = Registry::resolve(module_fn("config", |m| {
            m.instance(Config("from graph"))?;
            Ok(())
        }))
        .unwrap();
        Graph::new(&registry).unwrap()
    }

    #[test]
    fn arc_field_is_replaced() {
        let graph = graph();
        let mut field = Arc::new(Config("placeholder"));
        assert!(field.inject_field(&graph));
        assert_eq!(*field, Config("from graph"));
        assert!(Arc::ptr_eq(&field, &graph.must_get::<Config>()));
    }

    #[test]
    fn option_field_is_set() {
        let graph = graph();
        let mut field: Option<Arc<Config>> = None;
        assert!(field.inject_field(&graph));
        assert_eq!(field.as_deref(), Some(&Config("from graph")));
    }

    #[test]
    fn missing_type_leaves_field_alone() {
        let graph = graph();
        let mut field: Option<Arc<Missing>> = None;
        assert!(!field.inject_field(&graph));
        assert!(field.is_none());
    }

    #[derive(Default, crate::Inject)]
    struct Target {
        pub config: Option<Arc<Config>>,
        pub missing: Option<Arc<Missing>>,
        #[inject(skip)]
        pub skipped: Option<Arc<Config>>,
        hidden: Option<Arc<Config>>,
        pub count: u32,
    }

    #[test]
    fn derive_fills_public_fields_only() {
        let graph = graph();
        let mut target = Target {
            count: 7,
            ..Target::default()
        };
        graph.fill(&mut target);

        assert!(target.config.is_some());
        assert!(target.missing.is_none());
        assert!(target.skipped.is_none());
        assert!(target.hidden.is_none());
        assert_eq!(target.count, 7);
    }
}
