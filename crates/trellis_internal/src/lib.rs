//! # Trellis Internal Library
//!
//! Re-exports the core Trellis crates for convenience.

/// Modules, providers and object graphs.
pub use trellis_graph;

/// Application lifecycle.
pub use trellis_app;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_app::prelude::*;
}
