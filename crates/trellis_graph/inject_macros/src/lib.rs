//! Procedural macros for `trellis_graph`.
//!
//! This crate provides `#[derive(Inject)]` for structs whose public fields
//! should be filled from an object graph.

mod inject;

use proc_macro::TokenStream;

/// Derive macro for the `Inject` trait.
///
/// Generates an implementation of `trellis_graph::inject::Inject` that fills
/// every `pub` field whose type is `Arc<T>` or `Option<Arc<T>>` with the
/// graph's instance of `T`. Other fields are left untouched.
///
/// # Attributes
///
/// - `#[inject(skip)]` on a field: never fill this field.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use trellis_graph::Inject;
///
/// #[derive(Default, Inject)]
/// struct Handlers {
///     pub db: Option<Arc<Database>>,
///     #[inject(skip)]
///     pub fallback: Option<Arc<Database>>,
/// }
/// ```
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    inject::derive_inject(input)
}
