//! Shared utilities for trellis procedural macro crates.
//!
//! Generated code has to name trellis crates by a path that resolves in the
//! consuming crate, whether it depends on `trellis_graph` directly (possibly
//! renamed) or only on the `trellis` umbrella crate.

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// The umbrella crate that re-exports every trellis crate.
const UMBRELLA: &str = "trellis";

/// A trellis crate that macro-generated code may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrellisCrate {
    /// `trellis_graph`
    Graph,
}

impl TrellisCrate {
    /// Returns the `Cargo.toml` package name for this crate.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "trellis_graph",
        }
    }
}

/// Returns a [`TokenStream`] path for the given trellis crate.
///
/// Resolution order:
/// 1. The crate itself, or a direct dependency (possibly renamed).
/// 2. The `trellis` umbrella crate (`trellis::<name>`), including from the
///    umbrella's own tests.
/// 3. The literal crate name, so the compile error names the missing
///    dependency.
#[must_use]
pub fn resolve_crate_path(krate: TrellisCrate) -> TokenStream {
    let name = krate.as_str();
    let literal = format_ident!("{}", name);

    match crate_name(name) {
        Ok(FoundCrate::Itself) => quote!(#literal),
        Ok(FoundCrate::Name(found)) => {
            let ident = format_ident!("{}", found);
            quote!(#ident)
        }
        Err(_) => match crate_name(UMBRELLA) {
            Ok(FoundCrate::Name(found)) => {
                let umbrella = format_ident!("{}", found);
                quote!(#umbrella::#literal)
            }
            // The umbrella's own tests and doctests link it as `::trellis`.
            Ok(FoundCrate::Itself) => {
                let umbrella = format_ident!("{}", UMBRELLA);
                quote!(::#umbrella::#literal)
            }
            Err(_) => quote!(#literal),
        },
    }
}
