//! Derive macro for the `Inject` trait.

use darling::{FromDeriveInput, FromField, ast::Data, util::Ignored};
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericArgument, PathArguments, Type, Visibility, parse_macro_input};

/// Parsed attributes for the struct.
#[derive(FromDeriveInput)]
#[darling(attributes(inject), supports(struct_named))]
struct InjectArgs {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<Ignored, InjectFieldArgs>,
}

/// Parsed attributes for one field.
#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectFieldArgs {
    ident: Option<syn::Ident>,
    ty: Type,
    vis: Visibility,

    /// Leave this field alone.
    #[darling(default)]
    skip: bool,
}

impl InjectFieldArgs {
    fn is_injectable(&self) -> bool {
        !self.skip && matches!(self.vis, Visibility::Public(_)) && is_injectable_type(&self.ty)
    }
}

/// Returns the generic arguments of the last path segment if it is named
/// `name`, e.g. `Arc` in `std::sync::Arc<T>`.
fn single_generic<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// `Arc<T>` or `Option<Arc<T>>`.
fn is_injectable_type(ty: &Type) -> bool {
    single_generic(ty, "Arc").is_some()
        || single_generic(ty, "Option").is_some_and(|inner| single_generic(inner, "Arc").is_some())
}

/// Implementation of the `#[derive(Inject)]` macro.
pub(crate) fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let args = match InjectArgs::from_derive_input(&input) {
        Ok(args) => args,
        Err(err) => return err.write_errors().into(),
    };

    let Data::Struct(fields) = &args.data else {
        return syn::Error::new_spanned(&input.ident, "Inject can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let graph_crate =
        trellis_macro_utils::resolve_crate_path(trellis_macro_utils::TrellisCrate::Graph);

    let injected: Vec<_> = fields
        .iter()
        .filter(|field| field.is_injectable())
        .filter_map(|field| field.ident.as_ref().map(|ident| (ident, &field.ty)))
        .collect();

    let mut generics = args.generics.clone();
    if !injected.is_empty() {
        let where_clause = generics.make_where_clause();
        for (_, ty) in &injected {
            where_clause
                .predicates
                .push(syn::parse_quote!(#ty: #graph_crate::inject::InjectField));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let name = &args.ident;
    let graph = if injected.is_empty() {
        format_ident!("_graph")
    } else {
        format_ident!("graph")
    };
    let assignments = injected.iter().map(|(ident, ty)| {
        quote! {
            <#ty as #graph_crate::inject::InjectField>::inject_field(&mut self.#ident, #graph);
        }
    });

    let expanded = quote! {
        impl #impl_generics #graph_crate::inject::Inject for #name #ty_generics #where_clause {
            fn inject(&mut self, #graph: &#graph_crate::graph::Graph) {
                #(#assignments)*
            }
        }
    };

    expanded.into()
}
