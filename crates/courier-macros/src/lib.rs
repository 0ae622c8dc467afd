//! Attribute macros for courier.
//!
//! ```ignore
//! #[courier::messenger(records(Point))]
//! pub trait Canvas {
//!     fn clear(&self);
//!     fn draw(&self, at: Point, label: String);
//! }
//! ```
//!
//! The trait is emitted unchanged, followed by the generated proxy and
//! dispatcher. Generation failures become `compile_error!`s at the
//! offending spans.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Parser;

use courier_gen::KnownTypes;
use courier_gen::Options;
use courier_gen::TransportKind;

/// Arguments accepted by both attributes.
#[derive(Default)]
struct Args {
    name: Option<String>,
    known: KnownTypes,
    runtime: Option<syn::Path>,
}

impl Args {
    fn parse(tokens: TokenStream) -> syn::Result<Self> {
        let mut args = Args::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("name") {
                let name: syn::LitStr = meta.value()?.parse()?;
                args.name = Some(name.value());
                Ok(())
            } else if meta.path.is_ident("records") {
                meta.parse_nested_meta(|nested| {
                    let name = last_ident(&nested.path)?;
                    args.known = std::mem::take(&mut args.known).record(name);
                    Ok(())
                })
            } else if meta.path.is_ident("serial") {
                meta.parse_nested_meta(|nested| {
                    let name = last_ident(&nested.path)?;
                    args.known = std::mem::take(&mut args.known).serializable(name);
                    Ok(())
                })
            } else if meta.path.is_ident("crate") {
                args.runtime = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `name`, `records`, `serial` or `crate`"))
            }
        });
        parser.parse(tokens)?;
        Ok(args)
    }
}

fn last_ident(path: &syn::Path) -> syn::Result<String> {
    path.segments
        .last()
        .map(|s| s.ident.to_string())
        .ok_or_else(|| syn::Error::new_spanned(path, "expected a type name"))
}

fn expand(attr: TokenStream, item: TokenStream, transport: TransportKind) -> TokenStream {
    let args = match Args::parse(attr) {
        Ok(args) => args,
        Err(e) => return e.to_compile_error().into(),
    };
    let item = match syn::parse::<syn::Item>(item) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut decl = courier_gen::syntax::lower_item(&item, &args.known, transport);
    decl.output_name = args.name;

    let mut options = Options::new();
    if let Some(runtime) = args.runtime {
        options = options.runtime(runtime);
    }

    match courier_gen::generate(&decl, &options) {
        Ok(generated) => {
            let tokens = generated.tokens;
            quote!(#item #tokens).into()
        }
        Err(diagnostics) => {
            let errors = diagnostics.iter().map(|d| d.to_compile_error());
            quote!(#item #(#errors)*).into()
        }
    }
}

/// Generates a same-process `<Trait>Handler` proxy and its dispatcher.
///
/// Arguments are moved to the receiver without serialization, so any
/// owned `Send + 'static` parameter type is accepted. Borrowed parameters,
/// `impl Trait` parameters and associated types or constants are rejected
/// with a compile error naming the method and parameter.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, TransportKind::DirectLocal)
}

/// Generates a cross-process `<Trait>Messenger` proxy and its dispatcher.
///
/// Every parameter must belong to a transportable category. Name record
/// types in `records(...)` and serde types in `serial(...)`.
#[proc_macro_attribute]
pub fn messenger(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, TransportKind::CrossProcess)
}
