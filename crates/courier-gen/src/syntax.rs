//! Lowering of Rust items into the interface IR.
//!
//! Types are recognized by the last segment of their path, so `String`,
//! `std::string::String` and `alloc::string::String` all lower to text.
//! Named types become records or serializables only when the caller lists
//! them in [`KnownTypes`]. A listed name wins over a built-in of the same
//! name, so a user record called `Size` stays a record.
//!
//! Every call is queued before it runs, so parameters must own their data.
//! Borrowed and `impl Trait` parameters are marked unsupported here and
//! reported when the method is planned.

use quote::ToTokens;
use syn::ext::IdentExt;
use syn::spanned::Spanned;

use crate::ir::Conformance;
use crate::ir::Declaration;
use crate::ir::InterfaceSpec;
use crate::ir::MethodSpec;
use crate::ir::ParamSpec;
use crate::ir::ResultKind;
use crate::ir::ScalarKind;
use crate::ir::TransportKind;
use crate::ir::TypeDesc;

/// Named types the caller vouches for.
#[derive(Debug, Clone, Default)]
pub struct KnownTypes {
    records: Vec<String>,
    serializable: Vec<String>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, name: impl Into<String>) -> Self {
        self.records.push(name.into());
        self
    }

    pub fn serializable(mut self, name: impl Into<String>) -> Self {
        self.serializable.push(name.into());
        self
    }

    pub fn conformance(&self, name: &str) -> Conformance {
        Conformance {
            record: self.records.iter().any(|r| r == name),
            serializable: self.serializable.iter().any(|s| s == name),
        }
    }
}

pub fn lower_item(item: &syn::Item, known: &KnownTypes, transport: TransportKind) -> Declaration {
    let (name, kind) = match item {
        syn::Item::Trait(item) => {
            return Declaration::interface(lower_trait(item, known), transport);
        }
        syn::Item::Struct(s) => (s.ident.to_string(), "struct"),
        syn::Item::Enum(e) => (e.ident.to_string(), "enum"),
        syn::Item::Union(u) => (u.ident.to_string(), "union"),
        syn::Item::Fn(f) => (f.sig.ident.to_string(), "function"),
        syn::Item::Impl(_) => ("impl".to_owned(), "impl block"),
        syn::Item::Mod(m) => (m.ident.to_string(), "module"),
        syn::Item::Type(t) => (t.ident.to_string(), "type alias"),
        _ => ("item".to_owned(), "item"),
    };
    let mut decl = Declaration::other(name, kind, transport);
    decl.span = Some(item.span());
    decl
}

pub fn lower_trait(item: &syn::ItemTrait, known: &KnownTypes) -> InterfaceSpec {
    let mut methods = Vec::new();
    let mut other_items = Vec::new();

    for trait_item in &item.items {
        match trait_item {
            syn::TraitItem::Fn(f) => methods.push(lower_method(&f.sig, known)),
            syn::TraitItem::Type(t) => {
                other_items.push((format!("associated type `{}`", t.ident), Some(t.ident.span())));
            }
            // A const with a default needs nothing from the proxy's impl.
            syn::TraitItem::Const(c) if c.default.is_some() => {}
            syn::TraitItem::Const(c) => {
                other_items.push((format!("associated constant `{}`", c.ident), Some(c.ident.span())));
            }
            other => other_items.push(("macro or verbatim trait item".to_owned(), Some(other.span()))),
        }
    }

    InterfaceSpec {
        name: item.ident.unraw().to_string(),
        vis: item.vis.clone(),
        methods,
        generic: !item.generics.params.is_empty(),
        other_items,
        span: Some(item.ident.span()),
    }
}

fn lower_method(sig: &syn::Signature, known: &KnownTypes) -> MethodSpec {
    let params = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            syn::FnArg::Typed(pat) => Some(pat),
            syn::FnArg::Receiver(_) => None,
        })
        .enumerate()
        .map(|(i, pat)| ParamSpec {
            name: param_name(&pat.pat, i),
            desc: describe(&pat.ty, known),
            ty: Some((*pat.ty).clone()),
            unsupported: ownership_problem(&pat.ty),
            span: Some(pat.span()),
        })
        .collect();

    let result = match &sig.output {
        syn::ReturnType::Default => ResultKind::Unit,
        syn::ReturnType::Type(_, ty) => match ty.as_ref() {
            syn::Type::Tuple(t) if t.elems.is_empty() => ResultKind::Unit,
            ty => ResultKind::Value(render(ty)),
        },
    };

    MethodSpec {
        name: sig.ident.unraw().to_string(),
        params,
        result,
        unsupported: unsupported_reason(sig),
        span: Some(sig.ident.span()),
    }
}

fn unsupported_reason(sig: &syn::Signature) -> Option<String> {
    if sig.asyncness.is_some() {
        return Some("async methods cannot be proxied".into());
    }
    if sig.unsafety.is_some() {
        return Some("unsafe methods cannot be proxied".into());
    }
    if !sig.generics.params.is_empty() {
        return Some("generic methods cannot be proxied".into());
    }
    match sig.receiver() {
        None => Some("methods without a `&self` receiver cannot be proxied".into()),
        Some(r) if r.reference.is_none() || r.colon_token.is_some() => {
            Some("the receiver must be `&self`".into())
        }
        Some(r) if r.mutability.is_some() => Some("`&mut self` receivers cannot be proxied".into()),
        Some(_) => None,
    }
}

/// Binding for a parameter. Non-identifier patterns get `__arg{index}`,
/// which cannot clash with a declared `arg0`.
fn param_name(pat: &syn::Pat, index: usize) -> String {
    match pat {
        syn::Pat::Ident(p) => p.ident.unraw().to_string(),
        _ => format!("__arg{}", index),
    }
}

/// Why a value of `ty` cannot be moved into a queued call, if it can't.
///
/// Only `'static` data survives the trip, so references and lifetime
/// arguments other than `'static` are rejected, as is `impl Trait`.
fn ownership_problem(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Reference(r) => match &r.lifetime {
            Some(lifetime) if lifetime.ident == "static" => ownership_problem(&r.elem),
            _ => Some(format!(
                "borrowed parameter `{}` cannot outlive the call; pass an owned value",
                render(ty)
            )),
        },
        syn::Type::ImplTrait(_) => Some(format!(
            "`{}` parameters cannot be proxied; name a concrete type",
            render(ty)
        )),
        syn::Type::Paren(p) => ownership_problem(&p.elem),
        syn::Type::Group(g) => ownership_problem(&g.elem),
        syn::Type::Slice(s) => ownership_problem(&s.elem),
        syn::Type::Array(a) => ownership_problem(&a.elem),
        syn::Type::Ptr(p) => ownership_problem(&p.elem),
        syn::Type::Tuple(t) => t.elems.iter().find_map(ownership_problem),
        syn::Type::Path(p) => {
            let qself = p.qself.as_ref().and_then(|q| ownership_problem(&q.ty));
            qself.or_else(|| {
                p.path.segments.iter().find_map(|segment| {
                    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
                        return None;
                    };
                    args.args.iter().find_map(|arg| match arg {
                        syn::GenericArgument::Lifetime(lifetime) if lifetime.ident != "static" => {
                            Some(format!(
                                "`{}` borrows for `{}`; only `'static` data can be queued",
                                render(ty),
                                lifetime
                            ))
                        }
                        syn::GenericArgument::Type(inner) => ownership_problem(inner),
                        _ => None,
                    })
                })
            })
        }
        _ => None,
    }
}

fn render(tokens: &impl ToTokens) -> String {
    tokens.to_token_stream().to_string()
}

/// Describes a declared Rust type.
pub fn describe(ty: &syn::Type, known: &KnownTypes) -> TypeDesc {
    match ty {
        syn::Type::Paren(p) => describe(&p.elem, known),
        syn::Type::Group(g) => describe(&g.elem, known),
        syn::Type::Path(p) if p.qself.is_none() => describe_path(&p.path, known),
        other => TypeDesc::Other(render(other)),
    }
}

fn describe_path(path: &syn::Path, known: &KnownTypes) -> TypeDesc {
    let Some(last) = path.segments.last() else {
        return TypeDesc::Other(render(path));
    };
    let name = last.ident.to_string();

    let conformance = known.conformance(&name);
    if conformance != Conformance::NONE {
        return TypeDesc::Named {
            name: path_name(path),
            conformance,
        };
    }

    if let syn::PathArguments::None = last.arguments {
        if let Some(kind) = ScalarKind::from_rust(&name) {
            return TypeDesc::Scalar(kind);
        }
    }

    match name.as_str() {
        "String" => TypeDesc::Text,
        "CharSeq" => TypeDesc::TextSeq,
        "Handle" => TypeDesc::Handle,
        "Size" => TypeDesc::Size,
        "SizeF" => TypeDesc::SizeF,
        "Vec" => TypeDesc::List(type_args(&last.arguments, known)),
        "SparseMap" => TypeDesc::SparseMap(type_args(&last.arguments, known)),
        "HashMap" | "BTreeMap" => TypeDesc::Map(type_args(&last.arguments, known)),
        "Box" => match boxed_slice(&last.arguments) {
            Some(elem) => TypeDesc::Array(Box::new(describe(elem, known))),
            None => TypeDesc::Other(render(path)),
        },
        _ => TypeDesc::Named {
            name: path_name(path),
            conformance,
        },
    }
}

/// Type arguments in angle brackets; lifetimes, consts and `_` are skipped.
fn type_args(args: &syn::PathArguments, known: &KnownTypes) -> Vec<TypeDesc> {
    let syn::PathArguments::AngleBracketed(args) = args else {
        return Vec::new();
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            syn::GenericArgument::Type(syn::Type::Infer(_)) => None,
            syn::GenericArgument::Type(ty) => Some(describe(ty, known)),
            _ => None,
        })
        .collect()
}

fn boxed_slice(args: &syn::PathArguments) -> Option<&syn::Type> {
    let syn::PathArguments::AngleBracketed(args) = args else {
        return None;
    };
    let mut types = args.args.iter();
    match (types.next(), types.next()) {
        (Some(syn::GenericArgument::Type(syn::Type::Slice(slice))), None) => Some(slice.elem.as_ref()),
        _ => None,
    }
}

fn path_name(path: &syn::Path) -> String {
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    let name = segments.join("::");
    if path.leading_colon.is_some() { format!("::{}", name) } else { name }
}
