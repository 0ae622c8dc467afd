//! # Interface IR
//!
//! The declarative description the generator works from. An interface is
//! an ordered list of methods, each with ordered, named, typed parameters.
//! Order matters: it fixes method ids and argument order at the call site.

use std::fmt;

use proc_macro2::Span;
use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

/// The eight primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Bool,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 8] = [
        ScalarKind::Byte,
        ScalarKind::Short,
        ScalarKind::Int,
        ScalarKind::Long,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::Char,
        ScalarKind::Bool,
    ];

    pub fn from_rust(name: &str) -> Option<Self> {
        match name {
            "i8" => Some(ScalarKind::Byte),
            "i16" => Some(ScalarKind::Short),
            "i32" => Some(ScalarKind::Int),
            "i64" => Some(ScalarKind::Long),
            "f32" => Some(ScalarKind::Float),
            "f64" => Some(ScalarKind::Double),
            "char" => Some(ScalarKind::Char),
            "bool" => Some(ScalarKind::Bool),
            _ => None,
        }
    }

    pub fn rust_name(self) -> &'static str {
        match self {
            ScalarKind::Byte => "i8",
            ScalarKind::Short => "i16",
            ScalarKind::Int => "i32",
            ScalarKind::Long => "i64",
            ScalarKind::Float => "f32",
            ScalarKind::Double => "f64",
            ScalarKind::Char => "char",
            ScalarKind::Bool => "bool",
        }
    }

    /// Stem used by the bundle accessors, as in `put_<stem>`.
    pub fn stem(self) -> &'static str {
        match self {
            ScalarKind::Byte => "byte",
            ScalarKind::Short => "short",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Char => "char",
            ScalarKind::Bool => "bool",
        }
    }
}

/// Which protocols a named type opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conformance {
    /// Implements `courier::Record`.
    pub record: bool,
    /// Implements serde's `Serialize` and `DeserializeOwned`.
    pub serializable: bool,
}

impl Conformance {
    pub const NONE: Conformance = Conformance { record: false, serializable: false };
    pub const RECORD: Conformance = Conformance { record: true, serializable: false };
    pub const SERIAL: Conformance = Conformance { record: false, serializable: true };
}

/// Semantic shape of a parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDesc {
    Scalar(ScalarKind),
    Text,
    TextSeq,
    Handle,
    Size,
    SizeF,
    Array(Box<TypeDesc>),
    /// Growable list; the arguments are whatever the declaration supplied.
    List(Vec<TypeDesc>),
    SparseMap(Vec<TypeDesc>),
    Map(Vec<TypeDesc>),
    Named { name: String, conformance: Conformance },
    /// Anything the lowering could not describe, kept as written.
    Other(String),
}

impl TypeDesc {
    pub fn named(name: impl Into<String>, conformance: Conformance) -> Self {
        TypeDesc::Named { name: name.into(), conformance }
    }

    pub fn record(name: impl Into<String>) -> Self {
        Self::named(name, Conformance::RECORD)
    }

    pub fn serializable(name: impl Into<String>) -> Self {
        Self::named(name, Conformance::SERIAL)
    }

    pub fn array(elem: TypeDesc) -> Self {
        TypeDesc::Array(Box::new(elem))
    }

    pub fn list(elem: TypeDesc) -> Self {
        TypeDesc::List(vec![elem])
    }

    pub fn sparse(elem: TypeDesc) -> Self {
        TypeDesc::SparseMap(vec![elem])
    }

    /// Synthesizes a Rust type for a descriptor that came without one.
    pub fn to_rust(&self, runtime: &syn::Path) -> TokenStream {
        match self {
            TypeDesc::Scalar(kind) => {
                let ident = format_ident!("{}", kind.rust_name());
                quote!(#ident)
            }
            TypeDesc::Text => quote!(::std::string::String),
            TypeDesc::TextSeq => quote!(#runtime::CharSeq),
            TypeDesc::Handle => quote!(#runtime::Handle),
            TypeDesc::Size => quote!(#runtime::Size),
            TypeDesc::SizeF => quote!(#runtime::SizeF),
            TypeDesc::Array(elem) => {
                let elem = elem.to_rust(runtime);
                quote!(::std::boxed::Box<[#elem]>)
            }
            TypeDesc::List(args) => {
                let args = args.iter().map(|a| a.to_rust(runtime));
                quote!(::std::vec::Vec<#(#args),*>)
            }
            TypeDesc::SparseMap(args) => {
                let args = args.iter().map(|a| a.to_rust(runtime));
                quote!(#runtime::SparseMap<#(#args),*>)
            }
            TypeDesc::Map(args) => {
                let args = args.iter().map(|a| a.to_rust(runtime));
                quote!(::std::collections::HashMap<#(#args),*>)
            }
            TypeDesc::Named { name, .. } | TypeDesc::Other(name) => {
                syn::parse_str::<syn::Type>(name)
                    .map(|ty| quote!(#ty))
                    .unwrap_or_else(|_| quote!(()))
            }
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn args(f: &mut fmt::Formatter<'_>, wrapper: &str, args: &[TypeDesc]) -> fmt::Result {
            write!(f, "{}<", wrapper)?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")
        }

        match self {
            TypeDesc::Scalar(kind) => write!(f, "{}", kind.rust_name()),
            TypeDesc::Text => write!(f, "String"),
            TypeDesc::TextSeq => write!(f, "CharSeq"),
            TypeDesc::Handle => write!(f, "Handle"),
            TypeDesc::Size => write!(f, "Size"),
            TypeDesc::SizeF => write!(f, "SizeF"),
            TypeDesc::Array(elem) => write!(f, "Box<[{}]>", elem),
            TypeDesc::List(a) => args(f, "Vec", a),
            TypeDesc::SparseMap(a) => args(f, "SparseMap", a),
            TypeDesc::Map(a) => args(f, "HashMap", a),
            TypeDesc::Named { name, .. } | TypeDesc::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Envelope key, and the binding name in emitted signatures.
    pub name: String,
    pub desc: TypeDesc,
    /// The declared Rust type, used verbatim when present.
    pub ty: Option<syn::Type>,
    /// Why the value cannot be moved into a queued call, if it can't.
    pub unsupported: Option<String>,
    pub span: Option<Span>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, desc: TypeDesc) -> Self {
        Self {
            name: name.into(),
            desc,
            ty: None,
            unsupported: None,
            span: None,
        }
    }

    pub fn rust_type(&self, runtime: &syn::Path) -> TokenStream {
        match &self.ty {
            Some(ty) => quote!(#ty),
            None => self.desc.to_rust(runtime),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultKind {
    Unit,
    Value(String),
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub result: ResultKind,
    /// Why the method's receiver or generics cannot be proxied, if they can't.
    pub unsupported: Option<String>,
    pub span: Option<Span>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            result: ResultKind::Unit,
            unsupported: None,
            span: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, desc: TypeDesc) -> Self {
        self.params.push(ParamSpec::new(name, desc));
        self
    }

    pub fn returns(mut self, result: impl Into<String>) -> Self {
        self.result = ResultKind::Value(result.into());
        self
    }

    /// Human-readable signature, as shown in diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.desc))
            .collect();
        match &self.result {
            ResultKind::Unit => format!("{}({})", self.name, params.join(", ")),
            ResultKind::Value(ty) => format!("{}({}) -> {}", self.name, params.join(", "), ty),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceSpec {
    pub name: String,
    pub vis: syn::Visibility,
    pub methods: Vec<MethodSpec>,
    /// Set when the trait itself declares generics.
    pub generic: bool,
    /// Trait items other than methods, e.g. "associated type `Sink`".
    pub other_items: Vec<(String, Option<Span>)>,
    pub span: Option<Span>,
}

impl InterfaceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vis: syn::Visibility::Inherited,
            methods: Vec::new(),
            generic: false,
            other_items: Vec::new(),
            span: None,
        }
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }
}

/// Which delivery policy a declaration asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Same address space; live arguments are moved.
    DirectLocal,
    /// Arguments are serialized into a bundle and encoded.
    CrossProcess,
}

#[derive(Debug, Clone)]
pub enum DeclarationKind {
    Interface(InterfaceSpec),
    /// Some other item carried the annotation, e.g. `"struct"`.
    Other(String),
}

/// One annotated item handed to the generator.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub transport: TransportKind,
    /// Replaces the default `<Name><Suffix>` proxy name.
    pub output_name: Option<String>,
    pub span: Option<Span>,
}

impl Declaration {
    pub fn interface(spec: InterfaceSpec, transport: TransportKind) -> Self {
        Self {
            name: spec.name.clone(),
            span: spec.span,
            kind: DeclarationKind::Interface(spec),
            transport,
            output_name: None,
        }
    }

    pub fn other(name: impl Into<String>, kind: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Other(kind.into()),
            transport,
            output_name: None,
            span: None,
        }
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }
}
