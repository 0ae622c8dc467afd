//! Generation-time diagnostics.

use std::fmt;

use proc_macro2::Span;
use proc_macro2::TokenStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The annotated item is not a trait.
    NotAnInterface,
    /// A method declares a result.
    NonVoidMethod,
    /// A parameter's type matches no transport category.
    UnsupportedParameterType,
    /// A list or sparse map is missing its element type.
    UnknownGenericArgument,
    /// The receiver is not `&self`, or the method or trait is generic.
    UnsupportedSignature,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotAnInterface => "not an interface",
            ErrorKind::NonVoidMethod => "method returns a value",
            ErrorKind::UnsupportedParameterType => "unsupported parameter type",
            ErrorKind::UnknownGenericArgument => "unknown generic argument",
            ErrorKind::UnsupportedSignature => "unsupported signature",
        };
        f.write_str(name)
    }
}

/// One generation failure, with enough context to find the fault.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub interface: String,
    /// Rendered method signature.
    pub method: Option<String>,
    pub param: Option<String>,
    pub detail: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, interface: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            interface: interface.into(),
            method: None,
            param: None,
            detail: detail.into(),
            span: None,
        }
    }

    pub fn method(mut self, signature: impl Into<String>) -> Self {
        self.method = Some(signature.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.param = Some(name.into());
        self
    }

    pub fn span(mut self, span: Option<Span>) -> Self {
        self.span = span.or(self.span);
        self
    }

    pub fn to_compile_error(&self) -> TokenStream {
        let span = self.span.unwrap_or_else(Span::call_site);
        syn::Error::new(span, self.to_string()).to_compile_error()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.interface)?;
        if let Some(method) = &self.method {
            write!(f, "::{}", method)?;
        }
        if let Some(param) = &self.param {
            write!(f, ", parameter `{}`", param)?;
        }
        write!(f, ": {}", self.detail)
    }
}

impl std::error::Error for Diagnostic {}
