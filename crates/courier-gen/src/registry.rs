//! # Method Registry
//!
//! The single table both emitters consult to agree on method ids.
//!
//! ## Invariants
//!
//! - Ids are dense, start at 1, and follow declaration order.
//! - The same method order always yields the same ids.
//! - A registry is built once per interface and never mutated afterwards.

use crate::error::Diagnostic;
use crate::error::ErrorKind;
use crate::ir::InterfaceSpec;
use crate::ir::MethodSpec;
use crate::ir::ResultKind;

#[derive(Debug, Clone)]
pub struct RegisteredMethod {
    pub id: u32,
    pub spec: MethodSpec,
}

#[derive(Debug, Clone)]
pub struct MethodRegistry {
    interface: String,
    methods: Vec<RegisteredMethod>,
}

impl MethodRegistry {
    pub fn build(interface: &InterfaceSpec) -> Self {
        let methods = interface
            .methods
            .iter()
            .zip(1u32..)
            .map(|(spec, id)| RegisteredMethod { id, spec: spec.clone() })
            .collect();
        Self {
            interface: interface.name.clone(),
            methods,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Highest id in use; equal to the number of methods.
    pub fn last_id(&self) -> u32 {
        self.methods.last().map_or(0, |m| m.id)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Methods in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredMethod> {
        self.methods.iter()
    }

    pub fn get(&self, id: u32) -> Option<&RegisteredMethod> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.methods.get(index)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.methods.iter().find(|m| m.spec.name == name).map(|m| m.id)
    }
}

/// Checks every method and returns all violations, not just the first.
pub fn validate(interface: &InterfaceSpec) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if interface.generic {
        diagnostics.push(
            Diagnostic::new(
                ErrorKind::UnsupportedSignature,
                &interface.name,
                "generic interfaces cannot be proxied",
            )
            .span(interface.span),
        );
    }

    for (item, span) in &interface.other_items {
        diagnostics.push(
            Diagnostic::new(
                ErrorKind::UnsupportedSignature,
                &interface.name,
                format!("{} cannot be implemented by a proxy", item),
            )
            .span(span.or(interface.span)),
        );
    }

    for method in &interface.methods {
        if let ResultKind::Value(ty) = &method.result {
            diagnostics.push(
                Diagnostic::new(
                    ErrorKind::NonVoidMethod,
                    &interface.name,
                    format!("returns `{}`; proxied methods cannot return a value", ty),
                )
                .method(method.signature())
                .span(method.span),
            );
        }
        if let Some(reason) = &method.unsupported {
            diagnostics.push(
                Diagnostic::new(ErrorKind::UnsupportedSignature, &interface.name, reason.clone())
                    .method(method.signature())
                    .span(method.span),
            );
        }
    }

    diagnostics
}
