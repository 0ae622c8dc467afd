//! # Courier Generator
//!
//! A type-directed marshalling and dispatch compiler. Given an interface
//! of one-way methods it emits a proxy that turns calls into envelopes and
//! a dispatcher that turns envelopes back into calls.
//!
//! ## Passes
//!
//! 1. [`registry::validate`] collects every signature violation.
//! 2. [`MethodRegistry::build`] assigns ids 1..=N in declaration order.
//! 3. The [`TransportStrategy`] plans each method, classifying parameters
//!    when it serializes.
//! 4. [`proxy::emit`] and [`dispatch::emit`] run over the same plans.
//!
//! Generation never panics on bad input; every failure is a [`Diagnostic`].

pub mod classify;
pub mod dispatch;
pub mod error;
pub mod generate;
pub mod ir;
pub mod marshal;
pub mod proxy;
pub mod registry;
pub mod strategy;
pub mod syntax;

pub use classify::Classification;
pub use classify::TypeCategory;
pub use classify::classify;
pub use error::Diagnostic;
pub use error::ErrorKind;
pub use generate::Batch;
pub use generate::Generated;
pub use generate::Options;
pub use generate::generate;
pub use generate::generate_all;
pub use ir::Conformance;
pub use ir::Declaration;
pub use ir::DeclarationKind;
pub use ir::InterfaceSpec;
pub use ir::MethodSpec;
pub use ir::ParamSpec;
pub use ir::ResultKind;
pub use ir::ScalarKind;
pub use ir::TransportKind;
pub use ir::TypeDesc;
pub use registry::MethodRegistry;
pub use strategy::CrossProcess;
pub use strategy::DirectLocal;
pub use strategy::MethodPlan;
pub use strategy::Ownership;
pub use strategy::TransportStrategy;
pub use syntax::KnownTypes;

#[cfg(test)]
mod tests;
