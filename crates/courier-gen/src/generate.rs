//! # Generation driver
//!
//! Runs the passes for one declaration in order: validate, build the
//! registry, plan every method with the selected strategy, then emit the
//! proxy and dispatcher from the same registry and plans.

use proc_macro2::Ident;
use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

use crate::dispatch;
use crate::error::Diagnostic;
use crate::error::ErrorKind;
use crate::ir::Declaration;
use crate::ir::DeclarationKind;
use crate::ir::TransportKind;
use crate::proxy;
use crate::registry;
use crate::registry::MethodRegistry;
use crate::strategy::Context;
use crate::strategy::MethodPlan;
use crate::strategy::strategy_for;

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct Options {
    runtime: syn::Path,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            runtime: syn::parse_quote!(::courier),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path the emitted code uses to reach the runtime crate.
    pub fn runtime(mut self, path: syn::Path) -> Self {
        self.runtime = path;
        self
    }

    pub fn runtime_path(&self) -> &syn::Path {
        &self.runtime
    }
}

/// Emitted code for one interface.
#[derive(Debug, Clone)]
pub struct Generated {
    pub interface: String,
    pub transport: TransportKind,
    pub proxy: Ident,
    pub dispatcher: Ident,
    pub plans: Vec<MethodPlan>,
    pub tokens: TokenStream,
}

impl Generated {
    /// The emitted code rendered as source text.
    pub fn source(&self) -> String {
        self.tokens.to_string()
    }
}

/// Results of a batch; failures in one declaration never stop the others.
#[derive(Debug, Default)]
pub struct Batch {
    pub outputs: Vec<Generated>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Batch {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

fn ident(name: &str, interface: &str, what: &str) -> Result<Ident, Diagnostic> {
    syn::parse_str::<Ident>(name).map_err(|_| {
        Diagnostic::new(
            ErrorKind::UnsupportedSignature,
            interface,
            format!("{} `{}` is not a valid identifier", what, name),
        )
    })
}

pub fn generate(decl: &Declaration, options: &Options) -> Result<Generated, Vec<Diagnostic>> {
    let interface = match &decl.kind {
        DeclarationKind::Interface(spec) => spec,
        DeclarationKind::Other(kind) => {
            return Err(vec![
                Diagnostic::new(
                    ErrorKind::NotAnInterface,
                    &decl.name,
                    format!("only traits can be proxied, found {}", kind),
                )
                .span(decl.span),
            ]);
        }
    };

    let strategy = strategy_for(decl.transport);
    let mut diagnostics = registry::validate(interface);
    let registry = MethodRegistry::build(interface);

    let plans = match strategy.plan(&registry) {
        Ok(plans) => plans,
        Err(mut errors) => {
            diagnostics.append(&mut errors);
            Vec::new()
        }
    };

    let proxy_name = decl
        .output_name
        .clone()
        .unwrap_or_else(|| format!("{}{}", interface.name, strategy.suffix()));
    let trait_ident = ident(&interface.name, &interface.name, "interface name");
    let proxy = ident(&proxy_name, &interface.name, "output name");

    let (trait_ident, proxy) = match (trait_ident, proxy) {
        (Ok(t), Ok(p)) if diagnostics.is_empty() => (t, p),
        (t, p) => {
            diagnostics.extend(t.err().map(|d| d.span(interface.span)));
            diagnostics.extend(p.err().map(|d| d.span(decl.span)));
            tracing::debug!(
                interface = %interface.name,
                count = diagnostics.len(),
                "generation rejected"
            );
            return Err(diagnostics);
        }
    };

    let ctx = Context {
        runtime: options.runtime_path().clone(),
        interface: interface.name.clone(),
        dispatcher: format_ident!("{}Dispatcher", proxy),
        trait_ident,
        vis: interface.vis.clone(),
        proxy,
        last_id: registry.last_id(),
    };

    let proxy_tokens = proxy::emit(&ctx, strategy, &plans);
    let dispatcher_tokens = dispatch::emit(&ctx, strategy, &plans);

    tracing::trace!(
        interface = %ctx.interface,
        proxy = %ctx.proxy,
        methods = plans.len(),
        "generated"
    );

    Ok(Generated {
        interface: ctx.interface,
        transport: decl.transport,
        proxy: ctx.proxy,
        dispatcher: ctx.dispatcher,
        plans,
        tokens: quote! {
            #proxy_tokens
            #dispatcher_tokens
        },
    })
}

pub fn generate_all(decls: &[Declaration], options: &Options) -> Batch {
    let mut batch = Batch::default();
    for decl in decls {
        match generate(decl, options) {
            Ok(generated) => batch.outputs.push(generated),
            Err(mut diagnostics) => batch.diagnostics.append(&mut diagnostics),
        }
    }
    batch
}
