//! # Transport Strategies
//!
//! The one variation point between the two generated flavors. A strategy
//! decides whether envelopes carry live arguments or a bundle, how the
//! proxy sends, and how the dispatcher holds its receiver. The proxy and
//! dispatcher emitters are shared and call back into the strategy for
//! each of those decisions.
//!
//! | strategy       | suffix      | envelope        | send             | receiver |
//! |----------------|-------------|-----------------|------------------|----------|
//! | `DirectLocal`  | `Handler`   | live arguments  | local enqueue    | weak     |
//! | `CrossProcess` | `Messenger` | encoded bundle  | link, may fail   | owned    |

use proc_macro2::Ident;
use proc_macro2::Literal;
use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

use crate::classify::Classification;
use crate::classify::TypeCategory;
use crate::classify::classify;
use crate::dispatch;
use crate::error::Diagnostic;
use crate::error::ErrorKind;
use crate::ir::ParamSpec;
use crate::ir::TransportKind;
use crate::marshal;
use crate::registry::MethodRegistry;
use crate::registry::RegisteredMethod;

/// How a dispatcher holds its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Weak,
}

/// Names and paths shared by every emitter for one interface.
#[derive(Debug, Clone)]
pub struct Context {
    pub runtime: syn::Path,
    pub interface: String,
    pub trait_ident: Ident,
    pub vis: syn::Visibility,
    pub proxy: Ident,
    pub dispatcher: Ident,
    pub last_id: u32,
}

#[derive(Debug, Clone)]
pub struct PlannedParam {
    pub spec: ParamSpec,
    /// `None` when the strategy never serializes.
    pub category: Option<TypeCategory>,
}

/// A registered method with its parameters resolved for one strategy.
#[derive(Debug, Clone)]
pub struct MethodPlan {
    pub id: u32,
    pub name: String,
    pub params: Vec<PlannedParam>,
    /// Highest platform level any parameter category requires.
    pub min_level: Option<u32>,
}

impl MethodPlan {
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn id_literal(&self) -> Literal {
        Literal::u32_suffixed(self.id)
    }

    pub fn method_ident(&self) -> Ident {
        binding(&self.name)
    }

    pub fn bindings(&self) -> Vec<Ident> {
        self.params.iter().map(|p| binding(&p.spec.name)).collect()
    }

    pub fn types(&self, runtime: &syn::Path) -> Vec<TokenStream> {
        self.params.iter().map(|p| p.spec.rust_type(runtime)).collect()
    }

    /// The argument tuple type, `(A, B,)`.
    pub fn tuple_type(&self, runtime: &syn::Path) -> TokenStream {
        let types = self.types(runtime);
        quote!((#(#types,)*))
    }
}

/// Identifier for a method or parameter name, raw when it is a keyword.
pub fn binding(name: &str) -> Ident {
    syn::parse_str::<Ident>(name).unwrap_or_else(|_| Ident::new_raw(name, proc_macro2::Span::call_site()))
}

pub trait TransportStrategy {
    fn kind(&self) -> TransportKind;

    /// Appended to the interface name to form the default proxy name.
    fn suffix(&self) -> &'static str;

    fn ownership(&self) -> Ownership;

    /// Whether arguments are written into a bundle.
    fn serializes(&self) -> bool;

    /// Resolves every method, collecting all parameter diagnostics.
    fn plan(&self, registry: &MethodRegistry) -> Result<Vec<MethodPlan>, Vec<Diagnostic>> {
        let mut plans = Vec::with_capacity(registry.len());
        let mut diagnostics = Vec::new();

        for method in registry.iter() {
            match self.plan_method(registry.interface(), method) {
                Ok(plan) => plans.push(plan),
                Err(mut errors) => diagnostics.append(&mut errors),
            }
        }

        if diagnostics.is_empty() { Ok(plans) } else { Err(diagnostics) }
    }

    fn plan_method(&self, interface: &str, method: &RegisteredMethod) -> Result<MethodPlan, Vec<Diagnostic>> {
        let mut params = Vec::with_capacity(method.spec.params.len());
        let mut diagnostics = Vec::new();

        for param in &method.spec.params {
            if let Some(reason) = &param.unsupported {
                diagnostics.push(
                    Diagnostic::new(ErrorKind::UnsupportedSignature, interface, reason.clone())
                        .method(method.spec.signature())
                        .param(&param.name)
                        .span(param.span.or(method.spec.span)),
                );
                continue;
            }
            let category = if self.serializes() {
                match classify(&param.desc) {
                    Classification::Transportable(category) => Some(category),
                    Classification::Unsupported => {
                        diagnostics.push(
                            Diagnostic::new(
                                ErrorKind::UnsupportedParameterType,
                                interface,
                                format!("`{}` cannot be marshalled into an envelope", param.desc),
                            )
                            .method(method.spec.signature())
                            .param(&param.name)
                            .span(param.span.or(method.spec.span)),
                        );
                        continue;
                    }
                    Classification::UnknownGenericArgument { wrapper } => {
                        diagnostics.push(
                            Diagnostic::new(
                                ErrorKind::UnknownGenericArgument,
                                interface,
                                format!("`{}` needs an element type", wrapper),
                            )
                            .method(method.spec.signature())
                            .param(&param.name)
                            .span(param.span.or(method.spec.span)),
                        );
                        continue;
                    }
                }
            } else {
                None
            };
            params.push(PlannedParam { spec: param.clone(), category });
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let min_level = params.iter().filter_map(|p| p.category?.min_level()).max();
        Ok(MethodPlan {
            id: method.id,
            name: method.spec.name.clone(),
            params,
            min_level,
        })
    }

    /// The proxy struct definition.
    fn proxy_type(&self, ctx: &Context) -> TokenStream;

    /// Constructors and helpers placed in the proxy's inherent impl.
    fn proxy_members(&self, ctx: &Context, plans: &[MethodPlan]) -> TokenStream;

    /// Body of one proxy method: build the envelope and send it once.
    fn send(&self, ctx: &Context, plan: &MethodPlan) -> TokenStream;

    /// Helpers placed in the dispatcher's inherent impl.
    fn dispatcher_members(&self, ctx: &Context, plans: &[MethodPlan]) -> TokenStream;

    /// Match arm body for one method id: read arguments and invoke.
    fn receive(&self, ctx: &Context, plan: &MethodPlan) -> TokenStream;
}

pub fn strategy_for(kind: TransportKind) -> &'static dyn TransportStrategy {
    match kind {
        TransportKind::DirectLocal => &DirectLocal,
        TransportKind::CrossProcess => &CrossProcess,
    }
}

pub(crate) fn receiver_bounds(ctx: &Context) -> TokenStream {
    let trait_ident = &ctx.trait_ident;
    quote!(R: #trait_ident + ?Sized + ::std::marker::Send + ::std::marker::Sync + 'static)
}

// ============================================================================
// Direct-local
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectLocal;

impl TransportStrategy for DirectLocal {
    fn kind(&self) -> TransportKind {
        TransportKind::DirectLocal
    }

    fn suffix(&self) -> &'static str {
        "Handler"
    }

    fn ownership(&self) -> Ownership {
        Ownership::Weak
    }

    fn serializes(&self) -> bool {
        false
    }

    fn proxy_type(&self, ctx: &Context) -> TokenStream {
        let Context { runtime: rt, vis, proxy, .. } = ctx;
        let doc = format!("Same-process proxy for [`{}`]. Calls are queued and never block.", ctx.interface);
        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone)]
            #vis struct #proxy {
                sender: #rt::LocalSender,
            }
        }
    }

    fn proxy_members(&self, ctx: &Context, _plans: &[MethodPlan]) -> TokenStream {
        let Context { runtime: rt, dispatcher, .. } = ctx;
        let bounds = receiver_bounds(ctx);
        quote! {
            /// Binds a proxy to `receiver` without keeping it alive.
            ///
            /// The returned mailbox must be driven for calls to arrive.
            pub fn attach<R>(receiver: &::std::sync::Arc<R>) -> (Self, #rt::Mailbox)
            where
                #bounds,
            {
                let dispatcher = #dispatcher::new(#rt::ReceiverHandle::weak(receiver));
                let (sender, mailbox) = #rt::Mailbox::local(Self::INTERFACE, dispatcher);
                (Self { sender }, mailbox)
            }

            /// Like `attach`, with the mailbox spawned onto the tokio runtime.
            ///
            /// # Panics
            ///
            /// Panics when called outside a tokio runtime.
            pub fn spawn<R>(receiver: &::std::sync::Arc<R>) -> Self
            where
                #bounds,
            {
                let (proxy, mailbox) = Self::attach(receiver);
                ::std::mem::drop(mailbox.spawn());
                proxy
            }
        }
    }

    fn send(&self, ctx: &Context, plan: &MethodPlan) -> TokenStream {
        let rt = &ctx.runtime;
        let id = plan.id_literal();
        if !plan.has_params() {
            return quote! { self.sender.send(#rt::Envelope::new(#id)); };
        }
        let names = plan.bindings();
        quote! {
            self.sender.send(#rt::Envelope::with_args(#id, (#(#names,)*)));
        }
    }

    fn dispatcher_members(&self, _ctx: &Context, _plans: &[MethodPlan]) -> TokenStream {
        TokenStream::new()
    }

    fn receive(&self, ctx: &Context, plan: &MethodPlan) -> TokenStream {
        let rt = &ctx.runtime;
        let interface = &ctx.interface;
        let invoke = dispatch::invoke(ctx, plan);
        if !plan.has_params() {
            return quote! {{
                #invoke
                #rt::Outcome::Delivered
            }};
        }
        let tuple = plan.tuple_type(rt);
        let expected = plan
            .params
            .iter()
            .map(|p| p.spec.desc.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let expected = format!("({},)", expected);
        quote! {
            match envelope.into_args::<#tuple>() {
                ::std::option::Option::Some(args) => {
                    #invoke
                    #rt::Outcome::Delivered
                }
                ::std::option::Option::None => #rt::Outcome::malformed(
                    #interface,
                    what,
                    #rt::bundle::Error::ArgumentMismatch { expected: #expected },
                ),
            }
        }
    }
}

// ============================================================================
// Cross-process
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossProcess;

fn marshal_ident(plan: &MethodPlan) -> Ident {
    format_ident!("marshal_{}", plan.id)
}

fn unmarshal_ident(plan: &MethodPlan) -> Ident {
    format_ident!("unmarshal_{}", plan.id)
}

impl TransportStrategy for CrossProcess {
    fn kind(&self) -> TransportKind {
        TransportKind::CrossProcess
    }

    fn suffix(&self) -> &'static str {
        "Messenger"
    }

    fn ownership(&self) -> Ownership {
        Ownership::Owned
    }

    fn serializes(&self) -> bool {
        true
    }

    fn proxy_type(&self, ctx: &Context) -> TokenStream {
        let Context { runtime: rt, vis, proxy, .. } = ctx;
        let doc = format!(
            "Cross-process proxy for [`{}`]. Arguments are marshalled into a bundle \
             and sent over a link; failed sends are logged and counted, never returned.",
            ctx.interface
        );
        quote! {
            #[doc = #doc]
            #[derive(Debug)]
            #vis struct #proxy {
                sender: #rt::RemoteSender,
            }
        }
    }

    fn proxy_members(&self, ctx: &Context, plans: &[MethodPlan]) -> TokenStream {
        let Context { runtime: rt, dispatcher, .. } = ctx;
        let bounds = receiver_bounds(ctx);

        let helpers = plans.iter().filter(|p| p.has_params()).map(|plan| {
            let name = marshal_ident(plan);
            let tuple = plan.tuple_type(rt);
            let data = format_ident!("data");
            let writes = plan.params.iter().enumerate().filter_map(|(i, p)| {
                let index = syn::Index::from(i);
                let category = p.category?;
                Some(marshal::emit_write(category, &data, &p.spec.name, quote!(args.#index)))
            });
            quote! {
                fn #name(args: #tuple) -> ::std::result::Result<#rt::Bundle, #rt::bundle::Error> {
                    let mut #data = #rt::Bundle::new();
                    #(#writes)*
                    ::std::result::Result::Ok(#data)
                }
            }
        });

        quote! {
            /// Wraps a raw handle to a remote mailbox.
            pub fn connect(handle: #rt::RemoteHandle) -> Self {
                Self {
                    sender: #rt::RemoteSender::new(Self::INTERFACE, handle),
                }
            }

            /// Hosts `receiver` behind a new mailbox and returns a proxy bound to it.
            ///
            /// The mailbox owns the receiver; drive it to deliver calls.
            pub fn host<R>(receiver: ::std::sync::Arc<R>) -> (Self, #rt::Mailbox)
            where
                #bounds,
            {
                let dispatcher = #dispatcher::new(#rt::ReceiverHandle::owned(receiver));
                let (handle, mailbox) = #rt::Mailbox::remote(dispatcher);
                (Self::connect(handle), mailbox)
            }

            /// The raw handle, for passing to another process.
            pub fn handle(&self) -> #rt::RemoteHandle {
                self.sender.handle().clone()
            }

            /// Number of calls that could not be delivered.
            pub fn failed_sends(&self) -> u64 {
                self.sender.failed_sends()
            }

            #(#helpers)*
        }
    }

    fn send(&self, ctx: &Context, plan: &MethodPlan) -> TokenStream {
        let rt = &ctx.runtime;
        let id = plan.id_literal();
        if !plan.has_params() {
            return quote! { self.sender.send(#rt::Envelope::new(#id)); };
        }
        let marshal = marshal_ident(plan);
        let names = plan.bindings();
        quote! {
            match Self::#marshal((#(#names,)*)) {
                ::std::result::Result::Ok(data) => self.sender.send(#rt::Envelope::with_data(#id, data)),
                ::std::result::Result::Err(error) => self.sender.report(#id, error),
            }
        }
    }

    fn dispatcher_members(&self, ctx: &Context, plans: &[MethodPlan]) -> TokenStream {
        let rt = &ctx.runtime;
        let helpers = plans.iter().filter(|p| p.has_params()).map(|plan| {
            let name = unmarshal_ident(plan);
            let tuple = plan.tuple_type(rt);
            let data = format_ident!("data");
            let reads = plan
                .params
                .iter()
                .filter_map(|p| Some(marshal::emit_read(p.category?, &data, &p.spec.name)));
            quote! {
                fn #name(#data: &#rt::Bundle) -> ::std::result::Result<#tuple, #rt::bundle::Error> {
                    ::std::result::Result::Ok((#(#reads,)*))
                }
            }
        });
        quote! { #(#helpers)* }
    }

    fn receive(&self, ctx: &Context, plan: &MethodPlan) -> TokenStream {
        let rt = &ctx.runtime;
        let interface = &ctx.interface;
        let invoke = dispatch::invoke(ctx, plan);
        if !plan.has_params() {
            return quote! {{
                #invoke
                #rt::Outcome::Delivered
            }};
        }
        let unmarshal = unmarshal_ident(plan);
        quote! {
            match Self::#unmarshal(envelope.payload()) {
                ::std::result::Result::Ok(args) => {
                    #invoke
                    #rt::Outcome::Delivered
                }
                ::std::result::Result::Err(error) => #rt::Outcome::malformed(#interface, what, error),
            }
        }
    }
}
