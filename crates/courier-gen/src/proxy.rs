//! # Proxy Emitter
//!
//! Emits the calling half: a proxy type that implements the interface
//! trait. Each method builds one envelope tagged with the method's id,
//! fills it only when the method has parameters, and sends it exactly once.
//! No method blocks or reports failure to its caller.

use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

use crate::strategy::Context;
use crate::strategy::MethodPlan;
use crate::strategy::TransportStrategy;

fn method_consts(ctx: &Context, plans: &[MethodPlan]) -> TokenStream {
    let consts = plans.iter().map(|plan| {
        let name = format_ident!("METHOD_{}", plan.id);
        let id = plan.id_literal();
        let doc = format!("Envelope id of `{}`.", plan.name);
        quote! {
            #[doc = #doc]
            pub const #name: u32 = #id;
        }
    });
    let last = proc_macro2::Literal::u32_suffixed(ctx.last_id);
    let interface = &ctx.interface;
    quote! {
        /// Name of the proxied interface, used in log events.
        pub const INTERFACE: &str = #interface;
        /// Highest method id; ids run densely from 1.
        pub const LAST_METHOD_ID: u32 = #last;
        #(#consts)*
    }
}

pub fn emit(ctx: &Context, strategy: &dyn TransportStrategy, plans: &[MethodPlan]) -> TokenStream {
    let Context { runtime: rt, proxy, trait_ident, .. } = ctx;

    let definition = strategy.proxy_type(ctx);
    let consts = method_consts(ctx, plans);
    let members = strategy.proxy_members(ctx, plans);

    let methods = plans.iter().map(|plan| {
        let method = plan.method_ident();
        let names = plan.bindings();
        let types = plan.types(rt);
        let body = strategy.send(ctx, plan);
        let guard = plan.min_level.map(|level| {
            let doc = format!("Requires platform level {}.", level);
            quote!(#[doc = #doc])
        });
        quote! {
            #guard
            fn #method(&self #(, #names: #types)*) {
                #body
            }
        }
    });

    quote! {
        #definition

        impl #proxy {
            #consts
            #members
        }

        impl #trait_ident for #proxy {
            #(#methods)*
        }
    }
}
