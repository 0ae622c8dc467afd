//! # Dispatcher Emitter
//!
//! Emits the receiving half: a dispatcher type holding a
//! `ReceiverHandle` and an implementation of `courier::Dispatch` that
//!
//! 1. resolves the receiver, discarding the envelope if it is gone,
//! 2. switches on the method id in registry order,
//! 3. reads the arguments back in declaration order and invokes the method,
//! 4. discards unknown ids without touching the receiver.

use proc_macro2::TokenStream;
use quote::quote;

use crate::strategy::Context;
use crate::strategy::MethodPlan;
use crate::strategy::TransportStrategy;

/// The call on the resolved receiver, with arguments taken from `args` in order.
pub fn invoke(ctx: &Context, plan: &MethodPlan) -> TokenStream {
    let trait_ident = &ctx.trait_ident;
    let method = plan.method_ident();
    let args = (0..plan.params.len()).map(syn::Index::from);
    quote! {
        <R as #trait_ident>::#method(&*receiver #(, args.#args)*);
    }
}

pub fn emit(ctx: &Context, strategy: &dyn TransportStrategy, plans: &[MethodPlan]) -> TokenStream {
    let Context { runtime: rt, vis, dispatcher, interface, .. } = ctx;
    let bounds = crate::strategy::receiver_bounds(ctx);
    let members = strategy.dispatcher_members(ctx, plans);

    let arms = plans.iter().map(|plan| {
        let id = plan.id_literal();
        let body = strategy.receive(ctx, plan);
        quote! { #id => #body, }
    });

    let doc = format!("Delivers envelopes addressed to [`{}`] to a receiver.", interface);

    quote! {
        #[doc = #doc]
        #vis struct #dispatcher<R: ?Sized> {
            receiver: #rt::ReceiverHandle<R>,
        }

        impl<R: ?Sized> #dispatcher<R> {
            pub fn new(receiver: #rt::ReceiverHandle<R>) -> Self {
                Self { receiver }
            }

            pub fn is_live(&self) -> bool {
                self.receiver.is_live()
            }

            #members
        }

        impl<R> #rt::Dispatch for #dispatcher<R>
        where
            #bounds,
        {
            #[allow(unused_variables)]
            fn dispatch(&self, envelope: #rt::Envelope) -> #rt::Outcome {
                let what = envelope.what();
                let ::std::option::Option::Some(receiver) = self.receiver.resolve() else {
                    return #rt::Outcome::disposed(#interface, what);
                };
                match what {
                    #(#arms)*
                    _ => #rt::Outcome::unknown(#interface, what),
                }
            }
        }
    }
}
