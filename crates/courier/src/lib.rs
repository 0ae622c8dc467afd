//! # Courier
//!
//! Runtime support for generated proxies and dispatchers.
//!
//! An interface trait annotated with `#[handler]` or `#[messenger]` gets two
//! companions: a *proxy* that implements the trait by turning every call into
//! an [`Envelope`] tagged with the method's id, and a *dispatcher* that reads
//! envelopes back out of a [`Mailbox`] and invokes the real receiver.
//!
//! ## Layers
//!
//! - **Values**: [`Payload`] is the closed set of values a [`Bundle`] may carry.
//! - **Envelopes**: `what` (method id) plus either a bundle or live arguments.
//! - **Wire**: a TLV codec that moves envelopes across a process boundary.
//! - **Transport**: local queues for same-process delivery, [`transport::Link`]
//!   for frames that cross a boundary.
//! - **Mailbox**: drains a queue into a [`Dispatch`] implementation, one envelope
//!   at a time, in arrival order.

pub mod bundle;
pub mod dispatch;
pub mod envelope;
pub mod handle;
pub mod mailbox;
pub mod payload;
pub mod record;
pub mod transport;
pub mod values;
pub mod wire;

pub use bundle::Bundle;
pub use dispatch::Discard;
pub use dispatch::Dispatch;
pub use dispatch::Outcome;
pub use envelope::Envelope;
pub use handle::ReceiverHandle;
pub use mailbox::Mailbox;
pub use payload::Payload;
pub use record::Record;
pub use record::RecordValue;
pub use transport::LocalSender;
pub use transport::RemoteHandle;
pub use transport::RemoteSender;
pub use values::CharSeq;
pub use values::Handle;
pub use values::Size;
pub use values::SizeF;
pub use values::SparseMap;

#[cfg(feature = "derive")]
pub use courier_macros::handler;
#[cfg(feature = "derive")]
pub use courier_macros::messenger;
