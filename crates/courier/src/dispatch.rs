//! # Dispatch
//!
//! The contract between a mailbox and the generated dispatcher that sits
//! behind it. A dispatcher sees one envelope at a time and either invokes
//! the receiver or explains why it did not.

use crate::bundle;
use crate::envelope::Envelope;
use crate::wire;

pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, envelope: Envelope) -> Outcome;
}

/// What happened to a single envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Delivered,
    Discarded(Discard),
}

/// Why an envelope was dropped without reaching the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum Discard {
    /// The receiver was released before the envelope was handled.
    ReceiverDisposed,
    /// No method carries this id.
    UnknownMethod(u32),
    /// The envelope's arguments could not be read back.
    Malformed { what: u32, error: bundle::Error },
    /// The frame never decoded into an envelope.
    Undecodable(wire::Error),
}

impl std::fmt::Display for Discard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReceiverDisposed => write!(f, "Receiver disposed"),
            Self::UnknownMethod(what) => write!(f, "Unknown method id {}", what),
            Self::Malformed { what, error } => write!(f, "Malformed envelope {}: {}", what, error),
            Self::Undecodable(e) => write!(f, "Undecodable frame: {}", e),
        }
    }
}

impl Outcome {
    pub fn disposed(interface: &str, what: u32) -> Self {
        tracing::trace!(interface, what, "receiver disposed, envelope dropped");
        Self::Discarded(Discard::ReceiverDisposed)
    }

    pub fn unknown(interface: &str, what: u32) -> Self {
        tracing::debug!(interface, what, "no method for envelope id");
        Self::Discarded(Discard::UnknownMethod(what))
    }

    pub fn malformed(interface: &str, what: u32, error: bundle::Error) -> Self {
        tracing::warn!(interface, what, %error, "could not read envelope arguments");
        Self::Discarded(Discard::Malformed { what, error })
    }

    pub fn undecodable(error: wire::Error) -> Self {
        tracing::warn!(%error, "dropping undecodable frame");
        Self::Discarded(Discard::Undecodable(error))
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}
