//! How a dispatcher holds on to its receiver.

use std::sync::Arc;
use std::sync::Weak;

/// Owned or non-owning reference to the object that finally handles calls.
///
/// Local dispatchers hold their receiver weakly so the dispatcher never
/// keeps it alive; once the last strong reference is gone, envelopes that
/// are still queued are discarded instead of delivered.
pub enum ReceiverHandle<R: ?Sized> {
    Owned(Arc<R>),
    Weak(Weak<R>),
}

impl<R: ?Sized> ReceiverHandle<R> {
    pub fn owned(receiver: Arc<R>) -> Self {
        Self::Owned(receiver)
    }

    pub fn weak(receiver: &Arc<R>) -> Self {
        Self::Weak(Arc::downgrade(receiver))
    }

    /// Returns the receiver if it is still alive.
    pub fn resolve(&self) -> Option<Arc<R>> {
        match self {
            Self::Owned(receiver) => Some(Arc::clone(receiver)),
            Self::Weak(receiver) => receiver.upgrade(),
        }
    }

    pub fn is_live(&self) -> bool {
        match self {
            Self::Owned(_) => true,
            Self::Weak(receiver) => receiver.strong_count() > 0,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

impl<R: ?Sized> Clone for ReceiverHandle<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Owned(receiver) => Self::Owned(Arc::clone(receiver)),
            Self::Weak(receiver) => Self::Weak(Weak::clone(receiver)),
        }
    }
}
