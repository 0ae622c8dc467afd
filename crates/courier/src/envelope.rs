//! The unit of delivery between a proxy and a dispatcher.

use std::any::Any;
use std::fmt;

use crate::bundle::Bundle;

/// A method id plus the call's arguments.
///
/// Cross-process envelopes carry their arguments in a [`Bundle`]. Local
/// envelopes may instead carry them as a live value that is moved, not
/// copied, to the receiver. Live arguments never survive encoding.
pub struct Envelope {
    what: u32,
    data: Option<Bundle>,
    args: Option<Box<dyn Any + Send>>,
}

impl Envelope {
    /// An envelope with no payload at all.
    pub fn new(what: u32) -> Self {
        Self {
            what,
            data: None,
            args: None,
        }
    }

    pub fn with_data(what: u32, data: Bundle) -> Self {
        Self {
            what,
            data: Some(data),
            args: None,
        }
    }

    pub fn with_args<A: Any + Send>(what: u32, args: A) -> Self {
        Self {
            what,
            data: None,
            args: Some(Box::new(args)),
        }
    }

    pub fn what(&self) -> u32 {
        self.what
    }

    pub fn data(&self) -> Option<&Bundle> {
        self.data.as_ref()
    }

    /// The attached bundle, or the shared empty bundle when there is none.
    pub fn payload(&self) -> &Bundle {
        self.data.as_ref().unwrap_or(Bundle::empty())
    }

    pub fn has_args(&self) -> bool {
        self.args.is_some()
    }

    pub fn into_data(self) -> Option<Bundle> {
        self.data
    }

    /// Takes the live arguments if they are exactly of type `A`.
    pub fn into_args<A: Any>(self) -> Option<A> {
        self.args?.downcast::<A>().ok().map(|args| *args)
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("what", &self.what)
            .field("data", &self.data)
            .field("args", &self.args.is_some())
            .finish()
    }
}
