//! # Mailbox
//!
//! A FIFO queue drained into a single [`Dispatch`] implementation.
//!
//! Envelopes are handled one at a time and in arrival order. The mailbox can
//! be drained synchronously with [`Mailbox::pump`], driven as a future with
//! [`Mailbox::run`], or moved onto the tokio runtime with [`Mailbox::spawn`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatch::Dispatch;
use crate::dispatch::Outcome;
use crate::envelope::Envelope;
use crate::transport;
use crate::transport::ChannelLink;
use crate::transport::LocalSender;
use crate::transport::RemoteHandle;
use crate::transport::Source;
use crate::wire;

enum Inbox {
    /// Envelopes posted by a same-process proxy.
    Envelopes(mpsc::UnboundedReceiver<Envelope>),
    /// Encoded frames arriving over a link.
    Frames(mpsc::UnboundedReceiver<Vec<u8>>),
}

enum Item {
    Envelope(Envelope),
    Frame(Vec<u8>),
}

impl Inbox {
    fn try_next(&mut self) -> Option<Item> {
        match self {
            Inbox::Envelopes(rx) => rx.try_recv().ok().map(Item::Envelope),
            Inbox::Frames(rx) => rx.try_recv().ok().map(Item::Frame),
        }
    }

    async fn next(&mut self) -> Option<Item> {
        match self {
            Inbox::Envelopes(rx) => rx.recv().await.map(Item::Envelope),
            Inbox::Frames(rx) => rx.recv().await.map(Item::Frame),
        }
    }
}

pub struct Mailbox {
    inbox: Inbox,
    dispatcher: Box<dyn Dispatch>,
}

impl Mailbox {
    /// A mailbox fed by local senders. Envelopes are moved, never encoded.
    pub fn local(interface: &'static str, dispatcher: impl Dispatch) -> (LocalSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mailbox = Self {
            inbox: Inbox::Envelopes(rx),
            dispatcher: Box::new(dispatcher),
        };
        (LocalSender::new(interface, tx), mailbox)
    }

    /// A mailbox fed by encoded frames. The returned handle can be given to
    /// any number of remote proxies.
    pub fn remote(dispatcher: impl Dispatch) -> (RemoteHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mailbox = Self {
            inbox: Inbox::Frames(rx),
            dispatcher: Box::new(dispatcher),
        };
        (RemoteHandle::new(ChannelLink::new(tx)), mailbox)
    }

    /// Handles every envelope already queued and returns their outcomes.
    pub fn pump(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(item) = self.inbox.try_next() {
            outcomes.push(self.handle(item));
        }
        outcomes
    }

    /// Handles envelopes as they arrive until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(item) = self.inbox.next().await {
            self.handle(item);
        }
        tracing::trace!("mailbox closed");
    }

    /// Runs the mailbox as a tokio task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn handle(&self, item: Item) -> Outcome {
        match item {
            Item::Envelope(envelope) => self.dispatcher.dispatch(envelope),
            Item::Frame(frame) => deliver_frame(self.dispatcher.as_ref(), &frame),
        }
    }
}

/// Decodes a frame and hands the envelope to the dispatcher.
pub fn deliver_frame(dispatcher: &dyn Dispatch, frame: &[u8]) -> Outcome {
    match wire::decode_envelope(frame) {
        Ok(envelope) => dispatcher.dispatch(envelope),
        Err(error) => Outcome::undecodable(error),
    }
}

/// Pumps frames from a source into a dispatcher until the source closes.
///
/// Returns `Ok(())` on a clean close and the transport error otherwise.
pub async fn serve<S: Source + ?Sized>(source: &S, dispatcher: &dyn Dispatch) -> transport::Result<()> {
    loop {
        match source.recv().await {
            Ok(Some(frame)) => {
                deliver_frame(dispatcher, &frame);
            }
            Ok(None) => {
                tracing::trace!("source closed");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport error in pump");
                return Err(e);
            }
        }
    }
}
