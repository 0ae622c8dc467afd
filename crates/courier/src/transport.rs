//! # Transport
//!
//! Senders used by generated proxies, and the byte links that carry
//! encoded envelopes across a process boundary.
//!
//! ## Philosophy
//!
//! - **Fire and forget**: a proxy call never blocks and never returns an error.
//!   Failures are logged and counted on the sender.
//! - **Byte-Oriented Links**: a [`Link`] moves opaque frames. It knows nothing
//!   about envelopes or bundles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::bundle;
use crate::envelope::Envelope;
use crate::wire;

/// Errors that occur while handing an envelope to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The other side is gone.
    ConnectionLost(String),
    /// The envelope has no wire form.
    Encoding(wire::Error),
    /// An argument could not be written into the bundle.
    Marshal(bundle::Error),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Encoding(e) => write!(f, "Encoding error: {}", e),
            Self::Marshal(e) => write!(f, "Marshalling error: {}", e),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<wire::Error> for Error {
    fn from(e: wire::Error) -> Self {
        Self::Encoding(e)
    }
}

impl From<bundle::Error> for Error {
    fn from(e: bundle::Error) -> Self {
        Self::Marshal(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Links
// ============================================================================

/// One direction of a byte pipe that crosses a process boundary.
///
/// This trait is designed to be object-safe (`Arc<dyn Link>`).
pub trait Link: Send + Sync + 'static {
    /// Queues a frame without waiting for the other side.
    fn send(&self, frame: Vec<u8>) -> Result<()>;
}

/// The receiving end of a link.
#[async_trait::async_trait]
pub trait Source: Send + Sync + 'static {
    /// Waits for the next frame. `Ok(None)` means the link closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}

/// In-memory link backed by an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelLink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelLink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { tx }
    }
}

impl Link for ChannelLink {
    fn send(&self, frame: Vec<u8>) -> Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| Error::ConnectionLost("Channel closed".into()))
    }
}

#[derive(Debug)]
pub struct ChannelSource {
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

#[async_trait::async_trait]
impl Source for ChannelSource {
    async fn recv(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.lock().await.recv().await)
    }
}

/// Creates a connected in-memory link and source.
pub fn channel() -> (ChannelLink, ChannelSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelLink { tx }, ChannelSource { rx: Mutex::new(rx) })
}

/// Raw handle to a remote mailbox, as handed to `connect`.
#[derive(Clone)]
pub struct RemoteHandle {
    link: Arc<dyn Link>,
}

impl RemoteHandle {
    pub fn new(link: impl Link) -> Self {
        Self { link: Arc::new(link) }
    }

    pub fn from_arc(link: Arc<dyn Link>) -> Self {
        Self { link }
    }

    pub fn send(&self, frame: Vec<u8>) -> Result<()> {
        self.link.send(frame)
    }
}

impl fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle").finish_non_exhaustive()
    }
}

// ============================================================================
// Senders
// ============================================================================

/// Posts envelopes into a same-process mailbox.
#[derive(Debug, Clone)]
pub struct LocalSender {
    interface: &'static str,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl LocalSender {
    pub fn new(interface: &'static str, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { interface, tx }
    }

    /// Enqueues the envelope. A closed mailbox drops it.
    pub fn send(&self, envelope: Envelope) {
        if let Err(mpsc::error::SendError(envelope)) = self.tx.send(envelope) {
            tracing::trace!(
                interface = self.interface,
                what = envelope.what(),
                "mailbox closed, envelope dropped"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Encodes envelopes and pushes them over a [`RemoteHandle`].
///
/// Send failures are never returned to the caller. Each one is logged at
/// warn level and counted; see [`RemoteSender::failed_sends`].
#[derive(Debug)]
pub struct RemoteSender {
    interface: &'static str,
    handle: RemoteHandle,
    failures: AtomicU64,
}

impl RemoteSender {
    pub fn new(interface: &'static str, handle: RemoteHandle) -> Self {
        Self {
            interface,
            handle,
            failures: AtomicU64::new(0),
        }
    }

    pub fn send(&self, envelope: Envelope) {
        let what = envelope.what();
        let result = wire::encode_envelope(&envelope)
            .map_err(Error::from)
            .and_then(|frame| self.handle.send(frame));
        if let Err(error) = result {
            self.report(what, error);
        }
    }

    /// Records a call that could not be delivered.
    pub fn report(&self, what: u32, error: impl Into<Error>) {
        let error = error.into();
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(interface = self.interface, what, failures, %error, "send failed");
    }

    pub fn failed_sends(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }
}
