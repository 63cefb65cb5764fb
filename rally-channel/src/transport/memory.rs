//! In-process transport.
//!
//! Each successful `connect` hands a [`MemoryRemote`] to whoever holds the
//! [`MemoryRemotes`] receiver. The remote sees every frame the channel sends
//! and can push frames or errors back. Dropping the remote looks like a lost
//! connection to the channel.

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{Connector, Link, TransportEvent, LINK_CAPACITY};
use crate::protocol::{ChannelError, Frame, RoomId};

struct MemoryInner {
    remotes: mpsc::UnboundedSender<MemoryRemote>,
    refuse: AtomicU32,
    attempts: AtomicU32,
}

/// Connector producing in-memory links.
#[derive(Clone)]
pub struct MemoryConnector {
    inner: Arc<MemoryInner>,
}

/// Receiving side for links opened by a [`MemoryConnector`].
pub struct MemoryRemotes {
    rx: mpsc::UnboundedReceiver<MemoryRemote>,
}

impl MemoryRemotes {
    /// Wait for the next opened link.
    pub async fn next(&mut self) -> Option<MemoryRemote> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<MemoryRemote> {
        self.rx.try_recv().ok()
    }
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryRemotes) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            inner: Arc::new(MemoryInner {
                remotes: tx,
                refuse: AtomicU32::new(0),
                attempts: AtomicU32::new(0),
            }),
        };
        (connector, MemoryRemotes { rx })
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: u32) {
        self.inner.refuse.store(n, Ordering::SeqCst);
    }

    /// Connection attempts so far, refused ones included.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, room_id: &RoomId) -> BoxFuture<'static, Result<Link, ChannelError>> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .inner
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Box::pin(async { Err(ChannelError::Connect("connection refused".into())) });
        }

        let (out_tx, out_rx) = mpsc::channel(LINK_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(LINK_CAPACITY);
        let remote = MemoryRemote {
            room_id: room_id.clone(),
            upstream: out_rx,
            push: in_tx,
        };
        let delivered = self.inner.remotes.send(remote).is_ok();

        Box::pin(async move {
            if !delivered {
                return Err(ChannelError::Connect("no remote end".into()));
            }
            Ok(Link {
                outgoing: out_tx,
                incoming: in_rx,
            })
        })
    }
}

/// Remote end of an in-memory link.
pub struct MemoryRemote {
    pub room_id: RoomId,
    upstream: mpsc::Receiver<Frame>,
    push: mpsc::Sender<TransportEvent>,
}

impl MemoryRemote {
    /// Push a frame to the channel. Returns `false` if the link is gone.
    pub async fn push(&self, frame: Frame) -> bool {
        self.push.send(TransportEvent::Frame(frame)).await.is_ok()
    }

    pub fn try_push(&self, frame: Frame) -> bool {
        self.push.try_send(TransportEvent::Frame(frame)).is_ok()
    }

    /// Report a non-fatal transport error.
    pub async fn push_error(&self, message: impl Into<String>) -> bool {
        self.push
            .send(TransportEvent::Error(message.into()))
            .await
            .is_ok()
    }

    /// Next frame the channel sent upstream; `None` once it closed the link.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.upstream.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.upstream.try_recv().ok()
    }

    /// Whether the channel still holds this link.
    pub fn is_open(&self) -> bool {
        !self.push.is_closed()
    }

    /// Drop the link from the remote side.
    pub fn close(self) {}
}
