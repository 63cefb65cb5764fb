//! Transport seam between the channel and the network.
//!
//! A [`Connector`] opens a [`Link`] for a room. A link is a pair of
//! channels: frames going upstream and [`TransportEvent`]s coming back.
//! The incoming side ending means the link was lost; dropping the `Link`
//! closes the transport.
//!
//! - [`ws`] — WebSocket transport (tokio-tungstenite, JSON text frames)
//! - [`memory`] — In-process transport for tests and embedding

pub mod memory;
pub mod ws;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::protocol::{ChannelError, Frame, RoomId};

pub use memory::{MemoryConnector, MemoryRemote, MemoryRemotes};
pub use ws::WsConnector;

/// Buffered frames per direction on a link.
pub const LINK_CAPACITY: usize = 256;

/// Something arriving from the remote end.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Frame(Frame),
    /// Non-fatal transport problem (bad frame, protocol error)
    Error(String),
}

/// An open transport.
#[derive(Debug)]
pub struct Link {
    pub outgoing: mpsc::Sender<Frame>,
    pub incoming: mpsc::Receiver<TransportEvent>,
}

/// Opens links scoped to a room.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, room_id: &RoomId) -> BoxFuture<'static, Result<Link, ChannelError>>;
}
