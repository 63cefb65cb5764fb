//! # rally-channel — Realtime room channel
//!
//! One connection per client, scoped to a single matching room, with a
//! named-event listener registry on top.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   Connector    ┌──────────────┐
//! │ RoomChannel  │ ─────────────► │ Link         │ ◄──── WebSocket (JSON text)
//! │ (Arc-shared) │                │ (mpsc pair)  │ ◄──── in-memory remote
//! └──────┬───────┘                └──────┬───────┘
//!        │ on/off                        │ TransportEvent
//!        ▼                               ▼
//! ┌──────────────┐   snapshot     ┌──────────────┐
//! │ Listener     │ ◄───────────── │ SessionTask  │
//! │ Registry     │   generation   │ (reconnect)  │
//! └──────────────┘                └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`channel`] — `RoomChannel` and its session task
//! - [`protocol`] — JSON frames, event names, room ids
//! - [`registry`] — Event-name → ordered listener lists
//! - [`config`] — Fan-out, emit and reconnect policies
//! - [`queue`] — Pending emits while the link is down
//! - [`transport`] — WebSocket and in-memory connectors

pub mod channel;
pub mod config;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod transport;

// Re-exports for convenience
pub use channel::{ConnectionState, RoomChannel};
pub use config::{ChannelConfig, EmitPolicy, FanOutPolicy, ReconnectPolicy};
pub use protocol::{ChannelError, EventKind, Frame, RoomId};
pub use queue::PendingQueue;
pub use registry::{listener, room_update_listener, Listener, ListenerRegistry};
pub use transport::{
    Connector, Link, MemoryConnector, MemoryRemote, MemoryRemotes, TransportEvent,
    WsConnector,
};
