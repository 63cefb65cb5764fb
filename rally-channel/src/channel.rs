//! Realtime channel bound to one matching room at a time.
//!
//! ```text
//!  on/off ──► ListenerRegistry ◄──────── deliver (snapshot, then invoke)
//!                 ▲ generation                  ▲
//!  connect ──► SessionTask ── Connector ──► Link ──► TransportEvent
//!  emit ─────► commands (bounded) ──────────► Link.outgoing
//!  disconnect ─► shutdown + registry reset
//! ```
//!
//! Each `connect` spawns a session task that owns the link, reconnects
//! according to [`ReconnectPolicy`](crate::config::ReconnectPolicy) and
//! delivers events. Every disconnect resets the registry and bumps its
//! generation; a session only delivers while its generation is current, so
//! events still in flight from a torn-down transport never reach a listener.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::error::{SendError, TrySendError};
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::config::{ChannelConfig, EmitPolicy, FanOutPolicy, ReconnectPolicy};
use crate::protocol::{ChannelError, EventKind, Frame, RoomId};
use crate::queue::PendingQueue;
use crate::registry::{Listener, ListenerRegistry};
use crate::transport::{Connector, Link, TransportEvent};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Retry budget exhausted; call `connect` again to restart
    Failed,
}

/// State shared between the channel and its session tasks.
struct Inner {
    registry: Mutex<ListenerRegistry>,
    state: watch::Sender<ConnectionState>,
    fan_out: FanOutPolicy,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `state` if `generation` is still current.
    fn set_state(&self, generation: u64, state: ConnectionState) {
        let registry = self.registry();
        if registry.generation() == generation {
            self.state.send_replace(state);
        }
    }

    /// Invoke the listeners for `frame`, in registration order.
    ///
    /// The registry lock is released before listeners run, so they may call
    /// back into the channel.
    fn deliver(&self, generation: u64, frame: &Frame) {
        let listeners = {
            let registry = self.registry();
            if registry.generation() != generation {
                log::debug!("Dropping stale {:?} event", frame.event);
                return;
            }
            if self.fan_out == FanOutPolicy::RoomUpdateOnly && frame.kind() != EventKind::RoomUpdate {
                log::debug!("Not fanning out {:?} event", frame.event);
                return;
            }
            registry.snapshot(&frame.event)
        };

        for listener in &listeners {
            listener(&frame.payload);
        }
    }
}

/// Handle to the running session.
struct Session {
    id: Uuid,
    room_id: RoomId,
    commands: mpsc::Sender<Frame>,
    shutdown: oneshot::Sender<()>,
}

/// Realtime room channel.
///
/// Create one per client session and share it as `Arc<RoomChannel>`;
/// dropping it disconnects. All operations return immediately.
pub struct RoomChannel {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    inner: Arc<Inner>,
    session: Mutex<Option<Session>>,
}

impl RoomChannel {
    pub fn new(config: ChannelConfig, connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let inner = Arc::new(Inner {
            registry: Mutex::new(ListenerRegistry::new()),
            state,
            fan_out: config.fan_out,
        });
        Self {
            config,
            connector,
            inner,
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a connection scoped to `room_id`, replacing any current one.
    ///
    /// Replacing performs a full [`disconnect`](Self::disconnect), listeners
    /// included. Only an empty room id is reported here; transport failures
    /// surface as logs, `error` events and state changes.
    pub fn connect(&self, room_id: impl ToString) -> Result<(), ChannelError> {
        let room_id = RoomId::new(room_id.to_string())?;

        let mut slot = self.session();
        self.teardown(&mut slot);

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Cannot connect to room {room_id}: {e}");
                self.inner.state.send_replace(ConnectionState::Failed);
                return Ok(());
            }
        };

        let generation = {
            let registry = self.inner.registry();
            self.inner.state.send_replace(ConnectionState::Connecting);
            registry.generation()
        };

        let id = Uuid::new_v4();
        let (commands_tx, commands_rx) = mpsc::channel(self.config.outgoing_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let pending = match self.config.emit_policy {
            EmitPolicy::Queue { capacity } => Some(PendingQueue::new(capacity)),
            EmitPolicy::Drop => None,
        };

        let task = SessionTask {
            id,
            room_id: room_id.clone(),
            generation,
            connector: self.connector.clone(),
            inner: self.inner.clone(),
            reconnect: self.config.reconnect.clone(),
            commands: commands_rx,
            shutdown: shutdown_rx,
            pending,
        };
        runtime.spawn(task.run());

        log::info!("Connecting to room {room_id} (session {id})");
        *slot = Some(Session {
            id,
            room_id,
            commands: commands_tx,
            shutdown: shutdown_tx,
        });
        Ok(())
    }

    /// Close the connection and drop every registered listener.
    ///
    /// Without a connection this is a no-op and listeners are kept.
    pub fn disconnect(&self) {
        let mut slot = self.session();
        self.teardown(&mut slot);
    }

    fn teardown(&self, slot: &mut Option<Session>) {
        let Some(session) = slot.take() else {
            return;
        };

        {
            let mut registry = self.inner.registry();
            registry.reset();
            self.inner.state.send_replace(ConnectionState::Disconnected);
        }

        let _ = session.shutdown.send(());
        log::info!("Disconnected from room {} (session {})", session.room_id, session.id);
    }

    /// Register `listener` for events named `event`.
    pub fn on(&self, event: &str, listener: Listener) {
        self.inner.registry().add(event, listener);
    }

    /// Remove the first registration of `listener` for `event`.
    pub fn off(&self, event: &str, listener: &Listener) {
        self.inner.registry().remove(event, listener);
    }

    /// Send an event upstream.
    ///
    /// Without a connection the payload is dropped. While the link is down
    /// the configured [`EmitPolicy`] applies.
    pub fn emit(&self, event: &str, payload: Value) {
        let slot = self.session();
        let Some(session) = slot.as_ref() else {
            log::debug!("No room connection, dropping {event:?}");
            return;
        };

        match session.commands.try_send(Frame::new(event, payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                log::warn!(
                    "Outgoing buffer full for room {}, dropping {:?}",
                    session.room_id,
                    frame.event
                );
            }
            Err(TrySendError::Closed(frame)) => {
                log::debug!(
                    "Session for room {} has ended, dropping {:?}",
                    session.room_id,
                    frame.event
                );
            }
        }
    }

    /// Room of the current connection, if any.
    pub fn room_id(&self) -> Option<RoomId> {
        self.session().as_ref().map(|s| s.room_id.clone())
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry().count(event)
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

impl Drop for RoomChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Why a linked session stopped pumping.
enum Exit {
    Shutdown,
    Lost(String),
}

/// Background task driving one connection.
struct SessionTask {
    id: Uuid,
    room_id: RoomId,
    generation: u64,
    connector: Arc<dyn Connector>,
    inner: Arc<Inner>,
    reconnect: ReconnectPolicy,
    commands: mpsc::Receiver<Frame>,
    shutdown: oneshot::Receiver<()>,
    pending: Option<PendingQueue>,
}

impl SessionTask {
    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            let result = {
                let mut connecting = self.connector.connect(&self.room_id);
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut self.shutdown => return,
                        result = &mut connecting => break result,
                        Some(frame) = self.commands.recv() => self.hold(frame),
                    }
                }
            };

            match result {
                Ok(link) => {
                    attempt = 0;
                    match self.pump(link).await {
                        Exit::Shutdown => return,
                        Exit::Lost(reason) => {
                            log::info!("Lost connection to room {}: {reason}", self.room_id);
                            self.inner.set_state(self.generation, ConnectionState::Connecting);
                            self.inner
                                .deliver(self.generation, &Frame::disconnected(&self.room_id, &reason));
                        }
                    }
                }
                Err(e) => {
                    log::error!("Connection to room {} failed: {e}", self.room_id);
                    self.inner.deliver(self.generation, &Frame::error(e.to_string()));
                }
            }

            if !self.reconnect.allows(attempt) {
                log::error!(
                    "Giving up on room {} after {attempt} retries (session {})",
                    self.room_id,
                    self.id
                );
                self.inner.set_state(self.generation, ConnectionState::Failed);
                return;
            }

            let delay = self.reconnect.delay(attempt);
            attempt += 1;
            self.inner.set_state(self.generation, ConnectionState::Connecting);
            log::info!(
                "Reconnecting to room {} in {delay:?} (attempt {attempt}/{})",
                self.room_id,
                self.reconnect.max_retries
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut self.shutdown => return,
                    _ = &mut sleep => break,
                    Some(frame) = self.commands.recv() => self.hold(frame),
                }
            }
        }
    }

    /// Run a live link until shutdown or loss.
    async fn pump(&mut self, mut link: Link) -> Exit {
        self.inner.set_state(self.generation, ConnectionState::Connected);
        log::info!("Connected to room {} (session {})", self.room_id, self.id);

        if let Some(queue) = self.pending.as_mut() {
            if !queue.is_empty() {
                log::info!("Flushing {} queued frames to room {}", queue.len(), self.room_id);
            }
            let mut queued = queue.drain().into_iter();
            while let Some(frame) = queued.next() {
                if let Err(SendError(frame)) = link.outgoing.send(frame).await {
                    self.hold(frame);
                    queued.for_each(|f| self.hold(f));
                    return Exit::Lost("transport closed".into());
                }
            }
        }

        self.inner
            .deliver(self.generation, &Frame::connected(&self.room_id));

        loop {
            tokio::select! {
                biased;
                _ = &mut self.shutdown => return Exit::Shutdown,
                event = link.incoming.recv() => match event {
                    Some(TransportEvent::Frame(frame)) => self.on_frame(frame),
                    Some(TransportEvent::Error(message)) => {
                        log::error!("Transport error in room {}: {message}", self.room_id);
                        self.inner.deliver(self.generation, &Frame::error(message));
                    }
                    None => return Exit::Lost("transport closed".into()),
                },
                Some(frame) = self.commands.recv() => {
                    if let Err(SendError(frame)) = link.outgoing.send(frame).await {
                        self.hold(frame);
                        return Exit::Lost("transport closed".into());
                    }
                }
            }
        }
    }

    fn on_frame(&self, frame: Frame) {
        match frame.kind() {
            EventKind::RoomUpdate => log::debug!("Room {} update received", self.room_id),
            EventKind::Error => log::error!("Server error in room {}: {}", self.room_id, frame.payload),
            EventKind::Connect | EventKind::Disconnect | EventKind::Other => {
                log::debug!("Room {} event {:?}", self.room_id, frame.event);
            }
        }
        self.inner.deliver(self.generation, &frame);
    }

    /// A frame emitted while the link is down.
    fn hold(&mut self, frame: Frame) {
        let Some(queue) = self.pending.as_mut() else {
            log::debug!("Room {} not linked, dropping {:?}", self.room_id, frame.event);
            return;
        };
        let event = frame.event.clone();
        if !queue.enqueue(frame) {
            log::warn!(
                "Pending queue full ({}) for room {}, dropping {event:?}",
                queue.capacity(),
                self.room_id
            );
        }
    }
}
