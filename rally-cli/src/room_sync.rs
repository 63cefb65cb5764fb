//! Keeps a `RoomDetail` in step with the backend.
//!
//! A full fetch seeds the state, pushed `roomUpdate` payloads are merged
//! into it, and every `connect` from the channel (first link and each
//! reconnect) triggers another full fetch so missed pushes are recovered.

use anyhow::{bail, Context, Result};
use futures_util::future::BoxFuture;
use rally_api::{ApiClient, ApiResult};
use rally_channel::protocol::{CONNECT, ROOM_UPDATE};
use rally_channel::{listener, room_update_listener, FanOutPolicy, RoomChannel};
use rally_core::RoomDetail;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Where full room snapshots come from.
pub trait RoomSource: Send + Sync + 'static {
    fn fetch(&self, room_id: u64) -> BoxFuture<'_, ApiResult<RoomDetail>>;
}

impl RoomSource for ApiClient {
    fn fetch(&self, room_id: u64) -> BoxFuture<'_, ApiResult<RoomDetail>> {
        Box::pin(self.room(room_id))
    }
}

pub struct RoomSync {
    room_id: u64,
    state: Arc<watch::Sender<RoomDetail>>,
    refresher: JoinHandle<()>,
}

impl RoomSync {
    /// Fetch the room, connect `channel` to it and start following.
    ///
    /// `channel` must be idle and use `FanOutPolicy::Uniform`. Listeners are
    /// registered before connecting so the first `connect` is never missed.
    pub async fn start(
        channel: &RoomChannel,
        source: Arc<dyn RoomSource>,
        room_id: u64,
    ) -> Result<Self> {
        if let Some(current) = channel.room_id() {
            bail!("Channel is already connected to room {current}");
        }
        if channel.config().fan_out != FanOutPolicy::Uniform {
            bail!("Room sync needs connect events; use FanOutPolicy::Uniform");
        }

        let initial = source
            .fetch(room_id)
            .await
            .with_context(|| format!("Failed to load room {room_id}"))?;
        let state = Arc::new(watch::Sender::new(initial));

        let merge_state = state.clone();
        channel.on(
            ROOM_UPDATE,
            room_update_listener(move |update| {
                if merge_state.send_if_modified(|room| room.apply_update(update)) {
                    log::debug!("Room {room_id} updated");
                }
            }),
        );

        let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
        channel.on(
            CONNECT,
            listener(move |_| {
                let _ = refresh_tx.send(());
            }),
        );

        channel.connect(room_id)?;

        let refresh_state = state.clone();
        let refresher = tokio::spawn(async move {
            while refresh_rx.recv().await.is_some() {
                match source.fetch(room_id).await {
                    Ok(room) => {
                        refresh_state.send_replace(room);
                        log::info!("Room {room_id} refreshed");
                    }
                    Err(e) => log::warn!("Failed to refresh room {room_id}: {e}"),
                }
            }
        });

        Ok(Self {
            room_id,
            state,
            refresher,
        })
    }

    pub fn room_id(&self) -> u64 {
        self.room_id
    }

    pub fn snapshot(&self) -> RoomDetail {
        self.state.borrow().clone()
    }

    /// Notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<RoomDetail> {
        self.state.subscribe()
    }
}

impl Drop for RoomSync {
    fn drop(&mut self) {
        self.refresher.abort();
    }
}
