//! WebSocket transport.
//!
//! Connects to `{websocket_url}?roomId={id}` and exchanges JSON text frames.
//! A writer task forwards the outgoing channel to the socket and sends a
//! close frame once the `Link` is dropped; a reader task decodes incoming
//! text frames. Ping/pong is answered by tungstenite.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{Connector, Link, TransportEvent, LINK_CAPACITY};
use crate::protocol::{ChannelError, Frame, RoomId};

#[derive(Debug, Clone)]
pub struct WsConnector {
    websocket_url: String,
}

impl WsConnector {
    pub fn new(websocket_url: impl Into<String>) -> Self {
        Self {
            websocket_url: websocket_url.into(),
        }
    }

    /// Endpoint for a room, with `http(s)` rewritten to `ws(s)`.
    pub fn room_url(&self, room_id: &RoomId) -> Result<Url, ChannelError> {
        let mut url = Url::parse(&self.websocket_url)
            .map_err(|e| ChannelError::Connect(format!("{}: {e}", self.websocket_url)))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ChannelError::Connect(format!(
                    "Unsupported websocket scheme: {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| ChannelError::Connect(format!("Cannot use scheme {scheme}")))?;
        url.query_pairs_mut().append_pair("roomId", room_id.as_str());
        Ok(url)
    }
}

impl Connector for WsConnector {
    fn connect(&self, room_id: &RoomId) -> BoxFuture<'static, Result<Link, ChannelError>> {
        let url = self.room_url(room_id);
        Box::pin(async move {
            let url = url?;
            log::debug!("Opening websocket {url}");

            let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| ChannelError::Connect(e.to_string()))?;
            let (mut ws_writer, mut ws_reader) = ws_stream.split();

            let (out_tx, mut out_rx) = mpsc::channel::<Frame>(LINK_CAPACITY);
            let (in_tx, in_rx) = mpsc::channel::<TransportEvent>(LINK_CAPACITY);

            // Writer task: outgoing channel → socket
            tokio::spawn(async move {
                while let Some(frame) = out_rx.recv().await {
                    let text = match frame.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            log::warn!("Dropping unencodable frame {:?}: {e}", frame.event);
                            continue;
                        }
                    };
                    if let Err(e) = ws_writer.send(Message::Text(text.into())).await {
                        log::debug!("Websocket write failed: {e}");
                        break;
                    }
                }
                let _ = ws_writer.close().await;
            });

            // Reader task: socket → incoming channel
            tokio::spawn(async move {
                while let Some(msg) = ws_reader.next().await {
                    let event = match msg {
                        Ok(Message::Text(text)) => match Frame::decode(text.as_str()) {
                            Ok(frame) => TransportEvent::Frame(frame),
                            Err(e) => TransportEvent::Error(e.to_string()),
                        },
                        Ok(Message::Close(_)) => break,
                        Ok(Message::Binary(data)) => {
                            log::debug!("Ignoring {}-byte binary frame", data.len());
                            continue;
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            let _ = in_tx.send(TransportEvent::Error(e.to_string())).await;
                            break;
                        }
                    };
                    if in_tx.send(event).await.is_err() {
                        break;
                    }
                }
            });

            Ok(Link {
                outgoing: out_tx,
                incoming: in_rx,
            })
        })
    }
}
