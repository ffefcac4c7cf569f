//! WebSocket channel using `tokio-tungstenite`

use super::{Channel, ChannelError};
use crate::protocol::{self, OutboundMessage, ProtocolError};
use crate::state_machine::Event;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Channel over a single WebSocket connection
///
/// Each text frame carries one JSON message. Frames are decoded on a
/// reader task and forwarded to the runtime's event queue.
pub struct WebSocketChannel {
    url: String,
    events: mpsc::Sender<Event>,
    link: Option<Link>,
    /// Epoch of the most recent connection; 0 before the first dial
    epoch: u64,
}

/// One physical connection. Dropping it aborts the reader task.
struct Link {
    epoch: u64,
    writer: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl WebSocketChannel {
    pub fn new(url: impl Into<String>, events: mpsc::Sender<Event>) -> Self {
        Self {
            url: url.into(),
            events,
            link: None,
            epoch: 0,
        }
    }
}

#[async_trait]
impl Channel for WebSocketChannel {
    async fn open(&mut self) -> Result<(), ChannelError> {
        if self.is_open() {
            return Ok(());
        }
        // Release a dead link before dialing again
        self.link = None;

        tracing::info!(url = %self.url, "Connecting to quiz service");
        let (stream, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connection {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        self.epoch += 1;
        let epoch = self.epoch;
        tracing::info!(url = %self.url, epoch, status = %response.status(), "Channel opened");

        let (writer, reader) = stream.split();
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(
            epoch,
            reader,
            self.events.clone(),
            closed.clone(),
        ));

        self.link = Some(Link {
            epoch,
            writer,
            reader,
            closed,
        });
        Ok(())
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let Some(link) = self
            .link
            .as_mut()
            .filter(|link| !link.closed.load(Ordering::Acquire))
        else {
            return Err(ChannelError::NotConnected);
        };

        let payload = message.encode()?;
        if let Err(e) = link.writer.send(Message::Text(payload)).await {
            link.closed.store(true, Ordering::Release);
            return Err(ChannelError::Transport(e.to_string()));
        }
        tracing::debug!(kind = message.kind(), "Sent message");
        Ok(())
    }

    async fn close(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        link.closed.store(true, Ordering::Release);
        if let Err(e) = link.writer.close().await {
            tracing::debug!(error = %e, "Close handshake failed");
        }
        tracing::info!(url = %self.url, epoch = link.epoch, "Channel closed");
    }

    fn is_open(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| !link.closed.load(Ordering::Acquire))
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Forward inbound frames until the connection ends, then report how it ended
async fn read_loop(
    epoch: u64,
    mut reader: SplitStream<WsStream>,
    events: mpsc::Sender<Event>,
    closed: Arc<AtomicBool>,
) {
    let terminal = loop {
        let event = match reader.next().await {
            Some(Ok(Message::Text(text))) => match protocol::decode(&text) {
                Ok(message) => Event::Inbound(message),
                Err(error) => Event::ProtocolViolation(error),
            },
            Some(Ok(Message::Binary(data))) => {
                Event::ProtocolViolation(ProtocolError::BinaryFrame(data.len()))
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(?frame, "Close frame received");
                break Event::ChannelClosed;
            }
            // Ping/pong are answered by tungstenite itself
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                break Event::ChannelErrored {
                    message: e.to_string(),
                }
            }
            None => break Event::ChannelClosed,
        };

        if events.send(Event::on_link(epoch, event)).await.is_err() {
            tracing::debug!("Event queue closed, stopping reader");
            return;
        }
    };

    closed.store(true, Ordering::Release);
    let _ = events.send(Event::on_link(epoch, terminal)).await;
}
