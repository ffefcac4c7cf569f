//! Duplex channel to the quiz service
//!
//! The adapter owns exactly one connection. A successful `open()` is the
//! "opened" notification; inbound frames and the closed/errored
//! notifications are pushed, in arrival order, onto the same event queue
//! the runtime consumes user intents from, wrapped in `Event::OnLink` with
//! the epoch of the connection that produced them.

pub mod websocket;

pub use websocket::WebSocketChannel;

use crate::protocol::OutboundMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Channel failures
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Endpoint unreachable or upgrade rejected
    #[error("could not connect to {url}: {reason}")]
    Connection { url: String, reason: String },
    /// Send attempted while the channel is not open; nothing is queued
    #[error("channel is not connected")]
    NotConnected,
    /// The socket failed while writing
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Connection to the quiz service
#[async_trait]
pub trait Channel: Send {
    /// Establish the connection. A no-op when already open.
    async fn open(&mut self) -> Result<(), ChannelError>;

    /// Serialize and transmit one message
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), ChannelError>;

    /// Release the connection. Safe to call repeatedly.
    async fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Identifies the current connection. Every successful dial bumps it,
    /// and everything the connection reports is stamped with it.
    fn epoch(&self) -> u64;
}
