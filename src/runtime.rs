//! Runtime for driving a quiz session
//!
//! One task owns the session state and the channel. User intents, inbound
//! service messages, channel lifecycle notifications and timer expiries all
//! arrive on a single FIFO queue and are applied one at a time.

mod executor;


pub use executor::SessionRuntime;

use crate::protocol::{Level, ProtocolError};
use crate::state_machine::{ClientState, Event};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Capacity of the session event queue
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Capacity of the update broadcast
pub const UPDATE_CAPACITY: usize = 128;

/// Updates published to the presentation layer
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// A new snapshot was committed
    Snapshot(ClientState),
    /// An intent was refused; the snapshot did not change
    Rejected {
        intent: &'static str,
        reason: String,
    },
    /// An inbound frame was dropped
    ProtocolError(ProtocolError),
}

/// The runtime has stopped and no longer accepts events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("quiz session has stopped")]
pub struct SessionClosed;

/// Handle to interact with a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub(crate) fn new(
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
    ) -> Self {
        Self {
            event_tx,
            broadcast_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }

    /// Queue an event behind everything already received
    async fn dispatch(&self, event: Event) -> Result<(), SessionClosed> {
        self.event_tx.send(event).await.map_err(|_| SessionClosed)
    }

    pub async fn edit_draft(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.dispatch(Event::EditDraft { text: text.into() }).await
    }

    pub async fn submit_answer(&self) -> Result<(), SessionClosed> {
        self.dispatch(Event::SubmitAnswer).await
    }

    pub async fn select_topic(&self, topic: impl Into<String>) -> Result<(), SessionClosed> {
        self.dispatch(Event::SelectTopic {
            topic: topic.into(),
        })
        .await
    }

    pub async fn select_subtopic(&self, subtopic: impl Into<String>) -> Result<(), SessionClosed> {
        self.dispatch(Event::SelectSubtopic {
            subtopic: subtopic.into(),
        })
        .await
    }

    pub async fn select_level(&self, level: Level) -> Result<(), SessionClosed> {
        self.dispatch(Event::SelectLevel { level }).await
    }

    pub async fn next_round(&self) -> Result<(), SessionClosed> {
        self.dispatch(Event::NextRound).await
    }

    pub async fn reconnect(&self) -> Result<(), SessionClosed> {
        self.dispatch(Event::Reconnect).await
    }
}

/// Create the event queue a session runtime and its channel share
pub fn event_queue() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(EVENT_QUEUE_CAPACITY)
}
