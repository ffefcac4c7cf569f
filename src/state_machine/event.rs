//! Events that can occur in a quiz session

use super::state::Awaiting;
use crate::protocol::{InboundMessage, Level, ProtocolError};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User intents
    SelectTopic {
        topic: String,
    },
    SelectSubtopic {
        subtopic: String,
    },
    SelectLevel {
        level: Level,
    },
    EditDraft {
        text: String,
    },
    SubmitAnswer,
    NextRound,
    Reconnect,

    // Service events
    Inbound(InboundMessage),
    ProtocolViolation(ProtocolError),

    // Channel lifecycle
    ChannelOpened,
    ChannelClosed,
    ChannelErrored {
        message: String,
    },

    /// Produced by one physical connection. The runtime unwraps it when
    /// `epoch` is the current connection and drops it otherwise.
    OnLink {
        epoch: u64,
        event: Box<Event>,
    },

    // Timer events
    ResponseTimeout {
        awaiting: Awaiting,
        /// Timer generation, checked by the runtime to drop stale timers
        generation: u64,
    },
}

impl Event {
    /// Whether this event originates from the user
    pub fn is_intent(&self) -> bool {
        matches!(
            self,
            Event::SelectTopic { .. }
                | Event::SelectSubtopic { .. }
                | Event::SelectLevel { .. }
                | Event::EditDraft { .. }
                | Event::SubmitAnswer
                | Event::NextRound
                | Event::Reconnect
        )
    }

    /// Stamp an event with the connection that produced it
    pub fn on_link(epoch: u64, event: Event) -> Self {
        Event::OnLink {
            epoch,
            event: Box::new(event),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::SelectTopic { .. } => "select_topic",
            Event::SelectSubtopic { .. } => "select_subtopic",
            Event::SelectLevel { .. } => "select_level",
            Event::EditDraft { .. } => "edit_draft",
            Event::SubmitAnswer => "submit_answer",
            Event::NextRound => "next_round",
            Event::Reconnect => "reconnect",
            Event::Inbound(msg) => msg.kind(),
            Event::ProtocolViolation(_) => "protocol_violation",
            Event::ChannelOpened => "channel_opened",
            Event::ChannelClosed => "channel_closed",
            Event::ChannelErrored { .. } => "channel_errored",
            Event::OnLink { event, .. } => event.name(),
            Event::ResponseTimeout { .. } => "response_timeout",
        }
    }
}
