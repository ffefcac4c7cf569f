//! Effects produced by state transitions

use super::state::Awaiting;
use crate::protocol::{OutboundMessage, ProtocolError};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Transmit a message to the quiz service.
    /// Executed before the new state is committed.
    Send(OutboundMessage),

    /// Start the response timer for the reply we now wait for
    ArmTimeout { awaiting: Awaiting },

    /// Stop any running response timer
    CancelTimeout,

    /// Re-establish the channel
    OpenChannel,

    /// Hand the new snapshot to the presentation layer
    PublishSnapshot,

    /// Log and surface a dropped inbound payload
    ReportProtocolError(ProtocolError),

    /// Event was valid but its guard did not hold; nothing applied
    Discard { reason: String },
}

impl Effect {
    pub fn send(message: OutboundMessage) -> Self {
        Effect::Send(message)
    }

    pub fn arm_timeout(awaiting: Awaiting) -> Self {
        Effect::ArmTimeout { awaiting }
    }

    pub fn discard(reason: impl Into<String>) -> Self {
        Effect::Discard {
            reason: reason.into(),
        }
    }
}
