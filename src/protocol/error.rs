//! Protocol error types

use thiserror::Error;

/// An inbound payload that failed schema validation
///
/// The offending frame is dropped; session state is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),
    #[error("message has no string `type` discriminator")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid `{kind}` message: {reason}")]
    InvalidPayload { kind: String, reason: String },
    #[error("evaluation score {0} is outside 0..=10")]
    ScoreOutOfRange(i64),
    #[error("unexpected binary frame ({0} bytes)")]
    BinaryFrame(usize),
}
