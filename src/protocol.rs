//! Wire protocol spoken with the quiz service
//!
//! One JSON object per WebSocket text frame. Outbound messages are told
//! apart by their keys, inbound ones by a `type` discriminator.

mod error;
mod message;

pub use error::ProtocolError;
pub use message::{Evaluation, InboundMessage, Level, OutboundMessage, Score};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct SubtopicsPayload {
    subtopics: Vec<String>,
}

#[derive(Deserialize)]
struct QuestionPayload {
    question: String,
}

#[derive(Deserialize)]
struct EvaluationPayload {
    score: i64,
    feedback: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Decode and validate one inbound text payload
pub fn decode(text: &str) -> Result<InboundMessage, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let kind = match value.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(ProtocolError::MissingType),
    };

    match kind.as_str() {
        "subtopics" => {
            let payload: SubtopicsPayload = parse_payload(&kind, value)?;
            Ok(InboundMessage::Subtopics {
                subtopics: payload.subtopics,
            })
        }
        "question" => {
            let payload: QuestionPayload = parse_payload(&kind, value)?;
            Ok(InboundMessage::Question {
                question: payload.question,
            })
        }
        "evaluation" => {
            let payload: EvaluationPayload = parse_payload(&kind, value)?;
            let score =
                Score::new(payload.score).ok_or(ProtocolError::ScoreOutOfRange(payload.score))?;
            Ok(InboundMessage::Evaluation(Evaluation {
                score,
                feedback: payload.feedback,
            }))
        }
        "error" => {
            let payload: ErrorPayload = parse_payload(&kind, value)?;
            Ok(InboundMessage::ServiceError {
                message: payload.message,
            })
        }
        _ => Err(ProtocolError::UnknownType(kind)),
    }
}

fn parse_payload<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
