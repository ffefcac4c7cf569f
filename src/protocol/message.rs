//! Messages exchanged with the quiz service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Difficulty level requested for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Easy, Level::Medium, Level::Hard];

    /// Wire name of the level
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Medium => "medium",
            Level::Hard => "hard",
        }
    }

    /// Human-readable label for menus
    pub fn label(self) -> &'static str {
        match self {
            Level::Easy => "Easy",
            Level::Medium => "Medium",
            Level::Hard => "Hard",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Level::Easy),
            "medium" => Ok(Level::Medium),
            "hard" => Ok(Level::Hard),
            _ => Err(UnknownLevel(s.trim().to_string())),
        }
    }
}

/// Score awarded by the evaluator, always within `0..=10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 10;

    /// Validate a raw wire score
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Score)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A scored answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub score: Score,
    pub feedback: String,
}

/// Client -> service messages
///
/// Serialized without a discriminator; the service tells them apart by
/// which keys are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Topic selection, answered with the topic's subtopics
    Topic { topic: String },
    /// Subtopic + level, answered with a generated question
    QuestionRequest { subtopic: String, level: Level },
    /// Free-text answer, answered with an evaluation
    Answer { answer: String },
}

impl OutboundMessage {
    pub fn topic(topic: impl Into<String>) -> Self {
        OutboundMessage::Topic {
            topic: topic.into(),
        }
    }

    pub fn question_request(subtopic: impl Into<String>, level: Level) -> Self {
        OutboundMessage::QuestionRequest {
            subtopic: subtopic.into(),
            level,
        }
    }

    pub fn answer(answer: impl Into<String>) -> Self {
        OutboundMessage::Answer {
            answer: answer.into(),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Topic { .. } => "topic",
            OutboundMessage::QuestionRequest { .. } => "question_request",
            OutboundMessage::Answer { .. } => "answer",
        }
    }

    /// Encode as a single JSON text payload
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Service -> client messages, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Subtopics { subtopics: Vec<String> },
    Question { question: String },
    Evaluation(Evaluation),
    /// Request rejected by the service (unknown topic, empty answer, ...)
    ServiceError { message: String },
}

impl InboundMessage {
    /// Wire discriminator of the message
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Subtopics { .. } => "subtopics",
            InboundMessage::Question { .. } => "question",
            InboundMessage::Evaluation(_) => "evaluation",
            InboundMessage::ServiceError { .. } => "error",
        }
    }
}
