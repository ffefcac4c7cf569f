//! Quiz session state types

use crate::protocol::{Evaluation, Level};
use std::fmt;

// ============================================================================
// Session State - one round of topic -> question -> evaluation
// ============================================================================

/// Discrete stage of a quiz round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    SelectingTopic,
    SelectingSubtopic,
    SelectingLevel,
    AwaitingQuestion,
    Answering,
    Evaluated,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::SelectingTopic => "selecting_topic",
            Phase::SelectingSubtopic => "selecting_subtopic",
            Phase::SelectingLevel => "selecting_level",
            Phase::AwaitingQuestion => "awaiting_question",
            Phase::Answering => "answering",
            Phase::Evaluated => "evaluated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service reply the session is currently waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Awaiting {
    Subtopics,
    Question,
    Evaluation,
}

impl Awaiting {
    pub fn as_str(self) -> &'static str {
        match self {
            Awaiting::Subtopics => "subtopics",
            Awaiting::Question => "question",
            Awaiting::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Awaiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single quiz round
///
/// `Default` is the pristine state every reset returns to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub level: Option<Level>,
    /// Only populated while `phase == SelectingSubtopic`
    pub available_subtopics: Vec<String>,
    pub current_question: Option<String>,
    pub draft_answer: String,
    pub evaluation: Option<Evaluation>,
    /// Outstanding request whose reply has not arrived yet
    pub awaiting: Option<Awaiting>,
}

impl SessionState {
    /// Fresh round with `topic` selected and its subtopics requested
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            phase: Phase::SelectingSubtopic,
            topic: Some(topic.into()),
            awaiting: Some(Awaiting::Subtopics),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }

    /// Check that only the fields belonging to the current phase (or to
    /// phases already passed) are populated.
    pub fn is_consistent(&self) -> bool {
        let chosen = (
            self.topic.is_some(),
            self.subtopic.is_some(),
            self.level.is_some(),
        );
        let fields_ok = match self.phase {
            Phase::SelectingTopic => {
                chosen == (false, false, false)
                    && self.available_subtopics.is_empty()
                    && self.current_question.is_none()
                    && self.evaluation.is_none()
            }
            Phase::SelectingSubtopic => {
                chosen == (true, false, false)
                    && self.current_question.is_none()
                    && self.evaluation.is_none()
            }
            Phase::SelectingLevel => {
                chosen == (true, true, false)
                    && self.available_subtopics.is_empty()
                    && self.current_question.is_none()
                    && self.evaluation.is_none()
            }
            Phase::AwaitingQuestion => {
                chosen == (true, true, true)
                    && self.available_subtopics.is_empty()
                    && self.current_question.is_none()
                    && self.evaluation.is_none()
            }
            Phase::Answering => {
                chosen == (true, true, true)
                    && self.available_subtopics.is_empty()
                    && self.current_question.is_some()
                    && self.evaluation.is_none()
            }
            Phase::Evaluated => {
                chosen == (true, true, true)
                    && self.available_subtopics.is_empty()
                    && self.current_question.is_some()
                    && self.evaluation.is_some()
            }
        };

        // Draft text only survives while answering
        let draft_ok = self.phase == Phase::Answering || self.draft_answer.is_empty();

        let awaiting_ok = match self.awaiting {
            None => true,
            Some(Awaiting::Subtopics) => self.phase == Phase::SelectingSubtopic,
            Some(Awaiting::Question) => self.phase == Phase::AwaitingQuestion,
            Some(Awaiting::Evaluation) => self.phase == Phase::Answering,
        };

        fields_ok && draft_ok && awaiting_ok
    }
}

// ============================================================================
// Client State - the snapshot handed to the presentation layer
// ============================================================================

/// Connectivity of the single service channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Connecting,
    Open,
    Closed,
    Errored,
}

impl LinkState {
    pub fn is_open(self) -> bool {
        self == LinkState::Open
    }

    pub fn is_down(self) -> bool {
        matches!(self, LinkState::Closed | LinkState::Errored)
    }
}

/// User-visible fault surfaced next to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A reply did not arrive within the response timeout
    TimedOut(Awaiting),
    /// The service rejected the last request
    ServiceError(String),
    /// The channel closed or failed
    ConnectionLost(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TimedOut(awaiting) => {
                write!(f, "No {awaiting} received from the quiz service yet")
            }
            Notice::ServiceError(message) => write!(f, "Quiz service error: {message}"),
            Notice::ConnectionLost(reason) => write!(f, "Connection lost: {reason}"),
        }
    }
}

/// Authoritative client state: the round plus channel status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientState {
    pub session: SessionState,
    pub link: LinkState,
    pub notice: Option<Notice>,
}

impl ClientState {
    /// State before the channel has reported `opened`
    pub fn connecting() -> Self {
        Self::default()
    }

    /// State right after the channel opened
    pub fn open() -> Self {
        Self {
            link: LinkState::Open,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }
}
