//! Pure state transition function
//!
//! User intents are sender-gated: anything that must reach the service is
//! rejected while the channel is not open. Service data is receiver-driven:
//! it is applied whenever its phase guard holds and silently discarded
//! otherwise.

use super::state::{Awaiting, ClientState, LinkState, Notice, Phase, SessionState};
use super::{Effect, Event};
use crate::protocol::{Evaluation, InboundMessage, OutboundMessage};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ClientState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ClientState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Outbound message carried by this result, if any
    pub fn outbound(&self) -> Option<&OutboundMessage> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Send(message) => Some(message),
            _ => None,
        })
    }
}

/// Reasons a user intent is rejected. State is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Not connected to the quiz service")]
    NotConnected,
    #[error("Already connected to the quiz service")]
    AlreadyConnected,
    #[error("Topic must not be empty")]
    BlankTopic,
    #[error("Answer must not be empty")]
    EmptyAnswer,
    #[error("Unknown subtopic: {0}")]
    UnknownSubtopic(String),
    #[error("Cannot {intent} while {phase}")]
    InvalidIntent { intent: &'static str, phase: Phase },
}

/// Pure transition function
///
/// Given the same state and event it always produces the same result and
/// performs no I/O.
pub fn transition(state: &ClientState, event: Event) -> Result<TransitionResult, TransitionError> {
    let phase = state.session.phase;

    match event {
        // ============================================================
        // User Intents
        // ============================================================

        // Any phase + SelectTopic -> SelectingSubtopic (fresh round)
        Event::SelectTopic { topic } => {
            let topic = topic.trim();
            if topic.is_empty() {
                return Err(TransitionError::BlankTopic);
            }
            require_open(state)?;

            let new_state = ClientState {
                session: SessionState::with_topic(topic),
                link: state.link,
                notice: None,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::send(OutboundMessage::topic(topic)))
                .with_effect(Effect::arm_timeout(Awaiting::Subtopics))
                .with_effect(Effect::PublishSnapshot))
        }

        // SelectingSubtopic + SelectSubtopic -> SelectingLevel
        Event::SelectSubtopic { subtopic } => {
            if phase != Phase::SelectingSubtopic {
                return Err(invalid("select a subtopic", phase));
            }
            let known = &state.session.available_subtopics;
            if !known.is_empty() && !known.contains(&subtopic) {
                return Err(TransitionError::UnknownSubtopic(subtopic));
            }

            let mut new_state = state.clone();
            let session = &mut new_state.session;
            session.phase = Phase::SelectingLevel;
            session.subtopic = Some(subtopic);
            session.available_subtopics.clear();
            // Subtopics are no longer useful once one is chosen
            let was_waiting = session.awaiting.take().is_some();

            Ok(TransitionResult::new(new_state)
                .with_effects(was_waiting.then_some(Effect::CancelTimeout))
                .with_effect(Effect::PublishSnapshot))
        }

        // SelectingLevel + SelectLevel -> AwaitingQuestion
        Event::SelectLevel { level } => {
            if phase != Phase::SelectingLevel {
                return Err(invalid("select a level", phase));
            }
            require_open(state)?;
            let Some(subtopic) = state.session.subtopic.clone() else {
                return Err(invalid("select a level", phase));
            };

            let mut new_state = state.clone();
            new_state.session.phase = Phase::AwaitingQuestion;
            new_state.session.level = Some(level);
            new_state.session.awaiting = Some(Awaiting::Question);
            new_state.notice = None;

            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::send(OutboundMessage::question_request(
                    subtopic, level,
                )))
                .with_effect(Effect::arm_timeout(Awaiting::Question))
                .with_effect(Effect::PublishSnapshot))
        }

        // Answering + EditDraft -> Answering (draft only)
        Event::EditDraft { text } => {
            if phase != Phase::Answering {
                return Err(invalid("edit the answer", phase));
            }
            let mut new_state = state.clone();
            new_state.session.draft_answer = text;
            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishSnapshot))
        }

        // Answering + SubmitAnswer -> Answering (wait for evaluation)
        Event::SubmitAnswer => {
            if phase != Phase::Answering {
                return Err(invalid("submit an answer", phase));
            }
            if state.session.draft_answer.trim().is_empty() {
                return Err(TransitionError::EmptyAnswer);
            }
            require_open(state)?;

            let mut new_state = state.clone();
            new_state.session.awaiting = Some(Awaiting::Evaluation);
            new_state.notice = None;
            let answer = OutboundMessage::answer(state.session.draft_answer.clone());

            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::send(answer))
                .with_effect(Effect::arm_timeout(Awaiting::Evaluation))
                .with_effect(Effect::PublishSnapshot))
        }

        // Any phase + NextRound -> SelectingTopic (full reset)
        Event::NextRound => {
            let new_state = ClientState {
                session: SessionState::default(),
                link: state.link,
                notice: None,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::CancelTimeout)
                .with_effect(Effect::PublishSnapshot))
        }

        // Closed/Errored + Reconnect -> Connecting
        Event::Reconnect => {
            if !state.link.is_down() {
                return Err(TransitionError::AlreadyConnected);
            }
            let mut new_state = state.clone();
            new_state.link = LinkState::Connecting;
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::OpenChannel)
                .with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Service Messages
        // ============================================================
        Event::Inbound(message) => Ok(apply_inbound(state, message)),

        Event::ProtocolViolation(error) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::ReportProtocolError(error)))
        }

        // ============================================================
        // Channel Lifecycle
        // ============================================================

        // Re-opening forces a fresh session
        Event::ChannelOpened => {
            if state.link.is_open() {
                return Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::discard("channel already open")));
            }
            Ok(TransitionResult::new(ClientState::open())
                .with_effect(Effect::CancelTimeout)
                .with_effect(Effect::PublishSnapshot))
        }

        Event::ChannelClosed => Ok(channel_down(
            state,
            LinkState::Closed,
            "closed by the quiz service".to_string(),
        )),

        Event::ChannelErrored { message } => Ok(channel_down(state, LinkState::Errored, message)),

        // Connection freshness is checked by the runtime before we get here
        Event::OnLink { event, .. } => transition(state, *event),

        // ============================================================
        // Timers
        // ============================================================
        Event::ResponseTimeout { awaiting, .. } => {
            if state.session.awaiting != Some(awaiting) {
                return Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::discard(format!("stale {awaiting} timeout"))));
            }
            let mut new_state = state.clone();
            new_state.session.awaiting = None;
            new_state.notice = Some(Notice::TimedOut(awaiting));
            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishSnapshot))
        }
    }
}

fn apply_inbound(state: &ClientState, message: InboundMessage) -> TransitionResult {
    let phase = state.session.phase;

    match message {
        // SelectingSubtopic + subtopics -> SelectingSubtopic (list populated)
        InboundMessage::Subtopics { subtopics } if phase == Phase::SelectingSubtopic => {
            let mut new_state = state.clone();
            new_state.session.available_subtopics = subtopics;
            settle(new_state, Awaiting::Subtopics)
        }

        // AwaitingQuestion | Answering + question -> Answering
        InboundMessage::Question { question }
            if matches!(phase, Phase::AwaitingQuestion | Phase::Answering) =>
        {
            let mut new_state = state.clone();
            let session = &mut new_state.session;
            session.phase = Phase::Answering;
            session.current_question = Some(question);
            session.evaluation = None;
            session.draft_answer.clear();
            // A fresh question supersedes whatever reply was outstanding
            session.awaiting = None;
            new_state.notice = None;
            TransitionResult::new(new_state)
                .with_effect(Effect::CancelTimeout)
                .with_effect(Effect::PublishSnapshot)
        }

        // Answering + evaluation -> Evaluated
        InboundMessage::Evaluation(evaluation) if phase == Phase::Answering => {
            TransitionResult::new(evaluated(state, evaluation))
                .with_effect(Effect::CancelTimeout)
                .with_effect(Effect::PublishSnapshot)
        }

        // Any phase + service error -> same phase, notice surfaced
        InboundMessage::ServiceError { message } => {
            let mut new_state = state.clone();
            let was_waiting = new_state.session.awaiting.take().is_some();
            new_state.notice = Some(Notice::ServiceError(message));
            TransitionResult::new(new_state)
                .with_effects(was_waiting.then_some(Effect::CancelTimeout))
                .with_effect(Effect::PublishSnapshot)
        }

        other => TransitionResult::new(state.clone()).with_effect(Effect::discard(format!(
            "{} message not expected while {phase}",
            other.kind()
        ))),
    }
}

fn evaluated(state: &ClientState, evaluation: Evaluation) -> ClientState {
    let mut new_state = state.clone();
    let session = &mut new_state.session;
    session.phase = Phase::Evaluated;
    session.evaluation = Some(evaluation);
    session.draft_answer.clear();
    session.awaiting = None;
    new_state.notice = None;
    new_state
}

/// Mark `awaiting` as answered, cancelling its timer if it was running
fn settle(mut new_state: ClientState, awaiting: Awaiting) -> TransitionResult {
    let was_waiting = new_state.session.awaiting == Some(awaiting);
    if was_waiting {
        new_state.session.awaiting = None;
    }
    TransitionResult::new(new_state)
        .with_effects(was_waiting.then_some(Effect::CancelTimeout))
        .with_effect(Effect::PublishSnapshot)
}

fn channel_down(state: &ClientState, link: LinkState, reason: String) -> TransitionResult {
    if state.link.is_down() {
        return TransitionResult::new(state.clone())
            .with_effect(Effect::discard("channel already down"));
    }
    let mut new_state = state.clone();
    new_state.link = link;
    // Replies can no longer arrive on this channel
    new_state.session.awaiting = None;
    new_state.notice = Some(Notice::ConnectionLost(reason));
    TransitionResult::new(new_state)
        .with_effect(Effect::CancelTimeout)
        .with_effect(Effect::PublishSnapshot)
}

fn require_open(state: &ClientState) -> Result<(), TransitionError> {
    if state.link.is_open() {
        Ok(())
    } else {
        Err(TransitionError::NotConnected)
    }
}

fn invalid(intent: &'static str, phase: Phase) -> TransitionError {
    TransitionError::InvalidIntent { intent, phase }
}
