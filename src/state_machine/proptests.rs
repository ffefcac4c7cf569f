//! Property-based tests for the quiz session machine
//!
//! States are reached by replaying random event sequences, so every
//! property is checked against states the client can actually be in.

use super::state::*;
use super::transition::*;
use super::*;
use crate::protocol::{Evaluation, InboundMessage, Level, OutboundMessage, ProtocolError, Score};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_level() -> impl Strategy<Value = Level> {
    prop_oneof![Just(Level::Easy), Just(Level::Medium), Just(Level::Hard)]
}

fn arb_awaiting() -> impl Strategy<Value = Awaiting> {
    prop_oneof![
        Just(Awaiting::Subtopics),
        Just(Awaiting::Question),
        Just(Awaiting::Evaluation),
    ]
}

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Regression".to_string()),
        Just("Clustering".to_string()),
        Just("Overview of AI".to_string()),
        "[A-Za-z ]{1,12}",
    ]
}

fn arb_evaluation() -> impl Strategy<Value = Evaluation> {
    (0i64..=10, "[a-zA-Z .]{0,30}").prop_map(|(score, feedback)| Evaluation {
        score: Score::new(score).unwrap(),
        feedback,
    })
}

fn arb_inbound() -> impl Strategy<Value = InboundMessage> {
    prop_oneof![
        proptest::collection::vec(arb_name(), 0..4)
            .prop_map(|subtopics| InboundMessage::Subtopics { subtopics }),
        "[a-zA-Z ?]{1,30}".prop_map(|question| InboundMessage::Question { question }),
        arb_evaluation().prop_map(InboundMessage::Evaluation),
        "[a-zA-Z ]{1,20}".prop_map(|message| InboundMessage::ServiceError { message }),
    ]
}

fn arb_intent() -> impl Strategy<Value = Event> {
    prop_oneof![
        prop_oneof![Just("AI".to_string()), Just("ML".to_string()), Just(" ".to_string())]
            .prop_map(|topic| Event::SelectTopic { topic }),
        arb_name().prop_map(|subtopic| Event::SelectSubtopic { subtopic }),
        arb_level().prop_map(|level| Event::SelectLevel { level }),
        "[a-z ]{0,20}".prop_map(|text| Event::EditDraft { text }),
        Just(Event::SubmitAnswer),
        Just(Event::NextRound),
        Just(Event::Reconnect),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => arb_intent(),
        4 => arb_inbound().prop_map(Event::Inbound),
        1 => Just(Event::ProtocolViolation(ProtocolError::UnknownType("hint".to_string()))),
        1 => Just(Event::ChannelOpened),
        1 => Just(Event::ChannelClosed),
        1 => Just(Event::ChannelErrored { message: "reset by peer".to_string() }),
        1 => (1u64..3, arb_inbound())
            .prop_map(|(epoch, message)| Event::on_link(epoch, Event::Inbound(message))),
        1 => (arb_awaiting(), 0u64..4)
            .prop_map(|(awaiting, generation)| Event::ResponseTimeout { awaiting, generation }),
    ]
}

/// Reach an arbitrary state by replaying arbitrary events from a fresh open channel
fn arb_state() -> impl Strategy<Value = ClientState> {
    proptest::collection::vec(arb_event(), 0..25).prop_map(|events| replay(ClientState::open(), events))
}

fn replay(mut state: ClientState, events: Vec<Event>) -> ClientState {
    for event in events {
        if let Ok(result) = transition(&state, event) {
            state = result.new_state;
        }
    }
    state
}

/// Step the happy path one phase forward, mirroring the transition table
fn next_valid_intent(state: &ClientState, answer: &str) -> Option<(Event, Phase)> {
    match state.phase() {
        Phase::SelectingTopic => Some((
            Event::SelectTopic {
                topic: "ML".to_string(),
            },
            Phase::SelectingSubtopic,
        )),
        Phase::SelectingSubtopic => Some((
            Event::SelectSubtopic {
                subtopic: state
                    .session
                    .available_subtopics
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Regression".to_string()),
            },
            Phase::SelectingLevel,
        )),
        Phase::SelectingLevel => Some((
            Event::SelectLevel { level: Level::Medium },
            Phase::AwaitingQuestion,
        )),
        Phase::Answering if state.session.draft_answer != answer => Some((
            Event::EditDraft {
                text: answer.to_string(),
            },
            Phase::Answering,
        )),
        Phase::Answering => Some((Event::SubmitAnswer, Phase::Answering)),
        Phase::Evaluated => Some((Event::NextRound, Phase::SelectingTopic)),
        Phase::AwaitingQuestion => None,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: Every reachable session state is phase-consistent
    #[test]
    fn prop_transitions_preserve_consistency(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ClientState::open();

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                prop_assert!(state.session.is_consistent(), "Inconsistent state: {:?}", state);
                prop_assert!(
                    state.session.available_subtopics.is_empty()
                        || state.phase() == Phase::SelectingSubtopic,
                    "Subtopics outside SelectingSubtopic: {:?}",
                    state
                );
            }
        }
    }

    // Invariant 2: Rejected intents never change anything
    #[test]
    fn prop_rejection_is_all_or_nothing(state in arb_state(), event in arb_event()) {
        let before = state.clone();
        if transition(&state, event).is_err() {
            prop_assert_eq!(state, before);
        }
    }

    // Invariant 3: Selecting a topic always yields an empty subtopic list and no subtopic
    #[test]
    fn prop_select_topic_clears_subtopics(state in arb_state(), topic in "[A-Z]{2}") {
        let mut state = state;
        state.link = LinkState::Open;
        let result = transition(&state, Event::SelectTopic { topic: topic.clone() }).unwrap();
        prop_assert!(result.new_state.session.available_subtopics.is_empty());
        prop_assert!(result.new_state.session.subtopic.is_none());
        prop_assert_eq!(result.new_state.session.topic.as_deref(), Some(topic.as_str()));
        prop_assert_eq!(result.outbound(), Some(&OutboundMessage::topic(topic.clone())));
    }

    // Invariant 4: A question clears evaluation and draft, idempotently
    #[test]
    fn prop_question_idempotent(state in arb_state(), question in "[a-zA-Z ?]{1,30}") {
        let event = Event::Inbound(InboundMessage::Question { question: question.clone() });
        let once = transition(&state, event.clone()).unwrap().new_state;
        let twice = transition(&once, event).unwrap().new_state;

        if matches!(state.phase(), Phase::AwaitingQuestion | Phase::Answering) {
            prop_assert_eq!(once.phase(), Phase::Answering);
            prop_assert!(once.session.evaluation.is_none());
            prop_assert!(once.session.draft_answer.is_empty());
            prop_assert_eq!(once.session.current_question.as_deref(), Some(question.as_str()));
        } else {
            prop_assert_eq!(&once, &state);
        }
        prop_assert_eq!(once, twice);
    }

    // Invariant 5: Blank drafts never produce an outbound answer
    #[test]
    fn prop_blank_answer_never_sent(state in arb_state(), blank in "[ \t\n]{0,5}") {
        let state = match transition(&state, Event::EditDraft { text: blank }) {
            Ok(result) => result.new_state,
            Err(_) => state,
        };
        if let Ok(result) = transition(&state, Event::SubmitAnswer) {
            prop_assert!(
                !matches!(result.outbound(), Some(OutboundMessage::Answer { .. })),
                "Blank answer sent from {:?}",
                state
            );
        }
    }

    // Invariant 6: Next round from any phase yields the pristine session
    #[test]
    fn prop_next_round_resets(state in arb_state()) {
        let result = transition(&state, Event::NextRound).unwrap();
        prop_assert!(result.new_state.session.is_pristine());
        prop_assert!(result.new_state.notice.is_none());
        prop_assert_eq!(result.new_state.link, state.link);
        prop_assert!(result.effects.contains(&Effect::CancelTimeout));
    }

    // Invariant 7: Protocol violations never touch state
    #[test]
    fn prop_protocol_violation_inert(state in arb_state(), score in 11i64..1000) {
        let error = ProtocolError::ScoreOutOfRange(score);
        let result = transition(&state, Event::ProtocolViolation(error.clone())).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert_eq!(result.effects, vec![Effect::ReportProtocolError(error)]);
    }

    // Invariant 8: No outbound message while the channel is not open
    #[test]
    fn prop_no_send_while_disconnected(state in arb_state(), event in arb_intent()) {
        let mut state = state;
        state.link = LinkState::Closed;
        if let Ok(result) = transition(&state, event) {
            prop_assert!(result.outbound().is_none(), "Sent while closed: {:?}", result.effects);
        }
    }

    // Invariant 9: Following the table with service replies is deterministic
    #[test]
    fn prop_happy_path_follows_table(
        steps in 1usize..30,
        subtopics in proptest::collection::vec(arb_name(), 0..3),
        evaluation in arb_evaluation(),
    ) {
        let mut state = ClientState::open();
        let answer = "partitions data into k groups";

        for _ in 0..steps {
            match next_valid_intent(&state, answer) {
                Some((event, expected)) => {
                    let result = transition(&state, event).unwrap();
                    prop_assert_eq!(result.new_state.phase(), expected);
                    state = result.new_state;
                }
                None => {
                    let result = transition(
                        &state,
                        Event::Inbound(InboundMessage::Question { question: "Explain k-means.".to_string() }),
                    ).unwrap();
                    prop_assert_eq!(result.new_state.phase(), Phase::Answering);
                    state = result.new_state;
                }
            }

            // Service replies as soon as it is asked
            let reply = match state.session.awaiting {
                Some(Awaiting::Subtopics) => Some(InboundMessage::Subtopics { subtopics: subtopics.clone() }),
                Some(Awaiting::Evaluation) => Some(InboundMessage::Evaluation(evaluation.clone())),
                _ => None,
            };
            if let Some(reply) = reply {
                state = transition(&state, Event::Inbound(reply)).unwrap().new_state;
            }
            prop_assert!(state.session.is_consistent());
        }
    }

    // Invariant 10: Send effects only accompany phases that expect a reply
    #[test]
    fn prop_send_arms_matching_timeout(state in arb_state(), event in arb_intent()) {
        if let Ok(result) = transition(&state, event) {
            if result.outbound().is_some() {
                let awaiting = result.new_state.session.awaiting;
                prop_assert!(awaiting.is_some());
                prop_assert!(
                    result.effects.contains(&Effect::ArmTimeout { awaiting: awaiting.unwrap() }),
                    "Send without timeout: {:?}",
                    result.effects
                );
            }
        }
    }
}
