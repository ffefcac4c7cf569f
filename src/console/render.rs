use super::{topic_name, TOPICS};
use crate::protocol::Level;
use crate::state_machine::{Awaiting, ClientState, LinkState, Phase};
use std::fmt::Write;

const TITLE: &str = "1Q AI/ML Quiz";

/// Render the screen for a snapshot
///
/// Output depends only on the snapshot, so identical snapshots (such as
/// successive draft edits) render identically.
pub fn render(state: &ClientState) -> String {
    let mut out = String::from(TITLE);
    out.push('\n');

    match state.link {
        LinkState::Connecting => out.push_str("Connecting to the quiz service...\n"),
        LinkState::Closed | LinkState::Errored => {
            out.push_str("Disconnected. Type /reconnect to try again.\n");
        }
        LinkState::Open => {}
    }
    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "! {notice}");
    }
    out.push('\n');

    let session = &state.session;
    match session.phase {
        Phase::SelectingTopic => {
            out.push_str("Select a Topic:\n");
            menu(&mut out, TOPICS.iter().map(|topic| topic.name));
        }
        Phase::SelectingSubtopic => {
            if let Some(topic) = &session.topic {
                let _ = writeln!(out, "Topic: {}", topic_name(topic));
            }
            out.push_str("Select a Subtopic:\n");
            if session.available_subtopics.is_empty() {
                out.push_str("Loading subtopics...\n");
            } else {
                menu(&mut out, session.available_subtopics.iter().map(String::as_str));
            }
        }
        Phase::SelectingLevel => {
            if let Some(subtopic) = &session.subtopic {
                let _ = writeln!(out, "Subtopic: {subtopic}");
            }
            out.push_str("Select Difficulty Level:\n");
            menu(&mut out, Level::ALL.map(Level::label).into_iter());
        }
        Phase::AwaitingQuestion | Phase::Answering | Phase::Evaluated => {
            out.push_str("Question:\n");
            let _ = writeln!(
                out,
                "{}",
                session
                    .current_question
                    .as_deref()
                    .unwrap_or("Waiting for the question...")
            );
            if session.phase == Phase::Answering {
                if session.awaiting == Some(Awaiting::Evaluation) {
                    out.push_str("\nWaiting for the evaluation...\n");
                } else {
                    out.push_str("\nType your answer and press Enter to submit it.\n");
                }
            }
            if let Some(evaluation) = &session.evaluation {
                let _ = writeln!(out, "\nScore: {}", evaluation.score);
                let _ = writeln!(out, "Feedback: {}", evaluation.feedback);
                out.push_str("Type /next for the next round.\n");
            }
        }
    }

    out.trim_end().to_string()
}

fn menu<'a>(out: &mut String, entries: impl Iterator<Item = &'a str>) {
    for (i, entry) in entries.enumerate() {
        let _ = writeln!(out, "  {}. {entry}", i + 1);
    }
}
