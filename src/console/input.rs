use super::{Command, TOPICS};
use crate::protocol::Level;
use crate::state_machine::{ClientState, Phase};

/// Interpret one typed line against the current snapshot
pub fn parse_input(state: &ClientState, line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Nothing;
    }
    if let Some(command) = line.strip_prefix('/') {
        return parse_slash_command(command);
    }

    match state.phase() {
        Phase::SelectingTopic => parse_topic(line),
        Phase::SelectingSubtopic => parse_subtopic(&state.session.available_subtopics, line),
        Phase::SelectingLevel => parse_level(line),
        Phase::AwaitingQuestion => {
            Command::Invalid("Still waiting for the question. Type /next to start over".to_string())
        }
        Phase::Answering => Command::Answer(line.to_string()),
        Phase::Evaluated => Command::Invalid("Type /next to start the next round".to_string()),
    }
}

fn parse_slash_command(command: &str) -> Command {
    match command.trim().to_ascii_lowercase().as_str() {
        "next" => Command::NextRound,
        "reconnect" => Command::Reconnect,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("Unknown command /{other}. Type /help for help")),
    }
}

/// 1-based menu position, if the line is a number
fn menu_index(line: &str, len: usize) -> Option<Result<usize, Command>> {
    let n: usize = line.parse().ok()?;
    if (1..=len).contains(&n) {
        Some(Ok(n - 1))
    } else {
        Some(Err(Command::Invalid(format!("Choose 1-{len}"))))
    }
}

fn parse_topic(line: &str) -> Command {
    let topic = match menu_index(line, TOPICS.len()) {
        Some(Ok(i)) => Some(TOPICS[i]),
        Some(Err(invalid)) => return invalid,
        None => TOPICS.iter().copied().find(|topic| {
            topic.code.eq_ignore_ascii_case(line) || topic.name.eq_ignore_ascii_case(line)
        }),
    };
    match topic {
        Some(topic) => Command::SelectTopic(topic.code.to_string()),
        None => Command::Invalid(format!(
            "Choose 1-{} or type a topic name",
            TOPICS.len()
        )),
    }
}

fn parse_subtopic(available: &[String], line: &str) -> Command {
    // Before the list arrives the name is taken as typed
    if available.is_empty() {
        return Command::SelectSubtopic(line.to_string());
    }
    let subtopic = match menu_index(line, available.len()) {
        Some(Ok(i)) => available[i].clone(),
        Some(Err(invalid)) => return invalid,
        None => available
            .iter()
            .find(|name| name.eq_ignore_ascii_case(line))
            .cloned()
            .unwrap_or_else(|| line.to_string()),
    };
    Command::SelectSubtopic(subtopic)
}

fn parse_level(line: &str) -> Command {
    let level = match menu_index(line, Level::ALL.len()) {
        Some(Ok(i)) => Level::ALL[i],
        Some(Err(invalid)) => return invalid,
        None => match line.parse::<Level>() {
            Ok(level) => level,
            Err(e) => return Command::Invalid(e.to_string()),
        },
    };
    Command::SelectLevel(level)
}
