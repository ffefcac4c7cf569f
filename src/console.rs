//! Line-oriented terminal front end
//!
//! Renders each committed snapshot and turns typed lines into intents.
//! The console never mutates session state itself; it only reads the
//! latest snapshot to interpret input.

mod input;
mod render;

pub use input::parse_input;
pub use render::render;

use crate::protocol::Level;
use crate::runtime::{SessionClosed, SessionHandle, SessionUpdate};
use crate::state_machine::ClientState;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// A topic the quiz service knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    /// Identifier sent on the wire
    pub code: &'static str,
    pub name: &'static str,
}

pub const TOPICS: [Topic; 2] = [
    Topic {
        code: "AI",
        name: "Artificial Intelligence",
    },
    Topic {
        code: "ML",
        name: "Machine Learning",
    },
];

/// Display name for a topic code
pub fn topic_name(code: &str) -> &str {
    TOPICS
        .iter()
        .find(|topic| topic.code == code)
        .map_or(code, |topic| topic.name)
}

pub const HELP: &str = "\
Type the number or name of a menu entry to choose it.
While a question is shown, type your answer and press Enter to submit it.
Commands:
  /next       start a new round
  /reconnect  reconnect after the connection was lost
  /help       show this help
  /quit       leave the quiz";

/// What a typed line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectTopic(String),
    SelectSubtopic(String),
    SelectLevel(Level),
    /// Replace the draft with this text and submit it
    Answer(String),
    NextRound,
    Reconnect,
    Help,
    Quit,
    /// Blank line
    Nothing,
    /// Input that does not fit the current screen
    Invalid(String),
}

/// Run the console until the user quits, input ends, or `shutdown` fires
pub async fn run<R, W>(
    input: R,
    mut output: W,
    handle: &SessionHandle,
    mut updates: broadcast::Receiver<SessionUpdate>,
    mut state: ClientState,
    shutdown: &CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut screen = render(&state);
    write_block(&mut output, &screen).await?;

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            update = updates.recv() => match update {
                Ok(SessionUpdate::Snapshot(snapshot)) => {
                    state = snapshot;
                    let next = render(&state);
                    // Draft edits do not change what is on screen
                    if next != screen {
                        screen = next;
                        write_block(&mut output, &screen).await?;
                    }
                }
                Ok(SessionUpdate::Rejected { reason, .. }) => {
                    write_block(&mut output, &format!("! {reason}")).await?;
                }
                // Logged by the runtime; the screen stays as it was
                Ok(SessionUpdate::ProtocolError(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Console fell behind on updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let delivered = match parse_input(&state, &line) {
                    Command::Quit => break,
                    Command::Nothing => Ok(()),
                    Command::Help => {
                        write_block(&mut output, HELP).await?;
                        Ok(())
                    }
                    Command::Invalid(message) => {
                        write_block(&mut output, &format!("! {message}")).await?;
                        Ok(())
                    }
                    intent => deliver(handle, intent).await,
                };
                if delivered.is_err() {
                    tracing::debug!("Session stopped, leaving console");
                    break;
                }
            }
        }
    }

    output.flush().await
}

/// Hand an intent to the session
async fn deliver(handle: &SessionHandle, command: Command) -> Result<(), SessionClosed> {
    match command {
        Command::SelectTopic(topic) => handle.select_topic(topic).await,
        Command::SelectSubtopic(subtopic) => handle.select_subtopic(subtopic).await,
        Command::SelectLevel(level) => handle.select_level(level).await,
        Command::Answer(text) => {
            handle.edit_draft(text).await?;
            handle.submit_answer().await
        }
        Command::NextRound => handle.next_round().await,
        Command::Reconnect => handle.reconnect().await,
        Command::Help | Command::Quit | Command::Nothing | Command::Invalid(_) => Ok(()),
    }
}

async fn write_block<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n\n").await?;
    output.flush().await
}
