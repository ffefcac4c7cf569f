//! Session runtime executor

use super::{SessionHandle, SessionUpdate, UPDATE_CAPACITY};
use crate::channel::{Channel, ChannelError};
use crate::protocol::OutboundMessage;
use crate::state_machine::{transition, Awaiting, ClientState, Effect, Event};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Runtime that owns one session and the channel it talks over
pub struct SessionRuntime<C: Channel> {
    session_id: Uuid,
    state: ClientState,
    channel: C,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    /// Bounded wait for service replies; `None` waits forever
    response_timeout: Option<Duration>,
    /// Token to cancel the running response timer
    timer_cancel_token: Option<CancellationToken>,
    /// Bumped whenever a timer is armed or cancelled
    timer_generation: u64,
    /// Epoch of the connection the session is bound to
    link_epoch: u64,
}

impl<C: Channel> SessionRuntime<C> {
    pub fn new(
        channel: C,
        event_tx: mpsc::Sender<Event>,
        event_rx: mpsc::Receiver<Event>,
        response_timeout: Option<Duration>,
    ) -> Self {
        let (broadcast_tx, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            session_id: Uuid::new_v4(),
            state: ClientState::connecting(),
            channel,
            event_rx,
            event_tx,
            broadcast_tx,
            response_timeout,
            timer_cancel_token: None,
            timer_generation: 0,
            link_epoch: 0,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.event_tx.clone(), self.broadcast_tx.clone())
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Establish the channel and enter the topic selection screen
    pub async fn connect(&mut self) -> Result<(), ChannelError> {
        self.channel.open().await?;
        self.link_epoch = self.channel.epoch();
        self.process_event(Event::ChannelOpened).await;
        Ok(())
    }

    /// Process events until `shutdown` fires, then release the channel
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(session_id = %self.session_id, "Starting session runtime");

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => self.process_event(event).await,

                else => break,
            }
        }

        self.cancel_timer();
        self.channel.close().await;
        tracing::info!(session_id = %self.session_id, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) {
        // Effects may feed follow-up events; handle them, in order, before
        // the next queued one
        let mut events_to_process = VecDeque::from([event]);

        while let Some(current_event) = events_to_process.pop_front() {
            let current_event = match current_event {
                Event::OnLink { epoch, event } if epoch == self.link_epoch => *event,
                Event::OnLink { epoch, event } => {
                    tracing::debug!(
                        epoch,
                        current = self.link_epoch,
                        event = event.name(),
                        "Dropping event from a previous connection"
                    );
                    continue;
                }
                other => other,
            };

            if let Event::ResponseTimeout { generation, .. } = &current_event {
                if *generation != self.timer_generation {
                    tracing::debug!(generation, "Dropping stale response timeout");
                    continue;
                }
            }

            let name = current_event.name();
            if current_event.is_intent() {
                tracing::info!(
                    session_id = %self.session_id,
                    intent = name,
                    phase = %self.state.phase(),
                    "User intent"
                );
            } else {
                tracing::debug!(
                    session_id = %self.session_id,
                    event = name,
                    phase = %self.state.phase(),
                    "Handling event"
                );
            }

            let result = match transition(&self.state, current_event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::info!(intent = name, reason = %e, "Intent rejected");
                    let _ = self.broadcast_tx.send(SessionUpdate::Rejected {
                        intent: name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // Transmit before committing: a failed send leaves the old state in place
            if let Some(message) = result.outbound() {
                if let Err(e) = self.send(message).await {
                    let _ = self.broadcast_tx.send(SessionUpdate::Rejected {
                        intent: name,
                        reason: e.to_string(),
                    });
                    if !matches!(e, ChannelError::Encode(_)) {
                        events_to_process.push_back(Event::ChannelErrored {
                            message: e.to_string(),
                        });
                    }
                    continue;
                }
            }

            self.state = result.new_state;
            debug_assert!(
                self.state.session.is_consistent(),
                "inconsistent session after {name}: {:?}",
                self.state.session
            );

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push_back(generated_event);
                }
            }
        }
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<(), ChannelError> {
        self.channel.send(message).await.inspect_err(|e| {
            tracing::warn!(kind = message.kind(), error = %e, "Failed to send message");
        })
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            // Already transmitted before the state was committed
            Effect::Send(_) => None,

            Effect::ArmTimeout { awaiting } => {
                self.arm_timer(awaiting);
                None
            }

            Effect::CancelTimeout => {
                self.cancel_timer();
                None
            }

            Effect::OpenChannel => match self.channel.open().await {
                Ok(()) => {
                    self.link_epoch = self.channel.epoch();
                    Some(Event::ChannelOpened)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reconnect failed");
                    Some(Event::ChannelErrored {
                        message: e.to_string(),
                    })
                }
            },

            Effect::PublishSnapshot => {
                let _ = self
                    .broadcast_tx
                    .send(SessionUpdate::Snapshot(self.state.clone()));
                None
            }

            Effect::ReportProtocolError(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    phase = %self.state.phase(),
                    error = %error,
                    "Dropped inbound frame"
                );
                let _ = self.broadcast_tx.send(SessionUpdate::ProtocolError(error));
                None
            }

            Effect::Discard { reason } => {
                tracing::debug!(phase = %self.state.phase(), reason = %reason, "Event discarded");
                None
            }
        }
    }

    fn arm_timer(&mut self, awaiting: Awaiting) {
        self.cancel_timer();
        let Some(timeout) = self.response_timeout else {
            return;
        };

        let cancel_token = CancellationToken::new();
        self.timer_cancel_token = Some(cancel_token.clone());
        let generation = self.timer_generation;
        let event_tx = self.event_tx.clone();
        tracing::debug!(%awaiting, generation, ?timeout, "Arming response timer");

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {}

                () = tokio::time::sleep(timeout) => {
                    let _ = event_tx
                        .send(Event::ResponseTimeout { awaiting, generation })
                        .await;
                }
            }
        });
    }

    fn cancel_timer(&mut self) {
        self.timer_generation += 1;
        if let Some(token) = self.timer_cancel_token.take() {
            token.cancel();
        }
    }
}
