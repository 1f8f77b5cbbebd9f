//! Single-task event loop that owns a [`Session`]
//!
//! Every mutation of session state happens on this one task. Network calls
//! and hand-off timers run as spawned tasks and report back over channels,
//! so completions are applied strictly one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{OutboundRequest, PendingHandoff, Session, SessionState};
use crate::client::ConversationClient;
use crate::conversation::ReplyEnvelope;
use crate::voice::RecognitionUpdate;
use crate::{Error, Result};

/// Commands the UI layer can send to a running session
enum Command {
    Submit(String),
    Reset(oneshot::Sender<Result<()>>),
    ToggleMute,
    SetMuted(bool),
    ToggleListening,
    Snapshot(oneshot::Sender<SessionState>),
    Shutdown,
}

/// Outcome of one backend request
struct Completion {
    cycle: u64,
    outcome: Result<ReplyEnvelope>,
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// Submit typed text
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the session loop has stopped
    pub fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::Submit(text.into()))
    }

    /// Start a fresh conversation
    ///
    /// # Errors
    ///
    /// Returns `Error::ResetWhilePending` if a request is in flight, or
    /// `Error::SessionClosed` if the session loop has stopped
    pub async fn reset(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Reset(tx))?;
        rx.await.map_err(|_| Error::SessionClosed)?
    }

    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the session loop has stopped
    pub fn toggle_mute(&self) -> Result<()> {
        self.send(Command::ToggleMute)
    }

    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the session loop has stopped
    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.send(Command::SetMuted(muted))
    }

    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the session loop has stopped
    pub fn toggle_listening(&self) -> Result<()> {
        self.send(Command::ToggleListening)
    }

    /// Copy of the current session state
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the session loop has stopped
    pub async fn snapshot(&self) -> Result<SessionState> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Stop the session loop, releasing speech devices
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the session loop has already stopped
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::SessionClosed)
    }
}

/// Drives a session from UI commands, device events and network results
pub struct SessionRunner {
    session: Session,
    recognition: mpsc::UnboundedReceiver<RecognitionUpdate>,
    client: Arc<dyn ConversationClient>,
    request_timeout: Duration,
    handoff_delay: Duration,
}

impl SessionRunner {
    #[must_use]
    pub fn new(
        session: Session,
        recognition: mpsc::UnboundedReceiver<RecognitionUpdate>,
        client: Arc<dyn ConversationClient>,
        request_timeout: Duration,
        handoff_delay: Duration,
    ) -> Self {
        Self {
            session,
            recognition,
            client,
            request_timeout,
            handoff_delay,
        }
    }

    /// Spawn the event loop on the current runtime
    #[must_use]
    pub fn spawn(self) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (SessionHandle { commands: tx }, task)
    }

    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let Self {
            mut session,
            mut recognition,
            client,
            request_timeout,
            handoff_delay,
        } = self;

        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Completion>();
        let (handoff_tx, mut handoff_rx) = mpsc::unbounded_channel::<PendingHandoff>();

        let dispatch = |request: OutboundRequest| {
            spawn_request(
                Arc::clone(&client),
                request,
                request_timeout,
                completion_tx.clone(),
            );
        };

        tracing::debug!("session loop started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Submit(text)) => {
                            if let Some(request) = session.submit(&text) {
                                dispatch(request);
                            }
                        }
                        Some(Command::Reset(reply)) => {
                            let _ = reply.send(session.reset());
                        }
                        Some(Command::ToggleMute) => {
                            session.toggle_mute();
                        }
                        Some(Command::SetMuted(muted)) => session.set_muted(muted),
                        Some(Command::ToggleListening) => session.toggle_listening(),
                        Some(Command::Snapshot(reply)) => {
                            let _ = reply.send(session.state().clone());
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }
                Some(update) = recognition.recv() => {
                    if let Some(request) = session.on_recognition(update) {
                        dispatch(request);
                    }
                }
                Some(done) = completion_rx.recv() => {
                    if let Some(handoff) = session.settle(done.cycle, done.outcome) {
                        schedule_handoff(handoff, handoff_delay, handoff_tx.clone());
                    }
                }
                Some(handoff) = handoff_rx.recv() => {
                    session.deliver_handoff(handoff);
                }
            }
        }

        tracing::debug!("session loop stopped");
    }
}

/// Send one chat turn in the background, bounded by `timeout`
fn spawn_request(
    client: Arc<dyn ConversationClient>,
    request: OutboundRequest,
    timeout: Duration,
    done: mpsc::UnboundedSender<Completion>,
) {
    tokio::spawn(async move {
        let OutboundRequest {
            cycle,
            message,
            history,
        } = request;

        let outcome = match tokio::time::timeout(timeout, client.send(&message, &history)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(cycle, ?timeout, "chat request timed out");
                Err(Error::Timeout(timeout))
            }
        };

        // Loop may have shut down while the request was in flight
        let _ = done.send(Completion { cycle, outcome });
    });
}

/// Deliver `handoff` back to the loop once the presentation delay has passed
fn schedule_handoff(
    handoff: PendingHandoff,
    delay: Duration,
    ready: mpsc::UnboundedSender<PendingHandoff>,
) {
    tracing::debug!(cycle = handoff.cycle(), ?delay, "plan hand-off scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = ready.send(handoff);
    });
}
