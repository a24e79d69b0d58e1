//! Async driver for [`Session`]: owns the settle timer, the in-flight remote
//! call and the channel their completions come back on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use quickadd_core::{finalize_task, CaptureError, CaptureInput, LocalExtractor, Task, TaskExtractor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::state::{Command, Session, SessionEvent};

const NOT_CONFIGURED: &str = "AI parsing is not configured";

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct Orchestrator {
    session: Session,
    debouncer: Debouncer,
    remote: Option<Arc<dyn TaskExtractor>>,
    local: LocalExtractor,
    clock: Clock,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    in_flight: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(local: LocalExtractor, settle_window: Duration, use_ai: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(use_ai),
            debouncer: Debouncer::new(settle_window),
            remote: None,
            local,
            clock: Arc::new(|| Local::now().naive_local()),
            events_tx,
            events_rx,
            in_flight: None,
        }
    }

    /// Primary extractor for the AI path. Without one, AI parses fail over
    /// to the local extractor immediately.
    pub fn with_remote(mut self, remote: Arc<dyn TaskExtractor>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Reference time source for relative dates.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn input_changed(&mut self, text: impl Into<String>) {
        self.dispatch(SessionEvent::InputChanged(text.into()));
    }

    pub fn set_use_ai(&mut self, use_ai: bool) {
        self.dispatch(SessionEvent::AiToggled(use_ai));
    }

    pub fn clear(&mut self) {
        self.dispatch(SessionEvent::Cleared);
    }

    /// Wait for the next timer or extractor completion and apply it.
    /// Returns `false` without waiting when nothing is outstanding.
    pub async fn step(&mut self) -> bool {
        if !self.session.is_processing() {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Drive the session until the current input has a settled result (or
    /// the input is blank).
    pub async fn settle(&mut self) -> &Session {
        while self.step().await {}
        &self.session
    }

    /// Build the final [`Task`] for the current input.
    ///
    /// Uses the settled result when it matches the current input, otherwise
    /// parses locally on the spot.
    pub fn submit<Tz: TimeZone>(
        &self,
        overrides: CaptureInput,
        now: &DateTime<Tz>,
    ) -> Result<Task, CaptureError> {
        let input = CaptureInput {
            text: self.session.input().to_string(),
            ..overrides
        };
        let parsed = self
            .session
            .parsed()
            .filter(|_| self.session.is_settled());
        finalize_task(&input, parsed, &self.local, now)
    }

    /// Abort the settle timer and any in-flight remote call, then return the
    /// session to idle so nothing is left waiting on a dropped task.
    pub fn shutdown(&mut self) {
        self.abort_pending();
        self.dispatch(SessionEvent::Cleared);
    }

    fn abort_pending(&mut self) {
        self.debouncer.cancel();
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let session = std::mem::take(&mut self.session);
            let (session, command) = session.step(event);
            debug!(
                generation = session.generation(),
                phase = ?session.phase(),
                "session transition"
            );
            self.session = session;
            next = command.and_then(|command| self.execute(command));
        }
    }

    /// Run a command. Synchronous work hands its completion straight back.
    fn execute(&mut self, command: Command) -> Option<SessionEvent> {
        match command {
            Command::Schedule { generation } => {
                let tx = self.events_tx.clone();
                self.debouncer.schedule(async move {
                    let _ = tx.send(SessionEvent::SettleElapsed { generation });
                });
                None
            }
            Command::CancelPending => {
                self.abort_pending();
                None
            }
            Command::RunAi { generation, text } => {
                let Some(remote) = self.remote.clone() else {
                    warn!("AI parsing is not configured, using local parser");
                    return Some(SessionEvent::AiFailed {
                        generation,
                        error: NOT_CONFIGURED.to_string(),
                    });
                };
                let now = (self.clock)();
                let tx = self.events_tx.clone();
                // A superseded call keeps running; its generation no longer
                // matches so the result is dropped.
                self.in_flight = Some(tokio::spawn(async move {
                    let event = match remote.extract(&text, now).await {
                        Ok(task) => SessionEvent::AiSucceeded { generation, task },
                        Err(err) => {
                            warn!(kind = ?err.kind, error = %err, "AI parsing failed, using local parser");
                            SessionEvent::AiFailed {
                                generation,
                                error: err.to_string(),
                            }
                        }
                    };
                    let _ = tx.send(event);
                }));
                None
            }
            Command::RunLocal { generation, text } => {
                let task = self.local.parse(&text, (self.clock)());
                Some(SessionEvent::LocalParsed { generation, task })
            }
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session", &self.session)
            .field("settle_window", &self.debouncer.window())
            .field("has_remote", &self.remote.is_some())
            .finish()
    }
}
