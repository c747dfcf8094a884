//! Generic runtime for a chat session.
//!
//! The runtime is the only place where the session touches the outside
//! world. A single `select!` loop owns every piece of state and multiplexes:
//!
//! - the host's shutdown signal
//! - driver events (keys, resize, interrupt)
//! - the in-flight poll (fetch, then decrypt)
//! - the in-flight send
//! - the poll timer and the debounce timer
//!
//! State is only mutated between suspension points, so nothing needs a
//! lock. Poll and send requests run as boxed futures that own clones of
//! their inputs; their results re-enter the loop and are validated by the
//! [`SessionController`] before anything changes.

use std::{future::Future, pin::pin};

use futures::future::BoxFuture;
use k9crypt_client::{Ack, ChatService, ClientError};
use k9crypt_core::{Environment, MessagePage, RoomId, UserId};
use k9crypt_store::Storage;
use tokio::sync::mpsc;

use crate::{
    App, AppAction, AppEvent, Command, DecryptJob, DecryptedBatch, DecryptionPipeline, DisplayEvent,
    Driver, FetchOutcome, InputRouter, PollTicket, RefreshOutcome, Routed, RuntimeError,
    STATUS_REFRESHED, STATUS_REFRESHING, STATUS_SENDING, STATUS_SENT, SessionConfig,
    SessionController, SessionError, Status,
};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed `/quit`.
    Quit,
    /// Esc, Ctrl-C or the host's shutdown signal.
    Interrupted,
    /// The driver reported that input is closed.
    DriverClosed,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExit {
    /// What ended it.
    pub reason: ExitReason,
    /// Whether the leave call succeeded. The host marks the room inactive
    /// only when this is true.
    pub left_room: bool,
}

enum PollStep {
    Fetched(PollTicket, Result<MessagePage, ClientError>),
    Decrypted(DecryptedBatch),
}

/// Outstanding work and timers owned by the loop.
struct Schedule<I> {
    poll: Option<BoxFuture<'static, PollStep>>,
    send: Option<BoxFuture<'static, Result<Ack, ClientError>>>,
    poll_deadline: Option<I>,
}

/// Generic runtime that orchestrates the session, the view and the driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment providing time
/// - `S`: Remote service
pub struct Runtime<D, E, S>
where
    D: Driver,
    E: Environment,
    S: ChatService,
{
    driver: D,
    env: E,
    service: S,
    app: App,
    session: SessionController,
    router: InputRouter<E::Instant>,
    pipeline: DecryptionPipeline,
    config: SessionConfig,
    sender_id: UserId,
    subscribers: Vec<mpsc::UnboundedSender<DisplayEvent>>,
    dirty: bool,
}

impl<D, E, S> Runtime<D, E, S>
where
    D: Driver,
    E: Environment,
    S: ChatService,
{
    /// Verify membership of `room_id` and build the session.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] if `storage` has no active membership
    /// for the room, [`SessionError::Config`] if `config` is invalid.
    pub fn start(
        driver: D,
        env: E,
        service: S,
        storage: &impl Storage,
        room_id: RoomId,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let session = SessionController::start(room_id, storage, &config)?;
        let sender_id = storage.user_id();
        let app = App::new(session.room_id().clone(), sender_id.clone());

        Ok(Self {
            driver,
            env,
            service,
            app,
            session,
            router: InputRouter::new(config.debounce),
            pipeline: DecryptionPipeline::from_config(&config),
            config,
            sender_id,
            subscribers: Vec::new(),
            dirty: false,
        })
    }

    /// Ordered stream of everything the session displays.
    ///
    /// The stream ends when the runtime is dropped.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DisplayEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Current view.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Current session state.
    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Run the session until `/quit`, an interrupt, `shutdown` resolving,
    /// or the driver closing.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to read input or render.
    pub async fn run(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<SessionExit, RuntimeError<D::Error>> {
        tracing::info!(
            room_id = %self.session.room_id(),
            sender_id = %self.sender_id,
            "chat session started"
        );
        self.render()?;

        let mut shutdown = pin!(shutdown);
        let mut schedule =
            Schedule { poll: None, send: None, poll_deadline: self.deadline_after_poll() };

        let exit = loop {
            let poll_deadline = if schedule.poll.is_none() { schedule.poll_deadline } else { None };
            let debounce_deadline =
                if schedule.send.is_none() { self.router.deadline() } else { None };

            let exit = tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::info!("shutdown signal received");
                    Some(self.end(ExitReason::Interrupted, self.config.leave_on_interrupt).await)
                },
                event = self.driver.poll_event() => match event.map_err(RuntimeError::Driver)? {
                    Some(event) => self.handle_app_event(event, &mut schedule).await,
                    None => {
                        Some(self.end(ExitReason::DriverClosed, self.config.leave_on_interrupt).await)
                    },
                },
                step = next_output(&mut schedule.poll) => {
                    schedule.poll = None;
                    self.handle_poll_step(step, &mut schedule);
                    None
                },
                result = next_output(&mut schedule.send) => {
                    schedule.send = None;
                    self.handle_sent(result, &mut schedule);
                    None
                },
                () = sleep_until(&self.env, poll_deadline) => {
                    self.start_poll(&mut schedule);
                    None
                },
                () = sleep_until(&self.env, debounce_deadline) => {
                    self.flush_debounced(&mut schedule);
                    None
                },
            };

            if self.dirty {
                self.render()?;
            }
            if let Some(exit) = exit {
                break exit;
            }
        };

        self.driver.stop();
        tracing::info!(reason = ?exit.reason, left_room = exit.left_room, "chat session ended");
        Ok(exit)
    }

    async fn handle_app_event(
        &mut self,
        event: AppEvent,
        schedule: &mut Schedule<E::Instant>,
    ) -> Option<SessionExit> {
        for action in self.app.handle(event) {
            match action {
                AppAction::Render => self.dirty = true,
                AppAction::Submit(text) => {
                    if let Some(exit) = self.route(&text, schedule).await {
                        return Some(exit);
                    }
                },
                AppAction::Interrupt => {
                    return Some(self.end(ExitReason::Interrupted, self.config.leave_on_interrupt).await);
                },
            }
        }
        None
    }

    async fn route(&mut self, text: &str, schedule: &mut Schedule<E::Instant>) -> Option<SessionExit> {
        match self.router.submit(text, self.env.now()) {
            Routed::Ignored | Routed::Queued => None,
            Routed::Command(Command::Help) => {
                self.display(DisplayEvent::HelpShown);
                None
            },
            Routed::Command(Command::Refresh) => {
                self.refresh(schedule);
                None
            },
            Routed::Command(Command::Quit) => Some(self.end(ExitReason::Quit, true).await),
        }
    }

    fn refresh(&mut self, schedule: &mut Schedule<E::Instant>) {
        self.display(DisplayEvent::StatusChanged(Status::info(STATUS_REFRESHING)));
        self.display(DisplayEvent::HistoryCleared);

        match self.session.refresh() {
            RefreshOutcome::PollNow => schedule.poll_deadline = Some(self.env.now()),
            RefreshOutcome::Deferred => tracing::debug!("refresh waits for in-flight poll"),
            RefreshOutcome::Ignored => {},
        }
    }

    /// Leave if asked to, then terminate. Termination never depends on the
    /// leave succeeding.
    async fn end(&mut self, reason: ExitReason, leave: bool) -> SessionExit {
        if self.router.discard().is_some() {
            tracing::debug!("dropping unsent message");
        }

        let left_room = if leave { self.leave().await } else { false };
        self.session.terminate();
        SessionExit { reason, left_room }
    }

    async fn leave(&mut self) -> bool {
        let result = tokio::time::timeout(
            self.config.leave_timeout,
            self.service.leave_room(self.session.room_id(), &self.sender_id),
        )
        .await
        .unwrap_or(Err(ClientError::Timeout));

        match result {
            Ok(_) => {
                tracing::info!(room_id = %self.session.room_id(), "left room");
                true
            },
            Err(error) => {
                tracing::warn!(room_id = %self.session.room_id(), %error, "failed to leave room");
                let text = format!("Failed to leave room: {}", describe(&error));
                self.display(DisplayEvent::StatusChanged(Status::error(text)));
                false
            },
        }
    }

    fn start_poll(&mut self, schedule: &mut Schedule<E::Instant>) {
        schedule.poll_deadline = None;
        let Some(ticket) = self.session.begin_poll() else {
            return;
        };

        let service = self.service.clone();
        let timeout = self.config.request_timeout;
        schedule.poll = Some(Box::pin(async move {
            let result =
                tokio::time::timeout(timeout, service.fetch_messages(&ticket.room_id, ticket.cursor.as_ref()))
                    .await
                    .unwrap_or(Err(ClientError::Timeout));
            PollStep::Fetched(ticket, result)
        }));
    }

    fn decrypt_task(&self, job: DecryptJob) -> BoxFuture<'static, PollStep> {
        let service = self.service.clone();
        let pipeline = self.pipeline;

        Box::pin(async move {
            let DecryptJob { ticket, messages, last_id, seen } = job;
            let outcomes = pipeline.decrypt_batch(&service, messages, |id| seen.contains(id)).await;
            PollStep::Decrypted(DecryptedBatch { ticket, last_id, outcomes })
        })
    }

    fn handle_poll_step(&mut self, step: PollStep, schedule: &mut Schedule<E::Instant>) {
        match step {
            PollStep::Fetched(ticket, result) => {
                let refresh = ticket.is_refresh();
                match self.session.on_fetched(ticket, result) {
                    FetchOutcome::Decrypt(job) => {
                        tracing::trace!(count = job.messages.len(), "decrypting fetched messages");
                        schedule.poll = Some(self.decrypt_task(job));
                        return;
                    },
                    FetchOutcome::Empty => {
                        if refresh {
                            self.display(DisplayEvent::StatusChanged(Status::info(STATUS_REFRESHED)));
                        }
                    },
                    FetchOutcome::Failed(error) => {
                        tracing::warn!(%error, "poll failed");
                        self.display(DisplayEvent::StatusChanged(Status::error(poll_error_text(&error))));
                    },
                    FetchOutcome::Discarded => {},
                }
            },
            PollStep::Decrypted(batch) => {
                let refresh = batch.ticket.is_refresh();
                if let Some(report) = self.session.apply(batch) {
                    for message in report.appended {
                        self.display(DisplayEvent::MessageAppended(message));
                    }
                    for failure in report.failures {
                        tracing::warn!(message_id = %failure.message_id, error = %failure.source, "decrypt failed");
                        let text = format!("Decryption error: {}", describe(&failure.source));
                        self.display(DisplayEvent::StatusChanged(Status::error(text)));
                    }
                    if refresh {
                        self.display(DisplayEvent::StatusChanged(Status::info(STATUS_REFRESHED)));
                    }
                }
            },
        }

        schedule.poll_deadline = self.deadline_after_poll();
    }

    fn flush_debounced(&mut self, schedule: &mut Schedule<E::Instant>) {
        let Some(text) = self.router.take_due(self.env.now()) else {
            return;
        };
        self.display(DisplayEvent::StatusChanged(Status::info(STATUS_SENDING)));

        let service = self.service.clone();
        let room_id = self.session.room_id().clone();
        let sender_id = self.sender_id.clone();
        let timeout = self.config.request_timeout;
        schedule.send = Some(Box::pin(async move {
            tokio::time::timeout(timeout, service.send_message(&room_id, &sender_id, &text))
                .await
                .unwrap_or(Err(ClientError::Timeout))
        }));
    }

    fn handle_sent(&mut self, result: Result<Ack, ClientError>, schedule: &mut Schedule<E::Instant>) {
        match result {
            Ok(_) => {
                self.display(DisplayEvent::StatusChanged(Status::info(STATUS_SENT)));
                self.session.note_activity();
                let soon = self.env.now() + self.session.poll_interval();
                if let Some(deadline) = schedule.poll_deadline {
                    schedule.poll_deadline = Some(deadline.min(soon));
                }
            },
            Err(error) => {
                tracing::warn!(%error, "send failed");
                let text = format!("Failed to send message: {}", describe(&error));
                self.display(DisplayEvent::StatusChanged(Status::error(text)));
            },
        }
    }

    fn deadline_after_poll(&self) -> Option<E::Instant> {
        self.session.next_poll_delay().map(|delay| self.env.now() + delay)
    }

    fn display(&mut self, event: DisplayEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        self.app.apply_display(event);
        self.dirty = true;
    }

    fn render(&mut self) -> Result<(), RuntimeError<D::Error>> {
        self.dirty = false;
        self.driver.render(&self.app).map_err(RuntimeError::Driver)
    }
}

/// Output of an optional task; pending forever when there is none.
async fn next_output<T>(task: &mut Option<BoxFuture<'static, T>>) -> T {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// Sleep until `deadline`; pending forever when there is none.
async fn sleep_until<E: Environment>(env: &E, deadline: Option<E::Instant>) {
    match deadline {
        Some(deadline) => env.sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn describe(error: &ClientError) -> String {
    match error {
        ClientError::Server { status, message } => format!("Server error: {status} - {message}"),
        other => other.to_string(),
    }
}

fn poll_error_text(error: &ClientError) -> String {
    match error {
        ClientError::Server { .. } => describe(error),
        other => format!("Connection error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_errors_are_labelled_by_kind() {
        let server = ClientError::Server { status: 502, message: "bad gateway".into() };
        assert_eq!(poll_error_text(&server), "Server error: 502 - bad gateway");
        assert_eq!(
            poll_error_text(&ClientError::Transport("connection refused".into())),
            "Connection error: transport error: connection refused"
        );
    }
}
