//! Scripted sessions.
//!
//! A [`Scenario`] wires a [`Runtime`] to the simulated service, driver and
//! environment, runs a test script next to it on the paused tokio clock, and
//! collects everything observable into an [`Outcome`].
//!
//! When the script returns, the session receives the host shutdown signal,
//! so every scenario terminates even if the script never types `/quit`.

use std::future::Future;

use k9crypt_app::{
    DisplayEvent, Runtime, RuntimeError, SessionConfig, SessionError, SessionExit, Status,
};
use k9crypt_core::RoomId;
use k9crypt_store::MemoryStorage;
use tokio::sync::{mpsc, oneshot};

use crate::{SessionSnapshot, SimDriver, SimDriverError, SimEnv, SimHandle, SimService};

/// Local user of every scenario.
pub const LOCAL_USER: &str = "me";

/// Runtime type used by the harness.
pub type SimRuntime = Runtime<SimDriver, SimEnv, SimService>;

/// Fixture for one simulated chat session.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Room the session runs in.
    pub room_id: RoomId,
    /// Simulated service; keep a clone to script and inspect it.
    pub service: SimService,
    /// Local store, already joined to `room_id`.
    pub storage: MemoryStorage,
    /// Seeded environment.
    pub env: SimEnv,
    /// Session tuning.
    pub config: SessionConfig,
}

/// Everything a finished scenario produced.
#[derive(Debug)]
pub struct Outcome {
    /// How the run ended.
    pub exit: Result<SessionExit, RuntimeError<SimDriverError>>,
    /// Display events in emission order.
    pub events: Vec<DisplayEvent>,
    /// Driver handle, for captured frames.
    pub handle: SimHandle,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Joined room `room-1`, default tuning, seed 0.
    pub fn new() -> Self {
        let room_id = RoomId::from("room-1");
        Self {
            storage: MemoryStorage::joined(LOCAL_USER, room_id.clone()),
            room_id,
            service: SimService::new(),
            env: SimEnv::default(),
            config: SessionConfig::default(),
        }
    }

    /// Start a runtime without running it.
    ///
    /// # Errors
    ///
    /// Whatever [`Runtime::start`] rejects.
    pub fn start(
        &self,
    ) -> Result<(SimRuntime, SimHandle, mpsc::UnboundedReceiver<DisplayEvent>), SessionError> {
        let (driver, handle) = SimDriver::new();
        let mut runtime = Runtime::start(
            driver,
            self.env.clone(),
            self.service.clone(),
            &self.storage,
            self.room_id.clone(),
            self.config.clone(),
        )?;
        let events = runtime.subscribe();
        Ok((runtime, handle, events))
    }

    /// Run the session alongside `script`.
    ///
    /// # Errors
    ///
    /// Whatever [`Runtime::start`] rejects.
    pub async fn run<F, Fut>(&self, script: F) -> Result<Outcome, SessionError>
    where
        F: FnOnce(SimHandle) -> Fut,
        Fut: Future<Output = ()>,
    {
        let (runtime, handle, mut events) = self.start()?;
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let shutdown = async move {
            let _ = done_rx.await;
        };
        let script = {
            let handle = handle.clone();
            async move {
                script(handle).await;
                let _ = done_tx.send(());
            }
        };

        let (exit, ()) = tokio::join!(runtime.run(shutdown), script);

        let mut collected = Vec::new();
        while let Ok(event) = events.try_recv() {
            collected.push(event);
        }
        Ok(Outcome { exit, events: collected, handle })
    }

    /// Snapshot of `outcome` for invariant checks.
    pub fn snapshot(&self, outcome: &Outcome) -> SessionSnapshot {
        SessionSnapshot::capture(&outcome.events, &self.service, &self.room_id, &self.config)
    }
}

impl Outcome {
    /// Plaintexts of the current history, oldest first.
    pub fn texts(&self) -> Vec<String> {
        let start = self
            .events
            .iter()
            .rposition(|event| matches!(event, DisplayEvent::HistoryCleared))
            .map_or(0, |index| index + 1);

        self.events[start..]
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::MessageAppended(message) => Some(message.plaintext.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every status shown, in order.
    pub fn statuses(&self) -> Vec<Status> {
        self.events
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::StatusChanged(status) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of every status shown, in order.
    pub fn status_texts(&self) -> Vec<String> {
        self.statuses().into_iter().map(|status| status.text).collect()
    }

    /// Number of messages appended over the whole run.
    pub fn appended_count(&self) -> usize {
        self.events.iter().filter(|event| matches!(event, DisplayEvent::MessageAppended(_))).count()
    }
}
