//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as `TerminalDriver` but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`k9crypt_app::Runtime`] orchestration code runs in both production and
//! simulation. Events are injected through a [`SimHandle`]; every render is
//! captured as a [`Frame`].

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use k9crypt_app::{App, AppEvent, Driver, HistoryLine, KeyInput, Status};
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for simulation driver.
#[derive(Debug, Clone, Error)]
#[error("SimDriverError: {0}")]
pub struct SimDriverError(pub String);

/// What the screen showed after one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// History lines, oldest first.
    pub history: Vec<HistoryLine>,
    /// Status line.
    pub status: Option<Status>,
    /// Input buffer.
    pub input: String,
}

impl Frame {
    fn capture(app: &App) -> Self {
        Self {
            history: app.history().to_vec(),
            status: app.status().cloned(),
            input: app.input().as_str().to_owned(),
        }
    }

    /// Plaintexts of displayed messages, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.history
            .iter()
            .filter_map(|line| match line {
                HistoryLine::Message(message) => Some(message.plaintext.clone()),
                HistoryLine::Help => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Captured {
    frames: Vec<Frame>,
    fail_renders: Option<String>,
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    events: mpsc::UnboundedReceiver<AppEvent>,
    captured: Arc<Mutex<Captured>>,
    stopped: Arc<AtomicBool>,
}

/// Test-side handle of a [`SimDriver`].
///
/// Dropping every handle closes the driver's input, which ends the session
/// like a closed terminal would.
#[derive(Debug, Clone)]
pub struct SimHandle {
    events: mpsc::UnboundedSender<AppEvent>,
    captured: Arc<Mutex<Captured>>,
    stopped: Arc<AtomicBool>,
}

impl SimDriver {
    /// Create a driver and its handle.
    pub fn new() -> (Self, SimHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let captured = Arc::new(Mutex::new(Captured::default()));
        let stopped = Arc::new(AtomicBool::new(false));

        let driver =
            Self { events: rx, captured: Arc::clone(&captured), stopped: Arc::clone(&stopped) };
        (driver, SimHandle { events: tx, captured, stopped })
    }
}

fn lock(captured: &Mutex<Captured>) -> MutexGuard<'_, Captured> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimHandle {
    /// Inject an event. Ignored once the driver is gone.
    pub fn inject(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("event injected after the driver was dropped");
        }
    }

    /// Press one key.
    pub fn key(&self, key: KeyInput) {
        self.inject(AppEvent::Key(key));
    }

    /// Type `text` and press Enter.
    pub fn submit(&self, text: &str) {
        for c in text.chars() {
            self.key(KeyInput::Char(c));
        }
        self.key(KeyInput::Enter);
    }

    /// Ctrl-C.
    pub fn interrupt(&self) {
        self.inject(AppEvent::Interrupt);
    }

    /// Make every later render fail with `reason`.
    pub fn fail_renders(&self, reason: &str) {
        lock(&self.captured).fail_renders = Some(reason.to_owned());
    }

    /// Every captured frame, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        lock(&self.captured).frames.clone()
    }

    /// The most recent frame.
    pub fn last_frame(&self) -> Option<Frame> {
        lock(&self.captured).frames.last().cloned()
    }

    /// Whether the runtime released the driver.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.events.recv().await)
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let mut captured = lock(&self.captured);
        if let Some(reason) = &captured.fail_renders {
            return Err(SimDriverError(reason.clone()));
        }
        captured.frames.push(Frame::capture(app));
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
