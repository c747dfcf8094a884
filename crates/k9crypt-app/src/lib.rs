//! Application layer for K9Crypt
//!
//! Pure state machines and a generic runtime for keeping a terminal chat view
//! in sync with a remote room, enabling deterministic simulation testing with
//! the same code that runs in production.
//!
//! # Components
//!
//! - [`SessionController`]: Poll scheduling, cursor, backoff and dedup state
//! - [`DecryptionPipeline`]: Bounded-concurrency decryption of a batch
//! - [`InputRouter`]: Command classification and send debouncing
//! - [`App`]: View state machine (history, status line, input buffer)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod command;
mod config;
mod driver;
mod error;
mod event;
mod input;
mod pipeline;
mod router;
mod runtime;
mod session;

pub use action::AppAction;
pub use app::{App, HistoryLine};
pub use command::{Command, HELP_FOOTER, Submission, classify};
pub use config::SessionConfig;
pub use driver::Driver;
pub use error::{DecryptError, RuntimeError, SessionError};
pub use event::{
    AppEvent, DisplayEvent, STATUS_REFRESHED, STATUS_REFRESHING, STATUS_SENDING, STATUS_SENT, Status,
    StatusLevel,
};
pub use input::{InputState, KeyInput};
pub use pipeline::{DecryptOutcome, DecryptionPipeline};
pub use router::{InputRouter, Routed};
pub use runtime::{ExitReason, Runtime, SessionExit};
pub use session::{
    ApplyReport, DecryptJob, DecryptedBatch, FetchOutcome, PollTicket, RefreshOutcome, SessionController,
    SessionPhase,
};
