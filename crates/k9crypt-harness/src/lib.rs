//! Deterministic simulation harness for the k9crypt session engine.
//!
//! Simulated implementations of the Environment, `ChatService` and Driver
//! seams so the production [`k9crypt_app::Runtime`] runs unchanged under the
//! paused tokio clock, with reproducible timing and scripted faults.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for every
//! session invariant.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod scenario;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_service;

pub use invariants::{
    BoundedDecryptConcurrency, CommandsNeverSent, Invariant, InvariantRegistry, InvariantResult,
    MessagesInServerOrder, NoDuplicateMessages, SessionSnapshot, SinglePollInFlight, Violation,
};
pub use scenario::{LOCAL_USER, Outcome, Scenario, SimRuntime};
pub use sim_driver::{Frame, SimDriver, SimDriverError, SimHandle};
pub use sim_env::SimEnv;
pub use sim_service::{CIPHER_PREFIX, FetchRecord, SentMessage, SimService, encrypt};
