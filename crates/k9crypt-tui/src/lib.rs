//! Terminal client for K9Crypt
//!
//! A thin shell over [`k9crypt_app`]: command line parsing, layered
//! configuration, one-shot room commands, and a [`k9crypt_app::Driver`] that
//! provides terminal-specific I/O. All session logic lives in the generic
//! [`k9crypt_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod system_env;
pub mod terminal;
pub mod ui;

pub use cli::{Cli, CliCommand};
pub use commands::Commands;
pub use config::Settings;
pub use error::{CliError, NO_ROOM};
pub use k9crypt_app::{App, AppAction, AppEvent, Driver, KeyInput, Runtime};
pub use system_env::SystemEnv;
pub use terminal::{TerminalDriver, TerminalError};
