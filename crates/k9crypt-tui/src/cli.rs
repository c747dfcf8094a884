//! Command line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use k9crypt_client::RoomLifetime;

/// K9Crypt terminal client
#[derive(Parser, Debug)]
#[command(name = "k9crypt")]
#[command(about = "Encrypted chat rooms from the terminal: create, join, send and chat")]
#[command(version)]
pub struct Cli {
    /// Service base URL (overrides the stored `apiUrl` setting)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory holding user.json, rooms.json and settings.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// What to do
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Create a new room
    Create {
        /// Display name of the room
        room_name: String,
        /// `public`, anything else creates a private room
        #[arg(value_name = "TYPE")]
        kind: String,
        /// Password for private rooms
        password: Option<String>,
        /// Room lifetime (day, month, year, permanent)
        #[arg(short, long, default_value_t = RoomLifetime::Day)]
        lifetime: RoomLifetime,
    },

    /// Join an existing room
    Join {
        /// Room to join; defaults to the active room
        room_id: Option<String>,
        /// Room password
        password: Option<String>,
    },

    /// Leave a room
    Leave {
        /// Room to leave; defaults to the active room
        room_id: Option<String>,
    },

    /// List available rooms
    List,

    /// Send a message to a room
    Send {
        /// Message text
        message: String,
        /// Target room; defaults to the active room
        room_id: Option<String>,
    },

    /// Start interactive chat in a room
    Chat {
        /// Room to chat in; defaults to the active room
        room_id: Option<String>,
    },
}

impl CliCommand {
    /// Whether the command takes over the terminal.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Chat { .. })
    }
}
