//! Classification of submitted input lines.

/// Local chat commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the command list.
    Help,
    /// Drop local history and fetch the room from scratch.
    Refresh,
    /// Leave the room and end the session.
    Quit,
}

impl Command {
    /// Exact command spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Help => "/help",
            Self::Refresh => "/refresh",
            Self::Quit => "/quit",
        }
    }

    /// One-line description shown by `/help`.
    pub fn description(self) -> &'static str {
        match self {
            Self::Help => "Show this help message",
            Self::Refresh => "Refresh the chat",
            Self::Quit => "Leave the room and close chat",
        }
    }

    /// Every command, in help order.
    pub const ALL: [Self; 3] = [Self::Help, Self::Quit, Self::Refresh];
}

/// Footer of the help block.
pub const HELP_FOOTER: &str = "Info: This message is only visible to you.";

/// What a submitted line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank after trimming.
    Empty,
    /// A recognized command.
    Command(Command),
    /// Text to send, already trimmed.
    Message(String),
}

/// Classify a raw input line.
///
/// Commands must match exactly after trimming. Unknown `/words` are chat
/// messages.
pub fn classify(raw: &str) -> Submission {
    let text = raw.trim();
    if text.is_empty() {
        return Submission::Empty;
    }

    match Command::ALL.into_iter().find(|command| command.as_str() == text) {
        Some(command) => Submission::Command(command),
        None => Submission::Message(text.to_owned()),
    }
}
