//! K9Crypt command line entry point.
//!
//! # Usage
//!
//! ```bash
//! k9crypt create lobby private hunter2 --lifetime month
//! k9crypt join <room-id> hunter2
//! k9crypt chat
//! ```

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use clap::Parser;
use k9crypt_app::ExitReason;
use k9crypt_client::ApiClient;
use k9crypt_store::{FileStorage, Storage, default_data_dir};
use k9crypt_tui::{Cli, CliCommand, CliError, Commands, Runtime, Settings, SystemEnv, TerminalDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "k9crypt.log";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "command failed");
            let _ = writeln!(io::stderr(), "Error: {error}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };
    init_logging(&cli, &data_dir)?;

    let storage = FileStorage::open(&data_dir, &SystemEnv::new())?;
    let settings = Settings::resolve(&storage.settings(), cli.api_url.as_deref())?;
    tracing::debug!(api_url = %settings.client.base_url, data_dir = %data_dir.display(), "configured");

    let commands = Commands::new(ApiClient::new(&settings.client)?, storage);
    let mut out = io::stdout();

    match cli.command {
        CliCommand::Create { room_name, kind, password, lifetime } => {
            commands.create(&mut out, &room_name, &kind, password, lifetime).await?;
        },
        CliCommand::Join { room_id, password } => {
            commands.join(&mut out, room_id, password.as_deref()).await?;
        },
        CliCommand::Leave { room_id } => {
            commands.leave(&mut out, room_id).await?;
        },
        CliCommand::List => {
            commands.list(&mut out).await?;
        },
        CliCommand::Send { message, room_id } => {
            commands.send(&mut out, &message, room_id).await?;
        },
        CliCommand::Chat { room_id } => chat(&commands, &settings, room_id, &mut out).await?,
    }
    Ok(())
}

async fn chat(
    commands: &Commands<FileStorage>,
    settings: &Settings,
    room_id: Option<String>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let room_id = commands.resolve_room(room_id)?;
    let storage = commands.storage();

    let driver = TerminalDriver::new()?;
    let runtime = Runtime::start(
        driver,
        SystemEnv::new(),
        commands.api().clone(),
        storage,
        room_id.clone(),
        settings.session.clone(),
    )?;

    let exit = runtime.run(shutdown_signal()).await?;

    if exit.left_room {
        storage.set_room_active(&room_id, false)?;
        writeln!(out, "Left room successfully!")?;
    } else if exit.reason == ExitReason::Quit {
        writeln!(out, "Chat closed; the room is still marked as joined.")?;
    }
    Ok(())
}

/// Resolves on Ctrl-C delivered as a signal or on SIGTERM.
///
/// In raw mode Ctrl-C arrives as a key event instead; the driver maps that
/// to an interrupt.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(error) => {
                tracing::warn!(%error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Chat owns the screen, so it logs to a file in the data directory.
/// Everything else logs to stderr.
fn init_logging(cli: &Cli, data_dir: &Path) -> Result<(), CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.command.is_interactive() {
        let path: PathBuf = data_dir.join(LOG_FILE);
        std::fs::create_dir_all(data_dir)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();
    }
    Ok(())
}
