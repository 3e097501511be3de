//! # Pad Bridge
//!
//! Drive a remote device with a gamepad, or push control scripts to it.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse the command line and load the TOML configuration
//!    - Set up logging (stderr, plus an optional daily log file)
//!    - Open the controller source (bridge) or the script store (console)
//!
//! 2. **Main Loop**
//!    - A stdin reader turns operator lines into session commands
//!    - The session streams controller state and routes remote messages
//!
//! 3. **Graceful Shutdown**
//!    - `quit`, end of input or Ctrl+C closes the connection without reconnecting
//!
//! # Examples
//!
//! ```bash
//! pad-bridge --config pad-bridge.toml bridge --enable "Nintendo Switch Pro Controller (Vendor: 057e Product: 2009)"
//! pad-bridge console
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use pad_bridge::config::Config;
use pad_bridge::console::{ConsoleInput, JsonFileScriptStore, ScriptConsole, ScriptStore};
use pad_bridge::error::PadBridgeError;
use pad_bridge::input::{ControllerSource, EvdevSource, NoControllers};
use pad_bridge::notify::{ConsoleNotifier, SharedNotifier, TracingNotifier};
use pad_bridge::protocol::Severity;
use pad_bridge::session::{Role, Session, SessionCommand};

/// Configuration file read when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "pad-bridge.toml";

#[derive(Debug, Parser)]
#[command(name = "pad-bridge", version, about = "Gamepad to remote device bridge")]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Stream controller state to the remote
    Bridge {
        /// Enable a controller by device id (repeatable)
        #[arg(short, long = "enable", value_name = "ID")]
        enable: Vec<String>,
    },
    /// Interactive script console
    Console,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    let _log_guard = init_logging(&config)?;

    info!("Pad Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Remote endpoint: {}", config.connection.url());

    match cli.mode {
        Mode::Bridge { enable } => {
            config.sampler.enabled_devices.extend(enable);
            run_bridge(config).await
        }
        Mode::Console => run_console(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

fn init_logging(config: &Config) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging level")?;

    let (file_layer, guard) = match &config.logging.file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let prefix = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::daily(directory, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run_bridge(config: Config) -> Result<()> {
    let notifier: SharedNotifier = Arc::new(TracingNotifier);
    let session = Session::new(&config, Role::Bridge, notifier);

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_bridge_line(&line) {
                Ok(Some(command)) => {
                    let quit = command == SessionCommand::Shutdown;
                    if tx.send(command).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
    });

    match EvdevSource::open() {
        Ok(source) => {
            info!("Found {} input devices", source.device_count());
            run_session(session, source, rx).await
        }
        Err(e) => {
            warn!("Controller input unavailable: {}", e);
            run_session(session, NoControllers, rx).await
        }
    }
}

async fn run_console(config: Config) -> Result<()> {
    let notifier: SharedNotifier = Arc::new(ConsoleNotifier::stdout());
    let store = JsonFileScriptStore::open(&config.console.scripts_path).with_context(|| {
        format!(
            "Failed to open script store {}",
            config.console.scripts_path.display()
        )
    })?;
    let mut console = ScriptConsole::new(store, notifier.clone());
    let session = Session::new(&config, Role::Console, notifier);

    // the editor reads and writes script files synchronously, so it gets its
    // own thread instead of a runtime worker
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || console_loop(std::io::stdin().lock(), &mut console, &tx))
        .context("Failed to start console input thread")?;

    run_session(session, NoControllers, rx).await
}

/// Feed operator lines to the script console until `quit` or end of input.
fn console_loop<R: BufRead, S: ScriptStore>(
    input: R,
    console: &mut ScriptConsole<S>,
    tx: &mpsc::UnboundedSender<SessionCommand>,
) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let input = match line.parse::<ConsoleInput>() {
            Ok(input) => input,
            Err(e) => {
                console.notifier().message(Severity::Error, &e.to_string());
                continue;
            }
        };
        if input == ConsoleInput::Quit {
            let _ = tx.send(SessionCommand::Shutdown);
            return;
        }
        if let Some(command) = console.execute(input) {
            if tx.send(SessionCommand::Send(command)).is_err() {
                return;
            }
        }
    }
    let _ = tx.send(SessionCommand::Shutdown);
}

async fn run_session<S: ControllerSource>(
    session: Session,
    source: S,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
) -> Result<()> {
    let stats = session.run(source, commands).await?;
    info!("Session ended after {} frames", stats.frames);
    Ok(())
}

/// Parse one operator line for the bridge. Blank lines are `None`.
fn parse_bridge_line(line: &str) -> std::result::Result<Option<SessionCommand>, PadBridgeError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let device = || {
        if rest.is_empty() {
            Err(PadBridgeError::Validation(format!("'{}' needs a device id", word)))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word {
        "" => return Ok(None),
        "enable" => SessionCommand::Enable(device()?),
        "disable" => SessionCommand::Disable(device()?),
        "devices" => SessionCommand::Devices,
        "quit" | "exit" => SessionCommand::Shutdown,
        other => {
            return Err(PadBridgeError::Validation(format!(
                "Unknown command '{}', expected enable, disable, devices or quit",
                other
            )))
        }
    };
    Ok(Some(command))
}
