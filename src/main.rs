//! # padcar
//!
//! Drive a Picon Zero RC car from a Linux gamepad.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use padcar::actuator::picon_zero::PiconZero;
use padcar::config::Config;
use padcar::control::control_loop::{ControlLoop, ControlSettings};
use padcar::controller::evdev_source::EvdevInputSource;
use padcar::logging;
use padcar::power::CommandPowerOff;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for padcar
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, else `config/default.toml` if
///      present, else built-in defaults)
///    - Set up logging
///    - Install the SIGINT/SIGTERM handler
///    - Open the Picon Zero board
///
/// 2. **Control Loop**
///    - List controllers and open the first one
///    - Configure the servo, motor and light channels
///    - Drive the car until the exit button, the shutdown gesture or a signal
///
/// 3. **Shutdown**
///    - Controller and board are released by the control loop
///    - Exit code 0 for every clean stop
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded
/// - No game controller is attached
/// - The I2C board cannot be opened or commanded
///
/// # Examples
///
/// ```bash
/// padcar /etc/padcar.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO padcar: padcar v0.1.0 starting...
/// INFO padcar::control::control_loop: Controller 0: Sony Interactive Entertainment DualSense Wireless Controller at /dev/input/event5 (vendor: 0x054c, product: 0x0ce6)
/// INFO padcar::control::control_loop: Ready
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = logging::init(&config.logging);

    info!("padcar v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut input = EvdevInputSource::new(&config.input);
    spawn_signal_handler(input.stop_token())?;

    let mut board = PiconZero::open(&config.board).context("Failed to open actuator board")?;
    let power = CommandPowerOff::new(&config.power)?;

    let mut control = ControlLoop::new(ControlSettings::from(&config));
    let reason = control.run(&mut input, &mut board, &power).await?;

    info!("Exiting ({:?})", reason);
    Ok(())
}

/// Loads the configuration from the command line path or the default file.
fn load_config() -> Result<Config> {
    if let Some(path) = std::env::args().nth(1) {
        return Config::load(&path).with_context(|| format!("Failed to load config from {}", path));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH));
    }

    Ok(Config::default())
}

/// Cancels `stop` on the first SIGINT or SIGTERM.
fn spawn_signal_handler(stop: CancellationToken) -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Received Ctrl+C, stopping..."),
                Err(e) => warn!("Ctrl+C handler failed, stopping: {}", e),
            },
            _ = terminate.recv() => info!("Received SIGTERM, stopping..."),
        }
        stop.cancel();
    });

    Ok(())
}
