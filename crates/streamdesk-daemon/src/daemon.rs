//! Long-running daemon entry points.

use std::sync::Arc;

use streamdesk_uinput::DeviceFleet;
use streamdesk_watchdog::{tap, Clock, MonotonicClock, Watchdog, WatchdogEvents};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::Config;
use crate::error::DaemonError;

/// Serve the virtual device fleet until shutdown.
pub async fn run_fleet(
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), DaemonError> {
    let mut fleet = DeviceFleet::new(config.fleet.to_fleet_config());
    fleet.start().await?;
    info!(
        mice = config.fleet.mice,
        joysticks = config.fleet.joysticks,
        "device fleet serving"
    );

    loop {
        if shutdown.changed().await.is_err() || *shutdown.borrow() {
            break;
        }
    }

    fleet.shutdown().await;
    info!("device fleet stopped");
    Ok(())
}

/// Watchdog callbacks that run configured shell commands.
struct ShellEvents {
    on_idle: String,
    on_timeout: String,
}

impl ShellEvents {
    fn run(command: &str) {
        match std::process::Command::new("sh").arg("-c").arg(command).spawn() {
            Ok(_) => info!(command, "ran watchdog command"),
            Err(e) => error!(command, error = %e, "failed to run watchdog command"),
        }
    }
}

impl WatchdogEvents for ShellEvents {
    fn on_idle(&self) {
        Self::run(&self.on_idle);
    }

    fn on_timeout(&self) {
        Self::run(&self.on_timeout);
    }
}

/// Run the activity watchdog and its evdev event tap until expiry or
/// shutdown. A lost event source ends the watchdog with an error.
pub async fn run_watchdog(
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), DaemonError> {
    let events = Arc::new(ShellEvents {
        on_idle: config.watchdog.on_idle.clone(),
        on_timeout: config.watchdog.on_timeout.clone(),
    });
    let watchdog = Watchdog::new(
        config.watchdog.idle,
        config.watchdog.timeout_secs(),
        Arc::new(MonotonicClock) as Arc<dyn Clock>,
        events as Arc<dyn WatchdogEvents>,
    );
    let stroke = watchdog.stroke_handle();

    let (inner_tx, inner_rx) = watch::channel(false);
    let monitor_task = tokio::spawn(watchdog.run(inner_rx.clone()));
    let tap_task = tokio::spawn(tap::run(stroke, inner_rx));

    let result = tokio::select! {
        res = monitor_task => {
            res.map_err(|e| DaemonError::Other(e.into()))?
                .map_err(DaemonError::from)
        }
        res = tap_task => {
            res.map_err(|e| DaemonError::Other(e.into()))?
                .map_err(DaemonError::from)
        }
        _ = shutdown.changed() => Ok(()),
    };

    let _ = inner_tx.send(true);
    result
}
