//! Input event tap backed by evdev.
//!
//! Opens every readable input device and strokes the watchdog on any
//! key, relative or absolute event. Losing a device's event stream is
//! fatal to the tap; the daemon treats that as a watchdog failure.

use std::path::PathBuf;

use evdev::{Device, EventType};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::WatchdogError;
use crate::monitor::StrokeHandle;

/// List input devices worth watching.
fn enumerate_devices() -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    for (path, device) in evdev::enumerate() {
        let supported = device.supported_events();
        if !supported.contains(EventType::KEY)
            && !supported.contains(EventType::RELATIVE)
            && !supported.contains(EventType::ABSOLUTE)
        {
            continue;
        }
        let name = device.name().unwrap_or("unknown").to_string();
        out.push((path, name));
    }
    out
}

/// Watch all input devices and stroke `stroke` on activity.
///
/// Returns when shutdown is signalled, or with an error when no devices
/// exist or any device's stream is lost.
pub async fn run(
    stroke: StrokeHandle,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), WatchdogError> {
    let devices = enumerate_devices();
    if devices.is_empty() {
        return Err(WatchdogError::NoDevices);
    }

    let (err_tx, mut err_rx) = mpsc::channel::<std::io::Error>(8);
    let mut readers = Vec::new();

    for (path, name) in devices {
        info!(device = %name, path = %path.display(), "watching device");
        let stroke = stroke.clone();
        let err_tx = err_tx.clone();

        readers.push(tokio::spawn(async move {
            let device = match Device::open(&path) {
                Ok(d) => d,
                Err(e) => {
                    let _ = err_tx.send(e).await;
                    return;
                }
            };
            let mut stream = match device.into_event_stream() {
                Ok(s) => s,
                Err(e) => {
                    let _ = err_tx.send(e).await;
                    return;
                }
            };
            loop {
                match stream.next_event().await {
                    Ok(event) => {
                        if event.event_type() == EventType::SYNCHRONIZATION {
                            continue;
                        }
                        stroke.stroke();
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "device read error");
                        let _ = err_tx.send(e).await;
                        return;
                    }
                }
            }
        }));
    }
    drop(err_tx);

    let result = tokio::select! {
        Some(err) = err_rx.recv() => Err(WatchdogError::SourceLost(err)),
        _ = shutdown.changed() => {
            debug!("event tap shutting down");
            Ok(())
        }
    };

    for reader in readers {
        reader.abort();
    }
    result
}
