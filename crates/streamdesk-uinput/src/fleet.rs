//! Fleet orchestration: batch creation, readiness markers, teardown.
//!
//! Brings up all mice, then all joysticks, serializing registry access so
//! each creation diffs against a clean snapshot pair. Serving is fully
//! concurrent afterward — one independent task per device.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use streamdesk_types::{DeviceSpec, KernelIdentity};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::device::{self, CreatedDevice};
use crate::error::DeviceError;
use crate::registry::SysfsRegistry;
use crate::server::FanoutServer;

/// Fleet configuration.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Directory where per-device sockets are created.
    pub socket_dir: PathBuf,
    pub num_mice: usize,
    pub mouse_name: String,
    /// Marker written after every mouse reaches the serving state.
    pub mice_ready_file: PathBuf,
    pub num_joysticks: usize,
    pub joystick_name: String,
    /// Marker written after every joystick reaches the serving state.
    pub js_ready_file: PathBuf,
    pub sysfs_root: PathBuf,
    pub dev_root: PathBuf,
    /// Interval of the device-node discovery poll.
    pub devnode_poll: Duration,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from("/tmp/.uinput"),
            num_mice: 16,
            mouse_name: "Virtual Input Mouse".to_string(),
            mice_ready_file: PathBuf::from("/tmp/.uinput/mouse_devices_ready"),
            num_joysticks: 16,
            joystick_name: "Microsoft X-Box 360 pad".to_string(),
            js_ready_file: PathBuf::from("/tmp/.uinput/js_devices_ready"),
            sysfs_root: PathBuf::from("/sys/devices/virtual/input"),
            dev_root: PathBuf::from("/dev/input"),
            devnode_poll: Duration::from_millis(100),
        }
    }
}

/// A device that reached the serving state.
pub struct ServingDevice {
    pub spec: DeviceSpec,
    pub identity: KernelIdentity,
    pub device_path: PathBuf,
    pub socket_path: PathBuf,
    task: JoinHandle<Result<(), DeviceError>>,
}

/// The fleet of serving virtual devices.
pub struct DeviceFleet {
    config: FleetConfig,
    registry: SysfsRegistry,
    devices: Vec<ServingDevice>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DeviceFleet {
    pub fn new(config: FleetConfig) -> Self {
        let registry = SysfsRegistry::with_root(&config.sysfs_root);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            registry,
            devices: Vec::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Create and serve the whole fleet: all mice, symlinks, mice ready
    /// marker; then all joysticks and the joystick marker.
    ///
    /// A failure part-way tears down every device created so far before
    /// returning — no partially-created device is left behind.
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        fs::create_dir_all(&self.config.socket_dir).map_err(|e| DeviceError::Io {
            path: self.config.socket_dir.clone(),
            source: e,
        })?;
        cleanup(&self.config)?;

        info!(
            count = self.config.num_mice,
            socket_dir = %self.config.socket_dir.display(),
            "creating virtual mice"
        );
        let mut mouse_paths = Vec::with_capacity(self.config.num_mice);
        for _ in 0..self.config.num_mice {
            let spec = DeviceSpec::pointer(&self.config.mouse_name);
            let device = self.checked_bring_up(spec).await?;
            mouse_paths.push(device.device_path.clone());
            self.devices.push(device);
        }

        if let Err(e) = install_mouse_symlinks(&self.config.dev_root, &mouse_paths) {
            self.shutdown().await;
            return Err(e);
        }
        self.mark_ready(self.config.mice_ready_file.clone()).await?;
        info!(count = self.config.num_mice, "mouse devices ready");

        info!(
            count = self.config.num_joysticks,
            socket_dir = %self.config.socket_dir.display(),
            "creating virtual joysticks"
        );
        for _ in 0..self.config.num_joysticks {
            let spec = DeviceSpec::gamepad(&self.config.joystick_name);
            let device = self.checked_bring_up(spec).await?;
            self.devices.push(device);
        }
        self.mark_ready(self.config.js_ready_file.clone()).await?;
        info!(count = self.config.num_joysticks, "joystick devices ready");

        Ok(())
    }

    /// The devices currently serving.
    pub fn devices(&self) -> &[ServingDevice] {
        &self.devices
    }

    /// Stop every server and release all devices. Idempotent.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);

        for device in self.devices.drain(..) {
            match device.task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(device = %device.spec.name, error = %e, "device server exited with error");
                }
                Err(e) => {
                    warn!(device = %device.spec.name, error = %e, "device server task panicked");
                }
            }
        }

        if let Err(e) = cleanup(&self.config) {
            warn!(error = %e, "fleet cleanup failed");
        }
    }

    /// Bring up one device, tearing the fleet down on failure.
    async fn checked_bring_up(&mut self, spec: DeviceSpec) -> Result<ServingDevice, DeviceError> {
        match self.bring_up(spec).await {
            Ok(device) => Ok(device),
            Err(e) => {
                self.shutdown().await;
                Err(e)
            }
        }
    }

    async fn bring_up(&mut self, spec: DeviceSpec) -> Result<ServingDevice, DeviceError> {
        let CreatedDevice {
            spec,
            identity,
            handle,
        } = device::create_device(&spec, &mut self.registry)?;

        let mut shutdown = self.shutdown_rx.clone();
        let device_path = device::wait_for_devnode(
            &self.config.sysfs_root,
            &self.config.dev_root,
            &spec,
            &identity,
            self.config.devnode_poll,
            &mut shutdown,
        )
        .await?;

        let socket_path = self.config.socket_dir.join(&identity.event_node);
        let server = FanoutServer::bind(&socket_path, Box::new(handle))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(server.run(ready_tx, self.shutdown_rx.clone()));
        ready_rx.await.map_err(|_| DeviceError::Cancelled)?;

        info!(
            device = %spec.name,
            event = %identity.event_node,
            path = %device_path.display(),
            socket = %socket_path.display(),
            "virtual device serving"
        );

        Ok(ServingDevice {
            spec,
            identity,
            device_path,
            socket_path,
            task,
        })
    }

    async fn mark_ready(&mut self, path: PathBuf) -> Result<(), DeviceError> {
        if let Err(e) = fs::write(&path, b"") {
            let error = DeviceError::Io { path, source: e };
            self.shutdown().await;
            return Err(error);
        }
        Ok(())
    }
}

/// Remove ready markers and stale device sockets.
///
/// Run before a fleet starts and after it shuts down; missing files are
/// not errors.
pub fn cleanup(config: &FleetConfig) -> Result<(), DeviceError> {
    for marker in [&config.mice_ready_file, &config.js_ready_file] {
        if let Err(e) = fs::remove_file(marker) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(DeviceError::Io {
                    path: marker.clone(),
                    source: e,
                });
            }
        }
    }

    let entries = match fs::read_dir(&config.socket_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(DeviceError::Io {
                path: config.socket_dir.clone(),
                source: e,
            })
        }
    };
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with("event") {
            let _ = fs::remove_file(entry.path());
        }
    }

    Ok(())
}

/// Install stable `mouseN` symlinks to the resolved device paths.
///
/// Links are created under a temporary name and renamed into place, so an
/// external consumer sees either the old link or the fully-formed new one,
/// never a half-written entry.
pub fn install_mouse_symlinks(dev_root: &Path, device_paths: &[PathBuf]) -> Result<(), DeviceError> {
    if device_paths.is_empty() {
        return Ok(());
    }

    let staging = dev_root.join(format!(".mouse-links.{}", std::process::id()));
    fs::create_dir_all(&staging).map_err(|e| DeviceError::Io {
        path: staging.clone(),
        source: e,
    })?;

    for (i, target) in device_paths.iter().enumerate() {
        let link = dev_root.join(format!("mouse{i}"));
        let tmp = staging.join(format!("mouse{i}"));

        let _ = fs::remove_file(&tmp);
        std::os::unix::fs::symlink(target, &tmp).map_err(|e| DeviceError::Symlink {
            link: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &link).map_err(|e| DeviceError::Symlink {
            link: link.clone(),
            source: e,
        })?;
    }

    let _ = fs::remove_dir(&staging);
    Ok(())
}
