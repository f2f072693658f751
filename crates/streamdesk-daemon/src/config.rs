//! Daemon configuration loaded from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use streamdesk_types::ClipboardPolicy;
use streamdesk_uinput::FleetConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub fleet: FleetSection,
    #[serde(default)]
    pub watchdog: WatchdogSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Virtual device fleet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSection {
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,
    #[serde(default = "default_device_count")]
    pub mice: usize,
    #[serde(default = "default_mouse_name")]
    pub mouse_name: String,
    #[serde(default = "default_mice_ready_file")]
    pub mice_ready_file: PathBuf,
    #[serde(default = "default_device_count")]
    pub joysticks: usize,
    #[serde(default = "default_joystick_name")]
    pub joystick_name: String,
    #[serde(default = "default_js_ready_file")]
    pub js_ready_file: PathBuf,
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    #[serde(default = "default_dev_root")]
    pub dev_root: PathBuf,
    #[serde(default = "default_devnode_poll_ms")]
    pub devnode_poll_ms: u64,
}

impl Default for FleetSection {
    fn default() -> Self {
        Self {
            socket_dir: default_socket_dir(),
            mice: default_device_count(),
            mouse_name: default_mouse_name(),
            mice_ready_file: default_mice_ready_file(),
            joysticks: default_device_count(),
            joystick_name: default_joystick_name(),
            js_ready_file: default_js_ready_file(),
            sysfs_root: default_sysfs_root(),
            dev_root: default_dev_root(),
            devnode_poll_ms: default_devnode_poll_ms(),
        }
    }
}

impl FleetSection {
    /// Translate into the fleet crate's configuration.
    pub fn to_fleet_config(&self) -> FleetConfig {
        FleetConfig {
            socket_dir: self.socket_dir.clone(),
            num_mice: self.mice,
            mouse_name: self.mouse_name.clone(),
            mice_ready_file: self.mice_ready_file.clone(),
            num_joysticks: self.joysticks,
            joystick_name: self.joystick_name.clone(),
            js_ready_file: self.js_ready_file.clone(),
            sysfs_root: self.sysfs_root.clone(),
            dev_root: self.dev_root.clone(),
            devnode_poll: Duration::from_millis(self.devnode_poll_ms),
        }
    }
}

/// Activity watchdog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogSection {
    /// Seconds until idle detection.
    #[serde(default = "default_idle")]
    pub idle: u64,
    /// Seconds until expiry. `-1` disables expiry entirely.
    #[serde(default = "default_timeout")]
    pub timeout: i64,
    /// Shell command run when the session goes idle.
    #[serde(default = "default_on_idle")]
    pub on_idle: String,
    /// Shell command run when the watchdog expires.
    #[serde(default = "default_on_timeout")]
    pub on_timeout: String,
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            idle: default_idle(),
            timeout: default_timeout(),
            on_idle: default_on_idle(),
            on_timeout: default_on_timeout(),
        }
    }
}

impl WatchdogSection {
    /// Expiry threshold, `None` when disabled.
    pub fn timeout_secs(&self) -> Option<u64> {
        u64::try_from(self.timeout).ok()
    }
}

/// Client session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// Clipboard flag: `"true"`, `"out"`, `"in"` or anything else for off.
    #[serde(default = "default_clipboard")]
    pub clipboard: String,
    /// Fan-out socket of the virtual mouse to proxy relative input to.
    #[serde(default)]
    pub mouse_socket: Option<PathBuf>,
    /// Fan-out socket of the virtual joystick.
    #[serde(default)]
    pub joystick_socket: Option<PathBuf>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            clipboard: default_clipboard(),
            mouse_socket: None,
            joystick_socket: None,
        }
    }
}

impl SessionSection {
    pub fn clipboard_policy(&self) -> ClipboardPolicy {
        ClipboardPolicy::from_flag(&self.clipboard)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/tmp/.uinput")
}

fn default_device_count() -> usize {
    16
}

fn default_mouse_name() -> String {
    "Virtual Input Mouse".to_string()
}

fn default_mice_ready_file() -> PathBuf {
    PathBuf::from("/tmp/.uinput/mouse_devices_ready")
}

fn default_joystick_name() -> String {
    "Microsoft X-Box 360 pad".to_string()
}

fn default_js_ready_file() -> PathBuf {
    PathBuf::from("/tmp/.uinput/js_devices_ready")
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/devices/virtual/input")
}

fn default_dev_root() -> PathBuf {
    PathBuf::from("/dev/input")
}

fn default_devnode_poll_ms() -> u64 {
    100
}

fn default_idle() -> u64 {
    10
}

fn default_timeout() -> i64 {
    3600
}

fn default_on_idle() -> String {
    ":".to_string()
}

fn default_on_timeout() -> String {
    "echo \"handling watchdog timeout\"".to_string()
}

fn default_clipboard() -> String {
    "false".to_string()
}
