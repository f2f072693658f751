//! Registry of kernel-exposed virtual input devices.
//!
//! Creating a uinput device does not report which kernel nodes it was
//! assigned, so the lifecycle manager takes a snapshot of the sysfs
//! virtual-input tree before and after creation and recovers the new
//! device's `(event node, input node)` pair from the difference.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::DeviceError;

/// One registry snapshot: event node name mapped to its parent input node.
pub type Snapshot = BTreeMap<String, String>;

/// Set difference between two snapshots, keyed by event node.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryDiff {
    /// `(event node, input node)` pairs present only in the new snapshot.
    pub created: Vec<(String, String)>,
    /// Pairs present only in the old snapshot.
    pub deleted: Vec<(String, String)>,
}

/// Source of registry snapshots.
///
/// The production implementation walks sysfs; tests substitute a scripted
/// fake to drive the creation invariants deterministically.
pub trait InputRegistry: Send {
    fn scan(&mut self) -> Result<Snapshot, DeviceError>;
}

/// Registry backed by `/sys/devices/virtual/input`.
#[derive(Debug, Clone)]
pub struct SysfsRegistry {
    root: PathBuf,
}

impl Default for SysfsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsRegistry {
    pub fn new() -> Self {
        Self::with_root("/sys/devices/virtual/input")
    }

    /// Registry rooted elsewhere, for configuration and test fixtures.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl InputRegistry for SysfsRegistry {
    /// Walk `input*/event*` under the root.
    ///
    /// Entries that vanish mid-scan (a device being torn down concurrently)
    /// are skipped rather than failing the scan.
    fn scan(&mut self) -> Result<Snapshot, DeviceError> {
        let mut snapshot = Snapshot::new();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(snapshot),
            Err(e) => return Err(DeviceError::Scan(e)),
        };

        for entry in entries.flatten() {
            let input_node = entry.file_name().to_string_lossy().into_owned();
            if !input_node.starts_with("input") {
                continue;
            }

            let Ok(children) = fs::read_dir(entry.path()) else {
                continue;
            };
            for child in children.flatten() {
                let event_node = child.file_name().to_string_lossy().into_owned();
                if event_node.starts_with("event") {
                    snapshot.insert(event_node, input_node.clone());
                }
            }
        }

        Ok(snapshot)
    }
}

/// Set-difference two snapshots by event node.
pub fn diff(old: &Snapshot, new: &Snapshot) -> RegistryDiff {
    let mut result = RegistryDiff::default();

    for (event, input) in new {
        if !old.contains_key(event) {
            result.created.push((event.clone(), input.clone()));
        }
    }
    for (event, input) in old {
        if !new.contains_key(event) {
            result.deleted.push((event.clone(), input.clone()));
        }
    }

    result
}
