//! Virtual device lifecycle: create, resolve kernel identity, find the
//! `/dev` node.
//!
//! A device moves through `Uncreated → Created → Resolved → Serving →
//! Disconnected`. This module covers the first half; serving lives in
//! [`crate::server`] and teardown happens when the server task drops the
//! handle.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use evdev::uinput::VirtualDevice;
use evdev::{AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, InputId, KeyCode, RelativeAxisCode, UinputAbsSetup};
use streamdesk_types::{codes, AbsRange, DeviceSpec, KernelIdentity};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::DeviceError;
use crate::registry::{diff, InputRegistry, RegistryDiff};

/// A created uinput device with its resolved kernel identity.
pub struct CreatedDevice {
    pub spec: DeviceSpec,
    pub identity: KernelIdentity,
    pub handle: VirtualDevice,
}

/// Create a uinput device and recover its kernel identity.
///
/// Snapshots the registry before and after the OS call; the diff must
/// yield exactly one new node pair or the construction is aborted with
/// nothing registered. Callers creating several devices against one
/// registry must serialize their calls so each diff sees a clean
/// before/after pair.
pub fn create_device(
    spec: &DeviceSpec,
    registry: &mut dyn InputRegistry,
) -> Result<CreatedDevice, DeviceError> {
    let before = registry.scan()?;
    let handle = build_device(spec)?;
    let after = registry.scan()?;

    let identity = resolve_identity(&diff(&before, &after))?;
    debug!(
        name = %spec.name,
        event = %identity.event_node,
        input = %identity.input_node,
        "created uinput device"
    );

    Ok(CreatedDevice {
        spec: spec.clone(),
        identity,
        handle,
    })
}

/// Extract the single created pair from a post-creation diff.
pub fn resolve_identity(diff: &RegistryDiff) -> Result<KernelIdentity, DeviceError> {
    match diff.created.as_slice() {
        [(event_node, input_node)] => Ok(KernelIdentity {
            event_node: event_node.clone(),
            input_node: input_node.clone(),
        }),
        other => Err(DeviceError::AmbiguousCreation(other.len())),
    }
}

/// Build a uinput device from a spec without tracking its kernel
/// identity. Used directly for throwaway devices that never get a
/// fan-out socket, like a session-local gamepad.
pub fn build_device(spec: &DeviceSpec) -> Result<VirtualDevice, DeviceError> {
    let mut builder = VirtualDevice::builder()
        .map_err(DeviceError::Create)?
        .name(&spec.name)
        .input_id(InputId::new(
            BusType::BUS_USB,
            spec.vendor,
            spec.product,
            spec.version,
        ));

    let mut keys = AttributeSet::<KeyCode>::new();
    let mut rel = AttributeSet::<RelativeAxisCode>::new();
    let mut has_keys = false;
    let mut has_rel = false;

    for cap in &spec.capabilities {
        match cap.event_type {
            codes::EV_KEY => {
                keys.insert(KeyCode(cap.code));
                has_keys = true;
            }
            codes::EV_REL => {
                rel.insert(RelativeAxisCode(cap.code));
                has_rel = true;
            }
            codes::EV_ABS => {
                let range = cap.range.unwrap_or(AbsRange::new(i32::MIN, i32::MAX));
                let setup = UinputAbsSetup::new(
                    AbsoluteAxisCode(cap.code),
                    AbsInfo::new(0, range.min, range.max, range.fuzz, range.flat, 0),
                );
                builder = builder
                    .with_absolute_axis(&setup)
                    .map_err(DeviceError::Create)?;
            }
            other => {
                warn!(event_type = other, code = cap.code, "skipping unsupported capability");
            }
        }
    }

    if has_keys {
        builder = builder.with_keys(&keys).map_err(DeviceError::Create)?;
    }
    if has_rel {
        builder = builder
            .with_relative_axes(&rel)
            .map_err(DeviceError::Create)?;
    }

    builder.build().map_err(DeviceError::Create)
}

/// Wait for the device's `/dev` node to appear.
///
/// Polls the sysfs input directory for a matching device name and a child
/// node with the kind's prefix. The interval is bounded but the attempt
/// count is not; the wait ends early only when `shutdown` fires, so fleet
/// teardown can interrupt an in-progress wait.
pub async fn wait_for_devnode(
    sysfs_root: &Path,
    dev_root: &Path,
    spec: &DeviceSpec,
    identity: &KernelIdentity,
    poll: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<PathBuf, DeviceError> {
    loop {
        if let Some(path) = find_devnode(sysfs_root, dev_root, spec, identity) {
            return Ok(path);
        }

        tokio::select! {
            () = tokio::time::sleep(poll) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Err(DeviceError::Cancelled);
                }
            }
        }
    }
}

fn find_devnode(
    sysfs_root: &Path,
    dev_root: &Path,
    spec: &DeviceSpec,
    identity: &KernelIdentity,
) -> Option<PathBuf> {
    let input_dir = sysfs_root.join(&identity.input_node);

    let name = fs::read_to_string(input_dir.join("name")).ok()?;
    if name.trim_end() != spec.name {
        return None;
    }

    let prefix = spec.kind.node_prefix();
    for entry in fs::read_dir(&input_dir).ok()?.flatten() {
        let node = entry.file_name().to_string_lossy().into_owned();
        if node.starts_with(prefix) {
            return Some(dev_root.join(node));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamdesk_types::DeviceKind;

    fn pair(event: &str, input: &str) -> (String, String) {
        (event.to_string(), input.to_string())
    }

    #[test]
    fn resolve_identity_requires_exactly_one_created() {
        let one = RegistryDiff {
            created: vec![pair("event7", "input12")],
            deleted: vec![],
        };
        let identity = resolve_identity(&one).unwrap();
        assert_eq!(identity.event_node, "event7");
        assert_eq!(identity.input_node, "input12");

        let none = RegistryDiff::default();
        assert!(matches!(
            resolve_identity(&none),
            Err(DeviceError::AmbiguousCreation(0))
        ));

        let two = RegistryDiff {
            created: vec![pair("event7", "input12"), pair("event8", "input13")],
            deleted: vec![],
        };
        assert!(matches!(
            resolve_identity(&two),
            Err(DeviceError::AmbiguousCreation(2))
        ));
    }

    #[tokio::test]
    async fn devnode_wait_resolves_once_sysfs_is_populated() {
        let sysfs = tempfile::tempdir().unwrap();
        let spec = DeviceSpec::pointer("Virtual Input Mouse");
        let identity = KernelIdentity {
            event_node: "event4".to_string(),
            input_node: "input9".to_string(),
        };

        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        // Not there yet.
        assert!(find_devnode(sysfs.path(), Path::new("/dev/input"), &spec, &identity).is_none());

        // Wrong name does not match.
        let input_dir = sysfs.path().join("input9");
        std::fs::create_dir_all(input_dir.join("event4")).unwrap();
        std::fs::write(input_dir.join("name"), "Some Other Device\n").unwrap();
        assert!(find_devnode(sysfs.path(), Path::new("/dev/input"), &spec, &identity).is_none());

        std::fs::write(input_dir.join("name"), "Virtual Input Mouse\n").unwrap();
        let path = wait_for_devnode(
            sysfs.path(),
            Path::new("/dev/input"),
            &spec,
            &identity,
            Duration::from_millis(1),
            &mut shutdown_rx,
        )
        .await
        .unwrap();
        assert_eq!(path, PathBuf::from("/dev/input/event4"));
    }

    #[tokio::test]
    async fn devnode_wait_is_cancelled_by_shutdown() {
        let sysfs = tempfile::tempdir().unwrap();
        let spec = DeviceSpec::pointer("Virtual Input Mouse");
        let identity = KernelIdentity {
            event_node: "event4".to_string(),
            input_node: "input9".to_string(),
        };

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let result = wait_for_devnode(
            sysfs.path(),
            Path::new("/dev/input"),
            &spec,
            &identity,
            Duration::from_secs(60),
            &mut shutdown_rx,
        )
        .await;
        assert!(matches!(result, Err(DeviceError::Cancelled)));
    }

    #[test]
    fn gamepad_resolves_js_node() {
        let sysfs = tempfile::tempdir().unwrap();
        let spec = DeviceSpec::gamepad("Microsoft X-Box 360 pad");
        assert_eq!(spec.kind, DeviceKind::Gamepad);
        let identity = KernelIdentity {
            event_node: "event6".to_string(),
            input_node: "input11".to_string(),
        };

        let input_dir = sysfs.path().join("input11");
        std::fs::create_dir_all(input_dir.join("js0")).unwrap();
        std::fs::write(input_dir.join("name"), "Microsoft X-Box 360 pad\n").unwrap();

        let path = find_devnode(sysfs.path(), Path::new("/dev/input"), &spec, &identity).unwrap();
        assert_eq!(path, PathBuf::from("/dev/input/js0"));
    }
}
