//! # evdev Input Source
//!
//! Reads gamepads through the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! Every `event*` node under the configured device directory is opened and
//! kept if it reports gamepad buttons (`BTN_SOUTH`) or joystick buttons
//! (`BTN_TRIGGER`). Nodes that cannot be opened (usually permissions) are
//! skipped.
//!
//! ## Event Translation
//!
//! | evdev | Emitted |
//! |-------|---------|
//! | EV_KEY value 1 / 0 | `InputEvent::Button` pressed / released |
//! | EV_KEY value 2 (autorepeat) | nothing |
//! | EV_ABS | `InputEvent::Axis`, normalized to [-1, 1] with the axis' min/max |
//! | anything else | nothing |
//!
//! ## Hot-plug
//!
//! A read error on the open device is treated as an unplug and reported as
//! `DeviceChange::Removed`. While no device is open the directory is rescanned
//! every `reconnect_interval_ms` and the first gamepad found is opened and
//! reported as `DeviceChange::Added`.

use async_trait::async_trait;
use evdev::{Device, EventStream, InputEventKind, Key};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{ControllerId, ControllerInfo, DeviceChange, InputEvent};
use super::source::InputSource;
use crate::config::InputConfig;
use crate::error::{PadcarError, Result};
use crate::lifecycle::Release;

/// Axis range assumed when the device does not report one (8-bit sticks).
pub const DEFAULT_AXIS_MIN: i32 = 0;
/// Axis range assumed when the device does not report one (8-bit sticks).
pub const DEFAULT_AXIS_MAX: i32 = 255;

/// Key event value for autorepeat
const KEY_REPEAT: i32 = 2;

/// Reported min/max per absolute axis code.
#[derive(Debug, Clone, Default)]
pub struct AxisRanges {
    ranges: HashMap<u16, (i32, i32)>,
}

impl AxisRanges {
    /// Reads the ranges of every absolute axis the device supports.
    fn from_device(device: &Device) -> Self {
        let mut ranges = HashMap::new();

        let (Some(axes), Ok(state)) = (device.supported_absolute_axes(), device.get_abs_state())
        else {
            return Self { ranges };
        };

        for axis in axes.iter() {
            if let Some(info) = state.get(axis.0 as usize) {
                ranges.insert(axis.0, (info.minimum, info.maximum));
            }
        }

        Self { ranges }
    }

    /// Records the range of one axis.
    pub fn insert(&mut self, axis: u16, min: i32, max: i32) {
        self.ranges.insert(axis, (min, max));
    }

    /// Normalizes a raw axis value into `[-1.0, 1.0]`.
    #[must_use]
    pub fn normalize(&self, axis: u16, value: i32) -> f32 {
        let (min, max) = self
            .ranges
            .get(&axis)
            .copied()
            .unwrap_or((DEFAULT_AXIS_MIN, DEFAULT_AXIS_MAX));
        normalize_axis(value, min, max)
    }
}

/// Maps `value` in `min..=max` linearly onto `[-1.0, 1.0]`.
///
/// A degenerate range (max <= min) yields 0.0.
#[must_use]
pub fn normalize_axis(value: i32, min: i32, max: i32) -> f32 {
    if max <= min {
        return 0.0;
    }
    let span = (max as f64) - (min as f64);
    let offset = (value as f64) - (min as f64);
    ((2.0 * offset / span) - 1.0).clamp(-1.0, 1.0) as f32
}

/// Converts one raw evdev event into an [`InputEvent`].
///
/// Returns `None` for events the control loop has no use for.
#[must_use]
pub fn translate_event(
    controller: ControllerId,
    ranges: &AxisRanges,
    event: &evdev::InputEvent,
) -> Option<InputEvent> {
    let at = event
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    match event.kind() {
        InputEventKind::Key(key) => {
            if event.value() == KEY_REPEAT {
                return None;
            }
            Some(InputEvent::Button {
                controller,
                button: key.code(),
                pressed: event.value() != 0,
                at,
            })
        }
        InputEventKind::AbsAxis(axis) => Some(InputEvent::Axis {
            controller,
            axis: axis.0,
            value: ranges.normalize(axis.0, event.value()),
            at,
        }),
        _ => None,
    }
}

/// Whether an evdev device looks like a gamepad or joystick.
fn is_gamepad(device: &Device) -> bool {
    device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER))
}

fn controller_info(path: &Path, device: &Device) -> ControllerInfo {
    let id = device.input_id();
    ControllerInfo {
        name: device.name().unwrap_or("unknown controller").to_string(),
        path: path.to_string_lossy().to_string(),
        vendor: id.vendor(),
        product: id.product(),
    }
}

/// Scans `dir` for gamepads, sorted by device path.
///
/// # Errors
///
/// `Controller` if the directory cannot be read.
pub fn scan_controllers(dir: &Path) -> Result<Vec<ControllerInfo>> {
    if !dir.exists() {
        return Err(PadcarError::Controller(format!(
            "{} directory not found",
            dir.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| PadcarError::Controller(format!("Failed to read {}: {}", dir.display(), e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| PadcarError::Controller(format!("Failed to read directory entry: {}", e)))?;

    // Sort entries for deterministic device selection when multiple controllers are connected
    entries.sort_by_key(|entry| entry.path());

    let mut controllers = Vec::new();
    for entry in entries {
        let path = entry.path();

        let is_event_node = path
            .file_name()
            .map_or(false, |name| name.to_string_lossy().starts_with("event"));
        if !is_event_node {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let info = controller_info(&path, &device);
                debug!("Found input device: {}", info);
                if is_gamepad(&device) {
                    controllers.push(info);
                }
            }
            Err(e) => {
                // Permission denied or other errors - skip device
                debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    Ok(controllers)
}

/// The controller currently being read.
struct ActiveController {
    id: ControllerId,
    info: ControllerInfo,
    stream: EventStream,
    ranges: AxisRanges,
}

/// Input source backed by `/dev/input/event*` nodes.
pub struct EvdevInputSource {
    device_dir: PathBuf,
    reconnect_interval: Duration,
    discovered: Vec<ControllerInfo>,
    active: Option<ActiveController>,
    pending: VecDeque<InputEvent>,
    next_id: u32,
    stop: CancellationToken,
    released: bool,
}

impl std::fmt::Debug for EvdevInputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevInputSource")
            .field("device_dir", &self.device_dir)
            .field("active", &self.active.as_ref().map(|a| &a.info.path))
            .finish_non_exhaustive()
    }
}

impl EvdevInputSource {
    /// Creates a source reading from the configured device directory.
    #[must_use]
    pub fn new(config: &InputConfig) -> Self {
        Self {
            device_dir: PathBuf::from(&config.device_dir),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms),
            discovered: Vec::new(),
            active: None,
            pending: VecDeque::new(),
            next_id: 1,
            stop: CancellationToken::new(),
            released: false,
        }
    }

    /// Token that stops the source when cancelled.
    ///
    /// Hand this to a signal handler; cancelling it has the same effect as
    /// [`InputSource::request_stop`].
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Opens a controller node and queues its `Added` event.
    fn attach(&mut self, info: ControllerInfo) -> Result<()> {
        let device = Device::open(&info.path)
            .map_err(|e| PadcarError::Controller(format!("Failed to open {}: {}", info.path, e)))?;
        let ranges = AxisRanges::from_device(&device);
        let stream = device.into_event_stream().map_err(|e| {
            PadcarError::Controller(format!("Failed to start event stream for {}: {}", info.path, e))
        })?;

        let id = self.register(info.clone());
        self.active = Some(ActiveController { id, info, stream, ranges });
        Ok(())
    }

    /// Assigns the next controller id and queues the `Added` event.
    fn register(&mut self, info: ControllerInfo) -> ControllerId {
        let id = ControllerId(self.next_id);
        self.next_id += 1;

        info!("Opened controller {}: {}", id, info);
        self.pending.push_back(InputEvent::Device {
            controller: id,
            change: DeviceChange::Added(info),
        });
        id
    }

    /// Drops the active controller after a failed read.
    fn disconnect(&mut self, id: ControllerId, error: &std::io::Error) -> InputEvent {
        warn!("Controller {} disconnected: {}", id, error);
        self.active = None;
        InputEvent::Device {
            controller: id,
            change: DeviceChange::Removed,
        }
    }

    /// Looks for a gamepad after the active one went away.
    fn rescan(&mut self) {
        match scan_controllers(&self.device_dir) {
            Ok(found) => {
                if let Some(info) = found.first().cloned() {
                    if let Err(e) = self.attach(info) {
                        warn!("Controller reappeared but could not be opened: {}", e);
                    }
                }
                self.discovered = found;
            }
            Err(e) => debug!("Rescan failed: {}", e),
        }
    }
}

impl Release for EvdevInputSource {
    fn resource_name(&self) -> &'static str {
        "evdev input"
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.stop.cancel();
        if let Some(active) = self.active.take() {
            info!("Closed controller {} at {}", active.id, active.info.path);
        }
        self.pending.clear();
        Ok(())
    }
}

#[async_trait]
impl InputSource for EvdevInputSource {
    fn list_controllers(&mut self) -> Result<Vec<ControllerInfo>> {
        self.discovered = scan_controllers(&self.device_dir)?;
        Ok(self.discovered.clone())
    }

    fn open(&mut self, index: usize) -> Result<ControllerInfo> {
        if self.discovered.is_empty() {
            self.discovered = scan_controllers(&self.device_dir)?;
        }
        let info = self
            .discovered
            .get(index)
            .cloned()
            .ok_or(PadcarError::NoControllerAvailable)?;
        self.attach(info.clone())?;
        Ok(info)
    }

    async fn next_event(&mut self) -> Result<Option<InputEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.stop.is_cancelled() {
                return Ok(None);
            }

            match self.active.as_mut() {
                Some(active) => {
                    let read = tokio::select! {
                        biased;
                        _ = self.stop.cancelled() => return Ok(None),
                        read = active.stream.next_event() => read,
                    };

                    match read {
                        Ok(raw) => {
                            if let Some(event) = translate_event(active.id, &active.ranges, &raw) {
                                return Ok(Some(event));
                            }
                        }
                        Err(e) => {
                            let id = active.id;
                            return Ok(Some(self.disconnect(id, &e)));
                        }
                    }
                }
                None => {
                    tokio::select! {
                        biased;
                        _ = self.stop.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(self.reconnect_interval) => {}
                    }
                    self.rescan();
                }
            }
        }
    }

    fn request_stop(&self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::{AbsoluteAxisType, EventType};

    fn config_for(dir: &Path) -> InputConfig {
        InputConfig {
            device_dir: dir.to_string_lossy().to_string(),
            reconnect_interval_ms: 10,
        }
    }

    #[test]
    fn test_normalize_axis_endpoints() {
        assert_eq!(normalize_axis(0, 0, 255), -1.0);
        assert_eq!(normalize_axis(255, 0, 255), 1.0);
        assert!(normalize_axis(128, 0, 255).abs() < 0.01);
    }

    #[test]
    fn test_normalize_axis_signed_range() {
        assert_eq!(normalize_axis(-32768, -32768, 32767), -1.0);
        assert_eq!(normalize_axis(32767, -32768, 32767), 1.0);
        assert!(normalize_axis(0, -32768, 32767).abs() < 0.001);
    }

    #[test]
    fn test_normalize_axis_saturates_and_handles_bad_range() {
        assert_eq!(normalize_axis(300, 0, 255), 1.0);
        assert_eq!(normalize_axis(-5, 0, 255), -1.0);
        assert_eq!(normalize_axis(10, 5, 5), 0.0);
        assert_eq!(normalize_axis(10, 9, 1), 0.0);
    }

    #[test]
    fn test_axis_ranges_default_to_8_bit() {
        let mut ranges = AxisRanges::default();
        assert_eq!(ranges.normalize(AbsoluteAxisType::ABS_X.0, 255), 1.0);

        ranges.insert(AbsoluteAxisType::ABS_X.0, -100, 100);
        assert_eq!(ranges.normalize(AbsoluteAxisType::ABS_X.0, 100), 1.0);
        assert_eq!(ranges.normalize(AbsoluteAxisType::ABS_X.0, 0), 0.0);
    }

    #[test]
    fn test_translate_key_press_and_release() {
        let ranges = AxisRanges::default();
        let id = ControllerId(3);

        let press = evdev::InputEvent::new(EventType::KEY, Key::BTN_SOUTH.code(), 1);
        match translate_event(id, &ranges, &press) {
            Some(InputEvent::Button { controller, button, pressed, .. }) => {
                assert_eq!(controller, id);
                assert_eq!(button, Key::BTN_SOUTH.code());
                assert!(pressed);
            }
            other => panic!("Expected button event, got: {:?}", other),
        }

        let release = evdev::InputEvent::new(EventType::KEY, Key::BTN_SOUTH.code(), 0);
        assert!(matches!(
            translate_event(id, &ranges, &release),
            Some(InputEvent::Button { pressed: false, .. })
        ));
    }

    #[test]
    fn test_translate_ignores_autorepeat() {
        let event = evdev::InputEvent::new(EventType::KEY, Key::BTN_START.code(), KEY_REPEAT);
        assert_eq!(translate_event(ControllerId(1), &AxisRanges::default(), &event), None);
    }

    #[test]
    fn test_translate_axis_is_normalized() {
        let event = evdev::InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_RY.0, 0);
        match translate_event(ControllerId(1), &AxisRanges::default(), &event) {
            Some(InputEvent::Axis { axis, value, .. }) => {
                assert_eq!(axis, AbsoluteAxisType::ABS_RY.0);
                assert_eq!(value, -1.0);
            }
            other => panic!("Expected axis event, got: {:?}", other),
        }
    }

    #[test]
    fn test_translate_ignores_sync() {
        let event = evdev::InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(translate_event(ControllerId(1), &AxisRanges::default(), &event), None);
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = scan_controllers(Path::new("/nonexistent/input"));
        match result {
            Err(PadcarError::Controller(msg)) => assert!(msg.contains("/nonexistent/input")),
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }

    #[test]
    fn test_scan_skips_non_device_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("event0"), b"not a device").unwrap();
        std::fs::write(dir.path().join("mouse0"), b"").unwrap();

        let controllers = scan_controllers(dir.path()).unwrap();
        assert!(controllers.is_empty());
    }

    #[test]
    fn test_open_without_controllers() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = EvdevInputSource::new(&config_for(dir.path()));

        assert!(source.list_controllers().unwrap().is_empty());
        assert!(matches!(source.open(0), Err(PadcarError::NoControllerAvailable)));
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = EvdevInputSource::new(&config_for(dir.path()));

        let token = source.stop_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        });

        // Rescans the empty directory until the token fires
        let event = source.next_event().await.unwrap();
        assert_eq!(event, None);
    }

    #[test]
    fn test_release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = EvdevInputSource::new(&config_for(dir.path()));

        assert!(source.release().is_ok());
        assert!(source.release().is_ok());
        assert!(source.stop_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_reconnect_gets_fresh_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = EvdevInputSource::new(&config_for(dir.path()));
        let pad = ControllerInfo {
            name: "USB Gamepad".to_string(),
            path: "/dev/input/event7".to_string(),
            vendor: 0x0079,
            product: 0x0006,
        };

        let first = source.register(pad.clone());
        assert_eq!(
            source.next_event().await.unwrap(),
            Some(InputEvent::Device { controller: first, change: DeviceChange::Added(pad.clone()) })
        );

        let unplugged = std::io::Error::from_raw_os_error(19);
        assert_eq!(
            source.disconnect(first, &unplugged),
            InputEvent::Device { controller: first, change: DeviceChange::Removed }
        );
        assert!(source.active.is_none());

        let second = source.register(pad.clone());
        assert_ne!(second, first);
        assert_eq!(
            source.next_event().await.unwrap(),
            Some(InputEvent::Device { controller: second, change: DeviceChange::Added(pad) })
        );
    }

    fn virtual_pad() -> evdev::uinput::VirtualDevice {
        use evdev::uinput::VirtualDeviceBuilder;
        use evdev::{AbsInfo, AttributeSet, BusType, InputId, UinputAbsSetup};

        let keys = AttributeSet::from_iter([Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_START]);
        let stick = UinputAbsSetup::new(AbsoluteAxisType::ABS_X, AbsInfo::new(128, 0, 255, 0, 0, 0));

        VirtualDeviceBuilder::new()
            .unwrap()
            .name("padcar virtual pad")
            .input_id(InputId::new(BusType::BUS_USB, 0x0079, 0x0006, 1))
            .with_keys(&keys)
            .unwrap()
            .with_absolute_axis(&stick)
            .unwrap()
            .build()
            .unwrap()
    }

    fn node_of(pad: &mut evdev::uinput::VirtualDevice) -> String {
        // udev needs a moment to create the node
        std::thread::sleep(Duration::from_millis(200));
        let node = pad.enumerate_dev_nodes_blocking().unwrap().next().unwrap().unwrap();
        node.to_string_lossy().to_string()
    }

    // Needs write access to /dev/uinput and no other gamepad attached
    #[tokio::test]
    #[ignore]
    async fn test_hot_plug_with_virtual_pad() {
        let mut pad = virtual_pad();
        let path = node_of(&mut pad);

        let mut source = EvdevInputSource::new(&InputConfig {
            device_dir: "/dev/input".to_string(),
            reconnect_interval_ms: 50,
        });
        let index = source
            .list_controllers()
            .unwrap()
            .iter()
            .position(|info| info.path == path)
            .unwrap();
        source.open(index).unwrap();

        let first = match source.next_event().await.unwrap() {
            Some(InputEvent::Device { controller, change: DeviceChange::Added(_) }) => controller,
            other => panic!("Expected Added, got: {:?}", other),
        };

        drop(pad);
        assert_eq!(
            source.next_event().await.unwrap(),
            Some(InputEvent::Device { controller: first, change: DeviceChange::Removed })
        );

        let mut pad = virtual_pad();
        let _ = node_of(&mut pad);
        match source.next_event().await.unwrap() {
            Some(InputEvent::Device { controller, change: DeviceChange::Added(info) }) => {
                assert_ne!(controller, first);
                assert_eq!(info.vendor, 0x0079);
            }
            other => panic!("Expected Added, got: {:?}", other),
        }
    }

    // Integration test - only runs with real hardware
    #[tokio::test]
    #[ignore]
    async fn test_open_with_real_hardware() {
        let mut source = EvdevInputSource::new(&InputConfig::default());
        let controllers = source.list_controllers().unwrap();
        assert!(!controllers.is_empty(), "Should detect a connected gamepad");

        source.open(0).unwrap();
        let first = source.next_event().await.unwrap();
        assert!(matches!(
            first,
            Some(InputEvent::Device { change: DeviceChange::Added(_), .. })
        ));
    }
}
