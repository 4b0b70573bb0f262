//! # Input Events
//!
//! Device-agnostic events delivered by an [`InputSource`](super::source::InputSource).
//!
//! Button and axis events carry the device's raw code; the
//! [`ControllerProfile`](super::profile::ControllerProfile) of the active
//! controller turns that code into a logical role. Axis values are already
//! normalized to `[-1.0, 1.0]` by the source.
//!
//! Timestamps are a [`Duration`] since the source's clock epoch. Only the
//! difference between two timestamps from the same source is meaningful.

use std::fmt;
use std::time::Duration;

/// Identifier assigned by the input source to a connected controller.
///
/// Identifiers are never reused within one run, so a stale event from an
/// unplugged controller cannot be mistaken for one from its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(pub u32);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a connected controller, as reported by the input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Human-readable device name
    pub name: String,
    /// Device node, e.g. `/dev/input/event5`
    pub path: String,
    /// USB vendor id
    pub vendor: u16,
    /// USB product id
    pub product: u16,
}

impl fmt::Display for ControllerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} (vendor: 0x{:04x}, product: 0x{:04x})",
            self.name, self.path, self.vendor, self.product
        )
    }
}

/// Hot-plug change for a controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceChange {
    /// A controller became available
    Added(ControllerInfo),
    /// A controller went away
    Removed,
}

/// A single input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Controller connected or disconnected
    Device {
        controller: ControllerId,
        change: DeviceChange,
    },
    /// Button pressed or released
    Button {
        controller: ControllerId,
        /// Raw button code
        button: u16,
        pressed: bool,
        at: Duration,
    },
    /// Axis moved
    Axis {
        controller: ControllerId,
        /// Raw axis code
        axis: u16,
        /// Normalized position in `[-1.0, 1.0]`
        value: f32,
        at: Duration,
    },
}

impl InputEvent {
    /// Returns the controller this event belongs to.
    #[must_use]
    pub fn controller(&self) -> ControllerId {
        match self {
            InputEvent::Device { controller, .. }
            | InputEvent::Button { controller, .. }
            | InputEvent::Axis { controller, .. } => *controller,
        }
    }
}
