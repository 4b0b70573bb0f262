//! # Controller Profile Module
//!
//! Translates raw evdev button and axis codes into the logical roles the
//! control loop understands. This is the only place in the crate that knows
//! about raw codes.
//!
//! A profile is built in two steps:
//!
//! 1. A [`Layout`] is chosen from the controller's USB identity. It says which
//!    raw code each physical control ([`PadButton`], [`StickAxis`]) reports.
//! 2. The configured [`Bindings`] assign a role to physical controls.
//!
//! ## Layouts
//!
//! | Layout | Right stick | Used for |
//! |--------|-------------|----------|
//! | `Gamepad` | ABS_RX / ABS_RY | DualShock 3/4, DualSense, Xbox pads (kernel gamepad API) |
//! | `HidGeneric` | ABS_Z / ABS_RZ | Anything else (hid-generic driver) |
//!
//! Both layouts report the left stick on ABS_X / ABS_Y. Gamepad-layout pads
//! report the positional `BTN_SOUTH`/`BTN_EAST`/... codes. hid-generic pads
//! report either those or, when the descriptor declares a joystick, the
//! `BTN_TRIGGER`..`BTN_BASE6` range, so a `HidGeneric` profile accepts both:
//!
//! | Button | Joystick code |
//! |--------|---------------|
//! | West / East / South / North | BTN_TRIGGER / BTN_THUMB / BTN_THUMB2 / BTN_TOP |
//! | L1 / R1 / L2 / R2 | BTN_TOP2 / BTN_PINKIE / BTN_BASE / BTN_BASE2 |
//! | Select / Start | BTN_BASE3 / BTN_BASE4 |
//! | ThumbL / ThumbR | BTN_BASE5 / BTN_BASE6 |
//! | Mode | none |
//!
//! ## Usage
//!
//! ```
//! use padcar::controller::event::ControllerInfo;
//! use padcar::controller::profile::{AxisRole, Bindings, ControllerProfile};
//!
//! let info = ControllerInfo {
//!     name: "Sony PLAYSTATION(R)3 Controller".to_string(),
//!     path: "/dev/input/event3".to_string(),
//!     vendor: 0x054c,
//!     product: 0x0268,
//! };
//! let profile = ControllerProfile::new(&info, &Bindings::default());
//!
//! // ABS_X (code 0) steers with the default bindings
//! assert_eq!(profile.axis_role(0), Some(AxisRole::Steering));
//! ```

use evdev::{AbsoluteAxisType, Key};
use serde::Deserialize;
use std::collections::HashMap;

use super::event::ControllerInfo;
use crate::config::ControlsConfig;

/// Sony vendor ID
const SONY_VENDOR_ID: u16 = 0x054c;

/// Microsoft vendor ID
const MICROSOFT_VENDOR_ID: u16 = 0x045e;

/// Sony pads driven by hid-sony / hid-playstation
const SONY_GAMEPADS: &[u16] = &[
    0x0268, // DualShock 3
    0x05c4, // DualShock 4
    0x09cc, // DualShock 4 (2nd gen)
    0x0ce6, // DualSense
    0x0df2, // DualSense Edge
];

/// Microsoft pads driven by xpad
const MICROSOFT_GAMEPADS: &[u16] = &[
    0x028e, // Xbox 360
    0x02d1, // Xbox One
    0x02dd, // Xbox One (2015)
    0x02ea, // Xbox One S
    0x0b12, // Xbox Series X|S
];

/// Physical button, named by position on the pad.
///
/// On a PlayStation pad South is Cross, East is Circle, West is Square and
/// North is Triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadButton {
    South,
    East,
    West,
    North,
    L1,
    R1,
    L2,
    R2,
    Select,
    Start,
    Mode,
    ThumbL,
    ThumbR,
}

/// Physical stick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickAxis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
}

/// Logical meaning of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonRole {
    Light1,
    Light2,
    Exit,
    Shutdown,
}

/// Logical meaning of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    Steering,
    Throttle,
}

/// Raw code layout of a controller family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Kernel gamepad API layout
    Gamepad,
    /// hid-generic layout, right stick on Z/RZ
    HidGeneric,
}

impl Layout {
    /// Picks the layout for a controller from its USB identity.
    #[must_use]
    pub fn detect(info: &ControllerInfo) -> Self {
        let known = match info.vendor {
            SONY_VENDOR_ID => SONY_GAMEPADS.contains(&info.product),
            MICROSOFT_VENDOR_ID => MICROSOFT_GAMEPADS.contains(&info.product),
            _ => false,
        };

        if known {
            Layout::Gamepad
        } else {
            Layout::HidGeneric
        }
    }

    /// Raw key codes a physical button may report on this layout.
    #[must_use]
    pub fn button_codes(self, button: PadButton) -> Vec<u16> {
        let mut codes = vec![positional_key(button).code()];
        if self == Layout::HidGeneric {
            codes.extend(joystick_key(button).map(|key| key.code()));
        }
        codes
    }

    /// Raw absolute axis code reported for a physical stick axis.
    #[must_use]
    pub fn axis_code(self, axis: StickAxis) -> u16 {
        let abs = match (self, axis) {
            (_, StickAxis::LeftStickX) => AbsoluteAxisType::ABS_X,
            (_, StickAxis::LeftStickY) => AbsoluteAxisType::ABS_Y,
            (Layout::Gamepad, StickAxis::RightStickX) => AbsoluteAxisType::ABS_RX,
            (Layout::Gamepad, StickAxis::RightStickY) => AbsoluteAxisType::ABS_RY,
            (Layout::HidGeneric, StickAxis::RightStickX) => AbsoluteAxisType::ABS_Z,
            (Layout::HidGeneric, StickAxis::RightStickY) => AbsoluteAxisType::ABS_RZ,
        };
        abs.0
    }
}

/// Gamepad-class code for a physical button.
fn positional_key(button: PadButton) -> Key {
    match button {
        PadButton::South => Key::BTN_SOUTH,
        PadButton::East => Key::BTN_EAST,
        PadButton::West => Key::BTN_WEST,
        PadButton::North => Key::BTN_NORTH,
        PadButton::L1 => Key::BTN_TL,
        PadButton::R1 => Key::BTN_TR,
        PadButton::L2 => Key::BTN_TL2,
        PadButton::R2 => Key::BTN_TR2,
        PadButton::Select => Key::BTN_SELECT,
        PadButton::Start => Key::BTN_START,
        PadButton::Mode => Key::BTN_MODE,
        PadButton::ThumbL => Key::BTN_THUMBL,
        PadButton::ThumbR => Key::BTN_THUMBR,
    }
}

/// Joystick-class code for a physical button on hid-generic pads.
fn joystick_key(button: PadButton) -> Option<Key> {
    let key = match button {
        PadButton::West => Key::BTN_TRIGGER,
        PadButton::East => Key::BTN_THUMB,
        PadButton::South => Key::BTN_THUMB2,
        PadButton::North => Key::BTN_TOP,
        PadButton::L1 => Key::BTN_TOP2,
        PadButton::R1 => Key::BTN_PINKIE,
        PadButton::L2 => Key::BTN_BASE,
        PadButton::R2 => Key::BTN_BASE2,
        PadButton::Select => Key::BTN_BASE3,
        PadButton::Start => Key::BTN_BASE4,
        PadButton::ThumbL => Key::BTN_BASE5,
        PadButton::ThumbR => Key::BTN_BASE6,
        PadButton::Mode => return None,
    };
    Some(key)
}

/// Which physical control drives which vehicle function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub steering: StickAxis,
    pub throttle: StickAxis,
    pub light_1: PadButton,
    pub light_2: PadButton,
    pub exit: PadButton,
    pub shutdown: PadButton,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::from(&ControlsConfig::default())
    }
}

impl From<&ControlsConfig> for Bindings {
    fn from(controls: &ControlsConfig) -> Self {
        Self {
            steering: controls.steering_axis,
            throttle: controls.throttle_axis,
            light_1: controls.light_1_button,
            light_2: controls.light_2_button,
            exit: controls.exit_button,
            shutdown: controls.shutdown_button,
        }
    }
}

/// Raw code to role tables for one connected controller.
#[derive(Debug, Clone)]
pub struct ControllerProfile {
    layout: Layout,
    buttons: HashMap<u16, ButtonRole>,
    axes: HashMap<u16, AxisRole>,
}

impl ControllerProfile {
    /// Builds the profile for a newly connected controller.
    #[must_use]
    pub fn new(info: &ControllerInfo, bindings: &Bindings) -> Self {
        Self::with_layout(Layout::detect(info), bindings)
    }

    /// Builds a profile for an explicit layout.
    #[must_use]
    pub fn with_layout(layout: Layout, bindings: &Bindings) -> Self {
        let buttons = [
            (bindings.light_1, ButtonRole::Light1),
            (bindings.light_2, ButtonRole::Light2),
            (bindings.exit, ButtonRole::Exit),
            (bindings.shutdown, ButtonRole::Shutdown),
        ]
        .into_iter()
        .flat_map(|(button, role)| {
            layout
                .button_codes(button)
                .into_iter()
                .map(move |code| (code, role))
        })
        .collect();

        let axes = [
            (bindings.steering, AxisRole::Steering),
            (bindings.throttle, AxisRole::Throttle),
        ]
        .into_iter()
        .map(|(axis, role)| (layout.axis_code(axis), role))
        .collect();

        Self { layout, buttons, axes }
    }

    /// Returns the layout this profile was built for.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Role of a raw button code, or `None` if unmapped.
    #[must_use]
    pub fn button_role(&self, code: u16) -> Option<ButtonRole> {
        self.buttons.get(&code).copied()
    }

    /// Role of a raw axis code, or `None` if unmapped.
    #[must_use]
    pub fn axis_role(&self, code: u16) -> Option<AxisRole> {
        self.axes.get(&code).copied()
    }
}
