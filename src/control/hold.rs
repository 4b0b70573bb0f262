//! # Hold Gesture
//!
//! Detects a button held for at least a threshold duration.
//!
//! The gesture is judged when the button is released: a release at or after
//! the threshold confirms it, an earlier release cancels it. Holding past the
//! threshold while the button stays down does nothing by itself. No timer is
//! involved; elapsed time is the difference of the press and release
//! timestamps.
//!
//! ```text
//!            press                 release (held >= threshold)
//!   Idle ------------> Holding ---------------------------------> Confirmed -> Idle
//!                         |
//!                         +---- release (held < threshold) ----> Idle
//! ```

use std::time::Duration;

/// Result of feeding one button transition to a [`HoldGesture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// The button went down and timing started
    Started,
    /// The button was released too early
    Cancelled { held: Duration },
    /// The button was held long enough
    Confirmed { held: Duration },
    /// The transition did not change anything (repeat press, stray release)
    Ignored,
}

/// Hold-to-confirm detector for one button.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use padcar::control::hold::{HoldGesture, HoldOutcome};
///
/// let mut gesture = HoldGesture::new(Duration::from_millis(4000));
/// gesture.press(Duration::from_millis(1000));
/// assert_eq!(
///     gesture.release(Duration::from_millis(5000)),
///     HoldOutcome::Confirmed { held: Duration::from_millis(4000) }
/// );
/// ```
#[derive(Debug, Clone)]
pub struct HoldGesture {
    threshold: Duration,
    /// Set iff the button is currently held
    pressed_at: Option<Duration>,
}

impl HoldGesture {
    /// Creates an idle detector.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pressed_at: None,
        }
    }

    /// Returns the configured threshold.
    #[must_use]
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether the button is currently held.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// Records a press at `at`.
    ///
    /// A press while already holding keeps the original start time.
    pub fn press(&mut self, at: Duration) -> HoldOutcome {
        if self.pressed_at.is_some() {
            return HoldOutcome::Ignored;
        }
        self.pressed_at = Some(at);
        HoldOutcome::Started
    }

    /// Records a release at `at` and judges the gesture.
    ///
    /// A timestamp earlier than the press counts as zero elapsed time.
    pub fn release(&mut self, at: Duration) -> HoldOutcome {
        let Some(pressed_at) = self.pressed_at.take() else {
            return HoldOutcome::Ignored;
        };

        let held = at.saturating_sub(pressed_at);
        if held >= self.threshold {
            HoldOutcome::Confirmed { held }
        } else {
            HoldOutcome::Cancelled { held }
        }
    }

    /// Feeds a button transition.
    pub fn update(&mut self, pressed: bool, at: Duration) -> HoldOutcome {
        if pressed {
            self.press(at)
        } else {
            self.release(at)
        }
    }

    /// Forgets any hold in progress.
    pub fn reset(&mut self) {
        self.pressed_at = None;
    }
}
