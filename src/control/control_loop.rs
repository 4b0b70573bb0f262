//! # Control Loop
//!
//! Waits for controller events one at a time and turns each into at most one
//! actuator command.
//!
//! | Role | Effect |
//! |------|--------|
//! | Steering axis | servo angle on the steering channel |
//! | Throttle axis | motor speed on the drive channel |
//! | Light 1/2 button | digital output follows the button |
//! | Exit button | stop on press |
//! | Shutdown button | power off after a hold of `shutdown_hold_ms` |
//!
//! The input source and the actuator set are borrowed for the duration of
//! [`ControlLoop::run`] and released on every way out of it.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::hold::{HoldGesture, HoldOutcome};
use super::range::{apply_deadzone, motor_speed, servo_angle};
use crate::actuator::{self_test, Actuators, ChannelMap};
use crate::config::Config;
use crate::controller::event::{ControllerId, ControllerInfo, DeviceChange, InputEvent};
use crate::controller::profile::{AxisRole, Bindings, ButtonRole, ControllerProfile};
use crate::controller::source::InputSource;
use crate::error::{PadcarError, Result};
use crate::lifecycle::Scoped;
use crate::power::PowerOff;

/// Everything the loop needs from the configuration.
#[derive(Debug, Clone)]
pub struct ControlSettings {
    pub bindings: Bindings,
    pub channels: ChannelMap,
    pub invert_throttle: bool,
    pub servo_center_degrees: i32,
    pub servo_max_deflection_degrees: i32,
    pub stick_deadzone: f32,
    pub shutdown_hold: Duration,
    pub test_servo: bool,
    pub test_lights: bool,
    pub test_step: Duration,
    pub reset_on_disconnect: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControlSettings {
    fn from(config: &Config) -> Self {
        Self {
            bindings: Bindings::from(&config.controls),
            channels: ChannelMap::from(&config.board),
            invert_throttle: config.controls.invert_throttle,
            servo_center_degrees: config.board.servo_center_deg,
            servo_max_deflection_degrees: config.board.servo_max_deflection_deg,
            stick_deadzone: config.controls.stick_deadzone,
            shutdown_hold: Duration::from_millis(config.controls.shutdown_hold_ms),
            test_servo: config.startup.test_servo,
            test_lights: config.startup.test_lights,
            test_step: Duration::from_millis(config.startup.test_step_ms),
            reset_on_disconnect: config.safety.reset_on_disconnect,
        }
    }
}

/// Why [`ControlLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The exit button was pressed
    ExitButton,
    /// The shutdown gesture was confirmed and power-off requested
    PowerOff,
    /// The input source stopped delivering events
    Stopped,
}

/// Event loop driving the car.
pub struct ControlLoop {
    settings: ControlSettings,
    running: bool,
    exit_reason: Option<ExitReason>,
    /// Controller whose events are acted upon
    active: Option<(ControllerId, ControllerProfile)>,
    shutdown_hold: HoldGesture,
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("running", &self.running)
            .field("active", &self.active.as_ref().map(|(id, _)| *id))
            .finish_non_exhaustive()
    }
}

impl ControlLoop {
    /// Creates a loop that is not yet running.
    #[must_use]
    pub fn new(settings: ControlSettings) -> Self {
        let shutdown_hold = HoldGesture::new(settings.shutdown_hold);
        Self {
            settings,
            running: false,
            exit_reason: None,
            active: None,
            shutdown_hold,
        }
    }

    /// Whether the loop is processing events.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ends the loop after the event being handled.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Id of the controller currently driving the car.
    #[must_use]
    pub fn active_controller(&self) -> Option<ControllerId> {
        self.active.as_ref().map(|(id, _)| *id)
    }

    /// Runs until the exit button, the shutdown gesture or the input source
    /// stopping.
    ///
    /// Start-up lists the attached controllers, opens the first one,
    /// configures the actuator channels and runs the enabled self tests.
    /// `input` and `actuators` are released before this returns, whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// - `NoControllerAvailable` if no controller is attached at start-up
    /// - `Controller` if reading the input source fails
    /// - `Actuator` if configuring or commanding the board fails
    pub async fn run<I, A, P>(
        &mut self,
        input: &mut I,
        actuators: &mut A,
        power: &P,
    ) -> Result<ExitReason>
    where
        I: InputSource + ?Sized,
        A: Actuators + ?Sized,
        P: PowerOff + ?Sized,
    {
        let mut input = Scoped::new(input);
        let mut actuators = Scoped::new(actuators);

        let result = self.drive(&mut *input, &mut *actuators, power).await;
        self.running = false;
        match &result {
            Ok(reason) => info!("Control loop finished: {:?}", reason),
            Err(e) => error!("Control loop failed: {}", e),
        }
        result
    }

    async fn drive<I, A, P>(&mut self, input: &mut I, actuators: &mut A, power: &P) -> Result<ExitReason>
    where
        I: InputSource + ?Sized,
        A: Actuators + ?Sized,
        P: PowerOff + ?Sized,
    {
        self.running = true;
        self.exit_reason = None;
        self.active = None;
        self.shutdown_hold.reset();

        let controllers = input.list_controllers()?;
        if controllers.is_empty() {
            return Err(PadcarError::NoControllerAvailable);
        }
        for (index, info) in controllers.iter().enumerate() {
            info!("Controller {}: {}", index, info);
        }
        let info = input.open(0)?;
        info!("Using {}", info);

        for (channel, kind) in self.settings.channels.outputs() {
            actuators.configure(channel, kind)?;
        }
        self.run_self_tests(actuators).await?;

        info!("Ready");
        while self.running {
            let Some(event) = input.next_event().await? else {
                info!("Input source stopped");
                self.finish(ExitReason::Stopped);
                break;
            };
            self.handle_event(event, actuators, power).await?;
        }

        Ok(self.exit_reason.unwrap_or(ExitReason::Stopped))
    }

    async fn run_self_tests<A: Actuators + ?Sized>(&self, actuators: &mut A) -> Result<()> {
        let settings = &self.settings;
        if settings.test_servo {
            self_test::test_servo(
                actuators,
                &settings.channels,
                settings.servo_center_degrees,
                settings.servo_max_deflection_degrees,
                settings.test_step,
            )
            .await?;
        }
        if settings.test_lights {
            self_test::test_lights(actuators, &settings.channels, settings.test_step).await?;
        }
        Ok(())
    }

    fn finish(&mut self, reason: ExitReason) {
        self.exit_reason = Some(reason);
        self.stop();
    }

    async fn handle_event<A, P>(
        &mut self,
        event: InputEvent,
        actuators: &mut A,
        power: &P,
    ) -> Result<()>
    where
        A: Actuators + ?Sized,
        P: PowerOff + ?Sized,
    {
        match event {
            InputEvent::Device { controller, change: DeviceChange::Added(info) } => {
                self.controller_added(controller, &info);
                Ok(())
            }
            InputEvent::Device { controller, change: DeviceChange::Removed } => {
                self.controller_removed(controller, actuators)
            }
            InputEvent::Button { controller, button, pressed, at } => {
                let Some(profile) = self.profile_for(controller) else {
                    return Ok(());
                };
                match profile.button_role(button) {
                    Some(role) => self.handle_button(role, pressed, at, actuators, power).await,
                    None => {
                        debug!("Unmapped button {} on controller {}", button, controller);
                        Ok(())
                    }
                }
            }
            InputEvent::Axis { controller, axis, value, .. } => {
                let Some(profile) = self.profile_for(controller) else {
                    return Ok(());
                };
                match profile.axis_role(axis) {
                    Some(role) => self.handle_axis(role, value, actuators),
                    None => {
                        debug!("Unmapped axis {} on controller {}", axis, controller);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Profile of `controller` if it is the active one.
    fn profile_for(&self, controller: ControllerId) -> Option<&ControllerProfile> {
        match &self.active {
            Some((id, profile)) if *id == controller => Some(profile),
            Some((id, _)) => {
                info!("Ignoring controller {}, {} is active", controller, id);
                None
            }
            None => {
                info!("Ignoring controller {}, no active controller", controller);
                None
            }
        }
    }

    fn controller_added(&mut self, controller: ControllerId, info: &ControllerInfo) {
        if let Some((active, _)) = &self.active {
            info!("Controller {} connected ({}), keeping {}", controller, info, active);
            return;
        }

        let profile = ControllerProfile::new(info, &self.settings.bindings);
        info!(
            "Controller {} active: {} ({:?} layout)",
            controller,
            info,
            profile.layout()
        );
        self.active = Some((controller, profile));
    }

    fn controller_removed<A: Actuators + ?Sized>(
        &mut self,
        controller: ControllerId,
        actuators: &mut A,
    ) -> Result<()> {
        match &self.active {
            Some((id, _)) if *id == controller => {}
            _ => {
                info!("Controller {} removed, not active", controller);
                return Ok(());
            }
        }

        warn!("Active controller {} disconnected, waiting for a controller", controller);
        self.active = None;
        self.shutdown_hold.reset();

        if self.settings.reset_on_disconnect {
            info!("Resetting actuators");
            actuators.reset()?;
        }
        Ok(())
    }

    async fn handle_button<A, P>(
        &mut self,
        role: ButtonRole,
        pressed: bool,
        at: Duration,
        actuators: &mut A,
        power: &P,
    ) -> Result<()>
    where
        A: Actuators + ?Sized,
        P: PowerOff + ?Sized,
    {
        match role {
            ButtonRole::Exit => {
                if pressed {
                    info!("Exit button pressed");
                    self.finish(ExitReason::ExitButton);
                }
            }
            ButtonRole::Shutdown => match self.shutdown_hold.update(pressed, at) {
                HoldOutcome::Started => {
                    info!("Hold for {:?} to power off", self.shutdown_hold.threshold());
                }
                HoldOutcome::Cancelled { held } => {
                    info!("Power-off cancelled, released after {:?}", held);
                }
                HoldOutcome::Confirmed { held } => {
                    info!("Power-off confirmed after {:?}", held);
                    self.power_off(actuators, power).await;
                }
                HoldOutcome::Ignored => {}
            },
            ButtonRole::Light1 => {
                actuators.set_digital_output(self.settings.channels.light_1, pressed)?;
            }
            ButtonRole::Light2 => {
                actuators.set_digital_output(self.settings.channels.light_2, pressed)?;
            }
        }
        Ok(())
    }

    fn handle_axis<A: Actuators + ?Sized>(
        &mut self,
        role: AxisRole,
        value: f32,
        actuators: &mut A,
    ) -> Result<()> {
        let settings = &self.settings;
        let value = apply_deadzone(value, settings.stick_deadzone);
        match role {
            AxisRole::Steering => {
                let degrees = servo_angle(
                    value,
                    settings.servo_center_degrees,
                    settings.servo_max_deflection_degrees,
                );
                actuators.set_servo_angle(settings.channels.servo, degrees)
            }
            AxisRole::Throttle => {
                let speed = motor_speed(value, settings.invert_throttle);
                actuators.set_motor_speed(settings.channels.motor, speed)
            }
        }
    }

    /// Stops the car, requests power-off and ends the loop. Failures are
    /// logged only.
    async fn power_off<A, P>(&mut self, actuators: &mut A, power: &P)
    where
        A: Actuators + ?Sized,
        P: PowerOff + ?Sized,
    {
        if let Err(e) = actuators.reset() {
            warn!("Failed to reset actuators before power-off: {}", e);
        }
        match power.power_off().await {
            Ok(()) => info!("Power-off requested"),
            Err(e) => error!("{}", e),
        }
        self.finish(ExitReason::PowerOff);
    }
}
