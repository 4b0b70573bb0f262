//! Start-up self tests
//!
//! Visible checks run once after the channels are configured, so the
//! operator can confirm the wiring before driving: the steering servo sweeps
//! across its full travel and each light blinks once.

use std::time::Duration;
use tracing::info;

use super::{Actuators, ChannelMap};
use crate::error::Result;

/// Sweeps the steering servo centre, full left, full right, centre.
pub async fn test_servo<A: Actuators + ?Sized>(
    actuators: &mut A,
    channels: &ChannelMap,
    center_degrees: i32,
    max_deflection_degrees: i32,
    step: Duration,
) -> Result<()> {
    info!("Testing steering servo on channel {}", channels.servo);

    let sweep = [
        center_degrees,
        center_degrees - max_deflection_degrees,
        center_degrees + max_deflection_degrees,
        center_degrees,
    ];
    for (i, degrees) in sweep.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(step).await;
        }
        info!("Servo -> {} degrees", degrees);
        actuators.set_servo_angle(channels.servo, degrees)?;
    }

    info!("Servo test complete");
    Ok(())
}

/// Switches each light on, then off.
pub async fn test_lights<A: Actuators + ?Sized>(
    actuators: &mut A,
    channels: &ChannelMap,
    step: Duration,
) -> Result<()> {
    for (name, channel) in [("light 1", channels.light_1), ("light 2", channels.light_2)] {
        info!("Testing {} on channel {}", name, channel);
        actuators.set_digital_output(channel, true)?;
        tokio::time::sleep(step).await;
        actuators.set_digital_output(channel, false)?;
    }

    info!("Light test complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::mocks::RecordingActuators;
    use crate::actuator::ActuatorCommand;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_servo_sweep_order() {
        let mut actuators = RecordingActuators::new();
        let started = Instant::now();

        test_servo(&mut actuators, &ChannelMap::default(), 90, 80, Duration::from_secs(1))
            .await
            .unwrap();

        let angles: Vec<i32> = actuators
            .commands
            .iter()
            .map(|c| match c {
                ActuatorCommand::SetServoAngle { channel: 0, degrees } => *degrees,
                other => panic!("unexpected command {:?}", other),
            })
            .collect();
        assert_eq!(angles, vec![90, 10, 170, 90]);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lights_blink_each_channel() {
        let mut actuators = RecordingActuators::new();

        test_lights(&mut actuators, &ChannelMap::default(), Duration::from_millis(500))
            .await
            .unwrap();

        assert_eq!(
            actuators.commands,
            vec![
                ActuatorCommand::SetDigitalOutput { channel: 3, on: true },
                ActuatorCommand::SetDigitalOutput { channel: 3, on: false },
                ActuatorCommand::SetDigitalOutput { channel: 4, on: true },
                ActuatorCommand::SetDigitalOutput { channel: 4, on: false },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_servo_failure_stops_sweep() {
        let mut actuators = RecordingActuators::new();
        actuators.fail_after = Some(2);

        let result =
            test_servo(&mut actuators, &ChannelMap::default(), 90, 80, Duration::from_secs(1)).await;

        assert!(result.is_err());
        assert_eq!(actuators.commands.len(), 2);
    }
}
