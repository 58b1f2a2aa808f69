//! Capability contracts the control core calls into.
//!
//! Sensors, actuators, the display and the buzzer are owned by the platform
//! crate. The core only sees these traits, which keeps it free of pin, timer,
//! and driver details. No-op implementations let a build omit a collaborator
//! entirely, e.g. a signal-only board without a drive motor.

use core::time::Duration;

use crate::ranging::{ChannelId, EchoSample};

/// Rotation requested from the drive motor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Both direction lines cleared; the motor freewheels.
    Coast,
    Forward,
}

/// Visual indication offered by boards with a status lamp.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Indication {
    /// Path clear (green lamp).
    Safe,
    /// Obstacle present (red lamp).
    Warning,
}

/// Ultrasonic ranger front-end.
pub trait Ranger {
    /// Fires a trigger pulse on `channel` and waits, bounded, for the echo.
    fn trigger_and_measure(&mut self, channel: ChannelId) -> EchoSample;
}

/// Two-line status display. Writes are fire-and-forget.
pub trait StatusDisplay {
    fn show_status(&mut self, line1: &str, line2: &str);

    /// Drives the optional status lamp; boards without one ignore it.
    fn set_indication(&mut self, _indication: Indication) {}
}

/// Audible alert output. Writes are fire-and-forget.
pub trait AlertSink {
    fn emit(&mut self, frequency_hz: u16, duration: Duration);
}

/// Steering servo.
pub trait SteeringActuator {
    fn set_angle(&mut self, degrees: u8);
}

/// Drive motor H-bridge and enable line.
pub trait DriveActuator {
    fn set_speed(&mut self, direction: Direction, magnitude: u8);
}

/// Operator inputs: throttle potentiometer and enable button.
pub trait ManualInput {
    /// Returns the raw throttle sample.
    fn read_throttle(&mut self) -> u16;

    /// Returns `true` while the enable button is held down.
    fn read_toggle(&mut self) -> bool;
}

/// Everything the control cycle touches besides the actuators it owns.
pub trait CyclePanel: Ranger + StatusDisplay + AlertSink + ManualInput {}

impl<T> CyclePanel for T where T: Ranger + StatusDisplay + AlertSink + ManualInput {}

/// Drive actuator that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopDriveActuator;

impl NoopDriveActuator {
    pub const fn new() -> Self {
        Self
    }
}

impl DriveActuator for NoopDriveActuator {
    fn set_speed(&mut self, _: Direction, _: u8) {}
}

/// Steering actuator that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSteeringActuator;

impl NoopSteeringActuator {
    pub const fn new() -> Self {
        Self
    }
}

impl SteeringActuator for NoopSteeringActuator {
    fn set_angle(&mut self, _: u8) {}
}
