//! Motor arbitration between the operator throttle and the safety override.
//!
//! [`MotorArbiter`] is the only writer of the drive and steering actuators.
//! While unlocked it follows the throttle; once an obstacle engages the
//! override it locks out manual input, swings the steering servo, and ramps
//! the speed down one step per interval without ever blocking the cycle.

use core::fmt;

use crate::capabilities::{Direction, DriveActuator, SteeringActuator};
use crate::classifier::ObstacleState;
use crate::clock::ControlInstant;
use crate::config::MotorConfig;

pub mod ramp;

pub use ramp::SpeedRamp;

/// Last command written to the drive actuator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MotorCommand {
    pub direction: Direction,
    pub speed: u8,
}

impl MotorCommand {
    pub const fn stopped() -> Self {
        Self {
            direction: Direction::Coast,
            speed: 0,
        }
    }

    /// Forward at `speed`, or coasting when `speed` is zero.
    pub const fn from_speed(speed: u8) -> Self {
        if speed == 0 {
            Self::stopped()
        } else {
            Self {
                direction: Direction::Forward,
                speed,
            }
        }
    }
}

/// Which obstacle engaged the override.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OverrideKind {
    Front,
    Side,
}

impl OverrideKind {
    /// Maps a blocked classification to its override; `None` when clear.
    pub const fn from_state(state: ObstacleState) -> Option<Self> {
        match state {
            ObstacleState::FrontBlocked => Some(OverrideKind::Front),
            ObstacleState::SideBlocked => Some(OverrideKind::Side),
            ObstacleState::Clear => None,
        }
    }

    pub const fn as_raw(self) -> u8 {
        match self {
            OverrideKind::Front => 0,
            OverrideKind::Side => 1,
        }
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(OverrideKind::Front),
            1 => Some(OverrideKind::Side),
            _ => None,
        }
    }
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverrideKind::Front => "front",
            OverrideKind::Side => "side",
        })
    }
}

/// Whether manual throttle input is currently honoured.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockState {
    Unlocked,
    Locked(OverrideKind),
}

impl LockState {
    pub const fn is_locked(self) -> bool {
        matches!(self, LockState::Locked(_))
    }
}

/// Named steering servo positions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SteeringPosition {
    Neutral,
    Avoid,
    Blocking,
}

/// Single owner of the drive and steering actuators.
pub struct MotorArbiter<I, D, S> {
    config: MotorConfig,
    drive: D,
    steering: S,
    lock: LockState,
    command: MotorCommand,
    position: SteeringPosition,
    ramp: SpeedRamp<I>,
}

impl<I, D, S> MotorArbiter<I, D, S>
where
    I: ControlInstant,
    D: DriveActuator,
    S: SteeringActuator,
{
    /// Takes ownership of the actuators. Nothing is written until the first
    /// command or [`MotorArbiter::force_stop`].
    pub fn new(config: MotorConfig, drive: D, steering: S) -> Self {
        Self {
            config,
            drive,
            steering,
            lock: LockState::Unlocked,
            command: MotorCommand::stopped(),
            position: SteeringPosition::Neutral,
            ramp: SpeedRamp::new(config.ramp_step, config.ramp_interval),
        }
    }

    /// Scales a raw throttle sample linearly onto `0..=max_speed`.
    pub fn throttle_to_speed(&self, raw: u16) -> u8 {
        let raw_max = u32::from(self.config.throttle_raw_max.max(1));
        let raw = u32::from(raw).min(raw_max);
        let scaled = raw * u32::from(self.config.max_speed) / raw_max;
        u8::try_from(scaled).unwrap_or(self.config.max_speed)
    }

    /// Follows the operator throttle. Ignored while locked.
    ///
    /// Returns the new command when the actuator was written.
    pub fn set_manual_throttle(&mut self, raw: u16) -> Option<MotorCommand> {
        if self.lock.is_locked() {
            return None;
        }

        let next = MotorCommand::from_speed(self.throttle_to_speed(raw));
        if next == self.command {
            return None;
        }
        self.write_drive(next);
        Some(next)
    }

    /// Engages the override for a blocked classification.
    ///
    /// Re-applying the same kind is a no-op, so callers may invoke this on
    /// every blocked cycle. A changed kind re-targets the ramp and steering.
    /// Returns the kind when the lock changed.
    pub fn apply_safety_override(&mut self, state: ObstacleState, now: I) -> Option<OverrideKind> {
        let kind = OverrideKind::from_state(state)?;
        if self.lock == LockState::Locked(kind) {
            return None;
        }

        self.lock = LockState::Locked(kind);
        let (position, target) = match kind {
            OverrideKind::Front => (SteeringPosition::Blocking, 0),
            OverrideKind::Side => (SteeringPosition::Avoid, self.config.crawl_speed),
        };
        self.write_steering(position);
        self.ramp.start(self.command.speed, target, now);
        Some(kind)
    }

    /// Releases the lock and centres the steering. The speed is left where
    /// the ramp stopped; manual control picks up from there.
    ///
    /// Returns `true` when a lock was actually released.
    pub fn clear_safety_override(&mut self) -> bool {
        if !self.lock.is_locked() {
            return false;
        }
        self.lock = LockState::Unlocked;
        self.ramp.cancel();
        self.write_steering(SteeringPosition::Neutral);
        true
    }

    /// Advances the ramp when a step is due and returns the active command.
    pub fn tick(&mut self, now: I) -> MotorCommand {
        if let Some(speed) = self.ramp.advance(self.command.speed, now) {
            self.write_drive(MotorCommand::from_speed(speed));
        }
        self.command
    }

    /// Stops the motor, centres the steering and drops any lock.
    pub fn force_stop(&mut self) {
        self.lock = LockState::Unlocked;
        self.ramp.cancel();
        self.write_drive(MotorCommand::stopped());
        self.write_steering(SteeringPosition::Neutral);
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_active()
    }

    pub fn command(&self) -> MotorCommand {
        self.command
    }

    pub fn current_speed(&self) -> u8 {
        self.command.speed
    }

    pub fn steering_position(&self) -> SteeringPosition {
        self.position
    }

    /// Servo angle for the current steering position.
    pub fn steering_angle(&self) -> u8 {
        self.angle_for(self.position)
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn steering(&self) -> &S {
        &self.steering
    }

    /// Mutable access to the owned actuators, e.g. to drain a recording
    /// double. Writing through these bypasses the arbiter.
    pub fn actuators_mut(&mut self) -> (&mut D, &mut S) {
        (&mut self.drive, &mut self.steering)
    }

    fn angle_for(&self, position: SteeringPosition) -> u8 {
        let steering = &self.config.steering;
        match position {
            SteeringPosition::Neutral => steering.neutral_deg,
            SteeringPosition::Avoid => steering.avoid_deg,
            SteeringPosition::Blocking => steering.blocking_deg,
        }
    }

    fn write_drive(&mut self, command: MotorCommand) {
        self.drive.set_speed(command.direction, command.speed);
        self.command = command;
    }

    fn write_steering(&mut self, position: SteeringPosition) {
        self.position = position;
        let angle = self.angle_for(position);
        self.steering.set_angle(angle);
    }
}
