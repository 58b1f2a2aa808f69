//! Shared status surface for the bench REPL.
//!
//! [`StatusSnapshot`] captures what the `status` command reports, and
//! [`StatusFormatter`] keeps the textual rendering consistent across
//! front-ends.

use core::fmt;

use crate::capabilities::{Direction, DriveActuator, SteeringActuator};
use crate::classifier::{ObstacleState, ReadingSet};
use crate::clock::ControlInstant;
use crate::controller::AvoidanceController;
use crate::motor::{LockState, MotorCommand};
use crate::ranging::{RangeFault, Reading};
use crate::supervisor::SupervisorState;

/// Point-in-time view of the controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub state: SupervisorState,
    pub readings: Option<ReadingSet>,
    pub obstacle: ObstacleState,
    pub lock: LockState,
    pub ramping: bool,
    pub command: MotorCommand,
    pub steering_deg: u8,
    pub events_recorded: usize,
}

impl StatusSnapshot {
    /// Builds a snapshot with no known measurements.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            state: SupervisorState::Disabled,
            readings: None,
            obstacle: ObstacleState::Clear,
            lock: LockState::Unlocked,
            ramping: false,
            command: MotorCommand::stopped(),
            steering_deg: 0,
            events_recorded: 0,
        }
    }

    /// Captures the controller state after its most recent cycle.
    pub fn capture<I, D, S, const N: usize>(controller: &AvoidanceController<I, D, S, N>) -> Self
    where
        I: ControlInstant,
        D: DriveActuator,
        S: SteeringActuator,
    {
        let arbiter = controller.arbiter();
        let report = controller.last_report();
        Self {
            state: controller.supervisor().state(),
            readings: report.and_then(|report| report.readings),
            obstacle: report.map_or(ObstacleState::Clear, |report| report.obstacle),
            lock: arbiter.lock_state(),
            ramping: arbiter.is_ramping(),
            command: arbiter.command(),
            steering_deg: arbiter.steering_angle(),
            events_recorded: controller.telemetry().len(),
        }
    }
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the supervisor line (e.g. `system enabled obstacle=front-blocked lock=front`).
    pub fn write_system_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "system {} obstacle={} lock=",
            self.snapshot.state, self.snapshot.obstacle
        )?;
        match self.snapshot.lock {
            LockState::Unlocked => writer.write_str("none"),
            LockState::Locked(kind) => write!(writer, "{kind}"),
        }
    }

    /// Writes the readings line (e.g. `readings front=20.00cm left=400.00cm(timeout) right=n/a`).
    pub fn write_readings_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("readings")?;
        let Some(readings) = self.snapshot.readings else {
            return writer.write_str(" n/a");
        };
        for reading in readings.iter() {
            write_reading(writer, reading)?;
        }
        Ok(())
    }

    /// Writes the motor line (e.g. `motor forward speed=127 steering=0deg ramp=idle`).
    pub fn write_motor_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let command = self.snapshot.command;
        writer.write_str("motor ")?;
        writer.write_str(match command.direction {
            Direction::Coast => "coast",
            Direction::Forward => "forward",
        })?;
        write!(
            writer,
            " speed={} steering={}deg ramp={} events={}",
            command.speed,
            self.snapshot.steering_deg,
            if self.snapshot.ramping { "active" } else { "idle" },
            self.snapshot.events_recorded,
        )
    }

    /// Renders all three lines into owned strings.
    #[cfg(feature = "alloc")]
    pub fn render_lines(&self) -> Result<[alloc::string::String; 3], fmt::Error> {
        let mut system = alloc::string::String::new();
        let mut readings = alloc::string::String::new();
        let mut motor = alloc::string::String::new();
        self.write_system_line(&mut system)?;
        self.write_readings_line(&mut readings)?;
        self.write_motor_line(&mut motor)?;
        Ok([system, readings, motor])
    }
}

fn write_reading<W: fmt::Write>(writer: &mut W, reading: &Reading) -> fmt::Result {
    write!(
        writer,
        " {}={:.2}cm",
        reading.channel.name(),
        reading.centimeters
    )?;
    match reading.fault {
        None => Ok(()),
        Some(RangeFault::Timeout) => writer.write_str("(timeout)"),
        Some(RangeFault::OutOfRange) => writer.write_str("(out-of-range)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::OverrideKind;
    use crate::ranging::ChannelId;
    use heapless::String;

    fn lines(snapshot: &StatusSnapshot) -> [String<96>; 3] {
        let formatter = StatusFormatter::new(snapshot);
        let mut system = String::new();
        let mut readings = String::new();
        let mut motor = String::new();
        formatter.write_system_line(&mut system).expect("system line fits");
        formatter
            .write_readings_line(&mut readings)
            .expect("readings line fits");
        formatter.write_motor_line(&mut motor).expect("motor line fits");
        [system, readings, motor]
    }

    #[test]
    fn unknown_snapshot_renders_placeholders() {
        let [system, readings, motor] = lines(&StatusSnapshot::unknown());
        assert_eq!(system.as_str(), "system disabled obstacle=clear lock=none");
        assert_eq!(readings.as_str(), "readings n/a");
        assert_eq!(
            motor.as_str(),
            "motor coast speed=0 steering=0deg ramp=idle events=0"
        );
    }

    #[test]
    fn locked_snapshot_reports_faults_and_ramp() {
        let mut right = Reading::new(ChannelId::Right, 400.0);
        right.fault = Some(RangeFault::Timeout);
        let snapshot = StatusSnapshot {
            state: SupervisorState::Enabled,
            readings: Some(ReadingSet::new(
                Reading::new(ChannelId::Front, 20.0),
                Reading::new(ChannelId::Left, 100.0),
                right,
            )),
            obstacle: ObstacleState::FrontBlocked,
            lock: LockState::Locked(OverrideKind::Front),
            ramping: true,
            command: MotorCommand::from_speed(120),
            steering_deg: 90,
            events_recorded: 4,
        };

        let [system, readings, motor] = lines(&snapshot);
        assert_eq!(
            system.as_str(),
            "system enabled obstacle=front-blocked lock=front"
        );
        assert_eq!(
            readings.as_str(),
            "readings front=20.00cm left=100.00cm right=400.00cm(timeout)"
        );
        assert_eq!(
            motor.as_str(),
            "motor forward speed=120 steering=90deg ramp=active events=4"
        );
    }
}
