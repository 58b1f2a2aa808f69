//! One reactive control cycle wiring the sampler, classifier, signaler,
//! arbiter, and supervisor together.
//!
//! The cycle follows a fixed order: poll the toggle, sample every channel
//! once, classify, acknowledge edges, apply or release the override, follow
//! the throttle when clear, and advance the ramp. Every decision in a cycle
//! sees the same [`ReadingSet`] snapshot.

use core::fmt::{self, Write as _};

use heapless::String;

use crate::capabilities::{
    CyclePanel, DriveActuator, Indication, StatusDisplay, SteeringActuator,
};
use crate::classifier::{ObstacleClassifier, ObstacleState, ReadingSet};
use crate::clock::ControlInstant;
use crate::config::{ConfigError, ControllerConfig};
use crate::motor::{MotorArbiter, MotorCommand, OverrideKind};
use crate::ranging::{ALL_CHANNELS, CHANNEL_COUNT, DistanceSampler};
use crate::signal::{EdgeSignaler, SignalEvent};
use crate::supervisor::{SupervisorState, SystemSupervisor, ToggleOutcome};
use crate::telemetry::{TELEMETRY_RING_CAPACITY, TelemetryRecorder};

/// Capacity of a single display line buffer.
pub const DISPLAY_LINE_CAPACITY: usize = 32;

/// Text buffer for one display line.
pub type DisplayLine = String<DISPLAY_LINE_CAPACITY>;

/// Banner shown once at start-up.
pub const STARTUP_BANNER: &str = "Initializing...";

/// Banner shown after the override releases.
pub const ALL_CLEAR_BANNER: &str = "All clear!";

/// Banner describing an engaged override.
pub const fn override_banner(kind: OverrideKind) -> &'static str {
    match kind {
        OverrideKind::Front => "Obstacle Front!",
        OverrideKind::Side => "Obstacle Side!",
    }
}

/// Renders the two distance lines (`D1:x D2:x` / `D3:x`).
pub fn distance_lines(readings: &ReadingSet) -> Result<(DisplayLine, DisplayLine), fmt::Error> {
    let mut line1 = DisplayLine::new();
    let mut line2 = DisplayLine::new();
    write!(
        line1,
        "{}:{:.2} {}:{:.2}",
        readings.front.channel.display_label(),
        readings.front.centimeters,
        readings.left.channel.display_label(),
        readings.left.centimeters,
    )?;
    write!(
        line2,
        "{}:{:.2}",
        readings.right.channel.display_label(),
        readings.right.centimeters,
    )?;
    Ok((line1, line2))
}

/// Summary of one executed cycle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub state: SupervisorState,
    pub toggle: ToggleOutcome,
    /// `None` when the cycle was skipped because the system is disabled.
    pub readings: Option<ReadingSet>,
    pub obstacle: ObstacleState,
    pub event: SignalEvent,
    pub command: MotorCommand,
}

impl CycleReport {
    /// Returns `true` when the pipeline ran this cycle.
    pub const fn ran(&self) -> bool {
        self.readings.is_some()
    }
}

/// The reactive controller.
pub struct AvoidanceController<I, D, S, const N: usize = TELEMETRY_RING_CAPACITY>
where
    I: Copy,
{
    sampler: DistanceSampler,
    classifier: ObstacleClassifier,
    signaler: EdgeSignaler,
    arbiter: MotorArbiter<I, D, S>,
    supervisor: SystemSupervisor<I>,
    telemetry: TelemetryRecorder<I, N>,
    faulted: [bool; CHANNEL_COUNT],
    last_report: Option<CycleReport>,
}

impl<I, D, S, const N: usize> AvoidanceController<I, D, S, N>
where
    I: ControlInstant,
    D: DriveActuator,
    S: SteeringActuator,
{
    /// Validates `config` and takes ownership of the actuators.
    pub fn new(config: ControllerConfig, drive: D, steering: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sampler: DistanceSampler::new(config.range),
            classifier: ObstacleClassifier::new(config.classifier),
            signaler: EdgeSignaler::new(config.signal),
            arbiter: MotorArbiter::new(config.motor, drive, steering),
            supervisor: SystemSupervisor::new(config.supervisor),
            telemetry: TelemetryRecorder::new(),
            faulted: [false; CHANNEL_COUNT],
            last_report: None,
        })
    }

    /// Puts the actuators in their safe rest position and shows the start-up
    /// banner. The system stays disabled until the first toggle press.
    pub fn start<P: StatusDisplay + ?Sized>(&mut self, panel: &mut P) {
        self.arbiter.force_stop();
        panel.show_status(STARTUP_BANNER, "");
    }

    /// Runs one control cycle at `now`.
    pub fn run_cycle<P: CyclePanel + ?Sized>(&mut self, now: I, panel: &mut P) -> CycleReport {
        let toggle = self.poll_toggle(now, panel);
        if !self.supervisor.is_enabled() {
            let report = CycleReport {
                state: self.supervisor.state(),
                toggle,
                readings: None,
                obstacle: ObstacleState::Clear,
                event: SignalEvent::None,
                command: self.arbiter.command(),
            };
            self.last_report = Some(report);
            return report;
        }

        let readings = self.sample(now, panel);
        if let Ok((line1, line2)) = distance_lines(&readings) {
            panel.show_status(&line1, &line2);
        }

        let obstacle = self.classifier.classify_set(&readings);
        let blocked = obstacle.is_blocked();
        let event = EdgeSignaler::on_cycle(self.supervisor.previous_obstacle(), blocked);
        let ack = self.signaler.acknowledge(event, panel);
        if event.is_edge() {
            self.telemetry.record_obstacle_edge(obstacle, &readings, now);
            panel.set_indication(if blocked {
                Indication::Warning
            } else {
                Indication::Safe
            });
        }

        let detail = if blocked {
            self.engage_override(obstacle, now)
        } else if event == SignalEvent::ObstacleCleared {
            self.release_override(now);
            Some(ALL_CLEAR_BANNER)
        } else {
            None
        };
        match (ack, detail) {
            (Some(ack), detail) => panel.show_status(ack.banner, detail.unwrap_or("")),
            (None, Some(detail)) => panel.show_status(detail, ""),
            (None, None) => {}
        }

        if !blocked {
            let raw = panel.read_throttle();
            self.arbiter.set_manual_throttle(raw);
        }

        let was_ramping = self.arbiter.is_ramping();
        let command = self.arbiter.tick(now);
        if was_ramping && !self.arbiter.is_ramping() {
            self.telemetry.record_ramp_complete(command.speed, now);
        }
        self.supervisor.record_obstacle(blocked);

        let report = CycleReport {
            state: self.supervisor.state(),
            toggle,
            readings: Some(readings),
            obstacle,
            event,
            command,
        };
        self.last_report = Some(report);
        report
    }

    pub fn supervisor(&self) -> &SystemSupervisor<I> {
        &self.supervisor
    }

    pub fn arbiter(&self) -> &MotorArbiter<I, D, S> {
        &self.arbiter
    }

    /// See [`MotorArbiter::actuators_mut`].
    pub fn actuators_mut(&mut self) -> (&mut D, &mut S) {
        self.arbiter.actuators_mut()
    }

    pub fn telemetry(&self) -> &TelemetryRecorder<I, N> {
        &self.telemetry
    }

    pub fn sampler(&self) -> &DistanceSampler {
        &self.sampler
    }

    pub fn classifier(&self) -> &ObstacleClassifier {
        &self.classifier
    }

    /// Report from the most recent cycle, if any has run.
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    fn poll_toggle<P: CyclePanel + ?Sized>(&mut self, now: I, panel: &mut P) -> ToggleOutcome {
        let pressed = panel.read_toggle();
        let outcome = self.supervisor.poll_toggle(pressed, now);
        match outcome {
            ToggleOutcome::Unchanged => {}
            ToggleOutcome::Enabled => {
                self.telemetry.record_system(true, now);
                panel.show_status(SupervisorState::Enabled.banner(), "");
            }
            ToggleOutcome::Disabled => {
                if self.arbiter.is_locked() {
                    self.telemetry.record_override_released(0, now);
                }
                self.arbiter.force_stop();
                self.faulted = [false; CHANNEL_COUNT];
                self.telemetry.record_system(false, now);
                panel.show_status(SupervisorState::Disabled.banner(), "");
                panel.set_indication(Indication::Safe);
            }
            ToggleOutcome::Bounced { since_last_edge } => {
                self.telemetry.record_toggle_bounce(since_last_edge, now);
            }
        }
        outcome
    }

    fn sample<P: CyclePanel + ?Sized>(&mut self, now: I, panel: &mut P) -> ReadingSet {
        let [front, left, right] =
            ALL_CHANNELS.map(|channel| self.sampler.measure(panel, channel));
        let readings = ReadingSet::new(front, left, right);

        for reading in readings.iter() {
            let index = reading.channel.as_index();
            match reading.fault {
                Some(fault) if !self.faulted[index] => {
                    self.telemetry.record_sensor_fault(
                        reading.channel,
                        fault,
                        reading.centimeters,
                        now,
                    );
                    self.faulted[index] = true;
                }
                Some(_) => {}
                None => self.faulted[index] = false,
            }
        }
        readings
    }

    fn engage_override(&mut self, obstacle: ObstacleState, now: I) -> Option<&'static str> {
        let speed = self.arbiter.current_speed();
        let kind = self.arbiter.apply_safety_override(obstacle, now)?;
        self.telemetry.record_override_engaged(kind, speed, now);
        Some(override_banner(kind))
    }

    fn release_override(&mut self, now: I) {
        if self.arbiter.clear_safety_override() {
            self.telemetry
                .record_override_released(self.arbiter.current_speed(), now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{
        AlertSink, ManualInput, NoopDriveActuator, NoopSteeringActuator, Ranger,
    };
    use crate::clock::mock::MockInstant;
    use crate::ranging::{ChannelId, EchoSample, Reading};
    use crate::telemetry::TelemetryEventKind;
    use core::time::Duration;

    /// Bench panel that echoes fixed latencies and records display writes.
    struct Panel {
        echoes: [EchoSample; CHANNEL_COUNT],
        pressed: bool,
        throttle: u16,
        lines: heapless::Vec<(DisplayLine, DisplayLine), 16>,
        tones: usize,
    }

    impl Panel {
        fn clear() -> Self {
            Self {
                echoes: [EchoSample::Timeout; CHANNEL_COUNT],
                pressed: false,
                throttle: 0,
                lines: heapless::Vec::new(),
                tones: 0,
            }
        }

        fn set_cm(&mut self, channel: ChannelId, centimeters: u64) {
            // round trip at 0.034 cm/us: t = cm * 2 / 0.034
            let micros = centimeters * 1_000 / 17;
            self.echoes[channel.as_index()] = EchoSample::Echo(Duration::from_micros(micros));
        }

        fn last_line1(&self) -> &str {
            self.lines.last().map_or("", |(line1, _)| line1.as_str())
        }
    }

    impl Ranger for Panel {
        fn trigger_and_measure(&mut self, channel: ChannelId) -> EchoSample {
            self.echoes[channel.as_index()]
        }
    }

    impl StatusDisplay for Panel {
        fn show_status(&mut self, line1: &str, line2: &str) {
            if self.lines.is_full() {
                self.lines.remove(0);
            }
            let _ = self.lines.push((
                DisplayLine::try_from(line1).unwrap_or_default(),
                DisplayLine::try_from(line2).unwrap_or_default(),
            ));
        }
    }

    impl AlertSink for Panel {
        fn emit(&mut self, _: u16, _: Duration) {
            self.tones += 1;
        }
    }

    impl ManualInput for Panel {
        fn read_throttle(&mut self) -> u16 {
            self.throttle
        }

        fn read_toggle(&mut self) -> bool {
            self.pressed
        }
    }

    type Controller = AvoidanceController<MockInstant, NoopDriveActuator, NoopSteeringActuator>;

    fn controller() -> Controller {
        AvoidanceController::new(
            ControllerConfig::default(),
            NoopDriveActuator::new(),
            NoopSteeringActuator::new(),
        )
        .expect("default config is valid")
    }

    fn enable(controller: &mut Controller, panel: &mut Panel, at_ms: u64) {
        panel.pressed = true;
        controller.run_cycle(MockInstant::millis(at_ms), panel);
        panel.pressed = false;
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ControllerConfig::default();
        config.motor.ramp_step = 0;
        let result = Controller::new(config, NoopDriveActuator, NoopSteeringActuator);
        assert!(matches!(result, Err(ConfigError::ZeroRampStep)));
    }

    #[test]
    fn disabled_cycle_skips_pipeline() {
        let mut controller = controller();
        let mut panel = Panel::clear();
        panel.pressed = true;
        // Held at power-up: not an edge.
        let report = controller.run_cycle(MockInstant::millis(0), &mut panel);
        assert!(!report.ran());
        assert_eq!(report.state, SupervisorState::Disabled);
        assert!(panel.lines.is_empty());
    }

    #[test]
    fn distance_lines_use_two_decimals() {
        let readings = ReadingSet::new(
            Reading::new(ChannelId::Front, 20.0),
            Reading::new(ChannelId::Left, 100.5),
            Reading::new(ChannelId::Right, 400.0),
        );
        let (line1, line2) = distance_lines(&readings).unwrap();
        assert_eq!(line1.as_str(), "D1:20.00 D2:100.50");
        assert_eq!(line2.as_str(), "D3:400.00");
    }

    #[test]
    fn side_edge_shows_banner_and_records_telemetry() {
        let mut controller = controller();
        let mut panel = Panel::clear();
        controller.run_cycle(MockInstant::millis(0), &mut panel);
        enable(&mut controller, &mut panel, 50);

        panel.set_cm(ChannelId::Left, 30);
        let report = controller.run_cycle(MockInstant::millis(100), &mut panel);
        assert_eq!(report.obstacle, ObstacleState::SideBlocked);
        assert_eq!(report.event, SignalEvent::ObstacleAppeared);
        assert_eq!(panel.lines.last().map(|(_, l2)| l2.as_str()), Some("Obstacle Side!"));
        assert_eq!(panel.last_line1(), "Obstacle Detected!");
        assert_eq!(panel.tones, 1);

        let kinds: heapless::Vec<TelemetryEventKind, 16> = controller
            .telemetry()
            .oldest_first()
            .map(|record| record.event)
            .collect();
        assert!(kinds.contains(&TelemetryEventKind::ObstacleAppeared(
            ObstacleState::SideBlocked
        )));
        assert!(kinds.contains(&TelemetryEventKind::OverrideEngaged(OverrideKind::Side)));
    }

    #[test]
    fn sensor_fault_recorded_once_per_onset() {
        let mut controller = controller();
        let mut panel = Panel::clear();
        controller.run_cycle(MockInstant::millis(0), &mut panel);
        enable(&mut controller, &mut panel, 50);
        panel.set_cm(ChannelId::Front, 100);
        panel.set_cm(ChannelId::Left, 100);

        for cycle in 2..6 {
            controller.run_cycle(MockInstant::millis(cycle * 50), &mut panel);
        }
        let faults = controller
            .telemetry()
            .oldest_first()
            .filter(|record| matches!(record.event, TelemetryEventKind::SensorFault(_)))
            .count();
        // Every channel timed out on the enabling cycle, only the right one stays faulted.
        assert_eq!(faults, 3);
    }
}
