//! Simulated vehicle for the host bench.

use std::collections::VecDeque;
use std::ops::Add;
use std::time::Duration;

use avoidance_core::capabilities::{
    AlertSink, Direction, DriveActuator, Indication, ManualInput, Ranger, StatusDisplay,
    SteeringActuator,
};
use avoidance_core::clock::ControlInstant;
use avoidance_core::config::{CYCLE_PERIOD, ConfigError, ControllerConfig};
use avoidance_core::controller::{AvoidanceController, CycleReport};
use avoidance_core::ranging::{CHANNEL_COUNT, ChannelId, EchoSample};
use avoidance_core::repl::commands::BenchControl;
use avoidance_core::repl::status::StatusSnapshot;

/// Simulated time since the bench powered up.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct SimInstant(Duration);

impl SimInstant {
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl ControlInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Observable side effect produced by the simulated hardware.
#[derive(Clone, Debug, PartialEq)]
pub enum HardwareEvent {
    Display { line1: String, line2: String },
    Tone { frequency_hz: u16, duration: Duration },
    Lamp(Indication),
    Drive { direction: Direction, magnitude: u8 },
    Steering(u8),
}

impl HardwareEvent {
    pub fn describe(&self) -> String {
        match self {
            HardwareEvent::Display { line1, line2 } => format!("lcd [{line1}] [{line2}]"),
            HardwareEvent::Tone {
                frequency_hz,
                duration,
            } => format!("tone {frequency_hz}Hz {}ms", duration.as_millis()),
            HardwareEvent::Lamp(Indication::Safe) => "lamp safe".to_string(),
            HardwareEvent::Lamp(Indication::Warning) => "lamp warning".to_string(),
            HardwareEvent::Drive {
                direction: Direction::Coast,
                magnitude,
            } => format!("drive coast {magnitude}"),
            HardwareEvent::Drive {
                direction: Direction::Forward,
                magnitude,
            } => format!("drive forward {magnitude}"),
            HardwareEvent::Steering(degrees) => format!("servo {degrees}deg"),
        }
    }
}

/// Drive motor that remembers every write until drained.
#[derive(Debug, Default)]
pub struct SimDrive {
    pending: VecDeque<HardwareEvent>,
}

impl DriveActuator for SimDrive {
    fn set_speed(&mut self, direction: Direction, magnitude: u8) {
        self.pending.push_back(HardwareEvent::Drive {
            direction,
            magnitude,
        });
    }
}

/// Steering servo that remembers every write until drained.
#[derive(Debug, Default)]
pub struct SimServo {
    pending: VecDeque<HardwareEvent>,
}

impl SteeringActuator for SimServo {
    fn set_angle(&mut self, degrees: u8) {
        self.pending.push_back(HardwareEvent::Steering(degrees));
    }
}

/// Sensor head, operator controls, display and buzzer.
#[derive(Debug)]
pub struct SimPanel {
    echoes: [EchoSample; CHANNEL_COUNT],
    pressed: bool,
    throttle: u16,
    pending: VecDeque<HardwareEvent>,
}

impl SimPanel {
    fn new(idle_echo: EchoSample) -> Self {
        Self {
            echoes: [idle_echo; CHANNEL_COUNT],
            pressed: false,
            throttle: 0,
            pending: VecDeque::new(),
        }
    }
}

impl Ranger for SimPanel {
    fn trigger_and_measure(&mut self, channel: ChannelId) -> EchoSample {
        self.echoes[channel.as_index()]
    }
}

impl StatusDisplay for SimPanel {
    fn show_status(&mut self, line1: &str, line2: &str) {
        self.pending.push_back(HardwareEvent::Display {
            line1: line1.to_string(),
            line2: line2.to_string(),
        });
    }

    fn set_indication(&mut self, indication: Indication) {
        self.pending.push_back(HardwareEvent::Lamp(indication));
    }
}

impl AlertSink for SimPanel {
    fn emit(&mut self, frequency_hz: u16, duration: Duration) {
        self.pending.push_back(HardwareEvent::Tone {
            frequency_hz,
            duration,
        });
    }
}

impl ManualInput for SimPanel {
    fn read_throttle(&mut self) -> u16 {
        self.throttle
    }

    fn read_toggle(&mut self) -> bool {
        self.pressed
    }
}

pub type SimController = AvoidanceController<SimInstant, SimDrive, SimServo>;

/// Distance every channel reports until a `range` command changes it.
pub const IDLE_RANGE_CM: u16 = 300;

/// Controller wired to simulated hardware, advanced one period per cycle.
pub struct SimBench {
    controller: SimController,
    panel: SimPanel,
    now: SimInstant,
}

impl SimBench {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        let mut controller =
            SimController::new(config, SimDrive::default(), SimServo::default())?;
        let idle_echo = EchoSample::Echo(
            controller
                .sampler()
                .cm_to_latency(f32::from(IDLE_RANGE_CM)),
        );
        let mut panel = SimPanel::new(idle_echo);
        controller.start(&mut panel);
        let mut bench = Self {
            controller,
            panel,
            now: SimInstant::default(),
        };
        // Power up with the button released so the first press counts.
        bench.run_cycle();
        Ok(bench)
    }

    pub fn now(&self) -> SimInstant {
        self.now
    }

    pub fn controller(&self) -> &SimController {
        &self.controller
    }

    /// Takes the hardware activity observed since the previous drain.
    ///
    /// Panel output is listed ahead of actuator writes.
    pub fn drain_events(&mut self) -> Vec<HardwareEvent> {
        let mut events: Vec<HardwareEvent> = self.panel.pending.drain(..).collect();
        let (drive, steering) = self.controller.actuators_mut();
        events.extend(steering.pending.drain(..));
        events.extend(drive.pending.drain(..));
        events
    }
}

impl BenchControl for SimBench {
    fn set_toggle(&mut self, pressed: bool) {
        self.panel.pressed = pressed;
    }

    fn set_throttle(&mut self, raw: u16) {
        self.panel.throttle = raw;
    }

    fn set_echo(&mut self, channel: ChannelId, echo: EchoSample) {
        self.panel.echoes[channel.as_index()] = echo;
    }

    fn echo_for_cm(&self, centimeters: u16) -> EchoSample {
        EchoSample::Echo(
            self.controller
                .sampler()
                .cm_to_latency(f32::from(centimeters)),
        )
    }

    fn run_cycle(&mut self) -> CycleReport {
        let report = self.controller.run_cycle(self.now, &mut self.panel);
        self.now = self.now + CYCLE_PERIOD;
        report
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::capture(&self.controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avoidance_core::repl::commands::{CommandExecutor, CommandOutcome};
    use avoidance_core::signal::SignalEvent;
    use avoidance_core::supervisor::SupervisorState;

    fn executor() -> CommandExecutor<SimBench> {
        CommandExecutor::new(SimBench::new(ControllerConfig::default()).expect("valid config"))
    }

    #[test]
    fn start_up_banner_is_first_event() {
        let mut bench = SimBench::new(ControllerConfig::default()).expect("valid config");
        let events = bench.drain_events();
        assert_eq!(
            events.first(),
            Some(&HardwareEvent::Display {
                line1: "Initializing...".to_string(),
                line2: String::new(),
            })
        );
    }

    #[test]
    fn front_obstacle_session_stops_the_motor() {
        let mut executor = executor();
        assert_eq!(
            executor.execute("toggle"),
            Ok(CommandOutcome::Toggled(SupervisorState::Enabled))
        );
        executor.execute("throttle 1023").expect("throttle accepted");
        executor.execute("step").expect("step accepted");
        executor.execute("range front 20").expect("range accepted");

        let Ok(CommandOutcome::Stepped(summary)) = executor.execute("step 120") else {
            panic!("step should succeed");
        };
        assert_eq!(summary.edges, 1);
        assert_eq!(summary.last.event, SignalEvent::None);
        assert_eq!(summary.last.command.speed, 0);

        let events = executor.bench_mut().drain_events();
        assert!(events.contains(&HardwareEvent::Tone {
            frequency_hz: 1_000,
            duration: Duration::from_millis(200),
        }));
        assert!(events.contains(&HardwareEvent::Steering(90)));
    }

    #[test]
    fn clock_advances_one_period_per_cycle() {
        let mut executor = executor();
        let before = executor.bench().now().elapsed();
        executor.execute("step 4").expect("step accepted");
        assert_eq!(executor.bench().now().elapsed(), before + CYCLE_PERIOD * 4);
    }
}
