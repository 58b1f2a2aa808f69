#![allow(dead_code)]

use core::ops::Add;
use core::time::Duration;

use avoidance_core::capabilities::{
    AlertSink, Direction, DriveActuator, Indication, ManualInput, Ranger, StatusDisplay,
    SteeringActuator,
};
use avoidance_core::clock::ControlInstant;
use avoidance_core::config::{CYCLE_PERIOD, ControllerConfig};
use avoidance_core::controller::{AvoidanceController, CycleReport};
use avoidance_core::ranging::{ChannelId, DistanceSampler, EchoSample};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct MockInstant(pub u64);

impl MockInstant {
    pub fn millis(value: u64) -> Self {
        Self(value * 1_000)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX))
    }
}

impl ControlInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Default)]
pub struct DriveLog {
    pub writes: Vec<(Direction, u8)>,
}

impl DriveActuator for DriveLog {
    fn set_speed(&mut self, direction: Direction, magnitude: u8) {
        self.writes.push((direction, magnitude));
    }
}

#[derive(Default)]
pub struct ServoLog {
    pub angles: Vec<u8>,
}

impl SteeringActuator for ServoLog {
    fn set_angle(&mut self, degrees: u8) {
        self.angles.push(degrees);
    }
}

/// Simulated operator panel and sensor head.
pub struct BenchPanel {
    pub echoes: [EchoSample; 3],
    pub pressed: bool,
    pub throttle: u16,
    pub triggers: usize,
    pub screens: Vec<(String, String)>,
    pub tones: Vec<(u16, Duration)>,
    pub indications: Vec<Indication>,
}

impl BenchPanel {
    /// Every channel reports a distant echo.
    pub fn open_road() -> Self {
        let mut panel = Self {
            echoes: [EchoSample::Timeout; 3],
            pressed: false,
            throttle: 0,
            triggers: 0,
            screens: Vec::new(),
            tones: Vec::new(),
            indications: Vec::new(),
        };
        for channel in [ChannelId::Front, ChannelId::Left, ChannelId::Right] {
            panel.set_cm(channel, 300.0);
        }
        panel
    }

    pub fn set_cm(&mut self, channel: ChannelId, centimeters: f32) {
        let latency = DistanceSampler::default().cm_to_latency(centimeters);
        self.echoes[channel.as_index()] = EchoSample::Echo(latency);
    }

    pub fn showed(&self, line1: &str, line2: &str) -> bool {
        self.screens
            .iter()
            .any(|(first, second)| first == line1 && second == line2)
    }
}

impl Ranger for BenchPanel {
    fn trigger_and_measure(&mut self, channel: ChannelId) -> EchoSample {
        self.triggers += 1;
        self.echoes[channel.as_index()]
    }
}

impl StatusDisplay for BenchPanel {
    fn show_status(&mut self, line1: &str, line2: &str) {
        self.screens.push((line1.to_owned(), line2.to_owned()));
    }

    fn set_indication(&mut self, indication: Indication) {
        self.indications.push(indication);
    }
}

impl AlertSink for BenchPanel {
    fn emit(&mut self, frequency_hz: u16, duration: Duration) {
        self.tones.push((frequency_hz, duration));
    }
}

impl ManualInput for BenchPanel {
    fn read_throttle(&mut self) -> u16 {
        self.throttle
    }

    fn read_toggle(&mut self) -> bool {
        self.pressed
    }
}

pub type Controller = AvoidanceController<MockInstant, DriveLog, ServoLog>;

/// Controller, panel, and a clock advanced one period per cycle.
pub struct Bench {
    pub controller: Controller,
    pub panel: BenchPanel,
    pub now_ms: u64,
}

impl Bench {
    pub fn new() -> Self {
        let mut controller = Controller::new(
            ControllerConfig::default(),
            DriveLog::default(),
            ServoLog::default(),
        )
        .expect("default config is valid");
        let mut panel = BenchPanel::open_road();
        controller.start(&mut panel);
        Self {
            controller,
            panel,
            now_ms: 0,
        }
    }

    /// Powers up and presses the toggle once, leaving the system enabled.
    pub fn enabled() -> Self {
        let mut bench = Self::new();
        bench.cycle();
        bench.press();
        bench
    }

    pub fn cycle(&mut self) -> CycleReport {
        let report = self
            .controller
            .run_cycle(MockInstant::millis(self.now_ms), &mut self.panel);
        self.now_ms += u64::try_from(CYCLE_PERIOD.as_millis()).unwrap_or(50);
        report
    }

    /// One cycle held, one released. Returns the report of the held cycle.
    pub fn press(&mut self) -> CycleReport {
        self.panel.pressed = true;
        let report = self.cycle();
        self.panel.pressed = false;
        self.cycle();
        report
    }

    /// Waits out the toggle settle window.
    pub fn settle(&mut self) {
        for _ in 0..8 {
            self.cycle();
        }
    }

    pub fn drive_writes(&self) -> &[(Direction, u8)] {
        &self.controller.arbiter().drive().writes
    }

    pub fn angles(&self) -> &[u8] {
        &self.controller.arbiter().steering().angles
    }
}
