//! HC-SR04 ultrasonic rangers.

use core::time::Duration;

use avoidance_core::capabilities::Ranger;
use avoidance_core::ranging::{CHANNEL_COUNT, ChannelId, EchoSample};
use embassy_stm32::gpio::{Input, Output};
use embassy_time::{Duration as EmbassyDuration, Instant, block_for};

const TRIGGER_SETTLE: EmbassyDuration = EmbassyDuration::from_micros(2);
const TRIGGER_PULSE: EmbassyDuration = EmbassyDuration::from_micros(10);

/// One trigger/echo pair.
pub struct Sonar<'d> {
    trigger: Output<'d>,
    echo: Input<'d>,
}

impl<'d> Sonar<'d> {
    pub fn new(trigger: Output<'d>, echo: Input<'d>) -> Self {
        Self { trigger, echo }
    }

    /// Fires one ping and busy-waits for the echo, giving up once `timeout`
    /// has passed since the trigger.
    fn ping(&mut self, timeout: EmbassyDuration) -> EchoSample {
        self.trigger.set_low();
        block_for(TRIGGER_SETTLE);
        self.trigger.set_high();
        block_for(TRIGGER_PULSE);
        self.trigger.set_low();

        let deadline = Instant::now() + timeout;
        while self.echo.is_low() {
            if Instant::now() >= deadline {
                return EchoSample::Timeout;
            }
        }

        let rising = Instant::now();
        while self.echo.is_high() {
            if Instant::now() >= deadline {
                return EchoSample::Timeout;
            }
        }

        let width = Instant::now().saturating_duration_since(rising);
        EchoSample::Echo(Duration::from_micros(width.as_micros()))
    }
}

/// The three rangers, indexed by channel.
pub struct SonarArray<'d> {
    sonars: [Sonar<'d>; CHANNEL_COUNT],
    timeout: EmbassyDuration,
}

impl<'d> SonarArray<'d> {
    pub fn new(sonars: [Sonar<'d>; CHANNEL_COUNT], timeout: Duration) -> Self {
        let micros = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        Self {
            sonars,
            timeout: EmbassyDuration::from_micros(micros),
        }
    }
}

impl Ranger for SonarArray<'_> {
    fn trigger_and_measure(&mut self, channel: ChannelId) -> EchoSample {
        let timeout = self.timeout;
        self.sonars[channel.as_index()].ping(timeout)
    }
}
