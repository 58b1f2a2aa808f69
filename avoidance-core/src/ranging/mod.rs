//! Echo-latency to distance conversion with range filtering.
//!
//! A [`DistanceSampler`] turns the raw echo latency reported by a [`Ranger`]
//! into a bounded [`Reading`]. Latencies that time out or decode to a distance
//! outside the trusted window are replaced by a substitute value chosen by the
//! configured [`SensorFailurePolicy`]; the fault is kept on the reading so
//! telemetry can still report it.

use core::time::Duration;

use crate::capabilities::Ranger;
use crate::config::RangeConfig;

/// Number of ranging channels fitted to the vehicle.
pub const CHANNEL_COUNT: usize = 3;

/// Identifier for the ultrasonic channels mounted on the chassis.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelId {
    Front,
    Left,
    Right,
}

impl ChannelId {
    /// Deterministic index for lookups into [`ALL_CHANNELS`].
    pub const fn as_index(self) -> usize {
        match self {
            ChannelId::Front => 0,
            ChannelId::Left => 1,
            ChannelId::Right => 2,
        }
    }

    /// Attempts to construct a [`ChannelId`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ChannelId::Front),
            1 => Some(ChannelId::Left),
            2 => Some(ChannelId::Right),
            _ => None,
        }
    }

    /// Short label printed on the display (`D1`..`D3`).
    pub const fn display_label(self) -> &'static str {
        match self {
            ChannelId::Front => "D1",
            ChannelId::Left => "D2",
            ChannelId::Right => "D3",
        }
    }

    /// Lower-case name used by the REPL and logs.
    pub const fn name(self) -> &'static str {
        match self {
            ChannelId::Front => "front",
            ChannelId::Left => "left",
            ChannelId::Right => "right",
        }
    }
}

/// Every channel in sampling order.
pub const ALL_CHANNELS: [ChannelId; CHANNEL_COUNT] =
    [ChannelId::Front, ChannelId::Left, ChannelId::Right];

/// Raw result of a single trigger/echo exchange.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EchoSample {
    /// Echo pulse width (round-trip latency).
    Echo(Duration),
    /// No echo arrived within the bounded wait.
    Timeout,
}

/// Why a reading was substituted instead of measured.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RangeFault {
    Timeout,
    OutOfRange,
}

/// Substitute chosen when a channel cannot be trusted.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SensorFailurePolicy {
    /// Report the maximum range, i.e. treat the path as clear.
    #[default]
    FailOpen,
    /// Report the minimum range, i.e. treat the path as blocked.
    FailClosed,
}

/// Filtered distance for one channel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    pub channel: ChannelId,
    pub centimeters: f32,
    pub fault: Option<RangeFault>,
}

impl Reading {
    pub const fn new(channel: ChannelId, centimeters: f32) -> Self {
        Self {
            channel,
            centimeters,
            fault: None,
        }
    }

    const fn substituted(channel: ChannelId, centimeters: f32, fault: RangeFault) -> Self {
        Self {
            channel,
            centimeters,
            fault: Some(fault),
        }
    }

    /// Returns `true` when the value is a substitute rather than a measurement.
    pub const fn is_substituted(&self) -> bool {
        self.fault.is_some()
    }
}

/// Stateless converter from echo samples to readings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DistanceSampler {
    config: RangeConfig,
}

impl DistanceSampler {
    pub const fn new(config: RangeConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &RangeConfig {
        &self.config
    }

    /// Triggers `channel` on the ranger and converts the echo.
    pub fn measure<R: Ranger + ?Sized>(&self, ranger: &mut R, channel: ChannelId) -> Reading {
        let sample = ranger.trigger_and_measure(channel);
        self.convert(channel, sample)
    }

    /// Converts a raw sample without touching hardware.
    pub fn convert(&self, channel: ChannelId, sample: EchoSample) -> Reading {
        let latency = match sample {
            EchoSample::Echo(latency) if latency <= self.config.echo_timeout => latency,
            EchoSample::Echo(_) | EchoSample::Timeout => {
                return Reading::substituted(channel, self.substitute_cm(), RangeFault::Timeout);
            }
        };

        let distance = self.latency_to_cm(latency);
        if distance < self.config.min_cm || distance > self.config.max_cm {
            Reading::substituted(channel, self.substitute_cm(), RangeFault::OutOfRange)
        } else {
            Reading::new(channel, distance)
        }
    }

    /// Round-trip latency to one-way distance.
    pub fn latency_to_cm(&self, latency: Duration) -> f32 {
        let micros = latency.as_secs_f32() * 1_000_000.0;
        micros * self.config.sound_cm_per_us / 2.0
    }

    /// One-way distance to the round-trip latency a ranger would report.
    pub fn cm_to_latency(&self, centimeters: f32) -> Duration {
        let seconds = centimeters * 2.0 / self.config.sound_cm_per_us / 1_000_000.0;
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::MAX)
    }

    fn substitute_cm(&self) -> f32 {
        match self.config.failure_policy {
            SensorFailurePolicy::FailOpen => self.config.max_cm,
            SensorFailurePolicy::FailClosed => self.config.min_cm,
        }
    }
}

impl Default for DistanceSampler {
    fn default() -> Self {
        Self::new(RangeConfig::default())
    }
}
