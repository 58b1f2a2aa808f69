//! Edge-triggered obstacle acknowledgments.
//!
//! The signaler compares this cycle's blocked flag with the previous one and
//! emits at most one event per transition. A persisting obstacle stays silent
//! until it clears.

use core::time::Duration;

use crate::capabilities::AlertSink;
use crate::config::SignalConfig;

/// Transition detected between two consecutive cycles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignalEvent {
    None,
    ObstacleAppeared,
    ObstacleCleared,
}

impl SignalEvent {
    /// Returns `true` for the two transition variants.
    pub const fn is_edge(self) -> bool {
        !matches!(self, SignalEvent::None)
    }
}

/// Buzzer tone parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: u16,
    pub duration: Duration,
}

impl ToneSpec {
    pub const fn new(frequency_hz: u16, duration: Duration) -> Self {
        Self {
            frequency_hz,
            duration,
        }
    }
}

/// The single acknowledgment associated with a signal edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Acknowledgment {
    pub tone: ToneSpec,
    pub banner: &'static str,
}

/// Maps blocked-flag transitions to acknowledgments.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EdgeSignaler {
    config: SignalConfig,
}

impl EdgeSignaler {
    pub const fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Classifies the transition between the previous and current cycle.
    pub const fn on_cycle(previously_blocked: bool, blocked: bool) -> SignalEvent {
        match (previously_blocked, blocked) {
            (false, true) => SignalEvent::ObstacleAppeared,
            (true, false) => SignalEvent::ObstacleCleared,
            _ => SignalEvent::None,
        }
    }

    /// Returns the acknowledgment for `event`, if it is an edge.
    pub const fn acknowledgment(&self, event: SignalEvent) -> Option<Acknowledgment> {
        match event {
            SignalEvent::None => None,
            SignalEvent::ObstacleAppeared => Some(Acknowledgment {
                tone: self.config.appeared,
                banner: "Obstacle Detected!",
            }),
            SignalEvent::ObstacleCleared => Some(Acknowledgment {
                tone: self.config.cleared,
                banner: "Obstacle Cleared!",
            }),
        }
    }

    /// Plays the tone for `event` and returns its acknowledgment.
    pub fn acknowledge<A: AlertSink + ?Sized>(
        &self,
        event: SignalEvent,
        alert: &mut A,
    ) -> Option<Acknowledgment> {
        let ack = self.acknowledgment(event)?;
        alert.emit(ack.tone.frequency_hz, ack.tone.duration);
        Some(ack)
    }
}

impl Default for EdgeSignaler {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}
