//! Telemetry event catalog and ring-buffer recorder shared by firmware and
//! host targets.
//!
//! Event kinds encode to compact numeric codes so the firmware can log them
//! as plain integers and the emulator can decode them back for its
//! transcripts. Payloads carry the extra context (readings, speeds, elapsed
//! time) without allocating.

use core::{convert::TryFrom, fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::classifier::{ObstacleState, ReadingSet};
use crate::clock::ControlInstant;
use crate::motor::OverrideKind;
use crate::ranging::{ChannelId, RangeFault};

/// Identifier used when tracking emitted telemetry events.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Discriminated telemetry events emitted by the control cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    SystemEnabled,
    SystemDisabled,
    ObstacleAppeared(ObstacleState),
    ObstacleCleared,
    OverrideEngaged(OverrideKind),
    OverrideReleased,
    RampComplete,
    SensorFault(ChannelId),
    ToggleBounce,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::SystemEnabled => f.write_str("system-enabled"),
            TelemetryEventKind::SystemDisabled => f.write_str("system-disabled"),
            TelemetryEventKind::ObstacleAppeared(state) => write!(f, "obstacle-appeared {state}"),
            TelemetryEventKind::ObstacleCleared => f.write_str("obstacle-cleared"),
            TelemetryEventKind::OverrideEngaged(kind) => write!(f, "override-engaged {kind}"),
            TelemetryEventKind::OverrideReleased => f.write_str("override-released"),
            TelemetryEventKind::RampComplete => f.write_str("ramp-complete"),
            TelemetryEventKind::SensorFault(channel) => {
                write!(f, "sensor-fault {}", channel.name())
            }
            TelemetryEventKind::ToggleBounce => f.write_str("toggle-bounce"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const SYSTEM_ENABLED_CODE: u16 = 0x0000;
    const SYSTEM_DISABLED_CODE: u16 = 0x0001;
    const TOGGLE_BOUNCE_CODE: u16 = 0x0002;
    const OBSTACLE_APPEARED_BASE: u16 = 0x0010;
    const OBSTACLE_CLEARED_CODE: u16 = 0x0013;
    const OVERRIDE_ENGAGED_BASE: u16 = 0x0018;
    const OVERRIDE_RELEASED_CODE: u16 = 0x001A;
    const RAMP_COMPLETE_CODE: u16 = 0x001B;
    const SENSOR_FAULT_BASE: u16 = 0x0020;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::SystemEnabled => Self::SYSTEM_ENABLED_CODE,
            TelemetryEventKind::SystemDisabled => Self::SYSTEM_DISABLED_CODE,
            TelemetryEventKind::ToggleBounce => Self::TOGGLE_BOUNCE_CODE,
            TelemetryEventKind::ObstacleAppeared(state) => {
                Self::OBSTACLE_APPEARED_BASE + state_index(state)
            }
            TelemetryEventKind::ObstacleCleared => Self::OBSTACLE_CLEARED_CODE,
            TelemetryEventKind::OverrideEngaged(kind) => {
                Self::OVERRIDE_ENGAGED_BASE + override_index(kind)
            }
            TelemetryEventKind::OverrideReleased => Self::OVERRIDE_RELEASED_CODE,
            TelemetryEventKind::RampComplete => Self::RAMP_COMPLETE_CODE,
            TelemetryEventKind::SensorFault(channel) => {
                Self::SENSOR_FAULT_BASE + channel_index(channel)
            }
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant into a telemetry event, falling back to [`Custom`].
    ///
    /// [`Custom`]: TelemetryEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::SYSTEM_ENABLED_CODE => TelemetryEventKind::SystemEnabled,
            Self::SYSTEM_DISABLED_CODE => TelemetryEventKind::SystemDisabled,
            Self::TOGGLE_BOUNCE_CODE => TelemetryEventKind::ToggleBounce,
            Self::OBSTACLE_CLEARED_CODE => TelemetryEventKind::ObstacleCleared,
            Self::OVERRIDE_RELEASED_CODE => TelemetryEventKind::OverrideReleased,
            Self::RAMP_COMPLETE_CODE => TelemetryEventKind::RampComplete,
            value
                if (Self::OBSTACLE_APPEARED_BASE..Self::OBSTACLE_CLEARED_CODE)
                    .contains(&value) =>
            {
                state_from_index(value - Self::OBSTACLE_APPEARED_BASE)
                    .map_or(TelemetryEventKind::Custom(value), |state| {
                        TelemetryEventKind::ObstacleAppeared(state)
                    })
            }
            value
                if (Self::OVERRIDE_ENGAGED_BASE..Self::OVERRIDE_RELEASED_CODE)
                    .contains(&value) =>
            {
                u8::try_from(value - Self::OVERRIDE_ENGAGED_BASE)
                    .ok()
                    .and_then(OverrideKind::from_raw)
                    .map_or(TelemetryEventKind::Custom(value), |kind| {
                        TelemetryEventKind::OverrideEngaged(kind)
                    })
            }
            value if (Self::SENSOR_FAULT_BASE..Self::SENSOR_FAULT_BASE + 4).contains(&value) => {
                ChannelId::from_index(usize::from(value - Self::SENSOR_FAULT_BASE))
                    .map_or(TelemetryEventKind::Custom(value), |channel| {
                        TelemetryEventKind::SensorFault(channel)
                    })
            }
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Distances that produced a classification edge.
    Readings(ReadingsTelemetry),
    /// Drive speed around an override transition.
    Speed(SpeedTelemetry),
    /// Channel fault and the value substituted for it.
    Fault(FaultTelemetry),
    /// Time since the last accepted toggle edge.
    Toggle(ToggleTelemetry),
}

impl TelemetryPayload {
    /// Convenience constructor when no payload data is needed.
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

/// Readings snapshot rounded to whole centimetres.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadingsTelemetry {
    pub front_cm: u16,
    pub left_cm: u16,
    pub right_cm: u16,
}

impl ReadingsTelemetry {
    #[must_use]
    pub fn from_set(readings: &ReadingSet) -> Self {
        Self {
            front_cm: whole_centimeters(readings.front.centimeters),
            left_cm: whole_centimeters(readings.left.centimeters),
            right_cm: whole_centimeters(readings.right.centimeters),
        }
    }
}

/// Drive speed payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpeedTelemetry {
    pub speed: u8,
    pub elapsed_since_override: Option<Duration>,
}

impl SpeedTelemetry {
    #[must_use]
    pub const fn new(speed: u8, elapsed_since_override: Option<Duration>) -> Self {
        Self {
            speed,
            elapsed_since_override,
        }
    }
}

/// Sensor fault payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FaultTelemetry {
    pub fault: RangeFault,
    pub substituted_cm: u16,
}

/// Toggle bounce payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ToggleTelemetry {
    pub since_last_edge: Option<Duration>,
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    override_started_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: ControlInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            override_started_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier that the next recorded event will receive.
    pub fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Records a supervisor state change.
    pub fn record_system(&mut self, enabled: bool, timestamp: TInstant) -> EventId {
        let event = if enabled {
            TelemetryEventKind::SystemEnabled
        } else {
            self.override_started_at = None;
            TelemetryEventKind::SystemDisabled
        };
        self.record(event, TelemetryPayload::none(), timestamp)
    }

    /// Records a classification edge with the readings that caused it.
    pub fn record_obstacle_edge(
        &mut self,
        state: ObstacleState,
        readings: &ReadingSet,
        timestamp: TInstant,
    ) -> EventId {
        let event = if state.is_blocked() {
            TelemetryEventKind::ObstacleAppeared(state)
        } else {
            TelemetryEventKind::ObstacleCleared
        };
        let payload = TelemetryPayload::Readings(ReadingsTelemetry::from_set(readings));
        self.record(event, payload, timestamp)
    }

    /// Records the override engaging (or escalating) at the given speed.
    pub fn record_override_engaged(
        &mut self,
        kind: OverrideKind,
        speed: u8,
        timestamp: TInstant,
    ) -> EventId {
        self.override_started_at = Some(timestamp);
        self.record(
            TelemetryEventKind::OverrideEngaged(kind),
            TelemetryPayload::Speed(SpeedTelemetry::new(speed, None)),
            timestamp,
        )
    }

    /// Records the override releasing and how long it was held.
    pub fn record_override_released(&mut self, speed: u8, timestamp: TInstant) -> EventId {
        let elapsed = self.elapsed_since_override(timestamp);
        self.override_started_at = None;
        self.record(
            TelemetryEventKind::OverrideReleased,
            TelemetryPayload::Speed(SpeedTelemetry::new(speed, elapsed)),
            timestamp,
        )
    }

    /// Records the ramp reaching its target.
    pub fn record_ramp_complete(&mut self, speed: u8, timestamp: TInstant) -> EventId {
        let elapsed = self.elapsed_since_override(timestamp);
        self.record(
            TelemetryEventKind::RampComplete,
            TelemetryPayload::Speed(SpeedTelemetry::new(speed, elapsed)),
            timestamp,
        )
    }

    /// Records a substituted reading.
    pub fn record_sensor_fault(
        &mut self,
        channel: ChannelId,
        fault: RangeFault,
        substituted_cm: f32,
        timestamp: TInstant,
    ) -> EventId {
        let payload = TelemetryPayload::Fault(FaultTelemetry {
            fault,
            substituted_cm: whole_centimeters(substituted_cm),
        });
        self.record(TelemetryEventKind::SensorFault(channel), payload, timestamp)
    }

    /// Records a toggle edge swallowed by the debouncer.
    pub fn record_toggle_bounce(
        &mut self,
        since_last_edge: Option<Duration>,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::ToggleBounce,
            TelemetryPayload::Toggle(ToggleTelemetry { since_last_edge }),
            timestamp,
        )
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }

    fn elapsed_since_override(&self, timestamp: TInstant) -> Option<Duration> {
        self.override_started_at
            .map(|start| timestamp.saturating_duration_since(start))
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: ControlInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_centimeters(centimeters: f32) -> u16 {
    // `as` saturates and maps NaN to zero.
    (centimeters + 0.5) as u16
}

const fn state_index(state: ObstacleState) -> u16 {
    match state {
        ObstacleState::Clear => 0,
        ObstacleState::FrontBlocked => 1,
        ObstacleState::SideBlocked => 2,
    }
}

const fn override_index(kind: OverrideKind) -> u16 {
    match kind {
        OverrideKind::Front => 0,
        OverrideKind::Side => 1,
    }
}

const fn channel_index(channel: ChannelId) -> u16 {
    match channel {
        ChannelId::Front => 0,
        ChannelId::Left => 1,
        ChannelId::Right => 2,
    }
}

fn state_from_index(index: u16) -> Option<ObstacleState> {
    match index {
        0 => Some(ObstacleState::Clear),
        1 => Some(ObstacleState::FrontBlocked),
        2 => Some(ObstacleState::SideBlocked),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::MockInstant;
    use crate::ranging::Reading;

    #[test]
    fn event_codes_round_trip() {
        let fixtures = [
            (TelemetryEventKind::SystemEnabled, 0x0000),
            (TelemetryEventKind::SystemDisabled, 0x0001),
            (TelemetryEventKind::ToggleBounce, 0x0002),
            (
                TelemetryEventKind::ObstacleAppeared(ObstacleState::FrontBlocked),
                0x0011,
            ),
            (
                TelemetryEventKind::ObstacleAppeared(ObstacleState::SideBlocked),
                0x0012,
            ),
            (TelemetryEventKind::ObstacleCleared, 0x0013),
            (TelemetryEventKind::OverrideEngaged(OverrideKind::Front), 0x0018),
            (TelemetryEventKind::OverrideEngaged(OverrideKind::Side), 0x0019),
            (TelemetryEventKind::OverrideReleased, 0x001A),
            (TelemetryEventKind::RampComplete, 0x001B),
            (TelemetryEventKind::SensorFault(ChannelId::Right), 0x0022),
        ];

        for (event, code) in fixtures {
            assert_eq!(event.to_raw(), code);
            assert_eq!(TelemetryEventKind::from_raw(code), event);
        }
    }

    #[test]
    fn unknown_codes_decode_as_custom() {
        assert_eq!(
            TelemetryEventKind::from_raw(0x0023),
            TelemetryEventKind::Custom(0x0023)
        );
        assert_eq!(
            TelemetryEventKind::from_raw(0x7F00),
            TelemetryEventKind::Custom(0x7F00)
        );
    }

    #[test]
    fn ramp_completion_reports_elapsed_since_override() {
        let mut recorder = TelemetryRecorder::<MockInstant>::new();
        let engaged = recorder.record_override_engaged(
            OverrideKind::Front,
            255,
            MockInstant::millis(1_000),
        );
        assert_eq!(engaged, 0);

        let id = recorder.record_ramp_complete(0, MockInstant::millis(6_000));
        assert_eq!(id, 1);

        let record = recorder.latest().copied().unwrap();
        assert_eq!(record.event, TelemetryEventKind::RampComplete);
        match record.details {
            TelemetryPayload::Speed(details) => {
                assert_eq!(details.speed, 0);
                let elapsed = details.elapsed_since_override.expect("missing elapsed");
                assert_eq!(elapsed.as_millis(), 5_000);
            }
            _ => panic!("expected speed payload"),
        }
    }

    #[test]
    fn release_clears_override_start() {
        let mut recorder = TelemetryRecorder::<MockInstant>::new();
        recorder.record_override_engaged(OverrideKind::Side, 200, MockInstant::millis(0));
        recorder.record_override_released(100, MockInstant::millis(400));
        recorder.record_ramp_complete(100, MockInstant::millis(500));

        let record = recorder.latest().copied().unwrap();
        match record.details {
            TelemetryPayload::Speed(details) => assert!(details.elapsed_since_override.is_none()),
            _ => panic!("expected speed payload"),
        }
    }

    #[test]
    fn obstacle_edge_captures_rounded_readings() {
        let mut recorder = TelemetryRecorder::<MockInstant>::new();
        let readings = ReadingSet::new(
            Reading::new(ChannelId::Front, 19.6),
            Reading::new(ChannelId::Left, 100.0),
            Reading::new(ChannelId::Right, 400.0),
        );
        recorder.record_obstacle_edge(ObstacleState::FrontBlocked, &readings, MockInstant(0));

        let record = recorder.latest().copied().unwrap();
        assert_eq!(
            record.event,
            TelemetryEventKind::ObstacleAppeared(ObstacleState::FrontBlocked)
        );
        assert_eq!(
            record.details,
            TelemetryPayload::Readings(ReadingsTelemetry {
                front_cm: 20,
                left_cm: 100,
                right_cm: 400,
            })
        );
    }

    #[test]
    fn ring_keeps_most_recent_entries() {
        let mut recorder = TelemetryRecorder::<MockInstant, 4>::new();
        for tick in 0..6 {
            recorder.record_toggle_bounce(None, MockInstant(tick));
        }
        assert_eq!(recorder.len(), 4);
        let ids: heapless::Vec<EventId, 4> = recorder.oldest_first().map(|record| record.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);
    }
}
