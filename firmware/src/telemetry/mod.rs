//! Logging helpers for the control task.
//!
//! The core keeps its own telemetry ring; this module forwards new records
//! from that ring to defmt on target (stdout on host) and mirrors display
//! writes, so a probe session shows what the vehicle decided and why.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt;

use avoidance_core::telemetry::{
    EventId, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};

use crate::clock::FirmwareInstant;
use crate::status::CycleStatus;

/// Flattened payload used in log lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Detail {
    None,
    Readings { front: u16, left: u16, right: u16 },
    Speed { speed: u8, elapsed_ms: Option<u64> },
    Fault { substituted_cm: u16 },
    Bounce { since_ms: Option<u64> },
}

impl From<&TelemetryPayload> for Detail {
    fn from(payload: &TelemetryPayload) -> Self {
        match payload {
            TelemetryPayload::None => Detail::None,
            TelemetryPayload::Readings(readings) => Detail::Readings {
                front: readings.front_cm,
                left: readings.left_cm,
                right: readings.right_cm,
            },
            TelemetryPayload::Speed(speed) => Detail::Speed {
                speed: speed.speed,
                elapsed_ms: speed.elapsed_since_override.map(millis),
            },
            TelemetryPayload::Fault(fault) => Detail::Fault {
                substituted_cm: fault.substituted_cm,
            },
            TelemetryPayload::Toggle(toggle) => Detail::Bounce {
                since_ms: toggle.since_last_edge.map(millis),
            },
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detail::None => Ok(()),
            Detail::Readings { front, left, right } => {
                write!(f, "front={front}cm left={left}cm right={right}cm")
            }
            Detail::Speed {
                speed,
                elapsed_ms: Some(elapsed),
            } => write!(f, "speed={speed} after={elapsed}ms"),
            Detail::Speed {
                speed,
                elapsed_ms: None,
            } => write!(f, "speed={speed}"),
            Detail::Fault { substituted_cm } => write!(f, "substituted={substituted_cm}cm"),
            Detail::Bounce { since_ms: Some(since) } => write!(f, "since-edge={since}ms"),
            Detail::Bounce { since_ms: None } => f.write_str("since-edge=n/a"),
        }
    }
}

fn millis(duration: core::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Tracks which ring entries have already been logged.
#[derive(Debug, Default)]
pub struct TelemetryForwarder {
    next_id: EventId,
}

impl TelemetryForwarder {
    pub const fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Logs every record newer than the previous call and returns how many
    /// were emitted. Records that already rotated out of the ring are lost.
    pub fn forward<const N: usize>(
        &mut self,
        recorder: &TelemetryRecorder<FirmwareInstant, N>,
    ) -> usize {
        let mut emitted = 0;
        for record in recorder
            .oldest_first()
            .filter(|record| record.id >= self.next_id)
        {
            log_record(record);
            emitted += 1;
        }
        self.next_id = recorder.next_event_id();
        emitted
    }
}

fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    emit_log(
        record.id,
        record.event.to_raw(),
        record.timestamp.as_micros(),
        &record.event,
        Detail::from(&record.details),
    );
}

#[cfg(target_os = "none")]
fn emit_log<E: fmt::Display>(id: EventId, code: u16, timestamp_us: u64, event: &E, detail: Detail) {
    defmt::info!(
        "telemetry:avoid #{} {=u16:#x} {} t={}us {}",
        id,
        code,
        defmt::Display2Format(event),
        timestamp_us,
        detail
    );
}

#[cfg(not(target_os = "none"))]
fn emit_log<E: fmt::Display>(id: EventId, code: u16, timestamp_us: u64, event: &E, detail: Detail) {
    println!("telemetry:avoid #{id} {code:#x} {event} t={timestamp_us}us {detail}");
}

/// Mirrors a display write to the log.
#[cfg(target_os = "none")]
pub fn log_display(line1: &str, line2: &str) {
    defmt::debug!("display [{=str}] [{=str}]", line1, line2);
}

#[cfg(not(target_os = "none"))]
pub fn log_display(line1: &str, line2: &str) {
    println!("display [{line1}] [{line2}]");
}

/// Reports a display transfer that failed; the cycle carries on regardless.
#[cfg(target_os = "none")]
pub fn log_display_fault() {
    defmt::warn!("display write failed");
}

/// Periodic summary of the latest cycle.
#[cfg(target_os = "none")]
pub fn log_heartbeat(status: &CycleStatus) {
    defmt::info!(
        "status cycles={} enabled={} lock={} speed={} front={}cm left={}cm right={}cm edges={}",
        status.cycles,
        status.enabled,
        status.lock_code,
        status.speed,
        status.front_cm,
        status.left_cm,
        status.right_cm,
        status.edges
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_heartbeat(status: &CycleStatus) {
    println!(
        "status cycles={} enabled={} lock={} speed={} front={}cm left={}cm right={}cm edges={}",
        status.cycles,
        status.enabled,
        status.lock_code,
        status.speed,
        status.front_cm,
        status.left_cm,
        status.right_cm,
        status.edges
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use avoidance_core::classifier::{ObstacleState, ReadingSet};
    use avoidance_core::ranging::{ChannelId, Reading};
    use embassy_time::Instant;

    fn micros(value: u64) -> FirmwareInstant {
        FirmwareInstant::from(Instant::from_micros(value))
    }

    #[test]
    fn forwards_each_record_once() {
        let mut recorder: TelemetryRecorder<FirmwareInstant, 8> = TelemetryRecorder::new();
        let mut forwarder = TelemetryForwarder::new();

        recorder.record_system(true, micros(100));
        let readings = ReadingSet::new(
            Reading::new(ChannelId::Front, 20.0),
            Reading::new(ChannelId::Left, 100.0),
            Reading::new(ChannelId::Right, 100.0),
        );
        recorder.record_obstacle_edge(ObstacleState::FrontBlocked, &readings, micros(200));
        assert_eq!(forwarder.forward(&recorder), 2);
        assert_eq!(forwarder.forward(&recorder), 0);

        recorder.record_ramp_complete(0, micros(5_200));
        assert_eq!(forwarder.forward(&recorder), 1);
    }

    #[test]
    fn flattens_payloads_for_logging() {
        let detail = Detail::Readings {
            front: 20,
            left: 100,
            right: 100,
        };
        let mut rendered = heapless::String::<64>::new();
        fmt::write(&mut rendered, format_args!("{detail}")).expect("fits");
        assert_eq!(rendered.as_str(), "front=20cm left=100cm right=100cm");
        assert_eq!(Detail::from(&TelemetryPayload::None), Detail::None);
    }
}
