#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Latest-cycle status shared with the heartbeat logger.
//!
//! Atomics keep the figures readable from any context without a lock.

use avoidance_core::controller::CycleReport;
use avoidance_core::motor::{LockState, OverrideKind};
use avoidance_core::telemetry::ReadingsTelemetry;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

/// Lock code stored when no override is engaged.
const LOCK_NONE: u8 = 0;

static CYCLES: AtomicU32 = AtomicU32::new(0);
static EDGES: AtomicU32 = AtomicU32::new(0);
static ENABLED: AtomicBool = AtomicBool::new(false);
/// `LOCK_NONE`, or the override kind's raw code plus one.
static LOCK: AtomicU8 = AtomicU8::new(LOCK_NONE);
static SPEED: AtomicU8 = AtomicU8::new(0);
static FRONT_CM: AtomicU16 = AtomicU16::new(0);
static LEFT_CM: AtomicU16 = AtomicU16::new(0);
static RIGHT_CM: AtomicU16 = AtomicU16::new(0);

/// Copy of the shared counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleStatus {
    pub cycles: u32,
    pub edges: u32,
    pub enabled: bool,
    pub lock_code: u8,
    pub speed: u8,
    pub front_cm: u16,
    pub left_cm: u16,
    pub right_cm: u16,
}

impl CycleStatus {
    pub fn lock(&self) -> LockState {
        self.lock_code
            .checked_sub(1)
            .and_then(OverrideKind::from_raw)
            .map_or(LockState::Unlocked, LockState::Locked)
    }
}

fn encode_lock(lock: LockState) -> u8 {
    match lock {
        LockState::Unlocked => LOCK_NONE,
        LockState::Locked(kind) => kind.as_raw() + 1,
    }
}

/// Publishes the outcome of one cycle.
pub fn record_cycle(report: &CycleReport, lock: LockState) {
    CYCLES.fetch_add(1, Ordering::Relaxed);
    if report.event.is_edge() {
        EDGES.fetch_add(1, Ordering::Relaxed);
    }
    ENABLED.store(report.state.is_enabled(), Ordering::Relaxed);
    LOCK.store(encode_lock(lock), Ordering::Relaxed);
    SPEED.store(report.command.speed, Ordering::Relaxed);
    if let Some(readings) = report.readings {
        let distances = ReadingsTelemetry::from_set(&readings);
        FRONT_CM.store(distances.front_cm, Ordering::Relaxed);
        LEFT_CM.store(distances.left_cm, Ordering::Relaxed);
        RIGHT_CM.store(distances.right_cm, Ordering::Relaxed);
    }
}

pub fn snapshot() -> CycleStatus {
    CycleStatus {
        cycles: CYCLES.load(Ordering::Relaxed),
        edges: EDGES.load(Ordering::Relaxed),
        enabled: ENABLED.load(Ordering::Relaxed),
        lock_code: LOCK.load(Ordering::Relaxed),
        speed: SPEED.load(Ordering::Relaxed),
        front_cm: FRONT_CM.load(Ordering::Relaxed),
        left_cm: LEFT_CM.load(Ordering::Relaxed),
        right_cm: RIGHT_CM.load(Ordering::Relaxed),
    }
}
