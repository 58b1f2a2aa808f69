//! Monotonic time abstraction shared by firmware and host targets.
//!
//! Every delay in the control cycle (debounce settle, ramp pacing, tone
//! shut-off) is expressed as a deadline against a caller-supplied instant, so
//! the core never blocks and never reads a clock on its own.

use core::ops::Add;
use core::time::Duration;

/// Monotonic timestamp used to schedule deadlines inside the control cycle.
pub trait ControlInstant: Copy + Ord + Add<Duration, Output = Self> {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Returns `true` once `now` has reached the optional deadline.
///
/// A missing deadline counts as already expired.
pub fn deadline_reached<I: ControlInstant>(deadline: Option<I>, now: I) -> bool {
    deadline.is_none_or(|deadline| now >= deadline)
}


#[cfg(test)]
mod tests {
    use super::mock::MockInstant;
    use super::*;

    #[test]
    fn missing_deadline_counts_as_expired() {
        assert!(deadline_reached::<MockInstant>(None, MockInstant(0)));
    }

    #[test]
    fn deadline_expires_at_exact_instant() {
        let deadline = Some(MockInstant::millis(100));
        assert!(!deadline_reached(deadline, MockInstant::millis(99)));
        assert!(deadline_reached(deadline, MockInstant::millis(100)));
    }
}
