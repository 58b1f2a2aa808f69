//! Deadline-paced speed ramp used while a safety override is engaged.

use core::time::Duration;

use crate::clock::ControlInstant;

/// Steps the drive speed down toward a target, one step per interval.
///
/// The ramp never accelerates: a target above the current speed is clamped to
/// the current speed, which completes the ramp immediately.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpeedRamp<I> {
    target: u8,
    step: u8,
    interval: Duration,
    next_step_at: Option<I>,
}

impl<I: ControlInstant> SpeedRamp<I> {
    pub fn new(step: u8, interval: Duration) -> Self {
        Self {
            target: 0,
            step: step.max(1),
            interval,
            next_step_at: None,
        }
    }

    /// Arms the ramp. The first step is due at `now`.
    pub fn start(&mut self, current: u8, target: u8, now: I) {
        self.target = target.min(current);
        self.next_step_at = (current > self.target).then_some(now);
    }

    /// Disarms the ramp without touching the speed.
    pub fn cancel(&mut self) {
        self.next_step_at = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_step_at.is_some()
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    pub fn next_step_at(&self) -> Option<I> {
        self.next_step_at
    }

    /// Returns the next speed when a step is due at `now`.
    pub fn advance(&mut self, current: u8, now: I) -> Option<u8> {
        let due = self.next_step_at?;
        if now < due {
            return None;
        }

        let next = current.saturating_sub(self.step).max(self.target);
        self.next_step_at = (next > self.target).then(|| now + self.interval);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::MockInstant;

    fn ramp() -> SpeedRamp<MockInstant> {
        SpeedRamp::new(5, Duration::from_millis(100))
    }

    #[test]
    fn first_step_is_due_immediately() {
        let mut ramp = ramp();
        ramp.start(200, 0, MockInstant::millis(10));
        assert_eq!(ramp.advance(200, MockInstant::millis(10)), Some(195));
        assert_eq!(ramp.next_step_at(), Some(MockInstant::millis(110)));
    }

    #[test]
    fn steps_wait_for_interval() {
        let mut ramp = ramp();
        ramp.start(200, 0, MockInstant::millis(0));
        assert_eq!(ramp.advance(200, MockInstant::millis(0)), Some(195));
        assert_eq!(ramp.advance(195, MockInstant::millis(50)), None);
        assert_eq!(ramp.advance(195, MockInstant::millis(100)), Some(190));
    }

    #[test]
    fn final_step_lands_on_target() {
        let mut ramp = ramp();
        ramp.start(103, 100, MockInstant::millis(0));
        assert_eq!(ramp.advance(103, MockInstant::millis(0)), Some(100));
        assert!(!ramp.is_active());
    }

    #[test]
    fn target_above_current_holds_speed() {
        let mut ramp = ramp();
        ramp.start(60, 100, MockInstant::millis(0));
        assert_eq!(ramp.target(), 60);
        assert!(!ramp.is_active());
        assert_eq!(ramp.advance(60, MockInstant::millis(500)), None);
    }
}
