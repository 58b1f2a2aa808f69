#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Embassy-backed instant for the control core.

use core::ops::Add;
use core::time::Duration;

use avoidance_core::clock::ControlInstant;
use embassy_time::{Duration as EmbassyDuration, Instant as EmbassyInstant};

/// Wrapper that lets `embassy_time::Instant` drive core deadlines.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(EmbassyInstant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(EmbassyInstant::now())
    }

    pub const fn into_embassy(self) -> EmbassyInstant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<EmbassyInstant> for FirmwareInstant {
    fn from(value: EmbassyInstant) -> Self {
        Self(value)
    }
}

impl Add<Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        let sum = self
            .0
            .checked_add(EmbassyDuration::from_micros(micros))
            .unwrap_or(EmbassyInstant::MAX);
        Self(sum)
    }
}

impl ControlInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_duration_since(earlier.0).as_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn micros(value: u64) -> FirmwareInstant {
        FirmwareInstant::from(EmbassyInstant::from_micros(value))
    }

    #[test]
    fn adds_core_durations() {
        let later = micros(1_000) + Duration::from_millis(50);
        assert_eq!(later.as_micros(), 51_000);
    }

    #[test]
    fn addition_saturates_at_the_end_of_time() {
        let end = micros(10) + Duration::MAX;
        assert_eq!(end.into_embassy(), EmbassyInstant::MAX);
    }

    #[test]
    fn duration_since_never_goes_negative() {
        assert_eq!(
            micros(100).saturating_duration_since(micros(400)),
            Duration::ZERO
        );
        assert_eq!(
            micros(400).saturating_duration_since(micros(100)),
            Duration::from_micros(300)
        );
    }
}
