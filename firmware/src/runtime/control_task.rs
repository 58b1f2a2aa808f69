use avoidance_core::config::CYCLE_PERIOD;
use embassy_time::{Duration, Ticker};

use super::Controller;
use crate::clock::FirmwareInstant;
use crate::hw::Panel;
use crate::status;
use crate::telemetry::{self, TelemetryForwarder};

/// Cycles between status heartbeats (one second at the default period).
const HEARTBEAT_EVERY: u32 = 20;

#[embassy_executor::task]
pub async fn run(mut controller: Controller, mut panel: Panel<'static>) -> ! {
    let period_us = u64::try_from(CYCLE_PERIOD.as_micros()).unwrap_or(u64::MAX);
    let mut ticker = Ticker::every(Duration::from_micros(period_us));
    let mut forwarder = TelemetryForwarder::new();

    controller.start(&mut panel);

    loop {
        let now = FirmwareInstant::now();
        panel.buzzer.service(now);

        let report = controller.run_cycle(now, &mut panel);
        status::record_cycle(&report, controller.arbiter().lock_state());
        forwarder.forward(controller.telemetry());

        let snapshot = status::snapshot();
        if snapshot.cycles % HEARTBEAT_EVERY == 0 {
            telemetry::log_heartbeat(&snapshot);
        }

        ticker.next().await;
    }
}
