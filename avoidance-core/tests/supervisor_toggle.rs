mod support;

use core::time::Duration;

use avoidance_core::capabilities::Indication;
use avoidance_core::motor::{LockState, OverrideKind, SteeringPosition};
use avoidance_core::ranging::ChannelId;
use avoidance_core::signal::SignalEvent;
use avoidance_core::supervisor::{SupervisorState, ToggleOutcome};
use avoidance_core::telemetry::{TelemetryEventKind, TelemetryPayload, ToggleTelemetry};

use support::Bench;

fn event_kinds(bench: &Bench) -> Vec<TelemetryEventKind> {
    bench
        .controller
        .telemetry()
        .oldest_first()
        .map(|record| record.event)
        .collect()
}

#[test]
fn button_held_through_power_up_does_not_enable() {
    let mut bench = Bench::new();
    bench.panel.pressed = true;
    for _ in 0..3 {
        let report = bench.cycle();
        assert_eq!(report.state, SupervisorState::Disabled);
        assert_eq!(report.toggle, ToggleOutcome::Unchanged);
    }
    bench.panel.pressed = false;
    bench.cycle();
    assert_eq!(bench.panel.triggers, 0);

    let report = bench.press();
    assert_eq!(report.toggle, ToggleOutcome::Enabled);
    assert!(bench.panel.showed("System: ON", ""));
}

#[test]
fn bounce_inside_settle_window_is_dropped() {
    let mut bench = Bench::new();
    bench.cycle();
    assert_eq!(bench.press().toggle, ToggleOutcome::Enabled);

    let bounce = bench.press();
    assert_eq!(
        bounce.toggle,
        ToggleOutcome::Bounced {
            since_last_edge: Some(Duration::from_millis(100)),
        }
    );
    assert_eq!(bounce.state, SupervisorState::Enabled);

    let record = bench
        .controller
        .telemetry()
        .latest()
        .copied()
        .expect("bounce recorded");
    assert_eq!(record.event, TelemetryEventKind::ToggleBounce);
    assert_eq!(
        record.details,
        TelemetryPayload::Toggle(ToggleTelemetry {
            since_last_edge: Some(Duration::from_millis(100)),
        })
    );

    bench.settle();
    assert_eq!(bench.press().toggle, ToggleOutcome::Disabled);
    assert_eq!(
        event_kinds(&bench)
            .iter()
            .filter(|kind| matches!(
                kind,
                TelemetryEventKind::SystemEnabled | TelemetryEventKind::SystemDisabled
            ))
            .count(),
        2
    );
}

#[test]
fn disabling_mid_override_resets_everything() {
    let mut bench = Bench::enabled();
    bench.panel.throttle = 1023;
    bench.cycle();
    bench.panel.set_cm(ChannelId::Right, 25.0);
    bench.settle();
    assert_eq!(
        bench.controller.arbiter().lock_state(),
        LockState::Locked(OverrideKind::Side)
    );
    assert!(bench.controller.supervisor().previous_obstacle());

    let report = bench.press();
    assert_eq!(report.toggle, ToggleOutcome::Disabled);
    assert_eq!(report.readings, None);

    let arbiter = bench.controller.arbiter();
    assert_eq!(arbiter.lock_state(), LockState::Unlocked);
    assert_eq!(arbiter.current_speed(), 0);
    assert!(!arbiter.is_ramping());
    assert_eq!(arbiter.steering_position(), SteeringPosition::Neutral);
    assert_eq!(bench.angles().last(), Some(&0));
    assert!(!bench.controller.supervisor().previous_obstacle());
    assert!(bench.panel.showed("System: OFF", ""));
    assert_eq!(bench.panel.indications.last(), Some(&Indication::Safe));

    let kinds = event_kinds(&bench);
    let tail = &kinds[kinds.len() - 2..];
    assert_eq!(
        tail,
        &[
            TelemetryEventKind::OverrideReleased,
            TelemetryEventKind::SystemDisabled
        ]
    );
}

#[test]
fn disabled_cycles_leave_hardware_alone() {
    let mut bench = Bench::enabled();
    bench.settle();
    bench.press();

    let triggers = bench.panel.triggers;
    let writes = bench.drive_writes().len();
    let screens = bench.panel.screens.len();
    bench.panel.throttle = 900;
    bench.panel.set_cm(ChannelId::Front, 10.0);
    for _ in 0..10 {
        let report = bench.cycle();
        assert_eq!(report.event, SignalEvent::None);
    }

    assert_eq!(bench.panel.triggers, triggers);
    assert_eq!(bench.drive_writes().len(), writes);
    assert_eq!(bench.panel.screens.len(), screens);
    assert!(bench.panel.tones.is_empty());
}

#[test]
fn re_enabling_with_obstacle_present_reports_new_edge() {
    let mut bench = Bench::enabled();
    bench.panel.set_cm(ChannelId::Front, 12.0);
    bench.settle();
    assert_eq!(bench.panel.tones.len(), 1);

    bench.press();
    bench.settle();
    let report = bench.press();

    assert_eq!(report.toggle, ToggleOutcome::Enabled);
    assert_eq!(report.event, SignalEvent::ObstacleAppeared);
    assert_eq!(bench.panel.tones.len(), 2);
    assert!(bench.panel.showed("Obstacle Detected!", "Obstacle Front!"));
}
