mod support;

use core::time::Duration;

use avoidance_core::capabilities::{Direction, Indication};
use avoidance_core::classifier::ObstacleState;
use avoidance_core::motor::{LockState, MotorCommand, OverrideKind};
use avoidance_core::ranging::ChannelId;
use avoidance_core::signal::SignalEvent;
use avoidance_core::telemetry::TelemetryEventKind;

use support::Bench;

fn cruising_bench() -> Bench {
    let mut bench = Bench::enabled();
    bench.panel.throttle = 1023;
    let report = bench.cycle();
    assert_eq!(report.command, MotorCommand::from_speed(255));
    bench
}

fn place_front_obstacle(bench: &mut Bench) {
    bench.panel.set_cm(ChannelId::Front, 20.0);
    bench.panel.set_cm(ChannelId::Left, 100.0);
    bench.panel.set_cm(ChannelId::Right, 100.0);
}

#[test]
fn front_obstacle_brakes_to_standstill() {
    let mut bench = cruising_bench();
    let writes_before = bench.drive_writes().len();
    place_front_obstacle(&mut bench);

    let report = bench.cycle();
    assert_eq!(report.obstacle, ObstacleState::FrontBlocked);
    assert_eq!(report.event, SignalEvent::ObstacleAppeared);
    assert_eq!(
        bench.controller.arbiter().lock_state(),
        LockState::Locked(OverrideKind::Front)
    );
    assert_eq!(bench.angles().last(), Some(&90));
    assert_eq!(
        bench.panel.tones.as_slice(),
        &[(1_000, Duration::from_millis(200))]
    );
    assert!(bench.panel.showed("Obstacle Detected!", "Obstacle Front!"));
    assert_eq!(bench.panel.indications.last(), Some(&Indication::Warning));

    let mut cycles = 1;
    while bench.controller.arbiter().current_speed() > 0 {
        let report = bench.cycle();
        assert_eq!(report.event, SignalEvent::None);
        cycles += 1;
        assert!(cycles < 200, "ramp did not converge");
    }

    let ramp = &bench.drive_writes()[writes_before..];
    // ceil(255 / 5) decrements, one per 100 ms.
    assert_eq!(ramp.len(), 51);
    assert!(ramp.windows(2).all(|pair| pair[0].1 >= pair[1].1));
    assert_eq!(ramp.last(), Some(&(Direction::Coast, 0)));
    assert_eq!(cycles, 101);

    let report = bench.cycle();
    assert_eq!(report.event, SignalEvent::None);
    assert_eq!(report.command, MotorCommand::stopped());
    assert_eq!(bench.panel.tones.len(), 1);

    let completed = bench
        .controller
        .telemetry()
        .oldest_first()
        .any(|record| record.event == TelemetryEventKind::RampComplete);
    assert!(completed);
}

#[test]
fn side_obstacle_escalates_to_front_without_new_edge() {
    let mut bench = cruising_bench();
    bench.panel.set_cm(ChannelId::Right, 25.0);

    let report = bench.cycle();
    assert_eq!(report.obstacle, ObstacleState::SideBlocked);
    assert!(bench.panel.showed("Obstacle Detected!", "Obstacle Side!"));
    assert_eq!(bench.angles().last(), Some(&45));

    for _ in 0..80 {
        bench.cycle();
    }
    assert_eq!(bench.controller.arbiter().current_speed(), 100);

    bench.panel.set_cm(ChannelId::Front, 30.0);
    let report = bench.cycle();
    assert_eq!(report.obstacle, ObstacleState::FrontBlocked);
    assert_eq!(report.event, SignalEvent::None);
    assert!(bench.panel.showed("Obstacle Front!", ""));
    assert_eq!(bench.angles().last(), Some(&90));
    assert_eq!(bench.panel.tones.len(), 1);

    for _ in 0..60 {
        bench.cycle();
    }
    assert_eq!(bench.controller.arbiter().command(), MotorCommand::stopped());
}

#[test]
fn clearing_releases_lock_and_resumes_throttle() {
    let mut bench = cruising_bench();
    place_front_obstacle(&mut bench);
    for _ in 0..120 {
        bench.cycle();
    }

    bench.panel.set_cm(ChannelId::Front, 300.0);
    bench.panel.set_cm(ChannelId::Left, 300.0);
    bench.panel.set_cm(ChannelId::Right, 300.0);
    bench.panel.throttle = 512;

    let report = bench.cycle();
    assert_eq!(report.event, SignalEvent::ObstacleCleared);
    assert_eq!(report.obstacle, ObstacleState::Clear);
    assert_eq!(bench.controller.arbiter().lock_state(), LockState::Unlocked);
    assert_eq!(bench.angles().last(), Some(&0));
    assert_eq!(
        bench.panel.tones.last(),
        Some(&(1_200, Duration::from_millis(200)))
    );
    assert!(bench.panel.showed("Obstacle Cleared!", "All clear!"));
    assert_eq!(report.command, MotorCommand::from_speed(127));
}
