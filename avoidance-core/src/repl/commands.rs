//! Bench command dispatcher.
//!
//! Parsed commands are applied to a [`BenchControl`] implementation, which
//! owns a controller and the simulated panel it runs against. The executor
//! stays `no_std` so any host harness can reuse it.

use core::fmt;

use crate::controller::CycleReport;
use crate::ranging::{ALL_CHANNELS, ChannelId, EchoSample};
use crate::supervisor::SupervisorState;

use super::catalog::{self, CommandSpec};
use super::grammar::{self, BenchEcho, Command, RangeCommand};
use super::status::StatusSnapshot;

/// Simulated vehicle driven by bench commands.
pub trait BenchControl {
    /// Holds or releases the enable button for subsequent cycles.
    fn set_toggle(&mut self, pressed: bool);

    /// Sets the raw throttle sample returned to the controller.
    fn set_throttle(&mut self, raw: u16);

    /// Places a simulated echo on one channel.
    fn set_echo(&mut self, channel: ChannelId, echo: EchoSample);

    /// Converts a one-way distance into the echo a ranger would report.
    fn echo_for_cm(&self, centimeters: u16) -> EchoSample;

    /// Runs one control cycle and advances simulated time by one period.
    fn run_cycle(&mut self) -> CycleReport;

    fn snapshot(&self) -> StatusSnapshot;
}

/// Command execution successes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommandOutcome {
    Toggled(SupervisorState),
    ThrottleSet(u16),
    RangeSet(RangeCommand),
    Stepped(StepSummary),
    Status(StatusSnapshot),
    /// `None` lists every command.
    Help(Option<&'static CommandSpec>),
}

/// Summary returned after stepping the loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepSummary {
    pub cycles: u16,
    /// Signal edges seen while stepping.
    pub edges: u16,
    pub last: CycleReport,
}

/// Errors surfaced while executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandError<'a> {
    Parse(grammar::ParseError<'a>),
    Unsupported(&'a str),
    InvalidArgument(&'static str),
}

impl<'a> From<grammar::ParseError<'a>> for CommandError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(err) => err.fmt(f),
            CommandError::Unsupported(topic) => write!(f, "no help for `{topic}`"),
            CommandError::InvalidArgument(reason) => f.write_str(reason),
        }
    }
}

type CommandResult<'a> = Result<CommandOutcome, CommandError<'a>>;

/// Dispatches bench commands into a [`BenchControl`].
pub struct CommandExecutor<B> {
    bench: B,
}

impl<B> CommandExecutor<B> {
    pub const fn new(bench: B) -> Self {
        Self { bench }
    }

    pub fn bench(&self) -> &B {
        &self.bench
    }

    pub fn bench_mut(&mut self) -> &mut B {
        &mut self.bench
    }

    pub fn into_inner(self) -> B {
        self.bench
    }
}

impl<B> CommandExecutor<B>
where
    B: BenchControl,
{
    /// Parses and executes a bench command.
    pub fn execute<'a>(&mut self, line: &'a str) -> CommandResult<'a> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    fn dispatch<'a>(&mut self, command: Command<'a>) -> CommandResult<'a> {
        match command {
            Command::Toggle => Ok(CommandOutcome::Toggled(self.press_and_release())),
            Command::Throttle(raw) => {
                self.bench.set_throttle(raw);
                Ok(CommandOutcome::ThrottleSet(raw))
            }
            Command::Range(range) => {
                self.apply_range(range);
                Ok(CommandOutcome::RangeSet(range))
            }
            Command::Step(0) => Err(CommandError::InvalidArgument(
                "step needs at least one cycle",
            )),
            Command::Step(cycles) => Ok(CommandOutcome::Stepped(self.step(cycles))),
            Command::Status => Ok(CommandOutcome::Status(self.bench.snapshot())),
            Command::Help(help) => match help.topic {
                None => Ok(CommandOutcome::Help(None)),
                Some(topic) => catalog::find(topic)
                    .map(|spec| CommandOutcome::Help(Some(spec)))
                    .ok_or(CommandError::Unsupported(topic)),
            },
        }
    }

    /// One cycle with the button held, one with it released.
    fn press_and_release(&mut self) -> SupervisorState {
        self.bench.set_toggle(true);
        self.bench.run_cycle();
        self.bench.set_toggle(false);
        self.bench.run_cycle().state
    }

    fn apply_range(&mut self, range: RangeCommand) {
        let echo = match range.echo {
            BenchEcho::Centimeters(centimeters) => self.bench.echo_for_cm(centimeters),
            BenchEcho::Timeout => EchoSample::Timeout,
        };
        for channel in ALL_CHANNELS
            .into_iter()
            .filter(|channel| range.target.includes(*channel))
        {
            self.bench.set_echo(channel, echo);
        }
    }

    fn step(&mut self, cycles: u16) -> StepSummary {
        let mut edges = 0;
        let mut last = self.bench.run_cycle();
        if last.event.is_edge() {
            edges += 1;
        }
        for _ in 1..cycles {
            last = self.bench.run_cycle();
            if last.event.is_edge() {
                edges += 1;
            }
        }
        StepSummary {
            cycles,
            edges,
            last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ObstacleState;
    use crate::motor::MotorCommand;
    use crate::repl::grammar::RangeTarget;
    use crate::signal::SignalEvent;
    use core::time::Duration;

    /// Bench double that records what the executor asked for.
    #[derive(Default)]
    struct MockBench {
        pressed: bool,
        presses_seen: u8,
        throttle: u16,
        echoes: [Option<EchoSample>; 3],
        cycles: u32,
        edge_every: Option<u32>,
    }

    impl BenchControl for MockBench {
        fn set_toggle(&mut self, pressed: bool) {
            self.pressed = pressed;
        }

        fn set_throttle(&mut self, raw: u16) {
            self.throttle = raw;
        }

        fn set_echo(&mut self, channel: ChannelId, echo: EchoSample) {
            self.echoes[channel.as_index()] = Some(echo);
        }

        fn echo_for_cm(&self, centimeters: u16) -> EchoSample {
            EchoSample::Echo(Duration::from_micros(u64::from(centimeters) * 1_000 / 17))
        }

        fn run_cycle(&mut self) -> CycleReport {
            self.cycles += 1;
            if self.pressed {
                self.presses_seen += 1;
            }
            let edge = self
                .edge_every
                .is_some_and(|every| self.cycles % every == 0);
            CycleReport {
                state: if self.presses_seen % 2 == 1 {
                    SupervisorState::Enabled
                } else {
                    SupervisorState::Disabled
                },
                toggle: crate::supervisor::ToggleOutcome::Unchanged,
                readings: None,
                obstacle: ObstacleState::Clear,
                event: if edge {
                    SignalEvent::ObstacleAppeared
                } else {
                    SignalEvent::None
                },
                command: MotorCommand::stopped(),
            }
        }

        fn snapshot(&self) -> StatusSnapshot {
            StatusSnapshot::unknown()
        }
    }

    fn executor() -> CommandExecutor<MockBench> {
        CommandExecutor::new(MockBench::default())
    }

    #[test]
    fn toggle_presses_then_releases() {
        let mut executor = executor();
        let outcome = executor.execute("toggle").expect("toggle should dispatch");
        assert_eq!(outcome, CommandOutcome::Toggled(SupervisorState::Enabled));
        assert_eq!(executor.bench().cycles, 2);
        assert!(!executor.bench().pressed);
    }

    #[test]
    fn throttle_is_forwarded() {
        let mut executor = executor();
        executor.execute("throttle 700").expect("throttle should dispatch");
        assert_eq!(executor.bench().throttle, 700);
        assert_eq!(executor.bench().cycles, 0);
    }

    #[test]
    fn range_all_sets_every_channel() {
        let mut executor = executor();
        let outcome = executor
            .execute("range all timeout")
            .expect("range should dispatch");
        assert_eq!(
            outcome,
            CommandOutcome::RangeSet(RangeCommand {
                target: RangeTarget::All,
                echo: BenchEcho::Timeout,
            })
        );
        assert!(
            executor
                .bench()
                .echoes
                .iter()
                .all(|echo| *echo == Some(EchoSample::Timeout))
        );
    }

    #[test]
    fn range_single_channel_uses_bench_conversion() {
        let mut executor = executor();
        executor.execute("range left 17").expect("range should dispatch");
        assert_eq!(
            executor.bench().echoes,
            [
                None,
                Some(EchoSample::Echo(Duration::from_micros(1_000))),
                None
            ]
        );
    }

    #[test]
    fn step_counts_edges() {
        let mut executor = executor();
        executor.bench_mut().edge_every = Some(3);
        match executor.execute("step 10").expect("step should dispatch") {
            CommandOutcome::Stepped(summary) => {
                assert_eq!(summary.cycles, 10);
                assert_eq!(summary.edges, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(executor.bench().cycles, 10);
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut executor = executor();
        assert_eq!(
            executor.execute("step 0"),
            Err(CommandError::InvalidArgument("step needs at least one cycle"))
        );
    }

    #[test]
    fn help_resolves_topics() {
        let mut executor = executor();
        assert_eq!(executor.execute("help"), Ok(CommandOutcome::Help(None)));
        match executor.execute("help range") {
            Ok(CommandOutcome::Help(Some(spec))) => assert_eq!(spec.name, "range"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            executor.execute("help reboot"),
            Err(CommandError::Unsupported("reboot"))
        );
    }

    #[test]
    fn parse_error_is_returned() {
        let mut executor = executor();
        let error = executor
            .execute("throttle fast")
            .expect_err("parse should fail");
        assert!(matches!(error, CommandError::Parse(_)));
    }
}
