use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use avoidance_core::config::ControllerConfig;
use avoidance_core::repl::catalog::{self, CommandSpec};
use avoidance_core::repl::commands::{CommandError, CommandExecutor, CommandOutcome, StepSummary};
use avoidance_core::repl::grammar::{BenchEcho, RangeCommand, RangeTarget};
use avoidance_core::repl::status::{StatusFormatter, StatusSnapshot};

use crate::bench::SimBench;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Front,
    Side,
    Drive,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Front => "evidence/emulator-front.log",
            TranscriptProfile::Side => "evidence/emulator-side.log",
            TranscriptProfile::Drive => "evidence/emulator-drive.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Front => "Avoidance emulator front obstacle transcript",
            TranscriptProfile::Side => "Avoidance emulator side obstacle transcript",
            TranscriptProfile::Drive => "Avoidance emulator manual drive transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("front") {
            Ok(Self::Front)
        } else if tag.eq_ignore_ascii_case("side") {
            Ok(Self::Side)
        } else if tag.eq_ignore_ascii_case("drive") {
            Ok(Self::Drive)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

pub struct Session {
    executor: CommandExecutor<SimBench>,
    transcript: TranscriptLogger,
    boot: Vec<String>,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let bench = SimBench::new(ControllerConfig::default())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
        let mut session = Self {
            executor: CommandExecutor::new(bench),
            transcript: TranscriptLogger::new(profile)?,
            boot: Vec::new(),
        };
        session.boot = session.hardware_lines();
        let boot = session.boot.clone();
        session.record_output(&boot)?;
        Ok(session)
    }

    /// Lines produced while powering up, e.g. the start-up banner.
    pub fn boot_lines(&self) -> &[String] {
        &self.boot
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;

        let mut lines = match self.executor.execute(trimmed) {
            Ok(outcome) => describe_outcome(&outcome),
            Err(CommandError::Parse(err)) => vec![format!("ERR syntax {err}")],
            Err(CommandError::Unsupported(topic)) => vec![
                format!("ERR unsupported {topic}"),
                format!("Available topics: {}", help_topic_list()),
            ],
            Err(CommandError::InvalidArgument(reason)) => vec![format!("ERR invalid {reason}")],
        };
        lines.extend(self.hardware_lines());

        self.record_output(&lines)?;
        Ok(lines)
    }

    fn elapsed(&self) -> Duration {
        self.executor.bench().now().elapsed()
    }

    fn hardware_lines(&mut self) -> Vec<String> {
        self.executor
            .bench_mut()
            .drain_events()
            .iter()
            .map(|event| format!("  hw {}", event.describe()))
            .collect()
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        let elapsed = self.elapsed();
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn describe_outcome(outcome: &CommandOutcome) -> Vec<String> {
    match outcome {
        CommandOutcome::Toggled(state) => vec![format!("OK toggle system={state}")],
        CommandOutcome::ThrottleSet(raw) => vec![format!("OK throttle raw={raw}")],
        CommandOutcome::RangeSet(range) => vec![describe_range(range)],
        CommandOutcome::Stepped(summary) => vec![describe_step(summary)],
        CommandOutcome::Status(snapshot) => describe_status(snapshot),
        CommandOutcome::Help(None) => {
            let mut lines = vec!["Available commands:".to_string()];
            for spec in catalog::commands() {
                lines.push(format!("  {}", help_line(spec)));
            }
            lines.push("Type `help <command>` for a specific command.".to_string());
            lines
        }
        CommandOutcome::Help(Some(spec)) => vec![help_line(spec)],
    }
}

fn describe_range(range: &RangeCommand) -> String {
    let target = match range.target {
        RangeTarget::Channel(channel) => channel.name(),
        RangeTarget::All => "all",
    };
    match range.echo {
        BenchEcho::Centimeters(cm) => format!("OK range {target}={cm}cm"),
        BenchEcho::Timeout => format!("OK range {target}=timeout"),
    }
}

fn describe_step(summary: &StepSummary) -> String {
    let last = &summary.last;
    format!(
        "OK step cycles={} edges={} system={} obstacle={} speed={}",
        summary.cycles, summary.edges, last.state, last.obstacle, last.command.speed,
    )
}

fn describe_status(snapshot: &StatusSnapshot) -> Vec<String> {
    match StatusFormatter::new(snapshot).render_lines() {
        Ok(lines) => lines.into_iter().collect(),
        Err(_) => vec!["ERR status unavailable".to_string()],
    }
}

fn help_line(spec: &CommandSpec) -> String {
    format!("{:<32} - {}", spec.usage, spec.summary)
}

fn help_topic_list() -> String {
    catalog::commands()
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since power-up"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
