mod bench;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    let profile = parse_profile().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: emulator [--profile <front|side|drive>] | emulator <front|side|drive>");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(profile)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Avoidance Emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for boot in session.boot_lines() {
        writeln!(writer, "{boot}")?;
    }

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_profile() -> Result<TranscriptProfile, String> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(arg) => {
            if let Some(value) = arg.strip_prefix("--profile=") {
                TranscriptProfile::from_tag(value)
            } else if arg == "--profile" {
                args.next()
                    .ok_or_else(|| "Expected value after --profile".to_string())
                    .and_then(|value| TranscriptProfile::from_tag(&value))
            } else {
                TranscriptProfile::from_tag(&arg)
            }
        }
        None => Ok(TranscriptProfile::Drive),
    }
}
