use std::io;

#[allow(dead_code)]
#[path = "../bench.rs"]
mod bench;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Front)?;
    record_profile(TranscriptProfile::Side)?;
    record_profile(TranscriptProfile::Drive)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    let script: &[&str] = match profile {
        TranscriptProfile::Front => &[
            "toggle",
            "throttle 1023",
            "step",
            "range front 20",
            "step",
            "step 100",
            "status",
            "range front 300",
            "step",
            "status",
        ],
        TranscriptProfile::Side => &[
            "toggle",
            "throttle 1023",
            "step",
            "range right 25",
            "step 70",
            "status",
            "range front 30",
            "step 40",
            "range all 300",
            "step",
            "status",
        ],
        TranscriptProfile::Drive => &[
            "help",
            "help range",
            "throttle 512",
            "step 2",
            "toggle",
            "step",
            "status",
            "range left timeout",
            "step",
            "throttle 2000",
            "step 0",
            "step 5",
            "toggle",
            "status",
        ],
    };

    for line in script {
        let _ = session.handle_command(line)?;
    }
    Ok(())
}
