//! Bench REPL shared by the emulator and any host-side tooling.
//!
//! The grammar in [`grammar`] lexes with `regal` and parses with `winnow`
//! over a bounded token buffer, so it stays usable without an allocator.

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod status;
