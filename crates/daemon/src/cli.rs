//! Shared CLI plumbing every role's `run(args, stdout, stderr) -> i32`
//! entry point and `bin/shard-*` wrapper use, mirroring the teacher's
//! `rsync_cli::run` / `rsync_cli::exit_code_from` split so the `bin/*`
//! crates themselves stay free of logic.

use std::io::Write;

use clap::error::ErrorKind;

/// Exit codes documented in the external interfaces section.
pub mod exit {
    /// Success.
    pub const OK: i32 = 0;
    /// Configuration file missing, malformed, or missing a key.
    pub const CONFIG: i32 = 1;
    /// The acceptor could not bind its listening address.
    pub const BIND: i32 = 2;
    /// Any other fatal runtime error.
    pub const RUNTIME: i32 = 3;
}

/// Writes a [`clap::Error`] to `stdout` (for `--help`/`--version`) or
/// `stderr` (anything else) and returns the matching exit code.
pub fn handle_parse_error<Out: Write, ErrW: Write>(
    error: clap::Error,
    stdout: &mut Out,
    stderr: &mut ErrW,
) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{error}");
            exit::OK
        }
        _ => {
            let _ = write!(stderr, "{error}");
            exit::CONFIG
        }
    }
}

fn clamp_status(status: i32) -> u8 {
    status.clamp(0, i32::from(u8::MAX)) as u8
}

/// Converts a `run()` status into a process [`std::process::ExitCode`],
/// clamping to the `u8` range the OS accepts.
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    std::process::ExitCode::from(clamp_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_status_bounds_negative_and_overlong_values() {
        assert_eq!(clamp_status(-1), 0);
        assert_eq!(clamp_status(3), 3);
        assert_eq!(clamp_status(999), 255);
    }
}
