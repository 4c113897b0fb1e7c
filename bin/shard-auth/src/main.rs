#![deny(unsafe_code)]

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let status = daemon::auth::run(env::args_os(), &mut stdout, &mut stderr);
    daemon::cli::exit_code_from(status)
}

#[cfg(test)]
mod tests {
    use daemon::cli::exit;

    #[test]
    fn version_flag_reports_success() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = daemon::auth::run(["shard-auth", "--version"], &mut stdout, &mut stderr);
        assert_eq!(status, exit::OK);
        assert!(!stdout.is_empty());
    }
}
