//! The built-in operator console (§6): `help`, `quit`, `wall <msg>`
//! (admin only), `status`. The original ran a line editor with history
//! and ANSI colour on its own OS thread, posting completed lines back
//! to the event loop -- the same suspension point §5 calls
//! "console-input complete". We read stdin on a blocking task and
//! funnel parsed commands through a channel into the daemon's async
//! loop; no line-editing library is pulled in since `std::io::stdin`
//! already gives history-free raw lines, matching the minimal surface
//! the core actually consumes.

use tokio::sync::mpsc;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `help` -- print the command summary.
    Help,
    /// `quit` -- begin graceful shutdown.
    Quit,
    /// `wall <msg>` -- admin-only broadcast to every connected admin
    /// client.
    Wall(String),
    /// `status` -- print a one-line connection/uptime summary.
    Status,
}

/// The static text `help` prints.
pub const HELP_TEXT: &str =
    "commands: help, quit, wall <message> (admin daemon only), status";

/// Parses one console input line.
///
/// # Errors
///
/// Returns the unrecognized command text verbatim so the caller can
/// report it.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let trimmed = line.trim();
    if trimmed == "help" {
        return Ok(ConsoleCommand::Help);
    }
    if trimmed == "quit" {
        return Ok(ConsoleCommand::Quit);
    }
    if trimmed == "status" {
        return Ok(ConsoleCommand::Status);
    }
    if let Some(message) = trimmed.strip_prefix("wall ") {
        if message.trim().is_empty() {
            return Err(trimmed.to_string());
        }
        return Ok(ConsoleCommand::Wall(message.to_string()));
    }
    Err(trimmed.to_string())
}

/// Spawns a blocking task that reads lines from `reader` until EOF,
/// parses each into a [`ConsoleCommand`], and forwards it on the
/// returned channel. Malformed lines are dropped with a `tracing::warn!`
/// rather than closing the console.
pub fn spawn<R>(reader: R) -> mpsc::UnboundedReceiver<ConsoleCommand>
where
    R: std::io::BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => match parse_line(&line) {
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Err(bad) => tracing::warn!(line = %bad, "unrecognized console command"),
                },
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_named_command() {
        assert_eq!(parse_line("help").unwrap(), ConsoleCommand::Help);
        assert_eq!(parse_line("quit").unwrap(), ConsoleCommand::Quit);
        assert_eq!(parse_line("status").unwrap(), ConsoleCommand::Status);
        assert_eq!(
            parse_line("wall hello there").unwrap(),
            ConsoleCommand::Wall("hello there".to_string())
        );
    }

    #[test]
    fn rejects_wall_with_no_message() {
        assert!(parse_line("wall").is_err());
        assert!(parse_line("wall   ").is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(parse_line("frobnicate").is_err());
    }

    #[tokio::test]
    async fn spawn_forwards_parsed_lines_and_stops_at_eof() {
        let input = std::io::Cursor::new(b"status\nwall hi\nbogus\n".to_vec());
        let mut rx = spawn(input);
        assert_eq!(rx.recv().await, Some(ConsoleCommand::Status));
        assert_eq!(rx.recv().await, Some(ConsoleCommand::Wall("hi".to_string())));
        assert_eq!(rx.recv().await, None);
    }
}
