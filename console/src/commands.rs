//! Console command parsing

use thiserror::Error;

/// Round trips measured by `bench-adaptor` when no count is given
pub const DEFAULT_BENCH_ROUNDS: u32 = 1000;

/// Help text printed by the `help` command
pub const HELP: &str = "\
Commands:
  turn                  show the current turn
  advance               end the turn
  players               list players and scores
  search [prefix]       find players by name prefix
  score <name> <points> add points to a player
  files                 list stored files
  read <file>           show a file, decoded and translated
  sync                  wait until the session has caught up
  bench-adaptor [n]     time n round trips, direct vs. through the file adaptor
  cancel                stop a running bench-adaptor
  help                  show this text
  quit                  leave the console";

/// A parsed console command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the current turn
    Turn,
    /// End the current turn
    Advance,
    /// List all players
    Players,
    /// Search players by name prefix
    Search(String),
    /// Add points to a player
    Score {
        /// Player name
        name: String,
        /// Points to add (may be negative)
        points: i64,
    },
    /// List stored files
    Files,
    /// Show one file
    Read(String),
    /// Barrier on the session queue
    Sync,
    /// Measure adaptor construction cost
    BenchAdaptor(u32),
    /// Interrupt the running command. The input reader normally handles
    /// this itself, so it only reaches the app when nothing is running.
    Cancel,
    /// Show help
    Help,
    /// Leave the console
    Quit,
}

/// Why a line is not a valid command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The first word is not a command
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    /// A required argument is missing
    #[error("{command}: missing {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Name of the missing argument
        argument: &'static str,
    },

    /// An argument that must be a number is not one
    #[error("{command}: '{value}' is not a valid number")]
    InvalidNumber {
        /// Command name
        command: &'static str,
        /// The offending text
        value: String,
    },
}

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
///
/// # Errors
///
/// Returns a [`ParseError`] describing what is wrong with the line.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "turn" => Command::Turn,
        "advance" => Command::Advance,
        "players" => Command::Players,
        "search" => Command::Search(rest.to_string()),
        "score" => parse_score(rest)?,
        "files" => Command::Files,
        "read" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "read",
                    argument: "file name",
                });
            }
            Command::Read(rest.to_string())
        }
        "sync" => Command::Sync,
        "bench-adaptor" => {
            if rest.is_empty() {
                Command::BenchAdaptor(DEFAULT_BENCH_ROUNDS)
            } else {
                let rounds = parse_number::<u32>("bench-adaptor", rest)?;
                Command::BenchAdaptor(rounds.max(1))
            }
        }
        "cancel" => Command::Cancel,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => return Err(ParseError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}

fn parse_score(rest: &str) -> Result<Command, ParseError> {
    let mut args = rest.split_whitespace();
    let name = args.next().ok_or(ParseError::MissingArgument {
        command: "score",
        argument: "player name",
    })?;
    let points = args.next().ok_or(ParseError::MissingArgument {
        command: "score",
        argument: "points",
    })?;
    Ok(Command::Score {
        name: name.to_string(),
        points: parse_number("score", points)?,
    })
}

fn parse_number<N: std::str::FromStr>(command: &'static str, value: &str) -> Result<N, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        command,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("turn"), Ok(Some(Command::Turn)));
        assert_eq!(parse("  ADVANCE  "), Ok(Some(Command::Advance)));
        assert_eq!(parse("exit"), Ok(Some(Command::Quit)));
        assert_eq!(parse("cancel"), Ok(Some(Command::Cancel)));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("# comment"), Ok(None));
    }

    #[test]
    fn test_arguments() {
        assert_eq!(parse("search al"), Ok(Some(Command::Search("al".into()))));
        assert_eq!(parse("search"), Ok(Some(Command::Search(String::new()))));
        assert_eq!(
            parse("score ada -3"),
            Ok(Some(Command::Score {
                name: "ada".into(),
                points: -3
            }))
        );
        assert_eq!(parse("read motd.txt"), Ok(Some(Command::Read("motd.txt".into()))));
        assert_eq!(
            parse("bench-adaptor"),
            Ok(Some(Command::BenchAdaptor(DEFAULT_BENCH_ROUNDS)))
        );
        assert_eq!(parse("bench-adaptor 0"), Ok(Some(Command::BenchAdaptor(1))));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("dance"), Err(ParseError::Unknown("dance".into())));
        assert_eq!(
            parse("score ada"),
            Err(ParseError::MissingArgument {
                command: "score",
                argument: "points"
            })
        );
        assert_eq!(
            parse("score ada lots"),
            Err(ParseError::InvalidNumber {
                command: "score",
                value: "lots".into()
            })
        );
        assert_eq!(
            parse("read"),
            Err(ParseError::MissingArgument {
                command: "read",
                argument: "file name"
            })
        );
    }
}
