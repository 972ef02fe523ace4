//! Parsing of the line-oriented commands read from stdin.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Select the n-th topic (1-based) of the list.
    SelectTopic(usize),
    /// Select the n-th FAQ (1-based) of the current topic.
    SelectFaq(usize),
    PauseAudio,
    CloseAnswer,
    ListTopics,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'h' for help.")]
    Unknown(String),
    #[error("'{0}' expects a number from 1 upwards")]
    BadIndex(String),
}

pub const HELP: &str = "\
Commands:
  t <n>  play topic n
  f <n>  play FAQ n of the current topic
  p      pause narration
  c      close the FAQ answer
  l      list topics
  h      show this help
  q      quit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();

        let index = |verb: &str| -> Result<usize, CommandError> {
            arg.and_then(|a| a.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| CommandError::BadIndex(verb.to_string()))
        };

        match verb.as_str() {
            "t" | "topic" => Ok(Command::SelectTopic(index("t")?)),
            "f" | "faq" => Ok(Command::SelectFaq(index("f")?)),
            "p" | "pause" => Ok(Command::PauseAudio),
            "c" | "close" => Ok(Command::CloseAnswer),
            "l" | "list" => Ok(Command::ListTopics),
            "h" | "help" | "?" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
