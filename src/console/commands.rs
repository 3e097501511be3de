//! Operator input lines for the interactive script console

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PadBridgeError;

/// Help text listing every console input.
pub const HELP: &str = "\
title <name>     set the editor title
open <file>      load the editor text from a file
save             save the editor under its title
load <name>      load a saved script (load! discards unsaved edits)
list             list saved scripts
show             print the editor
run              run the editor text on the remote
abort            abort the running script
restart          restart the remote backend
status           query remote status
backup <file>    write every saved script to a JSON file
quit             exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Title(String),
    Open(PathBuf),
    Save,
    Load { title: String, force: bool },
    List,
    Show,
    Run,
    Abort,
    Restart,
    Status,
    Backup(PathBuf),
    Help,
    Quit,
}

impl FromStr for ConsoleInput {
    type Err = PadBridgeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let argument = |what: &str| {
            if rest.is_empty() {
                Err(PadBridgeError::Validation(format!("'{}' needs {}", word, what)))
            } else {
                Ok(rest.to_string())
            }
        };

        let input = match word {
            "title" => ConsoleInput::Title(argument("a title")?),
            "open" => ConsoleInput::Open(PathBuf::from(argument("a file")?)),
            "save" => ConsoleInput::Save,
            "load" => ConsoleInput::Load { title: argument("a title")?, force: false },
            "load!" => ConsoleInput::Load { title: argument("a title")?, force: true },
            "list" | "ls" => ConsoleInput::List,
            "show" => ConsoleInput::Show,
            "run" => ConsoleInput::Run,
            "abort" => ConsoleInput::Abort,
            "restart" => ConsoleInput::Restart,
            "status" => ConsoleInput::Status,
            "backup" => ConsoleInput::Backup(PathBuf::from(argument("a file")?)),
            "help" | "?" => ConsoleInput::Help,
            "quit" | "exit" => ConsoleInput::Quit,
            "" => return Err(PadBridgeError::Validation("empty input".to_string())),
            other => {
                return Err(PadBridgeError::Validation(format!(
                    "Unknown command '{}', try 'help'",
                    other
                )))
            }
        };
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_words() {
        assert_eq!("run".parse::<ConsoleInput>().unwrap(), ConsoleInput::Run);
        assert_eq!("  abort ".parse::<ConsoleInput>().unwrap(), ConsoleInput::Abort);
        assert_eq!("exit".parse::<ConsoleInput>().unwrap(), ConsoleInput::Quit);
    }

    #[test]
    fn test_parse_arguments_keep_inner_spaces() {
        assert_eq!(
            "title  my  combo ".parse::<ConsoleInput>().unwrap(),
            ConsoleInput::Title("my  combo".into())
        );
        assert_eq!(
            "load! old one".parse::<ConsoleInput>().unwrap(),
            ConsoleInput::Load { title: "old one".into(), force: true }
        );
        assert_eq!(
            "backup /tmp/b.json".parse::<ConsoleInput>().unwrap(),
            ConsoleInput::Backup(PathBuf::from("/tmp/b.json"))
        );
    }

    #[test]
    fn test_parse_missing_argument() {
        assert!("title".parse::<ConsoleInput>().is_err());
        assert!("load   ".parse::<ConsoleInput>().is_err());
    }

    #[test]
    fn test_parse_unknown() {
        assert!("dance".parse::<ConsoleInput>().is_err());
        assert!("".parse::<ConsoleInput>().is_err());
    }
}
