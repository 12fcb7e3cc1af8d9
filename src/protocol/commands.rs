//! Module `commands`
//!
//! Defines the FTP commands recognized on the control connection, the
//! tokenizer turning one command line into a [`Command`], and the result
//! type returned by command handlers.

/// Represents an FTP command parsed from one control line.
///
/// Arguments are kept verbatim; validation happens in the handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Cwd(String),
    List(Option<String>),
    Port(String),
    Quit,
    Retr(String),
    Type(String),
    Pasv,
    Stor(String),
    Unknown(String),
}

impl Command {
    /// Verb as it appears on the wire.
    pub fn verb(&self) -> &str {
        match self {
            Command::User(_) => "USER",
            Command::Cwd(_) => "CWD",
            Command::List(_) => "LIST",
            Command::Port(_) => "PORT",
            Command::Quit => "QUIT",
            Command::Retr(_) => "RETR",
            Command::Type(_) => "TYPE",
            Command::Pasv => "PASV",
            Command::Stor(_) => "STOR",
            Command::Unknown(verb) => verb,
        }
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message),
        }
    }

    pub fn failure(reason: impl Into<String>, message: String) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message),
        }
    }
}

/// Parses one command line (without its line terminator) into a [`Command`].
///
/// The line is split on single spaces: the first token is the verb, matched
/// case-insensitively. Path-like commands take the remainder of the line as
/// their argument so names containing spaces survive.
pub fn parse_command(line: &str) -> Command {
    let (verb, rest) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest),
        None => (line, ""),
    };
    let first_arg = rest.split(' ').next().unwrap_or("");

    match verb.to_ascii_uppercase().as_str() {
        "USER" => Command::User(first_arg.to_string()),
        "CWD" => Command::Cwd(rest.to_string()),
        "LIST" if rest.is_empty() => Command::List(None),
        "LIST" => Command::List(Some(rest.to_string())),
        "PORT" => Command::Port(first_arg.to_string()),
        "QUIT" => Command::Quit,
        "RETR" => Command::Retr(rest.to_string()),
        "TYPE" => Command::Type(first_arg.to_string()),
        "PASV" => Command::Pasv,
        "STOR" => Command::Stor(rest.to_string()),
        _ => Command::Unknown(verb.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(parse_command("QUIT"), Command::Quit);
        assert_eq!(parse_command("PASV"), Command::Pasv);
        assert_eq!(parse_command("LIST"), Command::List(None));
        assert_eq!(parse_command("pasv"), Command::Pasv);
    }

    #[test]
    fn test_parse_commands_with_args() {
        assert_eq!(parse_command("USER bob"), Command::User("bob".to_string()));
        assert_eq!(parse_command("TYPE I"), Command::Type("I".to_string()));
        assert_eq!(parse_command("TYPE A N"), Command::Type("A".to_string()));
        assert_eq!(
            parse_command("CWD /some/path"),
            Command::Cwd("/some/path".to_string())
        );
        assert_eq!(
            parse_command("STOR my report.txt"),
            Command::Stor("my report.txt".to_string())
        );
        assert_eq!(
            parse_command("LIST docs"),
            Command::List(Some("docs".to_string()))
        );
    }

    #[test]
    fn test_missing_arguments_are_empty() {
        assert_eq!(parse_command("USER"), Command::User(String::new()));
        assert_eq!(parse_command("RETR"), Command::Retr(String::new()));
    }

    #[test]
    fn test_unknown_commands() {
        assert_eq!(parse_command("NOOP"), Command::Unknown("NOOP".to_string()));
        assert_eq!(parse_command("FOO bar"), Command::Unknown("FOO".to_string()));
        assert_eq!(parse_command(""), Command::Unknown(String::new()));
    }
}
