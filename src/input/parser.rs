//! Command parser for chat input lines.
//!
//! Examples:
//!   "/msg bob hello there"        -> Command::Msg { to: "bob", text: "hello there" }
//!   "/broadcast hi all"           -> Command::Broadcast { text: "hi all" }
//!   "/group_msg study see you"    -> Command::GroupMsg { group: "study", text: "see you" }
//!   "/active"                     -> Command::Active
//!   "/dance"                      -> ParseError::Unknown("/dance")
//!
//! The command word must match exactly; everything after it is split into
//! at most one name and a free-form text tail.

use parley_core::GroupName;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Msg { to: String, text: String },
    Broadcast { text: String },
    CreateGroup { group: GroupName },
    JoinGroup { group: GroupName },
    LeaveGroup { group: GroupName },
    GroupMsg { group: GroupName, text: String },
    Active,
    Groups,
    Logout,
    Help,
    Quit,
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Msg { .. } => "/msg",
            Command::Broadcast { .. } => "/broadcast",
            Command::CreateGroup { .. } => "/create_group",
            Command::JoinGroup { .. } => "/join_group",
            Command::LeaveGroup { .. } => "/leave_group",
            Command::GroupMsg { .. } => "/group_msg",
            Command::Active => "/active",
            Command::Groups => "/grps",
            Command::Logout => "/logout",
            Command::Help => "/help",
            Command::Quit => "/quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown command: {0}. Type /help for a list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Syntax and one-line description of every command, in help order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/msg <user> <text>", "send a private message"),
    ("/broadcast <text>", "send a message to everyone online"),
    ("/create_group <name>", "create a group and join it"),
    ("/join_group <name>", "join an existing group"),
    ("/leave_group <name>", "leave a group"),
    ("/group_msg <name> <text>", "send a message to a group"),
    ("/active", "list users online"),
    ("/grps", "list groups and their members"),
    ("/help", "show this list"),
    ("/logout", "log out and return to the login prompt"),
    ("/quit", "disconnect"),
];

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = split_word(line);

    match word {
        "/msg" => {
            let (to, text) = split_word(rest);
            if to.is_empty() || text.is_empty() {
                return Err(ParseError::Usage("/msg <user> <text>"));
            }
            Ok(Command::Msg {
                to: to.to_string(),
                text: text.to_string(),
            })
        }
        "/broadcast" => {
            if rest.is_empty() {
                return Err(ParseError::Usage("/broadcast <text>"));
            }
            Ok(Command::Broadcast { text: rest.to_string() })
        }
        "/create_group" => group_arg(rest, "/create_group <name>").map(|group| Command::CreateGroup { group }),
        "/join_group" => group_arg(rest, "/join_group <name>").map(|group| Command::JoinGroup { group }),
        "/leave_group" => group_arg(rest, "/leave_group <name>").map(|group| Command::LeaveGroup { group }),
        "/group_msg" => {
            let (name, text) = split_word(rest);
            if text.is_empty() {
                return Err(ParseError::Usage("/group_msg <name> <text>"));
            }
            let group = group_arg(name, "/group_msg <name> <text>")?;
            Ok(Command::GroupMsg {
                group,
                text: text.to_string(),
            })
        }
        "/active" => no_args(rest, Command::Active),
        "/grps" => no_args(rest, Command::Groups),
        "/logout" => no_args(rest, Command::Logout),
        "/help" => no_args(rest, Command::Help),
        "/quit" => no_args(rest, Command::Quit),
        _ => Err(ParseError::Unknown(word.to_string())),
    }
}

/// First whitespace-separated word and the trimmed remainder.
fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn group_arg(rest: &str, usage: &'static str) -> Result<GroupName, ParseError> {
    GroupName::parse(rest).map_err(|_| ParseError::Usage(usage))
}

fn no_args(rest: &str, cmd: Command) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(cmd)
    } else {
        Err(ParseError::Usage(cmd.verb()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(s: &str) -> GroupName {
        GroupName::parse(s).unwrap()
    }

    #[test]
    fn t_msg_keeps_text_spacing() {
        let c = parse_command("/msg bob hello   there").unwrap();
        assert_eq!(
            c,
            Command::Msg {
                to: "bob".into(),
                text: "hello   there".into()
            }
        );
    }

    #[test]
    fn t_msg_needs_user_and_text() {
        assert_eq!(parse_command("/msg"), Err(ParseError::Usage("/msg <user> <text>")));
        assert_eq!(parse_command("/msg bob"), Err(ParseError::Usage("/msg <user> <text>")));
        assert_eq!(parse_command("/msg bob   "), Err(ParseError::Usage("/msg <user> <text>")));
    }

    #[test]
    fn t_broadcast() {
        assert_eq!(
            parse_command("/broadcast hi").unwrap(),
            Command::Broadcast { text: "hi".into() }
        );
        assert_eq!(parse_command("/broadcast"), Err(ParseError::Usage("/broadcast <text>")));
    }

    #[test]
    fn t_group_commands() {
        assert_eq!(
            parse_command("/create_group study").unwrap(),
            Command::CreateGroup { group: g("study") }
        );
        assert_eq!(
            parse_command("/join_group study").unwrap(),
            Command::JoinGroup { group: g("study") }
        );
        assert_eq!(
            parse_command("/leave_group study").unwrap(),
            Command::LeaveGroup { group: g("study") }
        );
        assert_eq!(
            parse_command("/group_msg study see you at 5").unwrap(),
            Command::GroupMsg {
                group: g("study"),
                text: "see you at 5".into()
            }
        );
    }

    #[test]
    fn t_bad_group_names_are_usage_errors() {
        assert_eq!(parse_command("/create_group"), Err(ParseError::Usage("/create_group <name>")));
        assert_eq!(
            parse_command("/join_group two words"),
            Err(ParseError::Usage("/join_group <name>"))
        );
        assert_eq!(
            parse_command("/group_msg study"),
            Err(ParseError::Usage("/group_msg <name> <text>"))
        );
    }

    #[test]
    fn t_zero_arity() {
        assert_eq!(parse_command("/active").unwrap(), Command::Active);
        assert_eq!(parse_command("  /grps  ").unwrap(), Command::Groups);
        assert_eq!(parse_command("/logout").unwrap(), Command::Logout);
        assert_eq!(parse_command("/active now"), Err(ParseError::Usage("/active")));
    }

    #[test]
    fn t_prefix_must_match_whole_word() {
        assert_eq!(
            parse_command("/msgbob hi"),
            Err(ParseError::Unknown("/msgbob".into()))
        );
        assert_eq!(parse_command("hello"), Err(ParseError::Unknown("hello".into())));
        assert_eq!(parse_command("/MSG bob hi"), Err(ParseError::Unknown("/MSG".into())));
    }

    #[test]
    fn t_unknown_notice_points_to_help() {
        let e = parse_command("/dance").unwrap_err();
        assert_eq!(e.to_string(), "Unknown command: /dance. Type /help for a list of commands.");
    }

    #[test]
    fn t_every_listed_command_parses() {
        for (syntax, _) in COMMANDS {
            let line = syntax
                .replace("<user>", "bob")
                .replace("<name>", "study")
                .replace("<text>", "hello");
            assert!(parse_command(&line).is_ok(), "{line}");
        }
    }
}
