use crate::input::parser::COMMANDS;
use parley_core::Username;

pub const BANNER: &str = r#" ____            _
|  _ \ __ _ _ __| | ___ _   _
| |_) / _` | '__| |/ _ \ | | |
|  __/ (_| | |  | |  __/ |_| |
|_|   \__,_|_|  |_|\___|\__, |
                        |___/
"#;

pub const ENTRY: &str = "Welcome to the Parley chat server. Please log in.";

pub const SERVER_FULL: &str = "Server is full, try again later.";

pub const GOODBYE: &str = "Goodbye!";

pub const LOCKED_OUT: &str = "Too many failed login attempts. Disconnecting.";

/// Command list, one command per line.
pub fn help_text() -> String {
    let width = COMMANDS.iter().map(|(syntax, _)| syntax.len()).max().unwrap_or(0);
    let mut out = String::from("Available commands:");
    for (syntax, about) in COMMANDS {
        out.push_str(&format!("\n  {syntax:<width$}  {about}"));
    }
    out
}

pub fn welcome(username: &Username) -> String {
    format!("Welcome to the chat server, {username}!\n{}", help_text())
}
