use crate::banner::help_text;
use crate::error::ChatError;
use crate::input::parser::{Command, ParseError, parse_command};
use crate::net::output::{ConnId, OutputHandle};
use crate::state::groups::Member;
use crate::state::session::Session;
use crate::Registry;
use parking_lot::RwLock;
use parley_core::Username;
use std::sync::Arc;
use thiserror::Error;

mod broadcast;
mod direct;
pub mod group;
mod logout;
mod who;

pub type CommandResult = Result<Flow, CommandError>;

/// What the session loop does after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Back to the username prompt on the same connection
    Logout,
    /// Close the connection
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("You must be logged in to do that.")]
    NotLoggedIn,

    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// Command context passed to command handlers
pub struct CmdCtx {
    /// Our own outbound queue
    pub output: OutputHandle,
    /// Shared chat state
    pub registry: Arc<Registry>,
    /// This connection's session
    pub sess: Arc<RwLock<Session>>,
}

impl CmdCtx {
    pub fn conn_id(&self) -> ConnId {
        self.output.id()
    }

    pub fn username(&self) -> Result<Username, CommandError> {
        self.sess.read().username().cloned().ok_or(CommandError::NotLoggedIn)
    }

    /// This connection as a group member.
    pub fn member(&self) -> Result<Member, CommandError> {
        Ok(Member {
            username: self.username()?,
            output: self.output.clone(),
        })
    }
}

pub async fn process_command(raw: &str, ctx: Arc<CmdCtx>) -> CommandResult {
    let cmd = parse_command(raw)?;
    tracing::trace!(conn = %ctx.conn_id(), verb = cmd.verb(), "command");

    match cmd {
        Command::Msg { to, text } => direct::msg(ctx, &to, &text).await,
        Command::Broadcast { text } => broadcast::broadcast(ctx, &text).await,
        Command::CreateGroup { group } => group::create(ctx, group).await,
        Command::JoinGroup { group } => group::join(ctx, group).await,
        Command::LeaveGroup { group } => group::leave(ctx, group).await,
        Command::GroupMsg { group, text } => group::message(ctx, group, &text).await,
        Command::Active => who::active(ctx).await,
        Command::Groups => who::groups(ctx).await,
        Command::Help => {
            ctx.output.line(help_text()).await;
            Ok(Flow::Continue)
        }
        Command::Logout => logout::logout(ctx).await,
        Command::Quit => logout::quit(ctx).await,
    }
}
