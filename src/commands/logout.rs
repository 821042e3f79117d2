use crate::banner::GOODBYE;
use crate::commands::group::announce_departure;
use crate::commands::{CmdCtx, CommandResult, Flow};
use std::sync::Arc;

pub async fn logout(ctx: Arc<CmdCtx>) -> CommandResult {
    let username = ctx.username()?;
    ctx.sess.write().logout();

    let report = ctx.registry.disconnect(Some(&username), ctx.conn_id());
    announce_departure(&username, &report);
    tracing::info!(conn = %ctx.conn_id(), %username, "user logged out");

    ctx.output.line("You have been logged out.").await;
    Ok(Flow::Logout)
}

/// Cleanup is left to the connection, which runs it for every way out.
pub async fn quit(ctx: Arc<CmdCtx>) -> CommandResult {
    ctx.output.line(GOODBYE).await;
    Ok(Flow::Quit)
}
