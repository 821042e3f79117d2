use crate::commands::{CmdCtx, CommandResult, Flow};
use crate::state::registry::fan_out;
use std::sync::Arc;

pub async fn broadcast(ctx: Arc<CmdCtx>, text: &str) -> CommandResult {
    let sender = ctx.username()?;
    let targets = ctx.registry.broadcast_targets(ctx.conn_id());

    let delivered = fan_out(&targets, &format!("[Broadcast from {sender}] {text}"));
    tracing::debug!(%sender, recipients = targets.len(), delivered, "broadcast");
    Ok(Flow::Continue)
}
