use crate::commands::{CmdCtx, CommandResult, Flow};
use crate::state::registry::fan_out;
use std::sync::Arc;

pub async fn msg(ctx: Arc<CmdCtx>, to: &str, text: &str) -> CommandResult {
    let sender = ctx.username()?;
    let target = ctx.registry.lookup(to)?;

    fan_out(&[target], &format!("[{sender}] {text}"));
    Ok(Flow::Continue)
}
