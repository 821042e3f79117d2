use crate::commands::{CmdCtx, CommandResult, Flow};
use std::sync::Arc;

pub async fn active(ctx: Arc<CmdCtx>) -> CommandResult {
    ctx.username()?;
    let online = ctx.registry.who();
    let names: Vec<&str> = online.iter().map(|u| u.as_str()).collect();

    ctx.output
        .line(format!("Active users ({}): {}", names.len(), names.join(", ")))
        .await;
    Ok(Flow::Continue)
}

pub async fn groups(ctx: Arc<CmdCtx>) -> CommandResult {
    ctx.username()?;
    let groups = ctx.registry.groups();
    if groups.is_empty() {
        ctx.output.line("No groups exist.").await;
        return Ok(Flow::Continue);
    }

    let mut out = format!("Groups ({}):", groups.len());
    for (name, members) in groups {
        let names: Vec<&str> = members.iter().map(|u| u.as_str()).collect();
        out.push_str(&format!("\n  {name}: {}", names.join(", ")));
    }
    ctx.output.line(out).await;
    Ok(Flow::Continue)
}
