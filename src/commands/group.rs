use crate::commands::{CmdCtx, CommandResult, Flow};
use crate::state::groups::RemovalReport;
use crate::state::registry::{Left, fan_out};
use parley_core::{GroupName, Username};
use std::sync::Arc;

pub async fn create(ctx: Arc<CmdCtx>, group: GroupName) -> CommandResult {
    let member = ctx.member()?;
    let username = member.username.clone();
    ctx.registry.create_group(group.clone(), member)?;

    tracing::info!(%group, %username, "group created");
    ctx.output
        .line(format!("Group {group} created. You are its first member."))
        .await;
    Ok(Flow::Continue)
}

pub async fn join(ctx: Arc<CmdCtx>, group: GroupName) -> CommandResult {
    let member = ctx.member()?;
    let username = member.username.clone();
    let joined = ctx.registry.join_group(&group, member)?;

    if !joined.newly_joined {
        ctx.output
            .line(format!("You are already a member of the group {group}."))
            .await;
        return Ok(Flow::Continue);
    }

    ctx.output
        .line(format!("You have successfully joined the group {group}."))
        .await;
    fan_out(&joined.others, &format!("{username} has joined the group {group}."));
    Ok(Flow::Continue)
}

pub async fn leave(ctx: Arc<CmdCtx>, group: GroupName) -> CommandResult {
    let username = ctx.username()?;
    let left = ctx.registry.leave_group(&group, ctx.conn_id())?;

    ctx.output
        .line(format!("You have successfully left the group {group}."))
        .await;
    match left {
        Left::Deleted => {
            tracing::info!(%group, "group deleted");
            ctx.output
                .line(format!("Group {group} is now empty and has been deleted."))
                .await;
        }
        Left::Remaining(others) => {
            fan_out(&others, &left_notice(&username, &group));
        }
    }
    Ok(Flow::Continue)
}

pub async fn message(ctx: Arc<CmdCtx>, group: GroupName, text: &str) -> CommandResult {
    let sender = ctx.username()?;
    let targets = ctx.registry.group_targets(&group, ctx.conn_id())?;

    fan_out(&targets, &format!("[{group}] {sender}: {text}"));
    Ok(Flow::Continue)
}

/// Tell the groups a departing user was stripped from that they are gone.
pub fn announce_departure(username: &Username, report: &RemovalReport) {
    for (group, members) in &report.left {
        let targets: Vec<_> = members.iter().map(|m| m.output.clone()).collect();
        fan_out(&targets, &left_notice(username, group));
    }
    for group in &report.deleted {
        tracing::info!(%group, "group deleted");
    }
}

fn left_notice(username: &Username, group: &GroupName) -> String {
    format!("{username} has left the group {group}.")
}
