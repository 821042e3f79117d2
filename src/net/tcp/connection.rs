use crate::banner::{BANNER, ENTRY, LOCKED_OUT, welcome};
use crate::commands::group::announce_departure;
use crate::commands::{CmdCtx, Flow, process_command};
use crate::error::AppResult;
use crate::input::readline::{LineReader, ReadError};
use crate::net::output::init_session_output;
use crate::services::auth::{AuthStep, Authenticator};
use crate::{Registry, Session};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

/// How long the writer gets to flush after the session ends
const WRITER_GRACE: Duration = Duration::from_secs(5);

pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, registry: Arc<Registry>) -> AppResult<()> {
    let (read_half, write_half) = stream.into_split();
    let config = registry.config.clone();

    let id = registry.next_conn_id();
    let io_bundle = init_session_output(write_half, id, config.queue_capacity());
    let sess = Arc::new(RwLock::new(Session::new(id, peer)));
    let mut reader = LineReader::new(read_half, config.max_line_bytes, config.idle_timeout());

    io_bundle.output.line(BANNER).await;
    io_bundle.output.line(ENTRY).await;

    let ctx = Arc::new(CmdCtx {
        output: io_bundle.output.clone(),
        registry: registry.clone(),
        sess: sess.clone(),
    });

    let result = session_loop(&mut reader, &ctx).await;
    cleanup(&ctx);

    let (outcome, notice) = match result {
        Ok(()) | Err(ReadError::Eof) => (Ok(()), None),
        Err(ReadError::Io(e)) => (Err(e.into()), None),
        Err(e) => {
            tracing::info!(%peer, conn = %id, reason = %e, "dropping connection");
            let notice = match e {
                ReadError::TooLong(_) => "Line too long, disconnecting.",
                ReadError::Idle => "Idle timeout, disconnecting.",
                _ => "Invalid input, disconnecting.",
            };
            (Ok(()), Some(notice))
        }
    };

    io_bundle.shutdown(notice, WRITER_GRACE).await;

    outcome
}

/// Login, then commands, until the client quits or the stream ends.
/// `/logout` goes back round to the login prompt on the same connection.
async fn session_loop<R>(reader: &mut LineReader<R>, ctx: &Arc<CmdCtx>) -> Result<(), ReadError>
where
    R: AsyncRead + Unpin,
{
    let auth = Authenticator::new(ctx.registry.clone());

    loop {
        if !authenticate(&auth, reader, ctx).await? {
            return Ok(());
        }
        match command_loop(reader, ctx).await? {
            Flow::Quit => return Ok(()),
            Flow::Logout | Flow::Continue => {}
        }
    }
}

/// Returns `false` when the connection should be closed without logging in.
async fn authenticate<R>(auth: &Authenticator, reader: &mut LineReader<R>, ctx: &Arc<CmdCtx>) -> Result<bool, ReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let prompt = ctx.sess.read().prompt();
        if let Some(p) = prompt {
            ctx.output.prompt(p).await;
        }

        let line = reader.next_line().await?;
        let step = {
            let mut s = ctx.sess.write();
            auth.advance(&mut s, &line, &ctx.output)
        };

        match step {
            AuthStep::Continue => {}
            AuthStep::Rejected(e) => ctx.output.line(e.to_string()).await,
            AuthStep::Locked(e) => {
                ctx.output.line(e.to_string()).await;
                ctx.output.line(LOCKED_OUT).await;
                return Ok(false);
            }
            AuthStep::Authenticated(username) => {
                ctx.output.line(welcome(&username)).await;
                return Ok(true);
            }
        }
    }
}

async fn command_loop<R>(reader: &mut LineReader<R>, ctx: &Arc<CmdCtx>) -> Result<Flow, ReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = reader.next_line().await?;
        if line.trim().is_empty() {
            continue;
        }

        match process_command(&line, ctx.clone()).await {
            Ok(Flow::Continue) => {}
            Ok(flow) => return Ok(flow),
            Err(e) => ctx.output.line(e.to_string()).await,
        }
    }
}

fn cleanup(ctx: &CmdCtx) {
    let username = ctx.sess.write().logout();
    let report = ctx.registry.disconnect(username.as_ref(), ctx.conn_id());

    if let Some(username) = &username {
        announce_departure(username, &report);
        tracing::info!(conn = %ctx.conn_id(), %username, "user went offline");
    }

    let s = ctx.sess.read();
    tracing::debug!(conn = %s.id(), peer = %s.peer(), uptime = ?s.uptime(), "session closed");
}
