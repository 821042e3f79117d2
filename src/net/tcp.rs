mod connection;

use crate::Registry;
use crate::banner::SERVER_FULL;
use crate::error::AppResult;
use crate::net::tcp::connection::handle_connection;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Bind `addr` and run the chat server. Only a bind failure is returned.
pub async fn serve(addr: &str, registry: Arc<Registry>) -> AppResult<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "parley listening");
    run(listener, registry).await
}

/// Accept loop over an already bound listener.
pub async fn run(listener: TcpListener, registry: Arc<Registry>) -> AppResult<()> {
    let limit = registry.config.max_sessions;
    let slots = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let permit = match &slots {
                    Some(slots) => match slots.clone().try_acquire_owned() {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            tracing::warn!(%peer, limit, "server full, refusing connection");
                            tokio::spawn(refuse(stream));
                            continue;
                        }
                    },
                    None => None,
                };

                tracing::info!(%peer, "client connected");
                let registry = registry.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = handle_connection(stream, peer, registry).await {
                        tracing::error!(%peer, error=%e, "connection error");
                    }
                    tracing::info!(%peer, "client disconnected");
                });
            }
            Err(e) => {
                tracing::error!(error=%e, "failed to accept connection");
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }
    }
}

async fn refuse(mut stream: TcpStream) {
    let _ = stream.write_all(format!("{SERVER_FULL}\n").as_bytes()).await;
    let _ = stream.shutdown().await;
}
