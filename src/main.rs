use clap::Parser;
use parley::services::CredentialStore;
use parley::{Registry, config::Config, net::tcp};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "parley", about = "Line-oriented group chat server")]
struct Args {
    /// TOML config file; without it PARLEY_* environment variables are used
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config
    #[arg(short, long)]
    listen: Option<String>,

    /// Credential file, overrides the config
    #[arg(short, long)]
    users: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(listen) = args.listen {
        cfg.listen_addr = listen;
    }
    if let Some(users) = args.users {
        cfg.users_file = users;
    }

    let credentials = Arc::new(CredentialStore::load(&cfg.users_file)?);
    if credentials.is_empty() {
        tracing::warn!(path = %cfg.users_file.display(), "no credentials loaded, nobody can log in");
    }

    let cfg = Arc::new(cfg);
    let registry = Arc::new(Registry::new(cfg.clone(), credentials));

    tokio::select! {
        res = tcp::serve(&cfg.listen_addr, registry.clone()) => res?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(online = registry.online_count(), groups = registry.group_count(), "shutting down");
        }
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::anyhow!(e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,parley=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}
