use anyhow::{Context, bail};
use clap::Parser;
use futures::future::join_all;
use parley::services::CredentialStore;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

// cargo run --bin parley-stress -- --addr 127.0.0.1:12345 --users users.txt --messages 20

#[derive(Debug, Parser)]
#[command(name = "parley-stress", version, about = "Load a running parley server with scripted clients")]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:12345")]
    addr: String,

    /// Credential file; one client logs in per entry
    #[arg(long, default_value = "users.txt")]
    users: PathBuf,

    /// Random actions per client
    #[arg(long, default_value_t = 20)]
    messages: usize,

    /// Delay between client start-ups
    #[arg(long, default_value_t = 50)]
    ramp_ms: u64,

    /// How long to wait for the server to answer an action
    #[arg(long, default_value_t = 500)]
    reply_timeout_ms: u64,

    /// Pause between actions is picked from this range
    #[arg(long, default_value_t = 100)]
    min_delay_ms: u64,
    #[arg(long, default_value_t = 1000)]
    max_delay_ms: u64,
}

#[derive(Debug, Default)]
struct Report {
    auth_success: u64,
    auth_failures: u64,
    sent: u64,
    replies: u64,
    reply_time: Duration,
    errors: u64,
}

impl Report {
    fn merge(&mut self, other: Report) {
        self.auth_success += other.auth_success;
        self.auth_failures += other.auth_failures;
        self.sent += other.sent;
        self.replies += other.replies;
        self.reply_time += other.reply_time;
        self.errors += other.errors;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Arc::new(Args::parse());

    let store = CredentialStore::load(&args.users).context("loading credentials")?;
    if store.is_empty() {
        bail!("no credentials in {}", args.users.display());
    }
    let creds = store.entries();
    let names: Arc<Vec<String>> = Arc::new(creds.iter().map(|(u, _)| u.clone()).collect());

    let started = Instant::now();
    let mut clients = Vec::with_capacity(creds.len());
    for (username, password) in creds {
        clients.push(tokio::spawn(run_client(args.clone(), names.clone(), username, password)));
        tokio::time::sleep(Duration::from_millis(args.ramp_ms)).await;
    }

    let mut total = Report::default();
    for res in join_all(clients).await {
        match res {
            Ok(report) => total.merge(report),
            Err(e) => {
                tracing::error!(error = %e, "client task panicked");
                total.errors += 1;
            }
        }
    }

    print_summary(names.len(), &total, started.elapsed());
    Ok(())
}

fn print_summary(clients: usize, r: &Report, elapsed: Duration) {
    let avg = if r.replies > 0 {
        r.reply_time.as_secs_f64() / r.replies as f64
    } else {
        0.0
    };
    let throughput = r.sent as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!("--- Stress test summary ---");
    println!("Clients:                 {clients}");
    println!("Messages sent:           {}", r.sent);
    println!("Authentication success:  {}", r.auth_success);
    println!("Authentication failures: {}", r.auth_failures);
    println!("Errors:                  {}", r.errors);
    println!("Replies received:        {}", r.replies);
    println!("Average response time:   {avg:.4} s");
    println!("Throughput:              {throughput:.2} msg/s");
}

async fn run_client(args: Arc<Args>, names: Arc<Vec<String>>, username: String, password: String) -> Report {
    match client_session(&args, &names, &username, &password).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(%username, error = %e, "client failed");
            Report {
                errors: 1,
                ..Report::default()
            }
        }
    }
}

async fn client_session(args: &Args, names: &[String], username: &str, password: &str) -> anyhow::Result<Report> {
    let mut report = Report::default();
    let reply_timeout = Duration::from_millis(args.reply_timeout_ms);
    let login_timeout = Duration::from_secs(5);

    let stream = TcpStream::connect(&args.addr)
        .await
        .with_context(|| format!("connecting to {}", args.addr))?;
    let mut conn = Conn::new(stream);

    conn.wait_for(&["Enter username: "], login_timeout).await?;
    conn.send(username).await?;
    conn.wait_for(&["Enter password: "], login_timeout).await?;
    conn.send(password).await?;

    let reply = conn
        .wait_for(&["Welcome", "Authentication failed!", "already logged in"], login_timeout)
        .await?;
    if !reply.contains("Welcome") {
        tracing::warn!(%username, "login refused");
        report.auth_failures += 1;
        return Ok(report);
    }
    tracing::info!(%username, "logged in");
    report.auth_success += 1;

    let group = format!("group_{}", rand::rng().random_range(1..=10));
    for _ in 0..args.messages {
        let (line, pause) = next_action(args, names, username, &group);

        let start = Instant::now();
        conn.send(&line).await?;
        report.sent += 1;
        if let Some(reply) = conn.next_reply(reply_timeout).await? {
            report.replies += 1;
            report.reply_time += start.elapsed();
            tracing::debug!(%username, sent = %line, reply = reply.trim(), "reply");
        }

        tokio::time::sleep(pause).await;
    }

    conn.send("/logout").await?;
    tracing::info!(%username, "logged out");
    Ok(report)
}

/// Pick the next command line and the pause after it. The rng never lives across an await.
fn next_action(args: &Args, names: &[String], username: &str, group: &str) -> (String, Duration) {
    let mut rng = rand::rng();
    let text = format!("Hello from {username}");
    let target = names.choose(&mut rng).map(String::as_str).unwrap_or(username);

    let line = match rng.random_range(0..4) {
        0 => format!("/msg {target} {text}"),
        1 => format!("/group_msg {group} {text}"),
        2 => format!("/broadcast {text}"),
        _ if rng.random_bool(0.5) => format!("/create_group {group}"),
        _ => format!("/join_group {group}"),
    };

    let lo = args.min_delay_ms.min(args.max_delay_ms);
    let hi = args.max_delay_ms.max(lo);
    (line, Duration::from_millis(rng.random_range(lo..=hi)))
}

struct Conn {
    rd: OwnedReadHalf,
    wr: OwnedWriteHalf,
    buf: String,
}

impl Conn {
    fn new(stream: TcpStream) -> Self {
        let (rd, wr) = stream.into_split();
        Self {
            rd,
            wr,
            buf: String::new(),
        }
    }

    async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.wr.write_all(format!("{line}\n").as_bytes()).await?;
        Ok(())
    }

    async fn read_some(&mut self) -> anyhow::Result<()> {
        let mut chunk = [0u8; 1024];
        let n = self.rd.read(&mut chunk).await?;
        if n == 0 {
            bail!("server closed the connection");
        }
        self.buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
        Ok(())
    }

    /// Read until the buffer holds one of `needles`, then hand back and clear everything read.
    async fn wait_for(&mut self, needles: &[&str], limit: Duration) -> anyhow::Result<String> {
        let found = tokio::time::timeout(limit, async {
            while !needles.iter().any(|n| self.buf.contains(n)) {
                self.read_some().await?;
            }
            anyhow::Ok(())
        })
        .await;

        match found {
            Ok(res) => res.map(|()| std::mem::take(&mut self.buf)),
            Err(_) => bail!("timed out waiting for {needles:?}"),
        }
    }

    /// Whatever arrives next, or `None` if the server stays quiet.
    async fn next_reply(&mut self, limit: Duration) -> anyhow::Result<Option<String>> {
        self.buf.clear();
        match tokio::time::timeout(limit, self.read_some()).await {
            Ok(res) => res.map(|()| Some(std::mem::take(&mut self.buf))),
            Err(_) => Ok(None),
        }
    }
}
