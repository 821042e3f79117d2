#![allow(dead_code)]

use parley::config::Config;
use parley::net::tcp;
use parley::services::CredentialStore;
use parley::Registry;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

const USERS: &str = "alice:password123\nbob:hunter2\ncarol:c4rol\n";

pub const WAIT: Duration = Duration::from_secs(5);

pub fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        ..Config::default()
    }
}

pub async fn start_server() -> (SocketAddr, Arc<Registry>) {
    start_server_with(test_config()).await
}

pub async fn start_server_with(config: Config) -> (SocketAddr, Arc<Registry>) {
    let mut users = tempfile::NamedTempFile::new().unwrap();
    users.write_all(USERS.as_bytes()).unwrap();
    let credentials = CredentialStore::load(users.path()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(Registry::new(Arc::new(config), Arc::new(credentials)));

    let registry_clone = registry.clone();
    tokio::spawn(async move {
        if let Err(e) = tcp::run(listener, registry_clone).await {
            eprintln!("server error in test: {e}");
        }
    });

    (addr, registry)
}

pub struct TestClient {
    rd: OwnedReadHalf,
    wr: OwnedWriteHalf,
    buf: String,
}

impl TestClient {
    pub async fn connect(addr: &SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (rd, wr) = stream.into_split();
        Self {
            rd,
            wr,
            buf: String::new(),
        }
    }

    /// Connect and log in, consuming everything up to the end of the welcome text.
    pub async fn login(addr: &SocketAddr, user: &str, pass: &str) -> Self {
        let mut c = Self::connect(addr).await;
        c.expect("Enter username: ").await;
        c.send(user).await;
        c.expect("Enter password: ").await;
        c.send(pass).await;
        c.expect(&format!("Welcome to the chat server, {user}!")).await;
        c.expect("disconnect\n").await;
        c
    }

    pub async fn send(&mut self, line: &str) {
        self.wr.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    /// Read until `needle` shows up. Returns everything read up to and
    /// including it; the rest stays buffered.
    pub async fn expect(&mut self, needle: &str) -> String {
        let found = tokio::time::timeout(WAIT, async {
            loop {
                if let Some(pos) = self.buf.find(needle) {
                    let end = pos + needle.len();
                    let rest = self.buf.split_off(end);
                    return std::mem::replace(&mut self.buf, rest);
                }
                if !self.fill().await {
                    panic!("connection closed while waiting for {needle:?}, got {:?}", self.buf);
                }
            }
        })
        .await;
        found.unwrap_or_else(|_| panic!("timeout waiting for {needle:?}, got {:?}", self.buf))
    }

    /// `true` once the server has closed the connection.
    pub async fn closed(&mut self) -> bool {
        tokio::time::timeout(WAIT, async {
            while self.fill().await {}
        })
        .await
        .is_ok()
    }

    async fn fill(&mut self) -> bool {
        let mut chunk = [0u8; 1024];
        match self.rd.read(&mut chunk).await {
            Ok(0) | Err(_) => false,
            Ok(n) => {
                self.buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
                true
            }
        }
    }
}
