use crate::net::sink::{ClientSink, LineSink};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Process-unique identity of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutFrame {
    /// Text line; the sink terminates it with a newline
    Line(String),
    /// Prompt, written without a newline
    Prompt(String),
}

#[derive(Debug)]
pub enum OutEvent {
    /// A frame with its sequence number
    Frame(OutFrame, u64),
    /// Flush, shut the write half down and stop the writer
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    QueueFull,
    #[error("connection closed")]
    Closed,
}

/// Cheap handle to a connection's outbound queue. This is what the registries store.
#[derive(Clone, Debug)]
pub struct OutputHandle {
    /// Connection this queue belongs to
    id: ConnId,
    /// Sender for output events
    tx: mpsc::Sender<OutEvent>,
    /// Next sequence number for output frames
    next_seq: Arc<AtomicU64>,
}

impl PartialEq for OutputHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OutputHandle {}

impl OutputHandle {
    pub fn new(id: ConnId, tx: mpsc::Sender<OutEvent>) -> Self {
        Self {
            id,
            tx,
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// A handle whose events land in the returned receiver instead of a socket.
    pub fn channel(id: ConnId, capacity: usize) -> (Self, mpsc::Receiver<OutEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    #[inline]
    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue a line for our own connection, waiting for room in the queue.
    pub async fn line(&self, s: impl Into<String>) {
        let _ = self.tx.send(OutEvent::Frame(OutFrame::Line(s.into()), self.next_seq())).await;
    }

    pub async fn prompt(&self, s: impl Into<String>) {
        let _ = self.tx.send(OutEvent::Frame(OutFrame::Prompt(s.into()), self.next_seq())).await;
    }

    /// Queue a line on behalf of another session. Never waits.
    pub fn deliver(&self, s: impl Into<String>) -> Result<(), DeliveryError> {
        self.tx
            .try_send(OutEvent::Frame(OutFrame::Line(s.into()), self.next_seq()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }

    pub async fn close(&self) {
        let _ = self.tx.send(OutEvent::Close).await;
    }
}

pub struct SessionOut {
    rx: mpsc::Receiver<OutEvent>,
}

impl SessionOut {
    pub fn new(rx: mpsc::Receiver<OutEvent>) -> Self {
        Self { rx }
    }

    pub async fn run<C>(mut self, mut client: C) -> anyhow::Result<()>
    where
        C: ClientSink,
    {
        while let Some(event) = self.rx.recv().await {
            match event {
                OutEvent::Frame(frame, seq_nr) => client.send_frame(frame, seq_nr).await?,
                OutEvent::Close => break,
            }
        }

        // Later deliveries see a closed queue rather than piling up
        self.rx.close();
        client.close().await
    }
}

pub struct SessionIoBundle {
    pub output: OutputHandle,
    pub writer: JoinHandle<()>,
}

impl SessionIoBundle {
    /// Queue a last `notice` without waiting, then give the writer `grace` to
    /// take the close and flush. A writer still stuck after that (peer not
    /// reading) is aborted, which drops the write half.
    pub async fn shutdown(mut self, notice: Option<&str>, grace: Duration) {
        let id = self.output.id();
        if let Some(notice) = notice {
            if let Err(e) = self.output.deliver(notice) {
                tracing::debug!(conn = %id, error = %e, "final notice dropped");
            }
        }

        let output = self.output.clone();
        let writer = &mut self.writer;
        let drained = tokio::time::timeout(grace, async move {
            output.close().await;
            writer.await
        })
        .await;

        if drained.is_err() {
            tracing::warn!(conn = %id, "writer stalled, aborting");
            self.writer.abort();
            let _ = (&mut self.writer).await;
        }
    }
}

/// Spawn the writer task that owns `writer` and return the handle feeding it.
pub fn init_session_output<W>(writer: W, id: ConnId, capacity: usize) -> SessionIoBundle
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (output, rx) = OutputHandle::channel(id, capacity);
    let session_out = SessionOut::new(rx);
    let sink = LineSink::new(writer);

    let writer = tokio::spawn(async move {
        if let Err(e) = session_out.run(sink).await {
            tracing::debug!(conn = %id, error = %e, "session output stopped");
        }
    });

    SessionIoBundle { output, writer }
}
