use crate::net::output::OutFrame;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[async_trait]
pub trait ClientSink: Send {
    async fn send_frame(&mut self, frame: OutFrame, seq: u64) -> anyhow::Result<()>;

    /// Flush whatever is pending and shut the stream down.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Plain newline-delimited text over any async writer.
pub struct LineSink<W> {
    writer: W,
}

impl<W> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> ClientSink for LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: OutFrame, seq: u64) -> anyhow::Result<()> {
        match frame {
            OutFrame::Line(s) => {
                self.writer.write_all(s.as_bytes()).await?;
                self.writer.write_all(b"\n").await?;
            }
            OutFrame::Prompt(p) => {
                // No newline: the client types on the same line
                self.writer.write_all(p.as_bytes()).await?;
            }
        }
        self.writer.flush().await?;
        tracing::trace!(seq, "frame written");
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}
