//! Bounded, newline-delimited line reader for client input.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("end of stream")]
    Eof,
    #[error("line longer than {0} bytes")]
    TooLong(usize),
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
    #[error("idle timeout")]
    Idle,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct LineReader<R> {
    reader: BufReader<R>,
    max_line: usize,
    idle: Option<Duration>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_line: usize, idle: Option<Duration>) -> Self {
        Self {
            reader: BufReader::new(inner),
            max_line,
            idle,
            buf: Vec::with_capacity(128),
        }
    }

    /// Next line without its `\n` or `\r\n` terminator. A final line with no
    /// terminator is returned as-is before [`ReadError::Eof`].
    pub async fn next_line(&mut self) -> Result<String, ReadError> {
        match self.idle {
            Some(limit) => tokio::time::timeout(limit, self.read_raw())
                .await
                .map_err(|_| ReadError::Idle)?,
            None => self.read_raw().await,
        }
    }

    async fn read_raw(&mut self) -> Result<String, ReadError> {
        self.buf.clear();
        // Room for the longest line plus "\r\n"
        let limit = self.max_line as u64 + 2;
        let n = (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Err(ReadError::Eof);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        } else if n as u64 == limit {
            return Err(ReadError::TooLong(self.max_line));
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        if self.buf.len() > self.max_line {
            return Err(ReadError::TooLong(self.max_line));
        }

        String::from_utf8(std::mem::take(&mut self.buf)).map_err(|_| ReadError::InvalidUtf8)
    }
}
