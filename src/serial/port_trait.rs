//! Trait abstraction for line-oriented serial reads to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::SerialPort;

/// Trait for reading newline-terminated telemetry from a port
#[async_trait]
pub trait LineSource: Send {
    /// Bytes that can be read without waiting
    async fn bytes_available(&mut self) -> io::Result<usize>;

    /// Append one line, including its `\n`, to `buf`
    ///
    /// Returns the number of bytes appended. When the read timeout expires
    /// first, the partial bytes received so far are kept in `buf`.
    async fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
}

/// Wrapper around tokio_serial::SerialStream that implements LineSource
pub struct TokioSerialLines {
    reader: BufReader<tokio_serial::SerialStream>,
    timeout: Duration,
}

impl TokioSerialLines {
    pub fn new(port: tokio_serial::SerialStream, timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(port),
            timeout,
        }
    }
}

#[async_trait]
impl LineSource for TokioSerialLines {
    async fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.reader.get_ref().bytes_to_read()?;
        Ok(self.reader.buffer().len() + pending as usize)
    }

    async fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let start = buf.len();
        match tokio::time::timeout(self.timeout, self.reader.read_until(b'\n', buf)).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(buf.len() - start),
        }
    }
}
