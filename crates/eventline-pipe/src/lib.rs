//! Frames a raw byte stream into size-limited log events.

pub mod config;

use anyhow::Context;
use eventline::EventBuffer;
use std::io::Write;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::Config;

/// Byte counts for one pipe run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Raw bytes read from the input
    pub bytes_read: u64,
    /// Escaped bytes accepted into the event buffer
    pub bytes_buffered: u64,
}

/// Feed `reader` into an event buffer writing to `sink` until EOF.
///
/// Autoflush runs when the config sets an interval. At EOF the background
/// flushing is stopped first and whatever is still buffered is emitted as
/// the final event.
pub async fn run<R, W>(mut reader: R, sink: W, config: &Config) -> anyhow::Result<RunStats>
where
    R: AsyncRead + Unpin,
    W: Write + Send + 'static,
{
    let events = EventBuffer::from_config(sink, &config.buffer)
        .context("Failed to create event buffer")?;

    let mut chunk = vec![0u8; config.input.read_chunk_size.max(1)];
    let mut stats = RunStats::default();

    loop {
        let n = reader.read(&mut chunk).await.context("Failed to read input")?;
        if n == 0 {
            break;
        }

        stats.bytes_read += n as u64;
        stats.bytes_buffered += events.write(&chunk[..n]) as u64;
    }

    events.close();
    events.flush().context("Failed to write final event")?;

    Ok(stats)
}
