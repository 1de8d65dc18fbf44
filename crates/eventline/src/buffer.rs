use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EventBufferConfig;
use crate::error::{EventBufferError, Result};
use crate::escape::escaped;
use crate::format::{Framing, LineFormat};
use crate::scheduler::{noop_hook, AutoflushHook, Scheduler, TickSource};

struct Inner<W> {
    content: Vec<u8>,
    sink: W,
}

/// State shared between the caller and the autoflush task
struct Shared<W> {
    inner: Mutex<Inner<W>>,
    framing: Framing,
    max_len: usize,
}

impl<W: Write> Shared<W> {
    fn write(&self, bytes: &[u8]) -> usize {
        let mut inner = self.inner.lock();
        let start = inner.content.len();

        for &byte in bytes {
            let seq = escaped(byte);
            if self.max_len > 0 && inner.content.len() + seq.len() > self.max_len {
                tracing::trace!(max_len = self.max_len, "event buffer full, dropping input");
                break;
            }
            inner.content.extend_from_slice(seq);
        }

        inner.content.len() - start
    }

    fn flush(&self) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.content.is_empty() {
            return Ok(0);
        }

        let line = self.framing.render(&inner.content, self.max_len);
        // Cleared even if the sink fails, a failing sink must not grow the buffer
        inner.content.clear();
        inner.sink.write_all(&line)?;

        Ok(line.len())
    }
}

/// Bounded, escaping line buffer that emits one event per flush.
///
/// Raw bytes go in through [`write`](Self::write), where control characters,
/// backslash and double quote are escaped and the result is capped at
/// `max_len`. [`flush`](Self::flush) wraps the buffered content (raw or as a
/// single-field JSON object), fits it under `max_len` together with the
/// wrapper and terminator, and writes it to the sink.
///
/// Flushing can also run in the background on a timer, see
/// [`auto_flush`](Self::auto_flush).
pub struct EventBuffer<W> {
    shared: Arc<Shared<W>>,
    scheduler: Scheduler,
    hook: AutoflushHook,
}

impl<W: Write + Send + 'static> EventBuffer<W> {
    /// Create a buffer writing to `sink`.
    ///
    /// `max_len` of 0 disables the ceiling, an empty `eol` appends no
    /// terminator and an empty `json_field` selects raw emission.
    pub fn new(
        sink: W,
        max_len: usize,
        eol: impl AsRef<[u8]>,
        json_field: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(sink)
            .max_len(max_len)
            .eol(eol)
            .json_field(json_field)
            .build()
    }

    pub fn builder(sink: W) -> EventBufferBuilder<W> {
        EventBufferBuilder::new(sink)
    }

    /// Create a buffer from config, starting autoflush when an interval is set
    pub fn from_config(sink: W, config: &EventBufferConfig) -> Result<Self> {
        let buffer = Self::new(sink, config.max_len, &config.eol, config.json_field.clone())?;
        if let Some(period) = config.flush_interval() {
            buffer.auto_flush(period)?;
        }
        Ok(buffer)
    }

    /// Escape and append `bytes`, returning how many bytes were appended.
    ///
    /// The count is measured after escaping, so it is not the number of input
    /// bytes consumed. Input that does not fit under `max_len` is dropped
    /// without error; an escape sequence is never split.
    pub fn write(&self, bytes: &[u8]) -> usize {
        self.shared.write(bytes)
    }

    /// Emit the buffered content as one line and clear the buffer.
    ///
    /// Returns the number of bytes handed to the sink, 0 when there was
    /// nothing buffered. Sink errors are returned as-is; the content is
    /// discarded either way.
    pub fn flush(&self) -> io::Result<usize> {
        self.shared.flush()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.inner.lock().content.is_empty()
    }

    /// Length of the buffered, escaped content
    pub fn len(&self) -> usize {
        self.shared.inner.lock().content.len()
    }

    /// Copy of the buffered, escaped content
    pub fn buffered(&self) -> Vec<u8> {
        self.shared.inner.lock().content.clone()
    }

    /// Flush in the background every `period`.
    ///
    /// Calling it again replaces the previous timer. Must be called from
    /// within a tokio runtime.
    ///
    /// The background flush writes to the sink synchronously on a runtime
    /// worker while holding the buffer lock, so a slow or blocking sink
    /// stalls that worker and any foreground `write`/`flush` until it
    /// returns. Prefer a multi-threaded runtime for such sinks.
    pub fn auto_flush(&self, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(EventBufferError::ZeroInterval);
        }
        self.schedule(TickSource::every(period))
    }

    /// Register `source` as the autoflush timer, replacing any previous one
    pub fn schedule(&self, source: TickSource) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        self.scheduler
            .schedule(source, move || shared.flush(), Arc::clone(&self.hook))
    }

    /// Stop background flushing.
    ///
    /// Pending content is not flushed and the sink is left open. Write and
    /// flush keep working afterwards; only scheduling is refused.
    pub fn close(&self) {
        self.scheduler.close();
    }

    pub fn is_closed(&self) -> bool {
        self.scheduler.is_closed()
    }
}

pub struct EventBufferBuilder<W> {
    sink: W,
    max_len: usize,
    eol: Vec<u8>,
    json_field: String,
    hook: Option<AutoflushHook>,
}

impl<W: Write + Send + 'static> EventBufferBuilder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            max_len: 0,
            eol: Vec::new(),
            json_field: String::new(),
            hook: None,
        }
    }

    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn eol(mut self, eol: impl AsRef<[u8]>) -> Self {
        self.eol = eol.as_ref().to_vec();
        self
    }

    pub fn json_field(mut self, field: impl Into<String>) -> Self {
        self.json_field = field.into();
        self
    }

    /// Run `hook` after every background flush, with its outcome
    pub fn on_autoflush<F>(mut self, hook: F) -> Self
    where
        F: Fn(&io::Result<usize>) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<EventBuffer<W>> {
        let format = LineFormat::from_field(self.json_field)?;
        let framing = Framing::new(&format, &self.eol);

        Ok(EventBuffer {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    content: Vec::new(),
                    sink: self.sink,
                }),
                framing,
                max_len: self.max_len,
            }),
            scheduler: Scheduler::new(),
            hook: self.hook.unwrap_or_else(noop_hook),
        })
    }
}
