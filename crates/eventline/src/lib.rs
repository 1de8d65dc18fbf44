//! Turns a stream of raw output bytes into discrete, size-limited log events.
//!
//! An [`EventBuffer`] escapes incoming bytes, accumulates them under a byte
//! ceiling and, on every flush, writes one line to its sink: either the raw
//! escaped content or a `{"<field>":"<content>"}` object, followed by an
//! optional terminator. Flushes can be driven manually or by a background
//! timer.
//!
//! ```no_run
//! use eventline::EventBuffer;
//! use std::time::Duration;
//!
//! # async fn run() -> eventline::Result<()> {
//! let events = EventBuffer::new(std::io::stdout(), 4096, "\n", "message")?;
//! events.auto_flush(Duration::from_millis(500))?;
//!
//! events.write(b"container started\n");
//! events.flush().ok();
//! events.close();
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod escape;
pub mod format;
pub mod scheduler;

pub use buffer::{EventBuffer, EventBufferBuilder};
pub use config::EventBufferConfig;
pub use error::{EventBufferError, Result};
pub use format::{Framing, LineFormat};
pub use scheduler::{AutoflushHook, TickSource};
