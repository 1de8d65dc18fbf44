mod common;

use common::{BrokenSink, SharedSink};
use eventline::{EventBuffer, EventBufferConfig, EventBufferError, TickSource};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio::time::Duration;

type Outcome = Result<usize, io::ErrorKind>;

/// Buffer whose autoflush outcomes are forwarded to the returned receiver
fn buffer_with_hook<W: Write + Send + 'static>(
    sink: W,
    eol: &str,
) -> (EventBuffer<W>, mpsc::UnboundedReceiver<Outcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let buffer = EventBuffer::builder(sink)
        .eol(eol)
        .on_autoflush(move |outcome| {
            let _ = tx.send(outcome.as_ref().map(|n| *n).map_err(|e| e.kind()));
        })
        .build()
        .unwrap();
    (buffer, rx)
}

#[tokio::test]
async fn test_autoflush() {
    let sink = SharedSink::new();
    let (buffer, mut done) = buffer_with_hook(sink.clone(), "\n");

    buffer.write(b"x");
    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();
    assert_eq!(sink.as_string(), "");

    tick.send(()).await.unwrap();
    assert_eq!(done.recv().await.unwrap(), Ok(2));

    assert_eq!(sink.as_string(), "x\n");
    assert!(buffer.is_empty());
    buffer.close();
}

#[tokio::test]
async fn test_autoflush_tick_on_empty_buffer() {
    let sink = SharedSink::new();
    let (buffer, mut done) = buffer_with_hook(sink.clone(), "\n");

    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();

    tick.send(()).await.unwrap();
    assert_eq!(done.recv().await.unwrap(), Ok(0));
    assert!(sink.contents().is_empty());
}

#[tokio::test]
async fn test_reschedule_replaces_timer() {
    let sink = SharedSink::new();
    let (buffer, mut done) = buffer_with_hook(sink.clone(), "\n");

    let (first, first_source) = TickSource::manual();
    let (second, second_source) = TickSource::manual();
    buffer.schedule(first_source).unwrap();
    buffer.schedule(second_source).unwrap();

    // The replaced source is dropped by the scheduler
    first.closed().await;

    buffer.write(b"swapped");
    second.send(()).await.unwrap();
    assert_eq!(done.recv().await.unwrap(), Ok(8));
    assert_eq!(sink.as_string(), "swapped\n");
}

#[tokio::test(start_paused = true)]
async fn test_auto_flush_interval() {
    let sink = SharedSink::new();
    let (buffer, mut done) = buffer_with_hook(sink.clone(), "\n");

    buffer.auto_flush(Duration::from_millis(100)).unwrap();

    buffer.write(b"one");
    assert_eq!(done.recv().await.unwrap(), Ok(4));
    buffer.write(b"two");
    assert_eq!(done.recv().await.unwrap(), Ok(4));

    assert_eq!(sink.as_string(), "one\ntwo\n");
}

#[tokio::test(start_paused = true)]
async fn test_from_config_starts_autoflush() {
    let sink = SharedSink::new();
    let config = EventBufferConfig {
        flush_interval_ms: 50,
        ..EventBufferConfig::default()
    };

    let buffer = EventBuffer::from_config(sink.clone(), &config).unwrap();
    buffer.write(b"tick");

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(sink.as_string(), "tick\n");
}

#[tokio::test]
async fn test_autoflush_sink_error_reaches_hook() {
    let (buffer, mut done) = buffer_with_hook(BrokenSink, "\n");

    buffer.write(b"doomed");
    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();

    tick.send(()).await.unwrap();
    assert_eq!(done.recv().await.unwrap(), Err(io::ErrorKind::BrokenPipe));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_close_stops_autoflush() {
    let sink = SharedSink::new();
    let (buffer, _done) = buffer_with_hook(sink.clone(), "\n");

    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();
    buffer.close();
    buffer.close();

    tick.closed().await;
    buffer.write(b"pending");
    assert!(sink.contents().is_empty());
    assert!(!buffer.is_empty());

    let (_tick, source) = TickSource::manual();
    assert!(matches!(buffer.schedule(source), Err(EventBufferError::Closed)));

    // Foreground flushing still works after close
    buffer.flush().unwrap();
    assert_eq!(sink.as_string(), "pending\n");
}

#[tokio::test]
async fn test_drop_stops_autoflush() {
    let (buffer, _done) = buffer_with_hook(io::sink(), "\n");

    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();
    drop(buffer);

    tick.closed().await;
}

#[tokio::test]
async fn test_idle_after_tick_source_dropped() {
    let sink = SharedSink::new();
    let (buffer, mut done) = buffer_with_hook(sink.clone(), "\n");

    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();
    drop(tick);

    // A fresh registration brings the scheduler back
    let (tick, source) = TickSource::manual();
    buffer.schedule(source).unwrap();
    buffer.write(b"again");
    tick.send(()).await.unwrap();

    assert_eq!(done.recv().await.unwrap(), Ok(6));
    assert_eq!(sink.as_string(), "again\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_autoflush_racing_foreground_writes() {
    let sink = SharedSink::new();
    let buffer = EventBuffer::new(sink.clone(), 0, "\n", "").unwrap();
    buffer.auto_flush(Duration::from_millis(1)).unwrap();

    for i in 0..2000 {
        buffer.write(b"ab");
        if i % 100 == 0 {
            tokio::task::yield_now().await;
        }
    }
    buffer.close();
    buffer.flush().unwrap();

    // Background and foreground flushes never split a write
    let output = sink.as_string();
    let mut total = 0;
    for line in output.lines() {
        assert!(!line.is_empty());
        assert_eq!(line.len() % 2, 0);
        assert!(line.as_bytes().chunks(2).all(|pair| pair == b"ab"));
        total += line.len();
    }
    assert_eq!(total, 2000 * 2);
}
