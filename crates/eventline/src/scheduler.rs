use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{EventBufferError, Result};

/// Called after every background flush with the flush outcome
pub type AutoflushHook = Arc<dyn Fn(&io::Result<usize>) + Send + Sync>;

pub(crate) fn noop_hook() -> AutoflushHook {
    Arc::new(|_| {})
}

/// Timer that drives background flushes
pub struct TickSource {
    kind: TickKind,
}

enum TickKind {
    Every(Duration),
    Manual(mpsc::Receiver<()>),
}

impl TickSource {
    /// Tick once per `period`, starting one period after registration
    pub fn every(period: Duration) -> Self {
        Self { kind: TickKind::Every(period) }
    }

    /// Tick whenever `()` is sent on the returned sender.
    ///
    /// Dropping the sender leaves the scheduler idle until another source
    /// is registered.
    pub fn manual() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(1);
        (tx, Self { kind: TickKind::Manual(rx) })
    }
}

enum ActiveTicks {
    Interval(Interval),
    Manual(mpsc::Receiver<()>),
}

impl ActiveTicks {
    fn start(source: TickSource) -> Self {
        match source.kind {
            TickKind::Every(period) => {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ActiveTicks::Interval(ticker)
            }
            TickKind::Manual(rx) => ActiveTicks::Manual(rx),
        }
    }

    /// Returns false once the source can never tick again
    async fn tick(&mut self) -> bool {
        match self {
            ActiveTicks::Interval(ticker) => {
                ticker.tick().await;
                true
            }
            ActiveTicks::Manual(rx) => rx.recv().await.is_some(),
        }
    }
}

async fn next_tick(ticks: &mut Option<ActiveTicks>) -> bool {
    match ticks {
        Some(ticks) => ticks.tick().await,
        None => std::future::pending().await,
    }
}

struct SchedulerState {
    control: Option<mpsc::UnboundedSender<TickSource>>,
    closed: bool,
}

/// Owns the background autoflush task.
///
/// The task is spawned on the first registration and lives until `close`
/// (or drop). Registrations travel over a control channel; the task only
/// keeps the most recent one, so re-registering swaps the timer instead of
/// running two.
pub(crate) struct Scheduler {
    state: Mutex<SchedulerState>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                control: None,
                closed: false,
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn schedule<F>(&self, source: TickSource, flush: F, hook: AutoflushHook) -> Result<()>
    where
        F: Fn() -> io::Result<usize> + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(EventBufferError::Closed);
        }

        // The task may be gone if the runtime that spawned it shut down.
        let source = match &state.control {
            Some(control) => match control.send(source) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(source)) => source,
            },
            None => source,
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| EventBufferError::NoRuntime)?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        // Receiver is alive until the spawned task is dropped
        let _ = control_tx.send(source);
        runtime.spawn(run(control_rx, self.cancel.clone(), flush, hook));
        state.control = Some(control_tx);

        tracing::debug!("autoflush task started");
        Ok(())
    }

    /// Stop the background task; safe to call repeatedly
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.control = None;
        self.cancel.cancel();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run<F>(
    mut control: mpsc::UnboundedReceiver<TickSource>,
    cancel: CancellationToken,
    flush: F,
    hook: AutoflushHook,
) where
    F: Fn() -> io::Result<usize>,
{
    let mut ticks: Option<ActiveTicks> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            registered = control.recv() => {
                let Some(mut source) = registered else { break };
                // Last registration wins
                while let Ok(newer) = control.try_recv() {
                    source = newer;
                }
                tracing::debug!(replacing = ticks.is_some(), "autoflush timer registered");
                ticks = Some(ActiveTicks::start(source));
            }
            ticked = next_tick(&mut ticks) => {
                if !ticked {
                    tracing::debug!("autoflush tick source closed, waiting for a new one");
                    ticks = None;
                    continue;
                }

                let outcome = flush();
                if let Err(e) = &outcome {
                    tracing::warn!(error = %e, "autoflush failed to write event");
                }
                hook(&outcome);
            }
        }
    }

    tracing::debug!("autoflush task stopped");
}
