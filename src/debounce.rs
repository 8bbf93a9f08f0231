//! Debounce
//!
//! Delays propagation of a frequently changing value until it has been
//! stable for a fixed window.
//!
//! - [`Debounce`] is the clock-agnostic core: feed it values and instants,
//!   poll it for the settled value.
//! - [`Debouncer`] drives the core on the tokio timer in a background task
//!   and delivers settled values on a channel.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Pure debounce state
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a new value, restarting the window
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// When the pending value becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.window)
    }

    /// Take the pending value if the window has elapsed without a new push
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Drop the pending value without emitting it
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

enum Command<T> {
    Push(T),
    Cancel,
}

/// Tokio-driven debouncer
///
/// Dropping the debouncer aborts its task; a pending value is never
/// delivered after that.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Start a debouncer; settled values arrive on the returned receiver
    pub fn spawn(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(Debounce::new(window), rx, out_tx));

        (Self { tx, task }, out_rx)
    }

    pub fn push(&self, value: T) {
        if self.tx.send(Command::Push(value)).is_err() {
            tracing::debug!("Debouncer stopped, dropping value");
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    /// Stop the background task
    pub fn close(&self) {
        self.task.abort();
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T>(
    mut state: Debounce<T>,
    mut rx: mpsc::UnboundedReceiver<Command<T>>,
    out: mpsc::UnboundedSender<T>,
) {
    loop {
        let command = match state.deadline() {
            Some(deadline) => {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = tokio::time::sleep_until(deadline) => {
                        if let Some(value) = state.poll(Instant::now()) {
                            if out.send(value).is_err() {
                                return;
                            }
                        }
                        continue;
                    }
                }
            }
            None => rx.recv().await,
        };

        match command {
            Some(Command::Push(value)) => state.push(value, Instant::now()),
            Some(Command::Cancel) => state.cancel(),
            None => return,
        }
    }
}
