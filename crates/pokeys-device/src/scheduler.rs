//! Background poll loop, one per device.
//!
//! Each scheduler owns a dedicated OS thread running a single-threaded tokio
//! runtime. The loop sleeps for the start delay, then polls at a fixed
//! interval until stopped. Host commands can hand it one-shot deferred
//! actions, such as turning a pulsed PWM channel back off.
//!
//! ```text
//!   host thread                 poll thread
//!   ───────────                 ───────────
//!   start() ──── spawn ───────► wait start delay
//!                               ┌─► tick: poll_cycle() ──► publish events
//!   schedule(action) ── mpsc ──►│   deadline: run_deferred(action)
//!                               └── until shutdown
//!   stop() ───── watch ───────► run pending actions, exit
//!          ◄──── join ─────────
//! ```
//!
//! Stopping is synchronous: [`PollScheduler::stop`] returns only after the
//! thread has exited, so no poll can run once it returns.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use pokeys_core::PwmChannel;
use pokeys_hardware::{HardwareError, Result};

use crate::events::{Event, EventEmitter};

/// Work the scheduler drives on behalf of a device.
pub trait PollTarget: Send + Sync + 'static {
    /// Name used for the poll thread and in logs.
    fn label(&self) -> String;

    /// Run one blocking poll cycle and return the events it produced.
    fn poll_cycle(&self) -> Vec<Event>;

    fn run_deferred(&self, action: DeferredAction);

    fn emitter(&self) -> &EventEmitter;
}

/// One-shot action executed by the poll thread at a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Drive a PWM channel's duty back to zero, unless a newer pulse has
    /// started on it since.
    PwmOff { channel: PwmChannel, pulse: u64 },
}

#[derive(Debug)]
struct Deferred {
    due: Instant,
    action: DeferredAction,
}

/// Handle to a running poll thread.
#[derive(Debug)]
pub struct PollScheduler {
    label: String,
    shutdown: watch::Sender<bool>,
    commands: mpsc::UnboundedSender<Deferred>,
    thread: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn the poll thread.
    ///
    /// The first cycle runs after `start_delay`, then every `interval`.
    pub fn start(
        target: Arc<dyn PollTarget>,
        start_delay: Duration,
        interval: Duration,
    ) -> Result<Self> {
        let label = target.label();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| HardwareError::scheduler(format!("runtime for {label}: {e}")))?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name(format!("pokeys-poll-{label}"))
            .spawn(move || {
                runtime.block_on(run(target, start_delay, interval, shutdown_rx, commands_rx));
            })
            .map_err(|e| HardwareError::scheduler(format!("poll thread for {label}: {e}")))?;

        info!(
            "Poll scheduler for {} started (delay {:?}, interval {:?})",
            label, start_delay, interval
        );

        Ok(Self {
            label,
            shutdown,
            commands,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Queue `action` to run on the poll thread after `delay`.
    ///
    /// Hands the action back if the loop is no longer running.
    pub fn schedule(
        &self,
        delay: Duration,
        action: DeferredAction,
    ) -> std::result::Result<(), DeferredAction> {
        if !self.is_running() {
            return Err(action);
        }
        let deferred = Deferred {
            due: Instant::now() + delay,
            action,
        };
        self.commands.send(deferred).map_err(|e| e.0.action)
    }

    /// Stop the loop and wait for the thread to exit.
    ///
    /// Pending deferred actions run before the thread exits. Calling this
    /// more than once is a no-op.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.shutdown.send_replace(true);

        if thread.thread().id() == thread::current().id() {
            warn!("Poll scheduler for {} stopped from its own thread", self.label);
            return;
        }

        if thread.join().is_err() {
            error!("Poll thread for {} panicked", self.label);
        }
        info!("Poll scheduler for {} stopped", self.label);
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    target: Arc<dyn PollTarget>,
    start_delay: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut commands: mpsc::UnboundedReceiver<Deferred>,
) {
    let mut ticker = time::interval_at(time::Instant::now() + start_delay, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<Deferred> = Vec::new();

    loop {
        let next_due = pending.iter().map(|d| d.due).min();

        tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            Some(deferred) = commands.recv() => {
                trace!("Deferred {:?} queued", deferred.action);
                pending.push(deferred);
            }

            _ = sleep_until(next_due) => {
                run_due(target.as_ref(), &mut pending);
            }

            _ = ticker.tick() => {
                let events = target.poll_cycle();
                if !target.emitter().publish(events, &mut shutdown).await {
                    break;
                }
            }
        }
    }

    if !pending.is_empty() {
        debug!(
            "Running {} pending deferred actions for {}",
            pending.len(),
            target.label()
        );
    }
    for deferred in pending {
        target.run_deferred(deferred.action);
    }
}

async fn sleep_until(due: Option<Instant>) {
    match due {
        Some(due) => time::sleep_until(time::Instant::from_std(due)).await,
        None => std::future::pending().await,
    }
}

fn run_due(target: &dyn PollTarget, pending: &mut Vec<Deferred>) {
    let now = Instant::now();
    let (due, waiting): (Vec<_>, Vec<_>) = pending.drain(..).partition(|d| d.due <= now);
    *pending = waiting;
    for deferred in due {
        target.run_deferred(deferred.action);
    }
}
