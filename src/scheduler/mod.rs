//! Fixed-interval job scheduler
//!
//! Runs one [`ScheduledJob`] every `period`, starting one period after
//! [`IntervalScheduler::start`]. A tick that fails, by returning an error or by
//! panicking, is logged and the next tick fires on schedule.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Work triggered on every tick
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Job name for logs
    fn name(&self) -> &str;

    /// Run the job once
    async fn run(&self) -> Result<()>;
}

/// Runs a job on a fixed period
pub struct IntervalScheduler {
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    ticks: Arc<AtomicU64>,
    started: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalScheduler {
    /// Create a scheduler. Nothing runs until [`start`](Self::start).
    pub fn new(job: Arc<dyn ScheduledJob>, period: Duration) -> Self {
        Self {
            job,
            period,
            ticks: Arc::new(AtomicU64::new(0)),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks fired so far
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    /// Start the timer. A scheduler can only be started once.
    pub async fn start(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(Error::Scheduler("period must be greater than zero".to_string()));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Scheduler(format!(
                "job '{}' is already scheduled",
                self.job.name()
            )));
        }

        let task = tokio::spawn(tick_loop(
            self.job.clone(),
            self.period,
            self.ticks.clone(),
            self.cancel.clone(),
        ));
        *self.task.lock().await = Some(task);

        tracing::info!(
            job = self.job.name(),
            period_secs = self.period.as_secs_f64(),
            "Jobs scheduled successfully."
        );
        Ok(())
    }

    /// Stop the timer, abandoning a tick that is still running
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
        tracing::info!(job = self.job.name(), "Scheduler stopped");
    }
}

async fn tick_loop(
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    ticks: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(job = job.name(), tick, "Scheduled send job triggered.");

        // run each tick in its own task so a panic is contained to that tick
        let mut run = tokio::spawn({
            let job = job.clone();
            async move { job.run().await }
        });

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                run.abort();
                break;
            }
            outcome = &mut run => outcome,
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(job = job.name(), tick, error = %e, "Error during scheduled job");
            }
            Err(e) => {
                tracing::error!(
                    job = job.name(),
                    tick,
                    error = %e,
                    "Scheduled job failed unexpectedly"
                );
            }
        }
    }
}
