//! Periodic background work for the booking service.
//!
//! Every job runs on its own task and never overlaps with itself: ticks missed
//! while a run is in flight are skipped, not replayed. A run that outlives the
//! job's `run_timeout` is abandoned and counted as timed out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// A unit of periodic background work.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    /// Time between the starts of two runs. The first run starts one period after launch.
    fn period(&self) -> Duration;

    /// Longest a single run may take.
    fn run_timeout(&self) -> Duration {
        self.period()
    }

    async fn run(&self) -> anyhow::Result<()>;
}

/// How a single run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    TimedOut,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Failed => "failed",
            RunOutcome::TimedOut => "timed_out",
        }
    }
}

/// Run `job` once under its timeout and record the outcome.
pub async fn run_once(job: &dyn Job) -> RunOutcome {
    let name = job.name();
    let limit = job.run_timeout();
    let started = Instant::now();

    let outcome = match tokio::time::timeout(limit, job.run()).await {
        Ok(Ok(())) => {
            debug!(
                job = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job completed"
            );
            RunOutcome::Completed
        }
        Ok(Err(e)) => {
            error!(job = name, error = %e, "Job failed");
            RunOutcome::Failed
        }
        Err(_) => {
            warn!(job = name, timeout_ms = limit.as_millis() as u64, "Job run timed out");
            RunOutcome::TimedOut
        }
    };

    histogram!("background_job_duration_seconds", "job" => name)
        .record(started.elapsed().as_secs_f64());
    counter!("background_job_runs_total", "job" => name, "outcome" => outcome.as_str())
        .increment(1);
    outcome
}

/// Owns the tasks of all registered jobs.
pub struct JobRunner {
    pending: Vec<Arc<dyn Job>>,
    stop_tx: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            pending: Vec::new(),
            stop_tx,
            tasks: JoinSet::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.pending.push(Arc::new(job));
    }

    /// Launch every job registered since the last call.
    pub fn start(&mut self) {
        info!(jobs = self.pending.len(), "Starting background jobs");

        for job in self.pending.drain(..) {
            let mut stop_rx = self.stop_tx.subscribe();
            self.tasks.spawn(async move {
                let period = job.period();
                let first = tokio::time::Instant::now() + period;
                let mut ticks = tokio::time::interval_at(first, period);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = ticks.tick() => {
                            run_once(job.as_ref()).await;
                        }
                        _ = stop_rx.changed() => break,
                    }
                }
                debug!(job = job.name(), "Job stopped");
            });
        }
    }

    /// Stop all jobs, waiting up to `grace` for in-flight runs before aborting them.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.stop_tx.send(true);

        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Job task panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "Aborting jobs still running");
            self.tasks.abort_all();
        } else {
            info!("Background jobs stopped");
        }
    }
}
