//! Owner of the periodic refresh tasks.
//!
//! Each job gets one driver task. The driver runs a pass immediately, then one
//! per interval tick and one per [`RefreshSignal`] on the bus. Passes are
//! spawned as their own tasks so a slow fetch never delays the next tick;
//! ordering of their results is the [`SequencedStore`](crate::SequencedStore)'s job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use crate::bus::{RefreshBus, RefreshReason, RefreshSignal};

#[derive(Debug)]
pub struct RefreshScheduler {
    shutdown_tx: watch::Sender<bool>,
    jobs: Vec<(String, JoinHandle<()>)>,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            jobs: Vec::new(),
        }
    }

    /// Starts a job. `job` is called once per pass with the reason for it.
    pub fn spawn_job<F, Fut>(&mut self, name: &str, period: Duration, bus: &RefreshBus, job: F)
    where
        F: Fn(RefreshReason) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut signals = bus.subscribe();
        let job = Arc::new(job);
        let job_name = name.to_string();
        // interval panics on a zero period
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            if *shutdown.borrow() {
                return;
            }
            tracing::info!(job = %job_name, interval_secs = period.as_secs(), "Starting refresh job");

            // the first tick completes immediately, which gives the startup pass
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut passes = JoinSet::new();
            let mut bus_open = true;

            loop {
                let reason = tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = timer.tick() => RefreshReason::Poll,
                    received = signals.recv(), if bus_open => match received {
                        Ok(RefreshSignal { reason }) => reason,
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!(job = %job_name, missed, "Refresh signals lagged, running one pass");
                            RefreshReason::Manual
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!(job = %job_name, "Refresh bus closed, polling only");
                            bus_open = false;
                            continue;
                        }
                    },
                };

                tracing::debug!(job = %job_name, ?reason, "Refresh pass starting");
                let job = Arc::clone(&job);
                passes.spawn(async move { job(reason).await });

                while let Some(finished) = passes.try_join_next() {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(job = %job_name, "Refresh pass panicked");
                        }
                    }
                }
            }

            passes.abort_all();
            tracing::info!(job = %job_name, "Refresh job stopped");
        });

        self.jobs.push((name.to_string(), handle));
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stops every job and any pass still in flight. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.is_shut_down() {
            tracing::info!(jobs = self.jobs.len(), "Shutting down refresh scheduler");
        }
        self.shutdown_tx.send_replace(true);
        for (_, handle) in self.jobs.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        for (_, handle) in &self.jobs {
            handle.abort();
        }
    }
}
