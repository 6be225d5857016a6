//! Simulated concurrent load against a single bucket.
//!
//! Each worker is a tokio task that issues a fixed number of requests against
//! the shared bucket, optionally paced by an interval timer. The run reports
//! how many requests the bucket admitted and rejected.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::error::{Result, TollgateError};
use crate::ratelimit::{Clock, SystemClock, TokenBucket};

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// Requests the bucket admitted
    pub admitted: u64,
    /// Requests the bucket rejected
    pub rejected: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Tokens left in the bucket when the run finished
    pub remaining: f64,
}

impl SimulationReport {
    /// Total number of requests issued.
    pub fn total(&self) -> u64 {
        self.admitted + self.rejected
    }
}

/// Drives a shared bucket with concurrent workers.
pub struct Simulation<C: Clock = SystemClock> {
    config: SimulationConfig,
    bucket: Arc<TokenBucket<C>>,
}

impl<C: Clock + 'static> Simulation<C> {
    /// Create a simulation over the given bucket.
    pub fn new(config: SimulationConfig, bucket: Arc<TokenBucket<C>>) -> Self {
        Self { config, bucket }
    }

    /// Run all workers to completion.
    ///
    /// Fails with [`TollgateError::InvalidRequest`] before starting any
    /// worker if the configured cost is zero. If a worker fails, the
    /// remaining workers are aborted and the first failure is returned.
    pub async fn run(self) -> Result<SimulationReport> {
        if self.config.cost == 0 {
            return Err(TollgateError::InvalidRequest(
                "simulation cost must be greater than zero".to_string(),
            ));
        }

        let pace = match self.config.interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        info!(
            workers = self.config.workers,
            requests_per_worker = self.config.requests_per_worker,
            cost = self.config.cost,
            capacity = self.bucket.capacity(),
            fill_rate = self.bucket.fill_rate(),
            "Starting simulation"
        );

        let started = Instant::now();
        let mut workers = JoinSet::new();
        for worker in 0..self.config.workers {
            workers.spawn(drive(
                Arc::clone(&self.bucket),
                worker,
                self.config.requests_per_worker,
                self.config.cost,
                pace,
            ));
        }

        // Returning early drops the set, which aborts the workers still running
        let mut admitted = 0;
        let mut rejected = 0;
        while let Some(joined) = workers.join_next().await {
            let tally = joined??;
            admitted += tally.admitted;
            rejected += tally.rejected;
        }

        Ok(SimulationReport {
            admitted,
            rejected,
            elapsed: started.elapsed(),
            remaining: self.bucket.available(),
        })
    }
}

#[derive(Debug, Default)]
struct Tally {
    admitted: u64,
    rejected: u64,
}

async fn drive<C: Clock>(
    bucket: Arc<TokenBucket<C>>,
    worker: usize,
    requests: u64,
    cost: u64,
    pace: Option<Duration>,
) -> Result<Tally> {
    let mut ticker = pace.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    let mut tally = Tally::default();
    for _ in 0..requests {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        if bucket.allow(cost)? {
            tally.admitted += 1;
        } else {
            tally.rejected += 1;
        }
    }

    debug!(
        worker = worker,
        admitted = tally.admitted,
        rejected = tally.rejected,
        "Worker finished"
    );
    Ok(tally)
}
