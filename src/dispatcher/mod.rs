pub mod http;

pub use http::HttpTarget;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ConfigError, TargetError};
use crate::metrics::{LabelSet, QuantileAggregator};

// ─── Target operation ────────────────────────────────────────────

/// The operation one job invokes exactly once.
///
/// A job is classified solely by its own outcome: any [`TargetError`] — or
/// exceeding the per-job timeout — makes it a failed job, nothing else does.
#[async_trait]
pub trait LoadTarget: Send + Sync {
    async fn call(&self) -> Result<(), TargetError>;
}

// ─── Configuration ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Total number of logical jobs to submit.
    pub total_jobs: u64,
    /// Admission-gate capacity: jobs simultaneously in flight never exceed this.
    pub max_concurrent: usize,
    /// Upper bound on one job's invocation; exceeding it fails the job,
    /// never the run.
    pub per_job_timeout: Duration,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.per_job_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

// ─── Run summary ─────────────────────────────────────────────────

/// The frozen result of one run. Built only after every job reached a
/// terminal state — there is no way to read the counters mid-run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub wall_clock: Duration,
    /// Highest number of jobs observed simultaneously in flight.
    pub peak_in_flight: usize,
    /// Mean per-job latency (timed-out jobs contribute their elapsed time
    /// at expiry).
    pub mean_latency: Duration,
    /// Jobs per second over the whole run.
    pub throughput: f64,
}

// ─── Shared per-run counters ─────────────────────────────────────

#[derive(Default)]
struct Counters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    latency_sum_micros: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

// ─── Dispatcher ──────────────────────────────────────────────────

/// Runs a fixed number of jobs against a target with a hard ceiling on
/// simultaneous invocations.
///
/// The admission gate is a semaphore of capacity `max_concurrent`; permit
/// acquisition on the submitting path is the run's only backpressure point.
/// Each job holds its permit for its whole lifetime, so the permit is
/// released exactly once on every exit path — success, failure, or timeout.
///
/// `run` consumes the dispatcher: a completed run is not restartable, and
/// callers construct a fresh dispatcher per run.
pub struct Dispatcher {
    config: DispatchConfig,
    aggregator: Option<Arc<QuantileAggregator>>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            aggregator: None,
        })
    }

    /// Additionally feed every job's latency into `aggregator` under an
    /// `outcome` label (`ok` / `error`).
    pub fn with_aggregator(mut self, aggregator: Arc<QuantileAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Submit all jobs and wait for every one to reach a terminal state.
    pub async fn run(self, target: Arc<dyn LoadTarget>) -> RunSummary {
        self.run_with_cancellation(target, CancellationToken::new())
            .await
    }

    /// Like [`run`], with a cancellation path: once `cancel` fires, no
    /// further jobs are admitted, but in-flight jobs drain to their own
    /// completion or timeout rather than being killed mid-flight. The
    /// summary then covers the jobs actually launched.
    ///
    /// [`run`]: Dispatcher::run
    pub async fn run_with_cancellation(
        self,
        target: Arc<dyn LoadTarget>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let DispatchConfig {
            total_jobs,
            max_concurrent,
            per_job_timeout,
        } = self.config;

        info!(total_jobs, max_concurrent, "dispatch run starting");

        let gate = Arc::new(Semaphore::new(max_concurrent));
        let counters = Arc::new(Counters::default());
        let started = Instant::now();

        let mut handles = Vec::with_capacity(total_jobs.min(10_000) as usize);
        let mut submitted = 0u64;

        for id in 0..total_jobs {
            // The only point where the submitting path may block.
            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(submitted, "run cancelled, draining in-flight jobs");
                    break;
                }
                permit = gate.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    // The gate is never closed; treat a closed gate like
                    // cancellation rather than panicking.
                    Err(_) => break,
                },
            };
            submitted += 1;

            let target = target.clone();
            let counters = counters.clone();
            let aggregator = self.aggregator.clone();

            handles.push(tokio::spawn(async move {
                // Held until this task ends, whichever way it ends.
                let _permit = permit;

                let active = counters.active.fetch_add(1, Ordering::Relaxed) + 1;
                counters.peak.fetch_max(active, Ordering::Relaxed);

                let t0 = Instant::now();
                let outcome = tokio::time::timeout(per_job_timeout, target.call()).await;
                let elapsed = t0.elapsed();

                counters.active.fetch_sub(1, Ordering::Relaxed);
                counters
                    .latency_sum_micros
                    .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

                let ok = match outcome {
                    Ok(Ok(())) => true,
                    Ok(Err(err)) => {
                        debug!(job = id, %err, "job failed");
                        false
                    }
                    Err(_) => {
                        debug!(job = id, timeout_ms = per_job_timeout.as_millis() as u64, "job timed out");
                        false
                    }
                };
                if ok {
                    counters.succeeded.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }

                if let Some(agg) = aggregator {
                    let outcome = if ok { "ok" } else { "error" };
                    let labels = LabelSet::from_pairs(&[("outcome", outcome)]);
                    agg.observe(labels, elapsed.as_micros() as u64);
                }
            }));
        }

        // Drain: the summary is only built once every job is terminal.
        for handle in handles {
            let _ = handle.await;
        }

        let wall_clock = started.elapsed();
        let summary = Self::freeze(submitted, &counters, wall_clock);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            wall_clock_ms = wall_clock.as_millis() as u64,
            "dispatch run finished"
        );
        summary
    }

    fn freeze(submitted: u64, counters: &Counters, wall_clock: Duration) -> RunSummary {
        let latency_sum = counters.latency_sum_micros.load(Ordering::Relaxed);
        let mean_latency = if submitted == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(latency_sum / submitted)
        };
        let throughput = if wall_clock.is_zero() {
            0.0
        } else {
            submitted as f64 / wall_clock.as_secs_f64()
        };
        RunSummary {
            submitted,
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            wall_clock,
            peak_in_flight: counters.peak.load(Ordering::Relaxed),
            mean_latency,
            throughput,
        }
    }
}

/// One-shot entry point for a command-line or automated harness. Only
/// invalid configuration prevents a run from starting; once started, the
/// run always drains and returns a summary.
pub async fn run_load_test(
    target: Arc<dyn LoadTarget>,
    total_jobs: u64,
    max_concurrent: usize,
    per_job_timeout: Duration,
) -> Result<RunSummary, ConfigError> {
    let dispatcher = Dispatcher::new(DispatchConfig {
        total_jobs,
        max_concurrent,
        per_job_timeout,
    })?;
    Ok(dispatcher.run(target).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SleepTarget {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl LoadTarget for SleepTarget {
        async fn call(&self) -> Result<(), TargetError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(TargetError::Status(500))
            } else {
                Ok(())
            }
        }
    }

    fn config(total_jobs: u64, max_concurrent: usize, timeout: Duration) -> DispatchConfig {
        DispatchConfig {
            total_jobs,
            max_concurrent,
            per_job_timeout: timeout,
        }
    }

    #[test]
    fn zero_concurrency_refuses_to_start() {
        assert!(matches!(
            Dispatcher::new(config(10, 0, Duration::from_secs(5))),
            Err(ConfigError::InvalidConcurrency)
        ));
        assert!(matches!(
            Dispatcher::new(config(10, 1, Duration::ZERO)),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[tokio::test]
    async fn every_job_reaches_a_terminal_state() {
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(1),
            fail: false,
        });
        let summary = run_load_test(target, 200, 20, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(summary.submitted, 200);
        assert_eq!(summary.succeeded, 200);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.succeeded + summary.failed, summary.submitted);
        assert!(summary.throughput > 0.0);
    }

    #[tokio::test]
    async fn in_flight_jobs_never_exceed_the_gate_capacity() {
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(10),
            fail: false,
        });
        let summary = run_load_test(target, 32, 4, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(summary.peak_in_flight <= 4, "peak = {}", summary.peak_in_flight);
        assert!(summary.peak_in_flight >= 2, "peak = {}", summary.peak_in_flight);
        assert_eq!(summary.succeeded, 32);
    }

    #[tokio::test]
    async fn wall_clock_is_bounded_below_by_the_serial_fraction() {
        // 40 jobs of ~5 ms through 8 slots need at least 5 waves.
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(5),
            fail: false,
        });
        let summary = run_load_test(target, 40, 8, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 40);
        assert!(
            summary.wall_clock >= Duration::from_millis(20),
            "wall clock = {:?}",
            summary.wall_clock
        );
        assert!(summary.mean_latency >= Duration::from_millis(4));
    }

    #[tokio::test]
    async fn failing_target_degrades_counts_not_the_run() {
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(1),
            fail: true,
        });
        let summary = run_load_test(target, 50, 10, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(summary.failed, 50);
        assert_eq!(summary.succeeded, 0);
    }

    #[tokio::test]
    async fn slow_jobs_fail_at_their_timeout_and_the_run_still_finishes() {
        let target = Arc::new(SleepTarget {
            delay: Duration::from_secs(30),
            fail: false,
        });
        let started = Instant::now();
        let summary = run_load_test(target, 6, 3, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(summary.failed, 6);
        assert_eq!(summary.succeeded + summary.failed, summary.submitted);
        // Two waves of 100 ms timeouts, not 30 s jobs.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn zero_jobs_is_a_valid_empty_run() {
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(1),
            fail: false,
        });
        let summary = run_load_test(target, 0, 4, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.succeeded + summary.failed, 0);
        assert_eq!(summary.mean_latency, Duration::ZERO);
    }

    #[tokio::test]
    async fn cancellation_stops_admission_and_drains_in_flight() {
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(20),
            fail: false,
        });
        let dispatcher = Dispatcher::new(config(1000, 2, Duration::from_secs(5))).unwrap();

        let cancel = CancellationToken::new();
        let run = tokio::spawn(dispatcher.run_with_cancellation(target, cancel.clone()));

        tokio::time::sleep(Duration::from_millis(70)).await;
        cancel.cancel();
        let summary = run.await.unwrap();

        assert!(summary.submitted > 0);
        assert!(summary.submitted < 1000);
        assert_eq!(summary.succeeded + summary.failed, summary.submitted);
    }

    #[tokio::test]
    async fn per_job_latency_feeds_the_attached_aggregator() {
        let agg = Arc::new(QuantileAggregator::new());
        let target = Arc::new(SleepTarget {
            delay: Duration::from_millis(2),
            fail: false,
        });
        let dispatcher = Dispatcher::new(config(25, 5, Duration::from_secs(5)))
            .unwrap()
            .with_aggregator(agg.clone());
        let summary = dispatcher.run(target).await;

        assert_eq!(summary.succeeded, 25);
        let labels = LabelSet::from_pairs(&[("outcome", "ok")]);
        assert_eq!(agg.summary(&labels).unwrap().count, 25);
    }
}
