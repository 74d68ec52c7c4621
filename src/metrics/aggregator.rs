use dashmap::DashMap;
use hdrhistogram::Histogram;
use parking_lot::Mutex;

use super::quantiles::QuantileSummary;
use super::{LabelSet, Sample};

// ─── Estimator configuration ─────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures.
/// Bounded memory per bucket, ≤ 0.1 % value error at every quantile.
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

fn new_histogram() -> Histogram<u64> {
    Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        .expect("histogram creation")
}

// ─── Aggregator ──────────────────────────────────────────────────

/// Streaming per-label-set quantile summaries.
///
/// One bucket per distinct [`LabelSet`] value, each holding its own
/// histogram behind its own lock — observes on different label sets never
/// contend on a single global lock. Buckets live until [`reset`] or process
/// exit; there is no decay window, so a bucket's answer reflects every
/// duration it has ever seen.
///
/// [`reset`]: QuantileAggregator::reset
pub struct QuantileAggregator {
    buckets: DashMap<LabelSet, Mutex<Histogram<u64>>>,
}

impl QuantileAggregator {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Record one duration for `labels`. Values are clamped to ≥ 1 μs and
    /// saturate at the histogram's upper bound (60 s).
    pub fn observe(&self, labels: LabelSet, duration_micros: u64) {
        let value = duration_micros.max(1);

        // Fast path: bucket already exists.
        if let Some(bucket) = self.buckets.get(&labels) {
            bucket.lock().saturating_record(value);
            return;
        }
        self.buckets
            .entry(labels)
            .or_insert_with(|| Mutex::new(new_histogram()))
            .lock()
            .saturating_record(value);
    }

    /// Consume one sample. Samples are observed exactly once and not
    /// retained afterwards.
    pub fn observe_sample(&self, sample: Sample) {
        self.observe(sample.labels, sample.duration_micros);
    }

    /// Point quantile estimate for `labels`, with `quantile` in (0, 1].
    /// Returns `None` — never zero — when nothing has been observed for
    /// that label set, or when the quantile is out of range.
    pub fn query(&self, labels: &LabelSet, quantile: f64) -> Option<u64> {
        if !(quantile > 0.0 && quantile <= 1.0) {
            return None;
        }
        let bucket = self.buckets.get(labels)?;
        let hist = bucket.lock();
        if hist.is_empty() {
            return None;
        }
        Some(hist.value_at_quantile(quantile))
    }

    /// Full percentile breakdown for `labels`, or `None` if unobserved.
    pub fn summary(&self, labels: &LabelSet) -> Option<QuantileSummary> {
        let bucket = self.buckets.get(labels)?;
        let hist = bucket.lock();
        QuantileSummary::from_histogram(&hist)
    }

    /// Label sets with at least one observation, in no particular order.
    /// This is the poll surface for an external exposition endpoint.
    pub fn tracked_label_sets(&self) -> Vec<LabelSet> {
        self.buckets.iter().map(|e| e.key().clone()).collect()
    }

    /// Wipe all buckets — called when a fresh measurement run starts.
    pub fn reset(&self) {
        self.buckets.clear();
    }
}

impl Default for QuantileAggregator {
    fn default() -> Self {
        Self::new()
    }
}
