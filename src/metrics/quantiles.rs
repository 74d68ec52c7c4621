use hdrhistogram::Histogram;
use serde::Serialize;

/// A complete percentile breakdown for one label set, in microseconds.
/// Serialized straight into whatever exposition format the caller owns.
#[derive(Debug, Clone, Serialize)]
pub struct QuantileSummary {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
}

impl QuantileSummary {
    /// Extract a full breakdown from a bucket's histogram.
    /// `None` when nothing has been recorded — an empty bucket has no
    /// quantiles, not zero-valued ones.
    pub fn from_histogram(hist: &Histogram<u64>) -> Option<Self> {
        if hist.is_empty() {
            return None;
        }
        Some(Self {
            count: hist.len(),
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_quantile(0.50),
            p90: hist.value_at_quantile(0.90),
            p99: hist.value_at_quantile(0.99),
        })
    }
}
