pub mod cache;
pub mod http;
pub mod query;

pub use cache::{CacheCommandAdapter, NotFoundOutcome};
pub use http::HttpTimingAdapter;
pub use query::{DbQueryAdapter, QueryKind};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::metrics::{LabelSet, QuantileAggregator, Sample};

// ─── Timing token ────────────────────────────────────────────────

/// Opaque carrier for one operation's start instant.
///
/// Returned by [`InstrumentationHook::before`] and consumed by
/// [`InstrumentationHook::after`]. It is neither `Clone` nor `Copy`, so one
/// `before` funds exactly one `after` — the token is threaded explicitly
/// through the unit of work instead of living in shared state, and
/// concurrent operations can never clobber each other's start times.
#[derive(Debug)]
pub struct TimingToken {
    started: Instant,
}

impl TimingToken {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

// ─── Duration granularity ────────────────────────────────────────

/// Clock resolution a hook reports at. The aggregator always stores
/// microseconds; millisecond hooks round down to whole milliseconds first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Micros,
    Millis,
}

impl Granularity {
    fn quantize(self, elapsed: Duration) -> u64 {
        match self {
            Self::Micros => elapsed.as_micros() as u64,
            Self::Millis => (elapsed.as_millis() as u64).saturating_mul(1000),
        }
    }
}

// ─── Hook ────────────────────────────────────────────────────────

/// The before/after pair every adapter variant shares.
///
/// Bound to one operation kind, one fixed label-name tuple, one granularity,
/// and one aggregator. `after` turns the elapsed time into a [`Sample`] and
/// feeds it in; that aggregator mutation is the hook's only observable
/// effect. A bad label arity is logged and counted, never propagated — the
/// instrumented operation's own result stays untouched.
pub struct InstrumentationHook {
    kind: String,
    label_names: Arc<[String]>,
    granularity: Granularity,
    aggregator: Arc<QuantileAggregator>,
    dropped: AtomicU64,
}

impl InstrumentationHook {
    pub(crate) fn new(
        kind: &str,
        label_names: Arc<[String]>,
        granularity: Granularity,
        aggregator: Arc<QuantileAggregator>,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            label_names,
            granularity,
            aggregator,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn label_names(&self) -> Arc<[String]> {
        self.label_names.clone()
    }

    /// Start timing one operation invocation.
    pub fn before(&self) -> TimingToken {
        TimingToken {
            started: Instant::now(),
        }
    }

    /// Finish timing and emit one sample under `values`. Must be called on
    /// every exit path of the operation, error paths included.
    pub fn after(&self, token: TimingToken, values: &[&str]) {
        let micros = self.granularity.quantize(token.elapsed());
        match LabelSet::new(self.label_names.clone(), values.iter().copied()) {
            Ok(labels) => self.aggregator.observe_sample(Sample::new(labels, micros)),
            Err(err) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind = %self.kind, %err, "dropped sample");
            }
        }
    }

    /// How many samples this hook failed to emit since construction.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::label_names;

    fn hook(granularity: Granularity) -> (Arc<QuantileAggregator>, InstrumentationHook) {
        let agg = Arc::new(QuantileAggregator::new());
        let hook = InstrumentationHook::new(
            "test_op",
            label_names(&["outcome"]),
            granularity,
            agg.clone(),
        );
        (agg, hook)
    }

    #[test]
    fn after_emits_one_sample_under_the_given_labels() {
        let (agg, hook) = hook(Granularity::Micros);
        let token = hook.before();
        hook.after(token, &["ok"]);

        let labels = LabelSet::from_pairs(&[("outcome", "ok")]);
        assert_eq!(agg.summary(&labels).unwrap().count, 1);
        assert_eq!(hook.dropped_samples(), 0);
    }

    #[test]
    fn arity_mismatch_is_counted_not_propagated() {
        let (agg, hook) = hook(Granularity::Micros);
        let token = hook.before();
        hook.after(token, &["ok", "extra"]);

        assert_eq!(hook.dropped_samples(), 1);
        assert!(agg.tracked_label_sets().is_empty());
    }

    #[test]
    fn millis_granularity_rounds_down_to_whole_milliseconds() {
        assert_eq!(Granularity::Millis.quantize(Duration::from_micros(2700)), 2000);
        assert_eq!(Granularity::Millis.quantize(Duration::from_micros(999)), 0);
        assert_eq!(Granularity::Micros.quantize(Duration::from_micros(2700)), 2700);
    }
}
