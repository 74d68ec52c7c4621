use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::ConfigError;
use crate::hooks::{
    cache, http, query, CacheCommandAdapter, DbQueryAdapter, Granularity, HttpTimingAdapter,
    InstrumentationHook,
};
use crate::metrics::{label_names, LabelSet, QuantileAggregator, QuantileSummary};

/// Explicitly constructed registry of hooks plus the aggregator they feed.
///
/// Owned by the process's top-level assembly code and passed by reference to
/// whatever wires up the instrumented clients — there is no implicit global
/// registry and no init-at-first-use. Dropping the context drops every hook
/// and every bucket with it.
pub struct InstrumentationContext {
    aggregator: Arc<QuantileAggregator>,
    hooks: DashMap<String, Arc<InstrumentationHook>>,
}

impl InstrumentationContext {
    pub fn new() -> Self {
        Self {
            aggregator: Arc::new(QuantileAggregator::new()),
            hooks: DashMap::new(),
        }
    }

    /// Register a hook for one operation kind with its fixed label-name
    /// tuple. Registering a kind twice, or with no label names, is a setup
    /// error — callers get it at construction time, not mid-run.
    pub fn register_adapter(
        &self,
        kind: &str,
        names: &[&str],
        granularity: Granularity,
    ) -> Result<Arc<InstrumentationHook>, ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::EmptyLabelNames(kind.to_string()));
        }
        match self.hooks.entry(kind.to_string()) {
            Entry::Occupied(_) => Err(ConfigError::DuplicateAdapter(kind.to_string())),
            Entry::Vacant(slot) => {
                let hook = Arc::new(InstrumentationHook::new(
                    kind,
                    label_names(names),
                    granularity,
                    self.aggregator.clone(),
                ));
                slot.insert(hook.clone());
                Ok(hook)
            }
        }
    }

    /// HTTP-request adapter: (route, method, status) at microseconds.
    pub fn http_adapter(&self) -> Result<HttpTimingAdapter, ConfigError> {
        let hook = self.register_adapter(http::KIND, http::LABELS, Granularity::Micros)?;
        Ok(HttpTimingAdapter::new(hook))
    }

    /// Database-query adapter: (kind) at milliseconds.
    pub fn db_query_adapter(&self) -> Result<DbQueryAdapter, ConfigError> {
        let hook = self.register_adapter(query::KIND, query::LABELS, Granularity::Millis)?;
        Ok(DbQueryAdapter::new(hook))
    }

    /// Cache-command adapter: (cmd, key_exists) at milliseconds.
    pub fn cache_adapter(&self) -> Result<CacheCommandAdapter, ConfigError> {
        let hook = self.register_adapter(cache::KIND, cache::LABELS, Granularity::Millis)?;
        Ok(CacheCommandAdapter::new(hook))
    }

    /// Point quantile for a registered kind's label values. `None` when the
    /// kind is unregistered, the values don't match the kind's arity, or
    /// nothing has been observed under them.
    pub fn query(&self, kind: &str, values: &[&str], quantile: f64) -> Option<u64> {
        let labels = self.labels_for(kind, values)?;
        self.aggregator.query(&labels, quantile)
    }

    /// Full percentile breakdown for a registered kind's label values.
    pub fn summary(&self, kind: &str, values: &[&str]) -> Option<QuantileSummary> {
        let labels = self.labels_for(kind, values)?;
        self.aggregator.summary(&labels)
    }

    fn labels_for(&self, kind: &str, values: &[&str]) -> Option<LabelSet> {
        let hook = self.hooks.get(kind)?;
        LabelSet::new(hook.label_names(), values.iter().copied()).ok()
    }

    pub fn aggregator(&self) -> &Arc<QuantileAggregator> {
        &self.aggregator
    }
}

impl Default for InstrumentationContext {
    fn default() -> Self {
        Self::new()
    }
}
