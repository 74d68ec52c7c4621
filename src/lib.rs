//! Latency instrumentation and synthetic load generation.
//!
//! Two independent pieces:
//!
//! - **Instrumentation** — before/after timing hooks for heterogeneous
//!   operation kinds (HTTP requests, database queries, cache commands),
//!   feeding duration samples into streaming per-label-set quantile
//!   summaries. Wired up through an explicitly owned
//!   [`InstrumentationContext`]; there are no global registries.
//! - **Load generation** — a [`Dispatcher`] that drives a target operation
//!   at a fixed job count under a hard in-flight ceiling and returns a
//!   frozen [`RunSummary`] once every job is terminal.
//!
//! The router, database, and cache clients being instrumented are external
//! collaborators: they call the hooks, the hooks never call them.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod hooks;
pub mod metrics;

pub use context::InstrumentationContext;
pub use dispatcher::{
    run_load_test, DispatchConfig, Dispatcher, HttpTarget, LoadTarget, RunSummary,
};
pub use error::{ConfigError, InstrumentationError, TargetError};
pub use hooks::{
    CacheCommandAdapter, DbQueryAdapter, Granularity, HttpTimingAdapter, InstrumentationHook,
    NotFoundOutcome, QueryKind, TimingToken,
};
pub use metrics::{LabelSet, QuantileAggregator, QuantileSummary, Sample};
