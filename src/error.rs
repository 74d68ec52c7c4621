use thiserror::Error;

/// Invalid setup, detected at construction time. A dispatcher or adapter
/// registration that would run with undefined behavior refuses to start
/// instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_concurrent must be at least 1")]
    InvalidConcurrency,

    #[error("per-job timeout must be non-zero")]
    ZeroTimeout,

    #[error("an adapter for operation kind `{0}` is already registered")]
    DuplicateAdapter(String),

    #[error("operation kind `{0}` needs at least one label name")]
    EmptyLabelNames(String),

    #[error("invalid target url `{url}`: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

/// Failure to emit a sample. Recovered locally inside the hook — logged and
/// counted, never surfaced to the instrumented operation's caller.
#[derive(Debug, Error)]
pub enum InstrumentationError {
    #[error("label arity mismatch: expected {expected} value(s), got {got}")]
    LabelArity { expected: usize, got: usize },
}

/// A dispatched operation failing on its own terms. The dispatcher converts
/// these into a failed-job count; they never abort a run.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("non-success status {0}")]
    Status(u16),

    #[error("reading response body failed: {0}")]
    Body(String),
}
