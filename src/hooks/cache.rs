use std::future::Future;
use std::sync::Arc;

use super::{InstrumentationHook, TimingToken};

/// Operation kind and label names for cache commands.
pub const KIND: &str = "cache_command";
pub const LABELS: &[&str] = &["cmd", "key_exists"];

/// Lets the adapter tell a cache miss apart from a real failure.
///
/// Redis-style clients model "key not found" as a sentinel error on an
/// otherwise healthy round-trip; implement this on the client's error type
/// so the adapter can label the sample with whether the key existed.
pub trait NotFoundOutcome {
    fn is_not_found(&self) -> bool;
}

/// Times one cache command at millisecond granularity, labelled by command
/// name and whether the key existed at lookup time.
pub struct CacheCommandAdapter {
    hook: Arc<InstrumentationHook>,
}

impl CacheCommandAdapter {
    pub(crate) fn new(hook: Arc<InstrumentationHook>) -> Self {
        Self { hook }
    }

    pub fn before(&self) -> TimingToken {
        self.hook.before()
    }

    pub fn after(&self, token: TimingToken, cmd: &str, key_existed: bool) {
        let exists = if key_existed { "true" } else { "false" };
        self.hook.after(token, &[cmd, exists]);
    }

    /// Runs `op` with before/after wrapped around it. A not-found sentinel
    /// labels the sample `key_exists=false`; any other outcome — success or
    /// a real error — labels it `true`. The result comes back untouched,
    /// sentinel included.
    pub async fn time<F, Fut, T, E>(&self, cmd: &str, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: NotFoundOutcome,
    {
        let token = self.before();
        let result = op().await;
        let key_existed = match &result {
            Ok(_) => true,
            Err(e) => !e.is_not_found(),
        };
        self.after(token, cmd, key_existed);
        result
    }

    pub fn hook(&self) -> &Arc<InstrumentationHook> {
        &self.hook
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InstrumentationContext;
    use crate::metrics::LabelSet;

    #[derive(Debug, PartialEq)]
    enum FakeCacheError {
        Nil,
        Io,
    }

    impl NotFoundOutcome for FakeCacheError {
        fn is_not_found(&self) -> bool {
            matches!(self, Self::Nil)
        }
    }

    #[tokio::test]
    async fn hit_and_miss_bucket_separately() {
        let ctx = InstrumentationContext::new();
        let adapter = ctx.cache_adapter().unwrap();

        let _: Result<&str, FakeCacheError> =
            adapter.time("get", || async { Ok("value") }).await;
        let miss: Result<&str, FakeCacheError> =
            adapter.time("get", || async { Err(FakeCacheError::Nil) }).await;
        assert_eq!(miss, Err(FakeCacheError::Nil));

        let hit = LabelSet::from_pairs(&[("cmd", "get"), ("key_exists", "true")]);
        let missed = LabelSet::from_pairs(&[("cmd", "get"), ("key_exists", "false")]);
        assert_eq!(ctx.aggregator().summary(&hit).unwrap().count, 1);
        assert_eq!(ctx.aggregator().summary(&missed).unwrap().count, 1);
    }

    #[tokio::test]
    async fn a_real_error_is_not_a_miss() {
        let ctx = InstrumentationContext::new();
        let adapter = ctx.cache_adapter().unwrap();

        let out: Result<(), FakeCacheError> =
            adapter.time("set", || async { Err(FakeCacheError::Io) }).await;
        assert_eq!(out, Err(FakeCacheError::Io));

        let labels = LabelSet::from_pairs(&[("cmd", "set"), ("key_exists", "true")]);
        assert_eq!(ctx.aggregator().summary(&labels).unwrap().count, 1);
    }
}
