use std::future::Future;
use std::sync::Arc;

use super::{InstrumentationHook, TimingToken};

/// Operation kind and label names for database queries.
pub const KIND: &str = "db_query";
pub const LABELS: &[&str] = &["kind"];

/// What kind of statement a unit of work ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Query,
    Create,
    Update,
    Delete,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Times one database operation at millisecond granularity, labelled by
/// statement kind.
///
/// The token is returned from [`before`] and handed back to [`after`] by the
/// unit of work itself — never stashed in connection- or session-global
/// state — so concurrent operations on one connection can't clobber each
/// other's start times.
///
/// [`before`]: DbQueryAdapter::before
/// [`after`]: DbQueryAdapter::after
pub struct DbQueryAdapter {
    hook: Arc<InstrumentationHook>,
}

impl DbQueryAdapter {
    pub(crate) fn new(hook: Arc<InstrumentationHook>) -> Self {
        Self { hook }
    }

    pub fn before(&self) -> TimingToken {
        self.hook.before()
    }

    pub fn after(&self, token: TimingToken, kind: QueryKind) {
        self.hook.after(token, &[kind.as_str()]);
    }

    /// Runs `op` with before/after wrapped around it. The sample is recorded
    /// on success *and* on error — duration up to the failure point — and the
    /// operation's own result comes back untouched.
    pub async fn time<F, Fut, T, E>(&self, kind: QueryKind, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let token = self.before();
        let result = op().await;
        self.after(token, kind);
        result
    }

    pub fn hook(&self) -> &Arc<InstrumentationHook> {
        &self.hook
    }
}
