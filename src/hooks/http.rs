use std::sync::Arc;

use super::{InstrumentationHook, TimingToken};

/// Operation kind and label names for outbound/inbound HTTP requests.
pub const KIND: &str = "http_request";
pub const LABELS: &[&str] = &["route", "method", "status"];

/// Times one HTTP request at microsecond granularity, labelled by route
/// pattern, method, and response status.
///
/// The caller's middleware (or client wrapper) calls [`before`] as the
/// request enters and [`after`] once the status is known — including when
/// the handler errored, since an error response still has a status.
///
/// [`before`]: HttpTimingAdapter::before
/// [`after`]: HttpTimingAdapter::after
pub struct HttpTimingAdapter {
    hook: Arc<InstrumentationHook>,
}

impl HttpTimingAdapter {
    pub(crate) fn new(hook: Arc<InstrumentationHook>) -> Self {
        Self { hook }
    }

    pub fn before(&self) -> TimingToken {
        self.hook.before()
    }

    /// `route` is the route *pattern* ("/users/:id"), not the concrete path,
    /// so all invocations of one endpoint share a bucket.
    pub fn after(&self, token: TimingToken, route: &str, method: &str, status: u16) {
        let status = status.to_string();
        self.hook.after(token, &[route, method, status.as_str()]);
    }

    pub fn hook(&self) -> &Arc<InstrumentationHook> {
        &self.hook
    }
}
