use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle to one in-flight (or already-finished) call, returned by
/// [`crate::client::Method::call`] / `notify`.
///
/// Notifications report `closed() == true` as soon as `call`/`notify`
/// returns, since the write itself finishes the exchange. Requests report
/// `closed() == true` once the background thread has delivered `on_result`
/// or `on_error` exactly once.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Option<Value>,
    closed: Arc<AtomicBool>,
}

impl RequestContext {
    pub(crate) fn new(id: Option<Value>) -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                id,
                closed: closed.clone(),
            },
            closed,
        )
    }

    pub(crate) fn already_closed(id: Option<Value>) -> Self {
        let closed = Arc::new(AtomicBool::new(true));
        Self { id, closed }
    }

    /// `None` for a notification context; `Some(id)` for a request.
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
