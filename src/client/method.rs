use super::Client;
use crate::client::context::RequestContext;
use crate::error::JsonRpcError;
use serde_json::Value;

type ResultCallback = Box<dyn FnOnce(Value) + Send + 'static>;
type ErrorCallback = Box<dyn FnOnce(JsonRpcError) + Send + 'static>;

/// A handle bound to one remote method name, the Rust analogue of the
/// original's dynamic attribute access (`client.some_method(...)`).
///
/// Obtained from [`Client::method`]; each call is fire-and-forget from the
/// caller's perspective, with results delivered to the supplied callbacks
/// rather than returned synchronously.
pub struct Method {
    client: Client,
    name: String,
}

impl Method {
    pub(crate) fn new(client: Client, name: String) -> Self {
        Self { client, name }
    }

    /// Issues a call. If the client was built with `notifier(true)`, this
    /// degrades to a notification and both callbacks are ignored, matching
    /// a "symmetric" client that can act as either peer.
    pub fn call(
        &self,
        params: impl Into<Option<Value>>,
        on_result: Option<ResultCallback>,
        on_error: Option<ErrorCallback>,
    ) -> RequestContext {
        if self.client.is_notifier() {
            self.client.issue_notification(&self.name, params.into())
        } else {
            self.client
                .issue_request(&self.name, params.into(), on_result, on_error)
        }
    }

    /// Issues a one-way notification regardless of the client's notifier
    /// setting.
    pub fn notify(&self, params: impl Into<Option<Value>>) -> RequestContext {
        self.client.issue_notification(&self.name, params.into())
    }
}
