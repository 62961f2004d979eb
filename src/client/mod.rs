//! The HTTP client half: a `Client` builds [`Method`] handles, each call
//! running its round trip on a dedicated background thread under a
//! deadline.

mod context;
mod method;
mod transport;
mod url;

pub use context::RequestContext;
pub use method::Method;

use crate::codec::{self, Message, Shape};
use crate::error::{ClientError, JsonRpcError};
use crate::Encoding;
use serde_json::Value;
use std::io::ErrorKind as IoErrorKind;
use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use url::BaseUrl;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct ClientInner {
    base: BaseUrl,
    timeout: Duration,
    encoding: Encoding,
    notifier: bool,
}

/// A JSON-RPC 2.0 HTTP client bound to one base URL.
///
/// Cheap to clone, internally an `Arc` over its configuration, the way a
/// connection-pool handle would be shared across callers.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Parses `base_url` (`http://host[:port][/path]`, default path
    /// `/RPC2`) and returns a client with a 5 second default timeout and
    /// `notifier` off.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = url::parse(base_url)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                base,
                timeout: DEFAULT_TIMEOUT,
                encoding: Encoding::default(),
                notifier: false,
            }),
        })
    }

    /// Returns a new client with the read/write/connect deadline changed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.timeout = timeout;
        self
    }

    /// Returns a new client with the body encoding changed.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.encoding = encoding;
        self
    }

    /// Returns a new client that always degrades calls to notifications,
    /// the "symmetric" client acting purely as a sender.
    pub fn with_notifier(mut self, notifier: bool) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.notifier = notifier;
        self
    }

    pub fn is_notifier(&self) -> bool {
        self.inner.notifier
    }

    pub fn method(&self, name: impl Into<String>) -> Method {
        Method::new(self.clone(), name.into())
    }

    /// Sends a notification synchronously: connects, writes, closes. The
    /// returned context is already closed, since the exchange is complete
    /// the moment the bytes have left the socket.
    pub(crate) fn issue_notification(&self, method: &str, params: Option<Value>) -> RequestContext {
        let result = (|| -> std::io::Result<()> {
            let body = codec::encode_notification(method, params.as_ref())
                .map_err(|e| std::io::Error::new(IoErrorKind::InvalidData, e.to_string()))?;
            let mut stream = self.connect()?;
            transport::write_post(&mut stream, &self.inner.base.host, &self.inner.base.path, &body)
        })();
        if let Err(e) = result {
            tracing::debug!(error = %e, method, "notification delivery failed");
        }
        RequestContext::already_closed(None)
    }

    /// Issues a request on a dedicated background thread, invoking exactly
    /// one of `on_result`/`on_error` once the round trip (or the deadline)
    /// concludes. The caller never blocks.
    pub(crate) fn issue_request(
        &self,
        method: &str,
        params: Option<Value>,
        on_result: Option<Box<dyn FnOnce(Value) + Send + 'static>>,
        on_error: Option<Box<dyn FnOnce(JsonRpcError) + Send + 'static>>,
    ) -> RequestContext {
        let (bytes, id) = match codec::encode_request(method, params.as_ref(), None) {
            Ok(pair) => pair,
            Err(e) => {
                if let Some(on_error) = on_error {
                    on_error(e);
                }
                return RequestContext::already_closed(None);
            }
        };

        let (context, closed) = RequestContext::new(Some(id.clone()));
        let client = self.clone();
        let method_name = method.to_string();

        thread::Builder::new()
            .name(format!("jsonrpc2-http-call-{method_name}"))
            .spawn(move || {
                let outcome = client.round_trip(&bytes, &id);
                match outcome {
                    Ok(value) => {
                        if let Some(on_result) = on_result {
                            on_result(value);
                        }
                    }
                    Err(error) => {
                        if let Some(on_error) = on_error {
                            on_error(error);
                        }
                    }
                }
                closed.store(true, Ordering::Release);
            })
            .expect("failed to spawn request thread");

        context
    }

    fn connect(&self) -> std::io::Result<TcpStream> {
        use std::net::ToSocketAddrs;
        let addr = (self.inner.base.host.as_str(), self.inner.base.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(IoErrorKind::NotFound, "no address found"))?;
        let stream = TcpStream::connect_timeout(&addr, self.inner.timeout)?;
        stream.set_read_timeout(Some(self.inner.timeout))?;
        stream.set_write_timeout(Some(self.inner.timeout))?;
        Ok(stream)
    }

    fn round_trip(&self, body: &[u8], request_id: &Value) -> Result<Value, JsonRpcError> {
        let with_id = |e: JsonRpcError| e.with_id(request_id.clone());

        let mut stream = self.connect().map_err(|e| with_id(protocol_error_from_io(&e)))?;
        transport::write_post(&mut stream, &self.inner.base.host, &self.inner.base.path, body)
            .map_err(|e| with_id(protocol_error_from_io(&e)))?;
        let response = transport::read_response(&mut stream)
            .map_err(|e| with_id(protocol_error_from_io(&e)))?;

        if response.status != 200 {
            return Err(with_id(JsonRpcError::protocol_error(
                response.status as i32,
                response.reason,
                Some(serde_json::json!({
                    "exception": String::from_utf8_lossy(&response.body).into_owned(),
                })),
            )));
        }

        match codec::decode(&response.body, &[Shape::Response]) {
            Ok(Message::Response(resp)) => {
                if &resp.id != request_id {
                    return Err(with_id(JsonRpcError::response_error(serde_json::json!({
                        "id": resp.id,
                    }))));
                }
                Ok(resp.result)
            }
            Ok(_) => unreachable!("decode only asked to recognize Response"),
            Err(mut error) => {
                if error.kind() == crate::error::ErrorKind::ParseError
                    || error.kind() == crate::error::ErrorKind::InvalidJsonRpc
                {
                    error = JsonRpcError::response_error(serde_json::json!({
                        "exception": String::from_utf8_lossy(&response.body).into_owned(),
                    }));
                }
                Err(with_id(error))
            }
        }
    }
}

fn protocol_error_from_io(err: &std::io::Error) -> JsonRpcError {
    if matches!(
        err.kind(),
        IoErrorKind::TimedOut | IoErrorKind::WouldBlock
    ) {
        return JsonRpcError::protocol_error(110, "Connection timed out", None);
    }
    let code = err.raw_os_error().unwrap_or(400);
    JsonRpcError::protocol_error(code, err.to_string(), None)
}
