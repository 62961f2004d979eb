//! The closed JSON-RPC 2.0 error taxonomy.
//!
//! Every failure that can cross a JSON-RPC wire boundary is one of the
//! [`ErrorKind`] variants below, each with a fixed numeric code. This
//! mirrors the `JsonRpcError` hierarchy in the original `jsonrpc2.errors`
//! module, collapsed into a single struct plus a code-derived kind instead
//! of a class-per-error-code hierarchy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The closed set of JSON-RPC error kinds this library ever produces.
///
/// `ProtocolError` is the one kind whose code is not fixed: it carries
/// whatever HTTP status or OS errno the transport layer observed, and is
/// the sole case where a *positive* code is legitimate on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Generic,
    ParseError,
    InvalidJsonRpc,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ProtocolError,
    ResponseError,
}

impl ErrorKind {
    /// Recovers the kind from a wire code: dispatch by code when recognized,
    /// `Generic` otherwise. Any positive code that isn't one of the reserved
    /// negatives is treated as a `ProtocolError` (an HTTP status or errno
    /// riding in the code slot).
    pub fn from_code(code: i32) -> Self {
        match code {
            -32700 => ErrorKind::ParseError,
            -32600 => ErrorKind::InvalidJsonRpc,
            -32601 => ErrorKind::MethodNotFound,
            -32602 => ErrorKind::InvalidParams,
            -32603 => ErrorKind::InternalError,
            -32650 => ErrorKind::ResponseError,
            -32000 => ErrorKind::Generic,
            c if c > 0 => ErrorKind::ProtocolError,
            _ => ErrorKind::Generic,
        }
    }
}

/// A JSON-RPC 2.0 error, on the wire as `{"code": ..., "message": ...,
/// "data": ...}` inside an error envelope's `error` field.
///
/// `id` is carried alongside for delivery to client/server callbacks but is
/// never part of the serialized `error` object itself; it lives at the
/// envelope's top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
    #[serde(skip)]
    pub id: Option<Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for JsonRpcError {}

impl JsonRpcError {
    /// Constructs an error with sign-normalization applied: any positive
    /// code supplied here is stored negated. Use
    /// [`JsonRpcError::protocol_error`] for the one exception.
    pub fn new(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        let code = if code > 0 { -code } else { code };
        Self {
            code,
            message: message.into(),
            data,
            id: None,
        }
    }

    /// Constructs an error from a wire error object verbatim, without the
    /// sign-normalization that applies at local construction time.
    pub(crate) fn from_wire(code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            code,
            message,
            data,
            id: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(self.code)
    }

    pub fn with_id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }

    pub fn generic(message: impl Into<String>, data: Option<Value>) -> Self {
        Self::new(-32000, message, data)
    }

    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error", None)
    }

    pub fn parse_error_with(exception: impl Into<String>) -> Self {
        Self::new(
            -32700,
            "Parse error",
            Some(serde_json::json!({ "exception": exception.into() })),
        )
    }

    pub fn invalid_json_rpc() -> Self {
        Self::new(-32600, "Invalid JSON-RPC", None)
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            -32601,
            "Method not found",
            Some(serde_json::json!({ "method": method.into() })),
        )
    }

    pub fn invalid_params(method: impl Into<String>, params: Value) -> Self {
        Self::new(
            -32602,
            "Invalid params",
            Some(serde_json::json!({ "method": method.into(), "params": params })),
        )
    }

    pub fn internal_error(exception: impl Into<String>) -> Self {
        Self::new(
            -32603,
            "Internal error",
            Some(serde_json::json!({ "exception": exception.into() })),
        )
    }

    pub fn response_error(data: Value) -> Self {
        Self::new(-32650, "Invalid response", Some(data))
    }

    /// The one exception to sign-normalization: a positive HTTP status or
    /// OS errno riding in the code slot, produced only by the client
    /// transport.
    pub fn protocol_error(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            id: None,
        }
    }
}

/// Failures constructing or configuring a [`crate::client::Client`] that
/// never reach the wire (bad base URL, unsupported scheme).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failures standing up a [`crate::server::Server`] that never reach the
/// wire (bind failure, invalid configuration).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("failed to spawn accept thread: {0}")]
    Spawn(#[source] std::io::Error),
}
