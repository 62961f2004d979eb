//! A symmetric JSON-RPC 2.0 client and server over HTTP.
//!
//! Symmetric in that the same [`codec`] encodes and decodes messages on
//! both sides, and a [`client::Client`] can be configured to behave as a
//! pure notifier, the same shape of peer a [`server::Server`] dispatches
//! into.

pub mod client;
pub mod codec;
pub mod error;
pub mod server;

pub(crate) const LIBRARY_ID: &str = concat!("jsonrpc2-http/", env!("CARGO_PKG_VERSION"));

/// Character encoding applied to request/response bodies on the wire.
///
/// `Utf8` is the only variant today; it exists as a named configuration
/// knob on [`server::ServerConfig`] and [`client::Client`] rather than a
/// hardcoded assumption, since both surfaces list it as configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
}

pub use client::Client;
pub use codec::{Message, Notification, Request, Response, Shape};
pub use error::{ClientError, ErrorKind, JsonRpcError, ServerError};
pub use server::{
    Ack, BoundParams, Dispatch, Interface, MethodTable, ParamSpec, RequestMeta, Server,
    ServerConfig,
};
