//! The HTTP server half: binds a listener, spawns one thread per
//! connection, and dispatches each request through a user-supplied
//! [`Interface`].

mod connection;
mod date;
pub mod dispatch;

pub use dispatch::{Ack, BoundParams, Dispatch, Interface, MethodTable, ParamSpec, RequestMeta};

use crate::error::ServerError;
use crate::Encoding;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr, TcpListener, ToSocketAddrs};
use std::thread;
use std::time::Duration;

/// Bind-time configuration: the read/write deadline applied to every
/// connection, the body encoding, and an optional allow-list of peer IPs
/// (supplemented from `JsonRpcServer.allowed_ips` in `server.py`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub timeout: Duration,
    pub encoding: Encoding,
    pub allowed_ips: Option<HashSet<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            encoding: Encoding::default(),
            allowed_ips: None,
        }
    }
}

/// A running JSON-RPC 2.0 HTTP server. Dropping this value does not stop
/// the accept loop. There is no handle to the spawned thread, so a bound
/// server runs for the lifetime of the process unless the caller keeps it
/// alive some other way.
pub struct Server {
    local_addr: SocketAddr,
}

impl Server {
    /// Binds `addr` and spawns the accept loop, dispatching each connection
    /// to its own thread running the `I` interface.
    pub fn bind<I: Interface>(
        addr: impl ToSocketAddrs,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        thread::Builder::new()
            .name("jsonrpc2-http-accept".to_string())
            .spawn(move || accept_loop::<I>(listener, config))
            .map_err(ServerError::Spawn)?;

        Ok(Self { local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn accept_loop<I: Interface>(listener: TcpListener, config: ServerConfig) {
    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                let config = config.clone();
                let peer = stream.peer_addr().ok();
                let spawned = thread::Builder::new()
                    .name(format!("jsonrpc2-http-conn-{peer:?}"))
                    .spawn(move || connection::handle::<I>(stream, &config));
                if let Err(e) = spawned {
                    tracing::warn!(error = %e, "failed to spawn connection thread");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }
}
