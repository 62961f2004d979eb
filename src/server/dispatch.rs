//! Static method-table dispatch, replacing the original's dynamic
//! `getattr`-based lookup (`JsonRpcIface.__call__` in `server.py`) with a
//! compile-time table the `Interface` implementor builds once.

use crate::codec::Request;
use crate::error::JsonRpcError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-request context handed to `Interface::new`. One interface instance
/// is constructed per incoming request.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta {
    pub peer_addr: SocketAddr,
}

/// A declared parameter. `required` controls only whether its absence is a
/// binding error. Default values, if any, are the handler's own business,
/// the same way a Python method's `def handler(self, a, b=2)` applies its
/// own default rather than the dispatcher supplying one.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str) -> Self {
        Self { name, required: true }
    }
    pub const fn optional(name: &'static str) -> Self {
        Self { name, required: false }
    }
}

/// Parameters bound to their declared names, after positional-or-keyword
/// binding has resolved which value goes with which name.
#[derive(Debug, Clone, Default)]
pub struct BoundParams(HashMap<String, Value>);

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// What a method handler returns: an immediate outcome, or a promise to
/// call back on the [`Ack`] later. Replaces the original's convention of a
/// method returning `None` to mean "I'll call `_on_result` myself".
pub enum Dispatch {
    Immediate(Value),
    Error(JsonRpcError),
    Deferred,
}

pub(crate) enum DispatchOutcome {
    Result(Value),
    Error(JsonRpcError),
}

/// A single-use latch a deferred handler holds onto and resolves exactly
/// once, from whatever thread eventually has the answer.
pub struct Ack {
    handled: Arc<AtomicBool>,
    sender: Arc<std::sync::Mutex<Option<mpsc::SyncSender<DispatchOutcome>>>>,
}

impl Ack {
    fn new(sender: mpsc::SyncSender<DispatchOutcome>) -> Self {
        Self {
            handled: Arc::new(AtomicBool::new(false)),
            sender: Arc::new(std::sync::Mutex::new(Some(sender))),
        }
    }

    pub fn resolve(&self, value: Value) {
        self.finish(DispatchOutcome::Result(value));
    }

    pub fn reject(&self, error: JsonRpcError) {
        self.finish(DispatchOutcome::Error(error));
    }

    fn finish(&self, outcome: DispatchOutcome) {
        if self.handled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(sender) = self.sender.lock().unwrap().take() {
            let _ = sender.send(outcome);
        }
    }
}

impl Clone for Ack {
    fn clone(&self) -> Self {
        Self {
            handled: self.handled.clone(),
            sender: self.sender.clone(),
        }
    }
}

type Handler<S> = fn(&mut S, BoundParams, Ack) -> Dispatch;

struct MethodEntry<S> {
    params: &'static [ParamSpec],
    handler: Handler<S>,
}

/// A compile-time table of method name to handler, built once by an
/// `Interface` implementor via [`MethodTable::builder`].
pub struct MethodTable<S> {
    entries: HashMap<&'static str, MethodEntry<S>>,
}

impl<S> MethodTable<S> {
    pub fn builder() -> MethodTableBuilder<S> {
        MethodTableBuilder {
            entries: HashMap::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&MethodEntry<S>> {
        self.entries.get(name)
    }
}

pub struct MethodTableBuilder<S> {
    entries: HashMap<&'static str, MethodEntry<S>>,
}

const RESERVED: &[&str] = &["on_result", "on_error"];

impl<S> MethodTableBuilder<S> {
    /// Registers a method. Panics at table-construction time (not at
    /// request time) if `name` starts with `_` or is one of the reserved
    /// callback names, a programmer error rather than a caller error.
    pub fn method(
        mut self,
        name: &'static str,
        params: &'static [ParamSpec],
        handler: Handler<S>,
    ) -> Self {
        assert!(
            !name.starts_with('_') && !RESERVED.contains(&name),
            "method name {name:?} is reserved and can never be dispatched"
        );
        self.entries.insert(name, MethodEntry { params, handler });
        self
    }

    pub fn build(self) -> MethodTable<S> {
        MethodTable {
            entries: self.entries,
        }
    }
}

/// An interface a [`crate::server::Server`] dispatches requests to. One
/// instance is constructed per incoming request.
pub trait Interface: Sized + Send + 'static {
    fn new(meta: RequestMeta) -> Self;
    fn methods() -> &'static MethodTable<Self>;
}

pub(crate) enum DispatchResult {
    Result(Value),
    Error(JsonRpcError),
}

fn bind_params(
    specs: &[ParamSpec],
    params: Option<&Value>,
    method: &str,
) -> Result<BoundParams, JsonRpcError> {
    let mut bound = HashMap::new();
    let reject = |params: &Value| {
        JsonRpcError::invalid_params(method, params.clone())
    };

    match params {
        None => {
            if specs.iter().any(|s| s.required) {
                return Err(reject(&Value::Null));
            }
        }
        Some(Value::Array(values)) => {
            if values.len() > specs.len() {
                return Err(reject(&Value::Array(values.clone())));
            }
            for (spec, value) in specs.iter().zip(values.iter()) {
                bound.insert(spec.name.to_string(), value.clone());
            }
            for spec in specs.iter().skip(values.len()) {
                if spec.required {
                    return Err(reject(&Value::Array(values.clone())));
                }
            }
        }
        Some(Value::Object(map)) => {
            let known: HashSet<&str> = specs.iter().map(|s| s.name).collect();
            if map.keys().any(|k| !known.contains(k.as_str())) {
                return Err(reject(&Value::Object(map.clone())));
            }
            for spec in specs {
                match map.get(spec.name) {
                    Some(v) => {
                        bound.insert(spec.name.to_string(), v.clone());
                    }
                    None if spec.required => return Err(reject(&Value::Object(map.clone()))),
                    None => {}
                }
            }
        }
        Some(other) => return Err(reject(other)),
    }

    Ok(BoundParams(bound))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

pub(crate) fn dispatch_request<S: Interface>(
    interface: &mut S,
    request: &Request,
) -> DispatchResult {
    if request.method.starts_with('_') || RESERVED.contains(&request.method.as_str()) {
        return DispatchResult::Error(JsonRpcError::method_not_found(&request.method));
    }

    let entry = match S::methods().lookup(&request.method) {
        Some(entry) => entry,
        None => return DispatchResult::Error(JsonRpcError::method_not_found(&request.method)),
    };

    let bound = match bind_params(entry.params, request.params.as_ref(), &request.method) {
        Ok(b) => b,
        Err(e) => return DispatchResult::Error(e),
    };

    let (tx, rx) = mpsc::sync_channel(1);
    let ack = Ack::new(tx);

    let handler = entry.handler;
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        handler(interface, bound, ack)
    }));

    match outcome {
        Err(payload) => DispatchResult::Error(JsonRpcError::internal_error(panic_message(&payload))),
        Ok(Dispatch::Immediate(value)) => DispatchResult::Result(value),
        Ok(Dispatch::Error(error)) => DispatchResult::Error(error),
        Ok(Dispatch::Deferred) => match rx.recv() {
            Ok(DispatchOutcome::Result(value)) => DispatchResult::Result(value),
            Ok(DispatchOutcome::Error(error)) => DispatchResult::Error(error),
            Err(_) => DispatchResult::Error(JsonRpcError::internal_error(
                "deferred handler dropped without resolving",
            )),
        },
    }
}

pub(crate) fn dispatch_notification<S: Interface>(
    interface: &mut S,
    notification: &crate::codec::Notification,
) {
    let pseudo = Request {
        method: notification.method.clone(),
        params: notification.params.clone(),
        id: Value::Null,
    };
    let _ = dispatch_request(interface, &pseudo);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl Interface for Echo {
        fn new(_meta: RequestMeta) -> Self {
            Echo
        }
        fn methods() -> &'static MethodTable<Self> {
            static TABLE: std::sync::OnceLock<MethodTable<Echo>> = std::sync::OnceLock::new();
            TABLE.get_or_init(|| {
                MethodTable::builder()
                    .method(
                        "test",
                        &[ParamSpec::required("a"), ParamSpec::optional("b")],
                        |_s, params, _ack| {
                            let a = params.get("a").cloned().unwrap_or(Value::Null);
                            let b = params.get("b").cloned().unwrap_or(Value::from(2));
                            Dispatch::Immediate(serde_json::json!([a, b]))
                        },
                    )
                    .build()
            })
        }
    }

    fn req(method: &str, params: Option<Value>) -> Request {
        Request {
            method: method.to_string(),
            params,
            id: Value::String("id1".to_string()),
        }
    }

    #[test]
    fn positional_binding() {
        let mut iface = Echo;
        let r = req("test", Some(serde_json::json!([123, "abc"])));
        match dispatch_request(&mut iface, &r) {
            DispatchResult::Result(v) => assert_eq!(v, serde_json::json!([123, "abc"])),
            DispatchResult::Error(e) => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn keyword_binding_with_default_left_to_handler() {
        let mut iface = Echo;
        let r = req("test", Some(serde_json::json!({"a": "abc"})));
        match dispatch_request(&mut iface, &r) {
            DispatchResult::Result(v) => assert_eq!(v, serde_json::json!(["abc", 2])),
            DispatchResult::Error(e) => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let mut iface = Echo;
        let r = req("nope", None);
        match dispatch_request(&mut iface, &r) {
            DispatchResult::Error(e) => assert_eq!(e.code, -32601),
            DispatchResult::Result(_) => panic!("expected error"),
        }
    }

    #[test]
    fn too_many_positional_args_is_invalid_params() {
        let mut iface = Echo;
        let r = req("test", Some(serde_json::json!([1, 2, 3])));
        match dispatch_request(&mut iface, &r) {
            DispatchResult::Error(e) => assert_eq!(e.code, -32602),
            DispatchResult::Result(_) => panic!("expected error"),
        }
    }

    #[test]
    fn underscore_prefixed_method_is_unreachable() {
        let mut iface = Echo;
        let r = req("_test", None);
        match dispatch_request(&mut iface, &r) {
            DispatchResult::Error(e) => assert_eq!(e.code, -32601),
            DispatchResult::Result(_) => panic!("expected error"),
        }
    }
}
