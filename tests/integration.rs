//! Black-box scenarios run client against server over
//! a real TCP socket bound to `127.0.0.1:0`.

use jsonrpc2_http::{
    Ack, BoundParams, Client, Dispatch, Interface, JsonRpcError, MethodTable, ParamSpec,
    RequestMeta, Server, ServerConfig,
};
use serde_json::{json, Value};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::time::Duration;

struct Calculator;

impl Interface for Calculator {
    fn new(_meta: RequestMeta) -> Self {
        Calculator
    }

    fn methods() -> &'static MethodTable<Self> {
        static TABLE: OnceLock<MethodTable<Calculator>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::builder()
                .method(
                    "test_result",
                    &[ParamSpec::required("a"), ParamSpec::optional("b")],
                    |_s, params: BoundParams, _ack: Ack| {
                        let a = params.get("a").cloned().unwrap_or(Value::Null);
                        let b = params.get("b").cloned().unwrap_or(json!(2));
                        Dispatch::Immediate(json!({"status": "OK", "params": {"a": a, "b": b}}))
                    },
                )
                .method("raises", &[], |_s, _params, _ack| {
                    Dispatch::Error(JsonRpcError::internal_error("1"))
                })
                .build()
        })
    }
}

fn start_server() -> std::net::SocketAddr {
    let server = Server::bind::<Calculator>("127.0.0.1:0", ServerConfig::default())
        .expect("server should bind");
    let addr = server.local_addr();
    std::mem::forget(server);
    // give the accept thread a moment to enter `listener.incoming()`
    std::thread::sleep(Duration::from_millis(20));
    addr
}

fn call_sync(client: &Client, method: &str, params: Value) -> Result<Value, JsonRpcError> {
    let (tx, rx) = mpsc::channel();
    let tx_err = tx.clone();
    client.method(method).call(
        Some(params),
        Some(Box::new(move |v| {
            let _ = tx.send(Ok(v));
        })),
        Some(Box::new(move |e| {
            let _ = tx_err.send(Err(e));
        })),
    );
    rx.recv_timeout(Duration::from_secs(2))
        .expect("callback should fire within the test timeout")
}

#[test]
fn scenario_1_request_response_positional() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    let result = call_sync(&client, "test_result", json!([123, "abc"])).unwrap();
    assert_eq!(result, json!({"status": "OK", "params": {"a": 123, "b": "abc"}}));
}

#[test]
fn scenario_2_keyword_params_with_handler_default() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    let result = call_sync(&client, "test_result", json!({"a": "abc"})).unwrap();
    assert_eq!(result, json!({"status": "OK", "params": {"a": "abc", "b": 2}}));
}

#[test]
fn scenario_3_method_not_found() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    let err = call_sync(&client, "method_not_found", json!([1])).unwrap_err();
    assert_eq!(err.code, -32601);
    assert_eq!(err.data, Some(json!({"method": "method_not_found"})));
}

#[test]
fn scenario_4_invalid_params_too_many_positional() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    let err = call_sync(&client, "test_result", json!([123, "abc", true])).unwrap_err();
    assert_eq!(err.code, -32602);
    assert_eq!(
        err.data,
        Some(json!({"method": "test_result", "params": [123, "abc", true]}))
    );
}

#[test]
fn scenario_5_internal_error() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    let err = call_sync(&client, "raises", json!([])).unwrap_err();
    assert_eq!(err.code, -32603);
    assert_eq!(err.data, Some(json!({"exception": "1"})));
}

#[test]
fn scenario_6_notification_closes_immediately_with_no_callbacks() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    let ctx = client.method("test_result").notify(Some(json!([123, "abc"])));
    assert!(ctx.closed());
    assert!(ctx.id().is_none());
}

#[test]
fn scenario_7_connection_refused() {
    // Port 1 is privileged and reliably unbound/refused in test sandboxes.
    let client = Client::new("http://127.0.0.1:1").unwrap().with_timeout(Duration::from_millis(500));
    let err = call_sync(&client, "test_result", json!([1])).unwrap_err();
    assert!(matches!(err.code, 111 | 400 | 146 | 61));
}

#[test]
fn scenario_8_response_id_mismatch_is_response_error() {
    // A deliberately non-conformant peer: replies 200 with a well-formed
    // Response carrying a different id than whatever request arrives.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        use std::io::{Read, Write};
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let body = br#"{"jsonrpc":"2.0","id":"wrongid0","result":42}"#;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json-rpc\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
    });

    let client = Client::new(&format!("http://{addr}")).unwrap();
    let err = call_sync(&client, "test_result", json!([1, 2])).unwrap_err();
    assert_eq!(err.code, -32650);
    assert_eq!(err.data, Some(json!({"id": "wrongid0"})));
}

#[test]
fn notifier_client_degrades_every_call_to_a_notification() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}"))
        .unwrap()
        .with_notifier(true);
    let ctx = client.method("test_result").call(Some(json!([1, 2])), None, None);
    assert!(ctx.closed());
}
