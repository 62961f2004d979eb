//! Encoding and decoding of the three JSON-RPC 2.0 envelope shapes.
//!
//! Mirrors `jrpc::Request`/`Notification`/`Response`, but
//! generalizes `loads`/`dumps` from `examples/original_source/jsonrpc2/base.py`
//! into an explicit `decode(bytes, accept)` that tries each accepted shape in
//! order before falling back to an error envelope.

use crate::error::JsonRpcError;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const VERSION: &str = "2.0";
const ID_LEN: usize = 8;

/// A one-way call: no `id`, no response ever expected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A call expecting exactly one matching [`Response`] or error envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: Value,
}

/// A successful reply to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: Value,
    pub result: Value,
}

/// A decoded wire message, once its shape has been recognized.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Notification(Notification),
    Request(Request),
    Response(Response),
}

/// Which shapes `decode` is willing to recognize, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Notification,
    Request,
    Response,
}

fn generate_id() -> Value {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect();
    Value::String(id)
}

fn envelope(fields: Vec<(&'static str, Value)>) -> Value {
    let mut map = Map::new();
    map.insert("jsonrpc".to_string(), Value::String(VERSION.to_string()));
    for (k, v) in fields {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

fn to_bytes(value: &Value) -> Result<Vec<u8>, JsonRpcError> {
    serde_json::to_vec(value).map_err(|e| JsonRpcError::parse_error_with(e.to_string()))
}

/// Encodes a notification. Absent `params` is omitted entirely, not sent as
/// `null`. The wire distinguishes the two.
pub fn encode_notification(method: &str, params: Option<&Value>) -> Result<Vec<u8>, JsonRpcError> {
    let mut fields = vec![("method", Value::String(method.to_string()))];
    if let Some(p) = params {
        fields.push(("params", p.clone()));
    }
    to_bytes(&envelope(fields))
}

/// Encodes a request. Generates an 8-char alphanumeric id when `id` is
/// `None`, returning the id actually used so the caller can correlate the
/// eventual response.
pub fn encode_request(
    method: &str,
    params: Option<&Value>,
    id: Option<Value>,
) -> Result<(Vec<u8>, Value), JsonRpcError> {
    let id = id.unwrap_or_else(generate_id);
    let mut fields = vec![("method", Value::String(method.to_string()))];
    if let Some(p) = params {
        fields.push(("params", p.clone()));
    }
    fields.push(("id", id.clone()));
    let bytes = to_bytes(&envelope(fields))?;
    Ok((bytes, id))
}

pub fn encode_response(id: &Value, result: &Value) -> Vec<u8> {
    let value = envelope(vec![("id", id.clone()), ("result", result.clone())]);
    to_bytes(&value).unwrap_or_else(|_| b"{}".to_vec())
}

/// Encodes an error envelope. `id` is `None` when the failure occurred
/// before a request id could be recovered (e.g. the body didn't parse at
/// all), matching `JsonRpcError.marshal()`'s `id: null` fallback.
pub fn encode_error(id: Option<&Value>, error: &JsonRpcError) -> Vec<u8> {
    let mut error_fields = Map::new();
    error_fields.insert("code".to_string(), Value::from(error.code));
    error_fields.insert("message".to_string(), Value::String(error.message.clone()));
    if let Some(data) = &error.data {
        error_fields.insert("data".to_string(), data.clone());
    }
    let value = envelope(vec![
        ("id", id.cloned().unwrap_or(Value::Null)),
        ("error", Value::Object(error_fields)),
    ]);
    to_bytes(&value).unwrap_or_else(|_| b"{}".to_vec())
}

/// Parses `bytes` as one JSON-RPC envelope, trying each shape in `accept` in
/// order and falling back to an error envelope. Returns the decoded error
/// itself (not a wrapper) when the bytes describe a failure. A raw parse
/// failure surfaces as `JsonRpcError::parse_error()`.
pub fn decode(bytes: &[u8], accept: &[Shape]) -> Result<Message, JsonRpcError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| JsonRpcError::parse_error_with(e.to_string()))?;
    let obj = value.as_object().ok_or_else(JsonRpcError::invalid_json_rpc)?;

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == VERSION => {}
        _ => return Err(JsonRpcError::invalid_json_rpc()),
    }

    for shape in accept {
        match shape {
            Shape::Notification => {
                if let Some(Value::String(method)) = obj.get("method") {
                    if !obj.contains_key("id") {
                        return Ok(Message::Notification(Notification {
                            method: method.clone(),
                            params: obj.get("params").cloned(),
                        }));
                    }
                }
            }
            Shape::Request => {
                if let (Some(Value::String(method)), Some(id)) = (obj.get("method"), obj.get("id"))
                {
                    return Ok(Message::Request(Request {
                        method: method.clone(),
                        params: obj.get("params").cloned(),
                        id: id.clone(),
                    }));
                }
            }
            Shape::Response => {
                if let (Some(result), Some(id)) = (obj.get("result"), obj.get("id")) {
                    if !obj.contains_key("error") {
                        return Ok(Message::Response(Response {
                            id: id.clone(),
                            result: result.clone(),
                        }));
                    }
                }
            }
        }
    }

    if let Some(Value::Object(err_obj)) = obj.get("error") {
        let code = err_obj.get("code").and_then(Value::as_i64).map(|c| c as i32);
        let message = err_obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let (Some(code), Some(message)) = (code, message) {
            let data = err_obj.get("data").cloned();
            let mut error = JsonRpcError::from_wire(code, message, data);
            if let Some(id) = obj.get("id") {
                error = error.with_id(id.clone());
            }
            return Err(error);
        }
    }

    Err(JsonRpcError::parse_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_notification_without_params_key() {
        let bytes = encode_notification("ping", None).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("params").is_none());
        assert_eq!(value["method"], "ping");
        assert_eq!(value["jsonrpc"], "2.0");
    }

    #[test]
    fn encode_request_generates_eight_char_alphanumeric_id() {
        let (_, id) = encode_request("test", None, None).unwrap();
        let s = id.as_str().unwrap();
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn decode_prefers_notification_over_request_when_id_absent() {
        let bytes = br#"{"jsonrpc":"2.0","method":"ping"}"#;
        let msg = decode(bytes, &[Shape::Notification, Shape::Request]).unwrap();
        assert!(matches!(msg, Message::Notification(_)));
    }

    #[test]
    fn decode_rejects_wrong_version() {
        let bytes = br#"{"jsonrpc":"1.0","method":"ping","id":"abc"}"#;
        let err = decode(bytes, &[Shape::Request]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidJsonRpc);
    }

    #[test]
    fn decode_surfaces_error_envelope() {
        let bytes =
            br#"{"jsonrpc":"2.0","id":"abc","error":{"code":-32601,"message":"Method not found"}}"#;
        let err = decode(bytes, &[Shape::Response]).unwrap_err();
        assert_eq!(err.code, -32601);
        assert_eq!(err.id, Some(Value::String("abc".to_string())));
    }

    #[test]
    fn decode_garbage_is_parse_error() {
        let err = decode(b"not json", &[Shape::Request]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ParseError);
    }

    #[test]
    fn decode_well_formed_envelope_matching_no_shape_is_parse_error() {
        let bytes = br#"{"jsonrpc":"2.0","foo":1}"#;
        let err = decode(bytes, &[Shape::Request, Shape::Response]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ParseError);
    }
}
