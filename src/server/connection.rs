//! Per-connection byte-stream state machine: ReadingHeaders → ReadingBody →
//! Dispatch → Writing, one thread per accepted socket.
//!
//! Grounded in `transit::http::HTTPParser::pop`'s accumulate-then-split
//! approach and `http::Session::run`'s manual header writing, generalized
//! from a single hardcoded MCP dispatch to any `Interface`.

use crate::codec::{self, Message, Shape};
use crate::server::date::http_date_now;
use crate::server::dispatch::{self, DispatchResult, Interface, RequestMeta};
use crate::server::ServerConfig;
use crate::LIBRARY_ID;
use std::io::{Read, Write};
use std::net::TcpStream;

fn find_double_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

struct RequestLine {
    method: String,
    version: String,
}

fn parse_request_line(line: &str) -> Option<RequestLine> {
    let mut parts = line.split(' ');
    let method = parts.next()?.to_string();
    let _path = parts.next()?;
    let version = parts.next()?.to_string();
    if parts.next().is_some() {
        return None;
    }
    Some(RequestLine { method, version })
}

fn parse_headers(block: &str) -> std::collections::HashMap<String, String> {
    let mut headers = std::collections::HashMap::new();
    for line in block.split("\r\n").skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    headers
}

fn write_headers(stream: &mut TcpStream, status: u16, reason: &str, content_type: &str, body: &[u8]) {
    let mut head = String::new();
    head.push_str(&format!("HTTP/1.1 {status} {reason}\r\n"));
    head.push_str(&format!("Server: {LIBRARY_ID}\r\n"));
    head.push_str(&format!("User-Agent: {LIBRARY_ID}\r\n"));
    head.push_str(&format!("Date: {}\r\n", http_date_now()));
    head.push_str("Connection: close\r\n");
    head.push_str(&format!("Content-Type: {content_type}\r\n"));
    head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn write_canned_error(stream: &mut TcpStream, status: u16, reason: &str) {
    let body = format!(
        "<head><title>Error response</title></head>\
         <body><h1>Error response</h1><p>Error code {status}.</p>\
         <p>Message: {reason}.</p></body>"
    );
    write_headers(stream, status, reason, "text/html", body.as_bytes());
}

fn write_json(stream: &mut TcpStream, body: Vec<u8>) {
    write_headers(stream, 200, "OK", "application/json-rpc", &body);
}

pub(crate) fn handle<I: Interface>(mut stream: TcpStream, config: &ServerConfig) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr,
        Err(_) => return,
    };
    if let Some(allowed) = &config.allowed_ips {
        if !allowed.contains(&peer_addr.ip()) {
            tracing::debug!(%peer_addr, "rejecting connection: not in allowed-ip set");
            return;
        }
    }

    let _ = stream.set_read_timeout(Some(config.timeout));
    let _ = stream.set_write_timeout(Some(config.timeout));

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let headers_end = loop {
        if let Some(pos) = find_double_crlf(&buf) {
            break pos;
        }
        match stream.read(&mut chunk) {
            Ok(0) => {
                write_canned_error(&mut stream, 408, "Request Timeout");
                return;
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if is_timeout(&e) => {
                write_canned_error(&mut stream, 408, "Request Timeout");
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, %peer_addr, "read error while waiting for headers");
                return;
            }
        }
    };

    let header_block = match std::str::from_utf8(&buf[..headers_end]) {
        Ok(s) => s,
        Err(_) => {
            write_canned_error(&mut stream, 400, "Bad Request");
            return;
        }
    };
    let mut lines = header_block.split("\r\n");
    let request_line = match lines.next().and_then(parse_request_line) {
        Some(rl) => rl,
        None => {
            write_canned_error(&mut stream, 400, "Bad Request");
            return;
        }
    };
    if request_line.version != "HTTP/1.0" && request_line.version != "HTTP/1.1" {
        write_canned_error(&mut stream, 400, "Bad Request");
        return;
    }
    if request_line.method != "POST" {
        write_canned_error(&mut stream, 501, "Not Implemented");
        return;
    }

    let headers = parse_headers(header_block);
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[headers_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk) {
            Ok(0) => {
                write_canned_error(&mut stream, 408, "Request Timeout");
                return;
            }
            Ok(n) => body.extend_from_slice(&chunk[..n]),
            Err(e) if is_timeout(&e) => {
                write_canned_error(&mut stream, 408, "Request Timeout");
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, %peer_addr, "read error while waiting for body");
                return;
            }
        }
    }
    body.truncate(content_length);

    match codec::decode(&body, &[Shape::Notification, Shape::Request]) {
        Ok(Message::Notification(notification)) => {
            let mut interface = I::new(RequestMeta { peer_addr });
            dispatch::dispatch_notification(&mut interface, &notification);
        }
        Ok(Message::Request(request)) => {
            let mut interface = I::new(RequestMeta { peer_addr });
            let response_body = match dispatch::dispatch_request(&mut interface, &request) {
                DispatchResult::Result(value) => codec::encode_response(&request.id, &value),
                DispatchResult::Error(error) => codec::encode_error(Some(&request.id), &error),
            };
            write_json(&mut stream, response_body);
        }
        Ok(Message::Response(_)) => {
            tracing::debug!(%peer_addr, "server received a response-shaped body, ignoring");
        }
        Err(error) => {
            let body = codec::encode_error(None, &error);
            write_json(&mut stream, body);
        }
    }
}
