//! Blocking HTTP/1.1 POST transport: write one request, read one response.
//!
//! Grounded in the byte-stream parsing style of
//! `transit::http::HTTPParser::pop` and `http::Session::run`, mirrored for
//! the response side instead of the request side.

use crate::LIBRARY_ID;
use std::io::{Read, Write};
use std::net::TcpStream;

pub(crate) struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

pub(crate) fn write_post(
    stream: &mut TcpStream,
    host: &str,
    path: &str,
    body: &[u8],
) -> std::io::Result<()> {
    let mut head = String::new();
    head.push_str(&format!("POST {path} HTTP/1.1\r\n"));
    head.push_str(&format!("Host: {host}\r\n"));
    head.push_str("Content-Type: application/json-rpc\r\n");
    head.push_str(&format!("User-Agent: {LIBRARY_ID}\r\n"));
    head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    head.push_str("Connection: close\r\n");
    head.push_str("\r\n");
    stream.write_all(head.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}

fn find_double_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

pub(crate) fn read_response(stream: &mut TcpStream) -> std::io::Result<HttpResponse> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let headers_end = loop {
        if let Some(pos) = find_double_crlf(&buf) {
            break pos;
        }
        match stream.read(&mut chunk)? {
            0 => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed before headers completed",
                ))
            }
            n => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let header_block = std::str::from_utf8(&buf[..headers_end])
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut lines = header_block.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next().unwrap_or_default();
    let status: u16 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "bad status line"))?;
    let reason = parts.next().unwrap_or_default().to_string();

    let mut content_length: usize = 0;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = buf[headers_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk)? {
            0 => break,
            n => body.extend_from_slice(&chunk[..n]),
        }
    }
    body.truncate(content_length);

    Ok(HttpResponse {
        status,
        reason,
        body,
    })
}
