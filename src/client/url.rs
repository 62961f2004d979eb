//! A deliberately minimal `scheme://host[:port][/path]` parser.
//!
//! No crate in this workspace or its siblings pulls in `url`; transport
//! addressing elsewhere (`http.rs`, `transit/http.rs`) is hand-parsed byte
//! by byte, so a base URL is parsed the same way rather than reaching for an
//! unaligned dependency.

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BaseUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

pub(crate) fn parse(url: &str) -> Result<BaseUrl, ClientError> {
    let rest = url.strip_prefix("http://").ok_or_else(|| ClientError::InvalidUrl {
        url: url.to_string(),
        reason: "only the http scheme is supported".to_string(),
    })?;

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/RPC2"),
    };
    if authority.is_empty() {
        return Err(ClientError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port_str)) => {
            let port: u16 = port_str.parse().map_err(|_| ClientError::InvalidUrl {
                url: url.to_string(),
                reason: format!("invalid port {port_str:?}"),
            })?;
            (host.to_string(), port)
        }
        None => (authority.to_string(), 80),
    };

    Ok(BaseUrl {
        host,
        port,
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_default_port_and_path() {
        let u = parse("http://localhost").unwrap();
        assert_eq!(u.host, "localhost");
        assert_eq!(u.port, 80);
        assert_eq!(u.path, "/RPC2");
    }

    #[test]
    fn parses_explicit_port_and_path() {
        let u = parse("http://example.com:8080/RPC2").unwrap();
        assert_eq!(u.host, "example.com");
        assert_eq!(u.port, 8080);
        assert_eq!(u.path, "/RPC2");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(parse("https://example.com").is_err());
    }
}
