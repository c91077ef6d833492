//! Request header extraction.
//!
//! # Responsibilities
//! - Derive the client address (X-Forwarded-For, else the peer host)
//! - Check X-Forwarded-Proto when TLS is enforced upstream
//! - Pull the request id and logplex drain token
//!
//! # Design Decisions
//! - X-Forwarded-For is taken verbatim; the router in front is trusted
//! - Missing or non-UTF-8 values read as empty

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_REQUEST_ID: &str = "x-request-id";
pub const LOGPLEX_DRAIN_TOKEN: &str = "logplex-drain-token";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Client address: X-Forwarded-For if present, else the peer's host part.
pub fn remote_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    match header_str(headers, X_FORWARDED_FOR) {
        "" => peer.map(|p| p.ip().to_string()).unwrap_or_default(),
        forwarded => forwarded.to_string(),
    }
}

/// Whether the terminating proxy saw HTTPS.
pub fn forwarded_proto_is_https(headers: &HeaderMap) -> bool {
    header_str(headers, X_FORWARDED_PROTO) == "https"
}

pub fn request_id(headers: &HeaderMap) -> &str {
    header_str(headers, X_REQUEST_ID)
}

pub fn drain_token(headers: &HeaderMap) -> &str {
    header_str(headers, LOGPLEX_DRAIN_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    #[test]
    fn forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4"));
        assert_eq!(remote_addr(&headers, peer()), "1.2.3.4");
    }

    #[test]
    fn peer_host_without_port() {
        let headers = HeaderMap::new();
        assert_eq!(remote_addr(&headers, peer()), "10.0.0.7");
        assert_eq!(
            remote_addr(&headers, Some("[::1]:8080".parse().unwrap())),
            "::1"
        );
        assert_eq!(remote_addr(&headers, None), "");
    }

    #[test]
    fn proto_must_be_exactly_https() {
        let mut headers = HeaderMap::new();
        assert!(!forwarded_proto_is_https(&headers));
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        assert!(!forwarded_proto_is_https(&headers));
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
        assert!(forwarded_proto_is_https(&headers));
    }

    #[test]
    fn ids_default_to_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "");
        assert_eq!(drain_token(&headers), "");

        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        headers.insert(LOGPLEX_DRAIN_TOKEN, HeaderValue::from_static("d.123"));
        assert_eq!(request_id(&headers), "abc");
        assert_eq!(drain_token(&headers), "d.123");
    }
}
