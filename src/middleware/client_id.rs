use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Used when neither proxy headers nor the socket address identify the caller.
pub const FALLBACK_CLIENT_ID: &str = "127.0.0.1";

/// How the caller's identity is derived.
///
/// Proxy headers are caller-controlled, so they are only read when the
/// service sits behind a proxy that overwrites them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientIdPolicy {
    pub trust_proxy_headers: bool,
}

impl ClientIdPolicy {
    pub const fn trusting_proxy_headers() -> Self {
        Self {
            trust_proxy_headers: true,
        }
    }
}

/// The key a caller's requests are counted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Extract a client identifier from the request
///
/// With trusted proxy headers: first `X-Forwarded-For` hop, then `X-Real-IP`.
/// Otherwise, and as the fallback: peer address, then loopback.
pub fn extract_client_id(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    policy: ClientIdPolicy,
) -> ClientId {
    let proxied = if policy.trust_proxy_headers {
        header_value(headers, "x-forwarded-for").or_else(|| header_value(headers, "x-real-ip"))
    } else {
        None
    };

    let id = proxied
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| FALLBACK_CLIENT_ID.to_string());

    ClientId(id)
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
    ClientIdPolicy: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(extract_client_id(
            &parts.headers,
            peer,
            ClientIdPolicy::from_ref(state),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const TRUSTED: ClientIdPolicy = ClientIdPolicy::trusting_proxy_headers();
    const UNTRUSTED: ClientIdPolicy = ClientIdPolicy {
        trust_proxy_headers: false,
    };

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:51000".parse().expect("valid socket addr"))
    }

    fn proxied_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.5 , 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        headers
    }

    #[test]
    fn proxy_headers_ignored_by_default() {
        assert_eq!(ClientIdPolicy::default(), UNTRUSTED);

        let id = extract_client_id(&proxied_headers(), peer(), UNTRUSTED);

        assert_eq!(id.as_str(), "192.0.2.7");
    }

    #[test]
    fn untrusted_headers_without_peer_use_loopback() {
        let id = extract_client_id(&proxied_headers(), None, UNTRUSTED);

        assert_eq!(id.as_str(), FALLBACK_CLIENT_ID);
    }

    #[test]
    fn trusted_forwarded_for_takes_first_hop() {
        let id = extract_client_id(&proxied_headers(), peer(), TRUSTED);

        assert_eq!(id.as_str(), "203.0.113.5");
    }

    #[test]
    fn trusted_real_ip_before_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));

        assert_eq!(extract_client_id(&headers, peer(), TRUSTED).as_str(), "198.51.100.1");
    }

    #[test]
    fn trusted_without_headers_uses_peer_then_loopback() {
        let headers = HeaderMap::new();

        assert_eq!(extract_client_id(&headers, peer(), TRUSTED).as_str(), "192.0.2.7");
        assert_eq!(extract_client_id(&headers, None, TRUSTED).as_str(), FALLBACK_CLIENT_ID);
    }

    #[test]
    fn blank_forwarded_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));

        assert_eq!(extract_client_id(&headers, None, TRUSTED).as_str(), FALLBACK_CLIENT_ID);
    }
}
