use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Best known address of the client that sent a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the client address. Forwarding headers are only honoured when
/// the direct peer is one of the trusted proxies.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer) = peer else {
        return "unknown".to_string();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    // Take the first IP in the chain
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(ip) = value.split(',').next().map(str::trim).filter(|ip| !ip.is_empty()) {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            return value.trim().to_string();
        }
    }

    peer.to_string()
}

/// Middleware attaching a [`ClientIp`] extension to every request
pub async fn client_ip_middleware(
    State(trusted_proxies): State<Arc<Vec<IpAddr>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let ip = resolve_client_ip(request.headers(), peer, &trusted_proxies);
    request.extensions_mut().insert(ClientIp(ip));

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarding_headers() {
        let headers = headers(&[("x-forwarded-for", "1.2.3.4"), ("x-real-ip", "5.6.7.8")]);
        assert_eq!(resolve_client_ip(&headers, Some(ip("10.0.0.5")), &[]), "10.0.0.5");
    }

    #[test]
    fn test_trusted_proxy_forwarded_for() {
        let headers = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1")]);
        let trusted = [ip("10.0.0.1")];
        assert_eq!(resolve_client_ip(&headers, Some(ip("10.0.0.1")), &trusted), "1.2.3.4");
    }

    #[test]
    fn test_trusted_proxy_real_ip() {
        let headers = headers(&[("x-real-ip", "5.6.7.8")]);
        let trusted = [ip("10.0.0.1")];
        assert_eq!(resolve_client_ip(&headers, Some(ip("10.0.0.1")), &trusted), "5.6.7.8");
    }

    #[test]
    fn test_trusted_proxy_without_headers() {
        let trusted = [ip("::1")];
        assert_eq!(resolve_client_ip(&HeaderMap::new(), Some(ip("::1")), &trusted), "::1");
    }

    #[test]
    fn test_missing_peer() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None, &[]), "unknown");
    }
}
