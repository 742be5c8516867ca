use crate::AppState;
use crate::cache::rate_limit::{RateLimitDecision, hit};
use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

const WINDOW_SECS: u64 = 60;

/// Address the limit is keyed on. Forwarded headers are client-controlled, so
/// they count only when `trust_proxy` is set; otherwise the socket peer wins.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
    };
    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fixed-window limit on public registration endpoints.
pub async fn rate_limit_middleware<B>(
    State(state): State<Arc<AppState>>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(request.headers(), peer, state.config.trust_proxy_headers);
    let key = format!("ratelimit:register:{}", ip);

    match hit(&state.redis, &key, state.config.rate_limit_per_minute, WINDOW_SECS).await {
        RateLimitDecision::Limited { count } => {
            tracing::warn!(client_ip = %ip, count, "rate limit exceeded");
            Err(AppError::RateLimited)
        }
        RateLimitDecision::Allowed { .. } | RateLimitDecision::Unavailable => {
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn spoofed_headers(forwarded_for: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(forwarded_for));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        headers
    }

    #[test]
    fn test_forwarded_headers_ignored_by_default() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer), false), "10.0.0.9");
        assert_eq!(client_ip(&HeaderMap::new(), None, false), "unknown");

        // Rotating the header must not change the key.
        let first = client_ip(&spoofed_headers("203.0.113.7"), Some(peer), false);
        let second = client_ip(&spoofed_headers("203.0.113.8"), Some(peer), false);
        assert_eq!(first, "10.0.0.9");
        assert_eq!(first, second);
    }

    #[test]
    fn test_trusted_proxy_headers() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        assert_eq!(
            client_ip(&spoofed_headers("203.0.113.7, 10.0.0.1"), Some(peer), true),
            "203.0.113.7"
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.2"));
        assert_eq!(client_ip(&headers, Some(peer), true), "192.168.1.2");
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer), true), "10.0.0.9");
    }
}
