//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: strict limits for `/api/auth` (~10/min)
//! - `api_rate_limiter`: relaxed limits for the rest of `/api` (~100/min)
//!
//! OTP sends are additionally limited per phone number in the OTP service.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Keys requests by client IP.
///
/// Proxy headers win over the socket address. Requests with neither (for
/// example in-process tests) share one bucket.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req))
    }
}

fn client_ip<T>(req: &Request<T>) -> IpAddr {
    let headers = req.headers();

    // First hop of X-Forwarded-For is the original client
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| {
            addr.ip()
        })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// Never: `per_second(6)` and `burst_size(5)` are always accepted by
/// `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for the general API: ~100 requests per minute per IP.
///
/// 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// Never: `per_second(1)` and `burst_size(50)` are always accepted by
/// `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.9")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&req), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_falls_back_to_socket_then_unspecified() {
        let mut req = Request::builder().body(()).unwrap();
        assert_eq!(client_ip(&req), IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let addr: SocketAddr = "198.51.100.4:5555".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_ip(&req), addr.ip());
    }
}
