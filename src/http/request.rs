//! Request metadata: correlation IDs and client addresses.
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-For` is believed only when the peer is a trusted proxy

use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::ListenerConfig;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Decides which address a request came from.
#[derive(Debug, Clone, Default)]
pub struct ClientIpPolicy {
    trusted: Vec<IpAddr>,
}

impl ClientIpPolicy {
    pub fn new(trusted: Vec<IpAddr>) -> Self {
        Self { trusted }
    }

    /// Build from listener config; entries that are not IPs are skipped.
    pub fn from_config(config: &ListenerConfig) -> Self {
        let trusted = config
            .trusted_proxies
            .iter()
            .filter_map(|proxy| match proxy.parse() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(proxy = %proxy, "Ignoring trusted proxy that is not an IP address");
                    None
                }
            })
            .collect();
        Self::new(trusted)
    }

    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted.contains(&ip)
    }

    /// Client address for a request arriving from `peer`.
    ///
    /// Forwarded entries are read right to left, skipping trusted hops. An
    /// unparsable entry ends the search at the peer. When every hop is
    /// trusted, the left-most entry is the client.
    pub fn resolve(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> Option<IpAddr> {
        let peer = peer?;
        if !self.is_trusted(peer) {
            return Some(peer);
        }

        let hops: Vec<&str> = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .collect();

        let mut leftmost = None;
        for hop in hops.iter().rev() {
            let Ok(ip) = hop.parse::<IpAddr>() else {
                return Some(peer);
            };
            if !self.is_trusted(ip) {
                return Some(ip);
            }
            leftmost = Some(ip);
        }

        Some(leftmost.unwrap_or(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(value));
        headers
    }

    fn policy() -> ClientIpPolicy {
        ClientIpPolicy::new(vec![ip("127.0.0.1"), ip("10.0.0.2")])
    }

    #[test]
    fn test_untrusted_peer_is_the_client() {
        let client = policy().resolve(Some(ip("203.0.113.9")), &forwarded("1.2.3.4"));
        assert_eq!(client, Some(ip("203.0.113.9")));
    }

    #[test]
    fn test_trusted_peer_defers_to_forwarded_chain() {
        let client = policy().resolve(Some(ip("127.0.0.1")), &forwarded("198.51.100.7, 10.0.0.2"));
        assert_eq!(client, Some(ip("198.51.100.7")));
    }

    #[test]
    fn test_garbage_hop_falls_back_to_peer() {
        let client = policy().resolve(Some(ip("127.0.0.1")), &forwarded("1.2.3.4, not-an-ip"));
        assert_eq!(client, Some(ip("127.0.0.1")));
    }

    #[test]
    fn test_all_trusted_hops_yield_leftmost() {
        let client = policy().resolve(Some(ip("127.0.0.1")), &forwarded("10.0.0.2, 127.0.0.1"));
        assert_eq!(client, Some(ip("10.0.0.2")));
    }

    #[test]
    fn test_no_peer_no_client() {
        assert_eq!(policy().resolve(None, &forwarded("1.2.3.4")), None);
    }

    #[test]
    fn test_from_config_skips_invalid_entries() {
        let config = ListenerConfig {
            trusted_proxies: vec!["127.0.0.1".to_string(), "proxy.local".to_string()],
            ..ListenerConfig::default()
        };
        let policy = ClientIpPolicy::from_config(&config);
        assert!(policy.is_trusted(ip("127.0.0.1")));
        assert_eq!(policy.trusted.len(), 1);
    }

    #[test]
    fn test_request_ids_are_unique_uuids() {
        let request = Request::new(());
        let mut maker = UuidRequestId;
        let first = maker.make_request_id(&request).unwrap();
        let second = maker.make_request_id(&request).unwrap();

        let text = first.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
        assert_ne!(first.header_value(), second.header_value());
    }
}
