//! PTZ hostname resolution
//!
//! Resolution sits behind [`Resolver`] so relays can be driven from a fixed
//! host table in tests. [`DnsResolver`] uses the system resolver through
//! `tokio::net::lookup_host`.

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Resolves a PTZ hostname to an address
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host`, failing with [`Error::Resolution`] if unknown
    async fn resolve(&self, host: &str) -> Result<IpAddr>;
}

/// System resolver
///
/// IPv4 answers are preferred; cameras speak VISCA over IPv4.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let not_found = || Error::Resolution {
            host: host.to_string(),
        };

        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|_| not_found())?
            .map(|addr| addr.ip())
            .collect();

        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(not_found)
    }
}

/// Fixed host table
///
/// IP literals always resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host entry
    pub fn with_host(mut self, host: impl Into<String>, ip: IpAddr) -> Self {
        self.hosts.insert(host.into(), ip);
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        self.hosts.get(host).copied().ok_or_else(|| Error::Resolution {
            host: host.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[tokio::test]
    async fn test_dns_resolver_literal() {
        let ip = DnsResolver.resolve("10.0.0.7").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver =
            StaticResolver::new().with_host("ptz-a", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)));

        assert_eq!(
            resolver.resolve("ptz-a").await.unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(
            resolver.resolve("127.0.0.1").await.unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
        assert!(matches!(
            resolver.resolve("ptz-b").await,
            Err(Error::Resolution { .. })
        ));
    }
}
