//! Host identification for new connections
//!
//! Settings are keyed by host rather than by connection, so several tabs on
//! one machine share their settings. The host id is the reverse-DNS name of
//! the peer, the local hostname for loopback peers, or the raw IP when the
//! lookup fails or takes too long.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;

use super::client::Client;
use super::server::ConnectionMiddleware;

/// Upper bound on a reverse lookup
pub const LOOKUP_TIMEOUT: Duration = Duration::from_millis(200);

/// Unwrap IPv4 addresses that arrive as IPv4-mapped IPv6.
pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

/// Name of this machine, if the platform reports one
pub fn local_hostname() -> Option<String> {
    sysinfo::System::host_name()
}

/// Resolve a display name for `ip`.
pub async fn resolve_host(ip: IpAddr, timeout: Duration) -> String {
    let ip = normalize_ip(ip);
    let fallback = ip.to_string();

    if ip.is_loopback() {
        return local_hostname().unwrap_or(fallback);
    }

    let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Ok(name))) if !name.is_empty() && name != fallback => name,
        Ok(Ok(Err(e))) => {
            tracing::debug!("Reverse lookup for {} failed: {}", fallback, e);
            fallback
        }
        Err(_) => {
            tracing::debug!("Reverse lookup for {} timed out", fallback);
            fallback
        }
        _ => fallback,
    }
}

/// Connection middleware that fills in [`Client::host`].
pub fn resolve_host_middleware(timeout: Duration) -> ConnectionMiddleware {
    Arc::new(move |client: Arc<Client>| {
        async move {
            let host = resolve_host(client.addr().ip(), timeout).await;
            client.set_host(host);
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ip_unwraps_mapped_v4() {
        let mapped: IpAddr = "::ffff:192.168.1.20".parse().unwrap();
        assert_eq!(normalize_ip(mapped), "192.168.1.20".parse::<IpAddr>().unwrap());

        let v6: IpAddr = "fe80::1".parse().unwrap();
        assert_eq!(normalize_ip(v6), v6);
    }

    #[tokio::test]
    async fn test_loopback_resolves_to_local_name() {
        let host = resolve_host("127.0.0.1".parse().unwrap(), LOOKUP_TIMEOUT).await;
        let expected = local_hostname().unwrap_or_else(|| "127.0.0.1".to_string());
        assert_eq!(host, expected);
    }

    #[tokio::test]
    async fn test_mapped_loopback_is_treated_as_loopback() {
        let host = resolve_host("::ffff:127.0.0.1".parse().unwrap(), LOOKUP_TIMEOUT).await;
        assert!(!host.starts_with("::ffff"));
    }
}
