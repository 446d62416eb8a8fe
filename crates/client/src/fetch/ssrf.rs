//! SSRF (Server-Side Request Forgery) protection.
//!
//! The `domain` parameter comes straight from HTTP clients, so page fetches
//! must not be steerable at private, internal, or reserved addresses.
use std::net::IpAddr;
use url::{Host, Url};

/// Error type for SSRF validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("blocked host: {0}")]
    BlockedHost(String),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// This covers:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges (10/8, 172.16/12, 192.168/16)
/// - Link-local addresses (169.254/16, fe80::/10)
/// - Multicast addresses (224/4, ff00::/8)
/// - Unspecified addresses (0.0.0.0/8, ::)
/// - IPv6 unique local (fc00::/7)
/// - IPv4-mapped IPv6 addresses of any of the above
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validate that an IP address is not private or reserved.
///
/// Returns an error if the IP is blocked.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Whether a URL names a blocked address without needing DNS.
///
/// Used on redirect targets, where the policy callback cannot resolve names.
pub fn is_literal_private(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_or_reserved(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_or_reserved(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => true,
    }
}

/// Resolve the URL's host and require every answer to be public.
pub async fn check_host(url: &Url) -> Result<(), SsrfError> {
    let host = url.host().ok_or_else(|| SsrfError::BlockedHost(url.to_string()))?;

    match host {
        Host::Ipv4(v4) => validate_ip(IpAddr::V4(v4)),
        Host::Ipv6(v6) => validate_ip(IpAddr::V6(v6)),
        Host::Domain(domain) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Err(SsrfError::BlockedHost(domain.to_string()));
            }

            let port = url.port_or_known_default().unwrap_or(80);
            let addrs = tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| SsrfError::DnsError(format!("{domain}: {e}")))?;

            let mut resolved = 0;
            for addr in addrs {
                validate_ip(addr.ip())?;
                resolved += 1;
            }

            if resolved == 0 {
                return Err(SsrfError::DnsError(format!("{domain}: no addresses")));
            }

            tracing::debug!("{} resolved to {} public address(es)", domain, resolved);
            Ok(())
        }
    }
}
