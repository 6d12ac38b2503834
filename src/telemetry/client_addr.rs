//! Client network address extraction.

use std::net::IpAddr;

use http::HeaderMap;

/// Proxy chain header; the first entry is the original client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Single-address header set by reverse proxies.
pub const REAL_IP_HEADER: &str = "x-real-ip";
/// Client address header set by the CDN in front of the platform.
pub const PROXY_CLIENT_IP_HEADER: &str = "cf-connecting-ip";
/// Used when no header names the client.
pub const LOOPBACK_FALLBACK: &str = "127.0.0.1";

/// How an address should be geolocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Loopback or private range; never looked up.
    Local,
    /// Routable address worth a lookup.
    Public(IpAddr),
    /// Not an IP address at all.
    Unknown,
}

/// Client address from the request headers, in order of preference.
pub fn client_address(headers: &HeaderMap) -> String {
    if let Some(first) = header_value(headers, FORWARDED_FOR_HEADER)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    header_value(headers, REAL_IP_HEADER)
        .or_else(|| header_value(headers, PROXY_CLIENT_IP_HEADER))
        .unwrap_or(LOOPBACK_FALLBACK)
        .to_string()
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Classify an address string.
pub fn classify(address: &str) -> AddressKind {
    if address.eq_ignore_ascii_case("localhost") {
        return AddressKind::Local;
    }
    match address.parse::<IpAddr>() {
        Ok(ip) if is_local(ip) => AddressKind::Local,
        Ok(ip) => AddressKind::Public(ip),
        Err(_) => AddressKind::Unknown,
    }
}

fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_local(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (first & 0xffc0) == 0xfe80
        }
    }
}
