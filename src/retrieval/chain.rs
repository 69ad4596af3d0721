//! Address chain parsing.
//!
//! # Responsibilities
//! - Collect every value of one forwarding header, in the order received
//! - Split each value on commas and parse the tokens as IP addresses
//! - Drop tokens that are not addresses without leaving a gap
//!
//! # Design Decisions
//! - Leftmost entry is closest to the client, rightmost closest to us
//! - Header lookup goes through [`HeaderSource`] so callers are not tied to one map type
//! - Only plain textual addresses are accepted (no ports, brackets or zone ids)
//! - Values are split as raw bytes; a token that is not UTF-8 is dropped alone
//! - IPv4-mapped IPv6 addresses are folded to IPv4

use std::net::IpAddr;

use axum::http::HeaderMap;

/// A read-only, multi-valued header collection.
///
/// Lookups are case-insensitive and yield raw values in insertion order.
pub trait HeaderSource {
    /// All values set for `name`, oldest first.
    fn header_values(&self, name: &str) -> Vec<&[u8]>;
}

impl HeaderSource for HeaderMap {
    fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.get_all(name).iter().map(|value| value.as_bytes()).collect()
    }
}

impl HeaderSource for [(String, String)] {
    fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_bytes())
            .collect()
    }
}

impl HeaderSource for Vec<(String, String)> {
    fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.as_slice().header_values(name)
    }
}

/// Build the ordered address chain carried by header `name`.
///
/// A missing header yields an empty chain.
pub fn address_chain<H>(headers: &H, name: &str) -> Vec<IpAddr>
where
    H: HeaderSource + ?Sized,
{
    headers
        .header_values(name)
        .into_iter()
        .flat_map(|value| value.split(|b| *b == b','))
        .filter_map(|token| std::str::from_utf8(token).ok())
        .filter_map(|token| token.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const XFF: &str = "X-Forwarded-For";

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn pairs(values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|v| (XFF.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_order_across_values() {
        let headers = pairs(&["127.0.0.1, 25.0.0.1", "10.0.0.1,10.0.0.2"]);
        assert_eq!(
            address_chain(&headers, XFF),
            vec![ip("127.0.0.1"), ip("25.0.0.1"), ip("10.0.0.1"), ip("10.0.0.2")]
        );
    }

    #[test]
    fn test_invalid_tokens_dropped() {
        let headers = pairs(&["127.0.0.x", "unknown, 25.0.0.1 , ,10.0.0.1:80"]);
        assert_eq!(address_chain(&headers, XFF), vec![ip("25.0.0.1")]);
    }

    #[test]
    fn test_missing_and_empty() {
        let headers = pairs(&[""]);
        assert!(address_chain(&headers, XFF).is_empty());
        assert!(address_chain(&headers, "X-Real-Ip").is_empty());

        let none: Vec<(String, String)> = Vec::new();
        assert!(address_chain(&none, XFF).is_empty());
    }

    #[test]
    fn test_ipv6_tokens() {
        let headers = pairs(&["2001:db8::1, ::1"]);
        assert_eq!(address_chain(&headers, XFF), vec![ip("2001:db8::1"), ip("::1")]);
    }

    #[test]
    fn test_header_map_lookup() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_static("1.1.1.1"));
        headers.append("X-Forwarded-For", HeaderValue::from_static("2.2.2.2, 3.3.3.3"));

        assert_eq!(
            address_chain(&headers, XFF),
            vec![ip("1.1.1.1"), ip("2.2.2.2"), ip("3.3.3.3")]
        );
    }

    #[test]
    fn test_opaque_bytes_drop_only_their_token() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_bytes(b"\xff, 1.2.3.4").unwrap());
        headers.append("x-forwarded-for", HeaderValue::from_bytes(b"5.5.5.\xff5").unwrap());
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        assert_eq!(address_chain(&headers, XFF), vec![ip("1.2.3.4"), ip("10.0.0.1")]);
    }

    #[test]
    fn test_mapped_ipv6_folded_to_ipv4() {
        let headers = pairs(&["::ffff:25.0.0.1, ::ffff:a00:1, ::1"]);
        assert_eq!(
            address_chain(&headers, XFF),
            vec![ip("25.0.0.1"), ip("10.0.0.1"), ip("::1")]
        );
    }

    #[test]
    fn test_pair_lookup_ignores_case() {
        let headers = vec![
            ("x-forwarded-for".to_string(), "1.1.1.1".to_string()),
            ("Via".to_string(), "9.9.9.9".to_string()),
            ("X-FORWARDED-FOR".to_string(), "2.2.2.2".to_string()),
        ];
        assert_eq!(address_chain(&headers, XFF), vec![ip("1.1.1.1"), ip("2.2.2.2")]);
    }

    #[test]
    fn test_invalid_header_name_is_empty() {
        let headers = HeaderMap::new();
        assert!(address_chain(&headers, "not a header").is_empty());
    }
}
