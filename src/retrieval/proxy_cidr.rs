//! Proxy-CIDR retrieval: walk back through hops that belong to known proxy networks.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::retrieval::chain::{address_chain, HeaderSource};
use crate::retrieval::RetrievalError;

/// Scans the chain from the right and returns the first address outside
/// every configured proxy network.
///
/// When every entry is inside a proxy network the leftmost entry is returned.
/// An empty network list trusts nothing, so the rightmost entry wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCidrRetriever {
    header: String,
    cidrs: Vec<IpNet>,
}

impl ProxyCidrRetriever {
    pub fn new(header: impl Into<String>, cidrs: Vec<IpNet>) -> Self {
        Self {
            header: header.into(),
            cidrs,
        }
    }

    /// Parse textual networks, failing on the first malformed entry.
    pub fn from_cidrs<S: AsRef<str>>(
        header: impl Into<String>,
        cidrs: &[S],
    ) -> Result<Self, RetrievalError> {
        let cidrs = cidrs
            .iter()
            .map(|cidr| parse_cidr(cidr.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(header, cidrs))
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn cidrs(&self) -> &[IpNet] {
        &self.cidrs
    }

    fn is_proxy(&self, ip: &IpAddr) -> bool {
        self.cidrs.iter().any(|net| net.contains(ip))
    }

    pub fn retrieve<H>(&self, headers: &H) -> Option<IpAddr>
    where
        H: HeaderSource + ?Sized,
    {
        let chain = address_chain(headers, &self.header);

        chain
            .iter()
            .rev()
            .find(|ip| !self.is_proxy(ip))
            .or_else(|| chain.first())
            .copied()
    }
}

/// Parse a network in CIDR notation. A bare address is taken as a host route.
pub fn parse_cidr(cidr: &str) -> Result<IpNet, RetrievalError> {
    let cidr = cidr.trim();
    if let Ok(net) = cidr.parse::<IpNet>() {
        return Ok(net.trunc());
    }

    let addr = cidr
        .parse::<IpAddr>()
        .map_err(|_| RetrievalError::InvalidCidr(cidr.to_string()))?;
    let prefix_len = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(addr, prefix_len).map_err(|_| RetrievalError::InvalidCidr(cidr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = "127.0.0.1, 25.0.0.1, 10.0.0.1, 10.0.0.2";

    fn headers(values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|v| ("X-Forwarded-For".to_string(), v.to_string()))
            .collect()
    }

    fn retriever(cidrs: &[&str]) -> ProxyCidrRetriever {
        ProxyCidrRetriever::from_cidrs("X-Forwarded-For", cidrs).unwrap()
    }

    #[test]
    fn test_proxy_cidr_retriever() {
        let cases = [
            ("Multiple untrusted IPs", vec!["10.0.0.0/30"], vec![CHAIN], Some("25.0.0.1")),
            (
                "Multiple header values",
                vec!["10.0.0.0/30"],
                vec!["127.0.0.1, 25.0.0.1", "10.0.0.1, 10.0.0.2"],
                Some("25.0.0.1"),
            ),
            ("Empty proxy CIDRs", vec![], vec![CHAIN], Some("10.0.0.2")),
            ("Empty proxy CIDRs and no header value", vec![], vec![], None),
            (
                "IPv4-mapped proxy hop",
                vec!["10.0.0.0/8"],
                vec!["25.0.0.1, ::ffff:10.0.0.1"],
                Some("25.0.0.1"),
            ),
            (
                "Several networks",
                vec!["10.0.0.0/8", "25.0.0.0/24"],
                vec![CHAIN],
                Some("127.0.0.1"),
            ),
        ];

        for (description, cidrs, values, want) in cases {
            let got = retriever(&cidrs).retrieve(&headers(&values));
            assert_eq!(got, want.map(|s| s.parse().unwrap()), "{}", description);
        }
    }

    #[test]
    fn test_all_trusted_falls_back_to_leftmost() {
        let got = retriever(&["0.0.0.0/0"]).retrieve(&headers(&[CHAIN]));
        assert_eq!(got, Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_opaque_token_does_not_hide_client() {
        use axum::http::{HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_bytes(b"\xff, 1.2.3.4").unwrap());
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        let got = retriever(&["10.0.0.0/8"]).retrieve(&headers);
        assert_eq!(got, Some("1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn test_ipv6_networks() {
        let got = retriever(&["fd00::/8"]).retrieve(&headers(&["2001:db8::5, fd00::1, fd12::3"]));
        assert_eq!(got, Some("2001:db8::5".parse().unwrap()));
    }

    #[test]
    fn test_parse_cidr() {
        assert_eq!(parse_cidr("10.0.0.1/30").unwrap().to_string(), "10.0.0.0/30");
        assert_eq!(parse_cidr(" 10.0.0.7 ").unwrap().to_string(), "10.0.0.7/32");
        assert_eq!(parse_cidr("::1").unwrap().to_string(), "::1/128");
        assert!(matches!(parse_cidr("10.0.0.0/33"), Err(RetrievalError::InvalidCidr(_))));
        assert!(matches!(parse_cidr("not-a-cidr"), Err(RetrievalError::InvalidCidr(_))));
    }

    #[test]
    fn test_from_cidrs_fails_fast() {
        let err = ProxyCidrRetriever::from_cidrs("X-Forwarded-For", &["10.0.0.0/8", "10.0.0.x/8"])
            .unwrap_err();
        assert_eq!(err, RetrievalError::InvalidCidr("10.0.0.x/8".to_string()));
    }
}
