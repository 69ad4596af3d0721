//! Direct retrieval: trust the leftmost address as-is.

use std::net::IpAddr;

use crate::retrieval::chain::{address_chain, HeaderSource};

/// Returns the first valid address of the header chain.
///
/// Only safe behind exactly one trusted proxy, or when the header is set by
/// something that is trusted outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRetriever {
    header: String,
}

impl HeaderRetriever {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn retrieve<H>(&self, headers: &H) -> Option<IpAddr>
    where
        H: HeaderSource + ?Sized,
    {
        address_chain(headers, &self.header).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|v| ("X-Forwarded-For".to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_header_retriever() {
        let retriever = HeaderRetriever::new("X-Forwarded-For");
        let cases = [
            (vec!["127.0.0.1"], Some("127.0.0.1")),
            (vec!["127.0.0.1", "10.0.0.1, 10.0.0.2"], Some("127.0.0.1")),
            (vec!["127.0.0.x", "25.0.0.1"], Some("25.0.0.1")),
            (vec!["127.0.0.1, 25.0.0.1, 10.0.0.1"], Some("127.0.0.1")),
            (vec![], None),
            (vec!["garbage"], None),
        ];

        for (values, want) in cases {
            let got = retriever.retrieve(&headers(&values));
            assert_eq!(got, want.map(|s| s.parse().unwrap()), "values: {:?}", values);
        }
    }
}
