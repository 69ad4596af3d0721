//! Proxy-count retrieval: skip a fixed number of trusted hops.

use std::net::IpAddr;

use crate::retrieval::chain::{address_chain, HeaderSource};

/// Assumes exactly `proxy_count` trusted proxies appended themselves to the
/// right of the chain, so the client is the next entry to their left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCountRetriever {
    header: String,
    proxy_count: i64,
}

impl ProxyCountRetriever {
    pub fn new(header: impl Into<String>, proxy_count: i64) -> Self {
        Self {
            header: header.into(),
            proxy_count,
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn proxy_count(&self) -> i64 {
        self.proxy_count
    }

    /// Returns the entry at `len - proxy_count - 1`.
    ///
    /// A non-positive count, or one that reaches past the leftmost entry,
    /// yields `None`.
    pub fn retrieve<H>(&self, headers: &H) -> Option<IpAddr>
    where
        H: HeaderSource + ?Sized,
    {
        if self.proxy_count <= 0 {
            return None;
        }
        let skip = usize::try_from(self.proxy_count).ok()?;

        address_chain(headers, &self.header)
            .into_iter()
            .rev()
            .nth(skip)
    }
}
