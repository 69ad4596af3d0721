//! Client address retrieval subsystem.
//!
//! # Data Flow
//! ```text
//! request headers (multi-valued, case-insensitive)
//!     → chain.rs (split, trim, parse; invalid tokens dropped)
//!     → ordered address chain, client side first
//!     → strategy:
//!         - header.rs (leftmost entry)
//!         - proxy_count.rs (skip N hops from the right)
//!         - proxy_cidr.rs (skip hops inside proxy networks)
//!     → Some(address) or None
//! ```
//!
//! # Design Decisions
//! - Strategies are a closed set; `Retriever` dispatches by variant
//! - Retrievers are immutable after construction and safe to share across tasks
//! - `None` is a normal outcome, never an error
//! - Only construction can fail (malformed proxy networks)

pub mod chain;
pub mod header;
pub mod proxy_count;
pub mod proxy_cidr;

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RetrieverConfig;

pub use chain::{address_chain, HeaderSource};
pub use header::HeaderRetriever;
pub use proxy_count::ProxyCountRetriever;
pub use proxy_cidr::{parse_cidr, ProxyCidrRetriever};

/// Error raised while building a retriever.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid proxy CIDR: {0:?}")]
    InvalidCidr(String),
    #[error("strategy `proxy-count` requires `proxy_count`")]
    MissingProxyCount,
    #[error("unknown strategy {0:?} (expected direct, proxy-count or proxy-cidr)")]
    UnknownStrategy(String),
}

/// The trust rule used to pick an address out of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    #[serde(alias = "header")]
    Direct,
    ProxyCount,
    ProxyCidr,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::ProxyCount => "proxy-count",
            Strategy::ProxyCidr => "proxy-cidr",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "header" => Ok(Strategy::Direct),
            "proxy-count" | "proxy_count" => Ok(Strategy::ProxyCount),
            "proxy-cidr" | "proxy_cidr" => Ok(Strategy::ProxyCidr),
            _ => Err(RetrievalError::UnknownStrategy(s.to_string())),
        }
    }
}

/// One configured retrieval strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retriever {
    Header(HeaderRetriever),
    ProxyCount(ProxyCountRetriever),
    ProxyCidr(ProxyCidrRetriever),
}

impl Retriever {
    /// Build the retriever described by `config`.
    ///
    /// Parameters that do not belong to the selected strategy are ignored.
    pub fn from_config(config: &RetrieverConfig) -> Result<Self, RetrievalError> {
        let header = config.header.trim();
        match config.strategy {
            Strategy::Direct => Ok(Retriever::Header(HeaderRetriever::new(header))),
            Strategy::ProxyCount => {
                let count = config.proxy_count.ok_or(RetrievalError::MissingProxyCount)?;
                Ok(Retriever::ProxyCount(ProxyCountRetriever::new(header, count)))
            }
            Strategy::ProxyCidr => Ok(Retriever::ProxyCidr(ProxyCidrRetriever::from_cidrs(
                header,
                &config.proxy_cidrs,
            )?)),
        }
    }

    /// Resolve the client address from `headers`.
    pub fn retrieve<H>(&self, headers: &H) -> Option<IpAddr>
    where
        H: HeaderSource + ?Sized,
    {
        match self {
            Retriever::Header(r) => r.retrieve(headers),
            Retriever::ProxyCount(r) => r.retrieve(headers),
            Retriever::ProxyCidr(r) => r.retrieve(headers),
        }
    }

    pub fn header_name(&self) -> &str {
        match self {
            Retriever::Header(r) => r.header(),
            Retriever::ProxyCount(r) => r.header(),
            Retriever::ProxyCidr(r) => r.header(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Retriever::Header(_) => Strategy::Direct,
            Retriever::ProxyCount(_) => Strategy::ProxyCount,
            Retriever::ProxyCidr(_) => Strategy::ProxyCidr,
        }
    }
}
