//! Real client address resolution behind reverse proxies.
//!
//! Reads a forwarding header such as `X-Forwarded-For`, applies a trust
//! policy to its address chain and hands the single trusted address on.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod retrieval;

pub use config::schema::RealIpConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use retrieval::{Retriever, Strategy};
