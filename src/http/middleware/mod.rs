//! Request middleware.

pub mod real_ip;

pub use real_ip::{real_ip_middleware, shared_policy, ClientIp, PolicyError, RealIpPolicy, Resolution, SharedPolicy};
