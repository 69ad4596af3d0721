//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (assign request ID)
//!     → middleware/real_ip.rs (resolve client, rewrite target header)
//!     → upstream.rs (forward) or echo of the resolved address
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;
pub mod upstream;

pub use middleware::{ClientIp, RealIpPolicy, SharedPolicy};
pub use request::{RequestUuid, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
