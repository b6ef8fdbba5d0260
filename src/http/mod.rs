//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID)
//!     → middleware/tenant.rs (decide, rewrite path, attach TenantContext)
//!     → server.rs forward_handler (send to upstream, stream response back)
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::TenantContext;
pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{HttpServer, ServerError, Upstream};
