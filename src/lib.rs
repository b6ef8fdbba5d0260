//! Host-based tenant router.
//!
//! Rewrites `acme.example.com/cohorts/42` to the internal route
//! `/tenant/acme/cohort/42` and forwards it to the application server,
//! leaving the client-visible URL untouched.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Decision, TenantRouter};
