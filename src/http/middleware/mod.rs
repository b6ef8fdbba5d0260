//! Request middleware applied in front of upstream forwarding.

pub mod tenant;

pub use tenant::{request_host, rewrite_uri, tenant_rewrite_middleware, TenantContext};
