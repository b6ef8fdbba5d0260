//! Tenant routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → matcher.rs (exempt paths, tenant namespace guard)
//!     → host.rs (derive subdomain)
//!     → rules.rs (map path through ordered table)
//!     → router.rs: Decision::Rewrite("/tenant/<sub>/<path>") or PassThrough
//!
//! Compilation (at startup and on reload):
//!     TenancyConfig
//!     → compile matchers and rule table
//!     → Freeze as immutable TenantRouter
//! ```
//!
//! # Design Decisions
//! - Rules compiled at load, immutable at runtime
//! - No regex in hot path (exact, prefix, segment matching only)
//! - Deterministic: same input always yields the same decision
//! - First match wins (config order)

pub mod host;
pub mod matcher;
pub mod router;
pub mod rules;

pub use host::{subdomain_of, Subdomain};
pub use router::{Decision, PassReason, TenantRouter};

/// Active router, swapped atomically on config reload.
pub type SharedRouter = std::sync::Arc<arc_swap::ArcSwap<TenantRouter>>;
