//! Subdomain derivation from the `Host` header.
//!
//! # Responsibilities
//! - Strip the port (IPv6 brackets included) and a trailing root dot
//! - Reject IP literals and malformed hosts
//! - Return the leftmost label when the host has one before its apex
//!
//! # Design Decisions
//! - The apex of a public host is its last two labels (`example.com`)
//! - `localhost` is an apex of its own, so `sub.localhost` has a subdomain
//! - Anything unparseable yields `None`; callers treat that as pass-through

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use axum::http::uri::Authority;

const LOCALHOST: &str = "localhost";

/// A validated tenant label taken from the request host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subdomain(String);

impl Subdomain {
    /// Validate a single DNS label (lowercase ASCII alphanumerics and `-`).
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase();
        if is_dns_label(&label) {
            Some(Self(label))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Subdomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the tenant subdomain from a raw host header value.
pub fn subdomain_of(host: &str) -> Option<Subdomain> {
    let hostname = hostname_of(host)?;

    if hostname.starts_with('[') || IpAddr::from_str(&hostname).is_ok() {
        return None;
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    let apex_len = match labels.last() {
        Some(&LOCALHOST) => 1,
        _ => 2,
    };

    if labels.len() <= apex_len {
        return None;
    }

    Subdomain::parse(labels[0])
}

/// Lowercased hostname with port and trailing root dot removed.
fn hostname_of(host: &str) -> Option<String> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let authority = Authority::from_str(host).ok()?;
    // Userinfo has no place in a Host header.
    if authority.as_str().contains('@') {
        return None;
    }

    let hostname = authority.host().to_ascii_lowercase();
    let hostname = hostname.strip_suffix('.').unwrap_or(&hostname);
    if hostname.is_empty() {
        None
    } else {
        Some(hostname.to_string())
    }
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
