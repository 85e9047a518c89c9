//! # Keystone Shared Library
//!
//! Domain types, persistence and business logic for the Keystone invitation
//! lifecycle, shared by the API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: User record and role types
//! - `store`: `UserStore` repository trait with PostgreSQL and in-memory backends
//! - `db`: Connection pool and migration helpers
//! - `auth`: Password hashing, JWT access tokens, invitation tokens, authorization
//! - `invitation`: Verification, acceptance and issuance of invitations
//! - `mail`: Outbound invitation email seam

pub mod auth;
pub mod db;
pub mod invitation;
pub mod mail;
pub mod models;
pub mod store;

/// Current version of the Keystone shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
