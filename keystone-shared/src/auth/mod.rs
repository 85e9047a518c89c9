/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 access tokens for staff sessions
/// - [`invite_token`]: Random single-use invitation tokens
/// - [`authorization`]: Request identity and invite permissions

pub mod authorization;
pub mod invite_token;
pub mod jwt;
pub mod password;
