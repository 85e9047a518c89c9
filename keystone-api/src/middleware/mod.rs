/// Middleware modules for the API server
///
/// - `auth`: Bearer token authentication for staff routes
/// - `security`: Security headers

pub mod auth;
pub mod security;
