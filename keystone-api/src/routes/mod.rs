/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Staff login
/// - `invitations`: Invitation verify, accept, issue and resend

pub mod auth;
pub mod health;
pub mod invitations;
