/// Database models for Keystone
///
/// # Models
///
/// - `user`: User accounts, roles and pending invitations

pub mod user;
