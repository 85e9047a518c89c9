/// Invitation token generation
///
/// Tokens are 32 bytes from the thread-local CSPRNG, hex-encoded to 64
/// lowercase characters so they drop into a URL query string unescaped.
///
/// ```
/// use keystone_shared::auth::invite_token::{generate_invite_token, INVITE_TOKEN_LENGTH};
///
/// let token = generate_invite_token();
/// assert_eq!(token.len(), INVITE_TOKEN_LENGTH);
/// ```

use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// Length of an encoded invitation token
pub const INVITE_TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
