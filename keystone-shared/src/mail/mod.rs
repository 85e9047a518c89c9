/// Outbound invitation email
///
/// Delivery is delegated to a transactional email provider; this module is
/// only the seam. [`Mailer`] takes a fully-rendered [`InvitationEmail`] and
/// hands it to a transport.
///
/// # Transports
///
/// - [`LogMailer`]: writes the delivery to the log (development default)
/// - [`webhook::WebhookMailer`]: POSTs the email as JSON to a provider or relay

pub mod webhook;

use crate::models::user::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

pub use webhook::WebhookMailer;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The request never reached the provider
    #[error("Mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Mail provider rejected message with status {0}")]
    Rejected(u16),
}

/// Invitation email payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationEmail {
    /// Recipient address
    pub to: String,

    /// Recipient display name, may be empty
    pub name: String,

    pub role: UserRole,

    /// Account setup link carrying the invitation token
    pub link: String,

    pub expires_at: DateTime<Utc>,
}

/// Sends invitation emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError>;
}

/// Logs invitations instead of sending them
///
/// The setup link is only emitted at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError> {
        info!(
            to = %email.to,
            role = %email.role,
            expires_at = %email.expires_at,
            "Invitation email (log transport)"
        );
        debug!(link = %email.link, "Invitation setup link");
        Ok(())
    }
}
