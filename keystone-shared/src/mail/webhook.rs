/// Webhook mail transport
///
/// POSTs each [`InvitationEmail`] as JSON to a configured URL, typically a
/// transactional email provider's send endpoint or an internal relay. Any
/// non-2xx answer is reported as [`MailError::Rejected`]; nothing is retried.

use super::{InvitationEmail, MailError, Mailer};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// [`Mailer`] that delivers through an HTTP webhook
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    /// Creates a mailer posting to `url` with a 10 second request timeout
    pub fn new(url: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "template": "invitation",
                "message": email,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(to = %email.to, status = status.as_u16(), "Mail webhook rejected invitation");
            return Err(MailError::Rejected(status.as_u16()));
        }

        info!(to = %email.to, "Invitation email handed to mail webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::Utc;

    #[tokio::test]
    async fn test_unreachable_webhook_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let mailer = WebhookMailer::new("http://127.0.0.1:9/send").unwrap();
        let email = InvitationEmail {
            to: "jane@x.com".to_string(),
            name: "Jane".to_string(),
            role: UserRole::User,
            link: "http://localhost/setup-account?token=abc".to_string(),
            expires_at: Utc::now(),
        };

        let result = mailer.send_invitation(&email).await;
        assert!(matches!(result, Err(MailError::Transport(_))));
    }

    #[test]
    fn test_url_is_kept() {
        let mailer = WebhookMailer::new("https://mail.example.com/send").unwrap();
        assert_eq!(mailer.url(), "https://mail.example.com/send");
    }
}
