/// Invitation issuance
///
/// Staff create invited user records here. Each invitation gets a fresh
/// random token and an expiry `ttl` from now; the setup link is then handed
/// to the [`Mailer`]. Authorization (who may invite which role) is checked by
/// the caller before these functions run.
///
/// If mail delivery fails the record is kept, so the invitation can be
/// re-sent with [`reissue`].

use super::InvitationError;
use crate::auth::invite_token::generate_invite_token;
use crate::auth::password::PasswordPolicy;
use crate::mail::{InvitationEmail, Mailer};
use crate::models::user::{join_name, NewInvitedUser, User, UserRole};
use crate::store::UserStore;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};
use uuid::Uuid;

/// Settings shared by issuance and acceptance
#[derive(Debug, Clone)]
pub struct InvitationSettings {
    /// Lifetime of a freshly issued token
    pub ttl: Duration,

    /// Base URL of the web app; links point at `{base}/setup-account`
    pub app_base_url: String,

    /// Cost parameters for hashing the invitee's password
    pub password_policy: PasswordPolicy,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::days(7),
            app_base_url: "http://localhost:3000".to_string(),
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl InvitationSettings {
    /// Account setup link for `token`
    pub fn setup_link(&self, token: &str) -> String {
        format!(
            "{}/setup-account?token={}",
            self.app_base_url.trim_end_matches('/'),
            token
        )
    }

    /// Expiry of a token issued at `now`
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, InvitationError> {
        now.checked_add_signed(self.ttl)
            .ok_or(InvitationError::LifetimeOutOfRange)
    }
}

/// Who to invite
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
}

/// Result of issuing or re-issuing an invitation
///
/// Carries no token: the token only leaves the process inside the email.
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}

/// Blank optional name parts are stored as `None`
fn clean_name(part: Option<String>) -> Option<String> {
    part.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())
}

async fn deliver(
    mailer: &dyn Mailer,
    user_id: Uuid,
    email: InvitationEmail,
) -> Result<(), InvitationError> {
    if let Err(e) = mailer.send_invitation(&email).await {
        error!(user_id = %user_id, error = %e, "Failed to send invitation email");
        return Err(e.into());
    }
    Ok(())
}

/// Creates an invited user and emails the setup link
///
/// # Errors
///
/// - [`InvitationError::LifetimeOutOfRange`] if `now + ttl` overflows;
///   nothing is stored or sent
/// - [`crate::store::StoreError::DuplicateEmail`] (wrapped) if the email is taken
/// - [`InvitationError::Mail`] if delivery fails; the record is kept
pub async fn issue(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    settings: &InvitationSettings,
    invitation: NewInvitation,
    now: DateTime<Utc>,
) -> Result<IssuedInvitation, InvitationError> {
    let expires_at = settings.expiry_from(now)?;
    let token = generate_invite_token();

    let user = store
        .create_invited(NewInvitedUser {
            email: invitation.email,
            first_name: clean_name(invitation.first_name),
            last_name: clean_name(invitation.last_name),
            role: invitation.role,
            invitation_token: token.clone(),
            token_expiry: expires_at,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, expires_at = %expires_at, "Invitation issued");

    let email = InvitationEmail {
        to: user.email.clone(),
        name: join_name(user.first_name.as_deref(), user.last_name.as_deref()),
        role: user.role,
        link: settings.setup_link(&token),
        expires_at,
    };
    deliver(mailer, user.id, email).await?;

    Ok(IssuedInvitation {
        user_id: user.id,
        email: user.email,
        role: user.role,
        expires_at,
    })
}

/// Replaces the token of a still-pending invitation and emails the new link
///
/// The previous token stops working as soon as the update lands.
///
/// # Errors
///
/// - [`InvitationError::AlreadySetUp`] if the account is already verified,
///   including when it got verified between lookup and update
/// - [`InvitationError::Mail`] if delivery fails
pub async fn reissue(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    settings: &InvitationSettings,
    user: &User,
    now: DateTime<Utc>,
) -> Result<IssuedInvitation, InvitationError> {
    if user.is_email_verified {
        return Err(InvitationError::AlreadySetUp);
    }

    let expires_at = settings.expiry_from(now)?;
    let token = generate_invite_token();

    if !store.replace_invitation(user.id, &token, expires_at).await? {
        return Err(InvitationError::AlreadySetUp);
    }

    info!(user_id = %user.id, expires_at = %expires_at, "Invitation re-issued");

    let email = InvitationEmail {
        to: user.email.clone(),
        name: user.display_name(),
        role: user.role,
        link: settings.setup_link(&token),
        expires_at,
    };
    deliver(mailer, user.id, email).await?;

    Ok(IssuedInvitation {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invitation::{accept, verify};
    use crate::mail::MailError;
    use crate::store::{MemoryUserStore, StoreError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<InvitationEmail>>,
    }

    impl CapturingMailer {
        fn last_token(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let link = &sent.last().expect("an email was sent").link;
            link.split("token=").nth(1).unwrap().to_string()
        }
    }

    #[async_trait]
    impl Mailer for CapturingMailer {
        async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct RejectingMailer;

    #[async_trait]
    impl Mailer for RejectingMailer {
        async fn send_invitation(&self, _email: &InvitationEmail) -> Result<(), MailError> {
            Err(MailError::Rejected(503))
        }
    }

    fn settings() -> InvitationSettings {
        InvitationSettings {
            ttl: Duration::hours(48),
            app_base_url: "https://app.example.com/".to_string(),
            password_policy: PasswordPolicy {
                memory_kib: 1024,
                iterations: 1,
                lanes: 1,
            },
        }
    }

    fn jane() -> NewInvitation {
        NewInvitation {
            email: "Jane@X.com".to_string(),
            first_name: Some(" Jane ".to_string()),
            last_name: Some("Doe".to_string()),
            role: UserRole::Manager,
        }
    }

    #[test]
    fn test_setup_link_strips_trailing_slash() {
        assert_eq!(
            settings().setup_link("abc"),
            "https://app.example.com/setup-account?token=abc"
        );
    }

    #[tokio::test]
    async fn test_issue_creates_pending_user_and_mails_link() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();
        let now = Utc::now();

        let issued = issue(&store, &mailer, &settings(), jane(), now).await.unwrap();
        assert_eq!(issued.email, "jane@x.com");
        assert_eq!(issued.role, UserRole::Manager);
        assert_eq!(issued.expires_at, now + Duration::hours(48));

        let user = store.find_by_id(issued.user_id).await.unwrap().unwrap();
        assert!(user.has_pending_invitation());
        assert!(user.password_hash.is_none());
        assert_eq!(user.first_name.as_deref(), Some("Jane"));

        {
            let sent = mailer.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to, "jane@x.com");
            assert_eq!(sent[0].name, "Jane Doe");
            assert!(sent[0].link.starts_with("https://app.example.com/setup-account?token="));
        }

        let token = mailer.last_token();
        assert_eq!(user.invitation_token.as_deref(), Some(token.as_str()));

        let details = verify(&store, &token, now).await.unwrap();
        assert_eq!(details.name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_issue_duplicate_email() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();

        issue(&store, &mailer, &settings(), jane(), Utc::now()).await.unwrap();
        let err = issue(&store, &mailer, &settings(), jane(), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Store(StoreError::DuplicateEmail)));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_record() {
        let store = MemoryUserStore::new();

        let err = issue(&store, &RejectingMailer, &settings(), jane(), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Mail(MailError::Rejected(503))));
        assert!(store.find_by_email("jane@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_issue_with_overflowing_lifetime_fails_cleanly() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();
        let settings = InvitationSettings {
            ttl: Duration::hours(2_000_000_000_000),
            ..settings()
        };

        let err = issue(&store, &mailer, &settings, jane(), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::LifetimeOutOfRange));
        assert!(!err.is_client_error());
        assert!(store.find_by_email("jane@x.com").await.unwrap().is_none());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reissue_with_overflowing_lifetime_keeps_old_token() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();
        let now = Utc::now();

        let issued = issue(&store, &mailer, &settings(), jane(), now).await.unwrap();
        let token = mailer.last_token();
        let user = store.find_by_id(issued.user_id).await.unwrap().unwrap();

        let huge = InvitationSettings {
            ttl: Duration::hours(2_000_000_000_000),
            ..settings()
        };
        assert!(matches!(
            reissue(&store, &mailer, &huge, &user, now).await,
            Err(InvitationError::LifetimeOutOfRange)
        ));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
        assert!(verify(&store, &token, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_reissue_invalidates_old_token() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();
        let now = Utc::now();

        let issued = issue(&store, &mailer, &settings(), jane(), now).await.unwrap();
        let old_token = mailer.last_token();

        let user = store.find_by_id(issued.user_id).await.unwrap().unwrap();
        reissue(&store, &mailer, &settings(), &user, now).await.unwrap();
        let new_token = mailer.last_token();

        assert_ne!(old_token, new_token);
        assert!(matches!(
            verify(&store, &old_token, now).await,
            Err(InvitationError::InvalidToken)
        ));
        assert!(verify(&store, &new_token, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_reissue_refuses_activated_account() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();
        let now = Utc::now();
        let settings = settings();

        issue(&store, &mailer, &settings, jane(), now).await.unwrap();
        let token = mailer.last_token();
        let user_id = accept(&store, &token, "s3cret!", &settings.password_policy, now)
            .await
            .unwrap();

        let user = store.find_by_id(user_id).await.unwrap().unwrap();
        assert!(matches!(
            reissue(&store, &mailer, &settings, &user, now).await,
            Err(InvitationError::AlreadySetUp)
        ));
    }

    #[tokio::test]
    async fn test_reissue_loses_race_with_accept() {
        let store = MemoryUserStore::new();
        let mailer = CapturingMailer::default();
        let now = Utc::now();
        let settings = settings();

        issue(&store, &mailer, &settings, jane(), now).await.unwrap();
        let token = mailer.last_token();
        let stale = store.find_by_invitation_token(&token).await.unwrap().unwrap();

        accept(&store, &token, "s3cret!", &settings.password_policy, now)
            .await
            .unwrap();

        assert!(matches!(
            reissue(&store, &mailer, &settings, &stale, now).await,
            Err(InvitationError::AlreadySetUp)
        ));
    }
}
