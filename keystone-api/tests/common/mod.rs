//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory user store and a capturing
//! mailer, with an admin, a manager and a plain user already seeded. Requests
//! go through `tower::ServiceExt::oneshot`, so no socket or database is
//! needed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use keystone_api::app::{build_router, AppState};
use keystone_api::config::{
    ApiConfig, Config, DatabaseConfig, InvitationConfig, JwtConfig, LogFormat, MailConfig,
};
use keystone_shared::auth::jwt::{create_token, Claims};
use keystone_shared::auth::password::{hash_password, PasswordPolicy};
use keystone_shared::invitation::InvitationSettings;
use keystone_shared::mail::{InvitationEmail, MailError, Mailer};
use keystone_shared::models::user::{User, UserRole};
use keystone_shared::store::MemoryUserStore;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const STAFF_PASSWORD: &str = "staff-password";

/// Mailer that keeps every message, optionally failing instead
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<InvitationEmail>>,
    pub fail: Mutex<bool>,
}

impl CapturingMailer {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Token carried by the most recent setup link
    pub fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let link = &sent.last().expect("no invitation was sent").link;
        link.split("token=").nth(1).unwrap().to_string()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError> {
        if *self.fail.lock().unwrap() {
            return Err(MailError::Rejected(503));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryUserStore>,
    pub mailer: Arc<CapturingMailer>,
    pub admin: User,
    pub manager: User,
    pub member: User,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        invitations: InvitationConfig {
            app_base_url: "https://app.example.com".to_string(),
            ttl_hours: 168,
        },
        mail: MailConfig::default(),
        log_format: LogFormat::Pretty,
    }
}

pub fn fast_policy() -> PasswordPolicy {
    PasswordPolicy {
        memory_kib: 1024,
        iterations: 1,
        lanes: 1,
    }
}

/// A record in any state, with sensible defaults for the rest
pub fn user_fixture(email: &str, role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: None,
        first_name: None,
        last_name: None,
        role,
        invitation_token: None,
        token_expiry: None,
        is_email_verified: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// An active account with [`STAFF_PASSWORD`]
pub fn active_user(email: &str, role: UserRole) -> User {
    User {
        password_hash: Some(hash_password(STAFF_PASSWORD, &fast_policy()).unwrap()),
        is_email_verified: true,
        ..user_fixture(email, role)
    }
}

/// A pending invitation with a known token
pub fn pending_user(
    email: &str,
    first: Option<&str>,
    last: Option<&str>,
    role: UserRole,
    token: &str,
    expiry: DateTime<Utc>,
) -> User {
    User {
        first_name: first.map(String::from),
        last_name: last.map(String::from),
        invitation_token: Some(token.to_string()),
        token_expiry: Some(expiry),
        ..user_fixture(email, role)
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryUserStore::new());
        let mailer = Arc::new(CapturingMailer::default());

        let admin = active_user("admin@example.com", UserRole::Admin);
        let manager = active_user("manager@example.com", UserRole::Manager);
        let member = active_user("member@example.com", UserRole::User);
        for user in [&admin, &manager, &member] {
            store.insert(user.clone()).await.unwrap();
        }

        let settings = InvitationSettings {
            ttl: Duration::hours(168),
            app_base_url: "https://app.example.com".to_string(),
            password_policy: fast_policy(),
        };
        let state = AppState::new(store.clone(), mailer.clone(), test_config())
            .with_invitation_settings(settings);

        Self {
            app: build_router(state),
            store,
            mailer,
            admin,
            manager,
            member,
        }
    }

    pub fn token_for(&self, user: &User) -> String {
        create_token(&Claims::new(user.id, user.role), JWT_SECRET).unwrap()
    }

    /// Sends a request and returns the status and parsed JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None, Some(body)).await
    }
}
