/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use keystone_api::{app::{build_router, AppState}, config::Config};
/// use keystone_shared::{mail::LogMailer, store::PgUserStore};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgUserStore::new(pool)), Arc::new(LogMailer), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::security_headers},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use keystone_shared::{invitation::InvitationSettings, mail::Mailer, store::UserStore};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// User persistence
    pub store: Arc<dyn UserStore>,

    /// Invitation email transport
    pub mailer: Arc<dyn Mailer>,

    /// Application configuration
    pub config: Arc<Config>,

    invitations: Arc<InvitationSettings>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let invitations = Arc::new(config.invitation_settings());
        Self {
            store,
            mailer,
            config: Arc::new(config),
            invitations,
        }
    }

    /// Overrides the invitation settings derived from the config
    pub fn with_invitation_settings(mut self, settings: InvitationSettings) -> Self {
        self.invitations = Arc::new(settings);
        self
    }

    pub fn invitation_settings(&self) -> &InvitationSettings {
        &self.invitations
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── POST /auth/login
///     └── /invitations/
///         ├── GET  /verify?token=     (public)
///         ├── POST /accept            (public)
///         ├── POST /                  (bearer)
///         └── POST /:id/resend        (bearer)
/// ```
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new().route("/login", post(routes::auth::login));

    let public_invitation_routes = Router::new()
        .route("/verify", get(routes::invitations::verify))
        .route("/accept", post(routes::invitations::accept));

    let staff_invitation_routes = Router::new()
        .route("/", post(routes::invitations::issue))
        .route("/:id/resend", post(routes::invitations::resend))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest(
            "/invitations",
            public_invitation_routes.merge(staff_invitation_routes),
        );

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(from_fn_with_state(
            state.config.api.production,
            security_headers,
        ))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
