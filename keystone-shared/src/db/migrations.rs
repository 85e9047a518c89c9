/// Database migration runner
///
/// Migrations live in `keystone-shared/migrations/` and are embedded at
/// compile time with `sqlx::migrate!`. Each file is named
/// `{timestamp}_{name}.sql`.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies all pending migrations
///
/// Already-applied migrations are skipped; a failing migration aborts
/// startup with the returned error.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Applying database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}
