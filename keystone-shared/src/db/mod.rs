/// Database layer for Keystone
///
/// - `pool`: PostgreSQL connection pool construction and health checks
/// - `migrations`: embedded schema migrations from `migrations/`
///
/// The pool is built once in `main` and handed to [`crate::store::PgUserStore`];
/// nothing in the crate holds a global connection.

pub mod migrations;
pub mod pool;
