use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The pool is created from the `[database]` settings and is meant to be
/// shared across the entire application.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    let database_url = settings.connection_url();
    if database_url.is_empty() {
        return Err(DbError::ConnectionConfigError(
            "database url must be set.".to_string(),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect(&database_url)
        .await?;

    tracing::info!(host = %settings.host, database = %settings.name, "Connected to database.");
    Ok(pool)
}

/// Applies the embedded migrations so the `course`, `person` and
/// `person_course` tables exist before the server starts.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied.");
    Ok(())
}
