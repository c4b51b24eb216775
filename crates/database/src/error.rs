use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A foreign-key or uniqueness rule of the schema rejected the write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl DbError {
    /// Maps key violations reported by the server to `ConstraintViolation`,
    /// leaving every other error as a query failure.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() || db_err.is_unique_violation() {
                return DbError::ConstraintViolation(db_err.message().to_string());
            }
        }
        DbError::QueryError(err)
    }
}
