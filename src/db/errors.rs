use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        table: Option<String>,
        /// Columns named by SQLite in the violation message, e.g. ["movie_id", "user_id"]
        columns: Vec<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Check constraint violation
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if db_err.is_unique_violation() {
                    let (table, columns) = parse_unique_violation(&message);
                    DbError::UniqueViolation { table, columns, message }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { message }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { message }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// SQLite does not report constraint names, only the offending columns:
/// "UNIQUE constraint failed: reviews.movie_id, reviews.user_id"
fn parse_unique_violation(message: &str) -> (Option<String>, Vec<String>) {
    let Some((_, detail)) = message.split_once("constraint failed:") else {
        return (None, Vec::new());
    };

    let mut table = None;
    let mut columns = Vec::new();
    for qualified in detail.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match qualified.split_once('.') {
            Some((t, column)) => {
                table.get_or_insert_with(|| t.to_string());
                columns.push(column.to_string());
            }
            None => columns.push(qualified.to_string()),
        }
    }
    (table, columns)
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
