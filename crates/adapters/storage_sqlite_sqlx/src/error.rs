//! Storage-specific error type wrapping sqlx errors.

use powerhub_domain::error::PowerHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize a value into a JSON column.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for PowerHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Wrap a column decoding failure the way sqlx reports its own.
pub(crate) fn decode<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

/// Parse an RFC 3339 column into a UTC timestamp.
pub(crate) fn parse_timestamp(
    value: &str,
) -> Result<powerhub_domain::time::Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(decode)
}
