use jetway_core::CoreError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        error!("Storage fault: {}", e);
        CoreError::StorageError(e.to_string())
    }
}

pub(crate) fn db(e: sqlx::Error) -> CoreError {
    StoreError::Database(e).into()
}

pub(crate) fn corrupt(table: &'static str, detail: String) -> CoreError {
    StoreError::CorruptRow { table, detail }.into()
}

/// True when `e` is a unique violation on the named constraint.
pub(crate) fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint),
        _ => false,
    }
}
