//! Error types for the store crate.

/// Errors that can occur while talking to MySQL.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A query expected exactly one row and found none.
    #[error("row not found")]
    NotFound,

    /// An INSERT or UPDATE hit a unique index (MySQL 1062).
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// A write or delete broke a foreign key (MySQL 1451 / 1452).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// An UPDATE or DELETE was issued without any criteria.
    #[error("refusing to {0} without criteria")]
    Unscoped(&'static str),

    /// A configured identifier is not safe to splice into SQL.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Any other driver or server error.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_owned())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::ForeignKey(db.message().to_owned())
            }
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    /// `true` for errors the caller should report as a conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Duplicate(_) | StoreError::ForeignKey(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn pool_timeout_stays_a_database_error() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn conflicts_are_flagged() {
        assert!(StoreError::Duplicate("k".to_owned()).is_conflict());
        assert!(StoreError::ForeignKey("fk".to_owned()).is_conflict());
    }
}
