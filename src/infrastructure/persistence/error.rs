use sea_orm::{DbErr, SqlErr};
use std::error::Error;
use std::fmt;

/// Failure of the local mirror database
#[derive(Debug)]
pub enum DbError {
    /// A statement was rejected or failed mid-flight
    Query(DbErr),
    /// The database cannot be reached; the sync loops stop on this
    Unavailable(String),
    /// A stored row no longer maps onto a chain, entry or queue item
    CorruptRow(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Query(e) => write!(f, "Mirror query failed: {}", e),
            DbError::Unavailable(msg) => write!(f, "Mirror database unavailable: {}", msg),
            DbError::CorruptRow(msg) => write!(f, "Corrupt mirror row: {}", msg),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbError::Query(e) => Some(e),
            DbError::Unavailable(_) | DbError::CorruptRow(_) => None,
        }
    }
}

impl From<DbErr> for DbError {
    fn from(err: DbErr) -> Self {
        DbError::Query(err)
    }
}

/// A unique-key violation: the chain, entry, block or binding is already mirrored
pub fn is_duplicate_key(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_mirror() {
        let err = DbError::CorruptRow("status=paused".to_string());
        assert_eq!(err.to_string(), "Corrupt mirror row: status=paused");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_not_found_is_not_duplicate() {
        assert!(!is_duplicate_key(&DbErr::RecordNotFound("entry".to_string())));
    }
}
