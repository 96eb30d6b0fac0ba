use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE / NOT NULL / FOREIGN KEY constraint was violated at commit
    /// time. Distinguished so callers can treat duplicate usernames or
    /// emails as a client error rather than a system failure.
    #[error("integrity error: {0}")]
    Integrity(rusqlite::Error),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::Integrity(e)
            }
            _ => DbError::Sqlite(e),
        }
    }
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, DbError::Integrity(_))
    }
}
