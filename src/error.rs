//! Error handler for tribune.

use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a manager operation can surface to its caller.
///
/// All variants are recoverable and scoped to one call; raw storage
/// errors only pass through as [`Error::Sql`] when they carry no better
/// meaning (uniqueness violations become [`Error::Conflict`]).
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("password does not match the stored hash")]
    WrongPassword,

    #[error("user not found")]
    UserNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("post not found")]
    PostNotFound,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} is already taken")]
    Conflict(&'static str),

    #[error("SQL request failed: {0}")]
    Sql(#[source] SqlxError),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),
}

impl From<SqlxError> for Error {
    fn from(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return Error::Conflict("username or email");
            }
        }

        Error::Sql(err)
    }
}

impl Error {
    /// Whether this error came from rejected input rather than state.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
