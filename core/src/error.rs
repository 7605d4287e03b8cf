use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the nutrition core can report.
///
/// `Validation` and `NotFound` are expected outcomes that front ends turn into
/// field messages or notices. `ArithmeticDegenerate` means an invariant was
/// broken upstream (a plan with a non-positive goal reached aggregation).
#[derive(Debug, Error)]
pub enum Error {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Cannot compute {0}")]
    ArithmeticDegenerate(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Sample data error: {0}")]
    Data(#[from] csv::Error),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Map an empty `query_row` result to [`Error::NotFound`].
pub(crate) trait OptionalRow<T> {
    fn or_not_found(self, what: impl FnOnce() -> String) -> Result<T>;
}

impl<T> OptionalRow<T> for rusqlite::Result<T> {
    fn or_not_found(self, what: impl FnOnce() -> String) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::NotFound(what())),
            Err(e) => Err(Error::Storage(e)),
        }
    }
}
