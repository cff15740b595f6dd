use std::error::Error as StdError;
use std::fmt::{self, Display};

pub type Result<T> = std::result::Result<T, Error>;

/// Aggregates every component crate's own `Error` into one type for
/// callers of [`crate::Instance`] (§1 "the top `hvml` crate aggregates
/// these into one hand-written `Error` enum"). Hand-written rather than
/// `thiserror`-derived because every variant here just wraps another
/// crate's already-descriptive error.
#[derive(Debug)]
pub enum Error {
    Value(hvml_value::Error),
    Expr(hvml_expr::Error),
    Coroutine(hvml_coroutine::Error),
    Async(hvml_async::Error),
    /// A document id that this instance never spawned, or already tore down.
    UnknownDocument,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Value(err) => write!(f, "{err}"),
            Error::Expr(err) => write!(f, "{err}"),
            Error::Coroutine(err) => write!(f, "{err}"),
            Error::Async(err) => write!(f, "{err}"),
            Error::UnknownDocument => write!(f, "unknown document"),
        }
    }
}

impl StdError for Error {}

impl From<hvml_value::Error> for Error {
    fn from(err: hvml_value::Error) -> Self {
        Self::Value(err)
    }
}

impl From<hvml_expr::Error> for Error {
    fn from(err: hvml_expr::Error) -> Self {
        Self::Expr(err)
    }
}

impl From<hvml_coroutine::Error> for Error {
    fn from(err: hvml_coroutine::Error) -> Self {
        Self::Coroutine(err)
    }
}

impl From<hvml_async::Error> for Error {
    fn from(err: hvml_async::Error) -> Self {
        Self::Async(err)
    }
}
