#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("no such variable: {0}")]
    NotExists(String),
    #[error("bad argument")]
    BadArg,
    #[error("invalid value")]
    InvalidValue,
    #[error("operation not implemented: {0}")]
    NotImplemented(String),
    #[error(transparent)]
    Value(#[from] hvml_value::Error),
}

impl Error {
    /// Recoverable errors are the ones `silently = true` downgrades to
    /// `undefined` (§4.B, §7); out-of-memory and similarly fatal failures
    /// are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Value(hvml_value::Error::Oom))
    }
}
