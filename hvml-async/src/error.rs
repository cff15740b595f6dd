//! Error taxonomy for a failed fetch (§7 error-kind atoms, scoped to the
//! subset a transport can actually produce).

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("fetch timed out")]
    Timeout,
    #[error("server refused the request")]
    ServerRefused,
    #[error("transport error: {0}")]
    Transport(String),
}
