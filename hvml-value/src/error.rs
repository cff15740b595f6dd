/// Error taxonomy for value-substrate operations (§7).
///
/// Operations that cannot satisfy their contract return one of these rather
/// than setting a thread-local slot: the source's implicit per-thread error
/// channel is replaced by an explicit result everywhere below the
/// coroutine boundary, per the Design Notes in `spec.md` §9. The coroutine
/// layer (`hvml-coroutine`) is what snapshots a propagated `Error` into the
/// owning coroutine's exception slot for asynchronous surfacing.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("out of memory")]
    Oom,
    #[error("bad argument")]
    BadArg,
    #[error("invalid value")]
    InvalidValue,
    #[error("value does not exist")]
    NotExists,
    #[error("operation not allowed")]
    NotAllowed,
    #[error("operation not implemented")]
    NotImplemented,
    #[error("operation not supported")]
    NotSupported,
}
