/// Error taxonomy for the scheduler/coroutine layer (§7). Distinct from
/// `hvml_value::Error`/`hvml_expr::Error`: those report on the *data* a
/// step operates on, this reports on the *scheduling* machinery around it.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("unknown coroutine")]
    UnknownCoroutine,
    #[error("unknown request")]
    UnknownRequest,
    #[error("coroutine has no ready frame")]
    NotReady,
    #[error("request {0:?} cannot be cancelled from its current state")]
    NotCancellable(crate::request::RequestState),
    #[error(transparent)]
    Expr(#[from] hvml_expr::Error),
    #[error(transparent)]
    Value(#[from] hvml_value::Error),
}
