//! The coroutine-owned exception slot (§3 "exception record `{errcode,
//! error_except_atom, exinfo_value, backtrace}`", §7).
//!
//! The source relies on an implicit per-thread error slot that the
//! scheduler snapshots after each step. Per the Design Notes in
//! `SPEC_FULL.md` (carried from `spec.md` §9), this workspace has no
//! thread-local at all: every fallible operation below the coroutine
//! boundary already returns an explicit `Result`, so "snapshotting the
//! thread-local" becomes "the scheduler copies the `Err` it just got into
//! `Coroutine::exception`". The slot itself still exists, because §7
//! requires asynchronous surfacing: a `silently` frame swallows the
//! user-visible error but the coroutine's exception must still be set for
//! diagnostic dump, and an uncleared exception at document end is
//! surfaced to `on_terminated`.

use std::rc::Rc;

use hvml_value::Value;

/// §7's error-kind taxonomy (not exhaustive; "a broader 'exception'
/// taxonomy surfaced to user code, atoms namespaced by bucket").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrCode {
    Oom,
    BadArg,
    InvalidValue,
    NotExists,
    NotAllowed,
    NotImplemented,
    NotSupported,
    ServerRefused,
}

impl From<&hvml_value::Error> for ErrCode {
    fn from(err: &hvml_value::Error) -> Self {
        use hvml_value::Error::*;
        match err {
            Oom => ErrCode::Oom,
            BadArg => ErrCode::BadArg,
            InvalidValue => ErrCode::InvalidValue,
            NotExists => ErrCode::NotExists,
            NotAllowed => ErrCode::NotAllowed,
            NotImplemented => ErrCode::NotImplemented,
            NotSupported => ErrCode::NotSupported,
        }
    }
}

impl From<&hvml_expr::Error> for ErrCode {
    fn from(err: &hvml_expr::Error) -> Self {
        use hvml_expr::Error::*;
        match err {
            NotExists(_) => ErrCode::NotExists,
            BadArg => ErrCode::BadArg,
            InvalidValue => ErrCode::InvalidValue,
            NotImplemented(_) => ErrCode::NotImplemented,
            Value(inner) => ErrCode::from(inner),
        }
    }
}

/// One coroutine's exception slot (§3/§7). `exinfo` is reference-counted
/// rather than deep-copied when it travels between the thread-local-style
/// snapshot and the coroutine — the only payload users attach here is a
/// `Value`, already `Rc`-shared by construction (§3 Supplemented features,
/// `exception_copy`).
#[derive(Debug, Clone)]
pub struct Exception {
    pub errcode: ErrCode,
    pub except_atom: Rc<str>,
    pub exinfo: Value,
    pub backtrace: Vec<String>,
}

impl Exception {
    pub fn new(errcode: ErrCode, except_atom: impl Into<Rc<str>>) -> Self {
        Self {
            errcode,
            except_atom: except_atom.into(),
            exinfo: Value::Undefined,
            backtrace: Vec::new(),
        }
    }

    pub fn with_info(mut self, exinfo: Value) -> Self {
        self.exinfo = exinfo;
        self
    }

    pub fn with_frame(mut self, description: impl Into<String>) -> Self {
        self.backtrace.push(description.into());
        self
    }
}

impl From<hvml_expr::Error> for Exception {
    fn from(err: hvml_expr::Error) -> Self {
        let errcode = ErrCode::from(&err);
        Exception::new(errcode, "EXPR_EVAL_ERROR").with_info(Value::make_str(err.to_string()))
    }
}

impl From<hvml_value::Error> for Exception {
    fn from(err: hvml_value::Error) -> Self {
        let errcode = ErrCode::from(&err);
        Exception::new(errcode, "VALUE_ERROR").with_info(Value::make_str(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expr_error_carries_its_message_as_exinfo() {
        let err = hvml_expr::Error::NotExists("x".into());
        let exception: Exception = err.into();
        assert_eq!(exception.errcode, ErrCode::NotExists);
        assert!(matches!(exception.exinfo, Value::Str(_)));
    }
}
