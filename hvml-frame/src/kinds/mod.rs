//! Element-kind vtables (§4.E "Element-kind vtables"). `ElementKind` is the
//! sum-type replacement for PurC's per-element-type vtable struct; `lookup`
//! is the dispatch table.

pub mod document;
pub mod generic;
pub mod r#match;

use crate::{ElementKind, ElementOps};

/// Resolve an [`ElementKind`] to the [`ElementOps`] implementation that
/// drives it. A `'static` trait object is enough: every kind's handler is
/// stateless, all its state lives in the `Frame`/`ElementCtxt` the handler
/// is called with.
pub fn lookup(kind: ElementKind) -> &'static dyn ElementOps {
    match kind {
        ElementKind::Document => &document::DocumentOps,
        ElementKind::Match => &r#match::MatchOps,
        ElementKind::Generic => &generic::GenericOps,
    }
}
