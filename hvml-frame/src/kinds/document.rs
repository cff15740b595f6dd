//! The synthetic document frame (§4.E "The initial frame's vtable is the
//! document vtable: `after_pushed` seeds document-wide bindings ... and
//! enters the root element").
//!
//! Seeding the actual document-wide bindings (§3's built-in namespaces) is
//! `hvml-scope`'s job; this handler only drives the one-shot transition
//! into the root element, since `hvml-frame` has no access to a coroutine's
//! `DocumentBindings` and shouldn't need one.

use crate::{ElementCtxt, ElementOps, ElementTree, Frame};

#[derive(Debug, Default)]
pub struct DocumentCtxt {
    entered_root: bool,
}

pub struct DocumentOps;

impl ElementOps for DocumentOps {
    fn after_pushed(&self, _frame: &mut Frame, _tree: &dyn ElementTree) -> Option<ElementCtxt> {
        Some(ElementCtxt::Document(DocumentCtxt::default()))
    }

    fn select_child(&self, _frame: &mut Frame, ctxt: &mut ElementCtxt, tree: &dyn ElementTree) -> Option<crate::ElementId> {
        let ctxt = ctxt.as_document().expect("document frame always carries a DocumentCtxt");
        if ctxt.entered_root {
            return None;
        }
        ctxt.entered_root = true;
        Some(tree.root())
    }
}
