//! The fallback element kind: a plain container with no control-flow of
//! its own, just "enter every child in document order" (§4.E's general
//! case, as opposed to `match`'s conditional descent).

use crate::{ElementCtxt, ElementOps, ElementTree, Frame};

#[derive(Debug, Default)]
pub struct GenericCtxt;

pub struct GenericOps;

impl ElementOps for GenericOps {
    fn after_pushed(&self, _frame: &mut Frame, _tree: &dyn ElementTree) -> Option<ElementCtxt> {
        Some(ElementCtxt::Generic(GenericCtxt))
    }

    fn select_child(&self, frame: &mut Frame, _ctxt: &mut ElementCtxt, tree: &dyn ElementTree) -> Option<crate::ElementId> {
        let children = tree.children(frame.element);
        let next = children.get(frame.child_cursor).copied();
        if next.is_some() {
            frame.child_cursor += 1;
        }
        next
    }
}
