//! `<match>` (§4.E "Element-kind vtables" worked example; supplemented
//! from PurC's `ctxt_for_match`/`post_process` in `match.c`).
//!
//! `after_pushed` evaluates the `for` attribute and tests it against the
//! frame's current `?` symbol variable (the frame-local "preceding
//! evaluation result" — the closest Rust-side analogue to PurC reading
//! `frame->symbol_vars[PURC_SYMBOL_VAR_QUESTION_MARK]`). `select_child`
//! only descends into children when that test matched. `on_popping`
//! propagates a matched marker to the parent's `result_from_child` when
//! the element carries an `exclusively` (or its `excl` alias) attribute,
//! so an enclosing `test`/`choose`-like construct can see that one of its
//! branches already fired.

use hvml_value::Value;

use crate::symbol::SymbolSlot;
use crate::{ElementCtxt, ElementId, ElementOps, ElementTree, Frame};

#[derive(Debug, Default)]
pub struct MatchCtxt {
    matched: bool,
}

pub struct MatchOps;

impl MatchOps {
    fn is_exclusively(frame: &Frame) -> bool {
        frame.attr("exclusively").is_some() || frame.attr("excl").is_some()
    }
}

impl ElementOps for MatchOps {
    fn after_pushed(&self, frame: &mut Frame, _tree: &dyn ElementTree) -> Option<ElementCtxt> {
        let matched = match frame.attr("for") {
            Some(for_value) => for_value == frame.symbols.get(SymbolSlot::Question),
            // No `for` attribute: an unconditional `match`, always enters.
            None => true,
        };
        Some(ElementCtxt::Match(MatchCtxt { matched }))
    }

    fn select_child(&self, frame: &mut Frame, ctxt: &mut ElementCtxt, tree: &dyn ElementTree) -> Option<ElementId> {
        let matched = ctxt.as_match().expect("match frame always carries a MatchCtxt").matched;
        if !matched {
            return None;
        }
        let children = tree.children(frame.element);
        let next = children.get(frame.child_cursor).copied();
        if next.is_some() {
            frame.child_cursor += 1;
        }
        next
    }

    fn on_popping(&self, frame: &mut Frame, ctxt: &mut ElementCtxt) -> bool {
        let matched = ctxt.as_match().expect("match frame always carries a MatchCtxt").matched;
        if matched && Self::is_exclusively(frame) {
            frame.result_from_child = Some(Value::Bool(true));
        }
        true
    }
}
