//! Component E: the stack frame machine (§3 "Frame", §4.E).
//!
//! A coroutine's execution state is a [`FrameStack`] of [`Frame`]s, one per
//! element-tree node currently being processed. Each step dispatches on the
//! bottom frame's [`NextStep`] and calls into that frame's [`ElementKind`]
//! quartet (`after_pushed` / `select_child` / `rerun` / `on_popping`).
//!
//! Per the REDESIGN FLAG, the scratch context that PurC stores as a
//! `void *` plus a destructor pointer is a Rust sum type, [`ElementCtxt`],
//! with one variant per element kind; dropping a `Frame` drops its context
//! for free instead of needing an explicit release call.

mod ctxt;
pub mod kinds;
mod symbol;

use std::rc::Rc;

pub use ctxt::ElementCtxt;
pub use symbol::{SymbolSlot, SymbolVars};

use hvml_expr::Expr;
use hvml_scope::NodeId;
use hvml_store::Stack;
use hvml_value::Value;

/// Which element-tree node (by its opaque external identity) a frame's
/// cursor is anchored to.
pub type ElementId = NodeId;

/// The four-state machine driving a single frame (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    AfterPushed,
    SelectChild,
    Rerun,
    OnPopping,
}

/// Identifies which quartet of handlers governs a frame, resolved to an
/// [`ElementOps`] implementation by [`kinds::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// The synthetic root frame: seeds document bindings, enters the root
    /// element (§4.E "The initial frame's vtable is the document vtable").
    Document,
    /// `<match>`: conditional child selection (§4.E worked example).
    Match,
    /// A generic content/container element with no special control flow;
    /// the fallback kind for element names the interpreter doesn't treat
    /// specially.
    Generic,
}

/// The parsed element tree the frame machine walks. Parsing itself is out
/// of scope (a Non-goal); this trait is the seam a concrete tokenizer/tree
/// builder plugs into, analogous to the `WidgetTree`/blueprint the teacher
/// passes around its layout/eval functions.
pub trait ElementTree {
    /// The document's single root element, entered by the document frame's
    /// `after_pushed` (§4.E "enters the root element").
    fn root(&self) -> ElementId;
    fn kind_of(&self, id: ElementId) -> ElementKind;
    fn children(&self, id: ElementId) -> &[ElementId];

    /// This element's attribute expression trees, by name, in source order.
    /// Evaluating these against the frame's scope chain and writing the
    /// result into `Frame::attrs` is `hvml-coroutine`'s job (§4.E "a map of
    /// evaluated attribute values"; §4.B "Transitions may ... evaluate
    /// expressions against scoped variables"); the frame machine itself
    /// only ever reads already-evaluated attributes.
    fn attr_exprs(&self, id: ElementId) -> &[(Rc<str>, Expr)];

    /// This element's text-content expression, if it carries one.
    fn content_expr(&self, id: ElementId) -> Option<&Expr>;
}

/// The per-kind quartet of handlers (§4.E). Each method receives the
/// frame's own scratch context, the element tree, and the rest of the
/// stack so it can push new frames or read the parent's results.
pub trait ElementOps {
    /// One-shot entry hook. Returning `None` schedules an immediate pop.
    fn after_pushed(&self, frame: &mut Frame, tree: &dyn ElementTree) -> Option<ElementCtxt>;

    /// Cursor advance. `None` signals descent complete.
    fn select_child(&self, frame: &mut Frame, ctxt: &mut ElementCtxt, tree: &dyn ElementTree) -> Option<ElementId>;

    /// Optional reprocessing after a child subtree completes. Default: no-op.
    fn rerun(&self, frame: &mut Frame, ctxt: &mut ElementCtxt) -> bool {
        let _ = (frame, ctxt);
        true
    }

    /// Returning `false` requests a `Rerun` step instead of a pop.
    fn on_popping(&self, frame: &mut Frame, ctxt: &mut ElementCtxt) -> bool {
        let _ = (frame, ctxt);
        true
    }
}

/// A position in the element tree (§3 "Normal frame").
pub struct Frame {
    pub element: ElementId,
    pub kind: ElementKind,
    pub scope: ElementId,
    pub edom_element: Option<ElementId>,
    pub child_cursor: usize,
    pub silently: bool,
    pub ctxt: Option<ElementCtxt>,
    pub symbols: SymbolVars,
    pub attrs: Vec<(Rc<str>, Value)>,
    pub content: Option<Value>,
    pub result_from_child: Option<Value>,
    pub next_step: NextStep,
    /// Suppresses parent linkage; a pseudo frame has no child cursor and
    /// cannot resolve a parent via the stack (§3 "Pseudo frame").
    pub pseudo: bool,
}

impl Frame {
    pub fn normal(element: ElementId, kind: ElementKind, scope: ElementId, edom_element: Option<ElementId>) -> Self {
        Self {
            element,
            kind,
            scope,
            edom_element,
            child_cursor: 0,
            silently: false,
            ctxt: None,
            symbols: SymbolVars::defaults(edom_element),
            attrs: Vec::new(),
            content: None,
            result_from_child: None,
            next_step: NextStep::AfterPushed,
            pseudo: false,
        }
    }

    pub fn pseudo(element: ElementId, kind: ElementKind, scope: ElementId) -> Self {
        let mut frame = Self::normal(element, kind, scope, None);
        frame.pseudo = true;
        frame
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|(n, _)| &**n == name).map(|(_, v)| v)
    }

    pub fn set_attr(&mut self, name: Rc<str>, value: Value) {
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }
}

/// One coroutine's frame stack and the driver of its per-step state
/// machine (§4.E, points 1-4).
pub struct FrameStack {
    frames: Stack<Frame>,
}

/// What happened on one call to [`FrameStack::step`] (§4.E point 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The stack is non-empty; the coroutine is ready for another step.
    Ready,
    /// The stack became empty as a result of this step.
    Exhausted,
}

impl FrameStack {
    pub fn new() -> Self {
        Self { frames: Stack::empty() }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Borrow the bottom (currently executing) frame, if any.
    pub fn bottom(&self) -> Option<&Frame> {
        self.frames.iter().next_back()
    }

    pub fn bottom_mut(&mut self) -> Option<&mut Frame> {
        self.frames.iter_mut().next_back()
    }

    /// The scope-resolution ancestor chain for the current bottom frame,
    /// nearest ancestor first (§4.B "search the lexical ancestor chain from
    /// the current frame's `scope` upward"). Stops after the first pseudo
    /// frame encountered, since a pseudo frame "cannot resolve a parent via
    /// the stack" (§3 "Pseudo frame").
    pub fn scope_chain(&self) -> Vec<ElementId> {
        // `Stack::iter` only promises a forward `Iterator`, so collect first
        // rather than relying on `.rev()` being available on it.
        let frames: Vec<&Frame> = self.frames.iter().collect();
        let mut chain = Vec::new();
        for frame in frames.into_iter().rev() {
            chain.push(frame.scope);
            if frame.pseudo {
                break;
            }
        }
        chain
    }

    /// Execute exactly one step of the machine described in §4.E. A
    /// coroutine may only suspend between calls to this method, never
    /// inside it (§5 "Suspension points").
    pub fn step(&mut self, tree: &dyn ElementTree) -> StepOutcome {
        let Some(next_step) = self.bottom().map(|f| f.next_step) else {
            return StepOutcome::Exhausted;
        };

        match next_step {
            NextStep::AfterPushed => self.do_after_pushed(tree),
            NextStep::SelectChild => self.do_select_child(tree),
            NextStep::Rerun => self.do_rerun(),
            NextStep::OnPopping => self.do_on_popping(),
        }

        if self.frames.is_empty() {
            StepOutcome::Exhausted
        } else {
            StepOutcome::Ready
        }
    }

    fn do_after_pushed(&mut self, tree: &dyn ElementTree) {
        let kind = self.bottom().expect("step called on empty stack").kind;
        let ops = kinds::lookup(kind);
        let mut frame = self.frames.pop().expect("bottom exists");
        let ctxt = ops.after_pushed(&mut frame, tree);
        match ctxt {
            None => frame.next_step = NextStep::OnPopping,
            Some(ctxt) => {
                frame.ctxt = Some(ctxt);
                frame.next_step = NextStep::SelectChild;
            }
        }
        self.frames.push(frame);
    }

    fn do_select_child(&mut self, tree: &dyn ElementTree) {
        let kind = self.bottom().expect("step called on empty stack").kind;
        let ops = kinds::lookup(kind);
        let mut frame = self.frames.pop().expect("bottom exists");
        let mut ctxt = frame.ctxt.take().unwrap_or(ElementCtxt::None);
        let next_child = ops.select_child(&mut frame, &mut ctxt, tree);
        frame.ctxt = Some(ctxt);

        match next_child {
            None => frame.next_step = NextStep::OnPopping,
            Some(child) => {
                let child_kind = tree.kind_of(child);
                let mut child_frame = Frame::normal(child, child_kind, frame.element, frame.edom_element);
                // `?` carries the result of the immediately preceding
                // evaluation into the next child (§3 "Symbol variable",
                // mirroring `pcintr_set_question_var`); the previous
                // sibling's result landed in `result_from_child` when it
                // popped (`do_on_popping`), or this is the first child and
                // it stays `undefined`.
                let question = frame.result_from_child.clone().unwrap_or(Value::Undefined);
                child_frame.symbols.set(SymbolSlot::Question, question);
                self.frames.push(frame);
                self.frames.push(child_frame);
                return;
            }
        }
        self.frames.push(frame);
    }

    fn do_rerun(&mut self) {
        let kind = self.bottom().expect("step called on empty stack").kind;
        let ops = kinds::lookup(kind);
        let mut frame = self.frames.pop().expect("bottom exists");
        let mut ctxt = frame.ctxt.take().unwrap_or(ElementCtxt::None);
        ops.rerun(&mut frame, &mut ctxt);
        frame.ctxt = Some(ctxt);
        frame.next_step = NextStep::SelectChild;
        self.frames.push(frame);
    }

    fn do_on_popping(&mut self) {
        let kind = self.bottom().expect("step called on empty stack").kind;
        let ops = kinds::lookup(kind);
        let mut frame = self.frames.pop().expect("bottom exists");
        let mut ctxt = frame.ctxt.take().unwrap_or(ElementCtxt::None);
        let ready_to_pop = ops.on_popping(&mut frame, &mut ctxt);

        if !ready_to_pop {
            frame.ctxt = Some(ctxt);
            frame.next_step = NextStep::Rerun;
            self.frames.push(frame);
            return;
        }

        // frame is dropped here, taking its ElementCtxt with it; propagate
        // its result up to the new bottom, if any.
        let result = frame.result_from_child.take();
        if let Some(parent) = self.frames.iter_mut().next_back() {
            parent.result_from_child = result;
        }
    }
}

impl Default for FrameStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct EmptyTree;

    impl ElementTree for EmptyTree {
        fn root(&self) -> ElementId {
            ElementId(0)
        }

        fn kind_of(&self, _id: ElementId) -> ElementKind {
            ElementKind::Generic
        }

        fn children(&self, _id: ElementId) -> &[ElementId] {
            &[]
        }

        fn attr_exprs(&self, _id: ElementId) -> &[(Rc<str>, Expr)] {
            &[]
        }

        fn content_expr(&self, _id: ElementId) -> Option<&Expr> {
            None
        }
    }

    #[test]
    fn generic_frame_runs_to_exhaustion_with_no_children() {
        let tree = EmptyTree;
        let mut stack = FrameStack::new();
        stack.push(Frame::normal(ElementId(1), ElementKind::Generic, ElementId(0), None));

        let mut outcome = StepOutcome::Ready;
        for _ in 0..8 {
            outcome = stack.step(&tree);
            if outcome == StepOutcome::Exhausted {
                break;
            }
        }
        assert_eq!(outcome, StepOutcome::Exhausted);
    }

    struct ParentChildTree;

    impl ElementTree for ParentChildTree {
        fn root(&self) -> ElementId {
            ElementId(1)
        }

        fn kind_of(&self, _id: ElementId) -> ElementKind {
            ElementKind::Generic
        }

        fn children(&self, id: ElementId) -> &[ElementId] {
            if id == ElementId(1) { &[ElementId(2)] } else { &[] }
        }

        fn attr_exprs(&self, _id: ElementId) -> &[(Rc<str>, Expr)] {
            &[]
        }

        fn content_expr(&self, _id: ElementId) -> Option<&Expr> {
            None
        }
    }

    #[test]
    fn select_child_seeds_question_from_the_parents_result_from_child() {
        let tree = ParentChildTree;
        let mut stack = FrameStack::new();
        let mut root = Frame::normal(ElementId(1), ElementKind::Generic, ElementId(0), None);
        root.result_from_child = Some(Value::Int(7));
        stack.push(root);

        stack.step(&tree); // AfterPushed -> SelectChild
        stack.step(&tree); // SelectChild pushes the child, seeding its `?`

        let child = stack.bottom().expect("child frame was pushed");
        assert_eq!(child.symbols.get(SymbolSlot::Question), &Value::Int(7));
    }

    #[test]
    fn pseudo_frame_has_no_child_cursor() {
        let frame = Frame::pseudo(ElementId(1), ElementKind::Generic, ElementId(0));
        assert!(frame.pseudo);
        assert_eq!(frame.child_cursor, 0);
    }
}
