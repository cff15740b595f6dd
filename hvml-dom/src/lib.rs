//! Component J: the DOM effect layer (§4.J, §6 "Renderer protocol").
//!
//! The in-memory DOM and the markup tokenizer/tree-builder that populates
//! it are external collaborators (§1); [`DomTree`] is the seam a concrete
//! DOM library plugs into. Every wrapper operation here follows the same
//! rule the value substrate's container mutations do (§4.A "apply, then
//! fire listeners"): mutate the local DOM first, then mirror the change to
//! the renderer if one is connected, so a renderer round-trip failure never
//! leaves the local DOM and the renderer disagreeing about which happened
//! first.

mod attrops;
mod renderer;

pub use attrops::{AttrOp, apply_attr_op};
pub use renderer::{DEFAULT_TIMEOUT, REPLY_OK, RendererConnection, RendererOp, RendererReply, RendererRequest, TargetKind};

use hvml_value::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomId(pub u64);

/// The external DOM library's interface (§1 "the DOM library provides
/// mutable node trees"). Mutations here are synchronous and ordered
/// (§4.J).
pub trait DomTree {
    fn append_child(&mut self, parent: DomId, tag: &str) -> DomId;
    fn append_text(&mut self, parent: DomId, text: &str) -> DomId;
    fn set_text(&mut self, node: DomId, text: &str);
    fn get_attribute(&self, node: DomId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: DomId, name: &str, value: &str);
    fn remove_children(&mut self, parent: DomId);
}

/// Wraps a [`DomTree`] and an optional [`RendererConnection`] (§4.J
/// `append_element`, `append_content`, `displace_content`,
/// `set_attribute`, `add_child_chunk`, `set_child_chunk`).
pub struct DomEffects<D, R> {
    dom: D,
    renderer: Option<R>,
    target_kind: TargetKind,
    target_handle: u64,
}

impl<D: DomTree, R: RendererConnection> DomEffects<D, R> {
    pub fn new(dom: D) -> Self {
        Self {
            dom,
            renderer: None,
            target_kind: TargetKind::Window,
            target_handle: 0,
        }
    }

    /// Connect (or replace) the mirrored renderer target. Mutations made
    /// before this call are never retroactively mirrored, matching "all
    /// mutations are synchronous and ordered" (§4.J) rather than any kind
    /// of replay.
    pub fn connect_renderer(&mut self, renderer: R, target_kind: TargetKind, target_handle: u64) {
        self.renderer = Some(renderer);
        self.target_kind = target_kind;
        self.target_handle = target_handle;
    }

    pub fn disconnect_renderer(&mut self) -> Option<R> {
        self.renderer.take()
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn append_element(&mut self, parent: DomId, tag: &str) -> DomId {
        let child = self.dom.append_child(parent, tag);
        self.mirror(RendererOp::AppendChild, None, Some(Value::make_str(tag)));
        child
    }

    pub fn append_content(&mut self, parent: DomId, text: &str) -> DomId {
        let node = self.dom.append_text(parent, text);
        self.mirror(RendererOp::AppendContent, None, Some(Value::make_str(text)));
        node
    }

    pub fn displace_content(&mut self, node: DomId, text: &str) {
        self.dom.set_text(node, text);
        self.mirror(RendererOp::DisplaceContent, None, Some(Value::make_str(text)));
    }

    /// Read-modify-write an attribute through one of the tokenised
    /// operators (§6).
    pub fn set_attribute(&mut self, node: DomId, name: &str, op: AttrOp, operand: &str) {
        let current = self.dom.get_attribute(node, name).unwrap_or_default();
        let next = apply_attr_op(&current, op, operand);
        self.dom.set_attribute(node, name, &next);
        self.mirror(RendererOp::UpdateProperty, Some(name.to_string()), Some(Value::make_str(next)));
    }

    /// `add_child_chunk`: append a batch of children in one DOM pass,
    /// mirrored as a single `appendChild` (the renderer protocol carries
    /// one payload per request; the chunk is joined into that payload).
    pub fn add_child_chunk(&mut self, parent: DomId, chunk: &[&str]) -> Vec<DomId> {
        let ids = chunk.iter().map(|tag| self.dom.append_child(parent, tag)).collect();
        self.mirror(RendererOp::AppendChild, None, Some(Value::make_str(chunk.join(","))));
        ids
    }

    /// `set_child_chunk`: replace every child of `parent` with a fresh
    /// batch, mirrored as a single `displaceChild`.
    pub fn set_child_chunk(&mut self, parent: DomId, chunk: &[&str]) -> Vec<DomId> {
        self.dom.remove_children(parent);
        let ids = chunk.iter().map(|tag| self.dom.append_child(parent, tag)).collect();
        self.mirror(RendererOp::DisplaceChild, None, Some(Value::make_str(chunk.join(","))));
        ids
    }

    fn mirror(&mut self, op: RendererOp, selector: Option<String>, payload: Option<Value>) -> Option<RendererReply> {
        let renderer = self.renderer.as_mut()?;
        let request = RendererRequest {
            target_kind: self.target_kind,
            target_handle: self.target_handle,
            op,
            selector,
            payload,
        };
        Some(renderer.send(request))
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct FakeDom {
        next_id: u64,
        attrs: Vec<(DomId, String, String)>,
        children: Vec<(DomId, DomId)>,
    }

    impl DomTree for FakeDom {
        fn append_child(&mut self, parent: DomId, _tag: &str) -> DomId {
            let id = DomId(self.next_id);
            self.next_id += 1;
            self.children.push((parent, id));
            id
        }

        fn append_text(&mut self, parent: DomId, _text: &str) -> DomId {
            self.append_child(parent, "#text")
        }

        fn set_text(&mut self, _node: DomId, _text: &str) {}

        fn get_attribute(&self, node: DomId, name: &str) -> Option<String> {
            self.attrs
                .iter()
                .find(|(n, key, _)| *n == node && key == name)
                .map(|(_, _, value)| value.clone())
        }

        fn set_attribute(&mut self, node: DomId, name: &str, value: &str) {
            self.attrs.retain(|(n, key, _)| !(*n == node && key == name));
            self.attrs.push((node, name.to_string(), value.to_string()));
        }

        fn remove_children(&mut self, parent: DomId) {
            self.children.retain(|(p, _)| *p != parent);
        }
    }

    struct RecordingRenderer(Rc<RefCell<Vec<RendererOp>>>);

    impl RendererConnection for RecordingRenderer {
        fn send(&mut self, request: RendererRequest) -> RendererReply {
            self.0.borrow_mut().push(request.op);
            RendererReply::ok(1)
        }
    }

    #[test]
    fn mutations_mirror_in_order_once_connected() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut effects: DomEffects<FakeDom, RecordingRenderer> = DomEffects::new(FakeDom::default());
        effects.connect_renderer(RecordingRenderer(log.clone()), TargetKind::Window, 1);

        let root = DomId(0);
        let child = effects.append_element(root, "div");
        effects.append_content(child, "hello");
        effects.set_attribute(child, "class", AttrOp::TokenAdd, "active");

        assert_eq!(
            *log.borrow(),
            vec![RendererOp::AppendChild, RendererOp::AppendContent, RendererOp::UpdateProperty]
        );
    }

    #[test]
    fn no_renderer_means_no_mirroring_but_dom_still_mutates() {
        let mut effects: DomEffects<FakeDom, RecordingRenderer> = DomEffects::new(FakeDom::default());
        let root = DomId(0);
        let child = effects.append_element(root, "div");
        assert!(effects.dom().children.iter().any(|(p, c)| *p == root && *c == child));
    }

    #[test]
    fn token_add_attribute_reads_then_writes() {
        let mut effects: DomEffects<FakeDom, RecordingRenderer> = DomEffects::new(FakeDom::default());
        let node = DomId(0);
        effects.set_attribute(node, "class", AttrOp::Assign, "a");
        effects.set_attribute(node, "class", AttrOp::TokenAdd, "b");
        assert_eq!(effects.dom().get_attribute(node, "class").as_deref(), Some("a b"));
    }
}
