//! The document-loader seam (§1 "the markup tokenizer/tree-builder is an
//! external collaborator"; parsing itself is a Non-goal). This module
//! supplies the seam a real parser plugs into ([`DocumentSource`]) plus a
//! minimal in-memory [`ElementTree`] ([`StaticTree`]) for tests and demos
//! that have no parser wired in at all.

use std::path::PathBuf;
use std::rc::Rc;

use hvml_expr::Expr;
use hvml_frame::{ElementId, ElementKind, ElementTree};
use hvml_scope::NodeId;

/// Where a document comes from. Handed to a [`DocumentSource`]; this crate
/// never reads a path or fetches a url itself, since doing so is the
/// parser's job, not the engine's.
pub enum DocumentInput {
    Buffer(String),
    Path(PathBuf),
    Url(String),
}

/// Turns a [`DocumentInput`] into a live [`ElementTree`]. A real tokenizer/
/// tree-builder implements this; nothing in this crate does.
pub trait DocumentSource {
    fn load(&self, input: DocumentInput) -> Rc<dyn ElementTree>;
}

struct StaticNode {
    kind: ElementKind,
    children: Vec<ElementId>,
    attrs: Vec<(Rc<str>, Expr)>,
    content: Option<Expr>,
}

/// A hand-built [`ElementTree`], for tests and demos that construct a
/// document programmatically instead of through a [`DocumentSource`].
pub struct StaticTree {
    nodes: Vec<StaticNode>,
    root: ElementId,
}

/// Builds a [`StaticTree`] node by node; each node's id is its insertion
/// index, so children must be added before the parent that references
/// them.
#[derive(Default)]
pub struct StaticTreeBuilder {
    nodes: Vec<StaticNode>,
}

impl StaticTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: ElementKind, children: Vec<ElementId>, attrs: Vec<(Rc<str>, Expr)>, content: Option<Expr>) -> ElementId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(StaticNode { kind, children, attrs, content });
        id
    }

    pub fn finish(self, root: ElementId) -> StaticTree {
        StaticTree { nodes: self.nodes, root }
    }
}

impl ElementTree for StaticTree {
    fn root(&self) -> ElementId {
        self.root
    }

    fn kind_of(&self, id: ElementId) -> ElementKind {
        self.nodes[id.0 as usize].kind
    }

    fn children(&self, id: ElementId) -> &[ElementId] {
        &self.nodes[id.0 as usize].children
    }

    fn attr_exprs(&self, id: ElementId) -> &[(Rc<str>, Expr)] {
        &self.nodes[id.0 as usize].attrs
    }

    fn content_expr(&self, id: ElementId) -> Option<&Expr> {
        self.nodes[id.0 as usize].content.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_single_document_node_is_its_own_root() {
        // The root element itself always carries a real element kind
        // (§4.E "the initial frame's vtable is the *document* vtable";
        // `ElementKind::Document` names that synthetic frame, never an
        // actual element in the tree, or `root()` would re-enter itself).
        let mut builder = StaticTreeBuilder::new();
        let root = builder.add_node(ElementKind::Generic, Vec::new(), Vec::new(), None);
        let tree = builder.finish(root);

        assert_eq!(tree.root(), root);
        assert_eq!(tree.kind_of(root), ElementKind::Generic);
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn children_are_reachable_from_their_parent() {
        let mut builder = StaticTreeBuilder::new();
        let leaf = builder.add_node(ElementKind::Generic, Vec::new(), Vec::new(), None);
        let root = builder.add_node(ElementKind::Generic, vec![leaf], Vec::new(), None);
        let tree = builder.finish(root);

        assert_eq!(tree.children(root), &[leaf]);
    }
}
