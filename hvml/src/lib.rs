//! The top-level interpreter crate: document loader glue, the public
//! [`Instance`] API, and error aggregation over the ten component crates
//! (§0 "one crate per component tied together by a thin top-level crate").
//!
//! Nothing in this crate implements a spec component directly; it only
//! wires `hvml-coroutine`'s [`hvml_coroutine::Heap`] together with a
//! [`Config`] and an optional async fetch transport, and supplies
//! [`loader::StaticTree`] as a document fixture for callers with no real
//! parser wired in yet.

mod config;
mod error;
mod instance;
pub mod loader;

pub use config::Config;
pub use error::{Error, Result};
pub use instance::Instance;

pub use hvml_async::{FetchClient, FetchResponse, FetchSpec};
pub use hvml_coroutine::{CoroutineId, DrainSummary, RequestId};
pub use hvml_dom::{DomEffects, DomId, DomTree, RendererConnection, RendererReply, RendererRequest};
pub use hvml_frame::{ElementId, ElementKind, ElementTree};
pub use hvml_observer::{Message, Observer, SubTypePattern};
pub use hvml_value::Value;

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use hvml_dom::{DomId, RendererReply, RendererRequest};
    use hvml_frame::ElementKind;

    use super::*;
    use crate::loader::StaticTreeBuilder;

    #[derive(Default)]
    struct NullDom;

    impl DomTree for NullDom {
        fn append_child(&mut self, _parent: DomId, _tag: &str) -> DomId {
            DomId(0)
        }
        fn append_text(&mut self, _parent: DomId, _text: &str) -> DomId {
            DomId(0)
        }
        fn set_text(&mut self, _node: DomId, _text: &str) {}
        fn get_attribute(&self, _node: DomId, _name: &str) -> Option<String> {
            None
        }
        fn set_attribute(&mut self, _node: DomId, _name: &str, _value: &str) {}
        fn remove_children(&mut self, _parent: DomId) {}
    }

    struct NullRenderer;

    impl RendererConnection for NullRenderer {
        fn send(&mut self, _request: RendererRequest) -> RendererReply {
            RendererReply::ok(0)
        }
    }

    #[test]
    fn an_empty_document_runs_to_completion_and_leaves_the_instance_empty() {
        let mut builder = StaticTreeBuilder::new();
        let root = builder.add_node(ElementKind::Generic, Vec::new(), Vec::new(), None);
        let tree = Rc::new(builder.finish(root));

        let mut instance: Instance<NullDom, NullRenderer> = Instance::new(Config::default());
        let id = instance.spawn_document(tree, NullDom::default(), |_| {});
        assert!(instance.is_running(id));

        let summary = instance.run();
        assert!(summary.should_stop());
        assert!(instance.is_empty());
        assert!(!instance.is_running(id));
    }

    #[test]
    fn a_capacity_hint_does_not_change_observable_behavior() {
        let config = Config { heap_capacity_hint: 4, ..Config::default() };
        let instance: Instance<NullDom, NullRenderer> = Instance::new(config);
        assert!(instance.is_empty());
    }

    #[test]
    fn debug_dump_reports_the_spawned_coroutine() {
        let mut builder = StaticTreeBuilder::new();
        let leaf = builder.add_node(ElementKind::Generic, Vec::new(), Vec::new(), None);
        let root = builder.add_node(ElementKind::Generic, vec![leaf], Vec::new(), None);
        let tree = Rc::new(builder.finish(root));

        let mut instance: Instance<NullDom, NullRenderer> = Instance::new(Config::default());
        instance.spawn_document(tree, NullDom::default(), |_| {});

        let dump = instance.debug_dump();
        assert!(dump.contains("coroutines: 1"));
    }
}
