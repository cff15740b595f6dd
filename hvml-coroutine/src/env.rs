//! [`CoroutineEnv`]: the `hvml_expr::Env` implementation the scheduler
//! builds for each evaluation (§4.B "Lookup rule: unqualified names search
//! the lexical ancestor chain from the current frame's `scope` upward,
//! then document-level bindings; qualified names (`$NAME.path`) bind the
//! root only").
//!
//! `hvml-expr` only needs an `Env`; it has no notion of frame stacks or
//! scope arenas. This is the seam where those pieces (`hvml-scope`,
//! `hvml-frame`) meet the evaluator, same role `hvml-frame`'s own module
//! doc describes for itself one layer down.

use std::rc::Rc;

use hvml_expr::{Env, Error as ExprError};
use hvml_frame::ElementId;
use hvml_scope::{DocumentBindings, ScopeArena};
use hvml_value::Value;

/// A named, already-arity-checked-by-convention function callable from
/// expressions (`$STR.concat(...)`-style calls resolve here once the
/// evaluator has already walked to the function name). Kept separate from
/// [`DocumentBindings`], which only ever holds values, not callables.
#[derive(Default)]
pub struct CallRegistry {
    functions: Vec<(Rc<str>, Rc<dyn Fn(&[Value]) -> Result<Value, ExprError>>)>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<Rc<str>>, f: impl Fn(&[Value]) -> Result<Value, ExprError> + 'static) {
        self.functions.push((name.into(), Rc::new(f)));
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExprError> {
        match self.functions.iter().find(|(n, _)| &**n == name) {
            Some((_, f)) => f(args),
            None => Err(ExprError::NotImplemented(name.to_string())),
        }
    }
}

/// One evaluation's view of the world: the live ancestor chain for the
/// frame doing the evaluating, the scope arena it is anchored in, the
/// document's bindings, and the function registry. Built fresh per
/// evaluation rather than stored on the coroutine, since the ancestor
/// chain changes every frame push/pop (§4.B).
pub struct CoroutineEnv<'a> {
    pub ancestors: Vec<ElementId>,
    pub scopes: &'a ScopeArena,
    pub document: &'a DocumentBindings,
    pub calls: &'a CallRegistry,
}

impl<'a> CoroutineEnv<'a> {
    pub fn new(ancestors: Vec<ElementId>, scopes: &'a ScopeArena, document: &'a DocumentBindings, calls: &'a CallRegistry) -> Self {
        Self {
            ancestors,
            scopes,
            document,
            calls,
        }
    }
}

impl Env for CoroutineEnv<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes.resolve(self.ancestors.iter().copied(), self.document, name).cloned()
    }

    /// Qualified names bind the root only: the ancestor walk is skipped and
    /// `name` resolves against document-level bindings directly (§4.B).
    fn lookup_root(&self, name: &str) -> Option<Value> {
        self.document.get(name).cloned()
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExprError> {
        self.calls.call(name, args)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unqualified_lookup_walks_ancestors_then_document() {
        let mut scopes = ScopeArena::new();
        scopes.create_if_absent(ElementId(2)).bind("x", Value::Int(2));
        let mut document = DocumentBindings::new();
        document.bind_builtin("SYSTEM", Value::make_str("sys"));
        let calls = CallRegistry::new();

        let env = CoroutineEnv::new(vec![ElementId(1), ElementId(2)], &scopes, &document, &calls);
        assert_eq!(env.lookup("x"), Some(Value::Int(2)));
        assert_eq!(env.lookup("SYSTEM"), Some(Value::make_str("sys")));
    }

    #[test]
    fn qualified_lookup_skips_ancestor_chain() {
        let mut scopes = ScopeArena::new();
        scopes.create_if_absent(ElementId(1)).bind("DOC", Value::Int(1));
        let mut document = DocumentBindings::new();
        document.bind_builtin("DOC", Value::make_str("doc-root"));
        let calls = CallRegistry::new();

        let env = CoroutineEnv::new(vec![ElementId(1)], &scopes, &document, &calls);
        assert_eq!(env.lookup_root("DOC"), Some(Value::make_str("doc-root")));
    }

    #[test]
    fn unregistered_call_is_not_implemented() {
        let scopes = ScopeArena::new();
        let document = DocumentBindings::new();
        let calls = CallRegistry::new();
        let env = CoroutineEnv::new(vec![], &scopes, &document, &calls);
        assert!(matches!(env.call("STR.concat", &[]), Err(ExprError::NotImplemented(_))));
    }
}
