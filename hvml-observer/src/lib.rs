//! Component G: the observer and message bus (§3 "Observer", §4.G).
//!
//! Registration partitions observers into one of three lists on the owning
//! coroutine by the observed value's kind — dynamic, native, or everything
//! else — purely so `dispatch` only has to scan the relevant list instead
//! of every observer the coroutine holds.

mod pattern;

use std::rc::Rc;

use hvml_frame::ElementId;
use hvml_value::Value;

pub use pattern::SubTypePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverHandle(u64);

/// §3 "Observer": `{observed_value, message_type_atom, sub_type_pattern,
/// scope, position_in_element_tree, dom_anchor, on_revoke_callback}`.
pub struct Observer {
    pub observed: Value,
    pub type_atom: Rc<str>,
    pub sub_type: SubTypePattern,
    pub scope: ElementId,
    pub position: ElementId,
    pub dom_anchor: Option<ElementId>,
    pub on_revoke: Option<Rc<dyn Fn()>>,
}

/// A dispatched message, packaged by the caller and matched against every
/// registered [`Observer`] (§4.G `dispatch`).
pub struct Message {
    pub source: Value,
    pub type_atom: Rc<str>,
    pub sub_type: Rc<str>,
    pub extra: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Dynamic,
    Native,
    Common,
}

fn kind_of(value: &Value) -> Kind {
    match value {
        Value::Dynamic(_) => Kind::Dynamic,
        Value::Native(_) => Kind::Native,
        _ => Kind::Common,
    }
}

/// Where a new observer pushes a frame, once it matches a dispatched
/// message (§4.G "pushes a new frame onto the coroutine whose vtable,
/// scope, position, and DOM anchor come from the observer record"). The
/// coroutine owns the frame stack, so `dispatch` only returns the recipe;
/// `hvml-coroutine` does the pushing.
pub struct MatchedObserver<'a> {
    pub handle: ObserverHandle,
    pub observer: &'a Observer,
}

/// The per-coroutine partitioned observer storage (§4.G).
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    dynamic: Vec<(ObserverHandle, Observer)>,
    native: Vec<(ObserverHandle, Observer)>,
    common: Vec<(ObserverHandle, Observer)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_for(&mut self, kind: Kind) -> &mut Vec<(ObserverHandle, Observer)> {
        match kind {
            Kind::Dynamic => &mut self.dynamic,
            Kind::Native => &mut self.native,
            Kind::Common => &mut self.common,
        }
    }

    /// `register` (§4.G): files the observer by the observed value's kind
    /// and hands back a handle for later `revoke`. Callers are responsible
    /// for incrementing the coroutine's `waits` counter — this registry
    /// only owns storage and matching, not the coroutine's liveness state.
    pub fn register(&mut self, observer: Observer) -> ObserverHandle {
        let handle = ObserverHandle(self.next_id);
        self.next_id += 1;
        let kind = kind_of(&observer.observed);
        self.list_for(kind).push((handle, observer));
        handle
    }

    /// Revokes an observer, invoking its `on_revoke` callback if present.
    /// Returns the removed observer so callers (e.g. for a native observed
    /// value) can additionally fire `on_forget`.
    pub fn revoke(&mut self, handle: ObserverHandle) -> Option<Observer> {
        for list in [&mut self.dynamic, &mut self.native, &mut self.common] {
            if let Some(pos) = list.iter().position(|(h, _)| *h == handle) {
                let (_, observer) = list.remove(pos);
                if let Some(on_revoke) = &observer.on_revoke {
                    on_revoke();
                }
                return Some(observer);
            }
        }
        None
    }

    /// Revoke every observer, in reverse registration order (§3 "Observers
    /// die on ... coroutine teardown (reverse order)").
    pub fn revoke_all(&mut self) -> Vec<Observer> {
        let mut all: Vec<(ObserverHandle, Observer)> =
            self.common.drain(..).chain(self.dynamic.drain(..)).chain(self.native.drain(..)).collect();
        all.sort_by_key(|(handle, _)| std::cmp::Reverse(handle.0));
        all.into_iter()
            .map(|(_, observer)| {
                if let Some(on_revoke) = &observer.on_revoke {
                    on_revoke();
                }
                observer
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dynamic.is_empty() && self.native.is_empty() && self.common.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dynamic.len() + self.native.len() + self.common.len()
    }

    /// `dispatch` (§4.G): matches `(observed == source) && (type_atom ==
    /// msg.type_atom) && (sub_type_pattern matches msg.sub_type)` against
    /// the list selected by `message.source`'s kind.
    pub fn dispatch(&self, message: &Message) -> Vec<MatchedObserver<'_>> {
        let list = match kind_of(&message.source) {
            Kind::Dynamic => &self.dynamic,
            Kind::Native => &self.native,
            Kind::Common => &self.common,
        };
        list.iter()
            .filter(|(_, observer)| {
                observer.observed.is_same_instance(&message.source)
                    && *observer.type_atom == *message.type_atom
                    && observer.sub_type.matches(&message.sub_type)
            })
            .map(|(handle, observer)| MatchedObserver { handle: *handle, observer })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use hvml_frame::ElementId;

    use super::*;

    fn observer(observed: Value, type_atom: &str, sub_type: SubTypePattern) -> Observer {
        Observer {
            observed,
            type_atom: type_atom.into(),
            sub_type,
            scope: ElementId(0),
            position: ElementId(0),
            dom_anchor: None,
            on_revoke: None,
        }
    }

    #[test]
    fn dispatch_matches_same_instance_type_and_subtype() {
        let target = Value::make_object();
        let mut registry = ObserverRegistry::new();
        registry.register(observer(target.clone(), "change", SubTypePattern::Exact("value".into())));

        let matches = registry.dispatch(&Message {
            source: target.clone(),
            type_atom: "change".into(),
            sub_type: "value".into(),
            extra: Value::Undefined,
        });
        assert_eq!(matches.len(), 1);

        let no_match = registry.dispatch(&Message {
            source: target,
            type_atom: "change".into(),
            sub_type: "other".into(),
            extra: Value::Undefined,
        });
        assert!(no_match.is_empty());
    }

    #[test]
    fn revoke_all_runs_callbacks_and_empties_registry() {
        use std::cell::Cell;
        use std::rc::Rc as StdRc;

        let called = StdRc::new(Cell::new(false));
        let called2 = called.clone();
        let mut registry = ObserverRegistry::new();
        let mut obs = observer(Value::make_object(), "grow", SubTypePattern::Any);
        obs.on_revoke = Some(std::rc::Rc::new(move || called2.set(true)));
        registry.register(obs);

        registry.revoke_all();
        assert!(registry.is_empty());
        assert!(called.get());
    }
}
