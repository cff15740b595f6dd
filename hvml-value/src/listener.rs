use std::rc::Rc;

use crate::container::Change;

/// A post-mutation callback. Dispatch is synchronous, on the mutating
/// coroutine, in registration order (§5 Ordering guarantees).
pub type Listener = Rc<dyn Fn(&Change)>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

/// The list of post-mutation listeners attached to one container value.
///
/// A plain `Vec` rather than `hvml_store::Slab`: containers rarely carry
/// more than a handful of listeners (typically one observer's revoke hook
/// plus, for `$TIMERS`, the per-object interval/active mapping) so linear
/// scan-on-revoke is cheaper than arena bookkeeping.
#[derive(Default)]
pub struct ListenerList {
    next_id: u64,
    entries: Vec<(ListenerHandle, Listener)>,
}

impl ListenerList {
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, listener: Listener) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push((handle, listener));
        handle
    }

    pub fn revoke(&mut self, handle: ListenerHandle) {
        self.entries.retain(|(h, _)| *h != handle);
    }

    /// Fire every registered listener with `change`. A listener panicking
    /// or otherwise misbehaving does not stop later listeners from running
    /// and never rolls back the mutation that already happened (§4.A:
    /// "apply, then fire listeners; listener exceptions do not unwind the
    /// mutation").
    pub fn fire(&self, change: &Change) {
        for (_, listener) in &self.entries {
            listener(change);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
