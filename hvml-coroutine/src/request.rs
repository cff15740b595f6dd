//! The request record and its state machine (§3 "Request", §4.F
//! `post_request`/`activate`/`cancel`, §5 "Cancellation").
//!
//! A request tracks one tracked asynchronous operation — a `RAW` callback
//! with no frame binding, a `SYNC` fetch that must complete on the exact
//! frame that issued it, or an `ASYNC` fetch that only needs its owner
//! coroutine to still be alive. `Heap` owns the `Slab<Request>` and the
//! four queues (`pending`/`active`/`hibernating`/cancelled-then-dying);
//! this module only owns the record and the legal transitions between its
//! states, so the queue bookkeeping in `heap.rs` can lean on
//! `RequestState::transition_to` instead of re-deriving the state diagram.

use std::rc::Rc;

use hvml_value::Value;

use crate::error::Error;

/// `{type: RAW|SYNC|ASYNC, ...}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// No frame binding.
    Raw,
    /// Must complete on the exact frame that issued it.
    Sync,
    /// Must complete while the owner coroutine is alive.
    Async,
}

/// `PENDING → ACTIVATING → (HIBERNATING?) → done; PENDING/ACTIVATING →
/// CANCELLED → DYING` (§5). `Done` is the terminal success state; the slab
/// entry is reclaimed once the scheduler has delivered the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Activating,
    Hibernating,
    Cancelled,
    Dying,
    Done,
}

impl RequestState {
    /// Whether `cancel` has any effect from this state (§5 "Cancellation
    /// idempotence. `cancel` on a `CANCELLED`/`DYING` request is a no-op").
    pub fn is_cancellable(self) -> bool {
        matches!(self, RequestState::Pending | RequestState::Activating)
    }
}

/// `ops.callback`/`ops.cancel` (§3 `callbacks`). Kept as `Rc<dyn Fn>` rather
/// than a function pointer because closures capturing the issuing
/// coroutine/frame ids are the common case (mirrors `hvml-timer`'s
/// `Rc<dyn Fn()>` callback shape).
pub struct RequestOps {
    pub callback: Rc<dyn Fn(Value)>,
    pub cancel: Rc<dyn Fn()>,
}

impl std::fmt::Debug for RequestOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOps").finish_non_exhaustive()
    }
}

/// A coroutine id as seen from this crate. Defined here rather than
/// imported from `coroutine.rs` to keep this module's dependency direction
/// one-way (`coroutine.rs`/`heap.rs` depend on `request.rs`, not the other
/// way around).
pub type OwnerCoroutine = hvml_store::Key;

/// A request's identity within `Heap`'s `Slab<Request>` (§3 "Request").
pub type RequestId = hvml_store::Key;

#[derive(Debug)]
pub struct Request {
    pub request_type: RequestType,
    pub owner_coroutine: OwnerCoroutine,
    /// Only meaningful for `RequestType::Sync`: the frame that must be
    /// bottom-of-stack for the request to activate (§4.F `activate`).
    pub owner_frame: Option<hvml_frame::ElementId>,
    /// `ctxt` from `post_request(type, ctxt, ops)` (§4.F): the value handed
    /// back to `ops.callback` on activation.
    pub payload: Value,
    refcount: u32,
    state: RequestState,
    pub ops: RequestOps,
}

impl Request {
    pub fn new(
        request_type: RequestType,
        owner_coroutine: OwnerCoroutine,
        owner_frame: Option<hvml_frame::ElementId>,
        payload: Value,
        ops: RequestOps,
    ) -> Self {
        Self {
            request_type,
            owner_coroutine,
            owner_frame,
            payload,
            refcount: 1,
            state: RequestState::Pending,
            ops,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn retain(&mut self) {
        self.refcount += 1;
    }

    pub fn release(&mut self) -> u32 {
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount
    }

    /// `pending → active` (§4.F `activate`). For a `SYNC` request whose
    /// `owner_frame` is not the current bottom frame, the caller transfers
    /// to `Hibernating` instead of calling this.
    pub fn activate(&mut self) -> Result<(), Error> {
        if self.state != RequestState::Pending {
            return Err(Error::NotCancellable(self.state));
        }
        self.state = RequestState::Activating;
        Ok(())
    }

    pub fn hibernate(&mut self) {
        self.state = RequestState::Hibernating;
    }

    /// Hibernation ends once the owning frame is bottom-of-stack again
    /// (§4.F `activate`); resumes at `Activating`.
    pub fn wake_from_hibernation(&mut self) {
        if self.state == RequestState::Hibernating {
            self.state = RequestState::Activating;
        }
    }

    pub fn complete(&mut self) {
        self.state = RequestState::Done;
    }

    /// §5 "from `PENDING` and `ACTIVATING` a `cancel` transitions to
    /// `CANCELLED → DYING`, invoking `ops.cancel` exactly once" and
    /// "Cancellation idempotence. `cancel` on a `CANCELLED`/`DYING` request
    /// is a no-op".
    pub fn cancel(&mut self) {
        if !self.state.is_cancellable() {
            return;
        }
        self.state = RequestState::Cancelled;
        (self.ops.cancel)();
        self.state = RequestState::Dying;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    fn dummy_ops(cancelled: &Rc<Cell<u32>>) -> RequestOps {
        let counter = cancelled.clone();
        RequestOps {
            callback: Rc::new(|_| {}),
            cancel: Rc::new(move || counter.set(counter.get() + 1)),
        }
    }

    fn dummy_owner() -> OwnerCoroutine {
        let mut slab: hvml_store::Slab<()> = hvml_store::Slab::empty();
        slab.insert(())
    }

    #[test]
    fn activate_from_pending_succeeds_once() {
        let cancelled = Rc::new(Cell::new(0));
        let mut req = Request::new(RequestType::Raw, dummy_owner(), None, Value::Undefined, dummy_ops(&cancelled));
        assert!(req.activate().is_ok());
        assert_eq!(req.state(), RequestState::Activating);
        assert!(req.activate().is_err());
    }

    #[test]
    fn cancel_invokes_ops_cancel_exactly_once() {
        let cancelled = Rc::new(Cell::new(0));
        let mut req = Request::new(RequestType::Async, dummy_owner(), None, Value::Undefined, dummy_ops(&cancelled));
        req.cancel();
        assert_eq!(req.state(), RequestState::Dying);
        assert_eq!(cancelled.get(), 1);

        // Idempotent: a second cancel on a Dying request is a no-op.
        req.cancel();
        assert_eq!(cancelled.get(), 1);
    }

    #[test]
    fn hibernation_wakes_back_to_activating() {
        let cancelled = Rc::new(Cell::new(0));
        let mut req = Request::new(RequestType::Sync, dummy_owner(), None, Value::Undefined, dummy_ops(&cancelled));
        req.activate().unwrap();
        req.hibernate();
        assert_eq!(req.state(), RequestState::Hibernating);
        req.wake_from_hibernation();
        assert_eq!(req.state(), RequestState::Activating);
    }
}
