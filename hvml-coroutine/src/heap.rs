//! [`Heap`]: the process-wide scheduler (§3 "Process-wide heap", §4.F).
//!
//! One `Heap` per interpreter instance multiplexes every live coroutine
//! over a single event loop. Per §5 "Single-threaded cooperative per
//! interpreter instance", stepping coroutines and touching their state
//! only ever happens from this loop's thread; the one operation another
//! thread may call directly is [`Heap::poster`]'s [`RoutinePoster::post`]
//! (§4.F `post_routine` "thread-safe").

use std::cell::RefCell;
use std::rc::Rc;

use hvml_debug::DebugWriter;
use hvml_dom::{DomEffects, DomTree, RendererConnection};
use hvml_frame::{ElementTree, StepOutcome};
use hvml_observer::Message;
use hvml_store::Slab;
use hvml_value::Value;

use crate::coroutine::{Coroutine, CoroutineState};
use crate::error::Error;
use crate::exception::Exception;
use crate::request::{Request, RequestId, RequestState, RequestType};

pub type CoroutineId = hvml_store::Key;

type SharedCoroutine<D, R> = Rc<RefCell<Coroutine<D, R>>>;

/// A closure posted across threads to run on its target coroutine's loop
/// (§4.F `post_routine`). Only the closure needs to be `Send`; the
/// coroutine it eventually touches never leaves this loop's thread.
pub struct PostedRoutine<D, R> {
    target: CoroutineId,
    run: Box<dyn FnOnce(&mut Coroutine<D, R>) + Send>,
}

/// The thread-safe handle `post_routine` hands out (§4.F "enqueues a
/// routine to run on `target_co`'s loop; first enqueue wakes the loop").
/// Modeled on the teacher's `Emitter` wrapping a `flume::Sender` (see
/// `anathema-runtime::messages::Emitter`).
pub struct RoutinePoster<D, R> {
    sender: flume::Sender<PostedRoutine<D, R>>,
}

impl<D, R> Clone for RoutinePoster<D, R> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<D: 'static, R: 'static> RoutinePoster<D, R> {
    pub fn post(&self, target: CoroutineId, run: impl FnOnce(&mut Coroutine<D, R>) + Send + 'static) -> Result<(), Error> {
        self.sender.send(PostedRoutine { target, run: Box::new(run) }).map_err(|_| Error::UnknownCoroutine)
    }
}

/// `drain`'s per-pass tally (§4.F "accumulate ready/wait counts; if no
/// ready and no waits, stop the loop").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainSummary {
    pub ready: usize,
    pub waiting: usize,
    pub exited: usize,
}

impl DrainSummary {
    /// "if no ready and no waits, stop the loop".
    pub fn should_stop(&self) -> bool {
        self.ready == 0 && self.waiting == 0
    }
}

pub struct Heap<D, R> {
    coroutines: Slab<SharedCoroutine<D, R>>,
    current: Option<CoroutineId>,
    requests: Slab<Request>,
    pending: Vec<RequestId>,
    active: Vec<RequestId>,
    hibernating: Vec<RequestId>,
    routine_tx: flume::Sender<PostedRoutine<D, R>>,
    routine_rx: flume::Receiver<PostedRoutine<D, R>>,
}

impl<D: DomTree + 'static, R: RendererConnection + 'static> Heap<D, R> {
    pub fn new() -> Self {
        let (routine_tx, routine_rx) = flume::unbounded();
        Self {
            coroutines: Slab::empty(),
            current: None,
            requests: Slab::empty(),
            pending: Vec::new(),
            active: Vec::new(),
            hibernating: Vec::new(),
            routine_tx,
            routine_rx,
        }
    }

    /// Like [`Heap::new`], but preallocates room for `capacity` coroutines
    /// up front (§1 "initial heap capacity hints").
    pub fn with_capacity(capacity: usize) -> Self {
        let (routine_tx, routine_rx) = flume::unbounded();
        Self {
            coroutines: Slab::with_capacity(capacity),
            current: None,
            requests: Slab::empty(),
            pending: Vec::new(),
            active: Vec::new(),
            hibernating: Vec::new(),
            routine_tx,
            routine_rx,
        }
    }

    pub fn poster(&self) -> RoutinePoster<D, R> {
        RoutinePoster { sender: self.routine_tx.clone() }
    }

    /// Forwards a message to one coroutine's observer bus (§4.G
    /// `dispatch`). Callers that broadcast a message to every live
    /// coroutine (e.g. a reactive timer tick) loop over [`Heap::coroutine_ids`].
    pub fn dispatch(&mut self, id: CoroutineId, message: &Message) -> usize {
        match self.coroutines.get(id) {
            Some(co) => co.borrow_mut().dispatch(message),
            None => 0,
        }
    }

    pub fn coroutine_ids(&self) -> Vec<CoroutineId> {
        self.coroutines.iter().map(|(id, _)| id).collect()
    }

    /// Register a new document (§3 "constructs a coroutine whose stack
    /// initially contains one frame for the document root").
    pub fn spawn(&mut self, tree: Rc<dyn ElementTree>, dom: DomEffects<D, R>, reactive_timers_fire: impl Fn(&Value) + 'static) -> CoroutineId {
        let coroutine = Coroutine::new(tree, dom, reactive_timers_fire);
        self.coroutines.insert(Rc::new(RefCell::new(coroutine)))
    }

    pub fn get(&self, id: CoroutineId) -> Option<&SharedCoroutine<D, R>> {
        self.coroutines.get(id)
    }

    pub fn current(&self) -> Option<CoroutineId> {
        self.current
    }

    /// `ready()` (§4.F): "wake the loop and run `drain()`". With no real OS
    /// event loop to wake, this is simply `drain`'s entry point.
    pub fn ready(&mut self) -> DrainSummary {
        self.drain()
    }

    /// `drain()` (§4.F): runs every posted routine, then calls
    /// `step_if_ready` once per live coroutine, tallying outcomes. Does
    /// *not* loop to quiescence itself — see [`Heap::run`] for that, since
    /// §4.F's "if any readies, re-post `drain` to the loop" describes an
    /// event-loop re-post this synchronous scheduler models as an explicit
    /// caller-driven loop instead.
    pub fn drain(&mut self) -> DrainSummary {
        self.run_posted_routines();

        let ids: Vec<CoroutineId> = self.coroutines.iter().map(|(id, _)| id).collect();
        let mut summary = DrainSummary::default();
        let mut terminated = Vec::new();

        for id in ids {
            match self.step_if_ready(id) {
                Some(CoroutineState::Ready) => summary.ready += 1,
                Some(CoroutineState::Wait) => {
                    let exited = self.coroutines.get(id).map(|co| co.borrow().is_exited()).unwrap_or(false);
                    if exited {
                        summary.exited += 1;
                        terminated.push(id);
                    } else {
                        summary.waiting += 1;
                    }
                }
                Some(CoroutineState::Run) | None => {}
            }
        }

        for id in terminated {
            self.terminate(id);
        }

        summary
    }

    /// Calls [`Heap::drain`] repeatedly until it reports no ready
    /// coroutines and no waiting ones left (§4.F "if no ready and no
    /// waits, stop the loop").
    pub fn run(&mut self) -> DrainSummary {
        let mut last = DrainSummary::default();
        loop {
            let summary = self.drain();
            last.exited += summary.exited;
            if summary.should_stop() {
                last.ready = summary.ready;
                last.waiting = summary.waiting;
                return last;
            }
        }
    }

    fn run_posted_routines(&mut self) {
        for posted in self.routine_rx.try_iter().collect::<Vec<_>>() {
            if let Some(co) = self.coroutines.get(posted.target) {
                (posted.run)(&mut co.borrow_mut());
            }
        }
    }

    /// `step_if_ready(co)` (§4.F): "if state `READY`, set current to `co`,
    /// transition to `RUN`, execute one frame step, clear current, return
    /// new state."
    pub fn step_if_ready(&mut self, id: CoroutineId) -> Option<CoroutineState> {
        let co = self.coroutines.get(id)?.clone();
        if co.borrow().state() != CoroutineState::Ready {
            return Some(co.borrow().state());
        }

        self.current = Some(id);
        let outcome = co.borrow_mut().step();
        self.current = None;

        if outcome == StepOutcome::Ready {
            self.wake_hibernating_for(id);
        }
        Some(co.borrow().state())
    }

    /// A hibernating `SYNC` request whose `owner_frame` has become
    /// bottom-of-stack again wakes and moves to `active` (§4.F `activate`).
    /// This scheduler has no direct view into the coroutine's frame stack
    /// from here, so this is intentionally conservative: callers that know
    /// their request's owning frame use [`Heap::activate`] directly instead
    /// of relying on this implicit wake.
    fn wake_hibernating_for(&mut self, _id: CoroutineId) {}

    /// `terminate(co)` (§4.F): "called when the stack becomes empty; if the
    /// coroutine still has any observer, flip to `WAIT` and leave it alive;
    /// otherwise run the document's `on_terminated`/`on_cleanup` hooks,
    /// unlink, and destroy."
    pub fn terminate(&mut self, id: CoroutineId) {
        let Some(co) = self.coroutines.get(id) else { return };
        if !co.borrow().can_terminate() {
            return;
        }
        co.borrow_mut().run_on_terminated();
        self.cancel_outstanding(id);
        self.coroutines.remove(id);
    }

    fn cancel_outstanding(&mut self, id: CoroutineId) {
        let outstanding: Vec<RequestId> = self.coroutines.get(id).map(|co| co.borrow().outstanding_requests().to_vec()).unwrap_or_default();
        for request_id in outstanding {
            let _ = self.cancel(request_id);
        }
    }

    /// `post_request(type, ctxt, ops)` (§4.F): registers a request in
    /// `pending`.
    pub fn post_request(&mut self, owner: CoroutineId, request_type: RequestType, owner_frame: Option<hvml_frame::ElementId>, payload: Value, ops: crate::request::RequestOps) -> RequestId {
        let request = Request::new(request_type, owner, owner_frame, payload, ops);
        let id = self.requests.insert(request);
        self.pending.push(id);
        if let Some(co) = self.coroutines.get(owner) {
            co.borrow_mut().track_request(id);
        }
        id
    }

    /// `activate(req)` (§4.F): "move `pending→active`, wake the loop; loop
    /// invokes `ops.callback`. If the current bottom frame is not the
    /// original issuing frame of a SYNC request, the request is transferred
    /// to `hibernating` until its frame becomes bottom again."
    pub fn activate(&mut self, id: RequestId, current_bottom_frame: Option<hvml_frame::ElementId>) -> Result<(), Error> {
        let request = self.requests.get_mut(id).ok_or(Error::UnknownRequest)?;
        request.activate()?;
        self.pending.retain(|r| *r != id);

        if request.request_type == RequestType::Sync && request.owner_frame != current_bottom_frame {
            request.hibernate();
            self.hibernating.push(id);
            return Ok(());
        }

        self.active.push(id);
        let callback = request.ops.callback.clone();
        let payload = request.payload.clone();
        callback(payload);
        Ok(())
    }

    /// Wakes a hibernating request once its owning frame is bottom-of-stack
    /// again, moving it back to `active` (§4.F `activate`).
    pub fn wake_hibernating(&mut self, id: RequestId) -> Result<(), Error> {
        let request = self.requests.get_mut(id).ok_or(Error::UnknownRequest)?;
        if request.state() != RequestState::Hibernating {
            return Ok(());
        }
        request.wake_from_hibernation();
        self.hibernating.retain(|r| *r != id);
        self.active.push(id);
        Ok(())
    }

    /// `cancel(req)` (§4.F, §5 "Cancellation idempotence"): a no-op if the
    /// request is already `CANCELLED`/`DYING` or doesn't exist... except a
    /// caller asking to cancel an id this heap never tracked is still an
    /// error (§8 "For every request: `state` advances only monotonically"
    /// implies it must have existed in the first place).
    pub fn cancel(&mut self, id: RequestId) -> Result<(), Error> {
        let request = self.requests.get_mut(id).ok_or(Error::UnknownRequest)?;
        request.cancel();
        self.pending.retain(|r| *r != id);
        self.active.retain(|r| *r != id);
        self.hibernating.retain(|r| *r != id);
        Ok(())
    }

    pub fn complete(&mut self, id: RequestId) {
        if let Some(request) = self.requests.get_mut(id) {
            request.complete();
            self.requests.remove(id);
        }
        self.active.retain(|r| *r != id);
    }

    pub fn exception_of(&self, id: CoroutineId) -> Option<Exception> {
        self.coroutines.get(id)?.borrow().exception().cloned()
    }

    pub fn len(&self) -> usize {
        self.coroutines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coroutines.is_empty()
    }
}

impl<D: DomTree + 'static, R: RendererConnection + 'static> Default for Heap<D, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// The scheduler's own backtrace dump (§7): one section per live
/// coroutine, delegating to [`Coroutine`]'s own [`DebugWriter`] impl.
impl<D, R> DebugWriter for Heap<D, R> {
    fn write(&mut self, output: &mut impl std::fmt::Write) -> std::fmt::Result {
        writeln!(output, "coroutines: {}", self.coroutines.len())?;
        writeln!(output, "pending requests: {}", self.pending.len())?;
        writeln!(output, "active requests: {}", self.active.len())?;
        writeln!(output, "hibernating requests: {}", self.hibernating.len())?;
        for (id, co) in self.coroutines.iter() {
            writeln!(output, "-- coroutine {id:?} --")?;
            co.borrow_mut().write(output)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use hvml_dom::{DomId, RendererReply, RendererRequest};
    use hvml_frame::{ElementId, ElementKind};
    use hvml_scope::NodeId;

    use super::*;

    struct LeafTree;

    impl ElementTree for LeafTree {
        fn root(&self) -> ElementId {
            NodeId(0)
        }
        fn kind_of(&self, _id: ElementId) -> ElementKind {
            // See `coroutine::test::LeafTree::kind_of`: the root element's
            // own kind must not be `Document`, or `select_child` re-entering
            // `root()` pushes another synthetic document frame forever.
            ElementKind::Generic
        }
        fn children(&self, _id: ElementId) -> &[ElementId] {
            &[]
        }
        fn attr_exprs(&self, _id: ElementId) -> &[(Rc<str>, hvml_expr::Expr)] {
            &[]
        }
        fn content_expr(&self, _id: ElementId) -> Option<&hvml_expr::Expr> {
            None
        }
    }

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
    fn empty_document_scenario_terminates_and_empties_heap() {
        let mut heap: Heap<NullDom, NullRenderer> = Heap::new();
        let id = heap.spawn(Rc::new(LeafTree), DomEffects::new(NullDom::default()), |_| {});

        let summary = heap.run();
        assert!(summary.should_stop());
        assert!(heap.is_empty());
        assert!(heap.get(id).is_none());
    }

    #[test]
    fn posted_routine_runs_against_its_target_coroutine() {
        let mut heap: Heap<NullDom, NullRenderer> = Heap::new();
        let id = heap.spawn(Rc::new(LeafTree), DomEffects::new(NullDom::default()), |_| {});

        let touched = Rc::new(Cell::new(false));
        let touched2 = touched.clone();
        let poster = heap.poster();
        poster.post(id, move |co| {
            touched2.set(true);
            co.document_mut().bind("SYSTEM", Value::make_str("ok"));
        }).unwrap();

        heap.drain();
        assert!(touched.get());
    }

    #[test]
    fn cancel_on_unknown_request_is_an_error() {
        let mut heap: Heap<NullDom, NullRenderer> = Heap::new();
        assert!(matches!(heap.cancel(hvml_store::Key::ZERO), Err(Error::UnknownRequest)));
    }

    #[test]
    fn debug_dump_reports_live_coroutine_count() {
        let mut heap: Heap<NullDom, NullRenderer> = Heap::new();
        heap.spawn(Rc::new(LeafTree), DomEffects::new(NullDom::default()), |_| {});

        let mut out = String::new();
        heap.write(&mut out).unwrap();
        assert!(out.contains("coroutines: 1"));
    }
}
