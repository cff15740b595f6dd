//! Component I: the async request bridge (§3 "Request", §4.I).
//!
//! Fetching happens on whatever thread the caller's [`FetchClient`]
//! chooses; this crate's only job is getting the result back onto the
//! owner coroutine's loop without ever touching coroutine state from that
//! other thread. It does so through `hvml_coroutine::Heap`'s
//! [`RoutinePoster`](hvml_coroutine::RoutinePoster), the one piece of the
//! scheduler that is safe to call across threads (§5 "cross-instance
//! communication goes exclusively through `post_routine`").

mod error;

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hvml_coroutine::{CoroutineId, Heap, RequestId, RequestOps, RequestType, RoutinePoster};
use hvml_value::Value;

pub use error::Error;

/// One HTTP-ish fetch, handed to whatever transport the host application
/// wires in. `url`/`method`/`body` are carried as plain values rather than
/// a typed struct because nothing above this layer (expression evaluator,
/// frame kinds) has a richer notion of "a request" than the value tree
/// already gives it.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub url: Rc<str>,
    pub method: Rc<str>,
    pub body: Value,
    pub timeout_ms: Option<u64>,
}

/// What `on_done` is handed back (§4.I "`on_done(request_id, ctxt,
/// response_header, response_stream)`").
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub header: Value,
    pub stream: Value,
}

/// The pluggable transport. Implementations are free to run the fetch on
/// any thread they like (a thread pool, an async runtime's executor,
/// whatever) — the bridge only requires that `spawn` eventually calls
/// `on_done` exactly once, from any thread.
pub trait FetchClient {
    fn spawn(&self, spec: FetchSpec, cancelled: Arc<AtomicBool>, on_done: Box<dyn FnOnce(Result<FetchResponse, Error>) + Send>);
}

/// Re-posts a fetch's completion onto its owner coroutine's loop (§4.I
/// "The bridge re-posts the completion to the owner coroutine's loop so
/// that user code always runs single-threaded").
///
/// One bridge per interpreter instance, built over that instance's
/// [`Heap`]'s [`RoutinePoster`]. Holding only the poster (not the heap
/// itself) keeps this type `Send`-able to the fetch client's worker
/// threads without smuggling coroutine state across the boundary.
pub struct AsyncBridge<D, R> {
    poster: RoutinePoster<D, R>,
    client: Rc<dyn FetchClient>,
}

/// Carries a non-`Send` payload across exactly one thread boundary. §5
/// already accepts this hazard in the abstract ("cross-thread handoff
/// must go through `post_routine` which transfers ownership"); this makes
/// it concrete for the one payload type (`Value`, and anything built from
/// it) that genuinely needs to ride along. Mirrors
/// `anathema_values::bucket::Bucket`'s `unsafe impl Send` for a
/// conceptually single-owner value the type system can't see as such.
///
/// Safety: the caller must ensure the wrapped value is never read from two
/// threads at once — in practice, that it is constructed on one thread,
/// handed off exactly once, and only ever touched again on the thread that
/// receives it.
struct ForceSend<T>(T);

unsafe impl<T> Send for ForceSend<T> {}

impl<D: 'static, R: 'static> AsyncBridge<D, R> {
    pub fn new(poster: RoutinePoster<D, R>, client: Rc<dyn FetchClient>) -> Self {
        Self { poster, client }
    }

    /// `request_async(url, method, body, timeout_ms, on_done, ctxt) →
    /// request_id_value` (§4.I). `on_done` is the user-level callback that
    /// eventually runs on the owner coroutine's loop with the decoded
    /// response (or nothing, on cancellation); `owner_frame` is `None`
    /// since async fetches, unlike sync ones, only need their owner
    /// coroutine alive, not a specific frame bottom-of-stack (§4.F
    /// `activate`).
    pub fn request_async(
        &self,
        heap: &mut Heap<D, R>,
        owner: CoroutineId,
        spec: FetchSpec,
        ctxt: Value,
        on_done: impl Fn(Value, Result<FetchResponse, Error>) + 'static,
    ) -> RequestId {
        let poster = self.poster.clone();
        let payload = ctxt.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancelled.clone();
        let callback: Rc<dyn Fn(Value)> = Rc::new(|_| {});
        let cancel: Rc<dyn Fn()> = Rc::new(move || cancel_flag.store(true, Ordering::SeqCst));

        let id = heap.post_request(owner, RequestType::Async, None, payload, RequestOps { callback, cancel });

        let on_done: Rc<dyn Fn(Value, Result<FetchResponse, Error>)> = Rc::new(on_done);
        let handoff = ForceSend((ctxt, on_done));

        self.client.spawn(
            spec,
            cancelled.clone(),
            Box::new(move |result| {
                // The cancel callback may have fired between `spawn` and
                // here; a cancelled request's `on_done` never runs (§5
                // "Cancellation idempotence" — the user callback is not a
                // second place cancellation can be observed from).
                if cancelled.load(Ordering::SeqCst) {
                    return;
                }
                let ForceSend((ctxt, on_done)) = handoff;
                let bundle = ForceSend((ctxt, on_done, result));
                let _ = poster.post(owner, move |co| {
                    let ForceSend((ctxt, on_done, result)) = bundle;
                    co.untrack_request(id);
                    on_done(ctxt, result);
                });
            }),
        );

        id
    }
}

/// A deterministic [`FetchClient`] for tests: runs `on_done` synchronously
/// from a spawned `std::thread`, so callers exercise the real cross-thread
/// handoff without depending on an actual network stack.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    pub struct ImmediateClient {
        pub response: Result<FetchResponse, Error>,
    }

    impl FetchClient for ImmediateClient {
        fn spawn(&self, _spec: FetchSpec, cancelled: Arc<AtomicBool>, on_done: Box<dyn FnOnce(Result<FetchResponse, Error>) + Send>) {
            let boxed_response = ForceSend(self.response.clone());
            std::thread::spawn(move || {
                if cancelled.load(Ordering::SeqCst) {
                    return;
                }
                let ForceSend(response) = boxed_response;
                on_done(response);
            })
            .join()
            .expect("test fetch thread panicked");
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::{Cell, RefCell};

    use hvml_dom::{DomEffects, DomId, DomTree, RendererConnection, RendererReply, RendererRequest};
    use hvml_frame::{ElementId, ElementKind, ElementTree};
    use hvml_scope::NodeId;

    use super::testing::ImmediateClient;
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
    fn completion_lands_back_on_owner_coroutine_via_posted_routine() {
        let mut heap: Heap<NullDom, NullRenderer> = Heap::new();
        let owner = heap.spawn(Rc::new(LeafTree), DomEffects::new(NullDom::default()), |_| {});

        let client: Rc<dyn FetchClient> = Rc::new(ImmediateClient {
            response: Ok(FetchResponse { header: Value::make_str("200"), stream: Value::make_str("body") }),
        });
        let bridge = AsyncBridge::new(heap.poster(), client);

        let seen: Rc<RefCell<Option<Result<FetchResponse, Error>>>> = Rc::new(RefCell::new(None));
        let seen2 = seen.clone();
        let spec = FetchSpec { url: "http://example".into(), method: "GET".into(), body: Value::Undefined, timeout_ms: None };

        let _id = bridge.request_async(&mut heap, owner, spec, Value::Undefined, move |_ctxt, result| {
            *seen2.borrow_mut() = Some(result);
        });

        heap.drain();
        assert!(seen.borrow().is_some());
    }

    #[test]
    fn teardown_cancels_every_outstanding_id_exactly_once() {
        let mut heap: Heap<NullDom, NullRenderer> = Heap::new();
        let owner = heap.spawn(Rc::new(LeafTree), DomEffects::new(NullDom::default()), |_| {});

        let cancelled = Rc::new(Cell::new(0u32));
        let cancelled2 = cancelled.clone();
        let callback: Rc<dyn Fn(Value)> = Rc::new(|_| {});
        let cancel: Rc<dyn Fn()> = Rc::new(move || cancelled2.set(cancelled2.get() + 1));
        let _id = heap.post_request(owner, RequestType::Async, None, Value::Undefined, RequestOps { callback, cancel });

        // The document (a bare leaf root, no observers) runs straight to
        // exhaustion; teardown cancels the still-outstanding async request.
        heap.run();
        assert_eq!(cancelled.get(), 1);
        assert!(heap.is_empty());
    }
}
