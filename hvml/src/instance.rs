use std::rc::Rc;

use hvml_async::{AsyncBridge, FetchClient, FetchResponse, FetchSpec};
use hvml_coroutine::{CoroutineId, DrainSummary, Heap, RequestId, RoutinePoster};
use hvml_debug::DebugWriter;
use hvml_dom::{DomEffects, DomTree, RendererConnection};
use hvml_frame::ElementTree;
use hvml_observer::Message;
use hvml_value::Value;

use crate::config::Config;
use crate::error::{Error, Result};

/// One running interpreter: a [`Heap`] of coroutines plus the ambient
/// config and (optionally) the async fetch bridge wired over it. This is
/// the one type a host application touches directly; everything below it
/// (frames, scopes, observers, timers) is driven exclusively through
/// [`Instance::drain`]/[`Instance::run`].
pub struct Instance<D, R> {
    heap: Heap<D, R>,
    config: Config,
    bridge: Option<AsyncBridge<D, R>>,
}

impl<D: DomTree + 'static, R: RendererConnection + 'static> Instance<D, R> {
    pub fn new(config: Config) -> Self {
        let heap = if config.heap_capacity_hint > 0 {
            Heap::with_capacity(config.heap_capacity_hint)
        } else {
            Heap::new()
        };
        Self { heap, config, bridge: None }
    }

    /// Wires an async fetch transport over this instance's own
    /// [`RoutinePoster`], so `request_async` completions land back on the
    /// right coroutine's loop regardless of which thread the transport
    /// runs on (§4.I).
    pub fn with_fetch_client(mut self, client: Rc<dyn FetchClient>) -> Self {
        self.bridge = Some(AsyncBridge::new(self.heap.poster(), client));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a document and returns its coroutine id (§3 "constructs a
    /// coroutine whose stack initially contains one frame for the document
    /// root"). The event timer's scan interval is immediately set from
    /// [`Config::event_timer_interval_ms`].
    pub fn spawn_document(&mut self, tree: Rc<dyn ElementTree>, dom: D, reactive_timers_fire: impl Fn(&Value) + 'static) -> CoroutineId {
        let id = self.heap.spawn(tree, DomEffects::new(dom), reactive_timers_fire);
        if let Some(co) = self.heap.get(id) {
            co.borrow_mut().event_timer_mut().set_interval(self.config.event_timer_interval_ms);
        }
        id
    }

    pub fn poster(&self) -> RoutinePoster<D, R> {
        self.heap.poster()
    }

    /// Forwards a message to one coroutine's observer bus (§4.G
    /// `dispatch`).
    pub fn dispatch(&mut self, id: CoroutineId, message: &Message) -> usize {
        self.heap.dispatch(id, message)
    }

    /// Advances every coroutine's ready frame once each; does not loop to
    /// quiescence (§4.F `drain`).
    pub fn drain(&mut self) -> DrainSummary {
        self.heap.drain()
    }

    /// Drains repeatedly until no coroutine is ready or waiting (§4.F
    /// "if no ready and no waits, stop the loop").
    pub fn run(&mut self) -> DrainSummary {
        self.heap.run()
    }

    pub fn is_running(&self, id: CoroutineId) -> bool {
        self.heap.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Issues an async fetch through whatever transport [`Instance::with_fetch_client`]
    /// wired in (§4.I `request_async`). Returns [`Error::UnknownDocument`]
    /// if no transport was ever configured — there is no sensible request
    /// id to hand back without one.
    pub fn request_async(
        &mut self,
        owner: CoroutineId,
        spec: FetchSpec,
        ctxt: Value,
        on_done: impl Fn(Value, std::result::Result<FetchResponse, hvml_async::Error>) + 'static,
    ) -> Result<RequestId> {
        let bridge = self.bridge.as_ref().ok_or(Error::UnknownDocument)?;
        Ok(bridge.request_async(&mut self.heap, owner, spec, ctxt, on_done))
    }

    /// Renders a backtrace dump (§7) of the whole instance: one section per
    /// live coroutine's state, frame depth, waits, observers and exception.
    pub fn debug_dump(&mut self) -> String {
        let mut out = String::new();
        let _ = self.heap.write(&mut out);
        out
    }
}
