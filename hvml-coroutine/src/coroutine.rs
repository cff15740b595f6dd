//! [`Coroutine`]: one document's execution context (§3 "Coroutine", §4.F).
//!
//! Owns everything a single document needs that the scheduler (`heap.rs`)
//! does not have to share across documents: its frame stack, its scoped
//! variable arena, its document-level bindings, its observer lists, its
//! timers, and its DOM effect sink. The scheduler only ever touches a
//! `Coroutine` through [`Coroutine::step`], [`Coroutine::tick_timers`], and
//! [`Coroutine::dispatch`] — everything else here is this document's own
//! business.

use std::fmt::Write as _;
use std::rc::Rc;

use hvml_debug::DebugWriter;
use hvml_dom::{DomEffects, DomTree, RendererConnection};
use hvml_expr::Expr;
use hvml_frame::{ElementId, ElementKind, ElementTree, Frame, FrameStack, NextStep, StepOutcome};
use hvml_observer::{Message, Observer, ObserverHandle, ObserverRegistry};
use hvml_scope::{DocumentBindings, ScopeArena};
use hvml_timer::{EventTimer, ReactiveTimers, TimerService};
use hvml_value::Value;

use crate::env::{CallRegistry, CoroutineEnv};
use crate::exception::Exception;
use crate::request::RequestId;

/// `{READY, RUN, WAIT}` (§3, §8 "For every live coroutine: `state ∈
/// {READY, RUN, WAIT}`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineState {
    Ready,
    Run,
    Wait,
}

pub struct Coroutine<D, R> {
    tree: Rc<dyn ElementTree>,
    frames: FrameStack,
    scopes: ScopeArena,
    document: DocumentBindings,
    calls: CallRegistry,
    state: CoroutineState,
    exited: bool,
    exception: Option<Exception>,
    waits: u32,
    observers: ObserverRegistry,
    event_timer: EventTimer,
    timers: TimerService,
    reactive_timers: ReactiveTimers,
    dom: DomEffects<D, R>,
    outstanding_requests: Vec<RequestId>,
    /// The document's `on_terminated`/`on_cleanup` hook (§4.F `terminate`
    /// "run the document's `on_terminated`/`on_cleanup` hooks"), given the
    /// uncleared exception at document end, if any (§7).
    on_terminated: Rc<dyn Fn(Option<&Exception>)>,
}

impl<D: DomTree, R: RendererConnection> Coroutine<D, R> {
    /// Seeds the frame stack with one document-root frame (§3 "constructs
    /// a coroutine whose stack initially contains one frame for the
    /// document root"). `reactive_timers_fire` is the closure run each time
    /// a `$TIMERS` backing timer fires; the caller typically wires it to
    /// dispatch a message on this same coroutine's bus, but that wiring
    /// crosses an `Rc<RefCell<Coroutine>>` boundary this module does not
    /// assume, so it is supplied rather than hard-coded.
    pub fn new(tree: Rc<dyn ElementTree>, dom: DomEffects<D, R>, reactive_timers_fire: impl Fn(&Value) + 'static) -> Self {
        let root = tree.root();
        let mut frames = FrameStack::new();
        frames.push(Frame::normal(root, ElementKind::Document, root, None));

        Self {
            tree,
            frames,
            scopes: ScopeArena::new(),
            document: DocumentBindings::new(),
            calls: CallRegistry::new(),
            state: CoroutineState::Ready,
            exited: false,
            exception: None,
            waits: 0,
            observers: ObserverRegistry::new(),
            event_timer: EventTimer::default(),
            timers: TimerService::new(),
            reactive_timers: ReactiveTimers::new(reactive_timers_fire),
            dom,
            outstanding_requests: Vec::new(),
            on_terminated: Rc::new(|_| {}),
        }
    }

    pub fn set_on_terminated(&mut self, hook: impl Fn(Option<&Exception>) + 'static) {
        self.on_terminated = Rc::new(hook);
    }

    /// Runs the `on_terminated` hook with whatever exception is still set
    /// (§7 "An uncleared exception at document end is surfaced to the
    /// document's `on_terminated` hook"), then clears it.
    pub fn run_on_terminated(&mut self) {
        let hook = self.on_terminated.clone();
        hook(self.exception.as_ref());
        self.exception = None;
    }

    pub fn state(&self) -> CoroutineState {
        self.state
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    pub fn document_mut(&mut self) -> &mut DocumentBindings {
        &mut self.document
    }

    pub fn calls_mut(&mut self) -> &mut CallRegistry {
        &mut self.calls
    }

    pub fn dom_mut(&mut self) -> &mut DomEffects<D, R> {
        &mut self.dom
    }

    pub fn reactive_timers(&self) -> &ReactiveTimers {
        &self.reactive_timers
    }

    pub fn event_timer_mut(&mut self) -> &mut EventTimer {
        &mut self.event_timer
    }

    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    /// A frame's `on_popping`/`rerun` handler inspects and clears its
    /// coroutine's exception (§7).
    pub fn take_exception(&mut self) -> Option<Exception> {
        self.exception.take()
    }

    pub fn waits(&self) -> u32 {
        self.waits
    }

    /// Whether the coroutine can be torn down: an empty stack and no
    /// outstanding observer/async holds (§3 Lifecycles, §4.F `terminate`).
    pub fn can_terminate(&self) -> bool {
        self.frames.is_empty() && self.waits == 0
    }

    /// `register(observed, type_atom, sub_type_pattern, scope, position,
    /// dom_anchor, on_revoke) → observer` (§4.G). Increments `waits`.
    pub fn register_observer(&mut self, observer: Observer) -> ObserverHandle {
        self.waits += 1;
        self.observers.register(observer)
    }

    /// `revoke` (§4.G). Decrements `waits`.
    pub fn revoke_observer(&mut self, handle: ObserverHandle) -> Option<Observer> {
        let revoked = self.observers.revoke(handle);
        if revoked.is_some() {
            self.waits = self.waits.saturating_sub(1);
        }
        revoked
    }

    /// Observers die in reverse registration order on coroutine teardown
    /// (§3 Lifecycles).
    pub fn revoke_all_observers(&mut self) -> Vec<Observer> {
        let revoked = self.observers.revoke_all();
        self.waits = self.waits.saturating_sub(revoked.len() as u32);
        revoked
    }

    pub fn track_request(&mut self, id: RequestId) {
        self.outstanding_requests.push(id);
    }

    pub fn untrack_request(&mut self, id: RequestId) {
        self.outstanding_requests.retain(|r| *r != id);
    }

    /// Every id a teardown must cancel (§4.I "a per-coroutine array of
    /// outstanding request ids so that coroutine teardown can cancel all
    /// in flight").
    pub fn outstanding_requests(&self) -> &[RequestId] {
        &self.outstanding_requests
    }

    /// `dispatch(coroutine, source, type_value, sub_type_value, extra)`
    /// (§4.G): matches every registered observer against `message` and
    /// pushes one new frame per match, whose vtable/scope/position/DOM
    /// anchor come from the observer record. Waking from `Wait` back to
    /// `Ready` is the scheduler's `drain`'s job once this returns non-zero.
    pub fn dispatch(&mut self, message: &Message) -> usize {
        let to_push: Vec<(ElementId, ElementId, Option<ElementId>)> =
            self.observers.dispatch(message).into_iter().map(|m| (m.observer.position, m.observer.scope, m.observer.dom_anchor)).collect();

        for (position, scope, dom_anchor) in &to_push {
            let kind = self.tree.kind_of(*position);
            self.frames.push(Frame::normal(*position, kind, *scope, *dom_anchor));
        }
        if !to_push.is_empty() {
            self.state = CoroutineState::Ready;
        }
        to_push.len()
    }

    /// Advance every timer-driven subsystem by `elapsed_ms` of wall-clock
    /// time (§4.H): user timers, the `$TIMERS` reactive collection, and the
    /// event timer's expression-variable rescans.
    pub fn tick_timers(&mut self, elapsed_ms: u64) {
        self.timers.tick(elapsed_ms);
        self.reactive_timers.tick(elapsed_ms);
        self.event_timer.tick(elapsed_ms);
    }

    /// Execute exactly one frame step (§4.E). Evaluates any pending
    /// attribute/content expressions for a freshly-pushed frame first,
    /// snapshotting an evaluation error into the exception slot rather
    /// than propagating it, then advances the frame machine.
    pub fn step(&mut self) -> StepOutcome {
        if self.frames.is_empty() {
            self.settle_exited();
            return StepOutcome::Exhausted;
        }

        self.state = CoroutineState::Run;
        self.evaluate_pending_attrs();
        let outcome = self.frames.step(self.tree.as_ref());

        match outcome {
            StepOutcome::Exhausted => self.settle_exited(),
            StepOutcome::Ready => self.state = CoroutineState::Ready,
        }
        outcome
    }

    fn settle_exited(&mut self) {
        self.state = CoroutineState::Wait;
        self.exited = self.waits == 0;
    }

    /// Evaluates `tree.attr_exprs`/`tree.content_expr` for the bottom frame
    /// the first time it is seen at `AfterPushed` (§4.E "a map of evaluated
    /// attribute values"; §4.B). The frame machine's own `after_pushed`
    /// handlers (e.g. `match`'s, which reads the `for` attribute) expect
    /// `Frame::attrs` to already be populated by the time they run.
    fn evaluate_pending_attrs(&mut self) {
        let Some(frame) = self.frames.bottom() else { return };
        if frame.next_step != NextStep::AfterPushed || !frame.attrs.is_empty() {
            return;
        }
        let element = frame.element;
        let silently = frame.silently;

        let attr_exprs: Vec<(Rc<str>, Expr)> = self.tree.attr_exprs(element).to_vec();
        let content_expr: Option<Expr> = self.tree.content_expr(element).cloned();
        let ancestors = self.frames.scope_chain();
        let env = CoroutineEnv::new(ancestors, &self.scopes, &self.document, &self.calls);

        let mut evaluated_attrs = Vec::with_capacity(attr_exprs.len());
        let mut failure = None;
        for (name, expr) in &attr_exprs {
            match hvml_expr::eval(expr, &env, silently) {
                Ok(value) => evaluated_attrs.push((name.clone(), value)),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let content = match (&failure, content_expr) {
            (Some(_), _) => None,
            (None, Some(expr)) => match hvml_expr::eval(&expr, &env, silently) {
                Ok(value) => Some(value),
                Err(err) => {
                    failure = Some(err);
                    None
                }
            },
            (None, None) => None,
        };

        if let Some(frame) = self.frames.bottom_mut() {
            frame.attrs = evaluated_attrs;
            frame.content = content;
        }
        if let Some(err) = failure {
            self.exception = Some(err.into());
        }
    }
}

/// A per-coroutine backtrace dump (§7 "backtrace dump"): state, frame
/// depth, outstanding waits and the current exception, if any.
impl<D, R> DebugWriter for Coroutine<D, R> {
    fn write(&mut self, output: &mut impl std::fmt::Write) -> std::fmt::Result {
        writeln!(output, "state: {:?}", self.state)?;
        writeln!(output, "frames: {}", self.frames.len())?;
        writeln!(output, "waits: {}", self.waits)?;
        writeln!(output, "observers: {}", self.observers.len())?;
        match &self.exception {
            Some(exception) => writeln!(output, "exception: {:?} {}", exception.errcode, exception.except_atom),
            None => writeln!(output, "exception: none"),
        }
    }
}
