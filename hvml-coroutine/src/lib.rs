//! Component F: the scheduler (§3 "Coroutine", "Request", §4.F).
//!
//! Two layers: [`Coroutine`] owns one document's frame stack, scopes,
//! observers, timers and DOM sink; [`Heap`] multiplexes every live
//! coroutine over a single cooperative loop and owns the cross-document
//! request table. Everything above this crate (the async bridge, the
//! top-level interpreter) drives the world exclusively through
//! [`Heap::run`]/[`Heap::drain`], [`Heap::post_request`], and
//! [`Heap::poster`].

mod coroutine;
mod env;
mod error;
mod exception;
mod heap;
mod request;

pub use coroutine::{Coroutine, CoroutineState};
pub use env::{CallRegistry, CoroutineEnv};
pub use error::Error;
pub use exception::{ErrCode, Exception};
pub use heap::{CoroutineId, DrainSummary, Heap, PostedRoutine, RoutinePoster};
pub use request::{OwnerCoroutine, Request, RequestId, RequestOps, RequestState, RequestType};
