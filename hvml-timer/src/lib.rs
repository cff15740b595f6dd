//! Component H: the timer service (§3 "Timer", §4.H).
//!
//! Three distinct things share this crate because the spec ties them
//! together: plain user timers, the `$TIMERS` reactive collection that
//! mirrors its members onto backing timers, and the per-coroutine "event
//! timer" that drives expression-variable change detection.

mod event;
mod reactive;

use std::rc::Rc;

use hvml_value::Value;

pub use event::{DEFAULT_INTERVAL_MS, EventTimer, WatchId};
pub use reactive::ReactiveTimers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    interval_ms: u64,
    elapsed_ms: u64,
    repeating: bool,
    active: bool,
    fire: Rc<dyn Fn()>,
    attach: Option<Value>,
}

/// `create`/`set_interval`/`start`/`start_oneshot`/`stop`/`destroy`/
/// `set_attach`/`get_attach` (§4.H), all running on the owning coroutine's
/// loop.
#[derive(Default)]
pub struct TimerService {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, fire: Rc<dyn Fn()>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            interval_ms: 0,
            elapsed_ms: 0,
            repeating: false,
            active: false,
            fire,
            attach: None,
        });
        id
    }

    fn find_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.timers.iter_mut().find(|t| t.id == id)
    }

    pub fn set_interval(&mut self, id: TimerId, ms: u64) {
        if let Some(timer) = self.find_mut(id) {
            timer.interval_ms = ms;
        }
    }

    pub fn get_interval(&self, id: TimerId) -> Option<u64> {
        self.timers.iter().find(|t| t.id == id).map(|t| t.interval_ms)
    }

    pub fn start(&mut self, id: TimerId) {
        if let Some(timer) = self.find_mut(id) {
            timer.repeating = true;
            timer.active = true;
            timer.elapsed_ms = 0;
        }
    }

    pub fn start_oneshot(&mut self, id: TimerId) {
        if let Some(timer) = self.find_mut(id) {
            timer.repeating = false;
            timer.active = true;
            timer.elapsed_ms = 0;
        }
    }

    pub fn stop(&mut self, id: TimerId) {
        if let Some(timer) = self.find_mut(id) {
            timer.active = false;
        }
    }

    pub fn destroy(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }

    pub fn set_attach(&mut self, id: TimerId, value: Value) {
        if let Some(timer) = self.find_mut(id) {
            timer.attach = Some(value);
        }
    }

    pub fn get_attach(&self, id: TimerId) -> Option<Value> {
        self.timers.iter().find(|t| t.id == id).and_then(|t| t.attach.clone())
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id && t.active)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advance every active timer by `elapsed_ms` of wall-clock time,
    /// firing (and resetting or deactivating) each one that has reached
    /// its interval. Firing calls `fire_fn(id, ctxt)` on the coroutine's
    /// loop (§4.H) — here, simply invoking the stored closure, since `id`
    /// and `ctxt` are whatever the closure already captured.
    pub fn tick(&mut self, elapsed_ms: u64) {
        let mut to_fire = Vec::new();
        for timer in self.timers.iter_mut().filter(|t| t.active) {
            timer.elapsed_ms += elapsed_ms;
            if timer.elapsed_ms >= timer.interval_ms {
                to_fire.push(timer.id);
            }
        }
        for id in to_fire {
            let Some(timer) = self.find_mut(id) else { continue };
            let fire = timer.fire.clone();
            if timer.repeating {
                timer.elapsed_ms = 0;
            } else {
                timer.active = false;
            }
            fire();
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn repeating_timer_fires_once_per_interval_and_resets() {
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let mut service = TimerService::new();
        let id = service.create(Rc::new(move || count2.set(count2.get() + 1)));
        service.set_interval(id, 100);
        service.start(id);

        service.tick(60);
        assert_eq!(count.get(), 0);
        service.tick(60);
        assert_eq!(count.get(), 1);
        service.tick(100);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn oneshot_timer_deactivates_after_firing() {
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let mut service = TimerService::new();
        let id = service.create(Rc::new(move || count2.set(count2.get() + 1)));
        service.set_interval(id, 10);
        service.start_oneshot(id);

        service.tick(10);
        assert_eq!(count.get(), 1);
        assert!(!service.is_active(id));
        service.tick(100);
        assert_eq!(count.get(), 1);
    }
}
