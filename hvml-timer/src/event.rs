//! The per-coroutine "event timer" (§4.F, §4.H): a fixed-interval repeating
//! timer (10 ms default) that reevaluates every registered expression
//! variable and reports a `change` when the comparator detects a
//! difference (§4.C "Change detection compares the fresh result against
//! `last_value`; inequality triggers a `change` event on the wrapping
//! value").
//!
//! This crate has no notion of coroutines, scopes or the observer bus, so a
//! "watch" is a closure pair: `rescan` re-evaluates an expression variable
//! against its environment and reports whether it changed, `on_change` is
//! whatever the registrant wants done about that (`hvml-coroutine` wires
//! this to dispatching a `change` message on the bus). [`EventTimer::register_exprvar`]
//! is a convenience that builds the `rescan` closure for the common case of
//! watching an [`ExprVar`] directly.

use std::rc::Rc;

use hvml_expr::Env;
use hvml_exprvar::ExprVar;

/// Default scan interval (§4.H "10 ms by default").
pub const DEFAULT_INTERVAL_MS: u64 = 10;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(u64);

struct Watch {
    id: WatchId,
    rescan: Box<dyn Fn() -> bool>,
    on_change: Rc<dyn Fn()>,
}

/// Drives `scan_expression_variables` (§4.H) on a fixed interval.
pub struct EventTimer {
    interval_ms: u64,
    elapsed_ms: u64,
    next_id: u64,
    watches: Vec<Watch>,
}

impl EventTimer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            elapsed_ms: 0,
            next_id: 0,
            watches: Vec::new(),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    /// Register a generic watch: `rescan` runs on every scan and reports
    /// whether the watched value changed; `on_change` fires only when it
    /// did.
    pub fn register(&mut self, rescan: impl Fn() -> bool + 'static, on_change: impl Fn() + 'static) -> WatchId {
        let id = WatchId(self.next_id);
        self.next_id += 1;
        self.watches.push(Watch {
            id,
            rescan: Box::new(rescan),
            on_change: Rc::new(on_change),
        });
        id
    }

    /// Convenience over [`register`](Self::register) for the common case:
    /// watch an [`ExprVar`]'s `rescan` result directly (§4.C/§4.H).
    pub fn register_exprvar(&mut self, var: Rc<ExprVar>, env: Rc<dyn Env>, on_change: impl Fn() + 'static) -> WatchId {
        self.register(move || var.rescan(env.as_ref()), on_change)
    }

    pub fn revoke(&mut self, id: WatchId) {
        self.watches.retain(|w| w.id != id);
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Advance elapsed wall-clock time; once a full interval has passed,
    /// scan every registered watch once and reset the accumulator. A zero
    /// interval disables scanning (used to pause the timer without
    /// dropping its watches).
    pub fn tick(&mut self, elapsed_ms: u64) {
        if self.interval_ms == 0 {
            return;
        }
        self.elapsed_ms += elapsed_ms;
        if self.elapsed_ms < self.interval_ms {
            return;
        }
        self.elapsed_ms = 0;
        self.scan();
    }

    fn scan(&self) {
        for watch in &self.watches {
            if (watch.rescan)() {
                (watch.on_change)();
            }
        }
    }
}

impl Default for EventTimer {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::collections::HashMap;

    use hvml_expr::Error as ExprError;
    use hvml_value::Value;

    use super::*;

    struct TestEnv(std::cell::RefCell<HashMap<&'static str, Value>>);

    impl Env for TestEnv {
        fn lookup(&self, name: &str) -> Option<Value> {
            self.0.borrow().get(name).cloned()
        }

        fn lookup_root(&self, name: &str) -> Option<Value> {
            self.lookup(name)
        }

        fn call(&self, _name: &str, _args: &[Value]) -> Result<Value, ExprError> {
            Err(ExprError::NotImplemented("call".into()))
        }
    }

    #[test]
    fn scan_fires_on_change_only_once_per_interval() {
        let concrete = Rc::new(TestEnv(std::cell::RefCell::new(HashMap::from([("x", Value::Int(1))]))));
        let env: Rc<dyn Env> = concrete.clone();
        let var = Rc::new(ExprVar::new(hvml_expr::Expr::Var {
            name: "x".into(),
            qualified: false,
        }));
        var.on_observe(env.as_ref());

        let fired = Rc::new(Cell::new(0));
        let fired2 = fired.clone();
        let mut timer = EventTimer::new(10);
        timer.register_exprvar(var.clone(), env.clone(), move || fired2.set(fired2.get() + 1));

        timer.tick(5);
        assert_eq!(fired.get(), 0, "interval has not elapsed yet");

        timer.tick(5);
        assert_eq!(fired.get(), 0, "value has not changed");

        // Mutate the env's binding and wait another full interval.
        concrete.0.borrow_mut().insert("x", Value::Int(2));
        timer.tick(10);
        assert_eq!(fired.get(), 1);
        timer.tick(10);
        assert_eq!(fired.get(), 1, "no further change since last scan");
    }
}
