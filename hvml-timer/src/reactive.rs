//! `$TIMERS` (§4.H): "a document-scoped reactive timers collection ... a
//! set of objects `{id, interval, active}`. `grow` adds a backing timer
//! initialised from the new object and starts it when `active == \"on\"`.
//! `shrink` destroys the backing timer. Per-object mutation listeners map
//! `interval` and `active` changes to `set_interval` and `start`/`stop`."

use std::cell::RefCell;
use std::rc::Rc;

use hvml_value::{Change, Value};

use crate::{TimerId, TimerService};

/// Ties a `$TIMERS` set member's object identity to its backing timer so
/// `shrink` and per-member `change` listeners can find the right one.
struct Binding {
    member: Value,
    timer_id: TimerId,
}

pub struct ReactiveTimers {
    pub set: Value,
    service: Rc<RefCell<TimerService>>,
    bindings: Rc<RefCell<Vec<Binding>>>,
}

impl ReactiveTimers {
    pub fn new(fire: impl Fn(&Value) + 'static) -> Self {
        let set = Value::make_set("id");
        let service = Rc::new(RefCell::new(TimerService::new()));
        let bindings: Rc<RefCell<Vec<Binding>>> = Rc::new(RefCell::new(Vec::new()));
        let fire = Rc::new(fire);

        let service_for_listener = service.clone();
        let bindings_for_listener = bindings.clone();
        let fire_for_listener = fire.clone();
        let listener: hvml_value::Listener = Rc::new(move |change: &Change| match change {
            Change::Grow { value, .. } => {
                let member = value.clone();
                let interval = member_field(&member, "interval").and_then(|v| v.cast_to_numeric().ok()).unwrap_or(0.0) as u64;
                let active = member_field(&member, "active").map(|v| &*v.cast_to_string() == "on").unwrap_or(false);

                let fire = fire_for_listener.clone();
                let member_for_fire = member.clone();
                let mut service = service_for_listener.borrow_mut();
                let timer_id = service.create(Rc::new(move || fire(&member_for_fire)));
                service.set_interval(timer_id, interval);
                if active {
                    service.start(timer_id);
                }
                drop(service);

                register_member_listener(&member, timer_id, service_for_listener.clone());
                bindings_for_listener.borrow_mut().push(Binding { member, timer_id });
            }
            Change::Shrink { value, .. } => {
                let mut bindings = bindings_for_listener.borrow_mut();
                if let Some(pos) = bindings.iter().position(|b| b.member.is_same_instance(value)) {
                    let binding = bindings.remove(pos);
                    service_for_listener.borrow_mut().destroy(binding.timer_id);
                }
            }
            Change::Changed { .. } => {}
        });
        set.register_post_listener(listener);

        Self { set, service, bindings }
    }

    pub fn service(&self) -> &Rc<RefCell<TimerService>> {
        &self.service
    }

    pub fn tick(&self, elapsed_ms: u64) {
        self.service.borrow_mut().tick(elapsed_ms);
    }
}

fn member_field(member: &Value, name: &str) -> Option<Value> {
    let Value::Object(obj) = member else { return None };
    obj.borrow().get(name).cloned()
}

/// Registers the per-object listener (§4.H "Per-object mutation listeners
/// map `interval` and `active` changes to `set_interval` and
/// `start`/`stop`") on a single `$TIMERS` member, once it has a bound
/// timer id.
fn register_member_listener(member: &Value, timer_id: TimerId, service: Rc<RefCell<TimerService>>) {
    let listener: hvml_value::Listener = Rc::new(move |change: &Change| {
        let Change::Changed { key, after, .. } = change else { return };
        let hvml_value::ContainerKey::Name(name) = key else { return };
        match &**name {
            "interval" => {
                if let Ok(ms) = after.cast_to_numeric() {
                    service.borrow_mut().set_interval(timer_id, ms as u64);
                }
            }
            "active" => {
                if &*after.cast_to_string() == "on" {
                    service.borrow_mut().start(timer_id);
                } else {
                    service.borrow_mut().stop(timer_id);
                }
            }
            _ => {}
        }
    });
    member.register_post_listener(listener);
}

#[cfg(test)]
mod test {
    use std::cell::RefCell as StdRefCell;

    use super::*;

    fn make_member(id: &str, interval: i64, active: &str) -> Value {
        let member = Value::make_object();
        let Value::Object(obj) = &member else { unreachable!() };
        obj.borrow_mut().insert("id", Value::make_str(id));
        obj.borrow_mut().insert("interval", Value::Int(interval));
        obj.borrow_mut().insert("active", Value::make_str(active));
        member
    }

    #[test]
    fn grow_starts_a_backing_timer_when_active_on() {
        let fired = Rc::new(StdRefCell::new(Vec::new()));
        let fired2 = fired.clone();
        let timers = ReactiveTimers::new(move |member| {
            fired2.borrow_mut().push(member.clone());
        });

        let Value::Set(set) = &timers.set else { unreachable!() };
        set.borrow_mut().insert(make_member("t1", 50, "on"));

        timers.tick(60);
        assert_eq!(fired.borrow().len(), 1);
    }

    #[test]
    fn shrink_destroys_the_backing_timer() {
        let timers = ReactiveTimers::new(|_| {});
        let Value::Set(set) = &timers.set else { unreachable!() };
        let member = make_member("t1", 10, "on");
        set.borrow_mut().insert(member.clone());
        assert_eq!(timers.service().borrow().len(), 1);

        set.borrow_mut().remove("t1").unwrap();
        assert_eq!(timers.service().borrow().timers.len(), 0);
    }
}
