//! Component C: the expression variable.
//!
//! A native value whose payload is a compiled [`Expr`] tree plus a small
//! state machine of caches (§3/§4.C): `fresh → evaluated`, collapsing to a
//! single memoized result if the variable is `constant`. The periodic
//! re-evaluation that drives `change` events (§4.F's "event timer") lives
//! in `hvml-timer`; this crate only supplies the comparison primitive that
//! timer calls into.

use std::any::Any;
use std::cell::RefCell;

use hvml_expr::{Env, Expr, eval};
use hvml_value::{Error, Native, Value};

/// State diagram position (§4.C): `Fresh` has never been evaluated,
/// `Evaluated` has a cached `last_value` (always kept up to date for
/// non-constant variables so change detection has something to diff
/// against), `Constant` has permanently settled on one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Evaluated,
    Constant,
}

pub struct ExprVar {
    expr: Expr,
    constant: bool,
    state: RefCell<State>,
    last_value: RefCell<Option<Value>>,
}

impl ExprVar {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            constant: false,
            state: RefCell::new(State::Fresh),
            last_value: RefCell::new(None),
        }
    }

    pub fn new_constant(expr: Expr) -> Self {
        Self {
            expr,
            constant: true,
            state: RefCell::new(State::Fresh),
            last_value: RefCell::new(None),
        }
    }

    /// The `method_name` getter: re-evaluates on every call (§4.C).
    pub fn eval(&self, env: &dyn Env, silently: bool) -> Result<Value, Error> {
        if self.constant {
            return self.eval_const(env, silently);
        }
        let value = eval(&self.expr, env, silently).map_err(|_| Error::InvalidValue)?;
        *self.state.borrow_mut() = State::Evaluated;
        *self.last_value.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// The `const_method_name` getter: evaluates once and memoizes (§4.C).
    pub fn eval_const(&self, env: &dyn Env, silently: bool) -> Result<Value, Error> {
        if *self.state.borrow() == State::Constant {
            return Ok(self.last_value.borrow().clone().expect("constant state implies a cached value"));
        }
        let value = eval(&self.expr, env, silently).map_err(|_| Error::InvalidValue)?;
        *self.state.borrow_mut() = State::Constant;
        *self.last_value.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// `on_observe` hook: pre-computes `last_value` at observer
    /// registration time (§4.C) so the first scan has something to
    /// compare against instead of spuriously firing `change` on the first
    /// tick.
    pub fn on_observe(&self, env: &dyn Env) {
        if self.constant {
            let _ = self.eval_const(env, true);
        } else {
            let _ = self.eval(env, true);
        }
    }

    pub fn last_value(&self) -> Option<Value> {
        self.last_value.borrow().clone()
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Re-evaluate (non-constant variables only) and report whether the
    /// fresh result differs from `last_value`, swapping it in on the way.
    /// The timer service's periodic scan (§4.F/§4.H) uses this return
    /// value to decide whether to dispatch a `change` event.
    pub fn rescan(&self, env: &dyn Env) -> bool {
        if self.constant {
            return false;
        }
        let fresh = match eval(&self.expr, env, true) {
            Ok(value) => value,
            Err(_) => Value::Undefined,
        };
        let mut last = self.last_value.borrow_mut();
        let changed = last.as_ref() != Some(&fresh);
        *last = Some(fresh);
        changed
    }
}

impl Native for ExprVar {
    fn type_name(&self) -> &str {
        "expression-variable"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use hvml_expr::Error as ExprError;

    use super::*;

    struct TestEnv(RefCell<HashMap<&'static str, Value>>);

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
    fn non_constant_rescan_detects_change() {
        let env = TestEnv(RefCell::new(HashMap::from([("x", Value::Int(1))])));
        let var = ExprVar::new(Expr::Var {
            name: "x".into(),
            qualified: false,
        });

        var.on_observe(&env);
        assert!(!var.rescan(&env), "value has not changed yet");

        env.0.borrow_mut().insert("x", Value::Int(2));
        assert!(var.rescan(&env), "value changed from 1 to 2");
        assert!(!var.rescan(&env), "no further change since last rescan");
    }

    #[test]
    fn constant_getter_memoizes_first_result() {
        let env = TestEnv(RefCell::new(HashMap::from([("x", Value::Int(1))])));
        let var = ExprVar::new_constant(Expr::Var {
            name: "x".into(),
            qualified: false,
        });

        assert_eq!(var.eval_const(&env, false).unwrap(), Value::Int(1));
        env.0.borrow_mut().insert("x", Value::Int(99));
        assert_eq!(var.eval_const(&env, false).unwrap(), Value::Int(1));
    }
}
