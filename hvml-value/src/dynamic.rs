use std::rc::Rc;

use crate::{Error, Value};

/// A dynamic value: a pair of getter/setter callables (§3). Expression
/// variables (`hvml-exprvar`) are the primary producer of these, but any
/// collaborator bridging external reactive state (e.g. `$DATETIME`) can
/// wrap a plain closure the same way.
pub struct Dynamic {
    getter: Rc<dyn Fn() -> Value>,
    setter: Option<Rc<dyn Fn(Value) -> Result<(), Error>>>,
}

impl Dynamic {
    pub fn new(getter: impl Fn() -> Value + 'static) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: None,
        }
    }

    pub fn with_setter(
        getter: impl Fn() -> Value + 'static,
        setter: impl Fn(Value) -> Result<(), Error> + 'static,
    ) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: Some(Rc::new(setter)),
        }
    }

    pub fn get(&self) -> Value {
        (self.getter)()
    }

    pub fn set(&self, value: Value) -> Result<(), Error> {
        match &self.setter {
            Some(setter) => setter(value),
            None => Err(Error::NotAllowed),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn getter_reevaluates_each_call() {
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        let dynamic = Dynamic::new(move || {
            c.set(c.get() + 1);
            Value::Int(c.get())
        });

        let Value::Int(first) = dynamic.get() else { unreachable!() };
        let Value::Int(second) = dynamic.get() else { unreachable!() };
        assert_eq!((first, second), (1, 2));
    }

    #[test]
    fn setter_defaults_to_not_allowed() {
        let dynamic = Dynamic::new(|| Value::Undefined);
        assert_eq!(dynamic.set(Value::Int(1)), Err(Error::NotAllowed));
    }
}
