use std::any::Any;

use crate::{Error, Value};

/// An opaque payload plus a vtable of operations (§3 "native (an opaque
/// payload plus a vtable of operations)"). `hvml-exprvar`'s expression
/// variable and `hvml-timer`'s reactive timer bookkeeping are both native
/// values under the hood.
pub trait Native: Any {
    fn type_name(&self) -> &str;

    /// Invoke a named operation with positional arguments. Unknown
    /// operation names return `Error::NotImplemented`.
    fn call(&self, op: &str, args: &[Value]) -> Result<Value, Error> {
        let _ = (op, args);
        Err(Error::NotImplemented)
    }

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod test {
    use super::*;

    struct Counter(std::cell::Cell<i64>);

    impl Native for Counter {
        fn type_name(&self) -> &str {
            "counter"
        }

        fn call(&self, op: &str, _args: &[Value]) -> Result<Value, Error> {
            match op {
                "incr" => {
                    self.0.set(self.0.get() + 1);
                    Ok(Value::Int(self.0.get()))
                }
                _ => Err(Error::NotImplemented),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn call_dispatches_by_name() {
        let counter = Counter(std::cell::Cell::new(0));
        assert_eq!(counter.call("incr", &[]).unwrap().get_type(), crate::Type::Int);
        assert_eq!(counter.call("nope", &[]), Err(Error::NotImplemented));
    }
}
