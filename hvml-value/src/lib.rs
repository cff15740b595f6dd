//! Component A: the value substrate.
//!
//! A [`Value`] is a tagged union over the primitive and container kinds an
//! HVML expression can produce. Containers are reference-counted
//! (`Rc<RefCell<_>>`) rather than arena-indexed: unlike the scoped variable
//! maps or the frame stack, values routinely escape into user-held
//! [`Dynamic`]/[`Native`] closures and outlive any one coroutine step, so an
//! `Rc` that drops the value when the last holder goes away is the simpler
//! invariant to keep. Cross-thread handoff is not supported here by design
//! (§5): a `Value` travelling between interpreter instances must go through
//! `post_routine`, which re-materialises it on the destination thread.

mod compare;
mod container;
mod dynamic;
mod error;
mod listener;
mod native;

pub use compare::{Mode, compare};
pub use container::{Array, Change, ContainerKey, Object, Set};
pub use dynamic::Dynamic;
pub use error::Error;
pub use listener::{ListenerHandle, Listener};
pub use native::Native;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The dynamic type tag of a [`Value`], usable without matching on the full
/// enum (e.g. from a [`Native`] vtable operation).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    Undefined,
    Null,
    Bool,
    Int,
    UInt,
    Float,
    Str,
    Bytes,
    Array,
    Object,
    Set,
    Dynamic,
    Native,
}

/// A tagged union over every value kind an expression can produce.
///
/// Cloning a `Value` is cheap: scalars are `Copy`/small, strings and byte
/// sequences are `Rc`-shared, and containers share their backing storage so
/// every clone observes the same mutations and the same listeners.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    Array(Rc<RefCell<Array>>),
    Object(Rc<RefCell<Object>>),
    Set(Rc<RefCell<Set>>),
    Dynamic(Rc<Dynamic>),
    Native(Rc<dyn Native>),
}

impl Value {
    pub fn make_array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(Array::new(items))))
    }

    pub fn make_object() -> Self {
        Value::Object(Rc::new(RefCell::new(Object::new())))
    }

    pub fn make_set(key_field: impl Into<Rc<str>>) -> Self {
        Value::Set(Rc::new(RefCell::new(Set::new(key_field.into()))))
    }

    pub fn make_str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn get_type(&self) -> Type {
        match self {
            Value::Undefined => Type::Undefined,
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::UInt(_) => Type::UInt,
            Value::Float(_) => Type::Float,
            Value::Str(_) => Type::Str,
            Value::Bytes(_) => Type::Bytes,
            Value::Array(_) => Type::Array,
            Value::Object(_) => Type::Object,
            Value::Set(_) => Type::Set,
            Value::Dynamic(_) => Type::Dynamic,
            Value::Native(_) => Type::Native,
        }
    }

    /// Resolve one level of [`Dynamic`] indirection. Calls into the
    /// dynamic's getter, which may have side effects (§4.B).
    pub fn resolve(&self) -> Value {
        match self {
            Value::Dynamic(d) => d.get(),
            other => other.clone(),
        }
    }

    pub fn cast_to_bool(&self) -> bool {
        match self.resolve() {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
            Value::UInt(u) => u != 0,
            Value::Float(f) => f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Object(o) => !o.borrow().is_empty(),
            Value::Set(s) => !s.borrow().is_empty(),
            Value::Dynamic(_) => unreachable!("resolved above"),
            Value::Native(_) => true,
        }
    }

    pub fn cast_to_numeric(&self) -> Result<f64, Error> {
        match self.resolve() {
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            Value::Float(f) => Ok(f),
            Value::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
            Value::Str(s) => s.trim().parse::<f64>().map_err(|_| Error::InvalidValue),
            Value::Undefined | Value::Null => Ok(0.0),
            _ => Err(Error::BadArg),
        }
    }

    pub fn cast_to_string(&self) -> Rc<str> {
        match self.resolve() {
            Value::Str(s) => s,
            Value::Undefined => Rc::from("undefined"),
            Value::Null => Rc::from("null"),
            Value::Bool(b) => Rc::from(if b { "true" } else { "false" }),
            Value::Int(i) => Rc::from(i.to_string()),
            Value::UInt(u) => Rc::from(u.to_string()),
            Value::Float(f) => Rc::from(f.to_string()),
            Value::Bytes(b) => Rc::from(String::from_utf8_lossy(&b).into_owned()),
            Value::Array(_) => Rc::from("[array]"),
            Value::Object(_) => Rc::from("[object]"),
            Value::Set(_) => Rc::from("[set]"),
            Value::Dynamic(_) => unreachable!("resolved above"),
            Value::Native(n) => Rc::from(n.type_name().to_string()),
        }
    }

    /// Register a post-mutation listener on a container value. No-op (and
    /// returns `None`) for non-container values.
    pub fn register_post_listener(&self, listener: Listener) -> Option<ListenerHandle> {
        match self {
            Value::Array(a) => Some(a.borrow_mut().listeners.register(listener)),
            Value::Object(o) => Some(o.borrow_mut().listeners.register(listener)),
            Value::Set(s) => Some(s.borrow_mut().listeners.register(listener)),
            _ => None,
        }
    }

    pub fn revoke_listener(&self, handle: ListenerHandle) {
        match self {
            Value::Array(a) => a.borrow_mut().listeners.revoke(handle),
            Value::Object(o) => o.borrow_mut().listeners.revoke(handle),
            Value::Set(s) => s.borrow_mut().listeners.revoke(handle),
            _ => (),
        }
    }

    /// True if `self` and `other` are the same container/dynamic/native
    /// instance (pointer identity), used by the observer bus to match a
    /// dispatch's source against a registered observer's observed value.
    pub fn is_same_instance(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Dynamic(a), Value::Dynamic(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    /// Scalars compare by value; containers, dynamics and natives compare
    /// by identity (the same rule `is_same_instance` uses), since two
    /// distinct arrays holding the same elements are not "the same value"
    /// for observer-matching purposes.
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            _ => self.is_same_instance(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Value::Array(a) => write!(f, "array[{}]", a.borrow().len()),
            Value::Object(o) => write!(f, "object[{}]", o.borrow().len()),
            Value::Set(s) => write!(f, "set[{}]", s.borrow().len()),
            Value::Dynamic(_) => write!(f, "<dynamic>"),
            Value::Native(n) => write!(f, "<native {}>", n.type_name()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clone_shares_container_storage() {
        let value = Value::make_array(vec![Value::Int(1)]);
        let clone = value.clone();
        if let Value::Array(a) = &clone {
            a.borrow_mut().push(Value::Int(2));
        }
        let Value::Array(a) = &value else { unreachable!() };
        assert_eq!(a.borrow().len(), 2);
    }

    #[test]
    fn cast_to_bool_matches_emptiness() {
        assert!(!Value::Undefined.cast_to_bool());
        assert!(!Value::make_str("").cast_to_bool());
        assert!(Value::make_str("x").cast_to_bool());
        assert!(!Value::make_array(vec![]).cast_to_bool());
    }
}
