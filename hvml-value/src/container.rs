use std::rc::Rc;

#[cfg(test)]
use std::cell::RefCell;

use crate::listener::ListenerList;
use crate::{Error, Value};

/// The key a [`Change`] refers to: either a numeric array/set index or an
/// object field name.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerKey {
    Index(usize),
    Name(Rc<str>),
}

/// One post-mutation notification, fired after `grow`, `shrink` or
/// `change` (§3 "Every container additionally supports post-mutation
/// listeners").
#[derive(Debug, Clone)]
pub enum Change {
    Grow { key: ContainerKey, value: Value },
    Shrink { key: ContainerKey, value: Value },
    Changed { key: ContainerKey, before: Value, after: Value },
}

/// An ordered array container.
pub struct Array {
    items: Vec<Value>,
    pub(crate) listeners: ListenerList,
}

impl Array {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            listeners: ListenerList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn push(&mut self, value: Value) {
        let key = ContainerKey::Index(self.items.len());
        self.items.push(value.clone());
        self.listeners.fire(&Change::Grow { key, value });
    }

    pub fn remove(&mut self, index: usize) -> Result<Value, Error> {
        if index >= self.items.len() {
            return Err(Error::NotExists);
        }
        let value = self.items.remove(index);
        self.listeners.fire(&Change::Shrink {
            key: ContainerKey::Index(index),
            value: value.clone(),
        });
        Ok(value)
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), Error> {
        let slot = self.items.get_mut(index).ok_or(Error::NotExists)?;
        let before = slot.clone();
        *slot = value.clone();
        self.listeners.fire(&Change::Changed {
            key: ContainerKey::Index(index),
            before,
            after: value,
        });
        Ok(())
    }
}

/// An insertion-ordered object: `keys are strings, unique`, redefinition
/// replaces in place without moving the key's position (§3 "Scope" carries
/// the same rule for bindings; objects are the value-level analogue).
pub struct Object {
    entries: Vec<(Rc<str>, Value)>,
    pub(crate) listeners: ListenerList,
}

impl Object {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            listeners: ListenerList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Insert or replace `key`. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            let before = std::mem::replace(&mut entry.1, value.clone());
            self.listeners.fire(&Change::Changed {
                key: ContainerKey::Name(key),
                before: before.clone(),
                after: value,
            });
            Some(before)
        } else {
            self.entries.push((key.clone(), value.clone()));
            self.listeners.fire(&Change::Grow {
                key: ContainerKey::Name(key),
                value,
            });
            None
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| &**k == key)?;
        let (key, value) = self.entries.remove(pos);
        self.listeners.fire(&Change::Shrink {
            key: ContainerKey::Name(key),
            value: value.clone(),
        });
        Some(value)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of objects, keyed by a configured field name (§3). `$TIMERS` is the
/// canonical instance: each member is an object with `id`/`interval`/
/// `active` fields, keyed by `id`.
pub struct Set {
    key_field: Rc<str>,
    items: Vec<Value>,
    pub(crate) listeners: ListenerList,
}

impl Set {
    pub fn new(key_field: Rc<str>) -> Self {
        Self {
            key_field,
            items: Vec::new(),
            listeners: ListenerList::new(),
        }
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    fn key_of(&self, member: &Value) -> Option<Rc<str>> {
        let Value::Object(obj) = member else { return None };
        let obj = obj.borrow();
        obj.get(&self.key_field).map(|v| v.cast_to_string())
    }

    pub fn find(&self, key: &str) -> Option<&Value> {
        self.items.iter().find(|member| self.key_of(member).as_deref() == Some(key))
    }

    /// Insert a new member. Fires `Grow`. Members with a duplicate key
    /// replace the previous member and fire `Changed` instead.
    pub fn insert(&mut self, member: Value) {
        let Some(key) = self.key_of(&member) else { return };
        if let Some(pos) = self.items.iter().position(|m| self.key_of(m).as_deref() == Some(&*key)) {
            let before = self.items[pos].clone();
            self.items[pos] = member.clone();
            self.listeners.fire(&Change::Changed {
                key: ContainerKey::Name(key),
                before,
                after: member,
            });
        } else {
            self.items.push(member.clone());
            self.listeners.fire(&Change::Grow {
                key: ContainerKey::Name(key),
                value: member,
            });
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.items.iter().position(|m| self.key_of(m).as_deref() == Some(key))?;
        let value = self.items.remove(pos);
        self.listeners.fire(&Change::Shrink {
            key: ContainerKey::Name(Rc::from(key)),
            value: value.clone(),
        });
        Some(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_replace_fires_changed_not_grow() {
        use std::cell::RefCell;

        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut object = Object::new();
        let recorder = fired.clone();
        object.listeners.register(Rc::new(move |c: &Change| {
            recorder.borrow_mut().push(match c {
                Change::Grow { .. } => "grow",
                Change::Shrink { .. } => "shrink",
                Change::Changed { .. } => "changed",
            });
        }));

        object.insert("a", Value::Int(1));
        object.insert("a", Value::Int(2));

        assert_eq!(*fired.borrow(), vec!["grow", "changed"]);
    }

    #[test]
    fn set_keyed_insert_dedups_by_field() {
        let mut set = Set::new(Rc::from("id"));
        let mut member = Object::new();
        member.insert("id", Value::make_str("t"));
        member.insert("interval", Value::Int(50));
        set.insert(Value::Object(Rc::new(RefCell::new(member))));
        assert_eq!(set.len(), 1);

        let mut replacement = Object::new();
        replacement.insert("id", Value::make_str("t"));
        replacement.insert("interval", Value::Int(20));
        set.insert(Value::Object(Rc::new(RefCell::new(replacement))));
        assert_eq!(set.len(), 1);
    }
}
