//! Symbol variables (§3 "seven symbol variables indexed by a small fixed
//! set"): per-frame shorthand slots resolved without a scope-chain walk.

use hvml_value::Value;

use crate::ElementId;

/// The fixed set of symbol-variable slots (`?`, `@`, `!`, `%`, `<`, plus two
/// reserved for future keyword forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSlot {
    /// `?`: the result of the immediately preceding evaluation.
    Question,
    /// `@`: an elements-reference to the current DOM insertion point.
    At,
    /// `!`: the frame's evaluated attribute map, exposed as a value.
    Exclaim,
    /// `%`: the zero-based index of the current iteration/child.
    Percent,
    /// `<`: the nearest enclosing `match`'s matched branch marker.
    LessThan,
    Reserved1,
    Reserved2,
}

const SLOT_COUNT: usize = 7;

/// A frame's seven symbol-variable slots (§3, §4.E).
#[derive(Debug, Clone)]
pub struct SymbolVars {
    slots: [Value; SLOT_COUNT],
}

impl SymbolVars {
    /// `%` defaults to unsigned `0`; `@` to an elements-reference to the
    /// parent's DOM point (or `undefined` if there is none); `!` to an
    /// empty object; everything else to `undefined` (§3 "Symbol-variable
    /// defaults").
    pub fn defaults(parent_edom_element: Option<ElementId>) -> Self {
        let at = match parent_edom_element {
            Some(id) => Value::UInt(id.0),
            None => Value::Undefined,
        };
        Self {
            slots: [
                Value::Undefined,  // ?
                at,                // @
                Value::make_object(), // !
                Value::UInt(0),    // %
                Value::Undefined,  // <
                Value::Undefined,
                Value::Undefined,
            ],
        }
    }

    pub fn get(&self, slot: SymbolSlot) -> &Value {
        &self.slots[slot as usize]
    }

    pub fn set(&mut self, slot: SymbolSlot, value: Value) {
        self.slots[slot as usize] = value;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn percent_defaults_to_zero_and_at_is_undefined_without_a_parent() {
        let vars = SymbolVars::defaults(None);
        assert_eq!(vars.get(SymbolSlot::Percent), &Value::UInt(0));
        assert_eq!(vars.get(SymbolSlot::At), &Value::Undefined);
    }

    #[test]
    fn at_resolves_to_parent_dom_point() {
        let vars = SymbolVars::defaults(Some(ElementId(7)));
        assert_eq!(vars.get(SymbolSlot::At), &Value::UInt(7));
    }
}
