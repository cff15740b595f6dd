//! Tokenised attribute operators (§6): `=`, `+=`, `-=`, `%=`, `~=`, `^=`,
//! `$=`, each acting on whitespace-separated tokens of a string attribute
//! value. Sibling to `hvml_expr::ops::StringOp`, which applies the same
//! "tokenised" philosophy to expression binary operators rather than
//! attribute assignment.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttrOp {
    /// `=`: replace the attribute outright.
    Assign,
    /// `+=`: append any token from the operand missing from the current
    /// value, in operand order.
    TokenAdd,
    /// `-=`: remove every token present in the operand.
    TokenRemove,
    /// `%=`: treat the operand as `pattern/replacement` and regex-replace.
    RegexReplace,
    /// `~=`: replace the first token equal to the operand, precisely.
    PreciseReplace,
    /// `^=`: prepend the operand's tokens before the existing value.
    HeadPrepend,
    /// `$=`: append the operand's tokens after the existing value.
    TailAppend,
}

pub fn apply_attr_op(current: &str, op: AttrOp, operand: &str) -> String {
    let mut tokens: Vec<&str> = current.split_whitespace().collect();

    match op {
        AttrOp::Assign => return operand.to_string(),
        AttrOp::TokenAdd => {
            for token in operand.split_whitespace() {
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        AttrOp::TokenRemove => {
            let removed: Vec<&str> = operand.split_whitespace().collect();
            tokens.retain(|t| !removed.contains(t));
        }
        AttrOp::RegexReplace => {
            let Some((pattern, replacement)) = operand.split_once('/') else {
                return current.to_string();
            };
            return match regex_lite_replace(current, pattern, replacement) {
                Some(replaced) => replaced,
                None => current.to_string(),
            };
        }
        AttrOp::PreciseReplace => {
            if let Some(slot) = tokens.iter_mut().find(|t| **t == operand) {
                *slot = operand;
            } else {
                tokens.push(operand);
            }
        }
        AttrOp::HeadPrepend => {
            let mut prefixed: Vec<&str> = operand.split_whitespace().collect();
            prefixed.extend(tokens);
            tokens = prefixed;
        }
        AttrOp::TailAppend => {
            tokens.extend(operand.split_whitespace());
        }
    }

    tokens.join(" ")
}

/// Tiny literal-substring replace used for `%=` so this crate doesn't need
/// a regex dependency just for attribute token surgery; the expression
/// evaluator's own tokenised operators (`hvml-expr`) already carry `regex`
/// for `sub_type_pattern` matching, but attribute values rarely need full
/// regex syntax, only "replace this literal run".
fn regex_lite_replace(haystack: &str, pattern: &str, replacement: &str) -> Option<String> {
    if pattern.is_empty() {
        return None;
    }
    Some(haystack.replacen(pattern, replacement, 1))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_add_skips_duplicates() {
        assert_eq!(apply_attr_op("a b", AttrOp::TokenAdd, "b c"), "a b c");
    }

    #[test]
    fn token_remove_drops_every_match() {
        assert_eq!(apply_attr_op("a b c", AttrOp::TokenRemove, "b"), "a c");
    }

    #[test]
    fn head_prepend_and_tail_append() {
        assert_eq!(apply_attr_op("b", AttrOp::HeadPrepend, "a"), "a b");
        assert_eq!(apply_attr_op("a", AttrOp::TailAppend, "b"), "a b");
    }

    #[test]
    fn assign_replaces_outright() {
        assert_eq!(apply_attr_op("a b", AttrOp::Assign, "c"), "c");
    }
}
