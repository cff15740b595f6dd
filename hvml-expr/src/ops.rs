use hvml_value::Value;

use crate::Error;

/// The tokenised binary operators on strings (§4.B, §6, and the operator
/// table spelled out in `SPEC_FULL.md` §2.B). Numeric operands fall
/// through to ordinary arithmetic for `Add`/`Sub`/`Mul`/`Div`; `Concat`,
/// `SplitHead` and `SplitTail` only make sense on strings and coerce
/// numeric operands to their decimal rendering first.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StringOp {
    /// `+`: numeric add, or string concat with a single space separator.
    Add,
    /// `-`: numeric sub, or remove every whitespace-separated rhs token
    /// from the lhs.
    Sub,
    /// `*`: numeric mul, or repeat the lhs string rhs times.
    Mul,
    /// `~`: concatenate with no separator.
    Concat,
    /// `/`: numeric div, or split lhs on the first occurrence of rhs,
    /// keeping the head.
    SplitHead,
    /// `^`: split lhs on the first occurrence of rhs, keeping the tail.
    SplitTail,
    /// `$`: string-template interpolation merge.
    Interpolate,
}

pub fn apply_string_op(op: StringOp, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    use StringOp::*;

    if let (Some(lhs_num), Some(rhs_num)) = (as_pure_numeric(lhs), as_pure_numeric(rhs)) {
        if let Some(result) = numeric_op(op, lhs_num, rhs_num) {
            return Ok(result);
        }
    }

    let lhs = lhs.cast_to_string();
    let rhs = rhs.cast_to_string();

    let result = match op {
        Add => format!("{lhs} {rhs}"),
        Sub => {
            let tokens: Vec<&str> = rhs.split_whitespace().collect();
            lhs.split_whitespace()
                .filter(|tok| !tokens.contains(tok))
                .collect::<Vec<_>>()
                .join(" ")
        }
        Mul => {
            let count = rhs.parse::<usize>().map_err(|_| Error::BadArg)?;
            lhs.repeat(count)
        }
        Concat => format!("{lhs}{rhs}"),
        SplitHead => match lhs.find(&*rhs) {
            Some(pos) => lhs[..pos].to_string(),
            None => lhs.to_string(),
        },
        SplitTail => match lhs.find(&*rhs) {
            Some(pos) => lhs[pos + rhs.len()..].to_string(),
            None => String::new(),
        },
        Interpolate => lhs.replacen("$0", &rhs, 1),
    };

    Ok(Value::make_str(result))
}

/// `Value::Int`/`UInt`/`Float` only — strings that merely parse as numbers
/// should still go through the string-operator semantics above (`"3" + "4"`
/// is `"3 4"`, not `7`), so this deliberately does not call
/// `cast_to_numeric`.
fn as_pure_numeric(value: &Value) -> Option<f64> {
    match value.resolve() {
        Value::Int(i) => Some(i as f64),
        Value::UInt(u) => Some(u as f64),
        Value::Float(f) => Some(f),
        _ => None,
    }
}

fn numeric_op(op: StringOp, lhs: f64, rhs: f64) -> Option<Value> {
    use StringOp::*;
    let result = match op {
        Add => lhs + rhs,
        Sub => lhs - rhs,
        Mul => lhs * rhs,
        SplitHead => {
            if rhs == 0.0 {
                return None;
            }
            lhs / rhs
        }
        Concat | SplitTail | Interpolate => return None,
    };

    if result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
        Some(Value::Int(result as i64))
    } else {
        Some(Value::Float(result))
    }
}
