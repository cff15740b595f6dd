//! Component B: the expression evaluator.
//!
//! An [`Expr`] tree is immutable and evaluation is pure with respect to the
//! coroutine's scopes — calls into dynamic/native values are the only
//! place side effects can creep in (§3/§4.B). This crate does not know
//! about frames or coroutines; it only needs an [`Env`] capable of
//! resolving names and qualified roots, which `hvml-frame` implements on
//! top of `hvml-scope`.

mod error;
mod ops;
mod template;

pub use error::Error;
pub use ops::{StringOp, apply_string_op};
pub use template::Segment;

use std::rc::Rc;

use hvml_value::Value;

/// A name lookup environment. `hvml-frame` implements this over the
/// current frame's scope chain and the document's bindings.
pub trait Env {
    /// Resolve an unqualified name: search the lexical ancestor chain from
    /// the current frame upward, then document-level bindings (§4.B).
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Resolve a qualified name (`$NAME.path`); qualified names bind the
    /// root only, skipping the ancestor walk (§4.B).
    fn lookup_root(&self, name: &str) -> Option<Value>;

    /// Invoke a function by name with already-evaluated arguments.
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error>;
}

/// An immutable expression tree node (§3 "Expression tree").
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// An array/object constructor; each element is itself an expression.
    Array(Vec<Expr>),
    Object(Vec<(Rc<str>, Expr)>),
    /// An unqualified or qualified variable reference.
    Var { name: Rc<str>, qualified: bool },
    /// `base.path` / `base[index]` access.
    Property { base: Box<Expr>, path: Box<Expr> },
    Call { name: Rc<str>, args: Vec<Expr> },
    /// A string template with interpolated sub-expressions, e.g. `"a{$b}c"`.
    Template(Vec<Segment<Expr>>),
    /// `lhs OP rhs` where `OP` is one of the tokenised string operators
    /// (§4.B, §6) or ordinary numeric arithmetic.
    BinOp { op: StringOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Not(Box<Expr>),
    /// A handful of keyword forms the source language provides
    /// (`$L.not`, conditional `$L.if`-style forms, and similar); modeled
    /// generically so new keywords do not require an `Expr` variant.
    Keyword { name: Rc<str>, args: Vec<Expr> },
}

/// Evaluate `expr` against `env`. `silently` downgrades recoverable
/// evaluation errors to `Value::Undefined` rather than propagating them
/// (§4.B, §7).
pub fn eval(expr: &Expr, env: &dyn Env, silently: bool) -> Result<Value, Error> {
    match eval_inner(expr, env) {
        Ok(value) => Ok(value),
        Err(err) if silently && err.is_recoverable() => Ok(Value::Undefined),
        Err(err) => Err(err),
    }
}

fn eval_inner(expr: &Expr, env: &dyn Env) -> Result<Value, Error> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Array(items) => {
            let values = items.iter().map(|e| eval_inner(e, env)).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::make_array(values))
        }
        Expr::Object(fields) => {
            let object = Value::make_object();
            if let Value::Object(map) = &object {
                for (key, value_expr) in fields {
                    let value = eval_inner(value_expr, env)?;
                    map.borrow_mut().insert(key.clone(), value);
                }
            }
            Ok(object)
        }
        Expr::Var { name, qualified } => {
            let found = if *qualified { env.lookup_root(name) } else { env.lookup(name) };
            found.ok_or_else(|| Error::NotExists(name.to_string()))
        }
        Expr::Property { base, path } => {
            let base = eval_inner(base, env)?;
            let path = eval_inner(path, env)?;
            index_into(&base, &path)
        }
        Expr::Call { name, args } => {
            let args = args.iter().map(|e| eval_inner(e, env)).collect::<Result<Vec<_>, _>>()?;
            env.call(name, &args)
        }
        Expr::Template(segments) => {
            let mut out = String::new();
            for segment in segments {
                match segment {
                    Segment::Literal(text) => out.push_str(text),
                    Segment::Expr(e) => {
                        let value = eval_inner(e, env)?;
                        out.push_str(&value.cast_to_string());
                    }
                }
            }
            Ok(Value::make_str(out))
        }
        Expr::BinOp { op, lhs, rhs } => {
            let lhs = eval_inner(lhs, env)?;
            let rhs = eval_inner(rhs, env)?;
            apply_string_op(*op, &lhs, &rhs)
        }
        Expr::Not(inner) => Ok(Value::Bool(!eval_inner(inner, env)?.cast_to_bool())),
        Expr::Keyword { name, .. } => Err(Error::NotImplemented(name.to_string())),
    }
}

fn index_into(base: &Value, path: &Value) -> Result<Value, Error> {
    match base.resolve() {
        Value::Object(map) => {
            let key = path.cast_to_string();
            map.borrow().get(&key).cloned().ok_or_else(|| Error::NotExists(key.to_string()))
        }
        Value::Array(arr) => {
            let index = path.cast_to_numeric()? as i64;
            if index < 0 {
                return Err(Error::BadArg);
            }
            arr.borrow()
                .get(index as usize)
                .cloned()
                .ok_or_else(|| Error::NotExists(index.to_string()))
        }
        Value::Set(set) => {
            let key = path.cast_to_string();
            set.borrow().find(&key).cloned().ok_or_else(|| Error::NotExists(key.to_string()))
        }
        Value::Undefined | Value::Null => Err(Error::NotExists(path.cast_to_string().to_string())),
        _ => Err(Error::BadArg),
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    struct TestEnv(HashMap<&'static str, Value>);

    impl Env for TestEnv {
        fn lookup(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }

        fn lookup_root(&self, name: &str) -> Option<Value> {
            self.lookup(name)
        }

        fn call(&self, _name: &str, _args: &[Value]) -> Result<Value, Error> {
            Err(Error::NotImplemented("call".into()))
        }
    }

    #[test]
    fn literal_roundtrips() {
        let env = TestEnv(HashMap::new());
        let expr = Expr::Literal(Value::Int(42));
        assert_eq!(eval(&expr, &env, false).unwrap(), Value::Int(42));
    }

    #[test]
    fn missing_var_propagates_unless_silent() {
        let env = TestEnv(HashMap::new());
        let expr = Expr::Var {
            name: Rc::from("missing"),
            qualified: false,
        };
        assert!(eval(&expr, &env, false).is_err());
        assert_eq!(eval(&expr, &env, true).unwrap(), Value::Undefined);
    }

    #[test]
    fn property_access_into_object() {
        let mut vars = HashMap::new();
        let object = Value::make_object();
        if let Value::Object(map) = &object {
            map.borrow_mut().insert("name", Value::make_str("ok"));
        }
        vars.insert("doc", object);
        let env = TestEnv(vars);

        let expr = Expr::Property {
            base: Box::new(Expr::Var {
                name: Rc::from("doc"),
                qualified: false,
            }),
            path: Box::new(Expr::Literal(Value::make_str("name"))),
        };

        let Value::Str(s) = eval(&expr, &env, false).unwrap() else {
            panic!("expected string")
        };
        assert_eq!(&*s, "ok");
    }
}
