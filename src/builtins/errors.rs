//! Error raising: throw
//!
//! `throw(msg)` raises a runtime error carrying the display form of its
//! argument. A surrounding `try` binds exactly that message to the catch
//! variable.

use crate::builtins::positional;
use crate::env::Environment;
use crate::value::Value;
use std::rc::Rc;

/// Register error built-ins in the environment.
pub fn register(env: &Rc<Environment>) {
    env.define(
        "throw",
        Value::native("throw", |args| {
            match positional(args).first() {
                Some(value) => Err(value.to_string()),
                None => Err("throw: expected a message".to_string()),
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_throw_returns_message_as_error() {
        let env = Environment::new();
        register(&env);
        match env.get("throw") {
            Some(Value::Native(native)) => {
                let args = indexmap! { "0".to_string() => Value::Str("bad input".to_string()) };
                assert_eq!((native.func)(&args), Err("bad input".to_string()));
            }
            other => panic!("Expected native throw, got {:?}", other),
        }
    }
}
