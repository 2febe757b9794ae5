//! Type inspection and conversion: len, type, str, num
//!
//! - `len`: length of a string (in characters), array, or object
//! - `type`: type name as a string
//! - `str`: canonical display form
//! - `num`: convert a numeric string to a number

use crate::builtins::positional;
use crate::env::Environment;
use crate::value::Value;
use std::rc::Rc;

fn single_arg(args: &indexmap::IndexMap<String, Value>, name: &str) -> Result<Value, String> {
    positional(args)
        .into_iter()
        .next()
        .ok_or_else(|| format!("{}: expected 1 argument", name))
}

/// Register type built-ins in the environment.
pub fn register(env: &Rc<Environment>) {
    env.define(
        "len",
        Value::native("len", |args| {
            let value = single_arg(args, "len")?;
            match value {
                Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
                Value::Object(entries) => Ok(Value::Number(entries.borrow().len() as f64)),
                other => Err(format!(
                    "len: expected string, array, or object, got {}",
                    other.type_name()
                )),
            }
        }),
    );

    env.define(
        "type",
        Value::native("type", |args| {
            let value = single_arg(args, "type")?;
            Ok(Value::Str(value.type_name().to_string()))
        }),
    );

    env.define(
        "str",
        Value::native("str", |args| {
            let value = single_arg(args, "str")?;
            Ok(Value::Str(value.to_string()))
        }),
    );

    env.define(
        "num",
        Value::native("num", |args| {
            let value = single_arg(args, "num")?;
            match value {
                Value::Number(n) => Ok(Value::Number(n)),
                Value::Str(s) => match s.trim().parse::<f64>() {
                    Ok(n) => Ok(Value::Number(n)),
                    Err(_) => Err(format!("num: cannot convert '{}' to number", s)),
                },
                other => Err(format!(
                    "num: expected number or string, got {}",
                    other.type_name()
                )),
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    fn call(env: &Rc<Environment>, name: &str, arg: Value) -> Result<Value, String> {
        match env.get(name) {
            Some(Value::Native(native)) => {
                let args = indexmap! { "0".to_string() => arg };
                (native.func)(&args)
            }
            other => panic!("Expected native {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_len() {
        let env = Environment::new();
        register(&env);
        assert_eq!(
            call(&env, "len", Value::Str("héllo".to_string())),
            Ok(Value::Number(5.0))
        );
        assert_eq!(
            call(&env, "len", Value::array(vec![Value::Nil, Value::Nil])),
            Ok(Value::Number(2.0))
        );
        assert!(call(&env, "len", Value::Number(1.0)).is_err());
    }

    #[test]
    fn test_type_names() {
        let env = Environment::new();
        register(&env);
        assert_eq!(
            call(&env, "type", Value::Nil),
            Ok(Value::Str("nil".to_string()))
        );
        assert_eq!(
            call(&env, "type", Value::array(vec![])),
            Ok(Value::Str("array".to_string()))
        );
    }

    #[test]
    fn test_str_uses_display_form() {
        let env = Environment::new();
        register(&env);
        assert_eq!(
            call(&env, "str", Value::Number(42.0)),
            Ok(Value::Str("42".to_string()))
        );
    }

    #[test]
    fn test_num_parses_and_rejects() {
        let env = Environment::new();
        register(&env);
        assert_eq!(
            call(&env, "num", Value::Str(" 2.5 ".to_string())),
            Ok(Value::Number(2.5))
        );
        assert!(call(&env, "num", Value::Str("abc".to_string())).is_err());
    }
}
