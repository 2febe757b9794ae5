//! Console output: print
//!
//! `print` writes the display form of each argument, separated by spaces
//! and terminated by a newline, to the interpreter's output sink. The
//! host reads the sink back through `Interpreter::get_output`.

use crate::builtins::positional;
use crate::env::Environment;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Register console built-ins in the environment.
pub fn register(env: &Rc<Environment>, output: &Rc<RefCell<String>>) {
    let sink = output.clone();
    env.define(
        "print",
        Value::native("print", move |args| {
            let mut line = String::new();
            for (i, value) in positional(args).iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                line.push_str(&value.to_string());
            }
            line.push('\n');
            sink.borrow_mut().push_str(&line);
            Ok(Value::Nil)
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    fn call_print(env: &Rc<Environment>, args: indexmap::IndexMap<String, Value>) {
        match env.get("print") {
            Some(Value::Native(native)) => {
                (native.func)(&args).unwrap();
            }
            other => panic!("Expected native print, got {:?}", other),
        }
    }

    #[test]
    fn test_print_writes_to_sink_with_newline() {
        let env = Environment::new();
        let output = Rc::new(RefCell::new(String::new()));
        register(&env, &output);

        call_print(&env, indexmap! { "0".to_string() => Value::Number(42.0) });
        assert_eq!(*output.borrow(), "42\n");
    }

    #[test]
    fn test_print_joins_arguments_with_spaces() {
        let env = Environment::new();
        let output = Rc::new(RefCell::new(String::new()));
        register(&env, &output);

        call_print(
            &env,
            indexmap! {
                "0".to_string() => Value::Str("a".to_string()),
                "1".to_string() => Value::Bool(true),
            },
        );
        assert_eq!(*output.borrow(), "a true\n");
    }
}
