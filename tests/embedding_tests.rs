// ABOUTME: Host embedding API: registration, modules, output capture, cancellation

use duso::interpreter::{Interpreter, NativeHandler};
use duso::value::Value;
use indexmap::IndexMap;
use std::sync::atomic::Ordering;

#[test]
fn test_register_function_positional_keys() {
    let mut interp = Interpreter::new(false);
    interp.register_function("concat3", |args| {
        let mut out = String::new();
        for key in ["0", "1", "2"] {
            if let Some(v) = args.get(key) {
                out.push_str(&v.to_string());
            }
        }
        Ok(Value::Str(out))
    });
    let (output, err) = interp.execute("print(concat3(\"a\", \"b\", \"c\"))");
    assert!(err.is_none());
    assert_eq!(output, "abc\n");
}

#[test]
fn test_register_function_named_keys() {
    let mut interp = Interpreter::new(false);
    interp.register_function("greet", |args| {
        let name = match args.get("name") {
            Some(Value::Str(s)) => s.clone(),
            _ => "stranger".to_string(),
        };
        let punct = match args.get("0") {
            Some(Value::Str(s)) => s.clone(),
            _ => ".".to_string(),
        };
        Ok(Value::Str(format!("hello {}{}", name, punct)))
    });
    let (output, err) = interp.execute("print(greet(\"!\", name = \"duso\"))");
    assert!(err.is_none());
    assert_eq!(output, "hello duso!\n");
}

#[test]
fn test_native_functions_compose_with_script_code() {
    let mut interp = Interpreter::new(false);
    interp.register_function("double", |args| match args.get("0") {
        Some(Value::Number(n)) => Ok(Value::Number(n * 2.0)),
        _ => Err("double: expected a number".to_string()),
    });
    let source = "
        function apply_twice(f, x) return f(f(x)) end
        print(apply_twice(double, 3))
    ";
    let (output, err) = interp.execute(source);
    assert!(err.is_none());
    assert_eq!(output, "12\n");
}

#[test]
fn test_register_object_binds_methods_and_value() {
    let mut interp = Interpreter::new(false);
    let methods: Vec<(&str, NativeHandler)> = vec![
        (
            "get",
            Box::new(|_args: &IndexMap<String, Value>| Ok(Value::Str("stored".to_string()))),
        ),
        (
            "put",
            Box::new(|args: &IndexMap<String, Value>| {
                match args.get("0") {
                    Some(v) => Ok(v.clone()),
                    None => Err("store.put: expected a value".to_string()),
                }
            }),
        ),
    ];
    interp.register_object("store", methods);

    let (output, err) = interp.execute(
        "print(store.get()) print(store.put(42)) print(type(store)) print(len(store))",
    );
    assert!(err.is_none());
    assert_eq!(output, "stored\n42\nobject\n2\n");
}

#[test]
fn test_registered_object_method_errors_are_catchable() {
    let mut interp = Interpreter::new(false);
    let methods: Vec<(&str, NativeHandler)> = vec![(
        "load",
        Box::new(|_args: &IndexMap<String, Value>| Err("not found".to_string())),
    )];
    interp.register_object("db", methods);
    let (output, err) = interp.execute("try db.load() catch (e) print(e) end");
    assert!(err.is_none());
    assert_eq!(output, "not found\n");
}

#[test]
fn test_output_accumulates_across_executes() {
    let mut interp = Interpreter::new(false);
    interp.execute("print(1)");
    interp.execute("print(2)");
    let (output, _) = interp.execute("print(3)");
    assert_eq!(output, "1\n2\n3\n");
    assert_eq!(interp.get_output(), "1\n2\n3\n");
}

#[test]
fn test_reset_clears_output_and_environment() {
    let mut interp = Interpreter::new(false);
    interp.execute("x = 1 print(\"before\")");
    interp.reset();
    assert_eq!(interp.get_output(), "");

    let (_, err) = interp.execute("print(x)");
    assert!(err.unwrap().message.contains("undefined variable 'x'"));

    // Built-ins are re-registered by reset
    let (output, err) = interp.execute("print(\"after\")");
    assert!(err.is_none());
    assert_eq!(output, "after\n");
}

#[test]
fn test_root_environment_persists_between_executes() {
    let mut interp = Interpreter::new(false);
    interp.execute("counter = 0 function bump() counter = counter + 1 end");
    interp.execute("bump() bump()");
    let (output, err) = interp.execute("print(counter)");
    assert!(err.is_none());
    assert_eq!(output, "2\n");
}

#[test]
fn test_execute_module_returns_final_expression() {
    let mut interp = Interpreter::new(false);
    let value = interp
        .execute_module("var greeting = \"hi\"\ngreeting + \" there\"")
        .unwrap();
    assert_eq!(value, Value::Str("hi there".to_string()));
}

#[test]
fn test_execute_module_returns_explicit_return() {
    let mut interp = Interpreter::new(false);
    let value = interp
        .execute_module("var x = 1\nif x == 1 then return \"one\" end\n\"other\"")
        .unwrap();
    assert_eq!(value, Value::Str("one".to_string()));
}

#[test]
fn test_execute_module_can_export_object() {
    let mut interp = Interpreter::new(false);
    let value = interp
        .execute_module("{name = \"mod\", version = 2}")
        .unwrap();
    match value {
        Value::Object(entries) => {
            assert_eq!(
                entries.borrow().get("version"),
                Some(&Value::Number(2.0))
            );
        }
        other => panic!("Expected object export, got {:?}", other),
    }
}

#[test]
fn test_module_locals_do_not_leak_into_globals() {
    let mut interp = Interpreter::new(false);
    interp.execute_module("var hidden = 1\nhidden").unwrap();
    let (_, err) = interp.execute("print(hidden)");
    assert!(err.is_some());
}

#[test]
fn test_module_sees_registered_functions() {
    let mut interp = Interpreter::new(false);
    interp.register_function("answer", |_| Ok(Value::Number(42.0)));
    let value = interp.execute_module("answer()").unwrap();
    assert_eq!(value, Value::Number(42.0));
}

#[test]
fn test_module_cache_round_trips_between_interpreters() {
    let mut first = Interpreter::new(false);
    let exported = first.execute_module("{flag = true}").unwrap();
    first.cache_module("settings", exported);

    let mut second = Interpreter::new(false);
    second.set_module_cache(first.get_module_cache());
    match second.cached_module("settings") {
        Some(Value::Object(entries)) => {
            assert_eq!(entries.borrow().get("flag"), Some(&Value::Bool(true)));
        }
        other => panic!("Expected cached object, got {:?}", other),
    }
}

#[test]
fn test_cancellation_flag_aborts_and_reports() {
    let mut interp = Interpreter::new(false);
    let flag = interp.cancel_flag();
    flag.store(true, Ordering::Relaxed);
    let (_, err) = interp.execute("x = 0 while true do x = x + 1 end");
    assert!(err.unwrap().message.contains("cancelled"));

    // reset clears the flag so the interpreter is reusable
    interp.reset();
    let (output, err) = interp.execute("print(\"recovered\")");
    assert!(err.is_none());
    assert_eq!(output, "recovered\n");
}

#[test]
fn test_execute_returns_partial_output_with_error() {
    let mut interp = Interpreter::new(false);
    let (output, err) = interp.execute("print(\"step 1\") boom() print(\"step 2\")");
    assert_eq!(output, "step 1\n");
    assert!(err.is_some());
}

#[test]
fn test_reregistration_overwrites() {
    let mut interp = Interpreter::new(false);
    interp.register_function("version", |_| Ok(Value::Number(1.0)));
    interp.register_function("version", |_| Ok(Value::Number(2.0)));
    let (output, err) = interp.execute("print(version())");
    assert!(err.is_none());
    assert_eq!(output, "2\n");
}

#[test]
fn test_host_value_mutation_is_visible_to_host() {
    let mut interp = Interpreter::new(false);
    interp.execute("state = {count = 0} function tick() state.count = state.count + 1 end");
    interp.execute("tick() tick() tick()");
    let value = interp.execute_module("state.count").unwrap();
    assert_eq!(value, Value::Number(3.0));
}

#[test]
fn test_json_builtins_bridge_host_data() {
    let mut interp = Interpreter::new(false);
    let source = r#"
decoded = json_decode("{\"name\": \"agent\", \"steps\": [1, 2]}")
print(decoded.name)
print(len(decoded.steps))
print(json_encode([true, nil]))
"#;
    let (output, err) = interp.execute(source);
    assert!(err.is_none());
    assert_eq!(output, "agent\n2\n[true,null]\n");
}
