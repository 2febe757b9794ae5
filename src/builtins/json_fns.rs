//! JSON built-ins: json_encode, json_decode, json_pretty
//!
//! The bridge scripts use to move structured data to and from host
//! systems (LLM responses, tool payloads). Conversion rules live in the
//! json module.

use crate::builtins::positional;
use crate::env::Environment;
use crate::json::{from_json, to_json};
use crate::value::Value;
use std::rc::Rc;

fn single_arg(args: &indexmap::IndexMap<String, Value>, name: &str) -> Result<Value, String> {
    positional(args)
        .into_iter()
        .next()
        .ok_or_else(|| format!("{}: expected 1 argument", name))
}

/// Register JSON built-ins in the environment.
pub fn register(env: &Rc<Environment>) {
    env.define(
        "json_encode",
        Value::native("json_encode", |args| {
            let value = single_arg(args, "json_encode")?;
            let json = to_json(&value).map_err(|e| format!("json_encode: {}", e))?;
            serde_json::to_string(&json)
                .map(Value::Str)
                .map_err(|e| format!("json_encode: {}", e))
        }),
    );

    env.define(
        "json_decode",
        Value::native("json_decode", |args| {
            let value = single_arg(args, "json_decode")?;
            let text = match value {
                Value::Str(s) => s,
                other => {
                    return Err(format!(
                        "json_decode: expected string, got {}",
                        other.type_name()
                    ));
                }
            };
            let json: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| format!("json_decode: {}", e))?;
            Ok(from_json(&json))
        }),
    );

    env.define(
        "json_pretty",
        Value::native("json_pretty", |args| {
            let value = single_arg(args, "json_pretty")?;
            let json = to_json(&value).map_err(|e| format!("json_pretty: {}", e))?;
            serde_json::to_string_pretty(&json)
                .map(Value::Str)
                .map_err(|e| format!("json_pretty: {}", e))
        }),
    );
}
