//! # Built-in Functions Module
//!
//! The small set of built-ins the language core ships with, registered
//! through the same native-callable path hosts use:
//!
//! - **[console]** (1): print - Output to the interpreter's capture sink
//! - **[types]** (4): len, type, str, num - Inspection and conversion
//! - **[errors]** (1): throw - Raise a catchable error
//! - **[json_fns]** (3): json_encode, json_decode, json_pretty - JSON bridge
//!
//! Everything else (string/math/date helpers, file I/O, HTTP) belongs to
//! the host's function library, not the core.

use crate::env::Environment;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub mod console;
pub mod errors;
pub mod json_fns;
pub mod types;

/// Register all core built-ins in the environment.
pub fn register_builtins(env: &Rc<Environment>, output: &Rc<RefCell<String>>) {
    console::register(env, output);
    types::register(env);
    errors::register(env);
    json_fns::register(env);
}

/// Collect the positional arguments ("0", "1", ...) from a native-call
/// argument map, in order.
pub fn positional(args: &IndexMap<String, Value>) -> Vec<Value> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while let Some(value) = args.get(&i.to_string()) {
        out.push(value.clone());
        i += 1;
    }
    out
}
