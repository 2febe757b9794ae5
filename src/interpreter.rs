// ABOUTME: Host-facing interpreter facade: registration, execution, output capture

use crate::builtins::register_builtins;
use crate::env::Environment;
use crate::error::DusoError;
use crate::eval::Evaluator;
use crate::parser::parse;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The boxed form of a host callable, used by `register_object`.
pub type NativeHandler = Box<dyn Fn(&IndexMap<String, Value>) -> Result<Value, String>>;

/// The embedding entry point. Owns the root environment, the output sink
/// `print` writes into, and the module cache.
///
/// The root environment persists across `execute` calls, so successive
/// scripts share top-level bindings until `reset`. An Interpreter is
/// single-threaded; only the cancellation flag may be shared with other
/// threads.
pub struct Interpreter {
    globals: Rc<Environment>,
    output: Rc<RefCell<String>>,
    module_cache: IndexMap<String, Value>,
    cancelled: Arc<AtomicBool>,
    source_name: String,
    verbose: bool,
}

impl Interpreter {
    pub fn new(verbose: bool) -> Self {
        let globals = Environment::new();
        let output = Rc::new(RefCell::new(String::new()));
        register_builtins(&globals, &output);
        Interpreter {
            globals,
            output,
            module_cache: IndexMap::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            source_name: "<script>".to_string(),
            verbose,
        }
    }

    /// Name used in error messages and call-stack frames, typically the
    /// script's file path.
    pub fn set_source_name(&mut self, name: &str) {
        self.source_name = name.to_string();
    }

    /// Register a native function under `name` in the root environment.
    /// The callable receives positional arguments as "0", "1", ... plus
    /// named arguments under their own keys. Re-registration overwrites.
    pub fn register_function(
        &self,
        name: &str,
        func: impl Fn(&IndexMap<String, Value>) -> Result<Value, String> + 'static,
    ) {
        self.globals.define(name, Value::native(name, func));
    }

    /// Register a host object exposing native methods, invocable as
    /// `name.method(args)`. The name is also bound as an ordinary object
    /// value.
    pub fn register_object(&self, name: &str, methods: Vec<(&str, NativeHandler)>) {
        let mut entries = IndexMap::new();
        for (method_name, handler) in methods {
            entries.insert(
                method_name.to_string(),
                Value::Native(Rc::new(crate::value::NativeFn {
                    name: format!("{}.{}", name, method_name),
                    func: handler,
                })),
            );
        }
        self.globals.define(name, Value::object(entries));
    }

    /// Lex, parse, and evaluate a script against the root environment.
    /// Returns the cumulative captured output since the last reset, plus
    /// the error if one stopped execution.
    pub fn execute(&mut self, source: &str) -> (String, Option<DusoError>) {
        if self.verbose {
            eprintln!("duso: executing {} ({} bytes)", self.source_name, source.len());
        }
        let program = match parse(source, &self.source_name) {
            Ok(program) => program,
            Err(err) => return (self.get_output(), Some(err)),
        };
        let mut evaluator = Evaluator::new(&self.source_name, self.cancelled.clone());
        let result = evaluator.exec_program(&program, &self.globals);
        (self.get_output(), result.err())
    }

    /// Execute one line against the root environment, returning the value
    /// of its final expression (nil when the line is statements only).
    /// This is what the REPL uses to echo results: unlike
    /// `execute_module`, definitions land in the root environment and
    /// persist across lines.
    pub fn execute_line(&mut self, source: &str) -> Result<Value, DusoError> {
        let program = parse(source, &self.source_name)?;
        let mut evaluator = Evaluator::new(&self.source_name, self.cancelled.clone());
        evaluator.exec_module(&program, &self.globals)
    }

    /// Run a script in an isolated child scope of the root environment.
    /// The value of its final expression (or an explicit `return`) is the
    /// module's export.
    pub fn execute_module(&mut self, source: &str) -> Result<Value, DusoError> {
        let program = parse(source, &self.source_name)?;
        let scope = Environment::with_parent(self.globals.clone());
        let mut evaluator = Evaluator::new(&self.source_name, self.cancelled.clone());
        evaluator.exec_module(&program, &scope)
    }

    /// Everything `print` has captured since the last reset.
    pub fn get_output(&self) -> String {
        self.output.borrow().clone()
    }

    /// Clear captured output and reset the root environment. Host
    /// registrations must be repeated afterwards; the module cache is
    /// kept.
    pub fn reset(&mut self) {
        self.output.borrow_mut().clear();
        self.globals = Environment::new();
        register_builtins(&self.globals, &self.output);
        self.cancelled.store(false, Ordering::Relaxed);
    }

    /// The flag the host's execution harness sets to cancel a run. The
    /// evaluator checks it at statement boundaries.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn get_module_cache(&self) -> IndexMap<String, Value> {
        self.module_cache.clone()
    }

    pub fn set_module_cache(&mut self, cache: IndexMap<String, Value>) {
        self.module_cache = cache;
    }

    /// Look up one cached module export.
    pub fn cached_module(&self, name: &str) -> Option<Value> {
        self.module_cache.get(name).cloned()
    }

    /// Store one module export in the cache.
    pub fn cache_module(&mut self, name: &str, value: Value) {
        self.module_cache.insert(name.to_string(), value);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(false)
    }
}
