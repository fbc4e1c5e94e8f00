use crate::ast::Program;
use crate::error::{Error, ParseErrorList, ScriptError};
use crate::interpreter::{Completion, Interpreter, JsFunction, ObjRef};
use crate::types::JsValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// Answer of an interrupt callback: keep going or abort execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Halt,
}

pub(crate) type InterruptSlot = Arc<Mutex<Option<Box<dyn FnMut() -> Signal + Send>>>>;

/// Host-writable single-slot interrupt. May be armed from any thread; the
/// engine polls it between statements and at loop-iteration boundaries,
/// consumes the callback, and aborts if it answers [`Signal::Halt`].
#[derive(Clone)]
pub struct InterruptHandle {
    armed: Arc<std::sync::atomic::AtomicBool>,
    slot: InterruptSlot,
}

impl InterruptHandle {
    pub fn interrupt(&self, callback: impl FnMut() -> Signal + Send + 'static) {
        *self.slot.lock().expect("interrupt slot poisoned") = Some(Box::new(callback));
        self.armed.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        *self.slot.lock().expect("interrupt slot poisoned") = None;
        self.armed.store(false, Ordering::Relaxed);
    }
}

/// A parsed program, reusable across runs (and across copies of the VM).
#[derive(Clone)]
pub struct Script {
    name: String,
    program: Rc<Program>,
}

/// An embeddable ECMAScript 5.1 engine instance. One `Vm` is single
/// threaded; use [`Vm::copy`] for isolated instances.
pub struct Vm {
    interp: Interpreter,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// A fresh VM with the standard library installed.
    pub fn new() -> Self {
        Vm {
            interp: Interpreter::new(),
        }
    }

    /// Parse and execute, returning the program's completion value.
    pub fn run(&mut self, source: &str) -> Result<Value, Error> {
        let script = self.compile("<anonymous>", source)?;
        self.run_script(&script)
    }

    /// Parse into a reusable handle without executing.
    pub fn compile(&mut self, name: &str, source: &str) -> Result<Script, Error> {
        tracing::debug!(name, bytes = source.len(), "compiling script");
        let program = crate::parser::parse(source).map_err(|errors| {
            Error::Parse(ParseErrorList {
                filename: name.to_string(),
                errors,
            })
        })?;
        Ok(Script {
            name: name.to_string(),
            program: Rc::new(program),
        })
    }

    pub fn run_script(&mut self, script: &Script) -> Result<Value, Error> {
        tracing::debug!(name = script.name, "running script");
        self.interp.filename = script.name.clone();
        let completion = self.interp.run(&script.program);
        completion_to_result(&mut self.interp, completion)
    }

    /// Like [`Vm::run`], but when called from inside a host function it
    /// executes in the calling script's current scope. With no script on
    /// the stack it runs in the global environment.
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        eval_in_current_scope(&mut self.interp, source)
    }

    /// Bind or update a global with a bridged host value.
    pub fn set<T: Serialize>(&mut self, name: &str, value: T) -> Result<(), Error> {
        let js = self
            .interp
            .import_serializable(value)
            .map_err(|c| completion_error(&self.interp, c))?;
        set_global(&mut self.interp, name, js)
    }

    /// Expose a host function to script under a global name.
    pub fn set_function<F>(&mut self, name: &str, f: F) -> Result<(), Error>
    where
        F: Fn(Invocation<'_>) -> Result<Value, Error> + 'static,
    {
        let host = Rc::new(f);
        let native = JsFunction::native(name, 0, move |interp, this, args| {
            let this_value = make_value(interp, this.clone());
            let arg_values = args.iter().map(|a| make_value(interp, a.clone())).collect();
            let invocation = Invocation {
                interp: &mut *interp,
                this: this_value,
                args: arg_values,
            };
            match host(invocation) {
                Ok(v) => Completion::Normal(v.raw),
                // a propagated script throw keeps its original value
                Err(Error::Script(e)) => Completion::Throw(e.value.raw),
                Err(Error::Interrupted) => Completion::Fatal,
                Err(e) => {
                    let err = interp.create_type_error(&e.to_string());
                    Completion::Throw(err)
                }
            }
        });
        let func = self.interp.create_function(native);
        set_global(&mut self.interp, name, func)
    }

    /// The current script value of a global.
    pub fn get(&mut self, name: &str) -> Result<Value, Error> {
        let global = self.interp.global_value();
        let value = self
            .interp
            .get_property_value(&global, name)
            .map_err(|c| completion_error(&self.interp, c))?;
        Ok(make_value(&self.interp, value))
    }

    /// `get` expecting an object.
    pub fn object(&mut self, name: &str) -> Result<Object, Error> {
        let value = self.get(name)?;
        value.object().ok_or_else(|| {
            script_error_message(&self.interp, format!("TypeError: {name} is not an object"))
        })
    }

    /// Resolve a dotted path (optionally prefixed `new `) and invoke it.
    /// Without an explicit `this`, method calls receive their holder.
    pub fn call(
        &mut self,
        target: &str,
        this: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, Error> {
        call_path(&mut self.interp, target, this, args)
    }

    /// Bridge an arbitrary serializable host value into a script value,
    /// e.g. to build arguments for [`Vm::call`].
    pub fn value<T: Serialize>(&mut self, value: T) -> Result<Value, Error> {
        let js = self
            .interp
            .import_serializable(value)
            .map_err(|c| completion_error(&self.interp, c))?;
        Ok(make_value(&self.interp, js))
    }

    /// An independent VM sharing no mutable state with this one.
    pub fn copy(&self) -> Vm {
        tracing::debug!("cloning vm");
        Vm {
            interp: self.interp.deep_clone(),
        }
    }

    /// 0 means unlimited; otherwise entering the (n+1)th activation
    /// throws a (catchable) RangeError. The running program counts as one.
    pub fn set_stack_depth_limit(&mut self, limit: usize) {
        self.interp.stack_depth_limit = limit;
    }

    /// Also expose a lowercase-first-letter alias for every bridged
    /// map/struct key that starts uppercase.
    pub fn set_lowercase_keys(&mut self, enabled: bool) {
        self.interp.lowercase_keys = enabled;
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            armed: self.interp.interrupt_armed.clone(),
            slot: self.interp.interrupt_slot.clone(),
        }
    }

    /// Diagnostic snapshot: callee, position, stack trace, and the symbols
    /// visible from the current scope.
    pub fn context(&self) -> Context {
        context_from(&self.interp)
    }
}

fn context_from(interp: &Interpreter) -> Context {
    let snapshot = interp.context();
    Context {
        callee: snapshot.callee,
        filename: interp.filename.clone(),
        line: snapshot.line,
        column: snapshot.column,
        stacktrace: snapshot.stacktrace,
        symbols: snapshot
            .symbols
            .into_iter()
            .map(|(name, value)| {
                let value = make_value(interp, value);
                (name, value)
            })
            .collect(),
    }
}

/// Diagnostic snapshot of the execution state.
pub struct Context {
    pub callee: String,
    pub filename: String,
    pub line: u32,
    pub column: u32,
    pub stacktrace: Vec<String>,
    pub symbols: HashMap<String, Value>,
}

/// A host handle on a script value. Primitive inspection is direct;
/// coercions that may run script take the VM.
#[derive(Clone)]
pub struct Value {
    raw: JsValue,
    object: Option<ObjRef>,
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Value").field(&self.raw).finish()
    }
}

impl Value {
    pub fn undefined() -> Value {
        Value {
            raw: JsValue::Undefined,
            object: None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.raw.is_undefined()
    }

    pub fn is_defined(&self) -> bool {
        !self.raw.is_undefined()
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    pub fn is_boolean(&self) -> bool {
        self.raw.is_boolean()
    }

    pub fn is_number(&self) -> bool {
        self.raw.is_number()
    }

    pub fn is_string(&self) -> bool {
        self.raw.is_string()
    }

    pub fn is_object(&self) -> bool {
        self.raw.is_object()
    }

    pub fn is_function(&self) -> bool {
        self.object
            .as_ref()
            .is_some_and(|o| o.borrow().callable.is_some())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.raw {
            JsValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.raw {
            JsValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match &self.raw {
            JsValue::String(s) => Some(s.to_rust_string()),
            _ => None,
        }
    }

    /// ToNumber; may invoke `valueOf` on objects.
    pub fn to_number(&self, vm: &mut Vm) -> Result<f64, Error> {
        vm.interp
            .to_number_value(&self.raw)
            .map_err(|c| completion_error(&vm.interp, c))
    }

    /// ToInteger.
    pub fn to_integer(&self, vm: &mut Vm) -> Result<i64, Error> {
        vm.interp
            .to_integer_value(&self.raw)
            .map(|n| n as i64)
            .map_err(|c| completion_error(&vm.interp, c))
    }

    /// ToString; may invoke `toString` on objects.
    pub fn to_string_value(&self, vm: &mut Vm) -> Result<String, Error> {
        vm.interp
            .to_string_value(&self.raw)
            .map_err(|c| completion_error(&vm.interp, c))
    }

    /// Export to a native type through the bridge.
    pub fn export<T: DeserializeOwned>(&self, vm: &mut Vm) -> Result<T, Error> {
        let json = vm
            .interp
            .export_value(&self.raw)
            .map_err(|c| completion_error(&vm.interp, c))?;
        serde_json::from_value(json).map_err(|e| {
            script_error_message(&vm.interp, format!("TypeError: cannot export value: {e}"))
        })
    }

    pub fn object(&self) -> Option<Object> {
        self.object.as_ref().map(|obj| Object {
            obj: obj.clone(),
            raw: self.raw.clone(),
        })
    }

    /// Invoke this value as a function.
    pub fn call(&self, vm: &mut Vm, this: Option<&Value>, args: &[Value]) -> Result<Value, Error> {
        call_value(&mut vm.interp, self, this, args)
    }
}

/// A host handle on a script object.
#[derive(Clone)]
pub struct Object {
    obj: ObjRef,
    raw: JsValue,
}

impl Object {
    /// Own enumerable property names, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        Interpreter::enumerate_keys(&self.obj, false, false)
    }

    /// Enumerable property names grouped per prototype level, starting
    /// with the object's own.
    pub fn keys_by_parent(&self) -> Vec<Vec<String>> {
        let mut levels = Vec::new();
        let mut cur = Some(self.obj.clone());
        while let Some(o) = cur {
            levels.push(o.borrow().own_keys(false));
            cur = o.borrow().prototype.clone();
        }
        levels
    }

    pub fn class_name(&self) -> String {
        self.obj.borrow().class_name.clone()
    }

    pub fn get(&self, vm: &mut Vm, key: &str) -> Result<Value, Error> {
        let value = vm
            .interp
            .get_property_value(&self.raw, key)
            .map_err(|c| completion_error(&vm.interp, c))?;
        Ok(make_value(&vm.interp, value))
    }

    pub fn set<T: Serialize>(&self, vm: &mut Vm, key: &str, value: T) -> Result<(), Error> {
        let js = vm
            .interp
            .import_serializable(value)
            .map_err(|c| completion_error(&vm.interp, c))?;
        vm.interp
            .put_property_value(&self.raw, key, js, false)
            .map_err(|c| completion_error(&vm.interp, c))
    }

    /// Invoke a method of this object with it as `this`.
    pub fn call(&self, vm: &mut Vm, name: &str, args: &[Value]) -> Result<Value, Error> {
        let method = vm
            .interp
            .get_property_value(&self.raw, name)
            .map_err(|c| completion_error(&vm.interp, c))?;
        let arg_vals: Vec<JsValue> = args.iter().map(|a| a.raw.clone()).collect();
        let completion = vm.interp.call_function(&method, &self.raw, &arg_vals);
        completion_to_result(&mut vm.interp, completion)
    }

    pub fn value(&self) -> Value {
        Value {
            raw: self.raw.clone(),
            object: Some(self.obj.clone()),
        }
    }
}

/// The view a host function gets of one call: the receiver, the
/// arguments, and the VM for re-entry.
pub struct Invocation<'a> {
    interp: &'a mut Interpreter,
    this: Value,
    args: Vec<Value>,
}

impl<'a> Invocation<'a> {
    pub fn this(&self) -> &Value {
        &self.this
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The i-th argument, or undefined.
    pub fn argument(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or_else(Value::undefined)
    }

    /// Evaluate source in the calling script's current scope: bindings and
    /// writes affect the caller.
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        eval_in_current_scope(self.interp, source)
    }

    /// Same contract as [`Vm::call`].
    pub fn call(
        &mut self,
        target: &str,
        this: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, Error> {
        call_path(self.interp, target, this, args)
    }

    /// Bridge a host value, as [`Vm::value`].
    pub fn value<T: Serialize>(&mut self, value: T) -> Result<Value, Error> {
        let js = self
            .interp
            .import_serializable(value)
            .map_err(|c| completion_error(self.interp, c))?;
        Ok(make_value(self.interp, js))
    }

    /// Invoke a function value, e.g. a callback script passed in.
    pub fn call_value(
        &mut self,
        func: &Value,
        this: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, Error> {
        call_value(self.interp, func, this, args)
    }

    /// The current diagnostic snapshot, as [`Vm::context`].
    pub fn context(&self) -> Context {
        context_from(self.interp)
    }

    /// Export a script value, as [`Value::export`].
    pub fn export<T: DeserializeOwned>(&mut self, value: &Value) -> Result<T, Error> {
        let json = self
            .interp
            .export_value(&value.raw)
            .map_err(|c| completion_error(self.interp, c))?;
        serde_json::from_value(json).map_err(|e| {
            script_error_message(self.interp, format!("TypeError: cannot export value: {e}"))
        })
    }
}

pub(crate) fn make_value(interp: &Interpreter, raw: JsValue) -> Value {
    let object = interp.value_object(&raw);
    Value { raw, object }
}

fn eval_in_current_scope(interp: &mut Interpreter, source: &str) -> Result<Value, Error> {
    let env = interp.current_env();
    let completion = interp.eval_source_in_env(source, &env);
    completion_to_result(interp, completion)
}

fn set_global(interp: &mut Interpreter, name: &str, value: JsValue) -> Result<(), Error> {
    let global = interp.global_value();
    interp
        .put_property_value(&global, name, value, false)
        .map_err(|c| completion_error(interp, c))
}

fn call_value(
    interp: &mut Interpreter,
    func: &Value,
    this: Option<&Value>,
    args: &[Value],
) -> Result<Value, Error> {
    let arg_vals: Vec<JsValue> = args.iter().map(|a| a.raw.clone()).collect();
    let this_val = this.map(|v| v.raw.clone()).unwrap_or(JsValue::Undefined);
    let completion = interp.call_function(&func.raw, &this_val, &arg_vals);
    completion_to_result(interp, completion)
}

fn call_path(
    interp: &mut Interpreter,
    target: &str,
    this: Option<&Value>,
    args: &[Value],
) -> Result<Value, Error> {
    let arg_vals: Vec<JsValue> = args.iter().map(|a| a.raw.clone()).collect();
    let trimmed = target.trim();
    if let Some(rest) = trimmed.strip_prefix("new ") {
        let (func, _) = resolve_path(interp, rest.trim())?;
        let completion = interp.construct(&func, &arg_vals);
        return completion_to_result(interp, completion);
    }
    let (func, holder) = resolve_path(interp, trimmed)?;
    let this_val = match this {
        Some(v) => v.raw.clone(),
        None => holder,
    };
    let completion = interp.call_function(&func, &this_val, &arg_vals);
    completion_to_result(interp, completion)
}

/// Walk a dotted path from the global object. Returns the resolved value
/// and the object it was read from (undefined for a bare name).
fn resolve_path(interp: &mut Interpreter, path: &str) -> Result<(JsValue, JsValue), Error> {
    let mut holder = JsValue::Undefined;
    let mut current = interp.global_value();
    for (i, segment) in path.split('.').enumerate() {
        if segment.is_empty() {
            return Err(script_error_message(
                interp,
                format!("TypeError: invalid call target '{path}'"),
            ));
        }
        let next = interp
            .get_property_value(&current, segment)
            .map_err(|c| completion_error(interp, c))?;
        holder = if i == 0 { JsValue::Undefined } else { current };
        current = next;
    }
    Ok((current, holder))
}

fn completion_to_result(interp: &mut Interpreter, completion: Completion) -> Result<Value, Error> {
    match completion {
        Completion::Normal(v) => Ok(make_value(interp, v)),
        other => Err(completion_error(interp, other)),
    }
}

pub(crate) fn completion_error(interp: &Interpreter, completion: Completion) -> Error {
    match completion {
        Completion::Throw(thrown) => {
            let message = interp.format_value(&thrown);
            Error::Script(ScriptError {
                message,
                filename: interp.filename.clone(),
                line: interp.current_line,
                column: interp.current_column,
                value: make_value(interp, thrown),
            })
        }
        Completion::Fatal => Error::Interrupted,
        // Break/Continue/Return cannot escape a whole program; Normal is
        // handled by the caller
        other => {
            debug_assert!(false, "unexpected completion {other:?}");
            Error::Interrupted
        }
    }
}

fn script_error_message(interp: &Interpreter, message: String) -> Error {
    Error::Script(ScriptError {
        message,
        filename: interp.filename.clone(),
        line: interp.current_line,
        column: interp.current_column,
        value: Value::undefined(),
    })
}
