use crate::ast::*;
use crate::types::{JsObject, JsString, JsValue};
use crate::vm::{InterruptSlot, Signal};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod types;
pub(crate) use types::*;

mod helpers;
pub(crate) use helpers::*;
mod builtins;
mod clone;
mod eval;
mod exec;
mod gc;

/// One user-function activation. The recorded position is the call site,
/// i.e. the statement in the parent frame that made the call.
pub(crate) struct CallFrame {
    pub callee: String,
    pub call_line: u32,
    pub call_column: u32,
    pub env: EnvRef,
}

/// Diagnostic snapshot of the execution state, taken mid-run.
pub(crate) struct ContextSnapshot {
    pub callee: String,
    pub line: u32,
    pub column: u32,
    pub stacktrace: Vec<String>,
    pub symbols: Vec<(String, JsValue)>,
}

pub(crate) struct Interpreter {
    pub(crate) objects: Vec<Option<ObjRef>>,
    pub(crate) free_list: Vec<usize>,
    gc_alloc_count: usize,
    pub(crate) gc_temp_roots: Vec<u64>,

    pub(crate) global_env: EnvRef,
    pub(crate) global_object: Option<ObjRef>,

    pub(crate) object_prototype: Option<ObjRef>,
    pub(crate) function_prototype: Option<ObjRef>,
    pub(crate) array_prototype: Option<ObjRef>,
    pub(crate) string_prototype: Option<ObjRef>,
    pub(crate) number_prototype: Option<ObjRef>,
    pub(crate) boolean_prototype: Option<ObjRef>,
    pub(crate) date_prototype: Option<ObjRef>,
    pub(crate) regexp_prototype: Option<ObjRef>,
    pub(crate) error_prototype: Option<ObjRef>,
    pub(crate) type_error_prototype: Option<ObjRef>,
    pub(crate) reference_error_prototype: Option<ObjRef>,
    pub(crate) syntax_error_prototype: Option<ObjRef>,
    pub(crate) range_error_prototype: Option<ObjRef>,
    pub(crate) uri_error_prototype: Option<ObjRef>,
    pub(crate) eval_error_prototype: Option<ObjRef>,

    /// The intrinsic `eval`, for direct-call detection.
    pub(crate) eval_function_id: Option<u64>,

    pub(crate) call_stack: Vec<CallFrame>,
    pub(crate) stack_depth_limit: usize,

    pub(crate) interrupt_armed: Arc<AtomicBool>,
    pub(crate) interrupt_slot: InterruptSlot,

    /// Bridge option: also expose lowercased aliases of uppercase keys.
    pub(crate) lowercase_keys: bool,

    pub(crate) filename: String,
    pub(crate) current_line: u32,
    pub(crate) current_column: u32,
}

impl Interpreter {
    pub(crate) fn new() -> Self {
        let global_object = Rc::new(RefCell::new(JsObjectData::new()));
        global_object.borrow_mut().class_name = "global".to_string();
        let global_env =
            Environment::new_object_backed(None, global_object.clone(), false);

        let mut interp = Self {
            objects: Vec::new(),
            free_list: Vec::new(),
            gc_alloc_count: 0,
            gc_temp_roots: Vec::new(),
            global_env,
            global_object: None,
            object_prototype: None,
            function_prototype: None,
            array_prototype: None,
            string_prototype: None,
            number_prototype: None,
            boolean_prototype: None,
            date_prototype: None,
            regexp_prototype: None,
            error_prototype: None,
            type_error_prototype: None,
            reference_error_prototype: None,
            syntax_error_prototype: None,
            range_error_prototype: None,
            uri_error_prototype: None,
            eval_error_prototype: None,
            eval_function_id: None,
            call_stack: Vec::new(),
            stack_depth_limit: 0,
            interrupt_armed: Arc::new(AtomicBool::new(false)),
            interrupt_slot: InterruptSlot::default(),
            lowercase_keys: false,
            filename: "<anonymous>".to_string(),
            current_line: 0,
            current_column: 0,
        };
        interp.allocate_object_slot(global_object.clone());
        interp.global_object = Some(global_object);
        interp.setup_globals();
        interp
    }

    pub(crate) fn run(&mut self, program: &Program) -> Completion {
        let env = self.global_env.clone();
        if let Err(e) = self.hoist_declarations(&program.body, &env) {
            return Completion::Throw(e);
        }
        self.exec_statements(&program.body, &env)
    }

    pub(crate) fn global_obj(&self) -> ObjRef {
        self.global_object.clone().expect("set during construction")
    }

    pub(crate) fn global_value(&self) -> JsValue {
        JsValue::Object(JsObject {
            id: self.global_obj().borrow().id.expect("global is allocated"),
        })
    }

    pub(crate) fn object_proto(&self) -> ObjRef {
        self.object_prototype.clone().expect("set during construction")
    }

    pub(crate) fn function_proto(&self) -> ObjRef {
        self.function_prototype
            .clone()
            .expect("set during construction")
    }

    pub(crate) fn get_object(&self, id: u64) -> Option<ObjRef> {
        self.objects.get(id as usize).and_then(|slot| slot.clone())
    }

    pub(crate) fn object_value(&self, obj: &ObjRef) -> JsValue {
        JsValue::Object(JsObject {
            id: obj.borrow().id.expect("object is allocated"),
        })
    }

    /// Resolve a value to its heap object, if it is one.
    pub(crate) fn value_object(&self, val: &JsValue) -> Option<ObjRef> {
        match val {
            JsValue::Object(o) => self.get_object(o.id),
            _ => None,
        }
    }

    pub(crate) fn create_object(&mut self) -> ObjRef {
        let mut data = JsObjectData::new();
        data.prototype = self.object_prototype.clone();
        let obj = Rc::new(RefCell::new(data));
        self.allocate_object_slot(obj.clone());
        obj
    }

    pub(crate) fn create_object_value(&mut self) -> JsValue {
        let obj = self.create_object();
        self.object_value(&obj)
    }

    pub(crate) fn create_array(&mut self, elements: Vec<JsValue>) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = "Array".to_string();
            o.prototype = self.array_prototype.clone();
            for (i, val) in elements.iter().enumerate() {
                o.insert_value(i.to_string(), val.clone());
            }
            let len = elements.len();
            o.insert_property(
                "length".to_string(),
                PropertyDescriptor::data(JsValue::Number(len as f64), true, false, false),
            );
        }
        self.object_value(&obj)
    }

    pub(crate) fn create_function(&mut self, func: JsFunction) -> JsValue {
        let (fn_name, fn_length, is_user) = match &func {
            JsFunction::User { decl, .. } => (
                decl.name.clone().unwrap_or_default(),
                decl.params.len(),
                true,
            ),
            JsFunction::Native { name, length, .. } => (name.clone(), *length, false),
            JsFunction::Bound { args, .. } => ("bound".to_string(), args.len(), false),
        };
        let mut data = JsObjectData::new();
        data.class_name = "Function".to_string();
        data.prototype = self.function_prototype.clone();
        data.callable = Some(func);
        data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(fn_length as f64), false, false, false),
        );
        data.insert_property(
            "name".to_string(),
            PropertyDescriptor::data(
                JsValue::String(JsString::from_str(&fn_name)),
                false,
                false,
                true,
            ),
        );
        let obj = Rc::new(RefCell::new(data));
        self.allocate_object_slot(obj.clone());
        let func_val = self.object_value(&obj);
        if is_user {
            // every user function gets a fresh .prototype with .constructor
            let proto = self.create_object();
            proto
                .borrow_mut()
                .insert_builtin("constructor".to_string(), func_val.clone());
            let proto_val = self.object_value(&proto);
            obj.borrow_mut().insert_property(
                "prototype".to_string(),
                PropertyDescriptor::data(proto_val, true, false, false),
            );
        }
        func_val
    }

    /// The `arguments` exotic object: indexed slots alias the named
    /// parameters through the activation environment (§10.6).
    pub(crate) fn create_arguments_object(
        &mut self,
        args: &[JsValue],
        callee: JsValue,
        env: &EnvRef,
        param_names: &[String],
    ) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = "Arguments".to_string();
            o.insert_property(
                "length".to_string(),
                PropertyDescriptor::data(JsValue::Number(args.len() as f64), true, false, true),
            );
            for (i, val) in args.iter().enumerate() {
                o.insert_value(i.to_string(), val.clone());
            }
            o.insert_property(
                "callee".to_string(),
                PropertyDescriptor::data(callee, true, false, true),
            );
            let mut map = HashMap::new();
            for (i, name) in param_names.iter().enumerate() {
                if i < args.len() {
                    map.insert(i.to_string(), (env.clone(), name.clone()));
                }
            }
            if !map.is_empty() {
                o.parameter_map = Some(map);
            }
        }
        self.object_value(&obj)
    }

    /// Poll the host interrupt slot. Runs between statements and at loop
    /// iteration boundaries; a `Halt` answer aborts with the fatal signal.
    pub(crate) fn check_interrupt(&mut self) -> Option<Completion> {
        if !self.interrupt_armed.load(Ordering::Relaxed) {
            return None;
        }
        let callback = {
            let mut slot = self.interrupt_slot.lock().expect("interrupt slot poisoned");
            slot.take()
        };
        self.interrupt_armed.store(false, Ordering::Relaxed);
        if let Some(mut f) = callback
            && matches!(f(), Signal::Halt)
        {
            return Some(Completion::Fatal);
        }
        None
    }

    /// Render a thrown value for the host: `"<ErrorKind>: <message>"` for
    /// error-shaped objects, plain ToString-ish otherwise.
    pub(crate) fn format_value(&self, val: &JsValue) -> String {
        if let Some(obj) = self.value_object(val) {
            let obj = obj.borrow();
            let message = obj.get_data_property("message");
            if let JsValue::String(ref msg) = message {
                let msg_str = msg.to_rust_string();
                return match obj.get_data_property("name") {
                    JsValue::String(ref n) if !n.is_empty() => {
                        format!("{}: {msg_str}", n.to_rust_string())
                    }
                    _ => msg_str,
                };
            }
        }
        format!("{val}")
    }

    pub(crate) fn context(&self) -> ContextSnapshot {
        let callee = self
            .call_stack
            .last()
            .map(|f| f.callee.clone())
            .unwrap_or_default();

        let mut stacktrace = Vec::new();
        let mut pos = (self.current_line, self.current_column);
        for frame in self.call_stack.iter().rev() {
            let name = if frame.callee.is_empty() {
                "<anonymous function>".to_string()
            } else {
                frame.callee.clone()
            };
            stacktrace.push(format!("{name} ({}:{}:{})", self.filename, pos.0, pos.1));
            pos = (frame.call_line, frame.call_column);
        }
        stacktrace.push(format!("{}:{}:{}", self.filename, pos.0, pos.1));

        let mut symbols: Vec<(String, JsValue)> = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut env = Some(
            self.call_stack
                .last()
                .map(|f| f.env.clone())
                .unwrap_or_else(|| self.global_env.clone()),
        );
        while let Some(e) = env {
            let borrowed = e.borrow();
            if let Some(ref obj) = borrowed.object {
                let obj = obj.borrow();
                for key in obj.own_keys(true) {
                    if seen.insert(key.clone()) {
                        symbols.push((key.clone(), obj.get_data_property(&key)));
                    }
                }
            } else {
                for (name, binding) in &borrowed.bindings {
                    if seen.insert(name.clone()) {
                        symbols.push((name.clone(), binding.value.clone()));
                    }
                }
            }
            env = borrowed.parent.clone();
        }

        ContextSnapshot {
            callee,
            line: self.current_line,
            column: self.current_column,
            stacktrace,
            symbols,
        }
    }

    /// The environment host-initiated `eval` should run in: the current
    /// activation if script is on the stack, the global scope otherwise.
    pub(crate) fn current_env(&self) -> EnvRef {
        self.call_stack
            .last()
            .map(|f| f.env.clone())
            .unwrap_or_else(|| self.global_env.clone())
    }
}
