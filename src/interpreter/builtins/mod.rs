mod array;
mod date;
mod error;
mod function;
mod global;
mod json;
mod math;
mod number;
mod object;
mod regexp;
mod string;

use super::*;

pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

impl Interpreter {
    /// Install the standard library on the global object. Wired per the
    /// ES5 lattice: Object.prototype at the root, everything else chaining
    /// to it.
    pub(crate) fn setup_globals(&mut self) {
        // Object.prototype and Function.prototype come first: everything
        // else hangs off them.
        let object_proto = self.create_object();
        object_proto.borrow_mut().prototype = None;
        self.object_prototype = Some(object_proto.clone());
        self.global_obj().borrow_mut().prototype = Some(object_proto.clone());

        let function_proto = self.create_object();
        {
            let mut fp = function_proto.borrow_mut();
            fp.class_name = "Function".to_string();
            fp.prototype = Some(object_proto.clone());
            // Function.prototype is callable and returns undefined
            fp.callable = Some(JsFunction::native("", 0, |_interp, _this, _args| {
                Completion::Normal(JsValue::Undefined)
            }));
        }
        self.function_prototype = Some(function_proto);

        let array_proto = self.create_object();
        {
            let mut p = array_proto.borrow_mut();
            p.class_name = "Array".to_string();
            p.insert_property(
                "length".to_string(),
                PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
            );
        }
        self.array_prototype = Some(array_proto);

        let string_proto = self.create_object();
        {
            let mut p = string_proto.borrow_mut();
            p.class_name = "String".to_string();
            p.primitive_value = Some(JsValue::String(JsString::from_str("")));
        }
        self.string_prototype = Some(string_proto);

        let number_proto = self.create_object();
        {
            let mut p = number_proto.borrow_mut();
            p.class_name = "Number".to_string();
            p.primitive_value = Some(JsValue::Number(0.0));
        }
        self.number_prototype = Some(number_proto);

        let boolean_proto = self.create_object();
        {
            let mut p = boolean_proto.borrow_mut();
            p.class_name = "Boolean".to_string();
            p.primitive_value = Some(JsValue::Boolean(false));
        }
        self.boolean_prototype = Some(boolean_proto);

        let date_proto = self.create_object();
        {
            let mut p = date_proto.borrow_mut();
            p.class_name = "Date".to_string();
            p.primitive_value = Some(JsValue::Number(f64::NAN));
        }
        self.date_prototype = Some(date_proto);

        let regexp_proto = self.create_object();
        regexp_proto.borrow_mut().class_name = "RegExp".to_string();
        self.regexp_prototype = Some(regexp_proto);

        // the global object's own value properties (§15.1.1)
        {
            let global = self.global_obj();
            let mut g = global.borrow_mut();
            for (name, value) in [
                ("undefined", JsValue::Undefined),
                ("NaN", JsValue::Number(f64::NAN)),
                ("Infinity", JsValue::Number(f64::INFINITY)),
            ] {
                g.insert_property(
                    name.to_string(),
                    PropertyDescriptor::data(value, false, false, false),
                );
            }
        }

        self.setup_object();
        self.setup_function();
        self.setup_error();
        self.setup_array();
        self.setup_string();
        self.setup_number_and_boolean();
        self.setup_math();
        self.setup_json();
        self.setup_date();
        self.setup_regexp();
        self.setup_global_functions();
        self.setup_console();
    }

    /// Create a native function and register it on an object under `name`.
    pub(crate) fn add_method(
        &mut self,
        target: &ObjRef,
        name: &str,
        length: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) {
        let func = self.create_function(JsFunction::native(name, length, f));
        target.borrow_mut().insert_builtin(name.to_string(), func);
    }

    /// Wire a constructor to its prototype and install it globally.
    pub(crate) fn install_constructor(
        &mut self,
        name: &str,
        length: usize,
        proto: &ObjRef,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> JsValue {
        let ctor_val = self.create_function(JsFunction::constructor(name, length, f));
        let proto_val = self.object_value(proto);
        if let Some(ctor_obj) = self.value_object(&ctor_val) {
            ctor_obj.borrow_mut().insert_property(
                "prototype".to_string(),
                PropertyDescriptor::data(proto_val, false, false, false),
            );
        }
        proto
            .borrow_mut()
            .insert_builtin("constructor".to_string(), ctor_val.clone());
        self.global_obj()
            .borrow_mut()
            .insert_builtin(name.to_string(), ctor_val.clone());
        ctor_val
    }

    fn setup_console(&mut self) {
        let console = self.create_object();
        self.add_method(&console, "log", 0, |interp, _this, args| {
            let mut parts = Vec::with_capacity(args.len());
            for v in args {
                match interp.to_string_value(v) {
                    Ok(s) => parts.push(s),
                    Err(c) => return c,
                }
            }
            println!("{}", parts.join(" "));
            Completion::Normal(JsValue::Undefined)
        });
        self.add_method(&console, "error", 0, |interp, _this, args| {
            let mut parts = Vec::with_capacity(args.len());
            for v in args {
                match interp.to_string_value(v) {
                    Ok(s) => parts.push(s),
                    Err(c) => return c,
                }
            }
            eprintln!("{}", parts.join(" "));
            Completion::Normal(JsValue::Undefined)
        });
        let console_val = self.object_value(&console);
        self.global_obj()
            .borrow_mut()
            .insert_builtin("console".to_string(), console_val);
    }

    // ---- shared `this` extraction helpers ------------------------------

    /// CheckObjectCoercible + ToString, the §15.5.4 method prologue.
    pub(crate) fn this_to_string(&mut self, this: &JsValue) -> EvalResult<JsString> {
        if this.is_nullish() {
            return self.throw_type_error("String.prototype method called on null or undefined");
        }
        self.to_jsstring_value(this)
    }

    /// The [[PrimitiveValue]] of a Number receiver (§15.7.4).
    pub(crate) fn this_number_value(&mut self, this: &JsValue) -> EvalResult<f64> {
        match this {
            JsValue::Number(n) => Ok(*n),
            JsValue::Object(_) => {
                if let Some(obj) = self.value_object(this)
                    && obj.borrow().class_name == "Number"
                    && let Some(JsValue::Number(n)) = obj.borrow().primitive_value
                {
                    return Ok(n);
                }
                self.throw_type_error("Number.prototype method called on incompatible receiver")
            }
            _ => self.throw_type_error("Number.prototype method called on incompatible receiver"),
        }
    }

    pub(crate) fn this_boolean_value(&mut self, this: &JsValue) -> EvalResult<bool> {
        match this {
            JsValue::Boolean(b) => Ok(*b),
            JsValue::Object(_) => {
                if let Some(obj) = self.value_object(this)
                    && obj.borrow().class_name == "Boolean"
                    && let Some(JsValue::Boolean(b)) = obj.borrow().primitive_value
                {
                    return Ok(b);
                }
                self.throw_type_error("Boolean.prototype method called on incompatible receiver")
            }
            _ => self.throw_type_error("Boolean.prototype method called on incompatible receiver"),
        }
    }

    /// The receiver as an object plus its `length` as Uint32, the prologue
    /// shared by the generic Array.prototype methods.
    pub(crate) fn this_array_like(&mut self, this: &JsValue) -> EvalResult<(JsValue, u32)> {
        let obj = self.to_object_value(this)?;
        let obj_val = self.object_value(&obj);
        let len_val = self.get_property_value(&obj_val, "length")?;
        let len = self.to_uint32_value(&len_val)?;
        Ok((obj_val, len))
    }
}
