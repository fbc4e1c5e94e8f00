use super::*;
use crate::types::number_ops;

/// Error channel for evaluation helpers: `Err` carries an abrupt
/// completion, which is always `Throw` or `Fatal`.
pub(crate) type EvalResult<T> = Result<T, Completion>;

pub(crate) fn completion_value(c: Completion) -> EvalResult<JsValue> {
    match c {
        Completion::Normal(v) => Ok(v),
        other => Err(other),
    }
}

pub(crate) fn result_completion(r: EvalResult<JsValue>) -> Completion {
    match r {
        Ok(v) => Completion::Normal(v),
        Err(c) => c,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    Number,
    String,
}

// §9.2 ToBoolean
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

// §9.3.1 ToNumber applied to the String type: whitespace-trimmed decimal
// with exponent, hex with 0x/0X, signed Infinity; anything else is NaN.
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let rust_str = s.to_rust_string();
    let trimmed = rust_str.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return f64::NAN;
        }
        return i64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::INFINITY);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // keep Rust's "inf"/"nan" spellings from leaking through
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// A property key that is a valid array index (§15.4).
pub(crate) fn array_index(key: &str) -> Option<u32> {
    let n: u32 = key.parse().ok()?;
    if n != u32::MAX && n.to_string() == key {
        Some(n)
    } else {
        None
    }
}

impl Interpreter {
    pub(crate) fn throw_type_error<T>(&mut self, msg: &str) -> EvalResult<T> {
        let err = self.create_type_error(msg);
        Err(Completion::Throw(err))
    }

    // §8.12.8 [[DefaultValue]] / §9.1 ToPrimitive
    pub(crate) fn to_primitive(&mut self, val: &JsValue, hint: Option<Hint>) -> EvalResult<JsValue> {
        let Some(obj) = self.value_object(val) else {
            return Ok(val.clone());
        };
        let hint = hint.unwrap_or(if obj.borrow().class_name == "Date" {
            Hint::String
        } else {
            Hint::Number
        });
        let order: [&str; 2] = match hint {
            Hint::Number => ["valueOf", "toString"],
            Hint::String => ["toString", "valueOf"],
        };
        for name in order {
            let method = self.get_property_value(val, name)?;
            if self.is_callable(&method) {
                let result = completion_value(self.call_function(&method, val, &[]))?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        self.throw_type_error("Cannot convert object to primitive value")
    }

    // §9.3 ToNumber
    pub(crate) fn to_number_value(&mut self, val: &JsValue) -> EvalResult<f64> {
        match val {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(*b as u8 as f64),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Some(Hint::Number))?;
                self.to_number_value(&prim)
            }
        }
    }

    pub(crate) fn to_integer_value(&mut self, val: &JsValue) -> EvalResult<f64> {
        Ok(number_ops::to_integer(self.to_number_value(val)?))
    }

    pub(crate) fn to_int32_value(&mut self, val: &JsValue) -> EvalResult<i32> {
        Ok(number_ops::to_int32(self.to_number_value(val)?))
    }

    pub(crate) fn to_uint32_value(&mut self, val: &JsValue) -> EvalResult<u32> {
        Ok(number_ops::to_uint32(self.to_number_value(val)?))
    }

    // §9.8 ToString, preserving code units
    pub(crate) fn to_jsstring_value(&mut self, val: &JsValue) -> EvalResult<JsString> {
        match val {
            JsValue::String(s) => Ok(s.clone()),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Some(Hint::String))?;
                self.to_jsstring_value(&prim)
            }
            other => Ok(JsString::from_str(&format!("{other}"))),
        }
    }

    pub(crate) fn to_string_value(&mut self, val: &JsValue) -> EvalResult<String> {
        Ok(self.to_jsstring_value(val)?.to_rust_string())
    }

    // §9.9 ToObject: box primitives, reject null/undefined
    pub(crate) fn to_object_value(&mut self, val: &JsValue) -> EvalResult<ObjRef> {
        match val {
            JsValue::Undefined | JsValue::Null => {
                self.throw_type_error("Cannot convert undefined or null to object")
            }
            JsValue::Object(o) => match self.get_object(o.id) {
                Some(obj) => Ok(obj),
                None => self.throw_type_error("Cannot convert undefined or null to object"),
            },
            JsValue::Boolean(_) => {
                let proto = self.boolean_prototype.clone();
                Ok(self.box_primitive("Boolean", proto, val.clone()))
            }
            JsValue::Number(_) => {
                let proto = self.number_prototype.clone();
                Ok(self.box_primitive("Number", proto, val.clone()))
            }
            JsValue::String(_) => {
                let proto = self.string_prototype.clone();
                Ok(self.box_primitive("String", proto, val.clone()))
            }
        }
    }

    pub(crate) fn box_primitive(
        &mut self,
        class_name: &str,
        prototype: Option<ObjRef>,
        value: JsValue,
    ) -> ObjRef {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = class_name.to_string();
            o.prototype = prototype;
            o.primitive_value = Some(value);
        }
        obj
    }

    pub(crate) fn typeof_value(&self, val: &JsValue) -> &'static str {
        match val {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) => {
                if self.is_callable(val) {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    pub(crate) fn is_callable(&self, val: &JsValue) -> bool {
        self.value_object(val)
            .is_some_and(|o| o.borrow().callable.is_some())
    }

    // ---- MOP entry points that can run script -------------------------

    /// [[Get]] through a value base: primitives read through their
    /// prototype; accessor getters are invoked with the original receiver.
    pub(crate) fn get_property_value(&mut self, base: &JsValue, key: &str) -> EvalResult<JsValue> {
        let desc = match base {
            JsValue::Undefined | JsValue::Null => {
                let msg = format!("Cannot read property '{key}' of {base}");
                return self.throw_type_error(&msg);
            }
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(JsValue::Number(s.len() as f64));
                }
                if let Ok(idx) = key.parse::<usize>()
                    && key == idx.to_string()
                {
                    return Ok(if idx < s.len() {
                        JsValue::String(s.slice_units(idx, idx + 1))
                    } else {
                        JsValue::Undefined
                    });
                }
                self.string_prototype
                    .as_ref()
                    .and_then(|p| p.borrow().get_property_descriptor(key))
            }
            JsValue::Number(_) => self
                .number_prototype
                .as_ref()
                .and_then(|p| p.borrow().get_property_descriptor(key)),
            JsValue::Boolean(_) => self
                .boolean_prototype
                .as_ref()
                .and_then(|p| p.borrow().get_property_descriptor(key)),
            JsValue::Object(o) => match self.get_object(o.id) {
                Some(obj) => obj.borrow().get_property_descriptor(key),
                None => None,
            },
        };
        let Some(desc) = desc else {
            return Ok(JsValue::Undefined);
        };
        if desc.is_accessor_descriptor() {
            let getter = desc.get.unwrap_or(JsValue::Undefined);
            if getter.is_undefined() {
                return Ok(JsValue::Undefined);
            }
            return completion_value(self.call_function(&getter, base, &[]));
        }
        Ok(desc.value.unwrap_or(JsValue::Undefined))
    }

    /// [[Put]] through a value base (§8.7.2/§8.12.5). Follows CanPut:
    /// accessor setters are invoked; silent failure unless `throw`.
    pub(crate) fn put_property_value(
        &mut self,
        base: &JsValue,
        key: &str,
        value: JsValue,
        throw: bool,
    ) -> EvalResult<()> {
        if base.is_nullish() {
            let msg = format!("Cannot set property '{key}' of {base}");
            return self.throw_type_error(&msg);
        }
        let Some(obj) = self.value_object(base) else {
            // primitive base: only an inherited accessor can observe the write
            let proto = match base {
                JsValue::String(_) => self.string_prototype.clone(),
                JsValue::Number(_) => self.number_prototype.clone(),
                JsValue::Boolean(_) => self.boolean_prototype.clone(),
                _ => None,
            };
            let desc = proto.and_then(|p| p.borrow().get_property_descriptor(key));
            if let Some(d) = desc
                && d.is_accessor_descriptor()
            {
                let setter = d.set.unwrap_or(JsValue::Undefined);
                if self.is_callable(&setter) {
                    completion_value(self.call_function(&setter, base, &[value]))?;
                    return Ok(());
                }
            }
            return self.put_reject(key, throw);
        };

        let own = obj.borrow().get_own_property(key);
        if let Some(d) = own {
            if d.is_accessor_descriptor() {
                let setter = d.set.unwrap_or(JsValue::Undefined);
                if self.is_callable(&setter) {
                    completion_value(self.call_function(&setter, base, &[value]))?;
                    return Ok(());
                }
                return self.put_reject(key, throw);
            }
            if !d.is_writable() {
                return self.put_reject(key, throw);
            }
            self.object_define_own_property(
                &obj,
                key,
                PropertyDescriptor::value_only(value),
                throw,
            )?;
            return Ok(());
        }

        let inherited = {
            let b = obj.borrow();
            b.prototype
                .as_ref()
                .and_then(|p| p.borrow().get_property_descriptor(key))
        };
        match inherited {
            Some(d) if d.is_accessor_descriptor() => {
                let setter = d.set.unwrap_or(JsValue::Undefined);
                if self.is_callable(&setter) {
                    completion_value(self.call_function(&setter, base, &[value]))?;
                    return Ok(());
                }
                self.put_reject(key, throw)
            }
            Some(d) if !d.is_writable() => self.put_reject(key, throw),
            _ => {
                if !obj.borrow().extensible {
                    return self.put_reject(key, throw);
                }
                self.object_define_own_property(
                    &obj,
                    key,
                    PropertyDescriptor::data_default(value),
                    throw,
                )?;
                Ok(())
            }
        }
    }

    fn put_reject(&mut self, key: &str, throw: bool) -> EvalResult<()> {
        if throw {
            let msg = format!("Cannot assign to read only property '{key}'");
            self.throw_type_error(&msg)
        } else {
            Ok(())
        }
    }

    /// [[DefineOwnProperty]] with the Array override (§15.4.5.1).
    pub(crate) fn object_define_own_property(
        &mut self,
        obj: &ObjRef,
        key: &str,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> EvalResult<bool> {
        let is_array = obj.borrow().class_name == "Array";
        let ok = if is_array {
            self.array_define_own_property(obj, key, desc)?
        } else {
            obj.borrow_mut().define_own_property(key.to_string(), desc)
        };
        if !ok && throw {
            let msg = format!("Cannot redefine property: {key}");
            return self.throw_type_error(&msg);
        }
        Ok(ok)
    }

    // §15.4.5.1: index writes maintain `length`; `length` writes truncate,
    // stopping at the first non-configurable element.
    fn array_define_own_property(
        &mut self,
        obj: &ObjRef,
        key: &str,
        desc: PropertyDescriptor,
    ) -> EvalResult<bool> {
        let old_len_desc = obj
            .borrow()
            .get_own_property("length")
            .expect("arrays always carry length");
        let old_len = match old_len_desc.value {
            Some(JsValue::Number(n)) => number_ops::to_uint32(n),
            _ => 0,
        };

        if key == "length" {
            let Some(ref len_val) = desc.value else {
                return Ok(obj
                    .borrow_mut()
                    .define_own_property("length".to_string(), desc));
            };
            let len_num = self.to_number_value(len_val)?;
            let new_len = number_ops::to_uint32(len_num);
            if new_len as f64 != len_num {
                let err = self.create_range_error("Invalid array length");
                return Err(Completion::Throw(err));
            }
            let mut new_len_desc = desc.clone();
            new_len_desc.value = Some(JsValue::Number(new_len as f64));
            if new_len >= old_len {
                return Ok(obj
                    .borrow_mut()
                    .define_own_property("length".to_string(), new_len_desc));
            }
            if !old_len_desc.is_writable() {
                return Ok(false);
            }
            // defer clearing writability until the truncation is done
            let defer_writable = new_len_desc.writable == Some(false);
            new_len_desc.writable = Some(true);
            if !obj
                .borrow_mut()
                .define_own_property("length".to_string(), new_len_desc.clone())
            {
                return Ok(false);
            }
            let mut current = old_len;
            while current > new_len {
                current -= 1;
                let deleted = obj.borrow_mut().delete(&current.to_string());
                if !deleted {
                    let mut stop_desc = new_len_desc.clone();
                    stop_desc.value = Some(JsValue::Number((current + 1) as f64));
                    if defer_writable {
                        stop_desc.writable = Some(false);
                    }
                    obj.borrow_mut()
                        .define_own_property("length".to_string(), stop_desc);
                    return Ok(false);
                }
            }
            if defer_writable {
                obj.borrow_mut().define_own_property(
                    "length".to_string(),
                    PropertyDescriptor {
                        value: None,
                        writable: Some(false),
                        get: None,
                        set: None,
                        enumerable: None,
                        configurable: None,
                    },
                );
            }
            return Ok(true);
        }

        if let Some(index) = array_index(key) {
            if index >= old_len && !old_len_desc.is_writable() {
                return Ok(false);
            }
            if !obj.borrow_mut().define_own_property(key.to_string(), desc) {
                return Ok(false);
            }
            if index >= old_len {
                obj.borrow_mut().define_own_property(
                    "length".to_string(),
                    PropertyDescriptor::value_only(JsValue::Number((index + 1) as f64)),
                );
            }
            return Ok(true);
        }

        Ok(obj.borrow_mut().define_own_property(key.to_string(), desc))
    }

    /// [[Delete]] through a value base.
    pub(crate) fn delete_property_value(
        &mut self,
        base: &JsValue,
        key: &str,
    ) -> EvalResult<bool> {
        if base.is_nullish() {
            let msg = format!("Cannot convert {base} to object");
            return self.throw_type_error(&msg);
        }
        if let Some(obj) = self.value_object(base) {
            return Ok(obj.borrow_mut().delete(key));
        }
        if let JsValue::String(s) = base {
            // virtual index/length properties of the temporary box
            if key == "length" {
                return Ok(false);
            }
            if let Ok(idx) = key.parse::<usize>()
                && idx < s.len()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Enumeration hook: own keys in insertion order, then the prototype
    /// chain, de-duplicating shadowed names.
    pub(crate) fn enumerate_keys(
        obj: &ObjRef,
        include_inherited: bool,
        include_non_enumerable: bool,
    ) -> Vec<String> {
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut keys = Vec::new();
        let mut cur = Some(obj.clone());
        while let Some(o) = cur {
            let b = o.borrow();
            for k in b.own_keys(true) {
                let enumerable = b
                    .get_own_property(&k)
                    .map(|d| d.is_enumerable())
                    .unwrap_or(false);
                // a non-enumerable own property still shadows the chain
                if seen.insert(k.clone()) && (enumerable || include_non_enumerable) {
                    keys.push(k);
                }
            }
            cur = if include_inherited {
                b.prototype.clone()
            } else {
                None
            };
        }
        keys
    }

    // ---- equality and relational ----------------------------------------

    // §11.9.3, the nine-step algorithm
    pub(crate) fn loose_equals(&mut self, x: &JsValue, y: &JsValue) -> EvalResult<bool> {
        use JsValue::*;
        match (x, y) {
            (Undefined, Undefined)
            | (Null, Null)
            | (Undefined, Null)
            | (Null, Undefined) => Ok(true),
            (Number(_), Number(_))
            | (String(_), String(_))
            | (Boolean(_), Boolean(_))
            | (Object(_), Object(_)) => Ok(strict_equals(x, y)),
            (Number(a), String(s)) => Ok(number_ops::equal(*a, string_to_number(s))),
            (String(s), Number(b)) => Ok(number_ops::equal(string_to_number(s), *b)),
            (Boolean(b), _) => {
                let n = JsValue::Number(*b as u8 as f64);
                self.loose_equals(&n, y)
            }
            (_, Boolean(b)) => {
                let n = JsValue::Number(*b as u8 as f64);
                self.loose_equals(x, &n)
            }
            (Number(_) | String(_), Object(_)) => {
                let prim = self.to_primitive(y, None)?;
                self.loose_equals(x, &prim)
            }
            (Object(_), Number(_) | String(_)) => {
                let prim = self.to_primitive(x, None)?;
                self.loose_equals(&prim, y)
            }
            _ => Ok(false),
        }
    }

    // §11.8.5; `None` means either side was NaN
    pub(crate) fn abstract_relational(
        &mut self,
        x: &JsValue,
        y: &JsValue,
        left_first: bool,
    ) -> EvalResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, Some(Hint::Number))?;
            let py = self.to_primitive(y, Some(Hint::Number))?;
            (px, py)
        } else {
            let py = self.to_primitive(y, Some(Hint::Number))?;
            let px = self.to_primitive(x, Some(Hint::Number))?;
            (px, py)
        };
        if let (JsValue::String(a), JsValue::String(b)) = (&px, &py) {
            return Ok(Some(a.code_units < b.code_units));
        }
        let nx = self.to_number_value(&px)?;
        let ny = self.to_number_value(&py)?;
        if nx.is_nan() || ny.is_nan() {
            return Ok(None);
        }
        Ok(Some(nx < ny))
    }

    // §11.6.1: ToPrimitive both sides, concatenate if either is a string
    pub(crate) fn add_values(&mut self, x: &JsValue, y: &JsValue) -> EvalResult<JsValue> {
        let px = self.to_primitive(x, None)?;
        let py = self.to_primitive(y, None)?;
        if px.is_string() || py.is_string() {
            let mut a = self.to_jsstring_value(&px)?;
            let b = self.to_jsstring_value(&py)?;
            a.code_units.extend_from_slice(&b.code_units);
            return Ok(JsValue::String(a));
        }
        let a = self.to_number_value(&px)?;
        let b = self.to_number_value(&py)?;
        Ok(JsValue::Number(a + b))
    }

    pub(crate) fn instance_of(&mut self, value: &JsValue, ctor: &JsValue) -> EvalResult<bool> {
        let Some(func_obj) = self.value_object(ctor) else {
            return self.throw_type_error("Right-hand side of 'instanceof' is not callable");
        };
        let callable = func_obj.borrow().callable.clone();
        match callable {
            None => self.throw_type_error("Right-hand side of 'instanceof' is not callable"),
            Some(JsFunction::Bound { target, .. }) => self.instance_of(value, &target),
            Some(_) => {
                let proto_val = self.get_property_value(ctor, "prototype")?;
                let Some(proto) = self.value_object(&proto_val) else {
                    return self
                        .throw_type_error("Function has non-object prototype in instanceof");
                };
                let Some(obj) = self.value_object(value) else {
                    return Ok(false);
                };
                let mut cur = obj.borrow().prototype.clone();
                while let Some(p) = cur {
                    if Rc::ptr_eq(&p, &proto) {
                        return Ok(true);
                    }
                    cur = p.borrow().prototype.clone();
                }
                Ok(false)
            }
        }
    }

    // ---- calls ---------------------------------------------------------

    pub(crate) fn call_function(
        &mut self,
        callee: &JsValue,
        this: &JsValue,
        args: &[JsValue],
    ) -> Completion {
        let callable = self
            .value_object(callee)
            .and_then(|o| o.borrow().callable.clone());
        let Some(func) = callable else {
            let msg = format!("{} is not a function", self.format_value(callee));
            let err = self.create_type_error(&msg);
            return Completion::Throw(err);
        };
        match func {
            JsFunction::Native { func, .. } => func(self, this, args),
            JsFunction::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args.clone();
                all.extend_from_slice(args);
                self.call_function(&target, &bound_this, &all)
            }
            JsFunction::User { decl, closure } => {
                self.call_user_function(&decl, &closure, callee, this, args)
            }
        }
    }

    fn call_user_function(
        &mut self,
        decl: &Rc<FunctionLiteral>,
        closure: &EnvRef,
        callee: &JsValue,
        this: &JsValue,
        args: &[JsValue],
    ) -> Completion {
        // the running program counts as one frame; the limit is inclusive
        if self.stack_depth_limit != 0 && self.call_stack.len() + 2 > self.stack_depth_limit {
            let err = self.create_range_error("Maximum call stack size exceeded");
            return Completion::Throw(err);
        }

        // §10.4.3 this binding for non-strict function code
        let this_val = match this {
            JsValue::Undefined | JsValue::Null => self.global_value(),
            JsValue::Object(_) => this.clone(),
            primitive => match self.to_object_value(primitive) {
                Ok(obj) => self.object_value(&obj),
                Err(c) => return c,
            },
        };

        let env = Environment::new(Some(closure.clone()));
        {
            let mut e = env.borrow_mut();
            e.declare("this", this_val);
            for (i, name) in decl.params.iter().enumerate() {
                e.declare(name, args.get(i).cloned().unwrap_or(JsValue::Undefined));
            }
        }
        if !decl.params.iter().any(|p| p == "arguments") {
            let arguments =
                self.create_arguments_object(args, callee.clone(), &env, &decl.params);
            env.borrow_mut().declare("arguments", arguments);
        }
        if let Err(e) = self.hoist_declarations(&decl.body, &env) {
            return Completion::Throw(e);
        }

        self.call_stack.push(CallFrame {
            callee: decl.name.clone().unwrap_or_default(),
            call_line: self.current_line,
            call_column: self.current_column,
            env: env.clone(),
        });
        let result = self.exec_statements(&decl.body, &env);
        self.call_stack.pop();

        match result {
            Completion::Return(v) => Completion::Normal(v),
            Completion::Normal(_) => Completion::Normal(JsValue::Undefined),
            other => other,
        }
    }

    // §13.2.2 [[Construct]]
    pub(crate) fn construct(&mut self, callee: &JsValue, args: &[JsValue]) -> Completion {
        let callable = self
            .value_object(callee)
            .and_then(|o| o.borrow().callable.clone());
        let Some(func) = callable else {
            let msg = format!("{} is not a function", self.format_value(callee));
            let err = self.create_type_error(&msg);
            return Completion::Throw(err);
        };
        match func {
            JsFunction::Bound {
                target,
                args: bound_args,
                ..
            } => {
                let mut all = bound_args.clone();
                all.extend_from_slice(args);
                self.construct(&target, &all)
            }
            JsFunction::Native {
                constructor: false,
                name,
                ..
            } => {
                let msg = format!("{name} is not a constructor");
                let err = self.create_type_error(&msg);
                Completion::Throw(err)
            }
            _ => {
                let proto_val = match self.get_property_value(callee, "prototype") {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                let proto = self
                    .value_object(&proto_val)
                    .unwrap_or_else(|| self.object_proto());
                let obj = self.create_object();
                obj.borrow_mut().prototype = Some(proto);
                let this_val = self.object_value(&obj);
                match self.call_function(callee, &this_val, args) {
                    Completion::Normal(v) if v.is_object() => Completion::Normal(v),
                    Completion::Normal(_) => Completion::Normal(this_val),
                    other => other,
                }
            }
        }
    }

    // ---- errors --------------------------------------------------------

    pub(crate) fn create_error_object(
        &mut self,
        prototype: Option<ObjRef>,
        message: &str,
    ) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = "Error".to_string();
            o.prototype = prototype.or_else(|| self.error_prototype.clone());
            o.insert_property(
                "message".to_string(),
                PropertyDescriptor::data(
                    JsValue::String(JsString::from_str(message)),
                    true,
                    false,
                    true,
                ),
            );
        }
        self.object_value(&obj)
    }

    pub(crate) fn create_type_error(&mut self, message: &str) -> JsValue {
        let proto = self.type_error_prototype.clone();
        self.create_error_object(proto, message)
    }

    pub(crate) fn create_reference_error(&mut self, message: &str) -> JsValue {
        let proto = self.reference_error_prototype.clone();
        self.create_error_object(proto, message)
    }

    pub(crate) fn create_range_error(&mut self, message: &str) -> JsValue {
        let proto = self.range_error_prototype.clone();
        self.create_error_object(proto, message)
    }

    pub(crate) fn create_syntax_error(&mut self, message: &str) -> JsValue {
        let proto = self.syntax_error_prototype.clone();
        self.create_error_object(proto, message)
    }

    pub(crate) fn create_uri_error(&mut self, message: &str) -> JsValue {
        let proto = self.uri_error_prototype.clone();
        self.create_error_object(proto, message)
    }

    // ---- eval ----------------------------------------------------------

    /// Parse and execute source in the given environment. Used by `eval`
    /// (direct calls pass the caller's environment, indirect the global
    /// one) and by host-initiated evaluation.
    pub(crate) fn eval_source_in_env(&mut self, source: &str, env: &EnvRef) -> Completion {
        let program = match crate::parser::parse(source) {
            Ok(p) => p,
            Err(errors) => {
                let msg = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Invalid or unexpected token".to_string());
                let err = self.create_syntax_error(&msg);
                return Completion::Throw(err);
            }
        };
        if let Err(e) = self.hoist_declarations(&program.body, env) {
            return Completion::Throw(e);
        }
        self.exec_statements(&program.body, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_number_grammar() {
        assert_eq!(string_to_number(&JsString::from_str("")), 0.0);
        assert_eq!(string_to_number(&JsString::from_str("  42  ")), 42.0);
        assert_eq!(string_to_number(&JsString::from_str("0x10")), 16.0);
        assert_eq!(string_to_number(&JsString::from_str("1e3")), 1000.0);
        assert_eq!(
            string_to_number(&JsString::from_str("Infinity")),
            f64::INFINITY
        );
        assert_eq!(
            string_to_number(&JsString::from_str("-Infinity")),
            f64::NEG_INFINITY
        );
        assert!(string_to_number(&JsString::from_str("abc")).is_nan());
        assert!(string_to_number(&JsString::from_str("inf")).is_nan());
        assert!(string_to_number(&JsString::from_str("0x")).is_nan());
        assert!(string_to_number(&JsString::from_str("1px")).is_nan());
    }

    #[test]
    fn to_boolean_falsy_set() {
        assert!(!to_boolean(&JsValue::Undefined));
        assert!(!to_boolean(&JsValue::Null));
        assert!(!to_boolean(&JsValue::Boolean(false)));
        assert!(!to_boolean(&JsValue::Number(0.0)));
        assert!(!to_boolean(&JsValue::Number(-0.0)));
        assert!(!to_boolean(&JsValue::Number(f64::NAN)));
        assert!(!to_boolean(&JsValue::String(JsString::from_str(""))));
        assert!(to_boolean(&JsValue::String(JsString::from_str("0"))));
        assert!(to_boolean(&JsValue::Number(1.0)));
    }

    #[test]
    fn array_index_detection() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("abc"), None);
    }
}
