use super::*;

impl Interpreter {
    pub(crate) fn setup_json(&mut self) {
        let json = self.create_object();
        json.borrow_mut().class_name = "JSON".to_string();

        self.add_method(&json, "parse", 2, |interp, _this, args| {
            let text = match interp.to_string_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let parsed: serde_json::Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    let err = interp.create_syntax_error(&format!("Unexpected token in JSON: {e}"));
                    return Completion::Throw(err);
                }
            };
            let value = interp.import_json_value(&parsed);
            let reviver = arg(args, 1);
            if !interp.is_callable(&reviver) {
                return Completion::Normal(value);
            }
            // §15.12.2: walk the result bottom-up through the reviver
            let holder = interp.create_object_value();
            if let Err(c) = interp.put_property_value(&holder, "", value, false) {
                return c;
            }
            match json_walk(interp, &reviver, &holder, "") {
                Ok(v) => Completion::Normal(v),
                Err(c) => c,
            }
        });

        self.add_method(&json, "stringify", 3, |interp, _this, args| {
            let value = arg(args, 0);
            let replacer = arg(args, 1);

            let mut property_list: Option<Vec<String>> = None;
            let mut replacer_fn = None;
            if interp.is_callable(&replacer) {
                replacer_fn = Some(replacer.clone());
            } else if let Some(obj) = interp.value_object(&replacer)
                && obj.borrow().class_name == "Array"
            {
                let mut list = Vec::new();
                for key in Self::enumerate_keys(&obj, false, false) {
                    let item = match interp.get_property_value(&replacer, &key) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    match item {
                        JsValue::String(s) => list.push(s.to_rust_string()),
                        JsValue::Number(n) => {
                            list.push(crate::types::number_ops::to_string(n))
                        }
                        _ => {}
                    }
                }
                list.dedup();
                property_list = Some(list);
            }

            let space = arg(args, 2);
            let gap = match space {
                JsValue::Number(n) => {
                    let count = (n as i64).clamp(0, 10) as usize;
                    " ".repeat(count)
                }
                JsValue::String(ref s) => {
                    let text = s.to_rust_string();
                    text.chars().take(10).collect()
                }
                _ => String::new(),
            };

            let mut state = StringifyState {
                replacer: replacer_fn,
                property_list,
                gap,
                stack: Vec::new(),
            };
            let holder = interp.create_object_value();
            if let Err(c) = interp.put_property_value(&holder, "", value, false) {
                return c;
            }
            match stringify_property(interp, &mut state, &holder, "", "") {
                Ok(Some(text)) => Completion::Normal(JsValue::String(JsString::from_str(&text))),
                Ok(None) => Completion::Normal(JsValue::Undefined),
                Err(c) => c,
            }
        });

        let json_val = self.object_value(&json);
        self.global_obj()
            .borrow_mut()
            .insert_builtin("JSON".to_string(), json_val);
    }
}

fn json_walk(
    interp: &mut Interpreter,
    reviver: &JsValue,
    holder: &JsValue,
    key: &str,
) -> Result<JsValue, Completion> {
    let value = interp.get_property_value(holder, key)?;
    if let Some(obj) = interp.value_object(&value) {
        let keys = Interpreter::enumerate_keys(&obj, false, false);
        for k in keys {
            let element = json_walk(interp, reviver, &value, &k)?;
            if element.is_undefined() {
                interp.delete_property_value(&value, &k)?;
            } else {
                interp.put_property_value(&value, &k, element, false)?;
            }
        }
    }
    completion_value(interp.call_function(
        reviver,
        holder,
        &[JsValue::String(JsString::from_str(key)), value],
    ))
}

struct StringifyState {
    replacer: Option<JsValue>,
    property_list: Option<Vec<String>>,
    gap: String,
    stack: Vec<u64>,
}

// §15.12.3 Str: returns None when the value does not serialize
// (undefined, functions).
fn stringify_property(
    interp: &mut Interpreter,
    state: &mut StringifyState,
    holder: &JsValue,
    key: &str,
    indent: &str,
) -> Result<Option<String>, Completion> {
    let mut value = interp.get_property_value(holder, key)?;

    if value.is_object() {
        let to_json = interp.get_property_value(&value, "toJSON")?;
        if interp.is_callable(&to_json) {
            value = completion_value(interp.call_function(
                &to_json,
                &value,
                &[JsValue::String(JsString::from_str(key))],
            ))?;
        }
    }
    if let Some(ref replacer) = state.replacer.clone() {
        value = completion_value(interp.call_function(
            replacer,
            holder,
            &[JsValue::String(JsString::from_str(key)), value],
        ))?;
    }

    match &value {
        JsValue::Undefined => Ok(None),
        JsValue::Null => Ok(Some("null".to_string())),
        JsValue::Boolean(b) => Ok(Some(b.to_string())),
        JsValue::Number(n) => Ok(Some(if n.is_finite() {
            crate::types::number_ops::to_string(*n)
        } else {
            "null".to_string()
        })),
        JsValue::String(s) => Ok(Some(quote_json(&s.to_rust_string()))),
        JsValue::Object(o) => {
            if interp.is_callable(&value) {
                return Ok(None);
            }
            // unwrap boxed primitives
            let obj = match interp.value_object(&value) {
                Some(obj) => obj,
                None => return Ok(None),
            };
            let class = obj.borrow().class_name.clone();
            match class.as_str() {
                "Number" => {
                    let n = interp.to_number_value(&value)?;
                    return Ok(Some(if n.is_finite() {
                        crate::types::number_ops::to_string(n)
                    } else {
                        "null".to_string()
                    }));
                }
                "String" => {
                    let s = interp.to_string_value(&value)?;
                    return Ok(Some(quote_json(&s)));
                }
                "Boolean" => {
                    if let Some(JsValue::Boolean(b)) = obj.borrow().primitive_value {
                        return Ok(Some(b.to_string()));
                    }
                }
                _ => {}
            }
            if state.stack.contains(&o.id) {
                let err = interp.create_type_error("Converting circular structure to JSON");
                return Err(Completion::Throw(err));
            }
            state.stack.push(o.id);
            let inner_indent = format!("{indent}{}", state.gap);
            let result = if class == "Array" {
                stringify_array(interp, state, &value, indent, &inner_indent)
            } else {
                stringify_object(interp, state, &value, &obj, indent, &inner_indent)
            };
            state.stack.pop();
            result
        }
    }
}

fn stringify_array(
    interp: &mut Interpreter,
    state: &mut StringifyState,
    value: &JsValue,
    indent: &str,
    inner_indent: &str,
) -> Result<Option<String>, Completion> {
    let len_val = interp.get_property_value(value, "length")?;
    let len = interp.to_uint32_value(&len_val)?;
    let mut parts = Vec::with_capacity(len as usize);
    for i in 0..len {
        let part = stringify_property(interp, state, value, &i.to_string(), inner_indent)?
            .unwrap_or_else(|| "null".to_string());
        parts.push(part);
    }
    Ok(Some(wrap_json(&parts, '[', ']', &state.gap, indent, inner_indent)))
}

fn stringify_object(
    interp: &mut Interpreter,
    state: &mut StringifyState,
    value: &JsValue,
    obj: &ObjRef,
    indent: &str,
    inner_indent: &str,
) -> Result<Option<String>, Completion> {
    let keys = match &state.property_list {
        Some(list) => list.clone(),
        None => Interpreter::enumerate_keys(obj, false, false),
    };
    let mut parts = Vec::new();
    for key in keys {
        if let Some(text) = stringify_property(interp, state, value, &key, inner_indent)? {
            let sep = if state.gap.is_empty() { ":" } else { ": " };
            parts.push(format!("{}{sep}{text}", quote_json(&key)));
        }
    }
    Ok(Some(wrap_json(&parts, '{', '}', &state.gap, indent, inner_indent)))
}

fn wrap_json(
    parts: &[String],
    open: char,
    close: char,
    gap: &str,
    indent: &str,
    inner_indent: &str,
) -> String {
    if parts.is_empty() {
        return format!("{open}{close}");
    }
    if gap.is_empty() {
        return format!("{open}{}{close}", parts.join(","));
    }
    format!(
        "{open}\n{inner_indent}{}\n{indent}{close}",
        parts.join(&format!(",\n{inner_indent}"))
    )
}

fn quote_json(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization is infallible")
}
