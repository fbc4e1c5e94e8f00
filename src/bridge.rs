//! Host-value bridge: marshalling between native Rust data and script
//! values, with `serde_json::Value` as the interchange form. Inbound data
//! arrives through any `Serialize` type; outbound data leaves through any
//! `DeserializeOwned` type. Marshalling is by value in both directions.
use crate::interpreter::{Completion, EvalResult, Interpreter};
use crate::types::{JsString, JsValue};
use serde_json::Value as JsonValue;

impl Interpreter {
    /// Inbound conversion without any renaming applied; the JSON built-in
    /// uses this directly.
    pub(crate) fn import_json_value(&mut self, value: &JsonValue) -> JsValue {
        self.import_value(value, false)
    }

    /// Inbound conversion for host data: honours the VM's
    /// lowercase-first-letter aliasing mode.
    pub(crate) fn import_host_value(&mut self, value: &JsonValue) -> JsValue {
        self.import_value(value, self.lowercase_keys)
    }

    fn import_value(&mut self, value: &JsonValue, lowercase_aliases: bool) -> JsValue {
        match value {
            JsonValue::Null => JsValue::Null,
            JsonValue::Bool(b) => JsValue::Boolean(*b),
            JsonValue::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => JsValue::String(JsString::from_str(s)),
            JsonValue::Array(items) => {
                let elements = items
                    .iter()
                    .map(|item| self.import_value(item, lowercase_aliases))
                    .collect();
                self.create_array(elements)
            }
            JsonValue::Object(map) => {
                let obj = self.create_object();
                for (key, item) in map {
                    let converted = self.import_value(item, lowercase_aliases);
                    obj.borrow_mut()
                        .insert_value(key.clone(), converted.clone());
                    if lowercase_aliases
                        && let Some(alias) = lower_first(key)
                        && !map.contains_key(&alias)
                    {
                        obj.borrow_mut().insert_value(alias, converted);
                    }
                }
                self.object_value(&obj)
            }
        }
    }

    /// Outbound conversion. Undefined and non-finite numbers become null
    /// (the carrier cannot express them), `Array`-class objects become
    /// sequences, other objects maps of their own enumerable properties
    /// (getters are invoked), and cycles are rejected.
    pub(crate) fn export_value(&mut self, value: &JsValue) -> EvalResult<JsonValue> {
        let mut stack = Vec::new();
        self.export_value_inner(value, &mut stack)
    }

    fn export_value_inner(
        &mut self,
        value: &JsValue,
        stack: &mut Vec<u64>,
    ) -> EvalResult<JsonValue> {
        match value {
            JsValue::Undefined | JsValue::Null => Ok(JsonValue::Null),
            JsValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
            JsValue::Number(n) => Ok(serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)),
            JsValue::String(s) => Ok(JsonValue::String(s.to_rust_string())),
            JsValue::Object(o) => {
                let Some(obj) = self.value_object(value) else {
                    return Ok(JsonValue::Null);
                };
                if obj.borrow().callable.is_some() {
                    return self
                        .throw_type_error("function values cannot be exported to the host");
                }
                // boxed primitives export their primitive
                if let Some(prim) = obj.borrow().primitive_value.clone() {
                    return self.export_value_inner(&prim, stack);
                }
                if stack.contains(&o.id) {
                    return self.throw_type_error("cyclic value cannot be exported to the host");
                }
                stack.push(o.id);
                let result = if obj.borrow().class_name == "Array" {
                    let len_val = self.get_property_value(value, "length")?;
                    let len = self.to_uint32_value(&len_val)?;
                    let mut items = Vec::with_capacity(len as usize);
                    for i in 0..len {
                        let element = self.get_property_value(value, &i.to_string())?;
                        items.push(self.export_element(&element, stack)?);
                    }
                    Ok(JsonValue::Array(items))
                } else {
                    let keys = Self::enumerate_keys(&obj, false, false);
                    let mut map = serde_json::Map::with_capacity(keys.len());
                    for key in keys {
                        let element = self.get_property_value(value, &key)?;
                        // function-valued properties are dropped, as in
                        // JSON serialization
                        if self.is_callable(&element) {
                            continue;
                        }
                        map.insert(key, self.export_element(&element, stack)?);
                    }
                    Ok(JsonValue::Object(map))
                };
                stack.pop();
                result
            }
        }
    }

    fn export_element(
        &mut self,
        element: &JsValue,
        stack: &mut Vec<u64>,
    ) -> EvalResult<JsonValue> {
        if self.is_callable(element) {
            return Ok(JsonValue::Null);
        }
        self.export_value_inner(element, stack)
    }

    /// Coerce host-function results and `set` inputs in one step.
    pub(crate) fn import_serializable<T: serde::Serialize>(
        &mut self,
        value: T,
    ) -> Result<JsValue, Completion> {
        match serde_json::to_value(value) {
            Ok(json) => Ok(self.import_host_value(&json)),
            Err(e) => {
                let err = self.create_type_error(&format!("value cannot be bridged: {e}"));
                Err(Completion::Throw(err))
            }
        }
    }
}

/// `Field` -> `field`; `None` when the key has no uppercase first letter.
fn lower_first(key: &str) -> Option<String> {
    let mut chars = key.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(first.to_lowercase().collect::<String>() + chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_first_aliases() {
        assert_eq!(lower_first("Name"), Some("name".to_string()));
        assert_eq!(lower_first("URL"), Some("uRL".to_string()));
        assert_eq!(lower_first("already"), None);
        assert_eq!(lower_first(""), None);
    }

    #[test]
    fn scalar_round_trip() {
        let mut interp = Interpreter::new();
        let json = serde_json::json!({"a": 1.5, "b": [true, null], "c": "x"});
        let imported = interp.import_json_value(&json);
        let exported = interp.export_value(&imported).expect("no script runs here");
        assert_eq!(exported, json);
    }

    #[test]
    fn lowercase_aliasing_applies_to_host_imports_only() {
        let mut interp = Interpreter::new();
        interp.lowercase_keys = true;
        let json = serde_json::json!({"Name": "x"});

        let host = interp.import_host_value(&json);
        let obj = interp.value_object(&host).expect("object import");
        assert!(obj.borrow().has_own_property("Name"));
        assert!(obj.borrow().has_own_property("name"));

        let plain = interp.import_json_value(&json);
        let obj = interp.value_object(&plain).expect("object import");
        assert!(obj.borrow().has_own_property("Name"));
        assert!(!obj.borrow().has_own_property("name"));
    }

    #[test]
    fn export_rejects_cycles() {
        let mut interp = Interpreter::new();
        let obj = interp.create_object();
        let obj_val = interp.object_value(&obj);
        obj.borrow_mut().insert_value("self".to_string(), obj_val.clone());
        assert!(interp.export_value(&obj_val).is_err());
    }
}
