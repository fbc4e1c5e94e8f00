use crate::ast::FunctionLiteral;
use crate::types::{JsString, JsValue, number_ops};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) type ObjRef = Rc<RefCell<JsObjectData>>;
pub(crate) type EnvRef = Rc<RefCell<Environment>>;

/// How a statement or expression exited. `Fatal` is not part of the ES
/// completion taxonomy: it models a host interrupt and unwinds without
/// running catch or finally handlers.
#[derive(Debug)]
pub(crate) enum Completion {
    Normal(JsValue),
    Break(Option<String>),
    Continue(Option<String>),
    Return(JsValue),
    Throw(JsValue),
    Fatal,
}

impl Completion {
    pub(crate) fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }
}

/// A lexical environment record. With `object` set the record is
/// object-backed: bindings are the object's properties (`with`, and the
/// global scope over the global object). `provide_this` distinguishes
/// `with` records, whose binding object becomes `this` for method calls.
pub(crate) struct Environment {
    pub(crate) bindings: HashMap<String, Binding>,
    pub(crate) parent: Option<EnvRef>,
    pub(crate) object: Option<ObjRef>,
    pub(crate) provide_this: bool,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.bindings.keys())
            .field("object_backed", &self.object.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) value: JsValue,
    pub(crate) mutable: bool,
}

impl Environment {
    pub(crate) fn new(parent: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            parent,
            object: None,
            provide_this: false,
        }))
    }

    pub(crate) fn new_object_backed(parent: Option<EnvRef>, object: ObjRef, provide_this: bool) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            parent,
            object: Some(object),
            provide_this,
        }))
    }

    pub(crate) fn declare(&mut self, name: &str, value: JsValue) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    pub(crate) fn declare_immutable(&mut self, name: &str, value: JsValue) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: false,
            },
        );
    }

    /// Whether this single record binds `name` (no parent walk).
    pub(crate) fn has_binding(&self, name: &str) -> bool {
        if let Some(ref obj) = self.object {
            return obj.borrow().has_property(name);
        }
        self.bindings.contains_key(name)
    }
}

/// The compiled-body-plus-closure, native, and bound forms of a callable.
pub(crate) enum JsFunction {
    User {
        decl: Rc<FunctionLiteral>,
        closure: EnvRef,
    },
    Native {
        name: String,
        length: usize,
        func: Rc<NativeFn>,
        constructor: bool,
    },
    Bound {
        target: Box<JsValue>,
        this: Box<JsValue>,
        args: Vec<JsValue>,
    },
}

pub(crate) type NativeFn =
    dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion;

impl JsFunction {
    pub(crate) fn native(
        name: impl Into<String>,
        length: usize,
        func: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.into(),
            length,
            func: Rc::new(func),
            constructor: false,
        }
    }

    pub(crate) fn constructor(
        name: impl Into<String>,
        length: usize,
        func: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.into(),
            length,
            func: Rc::new(func),
            constructor: true,
        }
    }

}

impl Clone for JsFunction {
    fn clone(&self) -> Self {
        match self {
            JsFunction::User { decl, closure } => JsFunction::User {
                decl: decl.clone(),
                closure: closure.clone(),
            },
            JsFunction::Native {
                name,
                length,
                func,
                constructor,
            } => JsFunction::Native {
                name: name.clone(),
                length: *length,
                func: func.clone(),
                constructor: *constructor,
            },
            JsFunction::Bound { target, this, args } => JsFunction::Bound {
                target: target.clone(),
                this: this.clone(),
                args: args.clone(),
            },
        }
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsFunction::User { decl, .. } => write!(f, "JsFunction::User({:?})", decl.name),
            JsFunction::Native { name, length, .. } => {
                write!(f, "JsFunction::Native({name:?}, {length})")
            }
            JsFunction::Bound { .. } => write!(f, "JsFunction::Bound"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub(crate) fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub(crate) fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub(crate) fn value_only(value: JsValue) -> Self {
        Self {
            value: Some(value),
            writable: None,
            get: None,
            set: None,
            enumerable: None,
            configurable: None,
        }
    }

    pub(crate) fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub(crate) fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub(crate) fn is_writable(&self) -> bool {
        self.writable == Some(true)
    }

    pub(crate) fn is_enumerable(&self) -> bool {
        self.enumerable == Some(true)
    }

    pub(crate) fn is_configurable(&self) -> bool {
        self.configurable == Some(true)
    }
}

/// Compiled RegExp internals: the original source and flags plus the
/// translated matcher.
#[derive(Debug, Clone)]
pub(crate) struct RegExpData {
    pub source: String,
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
    pub matcher: regex::Regex,
}

/// A heap object: class tag, prototype link, attributed property table in
/// insertion order, and per-class internal slots.
pub(crate) struct JsObjectData {
    pub id: Option<u64>,
    pub class_name: String,
    pub properties: HashMap<String, PropertyDescriptor>,
    pub property_order: Vec<String>,
    pub prototype: Option<ObjRef>,
    pub extensible: bool,
    pub callable: Option<JsFunction>,
    /// Boxed String/Number/Boolean value; the Date time value.
    pub primitive_value: Option<JsValue>,
    /// `arguments` aliasing: index key -> (activation env, parameter name).
    pub parameter_map: Option<HashMap<String, (EnvRef, String)>>,
    pub regexp: Option<RegExpData>,
}

impl JsObjectData {
    pub(crate) fn new() -> Self {
        Self {
            id: None,
            class_name: "Object".to_string(),
            properties: HashMap::new(),
            property_order: Vec::new(),
            prototype: None,
            extensible: true,
            callable: None,
            primitive_value: None,
            parameter_map: None,
            regexp: None,
        }
    }

    /// [[GetOwnProperty]], including the virtual own properties of boxed
    /// strings and the live `arguments` mapping.
    pub(crate) fn get_own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.properties.get(key) {
            let mut d = desc.clone();
            if let Some(ref map) = self.parameter_map
                && let Some((env, param)) = map.get(key)
                && let Some(binding) = env.borrow().bindings.get(param)
            {
                d.value = Some(binding.value.clone());
            }
            return Some(d);
        }
        if self.class_name == "String"
            && let Some(JsValue::String(ref s)) = self.primitive_value
        {
            if key == "length" {
                return Some(PropertyDescriptor::data(
                    JsValue::Number(s.len() as f64),
                    false,
                    false,
                    false,
                ));
            }
            if let Ok(idx) = key.parse::<usize>()
                && idx < s.len()
                && key == idx.to_string()
            {
                return Some(PropertyDescriptor::data(
                    JsValue::String(s.slice_units(idx, idx + 1)),
                    false,
                    true,
                    false,
                ));
            }
        }
        None
    }

    /// [[GetProperty]]: walks the prototype chain.
    pub(crate) fn get_property_descriptor(&self, key: &str) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.get_own_property(key) {
            return Some(desc);
        }
        if let Some(ref proto) = self.prototype {
            return proto.borrow().get_property_descriptor(key);
        }
        None
    }

    /// [[HasProperty]].
    pub(crate) fn has_property(&self, key: &str) -> bool {
        if self.get_own_property(key).is_some() {
            return true;
        }
        if let Some(ref proto) = self.prototype {
            return proto.borrow().has_property(key);
        }
        false
    }

    pub(crate) fn has_own_property(&self, key: &str) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Plain data read: own properties then the prototype chain, ignoring
    /// accessors (callers that honour getters go through the interpreter).
    pub(crate) fn get_data_property(&self, key: &str) -> JsValue {
        match self.get_property_descriptor(key) {
            Some(desc) => desc.value.unwrap_or(JsValue::Undefined),
            None => JsValue::Undefined,
        }
    }

    /// Own keys in insertion order. Virtual index properties of boxed
    /// strings come first, mirroring their creation order.
    pub(crate) fn own_keys(&self, include_non_enumerable: bool) -> Vec<String> {
        let mut keys = Vec::new();
        if self.class_name == "String"
            && let Some(JsValue::String(ref s)) = self.primitive_value
        {
            for i in 0..s.len() {
                keys.push(i.to_string());
            }
            if include_non_enumerable {
                keys.push("length".to_string());
            }
        }
        for k in &self.property_order {
            if let Some(desc) = self.properties.get(k)
                && (include_non_enumerable || desc.is_enumerable())
            {
                keys.push(k.clone());
            }
        }
        keys
    }

    /// [[Delete]] without the throw flag; the interpreter layers that on.
    pub(crate) fn delete(&mut self, key: &str) -> bool {
        match self.properties.get(key) {
            Some(desc) => {
                if !desc.is_configurable() {
                    return false;
                }
                self.properties.remove(key);
                self.property_order.retain(|k| k != key);
                if let Some(ref mut map) = self.parameter_map {
                    map.remove(key);
                }
                true
            }
            None => {
                // virtual string index/length props are non-configurable
                !self.has_own_property(key)
            }
        }
    }

    /// The §8.12.9 [[DefineOwnProperty]] validity-and-merge machine.
    /// Returns false on rejection; the caller decides whether to throw.
    pub(crate) fn define_own_property(&mut self, key: String, desc: PropertyDescriptor) -> bool {
        if let Some(current) = self.properties.get(&key).cloned() {
            // every field absent: nothing to do
            if desc.value.is_none()
                && desc.writable.is_none()
                && desc.get.is_none()
                && desc.set.is_none()
                && desc.enumerable.is_none()
                && desc.configurable.is_none()
            {
                return true;
            }

            if current.configurable == Some(false) {
                if desc.configurable == Some(true) {
                    return false;
                }
                if desc.enumerable.is_some() && desc.enumerable != current.enumerable {
                    return false;
                }

                let current_is_data = current.is_data_descriptor();
                let current_is_accessor = current.is_accessor_descriptor();
                let desc_is_data = desc.is_data_descriptor();
                let desc_is_accessor = desc.is_accessor_descriptor();

                // data <-> accessor flips are not allowed on non-configurable
                if current_is_data && !current_is_accessor && desc_is_accessor && !desc_is_data {
                    return false;
                }
                if current_is_accessor && !current_is_data && desc_is_data && !desc_is_accessor {
                    return false;
                }

                if current_is_data && !current_is_accessor {
                    if current.writable == Some(false) {
                        if desc.writable == Some(true) {
                            return false;
                        }
                        if let Some(ref new_val) = desc.value {
                            match current.value {
                                Some(ref cur_val) => {
                                    if !same_value(new_val, cur_val) {
                                        return false;
                                    }
                                }
                                None => return false,
                            }
                        }
                    }
                } else if current_is_accessor {
                    if let Some(ref new_get) = desc.get {
                        let cur_get = current.get.as_ref().unwrap_or(&JsValue::Undefined);
                        if !same_value(new_get, cur_get) {
                            return false;
                        }
                    }
                    if let Some(ref new_set) = desc.set {
                        let cur_set = current.set.as_ref().unwrap_or(&JsValue::Undefined);
                        if !same_value(new_set, cur_set) {
                            return false;
                        }
                    }
                }
            }

            let desc_is_data = desc.is_data_descriptor();
            let desc_is_accessor = desc.is_accessor_descriptor();
            let desc_has_get = desc.get.is_some();
            let desc_has_set = desc.set.is_some();
            let desc_writable = desc.writable;

            // arguments aliasing: writes flow into the parameter binding;
            // turning the slot into an accessor or freezing it severs the link
            if let Some(ref mut map) = self.parameter_map
                && map.contains_key(&key)
            {
                if let Some(ref val) = desc.value
                    && let Some((env, param)) = map.get(&key)
                    && let Some(binding) = env.borrow_mut().bindings.get_mut(param)
                {
                    binding.value = val.clone();
                }
                if desc_has_get || desc_has_set || desc_writable == Some(false) {
                    map.remove(&key);
                }
            }

            let current_is_data = current.is_data_descriptor();
            let current_is_accessor = current.is_accessor_descriptor();

            let merged = if desc_is_data && !desc_is_accessor && current_is_accessor && !current_is_data
            {
                PropertyDescriptor {
                    value: desc.value.or(Some(JsValue::Undefined)),
                    writable: desc.writable.or(Some(false)),
                    get: None,
                    set: None,
                    enumerable: desc.enumerable.or(current.enumerable),
                    configurable: desc.configurable.or(current.configurable),
                }
            } else if desc_is_accessor && !desc_is_data && current_is_data && !current_is_accessor {
                PropertyDescriptor {
                    value: None,
                    writable: None,
                    get: desc.get.or(Some(JsValue::Undefined)),
                    set: desc.set.or(Some(JsValue::Undefined)),
                    enumerable: desc.enumerable.or(current.enumerable),
                    configurable: desc.configurable.or(current.configurable),
                }
            } else {
                let result_is_accessor = if desc_is_accessor {
                    true
                } else if desc_is_data {
                    false
                } else {
                    current_is_accessor
                };
                if result_is_accessor {
                    PropertyDescriptor {
                        value: None,
                        writable: None,
                        get: desc.get.or(current.get),
                        set: desc.set.or(current.set),
                        enumerable: desc.enumerable.or(current.enumerable),
                        configurable: desc.configurable.or(current.configurable),
                    }
                } else {
                    PropertyDescriptor {
                        value: desc.value.or(current.value),
                        writable: desc.writable.or(current.writable),
                        get: None,
                        set: None,
                        enumerable: desc.enumerable.or(current.enumerable),
                        configurable: desc.configurable.or(current.configurable),
                    }
                }
            };

            self.properties.insert(key, merged);
            return true;
        }

        // virtual own properties (string indices) reject redefinition
        if self.has_own_property(&key) {
            return false;
        }
        if !self.extensible {
            return false;
        }
        if let Some(ref mut map) = self.parameter_map
            && map.contains_key(&key)
            && let Some(ref val) = desc.value
            && let Some((env, param)) = map.get(&key)
            && let Some(binding) = env.borrow_mut().bindings.get_mut(param)
        {
            binding.value = val.clone();
        }
        self.property_order.push(key.clone());
        let is_accessor = desc.is_accessor_descriptor();
        let new_desc = PropertyDescriptor {
            value: desc
                .value
                .or(if is_accessor { None } else { Some(JsValue::Undefined) }),
            writable: desc
                .writable
                .or(if is_accessor { None } else { Some(false) }),
            get: desc.get,
            set: desc.set,
            enumerable: desc.enumerable.or(Some(false)),
            configurable: desc.configurable.or(Some(false)),
        };
        self.properties.insert(key, new_desc);
        true
    }

    pub(crate) fn insert_value(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    /// Builtins are writable and configurable but hidden from enumeration.
    pub(crate) fn insert_builtin(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, true, false, true));
    }

    pub(crate) fn insert_property(&mut self, key: String, desc: PropertyDescriptor) {
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }
}

/// SameValue, §9.12 (pure: object legs compare identity).
pub(crate) fn same_value(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        _ => strict_equals(left, right),
    }
}

/// Strict equality, §11.9.6.
pub(crate) fn strict_equals(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::equal(*a, *b),
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Object(a), JsValue::Object(b)) => a.id == b.id,
        _ => false,
    }
}

/// An unresolved left-hand side: where a value would be read from or
/// written to. Never escapes the evaluator.
#[derive(Debug)]
pub(crate) enum Reference {
    Environment { env: EnvRef, name: String },
    Property { base: JsValue, name: String },
    Unresolvable { name: String },
}

pub(crate) const GC_THRESHOLD: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: JsValue) -> PropertyDescriptor {
        PropertyDescriptor::data_default(value)
    }

    #[test]
    fn define_new_property_fills_defaults() {
        let mut obj = JsObjectData::new();
        assert!(obj.define_own_property(
            "a".to_string(),
            PropertyDescriptor::value_only(JsValue::Number(1.0))
        ));
        let desc = obj.get_own_property("a").unwrap();
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(false));
    }

    #[test]
    fn non_configurable_rejects_reconfiguration() {
        let mut obj = JsObjectData::new();
        obj.define_own_property(
            "a".to_string(),
            PropertyDescriptor::data(JsValue::Number(1.0), false, false, false),
        );
        // changing the value of a frozen slot is rejected
        assert!(!obj.define_own_property(
            "a".to_string(),
            PropertyDescriptor::value_only(JsValue::Number(2.0))
        ));
        // re-stating the same value is fine
        assert!(obj.define_own_property(
            "a".to_string(),
            PropertyDescriptor::value_only(JsValue::Number(1.0))
        ));
        // flipping to an accessor is rejected
        assert!(!obj.define_own_property(
            "a".to_string(),
            PropertyDescriptor {
                value: None,
                writable: None,
                get: Some(JsValue::Undefined),
                set: None,
                enumerable: None,
                configurable: None,
            }
        ));
    }

    #[test]
    fn configurable_data_to_accessor_transition() {
        let mut obj = JsObjectData::new();
        obj.define_own_property("a".to_string(), data(JsValue::Number(1.0)));
        assert!(obj.define_own_property(
            "a".to_string(),
            PropertyDescriptor {
                value: None,
                writable: None,
                get: Some(JsValue::Undefined),
                set: None,
                enumerable: None,
                configurable: None,
            }
        ));
        let desc = obj.get_own_property("a").unwrap();
        assert!(desc.is_accessor_descriptor());
        assert!(!desc.is_data_descriptor());
        // enumerable/configurable survive the transition
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(desc.configurable, Some(true));
    }

    #[test]
    fn non_extensible_rejects_new_properties() {
        let mut obj = JsObjectData::new();
        obj.extensible = false;
        assert!(!obj.define_own_property("a".to_string(), data(JsValue::Null)));
    }

    #[test]
    fn delete_respects_configurability() {
        let mut obj = JsObjectData::new();
        obj.insert_value("a".to_string(), JsValue::Number(1.0));
        obj.define_own_property(
            "b".to_string(),
            PropertyDescriptor::data(JsValue::Number(2.0), true, true, false),
        );
        assert!(obj.delete("a"));
        assert!(!obj.delete("b"));
        assert!(obj.delete("missing"));
        assert!(!obj.has_own_property("a"));
        assert!(obj.has_own_property("b"));
    }

    #[test]
    fn own_keys_follow_insertion_order() {
        let mut obj = JsObjectData::new();
        obj.insert_value("z".to_string(), JsValue::Number(1.0));
        obj.insert_value("a".to_string(), JsValue::Number(2.0));
        obj.insert_builtin("hidden".to_string(), JsValue::Null);
        assert_eq!(obj.own_keys(false), vec!["z".to_string(), "a".to_string()]);
        assert_eq!(obj.own_keys(true).len(), 3);
    }

    #[test]
    fn boxed_string_virtual_properties() {
        let mut obj = JsObjectData::new();
        obj.class_name = "String".to_string();
        obj.primitive_value = Some(JsValue::String(JsString::from_str("hi")));
        let len = obj.get_own_property("length").unwrap();
        assert!(matches!(len.value, Some(JsValue::Number(n)) if n == 2.0));
        let first = obj.get_own_property("0").unwrap();
        assert!(matches!(first.value, Some(JsValue::String(ref s)) if s.to_rust_string() == "h"));
        assert!(obj.get_own_property("2").is_none());
        assert!(!obj.delete("0"));
    }

    #[test]
    fn prototype_chain_lookup() {
        let proto = Rc::new(RefCell::new(JsObjectData::new()));
        proto
            .borrow_mut()
            .insert_value("inherited".to_string(), JsValue::Number(7.0));
        let mut obj = JsObjectData::new();
        obj.prototype = Some(proto);
        assert!(obj.has_property("inherited"));
        assert!(!obj.has_own_property("inherited"));
        assert!(matches!(
            obj.get_data_property("inherited"),
            JsValue::Number(n) if n == 7.0
        ));
    }

    #[test]
    fn strict_equals_objects_by_identity() {
        use crate::types::JsObject;
        let a = JsValue::Object(JsObject { id: 1 });
        let b = JsValue::Object(JsObject { id: 1 });
        let c = JsValue::Object(JsObject { id: 2 });
        assert!(strict_equals(&a, &b));
        assert!(!strict_equals(&a, &c));
        assert!(!strict_equals(
            &JsValue::Number(f64::NAN),
            &JsValue::Number(f64::NAN)
        ));
    }
}
