use super::*;

impl Interpreter {
    pub(crate) fn setup_object(&mut self) {
        let proto = self.object_proto();

        let ctor_val = self.install_constructor("Object", 1, &proto, |interp, this, args| {
            let value = arg(args, 0);
            if value.is_nullish() {
                // `new Object()` keeps the object [[Construct]] made
                if let Some(obj) = interp.value_object(this)
                    && obj.borrow().class_name == "Object"
                {
                    return Completion::Normal(this.clone());
                }
                return Completion::Normal(interp.create_object_value());
            }
            match interp.to_object_value(&value) {
                Ok(obj) => Completion::Normal(interp.object_value(&obj)),
                Err(c) => c,
            }
        });
        let ctor = self
            .value_object(&ctor_val)
            .expect("constructor is an object");

        self.add_method(&ctor, "keys", 1, |interp, _this, args| {
            let target = arg(args, 0);
            let Some(obj) = interp.value_object(&target) else {
                let err = interp.create_type_error("Object.keys called on non-object");
                return Completion::Throw(err);
            };
            let keys = Self::enumerate_keys(&obj, false, false)
                .into_iter()
                .map(|k| JsValue::String(JsString::from_str(&k)))
                .collect();
            Completion::Normal(interp.create_array(keys))
        });

        self.add_method(&ctor, "getOwnPropertyNames", 1, |interp, _this, args| {
            let target = arg(args, 0);
            let Some(obj) = interp.value_object(&target) else {
                let err =
                    interp.create_type_error("Object.getOwnPropertyNames called on non-object");
                return Completion::Throw(err);
            };
            let keys = obj
                .borrow()
                .own_keys(true)
                .into_iter()
                .map(|k| JsValue::String(JsString::from_str(&k)))
                .collect();
            Completion::Normal(interp.create_array(keys))
        });

        self.add_method(&ctor, "getPrototypeOf", 1, |interp, _this, args| {
            let target = arg(args, 0);
            let Some(obj) = interp.value_object(&target) else {
                let err = interp.create_type_error("Object.getPrototypeOf called on non-object");
                return Completion::Throw(err);
            };
            let proto = obj.borrow().prototype.clone();
            Completion::Normal(match proto {
                Some(p) => interp.object_value(&p),
                None => JsValue::Null,
            })
        });

        self.add_method(&ctor, "create", 2, |interp, _this, args| {
            let proto_val = arg(args, 0);
            let proto = match &proto_val {
                JsValue::Null => None,
                JsValue::Object(_) => interp.value_object(&proto_val),
                _ => {
                    let err = interp
                        .create_type_error("Object prototype may only be an Object or null");
                    return Completion::Throw(err);
                }
            };
            let obj = interp.create_object();
            obj.borrow_mut().prototype = proto;
            let obj_val = interp.object_value(&obj);
            let props = arg(args, 1);
            if !props.is_undefined() {
                if let Err(c) = interp.define_properties_from(&obj, &props) {
                    return c;
                }
            }
            Completion::Normal(obj_val)
        });

        self.add_method(&ctor, "defineProperty", 3, |interp, _this, args| {
            let target = arg(args, 0);
            let Some(obj) = interp.value_object(&target) else {
                let err = interp.create_type_error("Object.defineProperty called on non-object");
                return Completion::Throw(err);
            };
            let key = match interp.to_string_value(&arg(args, 1)) {
                Ok(k) => k,
                Err(c) => return c,
            };
            let desc = match interp.to_property_descriptor(&arg(args, 2)) {
                Ok(d) => d,
                Err(c) => return c,
            };
            match interp.object_define_own_property(&obj, &key, desc, true) {
                Ok(_) => Completion::Normal(target),
                Err(c) => c,
            }
        });

        self.add_method(&ctor, "defineProperties", 2, |interp, _this, args| {
            let target = arg(args, 0);
            let Some(obj) = interp.value_object(&target) else {
                let err =
                    interp.create_type_error("Object.defineProperties called on non-object");
                return Completion::Throw(err);
            };
            if let Err(c) = interp.define_properties_from(&obj, &arg(args, 1)) {
                return c;
            }
            Completion::Normal(target)
        });

        self.add_method(&ctor, "getOwnPropertyDescriptor", 2, |interp, _this, args| {
            let target = arg(args, 0);
            let Some(obj) = interp.value_object(&target) else {
                let err = interp
                    .create_type_error("Object.getOwnPropertyDescriptor called on non-object");
                return Completion::Throw(err);
            };
            let key = match interp.to_string_value(&arg(args, 1)) {
                Ok(k) => k,
                Err(c) => return c,
            };
            let desc = obj.borrow().get_own_property(&key);
            match desc {
                Some(d) => Completion::Normal(interp.from_property_descriptor(&d)),
                None => Completion::Normal(JsValue::Undefined),
            }
        });

        self.add_method(&ctor, "preventExtensions", 1, |interp, _this, args| {
            let target = arg(args, 0);
            if let Some(obj) = interp.value_object(&target) {
                obj.borrow_mut().extensible = false;
            }
            Completion::Normal(target)
        });

        self.add_method(&ctor, "isExtensible", 1, |interp, _this, args| {
            let extensible = interp
                .value_object(&arg(args, 0))
                .is_some_and(|o| o.borrow().extensible);
            Completion::Normal(JsValue::Boolean(extensible))
        });

        self.add_method(&ctor, "seal", 1, |interp, _this, args| {
            let target = arg(args, 0);
            if let Some(obj) = interp.value_object(&target) {
                let mut o = obj.borrow_mut();
                o.extensible = false;
                for desc in o.properties.values_mut() {
                    desc.configurable = Some(false);
                }
            }
            Completion::Normal(target)
        });

        self.add_method(&ctor, "isSealed", 1, |interp, _this, args| {
            let sealed = interp.value_object(&arg(args, 0)).is_some_and(|o| {
                let o = o.borrow();
                !o.extensible && o.properties.values().all(|d| !d.is_configurable())
            });
            Completion::Normal(JsValue::Boolean(sealed))
        });

        self.add_method(&ctor, "freeze", 1, |interp, _this, args| {
            let target = arg(args, 0);
            if let Some(obj) = interp.value_object(&target) {
                let mut o = obj.borrow_mut();
                o.extensible = false;
                for desc in o.properties.values_mut() {
                    desc.configurable = Some(false);
                    if desc.is_data_descriptor() {
                        desc.writable = Some(false);
                    }
                }
            }
            Completion::Normal(target)
        });

        self.add_method(&ctor, "isFrozen", 1, |interp, _this, args| {
            let frozen = interp.value_object(&arg(args, 0)).is_some_and(|o| {
                let o = o.borrow();
                !o.extensible
                    && o.properties.values().all(|d| {
                        !d.is_configurable() && (!d.is_data_descriptor() || !d.is_writable())
                    })
            });
            Completion::Normal(JsValue::Boolean(frozen))
        });

        // Object.prototype
        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            let tag = match this {
                JsValue::Undefined => "Undefined".to_string(),
                JsValue::Null => "Null".to_string(),
                _ => match interp.to_object_value(this) {
                    Ok(obj) => obj.borrow().class_name.clone(),
                    Err(c) => return c,
                },
            };
            Completion::Normal(JsValue::String(JsString::from_str(&format!(
                "[object {tag}]"
            ))))
        });

        self.add_method(&proto, "toLocaleString", 0, |interp, this, _args| {
            let to_string = match interp.get_property_value(this, "toString") {
                Ok(f) => f,
                Err(c) => return c,
            };
            interp.call_function(&to_string, this, &[])
        });

        self.add_method(&proto, "valueOf", 0, |interp, this, _args| {
            match interp.to_object_value(this) {
                Ok(obj) => Completion::Normal(interp.object_value(&obj)),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "hasOwnProperty", 1, |interp, this, args| {
            let key = match interp.to_string_value(&arg(args, 0)) {
                Ok(k) => k,
                Err(c) => return c,
            };
            let obj = match interp.to_object_value(this) {
                Ok(o) => o,
                Err(c) => return c,
            };
            let has = obj.borrow().has_own_property(&key);
            Completion::Normal(JsValue::Boolean(has))
        });

        self.add_method(&proto, "isPrototypeOf", 1, |interp, this, args| {
            let Some(candidate) = interp.value_object(&arg(args, 0)) else {
                return Completion::Normal(JsValue::Boolean(false));
            };
            let obj = match interp.to_object_value(this) {
                Ok(o) => o,
                Err(c) => return c,
            };
            let mut cur = candidate.borrow().prototype.clone();
            while let Some(p) = cur {
                if Rc::ptr_eq(&p, &obj) {
                    return Completion::Normal(JsValue::Boolean(true));
                }
                cur = p.borrow().prototype.clone();
            }
            Completion::Normal(JsValue::Boolean(false))
        });

        self.add_method(&proto, "propertyIsEnumerable", 1, |interp, this, args| {
            let key = match interp.to_string_value(&arg(args, 0)) {
                Ok(k) => k,
                Err(c) => return c,
            };
            let obj = match interp.to_object_value(this) {
                Ok(o) => o,
                Err(c) => return c,
            };
            let enumerable = obj
                .borrow()
                .get_own_property(&key)
                .is_some_and(|d| d.is_enumerable());
            Completion::Normal(JsValue::Boolean(enumerable))
        });
    }

    /// §8.10.5 ToPropertyDescriptor.
    pub(crate) fn to_property_descriptor(
        &mut self,
        val: &JsValue,
    ) -> Result<PropertyDescriptor, Completion> {
        let Some(obj) = self.value_object(val) else {
            let err = self.create_type_error("Property description must be an object");
            return Err(Completion::Throw(err));
        };
        let mut desc = PropertyDescriptor {
            value: None,
            writable: None,
            get: None,
            set: None,
            enumerable: None,
            configurable: None,
        };
        if obj.borrow().has_property("value") {
            desc.value = Some(self.get_property_value(val, "value")?);
        }
        if obj.borrow().has_property("writable") {
            let v = self.get_property_value(val, "writable")?;
            desc.writable = Some(to_boolean(&v));
        }
        if obj.borrow().has_property("enumerable") {
            let v = self.get_property_value(val, "enumerable")?;
            desc.enumerable = Some(to_boolean(&v));
        }
        if obj.borrow().has_property("configurable") {
            let v = self.get_property_value(val, "configurable")?;
            desc.configurable = Some(to_boolean(&v));
        }
        if obj.borrow().has_property("get") {
            let getter = self.get_property_value(val, "get")?;
            if !getter.is_undefined() && !self.is_callable(&getter) {
                return Err(Completion::Throw(
                    self.create_type_error("Getter must be a function"),
                ));
            }
            desc.get = Some(getter);
        }
        if obj.borrow().has_property("set") {
            let setter = self.get_property_value(val, "set")?;
            if !setter.is_undefined() && !self.is_callable(&setter) {
                return Err(Completion::Throw(
                    self.create_type_error("Setter must be a function"),
                ));
            }
            desc.set = Some(setter);
        }
        if desc.is_accessor_descriptor() && (desc.value.is_some() || desc.writable.is_some()) {
            return Err(Completion::Throw(self.create_type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            )));
        }
        Ok(desc)
    }

    /// §8.10.4 FromPropertyDescriptor.
    pub(crate) fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsValue {
        let result = self.create_object();
        {
            let mut r = result.borrow_mut();
            if desc.is_data_descriptor() {
                r.insert_value(
                    "value".to_string(),
                    desc.value.clone().unwrap_or(JsValue::Undefined),
                );
                r.insert_value(
                    "writable".to_string(),
                    JsValue::Boolean(desc.is_writable()),
                );
            } else {
                r.insert_value(
                    "get".to_string(),
                    desc.get.clone().unwrap_or(JsValue::Undefined),
                );
                r.insert_value(
                    "set".to_string(),
                    desc.set.clone().unwrap_or(JsValue::Undefined),
                );
            }
            r.insert_value(
                "enumerable".to_string(),
                JsValue::Boolean(desc.is_enumerable()),
            );
            r.insert_value(
                "configurable".to_string(),
                JsValue::Boolean(desc.is_configurable()),
            );
        }
        self.object_value(&result)
    }

    fn define_properties_from(&mut self, obj: &ObjRef, props: &JsValue) -> Result<(), Completion> {
        let Some(props_obj) = self.value_object(props) else {
            let err = self.create_type_error("Property descriptor list must be an object");
            return Err(Completion::Throw(err));
        };
        let keys = Self::enumerate_keys(&props_obj, false, false);
        let mut descriptors = Vec::with_capacity(keys.len());
        for key in keys {
            let desc_val = self.get_property_value(props, &key)?;
            let desc = self.to_property_descriptor(&desc_val)?;
            descriptors.push((key, desc));
        }
        for (key, desc) in descriptors {
            self.object_define_own_property(obj, &key, desc, true)?;
        }
        Ok(())
    }
}
