use super::*;

impl Interpreter {
    pub(crate) fn setup_array(&mut self) {
        let proto = self
            .array_prototype
            .clone()
            .expect("set during construction");

        let ctor_val = self.install_constructor("Array", 1, &proto, |interp, _this, args| {
            // `new Array(len)` with a single numeric argument sets length
            if args.len() == 1
                && let JsValue::Number(n) = args[0]
            {
                let len = crate::types::number_ops::to_uint32(n);
                if len as f64 != n {
                    let err = interp.create_range_error("Invalid array length");
                    return Completion::Throw(err);
                }
                let arr = interp.create_array(Vec::new());
                if let Some(obj) = interp.value_object(&arr) {
                    obj.borrow_mut().define_own_property(
                        "length".to_string(),
                        PropertyDescriptor::value_only(JsValue::Number(len as f64)),
                    );
                }
                return Completion::Normal(arr);
            }
            Completion::Normal(interp.create_array(args.to_vec()))
        });
        let ctor = self
            .value_object(&ctor_val)
            .expect("constructor is an object");

        self.add_method(&ctor, "isArray", 1, |interp, _this, args| {
            let is_array = interp
                .value_object(&arg(args, 0))
                .is_some_and(|o| o.borrow().class_name == "Array");
            Completion::Normal(JsValue::Boolean(is_array))
        });

        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            let join = match interp.get_property_value(this, "join") {
                Ok(f) => f,
                Err(c) => return c,
            };
            if interp.is_callable(&join) {
                interp.call_function(&join, this, &[])
            } else {
                Completion::Normal(JsValue::String(JsString::from_str("[object Array]")))
            }
        });

        self.add_method(&proto, "join", 1, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let separator = match arg(args, 0) {
                JsValue::Undefined => ",".to_string(),
                v => match interp.to_string_value(&v) {
                    Ok(s) => s,
                    Err(c) => return c,
                },
            };
            let mut parts = Vec::with_capacity(len as usize);
            for i in 0..len {
                let element = match interp.get_property_value(&obj_val, &i.to_string()) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                if element.is_nullish() {
                    parts.push(String::new());
                } else {
                    match interp.to_string_value(&element) {
                        Ok(s) => parts.push(s),
                        Err(c) => return c,
                    }
                }
            }
            Completion::Normal(JsValue::String(JsString::from_str(&parts.join(&separator))))
        });

        self.add_method(&proto, "push", 1, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let mut n = len as u64;
            for v in args {
                if let Err(c) =
                    interp.put_property_value(&obj_val, &n.to_string(), v.clone(), true)
                {
                    return c;
                }
                n += 1;
            }
            let new_len = JsValue::Number(n as f64);
            if let Err(c) = interp.put_property_value(&obj_val, "length", new_len.clone(), true) {
                return c;
            }
            Completion::Normal(new_len)
        });

        self.add_method(&proto, "pop", 0, |interp, this, _args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            if len == 0 {
                if let Err(c) =
                    interp.put_property_value(&obj_val, "length", JsValue::Number(0.0), true)
                {
                    return c;
                }
                return Completion::Normal(JsValue::Undefined);
            }
            let index = (len - 1).to_string();
            let element = match interp.get_property_value(&obj_val, &index) {
                Ok(v) => v,
                Err(c) => return c,
            };
            if let Err(c) = interp.delete_property_value(&obj_val, &index) {
                return c;
            }
            if let Err(c) = interp.put_property_value(
                &obj_val,
                "length",
                JsValue::Number((len - 1) as f64),
                true,
            ) {
                return c;
            }
            Completion::Normal(element)
        });

        self.add_method(&proto, "shift", 0, |interp, this, _args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            if len == 0 {
                if let Err(c) =
                    interp.put_property_value(&obj_val, "length", JsValue::Number(0.0), true)
                {
                    return c;
                }
                return Completion::Normal(JsValue::Undefined);
            }
            let first = match interp.get_property_value(&obj_val, "0") {
                Ok(v) => v,
                Err(c) => return c,
            };
            for i in 1..len {
                let from = i.to_string();
                let to = (i - 1).to_string();
                let has = interp
                    .value_object(&obj_val)
                    .is_some_and(|o| o.borrow().has_property(&from));
                if has {
                    let v = match interp.get_property_value(&obj_val, &from) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    if let Err(c) = interp.put_property_value(&obj_val, &to, v, true) {
                        return c;
                    }
                } else if let Err(c) = interp.delete_property_value(&obj_val, &to) {
                    return c;
                }
            }
            if let Err(c) = interp.delete_property_value(&obj_val, &(len - 1).to_string()) {
                return c;
            }
            if let Err(c) = interp.put_property_value(
                &obj_val,
                "length",
                JsValue::Number((len - 1) as f64),
                true,
            ) {
                return c;
            }
            Completion::Normal(first)
        });

        self.add_method(&proto, "unshift", 1, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let count = args.len() as u64;
            for i in (0..len as u64).rev() {
                let from = i.to_string();
                let to = (i + count).to_string();
                let has = interp
                    .value_object(&obj_val)
                    .is_some_and(|o| o.borrow().has_property(&from));
                if has {
                    let v = match interp.get_property_value(&obj_val, &from) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    if let Err(c) = interp.put_property_value(&obj_val, &to, v, true) {
                        return c;
                    }
                } else if let Err(c) = interp.delete_property_value(&obj_val, &to) {
                    return c;
                }
            }
            for (i, v) in args.iter().enumerate() {
                if let Err(c) =
                    interp.put_property_value(&obj_val, &i.to_string(), v.clone(), true)
                {
                    return c;
                }
            }
            let new_len = JsValue::Number((len as u64 + count) as f64);
            if let Err(c) = interp.put_property_value(&obj_val, "length", new_len.clone(), true) {
                return c;
            }
            Completion::Normal(new_len)
        });

        self.add_method(&proto, "reverse", 0, |interp, this, _args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let middle = len / 2;
            for lower in 0..middle {
                let upper = len - lower - 1;
                let lower_key = lower.to_string();
                let upper_key = upper.to_string();
                let lower_val = match interp.get_property_value(&obj_val, &lower_key) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                let upper_val = match interp.get_property_value(&obj_val, &upper_key) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                if let Err(c) = interp.put_property_value(&obj_val, &lower_key, upper_val, true) {
                    return c;
                }
                if let Err(c) = interp.put_property_value(&obj_val, &upper_key, lower_val, true) {
                    return c;
                }
            }
            Completion::Normal(obj_val)
        });

        self.add_method(&proto, "concat", 1, |interp, this, args| {
            let obj = match interp.to_object_value(this) {
                Ok(o) => o,
                Err(c) => return c,
            };
            let this_val = interp.object_value(&obj);
            let mut out: Vec<JsValue> = Vec::new();
            let mut push_item = |interp: &mut Interpreter,
                                 item: &JsValue,
                                 out: &mut Vec<JsValue>|
             -> Result<(), Completion> {
                let is_array = interp
                    .value_object(item)
                    .is_some_and(|o| o.borrow().class_name == "Array");
                if is_array {
                    let len_val = interp.get_property_value(item, "length")?;
                    let len = interp.to_uint32_value(&len_val)?;
                    for i in 0..len {
                        out.push(interp.get_property_value(item, &i.to_string())?);
                    }
                } else {
                    out.push(item.clone());
                }
                Ok(())
            };
            if let Err(c) = push_item(interp, &this_val, &mut out) {
                return c;
            }
            for a in args {
                if let Err(c) = push_item(interp, a, &mut out) {
                    return c;
                }
            }
            Completion::Normal(interp.create_array(out))
        });

        self.add_method(&proto, "slice", 2, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let (start, end) =
                match relative_range(interp, &arg(args, 0), &arg(args, 1), len as i64) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
            let mut out = Vec::new();
            for i in start..end {
                out.push(match interp.get_property_value(&obj_val, &i.to_string()) {
                    Ok(v) => v,
                    Err(c) => return c,
                });
            }
            Completion::Normal(interp.create_array(out))
        });

        self.add_method(&proto, "splice", 2, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let len = len as i64;
            let start_num = match interp.to_integer_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let start = clamp_index(start_num, len);
            let delete_count = if args.len() < 2 {
                len - start
            } else {
                match interp.to_integer_value(&arg(args, 1)) {
                    Ok(n) => (n.max(0.0) as i64).min(len - start),
                    Err(c) => return c,
                }
            };
            let mut removed = Vec::new();
            for i in 0..delete_count {
                removed.push(
                    match interp.get_property_value(&obj_val, &(start + i).to_string()) {
                        Ok(v) => v,
                        Err(c) => return c,
                    },
                );
            }
            let items: Vec<JsValue> = if args.len() > 2 {
                args[2..].to_vec()
            } else {
                Vec::new()
            };
            let insert_count = items.len() as i64;
            // shift the tail to its new position
            if insert_count < delete_count {
                for i in start..(len - delete_count) {
                    let from = (i + delete_count).to_string();
                    let to = (i + insert_count).to_string();
                    let v = match interp.get_property_value(&obj_val, &from) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    if let Err(c) = interp.put_property_value(&obj_val, &to, v, true) {
                        return c;
                    }
                }
                for i in ((len - delete_count + insert_count)..len).rev() {
                    if let Err(c) = interp.delete_property_value(&obj_val, &i.to_string()) {
                        return c;
                    }
                }
            } else if insert_count > delete_count {
                for i in ((start + delete_count)..len).rev() {
                    let from = i.to_string();
                    let to = (i + insert_count - delete_count).to_string();
                    let v = match interp.get_property_value(&obj_val, &from) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    if let Err(c) = interp.put_property_value(&obj_val, &to, v, true) {
                        return c;
                    }
                }
            }
            for (i, item) in items.iter().enumerate() {
                if let Err(c) = interp.put_property_value(
                    &obj_val,
                    &(start + i as i64).to_string(),
                    item.clone(),
                    true,
                ) {
                    return c;
                }
            }
            let new_len = JsValue::Number((len - delete_count + insert_count) as f64);
            if let Err(c) = interp.put_property_value(&obj_val, "length", new_len, true) {
                return c;
            }
            Completion::Normal(interp.create_array(removed))
        });

        self.add_method(&proto, "indexOf", 1, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let search = arg(args, 0);
            let from = match interp.to_integer_value(&arg(args, 1)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let start = clamp_index(from, len as i64);
            for i in start..len as i64 {
                let key = i.to_string();
                let present = interp
                    .value_object(&obj_val)
                    .is_some_and(|o| o.borrow().has_property(&key));
                if !present {
                    continue;
                }
                let v = match interp.get_property_value(&obj_val, &key) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                if strict_equals(&v, &search) {
                    return Completion::Normal(JsValue::Number(i as f64));
                }
            }
            Completion::Normal(JsValue::Number(-1.0))
        });

        self.add_method(&proto, "lastIndexOf", 1, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            if len == 0 {
                return Completion::Normal(JsValue::Number(-1.0));
            }
            let search = arg(args, 0);
            let from = if args.len() > 1 {
                match interp.to_integer_value(&args[1]) {
                    Ok(n) => n,
                    Err(c) => return c,
                }
            } else {
                (len - 1) as f64
            };
            let start = if from >= 0.0 {
                (from as i64).min((len - 1) as i64)
            } else {
                len as i64 + from as i64
            };
            let mut i = start;
            while i >= 0 {
                let key = i.to_string();
                let present = interp
                    .value_object(&obj_val)
                    .is_some_and(|o| o.borrow().has_property(&key));
                if present {
                    let v = match interp.get_property_value(&obj_val, &key) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    if strict_equals(&v, &search) {
                        return Completion::Normal(JsValue::Number(i as f64));
                    }
                }
                i -= 1;
            }
            Completion::Normal(JsValue::Number(-1.0))
        });

        self.add_method(&proto, "sort", 1, |interp, this, args| {
            let (obj_val, len) = match interp.this_array_like(this) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let comparator = arg(args, 0);
            // gather present elements; holes sort past undefined
            let mut values: Vec<JsValue> = Vec::new();
            let mut undefined_count = 0u32;
            let mut hole_count = 0u32;
            for i in 0..len {
                let key = i.to_string();
                let present = interp
                    .value_object(&obj_val)
                    .is_some_and(|o| o.borrow().has_property(&key));
                if !present {
                    hole_count += 1;
                    continue;
                }
                let v = match interp.get_property_value(&obj_val, &key) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                if v.is_undefined() {
                    undefined_count += 1;
                } else {
                    values.push(v);
                }
            }
            // insertion sort keeps the comparator's error path simple
            for i in 1..values.len() {
                let mut j = i;
                while j > 0 {
                    let ordered = match sort_compare(
                        interp,
                        &comparator,
                        &values[j - 1],
                        &values[j],
                    ) {
                        Ok(n) => n <= 0.0,
                        Err(c) => return c,
                    };
                    if ordered {
                        break;
                    }
                    values.swap(j - 1, j);
                    j -= 1;
                }
            }
            let mut index = 0u32;
            for v in &values {
                if let Err(c) =
                    interp.put_property_value(&obj_val, &index.to_string(), v.clone(), true)
                {
                    return c;
                }
                index += 1;
            }
            for _ in 0..undefined_count {
                if let Err(c) = interp.put_property_value(
                    &obj_val,
                    &index.to_string(),
                    JsValue::Undefined,
                    true,
                ) {
                    return c;
                }
                index += 1;
            }
            for _ in 0..hole_count {
                if let Err(c) = interp.delete_property_value(&obj_val, &index.to_string()) {
                    return c;
                }
                index += 1;
            }
            Completion::Normal(obj_val)
        });

        self.add_method(&proto, "forEach", 1, |interp, this, args| {
            iterate_elements(interp, this, args, |_interp, _i, _v, _cb| Ok(Step::Keep))
        });

        self.add_method(&proto, "map", 1, |interp, this, args| {
            // collected results are invisible to script between callback
            // calls, so pin them against the collector
            let mark = interp.gc_temp_roots.len();
            let mut out = Vec::new();
            let result = iterate_elements(interp, this, args, |interp, _i, _v, cb| {
                interp.root_temp(cb);
                out.push(cb.clone());
                Ok(Step::Keep)
            });
            interp.gc_temp_roots.truncate(mark);
            match result {
                Completion::Normal(_) => {}
                other => return other,
            }
            Completion::Normal(interp.create_array(out))
        });

        self.add_method(&proto, "filter", 1, |interp, this, args| {
            let mark = interp.gc_temp_roots.len();
            let mut out = Vec::new();
            let result = iterate_elements(interp, this, args, |interp, _i, v, cb| {
                if to_boolean(cb) {
                    interp.root_temp(v);
                    out.push(v.clone());
                }
                Ok(Step::Keep)
            });
            interp.gc_temp_roots.truncate(mark);
            match result {
                Completion::Normal(_) => {}
                other => return other,
            }
            Completion::Normal(interp.create_array(out))
        });

        self.add_method(&proto, "some", 1, |interp, this, args| {
            let mut found = false;
            let result = iterate_elements(interp, this, args, |_interp, _i, _v, cb| {
                if to_boolean(cb) {
                    found = true;
                    return Ok(Step::Stop);
                }
                Ok(Step::Keep)
            });
            match result {
                Completion::Normal(_) => Completion::Normal(JsValue::Boolean(found)),
                other => other,
            }
        });

        self.add_method(&proto, "every", 1, |interp, this, args| {
            let mut all = true;
            let result = iterate_elements(interp, this, args, |_interp, _i, _v, cb| {
                if !to_boolean(cb) {
                    all = false;
                    return Ok(Step::Stop);
                }
                Ok(Step::Keep)
            });
            match result {
                Completion::Normal(_) => Completion::Normal(JsValue::Boolean(all)),
                other => other,
            }
        });

        self.add_method(&proto, "reduce", 1, |interp, this, args| {
            let mark = interp.gc_temp_roots.len();
            let result = reduce_elements(interp, this, args, false);
            interp.gc_temp_roots.truncate(mark);
            result
        });

        self.add_method(&proto, "reduceRight", 1, |interp, this, args| {
            let mark = interp.gc_temp_roots.len();
            let result = reduce_elements(interp, this, args, true);
            interp.gc_temp_roots.truncate(mark);
            result
        });
    }
}

enum Step {
    Keep,
    Stop,
}

/// Shared walk for forEach/map/filter/some/every: skips holes and feeds
/// each (element, callback result) pair to the visitor.
fn iterate_elements(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    mut visit: impl FnMut(&mut Interpreter, u32, &JsValue, &JsValue) -> Result<Step, Completion>,
) -> Completion {
    let (obj_val, len) = match interp.this_array_like(this) {
        Ok(v) => v,
        Err(c) => return c,
    };
    let callback = arg(args, 0);
    if !interp.is_callable(&callback) {
        let msg = format!("{} is not a function", interp.format_value(&callback));
        let err = interp.create_type_error(&msg);
        return Completion::Throw(err);
    }
    let this_arg = arg(args, 1);
    for i in 0..len {
        let key = i.to_string();
        let present = interp
            .value_object(&obj_val)
            .is_some_and(|o| o.borrow().has_property(&key));
        if !present {
            continue;
        }
        let element = match interp.get_property_value(&obj_val, &key) {
            Ok(v) => v,
            Err(c) => return c,
        };
        let cb_args = [element.clone(), JsValue::Number(i as f64), obj_val.clone()];
        let cb_result = match interp.call_function(&callback, &this_arg, &cb_args) {
            Completion::Normal(v) => v,
            other => return other,
        };
        match visit(interp, i, &element, &cb_result) {
            Ok(Step::Keep) => {}
            Ok(Step::Stop) => break,
            Err(c) => return c,
        }
    }
    Completion::Normal(JsValue::Undefined)
}

fn reduce_elements(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    from_right: bool,
) -> Completion {
    let (obj_val, len) = match interp.this_array_like(this) {
        Ok(v) => v,
        Err(c) => return c,
    };
    let callback = arg(args, 0);
    if !interp.is_callable(&callback) {
        let msg = format!("{} is not a function", interp.format_value(&callback));
        let err = interp.create_type_error(&msg);
        return Completion::Throw(err);
    }
    let indices: Vec<u32> = if from_right {
        (0..len).rev().collect()
    } else {
        (0..len).collect()
    };
    let mut iter = indices.into_iter();
    let mut accumulator = if args.len() > 1 {
        args[1].clone()
    } else {
        // no initial value: the first present element seeds the fold
        let mut seed = None;
        for i in iter.by_ref() {
            let key = i.to_string();
            let present = interp
                .value_object(&obj_val)
                .is_some_and(|o| o.borrow().has_property(&key));
            if present {
                seed = Some(match interp.get_property_value(&obj_val, &key) {
                    Ok(v) => v,
                    Err(c) => return c,
                });
                break;
            }
        }
        match seed {
            Some(v) => v,
            None => {
                let err =
                    interp.create_type_error("Reduce of empty array with no initial value");
                return Completion::Throw(err);
            }
        }
    };
    for i in iter {
        let key = i.to_string();
        let present = interp
            .value_object(&obj_val)
            .is_some_and(|o| o.borrow().has_property(&key));
        if !present {
            continue;
        }
        let element = match interp.get_property_value(&obj_val, &key) {
            Ok(v) => v,
            Err(c) => return c,
        };
        let cb_args = [
            accumulator,
            element,
            JsValue::Number(i as f64),
            obj_val.clone(),
        ];
        accumulator = match interp.call_function(&callback, &JsValue::Undefined, &cb_args) {
            Completion::Normal(v) => v,
            other => return other,
        };
        // the fold value lives only in native code between iterations
        interp.root_temp(&accumulator);
    }
    Completion::Normal(accumulator)
}

fn sort_compare(
    interp: &mut Interpreter,
    comparator: &JsValue,
    a: &JsValue,
    b: &JsValue,
) -> Result<f64, Completion> {
    if interp.is_callable(comparator) {
        let result = completion_value(interp.call_function(
            comparator,
            &JsValue::Undefined,
            &[a.clone(), b.clone()],
        ))?;
        let n = interp.to_number_value(&result)?;
        return Ok(if n.is_nan() { 0.0 } else { n });
    }
    let sa = interp.to_string_value(a)?;
    let sb = interp.to_string_value(b)?;
    Ok(match sa.cmp(&sb) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    })
}

fn clamp_index(relative: f64, len: i64) -> i64 {
    if relative < 0.0 {
        (len + relative as i64).max(0)
    } else {
        (relative as i64).min(len)
    }
}

fn relative_range(
    interp: &mut Interpreter,
    start: &JsValue,
    end: &JsValue,
    len: i64,
) -> Result<(i64, i64), Completion> {
    let start_num = interp.to_integer_value(start)?;
    let start_idx = clamp_index(start_num, len);
    let end_idx = if end.is_undefined() {
        len
    } else {
        clamp_index(interp.to_integer_value(end)?, len)
    };
    Ok((start_idx, end_idx.max(start_idx)))
}
