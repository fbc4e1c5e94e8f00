use super::*;
use crate::types::number_ops;

impl Interpreter {
    pub(crate) fn setup_string(&mut self) {
        let proto = self
            .string_prototype
            .clone()
            .expect("set during construction");

        let ctor_val = self.install_constructor("String", 1, &proto, |interp, this, args| {
            let value = if args.is_empty() {
                JsString::from_str("")
            } else {
                match interp.to_jsstring_value(&args[0]) {
                    Ok(s) => s,
                    Err(c) => return c,
                }
            };
            // under `new` the construct step handed us a fresh object
            if interp.value_object(this).is_some() {
                let proto = interp.string_prototype.clone();
                let boxed = interp.box_primitive("String", proto, JsValue::String(value));
                return Completion::Normal(interp.object_value(&boxed));
            }
            Completion::Normal(JsValue::String(value))
        });
        let ctor = self
            .value_object(&ctor_val)
            .expect("constructor is an object");

        self.add_method(&ctor, "fromCharCode", 1, |interp, _this, args| {
            let mut units = Vec::with_capacity(args.len());
            for a in args {
                match interp.to_number_value(a) {
                    Ok(n) => units.push(number_ops::to_uint16(n)),
                    Err(c) => return c,
                }
            }
            Completion::Normal(JsValue::String(JsString::from_units(units)))
        });

        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            match this_string_value(interp, this) {
                Ok(s) => Completion::Normal(JsValue::String(s)),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "valueOf", 0, |interp, this, _args| {
            match this_string_value(interp, this) {
                Ok(s) => Completion::Normal(JsValue::String(s)),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "charAt", 1, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let pos = match interp.to_integer_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            if pos < 0.0 || pos >= s.len() as f64 {
                return Completion::Normal(JsValue::String(JsString::from_str("")));
            }
            let idx = pos as usize;
            Completion::Normal(JsValue::String(s.slice_units(idx, idx + 1)))
        });

        self.add_method(&proto, "charCodeAt", 1, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let pos = match interp.to_integer_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            if pos < 0.0 || pos >= s.len() as f64 {
                return Completion::Normal(JsValue::Number(f64::NAN));
            }
            Completion::Normal(JsValue::Number(s.code_units[pos as usize] as f64))
        });

        self.add_method(&proto, "indexOf", 1, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let search = match interp.to_jsstring_value(&arg(args, 0)) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let from = match interp.to_integer_value(&arg(args, 1)) {
                Ok(n) => n.max(0.0) as usize,
                Err(c) => return c,
            };
            let result = s
                .index_of(&search, from.min(s.len()))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            Completion::Normal(JsValue::Number(result))
        });

        self.add_method(&proto, "lastIndexOf", 1, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let search = match interp.to_jsstring_value(&arg(args, 0)) {
                Ok(v) => v,
                Err(c) => return c,
            };
            let from_num = match interp.to_number_value(&arg(args, 1)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let from = if from_num.is_nan() {
                s.len()
            } else {
                number_ops::to_integer(from_num).max(0.0) as usize
            };
            let result = s
                .last_index_of(&search, from)
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            Completion::Normal(JsValue::Number(result))
        });

        self.add_method(&proto, "concat", 1, |interp, this, args| {
            let mut s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            for a in args {
                match interp.to_jsstring_value(a) {
                    Ok(part) => s.code_units.extend_from_slice(&part.code_units),
                    Err(c) => return c,
                }
            }
            Completion::Normal(JsValue::String(s))
        });

        self.add_method(&proto, "slice", 2, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let len = s.len() as i64;
            let start = match interp.to_integer_value(&arg(args, 0)) {
                Ok(n) => relative_position(n, len),
                Err(c) => return c,
            };
            let end = match arg(args, 1) {
                JsValue::Undefined => len,
                v => match interp.to_integer_value(&v) {
                    Ok(n) => relative_position(n, len),
                    Err(c) => return c,
                },
            };
            Completion::Normal(JsValue::String(
                s.slice_units(start as usize, end.max(start) as usize),
            ))
        });

        self.add_method(&proto, "substring", 2, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let len = s.len() as f64;
            let a = match interp.to_integer_value(&arg(args, 0)) {
                Ok(n) => n.clamp(0.0, len),
                Err(c) => return c,
            };
            let b = match arg(args, 1) {
                JsValue::Undefined => len,
                v => match interp.to_integer_value(&v) {
                    Ok(n) => n.clamp(0.0, len),
                    Err(c) => return c,
                },
            };
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Completion::Normal(JsValue::String(s.slice_units(start as usize, end as usize)))
        });

        self.add_method(&proto, "substr", 2, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let len = s.len() as i64;
            let start_num = match interp.to_integer_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let start = if start_num < 0.0 {
                (len + start_num as i64).max(0)
            } else {
                (start_num as i64).min(len)
            };
            let count = match arg(args, 1) {
                JsValue::Undefined => len - start,
                v => match interp.to_integer_value(&v) {
                    Ok(n) => (n.max(0.0) as i64).min(len - start),
                    Err(c) => return c,
                },
            };
            Completion::Normal(JsValue::String(
                s.slice_units(start as usize, (start + count) as usize),
            ))
        });

        self.add_method(&proto, "split", 2, |interp, this, args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let separator = arg(args, 0);
            let limit = match arg(args, 1) {
                JsValue::Undefined => u32::MAX,
                v => match interp.to_uint32_value(&v) {
                    Ok(n) => n,
                    Err(c) => return c,
                },
            };
            if limit == 0 {
                return Completion::Normal(interp.create_array(Vec::new()));
            }
            if separator.is_undefined() {
                let whole = JsValue::String(s);
                return Completion::Normal(interp.create_array(vec![whole]));
            }
            // regexp separators split on matcher boundaries
            let regexp = interp
                .value_object(&separator)
                .and_then(|o| o.borrow().regexp.as_ref().map(|r| r.matcher.clone()));
            let parts: Vec<JsValue> = if let Some(matcher) = regexp {
                matcher
                    .split(&s.to_rust_string())
                    .take(limit as usize)
                    .map(|p| JsValue::String(JsString::from_str(p)))
                    .collect()
            } else {
                let sep = match interp.to_jsstring_value(&separator) {
                    Ok(v) => v,
                    Err(c) => return c,
                };
                split_units(&s, &sep)
                    .into_iter()
                    .take(limit as usize)
                    .map(JsValue::String)
                    .collect()
            };
            Completion::Normal(interp.create_array(parts))
        });

        self.add_method(&proto, "replace", 2, |interp, this, args| {
            string_replace(interp, this, args)
        });

        self.add_method(&proto, "toUpperCase", 0, |interp, this, _args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::String(JsString::from_str(
                &s.to_rust_string().to_uppercase(),
            )))
        });

        self.add_method(&proto, "toLowerCase", 0, |interp, this, _args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::String(JsString::from_str(
                &s.to_rust_string().to_lowercase(),
            )))
        });

        self.add_method(&proto, "trim", 0, |interp, this, _args| {
            let s = match interp.this_to_string(this) {
                Ok(s) => s,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::String(JsString::from_str(
                s.to_rust_string().trim(),
            )))
        });
    }
}

/// [[PrimitiveValue]] of a String receiver (§15.5.4.2).
fn this_string_value(interp: &mut Interpreter, this: &JsValue) -> Result<JsString, Completion> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Object(_) => {
            if let Some(obj) = interp.value_object(this)
                && obj.borrow().class_name == "String"
                && let Some(JsValue::String(ref s)) = obj.borrow().primitive_value
            {
                return Ok(s.clone());
            }
            let err =
                interp.create_type_error("String.prototype method called on incompatible receiver");
            Err(Completion::Throw(err))
        }
        _ => {
            let err =
                interp.create_type_error("String.prototype method called on incompatible receiver");
            Err(Completion::Throw(err))
        }
    }
}

fn relative_position(n: f64, len: i64) -> i64 {
    if n < 0.0 {
        (len + n as i64).max(0)
    } else {
        (n as i64).min(len)
    }
}

fn split_units(s: &JsString, sep: &JsString) -> Vec<JsString> {
    if sep.is_empty() {
        return (0..s.len()).map(|i| s.slice_units(i, i + 1)).collect();
    }
    let mut parts = Vec::new();
    let mut start = 0;
    let mut from = 0;
    while let Some(found) = s.index_of(sep, from) {
        parts.push(s.slice_units(start, found));
        start = found + sep.len();
        from = start;
    }
    parts.push(s.slice_units(start, s.len()));
    parts
}

// §15.5.4.11, with $&/$n/$$ substitution and callable replacers.
fn string_replace(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = match interp.this_to_string(this) {
        Ok(s) => s,
        Err(c) => return c,
    };
    let subject = s.to_rust_string();
    let search = arg(args, 0);
    let replacement = arg(args, 1);

    let regexp = interp
        .value_object(&search)
        .and_then(|o| o.borrow().regexp.clone());

    let mut matches: Vec<(usize, usize, Vec<Option<String>>)> = Vec::new();
    if let Some(ref re) = regexp {
        for caps in re.matcher.captures_iter(&subject) {
            let whole = caps.get(0).expect("group 0 always participates");
            let groups = (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect();
            matches.push((whole.start(), whole.end(), groups));
            if !re.global {
                break;
            }
        }
    } else {
        let needle = match interp.to_string_value(&search) {
            Ok(v) => v,
            Err(c) => return c,
        };
        if let Some(pos) = subject.find(&needle) {
            matches.push((pos, pos + needle.len(), Vec::new()));
        }
    }

    let mut out = String::new();
    let mut last = 0;
    for (start, end, groups) in matches {
        out.push_str(&subject[last..start]);
        let matched = &subject[start..end];
        if interp.is_callable(&replacement) {
            let mut call_args = vec![JsValue::String(JsString::from_str(matched))];
            for g in &groups {
                call_args.push(match g {
                    Some(text) => JsValue::String(JsString::from_str(text)),
                    None => JsValue::Undefined,
                });
            }
            call_args.push(JsValue::Number(start as f64));
            call_args.push(JsValue::String(JsString::from_str(&subject)));
            let result =
                match interp.call_function(&replacement, &JsValue::Undefined, &call_args) {
                    Completion::Normal(v) => v,
                    other => return other,
                };
            match interp.to_string_value(&result) {
                Ok(text) => out.push_str(&text),
                Err(c) => return c,
            }
        } else {
            let template = match interp.to_string_value(&replacement) {
                Ok(t) => t,
                Err(c) => return c,
            };
            out.push_str(&expand_replacement(&template, matched, &groups));
        }
        last = end;
    }
    out.push_str(&subject[last..]);
    Completion::Normal(JsValue::String(JsString::from_str(&out)))
}

fn expand_replacement(template: &str, matched: &str, groups: &[Option<String>]) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(matched);
            }
            Some(d) if d.is_ascii_digit() => {
                let mut index =
                    chars.next().and_then(|c| c.to_digit(10)).expect("peeked digit") as usize;
                if let Some(d2) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let two = index * 10 + d2 as usize;
                    if two >= 1 && two <= groups.len() {
                        chars.next();
                        index = two;
                    }
                }
                if index >= 1 && index <= groups.len() {
                    if let Some(ref text) = groups[index - 1] {
                        out.push_str(text);
                    }
                } else {
                    out.push('$');
                    out.push_str(&index.to_string());
                }
            }
            _ => out.push('$'),
        }
    }
    out
}
