use super::*;

impl Interpreter {
    pub(crate) fn setup_regexp(&mut self) {
        let proto = self
            .regexp_prototype
            .clone()
            .expect("set during construction");

        self.install_constructor("RegExp", 2, &proto, |interp, _this, args| {
            let pattern_arg = arg(args, 0);
            let flags_arg = arg(args, 1);
            // a RegExp argument with no flags passes through
            if let Some(obj) = interp.value_object(&pattern_arg)
                && obj.borrow().regexp.is_some()
            {
                if flags_arg.is_undefined() {
                    return Completion::Normal(pattern_arg);
                }
                let err = interp
                    .create_type_error("Cannot supply flags when constructing one RegExp from another");
                return Completion::Throw(err);
            }
            let pattern = match pattern_arg {
                JsValue::Undefined => String::new(),
                v => match interp.to_string_value(&v) {
                    Ok(s) => s,
                    Err(c) => return c,
                },
            };
            let flags = match flags_arg {
                JsValue::Undefined => String::new(),
                v => match interp.to_string_value(&v) {
                    Ok(s) => s,
                    Err(c) => return c,
                },
            };
            match interp.create_regexp(&pattern, &flags) {
                Ok(v) => Completion::Normal(v),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            let Some(data) = interp
                .value_object(this)
                .and_then(|o| o.borrow().regexp.clone())
            else {
                let err = interp.create_type_error("RegExp.prototype.toString requires a RegExp");
                return Completion::Throw(err);
            };
            let mut flags = String::new();
            if data.global {
                flags.push('g');
            }
            if data.ignore_case {
                flags.push('i');
            }
            if data.multiline {
                flags.push('m');
            }
            Completion::Normal(JsValue::String(JsString::from_str(&format!(
                "/{}/{flags}",
                data.source
            ))))
        });

        self.add_method(&proto, "test", 1, |interp, this, args| {
            match regexp_exec(interp, this, args) {
                Ok(result) => Completion::Normal(JsValue::Boolean(!result.is_null())),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "exec", 1, |interp, this, args| {
            match regexp_exec(interp, this, args) {
                Ok(result) => Completion::Normal(result),
                Err(c) => c,
            }
        });
    }

    /// Compile a literal or constructed RegExp. The pattern is translated
    /// for the `regex` engine; constructs it cannot express are rejected
    /// as SyntaxErrors rather than silently mis-matched.
    pub(crate) fn create_regexp(&mut self, pattern: &str, flags: &str) -> EvalResult<JsValue> {
        let mut global = false;
        let mut ignore_case = false;
        let mut multiline = false;
        for ch in flags.chars() {
            match ch {
                'g' if !global => global = true,
                'i' if !ignore_case => ignore_case = true,
                'm' if !multiline => multiline = true,
                _ => {
                    let err =
                        self.create_syntax_error(&format!("Invalid regular expression flags: {flags}"));
                    return Err(Completion::Throw(err));
                }
            }
        }
        let translated = translate_pattern(pattern).map_err(|msg| {
            let err = self.create_syntax_error(&format!(
                "Invalid regular expression: /{pattern}/: {msg}"
            ));
            Completion::Throw(err)
        })?;
        let mut builder = String::new();
        if ignore_case {
            builder.push_str("(?i)");
        }
        if multiline {
            builder.push_str("(?m)");
        }
        builder.push_str(&translated);
        let matcher = regex::Regex::new(&builder).map_err(|e| {
            let err = self.create_syntax_error(&format!(
                "Invalid regular expression: /{pattern}/: {e}"
            ));
            Completion::Throw(err)
        })?;

        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = "RegExp".to_string();
            o.prototype = self.regexp_prototype.clone();
            o.regexp = Some(RegExpData {
                source: if pattern.is_empty() {
                    "(?:)".to_string()
                } else {
                    pattern.to_string()
                },
                global,
                ignore_case,
                multiline,
                matcher,
            });
            o.insert_property(
                "source".to_string(),
                PropertyDescriptor::data(
                    JsValue::String(JsString::from_str(pattern)),
                    false,
                    false,
                    false,
                ),
            );
            o.insert_property(
                "global".to_string(),
                PropertyDescriptor::data(JsValue::Boolean(global), false, false, false),
            );
            o.insert_property(
                "ignoreCase".to_string(),
                PropertyDescriptor::data(JsValue::Boolean(ignore_case), false, false, false),
            );
            o.insert_property(
                "multiline".to_string(),
                PropertyDescriptor::data(JsValue::Boolean(multiline), false, false, false),
            );
            o.insert_property(
                "lastIndex".to_string(),
                PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
            );
        }
        Ok(self.object_value(&obj))
    }
}

// §15.10.6.2: global matchers resume from lastIndex and update it.
fn regexp_exec(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
) -> Result<JsValue, Completion> {
    let Some(obj) = interp.value_object(this) else {
        let err = interp.create_type_error("RegExp.prototype.exec requires a RegExp");
        return Err(Completion::Throw(err));
    };
    let Some(data) = obj.borrow().regexp.clone() else {
        let err = interp.create_type_error("RegExp.prototype.exec requires a RegExp");
        return Err(Completion::Throw(err));
    };
    let subject = interp.to_string_value(&arg(args, 0))?;

    let last_index = if data.global {
        let v = interp.get_property_value(this, "lastIndex")?;
        interp.to_integer_value(&v)?.max(0.0) as usize
    } else {
        0
    };
    if last_index > subject.len() {
        interp.put_property_value(this, "lastIndex", JsValue::Number(0.0), false)?;
        return Ok(JsValue::Null);
    }

    let caps = data.matcher.captures_at(&subject, last_index);
    let Some(caps) = caps else {
        if data.global {
            interp.put_property_value(this, "lastIndex", JsValue::Number(0.0), false)?;
        }
        return Ok(JsValue::Null);
    };
    let whole = caps.get(0).expect("group 0 always participates");
    if data.global {
        interp.put_property_value(
            this,
            "lastIndex",
            JsValue::Number(whole.end() as f64),
            false,
        )?;
    }

    let mut elements = Vec::with_capacity(caps.len());
    for i in 0..caps.len() {
        elements.push(match caps.get(i) {
            Some(m) => JsValue::String(JsString::from_str(m.as_str())),
            None => JsValue::Undefined,
        });
    }
    let result = interp.create_array(elements);
    interp.put_property_value(
        &result,
        "index",
        JsValue::Number(whole.start() as f64),
        false,
    )?;
    interp.put_property_value(
        &result,
        "input",
        JsValue::String(JsString::from_str(&subject)),
        false,
    )?;
    Ok(result)
}

/// Translate an ECMAScript pattern into `regex` syntax. Backreferences
/// and lookaround are not expressible and produce an error.
fn translate_pattern(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let Some(next) = chars.next() else {
                    return Err("pattern ends with a trailing backslash".to_string());
                };
                match next {
                    d if d.is_ascii_digit() && d != '0' => {
                        return Err("backreferences are not supported".to_string());
                    }
                    // regex has no \cX control escapes
                    'c' => {
                        if let Some(letter) = chars.next() {
                            let code = (letter.to_ascii_uppercase() as u32) % 32;
                            out.push_str(&format!("\\x{code:02x}"));
                        } else {
                            out.push_str("\\\\c");
                        }
                    }
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '(' => {
                if chars.peek() == Some(&'?') {
                    let mut probe = chars.clone();
                    probe.next();
                    match probe.peek() {
                        Some('=') | Some('!') => {
                            return Err("lookahead assertions are not supported".to_string());
                        }
                        _ => out.push(ch),
                    }
                } else {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::translate_pattern;

    #[test]
    fn passthrough_patterns() {
        assert_eq!(translate_pattern("ab+c").unwrap(), "ab+c");
        assert_eq!(translate_pattern(r"\d{2,4}").unwrap(), r"\d{2,4}");
        assert_eq!(translate_pattern("(a|b)*").unwrap(), "(a|b)*");
    }

    #[test]
    fn rejected_constructs() {
        assert!(translate_pattern(r"(a)\1").is_err());
        assert!(translate_pattern(r"a(?=b)").is_err());
        assert!(translate_pattern(r"a(?!b)").is_err());
        assert!(translate_pattern("\\").is_err());
    }

    #[test]
    fn control_escapes() {
        assert_eq!(translate_pattern(r"\cA").unwrap(), r"\x01");
    }
}
