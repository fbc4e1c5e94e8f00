use super::*;

impl Interpreter {
    pub(crate) fn setup_global_functions(&mut self) {
        let global = self.global_obj();

        // the intrinsic eval; direct calls are special-cased in the
        // evaluator, so landing here always means an indirect call, which
        // runs in the global environment (§10.4.2)
        let eval_fn = self.create_function(JsFunction::native("eval", 1, |interp, _this, args| {
            let Some(JsValue::String(source)) = args.first().cloned() else {
                return Completion::Normal(arg(args, 0));
            };
            let env = interp.global_env.clone();
            interp.eval_source_in_env(&source.to_rust_string(), &env)
        }));
        if let JsValue::Object(o) = &eval_fn {
            self.eval_function_id = Some(o.id);
        }
        global
            .borrow_mut()
            .insert_builtin("eval".to_string(), eval_fn);

        self.add_method(&global, "parseInt", 2, |interp, _this, args| {
            let text = match interp.to_string_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let radix = match interp.to_int32_value(&arg(args, 1)) {
                Ok(r) => r,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::Number(parse_int(&text, radix)))
        });

        self.add_method(&global, "parseFloat", 1, |interp, _this, args| {
            let text = match interp.to_string_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::Number(parse_float(&text)))
        });

        self.add_method(&global, "isNaN", 1, |interp, _this, args| {
            match interp.to_number_value(&arg(args, 0)) {
                Ok(n) => Completion::Normal(JsValue::Boolean(n.is_nan())),
                Err(c) => c,
            }
        });

        self.add_method(&global, "isFinite", 1, |interp, _this, args| {
            match interp.to_number_value(&arg(args, 0)) {
                Ok(n) => Completion::Normal(JsValue::Boolean(n.is_finite())),
                Err(c) => c,
            }
        });

        self.add_uri_method("encodeURI", URI_UNESCAPED_FULL, true);
        self.add_uri_method("encodeURIComponent", URI_UNESCAPED_COMPONENT, true);
        self.add_uri_method("decodeURI", URI_RESERVED, false);
        self.add_uri_method("decodeURIComponent", "", false);

        self.add_method(&global, "escape", 1, |interp, _this, args| {
            let text = match interp.to_jsstring_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let mut out = String::new();
            for unit in text.code_units {
                let ch = unit as u32;
                if ch < 256 {
                    let c = ch as u8 as char;
                    if c.is_ascii_alphanumeric() || "@*_+-./".contains(c) {
                        out.push(c);
                    } else {
                        out.push_str(&format!("%{ch:02X}"));
                    }
                } else {
                    out.push_str(&format!("%u{ch:04X}"));
                }
            }
            Completion::Normal(JsValue::String(JsString::from_str(&out)))
        });

        self.add_method(&global, "unescape", 1, |interp, _this, args| {
            let text = match interp.to_string_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let chars: Vec<char> = text.chars().collect();
            let mut units: Vec<u16> = Vec::with_capacity(chars.len());
            let mut i = 0;
            while i < chars.len() {
                if chars[i] == '%' {
                    if i + 5 < chars.len()
                        && chars[i + 1] == 'u'
                        && let Some(code) = hex_units(&chars[i + 2..i + 6])
                    {
                        units.push(code);
                        i += 6;
                        continue;
                    }
                    if i + 2 < chars.len()
                        && let Some(code) = hex_units(&chars[i + 1..i + 3])
                    {
                        units.push(code);
                        i += 3;
                        continue;
                    }
                }
                let mut buf = [0u16; 2];
                units.extend_from_slice(chars[i].encode_utf16(&mut buf));
                i += 1;
            }
            Completion::Normal(JsValue::String(JsString::from_units(units)))
        });
    }

    fn add_uri_method(&mut self, name: &'static str, unescaped: &'static str, encode: bool) {
        let global = self.global_obj();
        self.add_method(&global, name, 1, move |interp, _this, args| {
            let text = match interp.to_string_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            let result = if encode {
                uri_encode(&text, unescaped)
            } else {
                uri_decode(&text, unescaped)
            };
            match result {
                Ok(s) => Completion::Normal(JsValue::String(JsString::from_str(&s))),
                Err(msg) => {
                    let err = interp.create_uri_error(msg);
                    Completion::Throw(err)
                }
            }
        });
    }
}

fn hex_units(chars: &[char]) -> Option<u16> {
    let text: String = chars.iter().collect();
    u16::from_str_radix(&text, 16).ok()
}

// §15.1.2.2
fn parse_int(text: &str, radix: i32) -> f64 {
    let mut s = text.trim_start();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let mut radix = radix;
    if radix == 0 {
        if s.starts_with("0x") || s.starts_with("0X") {
            radix = 16;
            s = &s[2..];
        } else {
            radix = 10;
        }
    } else if !(2..=36).contains(&radix) {
        return f64::NAN;
    } else if radix == 16 && (s.starts_with("0x") || s.starts_with("0X")) {
        s = &s[2..];
    }
    let digits: String = s
        .chars()
        .take_while(|c| c.to_digit(radix as u32).is_some())
        .collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0.0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix as u32).expect("filtered above") as f64;
    }
    sign * value
}

// §15.1.2.3: longest prefix satisfying the decimal grammar
fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    if s[end.min(s.len())..].starts_with("Infinity") {
        return if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_digit() {
            seen_digit = true;
        } else if b == b'.' && !seen_dot && !seen_exp {
            seen_dot = true;
        } else if (b == b'e' || b == b'E') && seen_digit && !seen_exp {
            let next = bytes.get(end + 1);
            let after = bytes.get(end + 2);
            let has_exp_digits = match next {
                Some(b'+') | Some(b'-') => after.is_some_and(|b| b.is_ascii_digit()),
                Some(d) => d.is_ascii_digit(),
                None => false,
            };
            if !has_exp_digits {
                break;
            }
            seen_exp = true;
            end += 1; // include the sign or first digit on the next pass
        } else {
            break;
        }
        end += 1;
    }
    if !seen_digit {
        return f64::NAN;
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

const URI_RESERVED: &str = ";/?:@&=+$,#";
const URI_UNESCAPED_COMPONENT: &str = "-_.!~*'()";
const URI_UNESCAPED_FULL: &str = "-_.!~*'();/?:@&=+$,#";

fn uri_encode(text: &str, unescaped: &str) -> Result<String, &'static str> {
    let mut out = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || unescaped.contains(ch) {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    Ok(out)
}

fn uri_decode(text: &str, reserved: &str) -> Result<String, &'static str> {
    let bytes = text.as_bytes();
    let mut decoded: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 3 > bytes.len() {
                return Err("URI malformed");
            }
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).map_err(|_| "URI malformed")?;
            let byte = u8::from_str_radix(hex, 16).map_err(|_| "URI malformed")?;
            // reserved characters stay escaped in decodeURI
            if byte < 0x80 && reserved.contains(byte as char) {
                decoded.extend_from_slice(&bytes[i..i + 3]);
            } else {
                decoded.push(byte);
            }
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| "URI malformed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_radix_handling() {
        assert_eq!(parse_int("42", 0), 42.0);
        assert_eq!(parse_int("  -17  ", 0), -17.0);
        assert_eq!(parse_int("0x1f", 0), 31.0);
        assert_eq!(parse_int("1f", 16), 31.0);
        assert_eq!(parse_int("101", 2), 5.0);
        assert_eq!(parse_int("12ab", 10), 12.0);
        assert!(parse_int("zz", 10).is_nan());
        assert!(parse_int("5", 1).is_nan());
    }

    #[test]
    fn parse_float_prefix() {
        assert_eq!(parse_float("3.14stuff"), 3.14);
        assert_eq!(parse_float("  .5"), 0.5);
        assert_eq!(parse_float("1e2x"), 100.0);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float("px").is_nan());
        assert_eq!(parse_float("1e"), 1.0);
    }

    #[test]
    fn uri_round_trip() {
        let encoded = uri_encode("a b/ü", URI_UNESCAPED_COMPONENT).unwrap();
        assert_eq!(encoded, "a%20b%2F%C3%BC");
        assert_eq!(uri_decode(&encoded, "").unwrap(), "a b/ü");
    }

    #[test]
    fn decode_uri_keeps_reserved_escapes() {
        assert_eq!(
            uri_decode("a%2Fb%20c", URI_RESERVED).unwrap(),
            "a%2Fb c"
        );
    }
}
