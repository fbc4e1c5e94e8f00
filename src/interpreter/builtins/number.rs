use super::*;
use crate::types::number_ops;

impl Interpreter {
    pub(crate) fn setup_number_and_boolean(&mut self) {
        let number_proto = self
            .number_prototype
            .clone()
            .expect("set during construction");

        let ctor_val =
            self.install_constructor("Number", 1, &number_proto, |interp, this, args| {
                let value = if args.is_empty() {
                    0.0
                } else {
                    match interp.to_number_value(&args[0]) {
                        Ok(n) => n,
                        Err(c) => return c,
                    }
                };
                if interp.value_object(this).is_some() {
                    let proto = interp.number_prototype.clone();
                    let boxed = interp.box_primitive("Number", proto, JsValue::Number(value));
                    return Completion::Normal(interp.object_value(&boxed));
                }
                Completion::Normal(JsValue::Number(value))
            });
        if let Some(ctor) = self.value_object(&ctor_val) {
            let mut c = ctor.borrow_mut();
            for (name, value) in [
                ("MAX_VALUE", f64::MAX),
                ("MIN_VALUE", f64::MIN_POSITIVE),
                ("NaN", f64::NAN),
                ("POSITIVE_INFINITY", f64::INFINITY),
                ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ] {
                c.insert_property(
                    name.to_string(),
                    PropertyDescriptor::data(JsValue::Number(value), false, false, false),
                );
            }
        }

        self.add_method(&number_proto, "toString", 1, |interp, this, args| {
            let n = match interp.this_number_value(this) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let radix = match arg(args, 0) {
                JsValue::Undefined => 10,
                v => match interp.to_integer_value(&v) {
                    Ok(r) => r as i64,
                    Err(c) => return c,
                },
            };
            if radix == 10 {
                return Completion::Normal(JsValue::String(JsString::from_str(
                    &number_ops::to_string(n),
                )));
            }
            if !(2..=36).contains(&radix) {
                let err = interp
                    .create_range_error("toString() radix must be between 2 and 36");
                return Completion::Throw(err);
            }
            Completion::Normal(JsValue::String(JsString::from_str(&format_radix(
                n,
                radix as u32,
            ))))
        });

        self.add_method(&number_proto, "toLocaleString", 0, |interp, this, _args| {
            let n = match interp.this_number_value(this) {
                Ok(n) => n,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::String(JsString::from_str(&number_ops::to_string(
                n,
            ))))
        });

        self.add_method(&number_proto, "valueOf", 0, |interp, this, _args| {
            match interp.this_number_value(this) {
                Ok(n) => Completion::Normal(JsValue::Number(n)),
                Err(c) => c,
            }
        });

        self.add_method(&number_proto, "toFixed", 1, |interp, this, args| {
            let n = match interp.this_number_value(this) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let digits = match interp.to_integer_value(&arg(args, 0)) {
                Ok(d) => d,
                Err(c) => return c,
            };
            if !(0.0..=20.0).contains(&digits) {
                let err =
                    interp.create_range_error("toFixed() digits argument must be between 0 and 20");
                return Completion::Throw(err);
            }
            let text = if n.is_nan() {
                "NaN".to_string()
            } else if n.abs() >= 1e21 {
                number_ops::to_string(n)
            } else {
                format!("{:.*}", digits as usize, n)
            };
            Completion::Normal(JsValue::String(JsString::from_str(&text)))
        });

        // Boolean
        let boolean_proto = self
            .boolean_prototype
            .clone()
            .expect("set during construction");

        self.install_constructor("Boolean", 1, &boolean_proto, |interp, this, args| {
            let value = to_boolean(&arg(args, 0));
            if interp.value_object(this).is_some() {
                let proto = interp.boolean_prototype.clone();
                let boxed = interp.box_primitive("Boolean", proto, JsValue::Boolean(value));
                return Completion::Normal(interp.object_value(&boxed));
            }
            Completion::Normal(JsValue::Boolean(value))
        });

        self.add_method(&boolean_proto, "toString", 0, |interp, this, _args| {
            match interp.this_boolean_value(this) {
                Ok(b) => Completion::Normal(JsValue::String(JsString::from_str(if b {
                    "true"
                } else {
                    "false"
                }))),
                Err(c) => c,
            }
        });

        self.add_method(&boolean_proto, "valueOf", 0, |interp, this, _args| {
            match interp.this_boolean_value(this) {
                Ok(b) => Completion::Normal(JsValue::Boolean(b)),
                Err(c) => c,
            }
        });
    }
}

fn format_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let negative = n < 0.0;
    let mut int_part = n.abs().trunc() as u64;
    let mut digits = Vec::new();
    if int_part == 0 {
        digits.push('0');
    }
    while int_part > 0 {
        let d = (int_part % radix as u64) as u32;
        digits.push(char::from_digit(d, radix).expect("digit below radix"));
        int_part /= radix as u64;
    }
    if negative {
        digits.push('-');
    }
    let mut out: String = digits.iter().rev().collect();
    // fractional digits, truncated at a fixed depth
    let mut frac = n.abs().fract();
    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= radix as f64;
            let d = frac.trunc() as u32;
            out.push(char::from_digit(d, radix).expect("digit below radix"));
            frac -= frac.trunc();
            if frac == 0.0 {
                break;
            }
        }
    }
    out
}
