use super::*;

impl Interpreter {
    pub(crate) fn setup_math(&mut self) {
        let math = self.create_object();
        math.borrow_mut().class_name = "Math".to_string();
        {
            let mut m = math.borrow_mut();
            for (name, value) in [
                ("E", std::f64::consts::E),
                ("LN10", std::f64::consts::LN_10),
                ("LN2", std::f64::consts::LN_2),
                ("LOG2E", std::f64::consts::LOG2_E),
                ("LOG10E", std::f64::consts::LOG10_E),
                ("PI", std::f64::consts::PI),
                ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
                ("SQRT2", std::f64::consts::SQRT_2),
            ] {
                m.insert_property(
                    name.to_string(),
                    PropertyDescriptor::data(JsValue::Number(value), false, false, false),
                );
            }
        }

        self.add_unary_math(&math, "abs", f64::abs);
        self.add_unary_math(&math, "ceil", f64::ceil);
        self.add_unary_math(&math, "floor", f64::floor);
        self.add_unary_math(&math, "sqrt", f64::sqrt);
        self.add_unary_math(&math, "exp", f64::exp);
        self.add_unary_math(&math, "log", f64::ln);
        self.add_unary_math(&math, "sin", f64::sin);
        self.add_unary_math(&math, "cos", f64::cos);
        self.add_unary_math(&math, "tan", f64::tan);
        self.add_unary_math(&math, "asin", f64::asin);
        self.add_unary_math(&math, "acos", f64::acos);
        self.add_unary_math(&math, "atan", f64::atan);

        // §15.8.2.15: round halves toward +Infinity, unlike f64::round
        self.add_unary_math(&math, "round", |x| {
            if x.is_nan() || x.is_infinite() || x == 0.0 {
                x
            } else {
                (x + 0.5).floor()
            }
        });

        self.add_method(&math, "atan2", 2, |interp, _this, args| {
            let y = match interp.to_number_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let x = match interp.to_number_value(&arg(args, 1)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::Number(y.atan2(x)))
        });

        self.add_method(&math, "pow", 2, |interp, _this, args| {
            let base = match interp.to_number_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            let exponent = match interp.to_number_value(&arg(args, 1)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            // §15.8.2.13: an infinite-magnitude-one base is NaN, not 1
            let result = if exponent.is_infinite() && base.abs() == 1.0 {
                f64::NAN
            } else {
                base.powf(exponent)
            };
            Completion::Normal(JsValue::Number(result))
        });

        self.add_method(&math, "max", 2, |interp, _this, args| {
            let mut result = f64::NEG_INFINITY;
            for a in args {
                let n = match interp.to_number_value(a) {
                    Ok(n) => n,
                    Err(c) => return c,
                };
                if n.is_nan() {
                    return Completion::Normal(JsValue::Number(f64::NAN));
                }
                if n > result || (n == 0.0 && result == 0.0 && n.is_sign_positive()) {
                    result = n;
                }
            }
            Completion::Normal(JsValue::Number(result))
        });

        self.add_method(&math, "min", 2, |interp, _this, args| {
            let mut result = f64::INFINITY;
            for a in args {
                let n = match interp.to_number_value(a) {
                    Ok(n) => n,
                    Err(c) => return c,
                };
                if n.is_nan() {
                    return Completion::Normal(JsValue::Number(f64::NAN));
                }
                if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
                    result = n;
                }
            }
            Completion::Normal(JsValue::Number(result))
        });

        self.add_method(&math, "random", 0, |_interp, _this, _args| {
            Completion::Normal(JsValue::Number(rand::random::<f64>()))
        });

        let math_val = self.object_value(&math);
        self.global_obj()
            .borrow_mut()
            .insert_builtin("Math".to_string(), math_val);
    }

    fn add_unary_math(&mut self, math: &ObjRef, name: &str, f: impl Fn(f64) -> f64 + 'static) {
        self.add_method(math, name, 1, move |interp, _this, args| {
            let n = match interp.to_number_value(&arg(args, 0)) {
                Ok(n) => n,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::Number(f(n)))
        });
    }
}
