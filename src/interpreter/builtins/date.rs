use super::*;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

impl Interpreter {
    pub(crate) fn setup_date(&mut self) {
        let proto = self
            .date_prototype
            .clone()
            .expect("set during construction");

        let ctor_val = self.install_constructor("Date", 7, &proto, |interp, this, args| {
            let time = match args.len() {
                0 => Utc::now().timestamp_millis() as f64,
                1 => {
                    let prim = match interp.to_primitive(&args[0], None) {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    match prim {
                        JsValue::String(ref s) => parse_date(&s.to_rust_string()),
                        other => match interp.to_number_value(&other) {
                            Ok(n) => time_clip(n),
                            Err(c) => return c,
                        },
                    }
                }
                _ => {
                    let mut fields = [0.0f64; 7];
                    for (i, slot) in fields.iter_mut().enumerate() {
                        if i < args.len() {
                            *slot = match interp.to_number_value(&args[i]) {
                                Ok(n) => n,
                                Err(c) => return c,
                            };
                        }
                    }
                    time_from_fields(&fields, args.len())
                }
            };
            // called without `new`, Date returns a string (§15.9.2)
            if interp.value_object(this).is_none() {
                return Completion::Normal(JsValue::String(JsString::from_str(&format_date(
                    Utc::now().timestamp_millis() as f64,
                ))));
            }
            let date_proto = interp.date_prototype.clone();
            let obj = interp.box_primitive("Date", date_proto, JsValue::Number(time));
            Completion::Normal(interp.object_value(&obj))
        });
        let ctor = self
            .value_object(&ctor_val)
            .expect("constructor is an object");

        self.add_method(&ctor, "now", 0, |_interp, _this, _args| {
            Completion::Normal(JsValue::Number(Utc::now().timestamp_millis() as f64))
        });

        self.add_method(&ctor, "parse", 1, |interp, _this, args| {
            let text = match interp.to_string_value(&arg(args, 0)) {
                Ok(s) => s,
                Err(c) => return c,
            };
            Completion::Normal(JsValue::Number(parse_date(&text)))
        });

        self.add_method(&ctor, "UTC", 7, |interp, _this, args| {
            let mut fields = [0.0f64; 7];
            for (i, slot) in fields.iter_mut().enumerate() {
                if i < args.len() {
                    *slot = match interp.to_number_value(&args[i]) {
                        Ok(n) => n,
                        Err(c) => return c,
                    };
                }
            }
            Completion::Normal(JsValue::Number(time_from_fields(&fields, args.len().max(2))))
        });

        self.add_method(&proto, "getTime", 0, |interp, this, _args| {
            match this_time_value(interp, this) {
                Ok(t) => Completion::Normal(JsValue::Number(t)),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "valueOf", 0, |interp, this, _args| {
            match this_time_value(interp, this) {
                Ok(t) => Completion::Normal(JsValue::Number(t)),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "setTime", 1, |interp, this, args| {
            let time = match interp.to_number_value(&arg(args, 0)) {
                Ok(n) => time_clip(n),
                Err(c) => return c,
            };
            let Some(obj) = interp.value_object(this) else {
                let err = interp.create_type_error("this is not a Date object");
                return Completion::Throw(err);
            };
            obj.borrow_mut().primitive_value = Some(JsValue::Number(time));
            Completion::Normal(JsValue::Number(time))
        });

        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            match this_time_value(interp, this) {
                Ok(t) => Completion::Normal(JsValue::String(JsString::from_str(&format_date(t)))),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "toUTCString", 0, |interp, this, _args| {
            match this_time_value(interp, this) {
                Ok(t) => Completion::Normal(JsValue::String(JsString::from_str(&format_date(t)))),
                Err(c) => c,
            }
        });

        self.add_method(&proto, "toISOString", 0, |interp, this, _args| {
            let t = match this_time_value(interp, this) {
                Ok(t) => t,
                Err(c) => return c,
            };
            let Some(dt) = to_datetime(t) else {
                let err = interp.create_range_error("Invalid time value");
                return Completion::Throw(err);
            };
            Completion::Normal(JsValue::String(JsString::from_str(
                &dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            )))
        });

        self.add_method(&proto, "toJSON", 1, |interp, this, _args| {
            let to_iso = match interp.get_property_value(this, "toISOString") {
                Ok(f) => f,
                Err(c) => return c,
            };
            interp.call_function(&to_iso, this, &[])
        });

        self.add_date_getter(&proto, "getFullYear", |dt| dt.year() as f64);
        self.add_date_getter(&proto, "getMonth", |dt| dt.month0() as f64);
        self.add_date_getter(&proto, "getDate", |dt| dt.day() as f64);
        self.add_date_getter(&proto, "getDay", |dt| {
            dt.weekday().num_days_from_sunday() as f64
        });
        self.add_date_getter(&proto, "getHours", |dt| dt.hour() as f64);
        self.add_date_getter(&proto, "getMinutes", |dt| dt.minute() as f64);
        self.add_date_getter(&proto, "getSeconds", |dt| dt.second() as f64);
        self.add_date_getter(&proto, "getMilliseconds", |dt| {
            dt.timestamp_subsec_millis() as f64
        });
        self.add_date_getter(&proto, "getUTCFullYear", |dt| dt.year() as f64);
        self.add_date_getter(&proto, "getUTCMonth", |dt| dt.month0() as f64);
        self.add_date_getter(&proto, "getUTCDate", |dt| dt.day() as f64);
        self.add_date_getter(&proto, "getUTCHours", |dt| dt.hour() as f64);
        self.add_date_getter(&proto, "getUTCMinutes", |dt| dt.minute() as f64);
        self.add_date_getter(&proto, "getUTCSeconds", |dt| dt.second() as f64);

        self.add_method(&proto, "getTimezoneOffset", 0, |interp, this, _args| {
            match this_time_value(interp, this) {
                // the engine's clock is UTC
                Ok(_) => Completion::Normal(JsValue::Number(0.0)),
                Err(c) => c,
            }
        });
    }

    fn add_date_getter(
        &mut self,
        proto: &ObjRef,
        name: &str,
        f: impl Fn(&DateTime<Utc>) -> f64 + 'static,
    ) {
        self.add_method(proto, name, 0, move |interp, this, _args| {
            let t = match this_time_value(interp, this) {
                Ok(t) => t,
                Err(c) => return c,
            };
            match to_datetime(t) {
                Some(dt) => Completion::Normal(JsValue::Number(f(&dt))),
                None => Completion::Normal(JsValue::Number(f64::NAN)),
            }
        });
    }
}

fn this_time_value(interp: &mut Interpreter, this: &JsValue) -> Result<f64, Completion> {
    if let Some(obj) = interp.value_object(this)
        && obj.borrow().class_name == "Date"
        && let Some(JsValue::Number(t)) = obj.borrow().primitive_value
    {
        return Ok(t);
    }
    let err = interp.create_type_error("this is not a Date object");
    Err(Completion::Throw(err))
}

fn to_datetime(t: f64) -> Option<DateTime<Utc>> {
    if t.is_nan() {
        return None;
    }
    DateTime::from_timestamp_millis(t as i64)
}

fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > 8.64e15 {
        f64::NAN
    } else {
        t.trunc()
    }
}

fn time_from_fields(fields: &[f64; 7], provided: usize) -> f64 {
    if fields.iter().any(|f| !f.is_finite()) {
        return f64::NAN;
    }
    let mut year = fields[0] as i32;
    if (0..=99).contains(&year) {
        year += 1900;
    }
    let month = fields[1] as u32;
    let day = if provided > 2 { fields[2] as u32 } else { 1 };
    let (hour, minute, second) = (fields[3] as u32, fields[4] as u32, fields[5] as u32);
    let millis = fields[6] as u32;
    match Utc
        .with_ymd_and_hms(year, month + 1, day, hour, minute, second)
        .single()
    {
        Some(dt) => dt.timestamp_millis() as f64 + millis as f64,
        None => f64::NAN,
    }
}

fn parse_date(text: &str) -> f64 {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return dt.timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, format) {
            return Utc.from_utc_datetime(&naive).timestamp_millis() as f64;
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, format) {
            let naive = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
            return Utc.from_utc_datetime(&naive).timestamp_millis() as f64;
        }
    }
    f64::NAN
}

fn format_date(t: f64) -> String {
    match to_datetime(t) {
        Some(dt) => dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => "Invalid Date".to_string(),
    }
}
