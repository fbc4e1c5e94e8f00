use super::*;

const ERROR_KINDS: [&str; 6] = [
    "TypeError",
    "ReferenceError",
    "SyntaxError",
    "RangeError",
    "URIError",
    "EvalError",
];

impl Interpreter {
    pub(crate) fn setup_error(&mut self) {
        let proto = self.create_object();
        {
            let mut p = proto.borrow_mut();
            p.class_name = "Error".to_string();
            p.insert_builtin(
                "name".to_string(),
                JsValue::String(JsString::from_str("Error")),
            );
            p.insert_builtin(
                "message".to_string(),
                JsValue::String(JsString::from_str("")),
            );
        }
        self.error_prototype = Some(proto.clone());

        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            if !this.is_object() {
                let err = interp.create_type_error("Error.prototype.toString requires an object");
                return Completion::Throw(err);
            }
            let name = match interp.get_property_value(this, "name") {
                Ok(JsValue::Undefined) => "Error".to_string(),
                Ok(v) => match interp.to_string_value(&v) {
                    Ok(s) => s,
                    Err(c) => return c,
                },
                Err(c) => return c,
            };
            let message = match interp.get_property_value(this, "message") {
                Ok(JsValue::Undefined) => String::new(),
                Ok(v) => match interp.to_string_value(&v) {
                    Ok(s) => s,
                    Err(c) => return c,
                },
                Err(c) => return c,
            };
            let text = if name.is_empty() {
                message
            } else if message.is_empty() {
                name
            } else {
                format!("{name}: {message}")
            };
            Completion::Normal(JsValue::String(JsString::from_str(&text)))
        });

        self.install_constructor("Error", 1, &proto, move |interp, this, args| {
            error_constructor(interp, this, args, None)
        });

        for kind in ERROR_KINDS {
            let sub_proto = self.create_object();
            {
                let mut p = sub_proto.borrow_mut();
                p.class_name = "Error".to_string();
                p.prototype = self.error_prototype.clone();
                p.insert_builtin("name".to_string(), JsValue::String(JsString::from_str(kind)));
                p.insert_builtin(
                    "message".to_string(),
                    JsValue::String(JsString::from_str("")),
                );
            }
            match kind {
                "TypeError" => self.type_error_prototype = Some(sub_proto.clone()),
                "ReferenceError" => self.reference_error_prototype = Some(sub_proto.clone()),
                "SyntaxError" => self.syntax_error_prototype = Some(sub_proto.clone()),
                "RangeError" => self.range_error_prototype = Some(sub_proto.clone()),
                "URIError" => self.uri_error_prototype = Some(sub_proto.clone()),
                _ => self.eval_error_prototype = Some(sub_proto.clone()),
            }
            self.install_constructor(kind, 1, &sub_proto, move |interp, this, args| {
                error_constructor(interp, this, args, Some(kind))
            });
        }
    }
}

/// Shared [[Call]]/[[Construct]] body for Error and its subtypes: invoked
/// as a function it makes a fresh error; under `new` it initializes the
/// object the construct step created.
fn error_constructor(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    kind: Option<&'static str>,
) -> Completion {
    let message = match arg(args, 0) {
        JsValue::Undefined => None,
        v => match interp.to_string_value(&v) {
            Ok(s) => Some(s),
            Err(c) => return c,
        },
    };

    if let Some(obj) = interp.value_object(this) {
        {
            let mut o = obj.borrow_mut();
            o.class_name = "Error".to_string();
            if let Some(msg) = message {
                o.insert_property(
                    "message".to_string(),
                    PropertyDescriptor::data(
                        JsValue::String(JsString::from_str(&msg)),
                        true,
                        false,
                        true,
                    ),
                );
            }
        }
        return Completion::Normal(this.clone());
    }

    let proto = match kind {
        Some("TypeError") => interp.type_error_prototype.clone(),
        Some("ReferenceError") => interp.reference_error_prototype.clone(),
        Some("SyntaxError") => interp.syntax_error_prototype.clone(),
        Some("RangeError") => interp.range_error_prototype.clone(),
        Some("URIError") => interp.uri_error_prototype.clone(),
        Some(_) => interp.eval_error_prototype.clone(),
        None => interp.error_prototype.clone(),
    };
    Completion::Normal(interp.create_error_object(proto, &message.unwrap_or_default()))
}
