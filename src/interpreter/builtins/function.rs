use super::*;

impl Interpreter {
    pub(crate) fn setup_function(&mut self) {
        let proto = self.function_proto();

        self.install_constructor("Function", 1, &proto, |interp, _this, args| {
            // assemble `function anonymous(p1, …) { body }` and parse it
            let mut params = Vec::new();
            for a in args.iter().take(args.len().saturating_sub(1)) {
                match interp.to_string_value(a) {
                    Ok(s) => params.push(s),
                    Err(c) => return c,
                }
            }
            let body = match args.last() {
                Some(v) => match interp.to_string_value(v) {
                    Ok(s) => s,
                    Err(c) => return c,
                },
                None => String::new(),
            };
            let source = format!("(function anonymous({}) {{\n{body}\n}})", params.join(", "));
            let env = interp.global_env.clone();
            interp.eval_source_in_env(&source, &env)
        });

        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            let callable = interp
                .value_object(this)
                .and_then(|o| o.borrow().callable.clone());
            let Some(func) = callable else {
                let err = interp
                    .create_type_error("Function.prototype.toString requires a function");
                return Completion::Throw(err);
            };
            let text = match func {
                JsFunction::User { decl, .. } => decl.source.clone(),
                JsFunction::Native { name, .. } => {
                    format!("function {name}() {{ [native code] }}")
                }
                JsFunction::Bound { .. } => "function () { [native code] }".to_string(),
            };
            Completion::Normal(JsValue::String(JsString::from_str(&text)))
        });

        self.add_method(&proto, "call", 1, |interp, this, args| {
            let this_arg = arg(args, 0);
            let rest = if args.is_empty() { &[] } else { &args[1..] };
            interp.call_function(this, &this_arg, rest)
        });

        self.add_method(&proto, "apply", 2, |interp, this, args| {
            let this_arg = arg(args, 0);
            let arg_list = arg(args, 1);
            let call_args = match &arg_list {
                JsValue::Undefined | JsValue::Null => Vec::new(),
                JsValue::Object(_) => {
                    let len_val = match interp.get_property_value(&arg_list, "length") {
                        Ok(v) => v,
                        Err(c) => return c,
                    };
                    let len = match interp.to_uint32_value(&len_val) {
                        Ok(n) => n,
                        Err(c) => return c,
                    };
                    let mut out = Vec::with_capacity(len as usize);
                    for i in 0..len {
                        match interp.get_property_value(&arg_list, &i.to_string()) {
                            Ok(v) => out.push(v),
                            Err(c) => return c,
                        }
                    }
                    out
                }
                _ => {
                    let err = interp
                        .create_type_error("CreateListFromArrayLike called on non-object");
                    return Completion::Throw(err);
                }
            };
            interp.call_function(this, &this_arg, &call_args)
        });

        self.add_method(&proto, "bind", 1, |interp, this, args| {
            if !interp.is_callable(this) {
                let err = interp
                    .create_type_error("Bind must be called on a function");
                return Completion::Throw(err);
            }
            let bound_this = arg(args, 0);
            let bound_args = if args.is_empty() {
                Vec::new()
            } else {
                args[1..].to_vec()
            };
            let bound = interp.create_function(JsFunction::Bound {
                target: Box::new(this.clone()),
                this: Box::new(bound_this),
                args: bound_args,
            });
            Completion::Normal(bound)
        });
    }
}
