use super::*;
use crate::types::number_ops;

impl Interpreter {
    pub(crate) fn eval_expression(&mut self, expr: &Expression, env: &EnvRef) -> Completion {
        result_completion(self.eval_expr(expr, env))
    }

    pub(crate) fn eval_expr(&mut self, expr: &Expression, env: &EnvRef) -> EvalResult<JsValue> {
        match expr {
            Expression::Literal(lit) => self.eval_literal(lit),
            Expression::Identifier(name) => {
                let reference = self.resolve_binding(env, name);
                self.get_reference(&reference)
            }
            Expression::This => Ok(self.resolve_this(env)),
            Expression::Member(_, _) => {
                let reference = self.eval_reference(expr, env)?;
                self.get_reference(&reference)
            }
            Expression::Array(elements) => self.eval_array_literal(elements, env),
            Expression::Object(props) => self.eval_object_literal(props, env),
            Expression::Function(decl) => Ok(self.instantiate_function_expression(decl, env)),
            Expression::Unary(op, operand) => {
                let val = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Minus => Ok(JsValue::Number(-self.to_number_value(&val)?)),
                    UnaryOp::Plus => Ok(JsValue::Number(self.to_number_value(&val)?)),
                    UnaryOp::Not => Ok(JsValue::Boolean(!to_boolean(&val))),
                    UnaryOp::BitNot => Ok(JsValue::Number(f64::from(!self.to_int32_value(&val)?))),
                }
            }
            Expression::Binary(op, left, right) => {
                let lval = self.eval_expr(left, env)?;
                let rval = self.eval_expr(right, env)?;
                self.binary_op_values(*op, &lval, &rval)
            }
            Expression::Logical(op, left, right) => {
                let lval = self.eval_expr(left, env)?;
                match op {
                    LogicalOp::And => {
                        if !to_boolean(&lval) {
                            Ok(lval)
                        } else {
                            self.eval_expr(right, env)
                        }
                    }
                    LogicalOp::Or => {
                        if to_boolean(&lval) {
                            Ok(lval)
                        } else {
                            self.eval_expr(right, env)
                        }
                    }
                }
            }
            Expression::Update(op, prefix, target) => {
                let reference = self.eval_reference(target, env)?;
                let old = self.get_reference(&reference)?;
                let old_num = self.to_number_value(&old)?;
                let new_num = match op {
                    UpdateOp::Increment => old_num + 1.0,
                    UpdateOp::Decrement => old_num - 1.0,
                };
                self.put_reference(reference, JsValue::Number(new_num))?;
                Ok(JsValue::Number(if *prefix { new_num } else { old_num }))
            }
            Expression::Assign(op, left, right) => self.eval_assign(*op, left, right, env),
            Expression::Conditional(test, consequent, alternate) => {
                let test_val = self.eval_expr(test, env)?;
                if to_boolean(&test_val) {
                    self.eval_expr(consequent, env)
                } else {
                    self.eval_expr(alternate, env)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args, env),
            Expression::New(callee, args) => {
                let func = self.eval_expr(callee, env)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    arg_vals.push(self.eval_expr(a, env)?);
                }
                completion_value(self.construct(&func, &arg_vals))
            }
            Expression::Typeof(operand) => {
                if let Expression::Identifier(name) = operand.as_ref() {
                    // an unresolvable name is "undefined", not an error
                    let reference = self.resolve_binding(env, name);
                    if matches!(reference, Reference::Unresolvable { .. }) {
                        return Ok(JsValue::String(JsString::from_str("undefined")));
                    }
                    let val = self.get_reference(&reference)?;
                    return Ok(JsValue::String(JsString::from_str(self.typeof_value(&val))));
                }
                let val = self.eval_expr(operand, env)?;
                Ok(JsValue::String(JsString::from_str(self.typeof_value(&val))))
            }
            Expression::Void(operand) => {
                self.eval_expr(operand, env)?;
                Ok(JsValue::Undefined)
            }
            Expression::Delete(operand) => self.eval_delete(operand, env),
            Expression::Sequence(exprs) => {
                let mut result = JsValue::Undefined;
                for e in exprs {
                    result = self.eval_expr(e, env)?;
                }
                Ok(result)
            }
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> EvalResult<JsValue> {
        match lit {
            Literal::Null => Ok(JsValue::Null),
            Literal::Boolean(b) => Ok(JsValue::Boolean(*b)),
            Literal::Number(n) => Ok(JsValue::Number(*n)),
            Literal::String(s) => Ok(JsValue::String(s.clone())),
            Literal::RegExp(pattern, flags) => self.create_regexp(pattern, flags),
        }
    }

    // ---- references -----------------------------------------------------

    pub(crate) fn resolve_binding(&self, env: &EnvRef, name: &str) -> Reference {
        let mut cur = Some(env.clone());
        while let Some(e) = cur {
            if e.borrow().has_binding(name) {
                return Reference::Environment {
                    env: e,
                    name: name.to_string(),
                };
            }
            let parent = e.borrow().parent.clone();
            cur = parent;
        }
        Reference::Unresolvable {
            name: name.to_string(),
        }
    }

    /// The `this` of the nearest function activation; the global object at
    /// top level. `with` records never bind `this`.
    pub(crate) fn resolve_this(&self, env: &EnvRef) -> JsValue {
        let mut cur = Some(env.clone());
        while let Some(e) = cur {
            let borrowed = e.borrow();
            if borrowed.object.is_none()
                && let Some(binding) = borrowed.bindings.get("this")
            {
                return binding.value.clone();
            }
            cur = borrowed.parent.clone();
        }
        self.global_value()
    }

    pub(crate) fn eval_reference(
        &mut self,
        expr: &Expression,
        env: &EnvRef,
    ) -> EvalResult<Reference> {
        match expr {
            Expression::Identifier(name) => Ok(self.resolve_binding(env, name)),
            Expression::Member(object, property) => {
                let base = self.eval_expr(object, env)?;
                let name = match property {
                    MemberProperty::Dot(name) => name.clone(),
                    MemberProperty::Computed(key_expr) => {
                        let key = self.eval_expr(key_expr, env)?;
                        self.to_string_value(&key)?
                    }
                };
                Ok(Reference::Property { base, name })
            }
            other => {
                let msg = format!("Invalid reference {other:?}");
                let err = self.create_reference_error(&msg);
                Err(Completion::Throw(err))
            }
        }
    }

    pub(crate) fn get_reference(&mut self, reference: &Reference) -> EvalResult<JsValue> {
        match reference {
            Reference::Environment { env, name } => {
                let object = env.borrow().object.clone();
                match object {
                    Some(obj) => {
                        let base = self.object_value(&obj);
                        self.get_property_value(&base, name)
                    }
                    None => Ok(env
                        .borrow()
                        .bindings
                        .get(name)
                        .map(|b| b.value.clone())
                        .unwrap_or(JsValue::Undefined)),
                }
            }
            Reference::Property { base, name } => self.get_property_value(base, name),
            Reference::Unresolvable { name } => {
                let msg = format!("{name} is not defined");
                let err = self.create_reference_error(&msg);
                Err(Completion::Throw(err))
            }
        }
    }

    /// Non-strict PutValue: writes to an unresolvable name create a global
    /// property; writes to immutable bindings are silently dropped.
    pub(crate) fn put_reference(&mut self, reference: Reference, value: JsValue) -> EvalResult<()> {
        match reference {
            Reference::Environment { env, name } => {
                let object = env.borrow().object.clone();
                match object {
                    Some(obj) => {
                        let base = self.object_value(&obj);
                        self.put_property_value(&base, &name, value, false)
                    }
                    None => {
                        if let Some(binding) = env.borrow_mut().bindings.get_mut(&name) {
                            if binding.mutable {
                                binding.value = value;
                            }
                        }
                        Ok(())
                    }
                }
            }
            Reference::Property { base, name } => {
                self.put_property_value(&base, &name, value, false)
            }
            Reference::Unresolvable { name } => {
                let global = self.global_value();
                self.put_property_value(&global, &name, value, false)
            }
        }
    }

    // ---- operators ------------------------------------------------------

    pub(crate) fn binary_op_values(
        &mut self,
        op: BinaryOp,
        lval: &JsValue,
        rval: &JsValue,
    ) -> EvalResult<JsValue> {
        match op {
            BinaryOp::Add => self.add_values(lval, rval),
            BinaryOp::Sub => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(a - b))
            }
            BinaryOp::Mul => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(a * b))
            }
            BinaryOp::Div => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(a / b))
            }
            BinaryOp::Mod => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(a % b))
            }
            BinaryOp::Lt => {
                let r = self.abstract_relational(lval, rval, true)?;
                Ok(JsValue::Boolean(r.unwrap_or(false)))
            }
            BinaryOp::Gt => {
                let r = self.abstract_relational(rval, lval, false)?;
                Ok(JsValue::Boolean(r.unwrap_or(false)))
            }
            BinaryOp::LtEq => {
                let r = self.abstract_relational(rval, lval, false)?;
                Ok(JsValue::Boolean(!r.unwrap_or(true)))
            }
            BinaryOp::GtEq => {
                let r = self.abstract_relational(lval, rval, true)?;
                Ok(JsValue::Boolean(!r.unwrap_or(true)))
            }
            BinaryOp::Eq => Ok(JsValue::Boolean(self.loose_equals(lval, rval)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.loose_equals(lval, rval)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(strict_equals(lval, rval))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!strict_equals(lval, rval))),
            BinaryOp::LShift => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(number_ops::left_shift(a, b)))
            }
            BinaryOp::RShift => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(number_ops::signed_right_shift(a, b)))
            }
            BinaryOp::URShift => {
                let a = self.to_number_value(lval)?;
                let b = self.to_number_value(rval)?;
                Ok(JsValue::Number(number_ops::unsigned_right_shift(a, b)))
            }
            BinaryOp::BitAnd => {
                let a = self.to_int32_value(lval)?;
                let b = self.to_int32_value(rval)?;
                Ok(JsValue::Number(f64::from(a & b)))
            }
            BinaryOp::BitOr => {
                let a = self.to_int32_value(lval)?;
                let b = self.to_int32_value(rval)?;
                Ok(JsValue::Number(f64::from(a | b)))
            }
            BinaryOp::BitXor => {
                let a = self.to_int32_value(lval)?;
                let b = self.to_int32_value(rval)?;
                Ok(JsValue::Number(f64::from(a ^ b)))
            }
            BinaryOp::In => {
                let Some(obj) = self.value_object(rval) else {
                    let msg = format!(
                        "Cannot use 'in' operator to search for '{}' in {rval}",
                        self.format_value(lval)
                    );
                    return self.throw_type_error(&msg);
                };
                let key = self.to_string_value(lval)?;
                Ok(JsValue::Boolean(obj.borrow().has_property(&key)))
            }
            BinaryOp::Instanceof => Ok(JsValue::Boolean(self.instance_of(lval, rval)?)),
        }
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        left: &Expression,
        right: &Expression,
        env: &EnvRef,
    ) -> EvalResult<JsValue> {
        // reference before value: operand side effects run left-to-right
        let reference = self.eval_reference(left, env)?;
        if op == AssignOp::Assign {
            let value = self.eval_expr(right, env)?;
            self.put_reference(reference, value.clone())?;
            return Ok(value);
        }
        let binary = match op {
            AssignOp::AddAssign => BinaryOp::Add,
            AssignOp::SubAssign => BinaryOp::Sub,
            AssignOp::MulAssign => BinaryOp::Mul,
            AssignOp::DivAssign => BinaryOp::Div,
            AssignOp::ModAssign => BinaryOp::Mod,
            AssignOp::LShiftAssign => BinaryOp::LShift,
            AssignOp::RShiftAssign => BinaryOp::RShift,
            AssignOp::URShiftAssign => BinaryOp::URShift,
            AssignOp::BitAndAssign => BinaryOp::BitAnd,
            AssignOp::BitOrAssign => BinaryOp::BitOr,
            AssignOp::BitXorAssign => BinaryOp::BitXor,
            AssignOp::Assign => unreachable!("handled above"),
        };
        let old = self.get_reference(&reference)?;
        let rhs = self.eval_expr(right, env)?;
        let value = self.binary_op_values(binary, &old, &rhs)?;
        self.put_reference(reference, value.clone())?;
        Ok(value)
    }

    fn eval_delete(&mut self, operand: &Expression, env: &EnvRef) -> EvalResult<JsValue> {
        match operand {
            Expression::Member(_, _) => {
                let reference = self.eval_reference(operand, env)?;
                match reference {
                    Reference::Property { base, name } => {
                        Ok(JsValue::Boolean(self.delete_property_value(&base, &name)?))
                    }
                    _ => Ok(JsValue::Boolean(true)),
                }
            }
            Expression::Identifier(name) => {
                match self.resolve_binding(env, name) {
                    Reference::Environment { env: record, name } => {
                        let object = record.borrow().object.clone();
                        match object {
                            // global vars are non-configurable, `with`
                            // object properties usually are not
                            Some(obj) => Ok(JsValue::Boolean(obj.borrow_mut().delete(&name))),
                            None => Ok(JsValue::Boolean(false)),
                        }
                    }
                    _ => Ok(JsValue::Boolean(true)),
                }
            }
            other => {
                self.eval_expr(other, env)?;
                Ok(JsValue::Boolean(true))
            }
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        env: &EnvRef,
    ) -> EvalResult<JsValue> {
        let (func, this) = match callee {
            Expression::Member(_, _) => {
                let reference = self.eval_reference(callee, env)?;
                let func = self.get_reference(&reference)?;
                let this = match reference {
                    Reference::Property { base, .. } => base,
                    _ => JsValue::Undefined,
                };
                (func, this)
            }
            Expression::Identifier(name) => {
                let reference = self.resolve_binding(env, name);
                // a `with` record supplies its binding object as `this`
                let this = match &reference {
                    Reference::Environment { env: record, .. } => {
                        let borrowed = record.borrow();
                        if borrowed.provide_this
                            && let Some(ref obj) = borrowed.object
                        {
                            let id = obj.borrow().id.expect("object is allocated");
                            JsValue::Object(crate::types::JsObject { id })
                        } else {
                            JsValue::Undefined
                        }
                    }
                    _ => JsValue::Undefined,
                };
                let func = self.get_reference(&reference)?;
                (func, this)
            }
            other => (self.eval_expr(other, env)?, JsValue::Undefined),
        };

        let mut arg_vals = Vec::with_capacity(args.len());
        for a in args {
            arg_vals.push(self.eval_expr(a, env)?);
        }

        // direct eval: the callee is the identifier `eval` resolving to the
        // intrinsic; it runs in the caller's environment
        if let Expression::Identifier(name) = callee
            && name == "eval"
            && self.is_intrinsic_eval(&func)
        {
            let Some(JsValue::String(source)) = arg_vals.first().map(|v| v.clone()) else {
                return Ok(arg_vals.into_iter().next().unwrap_or(JsValue::Undefined));
            };
            return completion_value(self.eval_source_in_env(&source.to_rust_string(), env));
        }

        completion_value(self.call_function(&func, &this, &arg_vals))
    }

    pub(crate) fn is_intrinsic_eval(&self, val: &JsValue) -> bool {
        match (val, self.eval_function_id) {
            (JsValue::Object(o), Some(id)) => o.id == id,
            _ => false,
        }
    }

    fn eval_array_literal(
        &mut self,
        elements: &[Option<Expression>],
        env: &EnvRef,
    ) -> EvalResult<JsValue> {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = "Array".to_string();
            o.prototype = self.array_prototype.clone();
            o.insert_property(
                "length".to_string(),
                PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
            );
        }
        let array_val = self.object_value(&obj);
        for (i, element) in elements.iter().enumerate() {
            // elisions leave holes but still count toward length
            if let Some(expr) = element {
                let val = self.eval_expr(expr, env)?;
                obj.borrow_mut().insert_value(i.to_string(), val);
            }
        }
        obj.borrow_mut().define_own_property(
            "length".to_string(),
            PropertyDescriptor::value_only(JsValue::Number(elements.len() as f64)),
        );
        Ok(array_val)
    }

    fn eval_object_literal(&mut self, props: &[Property], env: &EnvRef) -> EvalResult<JsValue> {
        let obj = self.create_object();
        let obj_val = self.object_value(&obj);
        for prop in props {
            let key = prop.key.name();
            match prop.kind {
                PropertyKind::Init => {
                    let val = self.eval_expr(&prop.value, env)?;
                    obj.borrow_mut()
                        .define_own_property(key, PropertyDescriptor::data_default(val));
                }
                PropertyKind::Get => {
                    let getter = self.eval_expr(&prop.value, env)?;
                    obj.borrow_mut().define_own_property(
                        key,
                        PropertyDescriptor {
                            value: None,
                            writable: None,
                            get: Some(getter),
                            set: None,
                            enumerable: Some(true),
                            configurable: Some(true),
                        },
                    );
                }
                PropertyKind::Set => {
                    let setter = self.eval_expr(&prop.value, env)?;
                    obj.borrow_mut().define_own_property(
                        key,
                        PropertyDescriptor {
                            value: None,
                            writable: None,
                            get: None,
                            set: Some(setter),
                            enumerable: Some(true),
                            configurable: Some(true),
                        },
                    );
                }
            }
        }
        Ok(obj_val)
    }

    /// Function expressions with a name bind it immutably in a private
    /// scope so the function can refer to itself (§13).
    pub(crate) fn instantiate_function_expression(
        &mut self,
        decl: &Rc<FunctionLiteral>,
        env: &EnvRef,
    ) -> JsValue {
        match &decl.name {
            Some(name) => {
                let scope = Environment::new(Some(env.clone()));
                let val = self.create_function(JsFunction::User {
                    decl: decl.clone(),
                    closure: scope.clone(),
                });
                scope.borrow_mut().declare_immutable(name, val.clone());
                val
            }
            None => self.create_function(JsFunction::User {
                decl: decl.clone(),
                closure: env.clone(),
            }),
        }
    }
}
