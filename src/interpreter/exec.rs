use super::*;

impl Interpreter {
    pub(crate) fn exec_statements(&mut self, stmts: &[Statement], env: &EnvRef) -> Completion {
        let mut result = JsValue::Undefined;
        for stmt in stmts {
            self.maybe_gc();
            if let Some(fatal) = self.check_interrupt() {
                return fatal;
            }
            match self.exec_statement(stmt, env) {
                Completion::Normal(val) => result = val,
                other => return other,
            }
        }
        Completion::Normal(result)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement, env: &EnvRef) -> Completion {
        self.exec_statement_labelled(stmt, env, &[])
    }

    /// `labels` is the set naming this statement; iteration statements
    /// consume matching labelled break/continue completions.
    fn exec_statement_labelled(
        &mut self,
        stmt: &Statement,
        env: &EnvRef,
        labels: &[String],
    ) -> Completion {
        self.current_line = stmt.line;
        self.current_column = stmt.column;
        match &stmt.kind {
            StatementKind::Empty | StatementKind::Debugger => {
                Completion::Normal(JsValue::Undefined)
            }
            StatementKind::Expression(expr) => self.eval_expression(expr, env),
            // ES5 blocks do not create scope
            StatementKind::Block(stmts) => self.exec_statements(stmts, env),
            StatementKind::Variable(decls) => self.exec_variable_declaration(decls, env),
            StatementKind::If(if_stmt) => {
                let test = match self.eval_expression(&if_stmt.test, env) {
                    Completion::Normal(v) => v,
                    other => return other,
                };
                if to_boolean(&test) {
                    self.exec_statement(&if_stmt.consequent, env)
                } else if let Some(alt) = &if_stmt.alternate {
                    self.exec_statement(alt, env)
                } else {
                    Completion::Normal(JsValue::Undefined)
                }
            }
            StatementKind::While(w) => self.exec_while(w, env, labels),
            StatementKind::DoWhile(dw) => self.exec_do_while(dw, env, labels),
            StatementKind::For(f) => self.exec_for(f, env, labels),
            StatementKind::ForIn(fi) => self.exec_for_in(fi, env, labels),
            StatementKind::Return(expr) => {
                let val = match expr {
                    Some(e) => match self.eval_expression(e, env) {
                        Completion::Normal(v) => v,
                        other => return other,
                    },
                    None => JsValue::Undefined,
                };
                Completion::Return(val)
            }
            StatementKind::Break(label) => Completion::Break(label.clone()),
            StatementKind::Continue(label) => Completion::Continue(label.clone()),
            StatementKind::Throw(expr) => {
                let val = match self.eval_expression(expr, env) {
                    Completion::Normal(v) => v,
                    other => return other,
                };
                Completion::Throw(val)
            }
            StatementKind::Try(t) => self.exec_try(t, env),
            StatementKind::Switch(s) => self.exec_switch(s, env),
            StatementKind::Labeled(label, inner) => {
                let mut set = labels.to_vec();
                set.push(label.clone());
                let comp = self.exec_statement_labelled(inner, env, &set);
                match comp {
                    Completion::Break(Some(l)) if l == *label => {
                        Completion::Normal(JsValue::Undefined)
                    }
                    other => other,
                }
            }
            StatementKind::With(expr, body) => {
                let val = match self.eval_expression(expr, env) {
                    Completion::Normal(v) => v,
                    other => return other,
                };
                let obj = match self.to_object_value(&val) {
                    Ok(o) => o,
                    Err(c) => return c,
                };
                let with_env = Environment::new_object_backed(Some(env.clone()), obj, true);
                self.exec_statement(body, &with_env)
            }
            // bound during hoisting
            StatementKind::FunctionDeclaration(_) => Completion::Normal(JsValue::Undefined),
        }
    }

    /// Hoist `var` and function declarations into the variable environment
    /// (§10.5). Parameters and existing bindings are never clobbered by
    /// vars; function declarations bind their value.
    pub(crate) fn hoist_declarations(
        &mut self,
        stmts: &[Statement],
        env: &EnvRef,
    ) -> Result<(), JsValue> {
        let mut vars: Vec<String> = Vec::new();
        let mut funcs: Vec<Rc<FunctionLiteral>> = Vec::new();
        collect_declarations(stmts, &mut vars, &mut funcs);
        for name in vars {
            self.declare_var(env, &name);
        }
        for f in funcs {
            let val = self.create_function(JsFunction::User {
                decl: f.clone(),
                closure: env.clone(),
            });
            let name = f.name.clone().unwrap_or_default();
            self.bind_hoisted(env, &name, val);
        }
        Ok(())
    }

    fn declare_var(&mut self, env: &EnvRef, name: &str) {
        let object = env.borrow().object.clone();
        match object {
            Some(obj) => {
                // global vars are non-configurable global object properties
                if !obj.borrow().has_own_property(name) {
                    obj.borrow_mut().insert_property(
                        name.to_string(),
                        PropertyDescriptor::data(JsValue::Undefined, true, true, false),
                    );
                }
            }
            None => {
                if !env.borrow().bindings.contains_key(name) {
                    env.borrow_mut().declare(name, JsValue::Undefined);
                }
            }
        }
    }

    fn bind_hoisted(&mut self, env: &EnvRef, name: &str, val: JsValue) {
        let object = env.borrow().object.clone();
        match object {
            Some(obj) => {
                let exists = obj.borrow().has_own_property(name);
                if exists {
                    obj.borrow_mut().define_own_property(
                        name.to_string(),
                        PropertyDescriptor::value_only(val),
                    );
                } else {
                    obj.borrow_mut().insert_property(
                        name.to_string(),
                        PropertyDescriptor::data(val, true, true, false),
                    );
                }
            }
            None => env.borrow_mut().declare(name, val),
        }
    }

    fn exec_variable_declaration(
        &mut self,
        decls: &[VariableDeclarator],
        env: &EnvRef,
    ) -> Completion {
        for d in decls {
            if let Some(init) = &d.init {
                let val = match self.eval_expression(init, env) {
                    Completion::Normal(v) => v,
                    other => return other,
                };
                // resolve through the scope chain: inside `with`, the var
                // write can land on the binding object
                let reference = self.resolve_binding(env, &d.name);
                if let Err(c) = self.put_reference(reference, val) {
                    return c;
                }
            }
        }
        Completion::Normal(JsValue::Undefined)
    }

    fn loop_body_step(
        &mut self,
        body: &Statement,
        env: &EnvRef,
        labels: &[String],
    ) -> LoopStep {
        match self.exec_statement(body, env) {
            Completion::Normal(_) | Completion::Continue(None) => LoopStep::Continue,
            Completion::Continue(Some(l)) if labels.contains(&l) => LoopStep::Continue,
            Completion::Break(None) => LoopStep::Break,
            Completion::Break(Some(l)) if labels.contains(&l) => LoopStep::Break,
            other => LoopStep::Abrupt(other),
        }
    }

    fn exec_while(&mut self, w: &WhileStatement, env: &EnvRef, labels: &[String]) -> Completion {
        loop {
            if let Some(fatal) = self.check_interrupt() {
                return fatal;
            }
            let test = match self.eval_expression(&w.test, env) {
                Completion::Normal(v) => v,
                other => return other,
            };
            if !to_boolean(&test) {
                break;
            }
            match self.loop_body_step(&w.body, env, labels) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Abrupt(c) => return c,
            }
        }
        Completion::Normal(JsValue::Undefined)
    }

    fn exec_do_while(
        &mut self,
        dw: &DoWhileStatement,
        env: &EnvRef,
        labels: &[String],
    ) -> Completion {
        loop {
            if let Some(fatal) = self.check_interrupt() {
                return fatal;
            }
            match self.loop_body_step(&dw.body, env, labels) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Abrupt(c) => return c,
            }
            let test = match self.eval_expression(&dw.test, env) {
                Completion::Normal(v) => v,
                other => return other,
            };
            if !to_boolean(&test) {
                break;
            }
        }
        Completion::Normal(JsValue::Undefined)
    }

    fn exec_for(&mut self, f: &ForStatement, env: &EnvRef, labels: &[String]) -> Completion {
        match &f.init {
            Some(ForInit::Variable(decls)) => {
                let comp = self.exec_variable_declaration(decls, env);
                if comp.is_abrupt() {
                    return comp;
                }
            }
            Some(ForInit::Expression(expr)) => {
                let comp = self.eval_expression(expr, env);
                if comp.is_abrupt() {
                    return comp;
                }
            }
            None => {}
        }
        loop {
            if let Some(fatal) = self.check_interrupt() {
                return fatal;
            }
            if let Some(test) = &f.test {
                let val = match self.eval_expression(test, env) {
                    Completion::Normal(v) => v,
                    other => return other,
                };
                if !to_boolean(&val) {
                    break;
                }
            }
            match self.loop_body_step(&f.body, env, labels) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Abrupt(c) => return c,
            }
            if let Some(update) = &f.update {
                let comp = self.eval_expression(update, env);
                if comp.is_abrupt() {
                    return comp;
                }
            }
        }
        Completion::Normal(JsValue::Undefined)
    }

    fn exec_for_in(&mut self, fi: &ForInStatement, env: &EnvRef, labels: &[String]) -> Completion {
        // legacy `for (var x = init in o)` runs the initializer first
        if let ForInLeft::Variable(name, Some(init)) = &fi.left {
            let val = match self.eval_expression(init, env) {
                Completion::Normal(v) => v,
                other => return other,
            };
            let reference = self.resolve_binding(env, name);
            if let Err(c) = self.put_reference(reference, val) {
                return c;
            }
        }
        let obj_val = match self.eval_expression(&fi.right, env) {
            Completion::Normal(v) => v,
            other => return other,
        };
        if obj_val.is_nullish() {
            return Completion::Normal(JsValue::Undefined);
        }
        let obj = match self.to_object_value(&obj_val) {
            Ok(o) => o,
            Err(c) => return c,
        };
        let keys = Self::enumerate_keys(&obj, true, false);
        for key in keys {
            if let Some(fatal) = self.check_interrupt() {
                return fatal;
            }
            // keys deleted or made non-enumerable mid-iteration are skipped
            match obj.borrow().get_property_descriptor(&key) {
                Some(desc) if desc.is_enumerable() => {}
                _ => continue,
            }
            let key_val = JsValue::String(JsString::from_str(&key));
            let reference = match &fi.left {
                ForInLeft::Variable(name, _) => self.resolve_binding(env, name),
                ForInLeft::Expression(lhs) => match self.eval_reference(lhs, env) {
                    Ok(r) => r,
                    Err(c) => return c,
                },
            };
            if let Err(c) = self.put_reference(reference, key_val) {
                return c;
            }
            match self.loop_body_step(&fi.body, env, labels) {
                LoopStep::Continue => {}
                LoopStep::Break => break,
                LoopStep::Abrupt(c) => return c,
            }
        }
        Completion::Normal(JsValue::Undefined)
    }

    // §12.14: the finally completion wins only when it is itself abrupt;
    // a fatal signal skips handlers entirely.
    fn exec_try(&mut self, t: &TryStatement, env: &EnvRef) -> Completion {
        let mut result = self.exec_statements(&t.block, env);
        if let Completion::Throw(thrown) = result {
            match &t.handler {
                Some(handler) => {
                    let catch_env = Environment::new(Some(env.clone()));
                    catch_env.borrow_mut().declare(&handler.param, thrown);
                    result = self.exec_statements(&handler.body, &catch_env);
                }
                None => result = Completion::Throw(thrown),
            }
        }
        if matches!(result, Completion::Fatal) {
            return result;
        }
        if let Some(finalizer) = &t.finalizer {
            let fin_result = self.exec_statements(finalizer, env);
            if fin_result.is_abrupt() {
                return fin_result;
            }
        }
        result
    }

    fn exec_switch(&mut self, s: &SwitchStatement, env: &EnvRef) -> Completion {
        let disc = match self.eval_expression(&s.discriminant, env) {
            Completion::Normal(v) => v,
            other => return other,
        };
        let mut matched: Option<usize> = None;
        for (i, case) in s.cases.iter().enumerate() {
            let Some(test) = &case.test else { continue };
            let test_val = match self.eval_expression(test, env) {
                Completion::Normal(v) => v,
                other => return other,
            };
            if strict_equals(&disc, &test_val) {
                matched = Some(i);
                break;
            }
        }
        let start = match matched.or_else(|| s.cases.iter().position(|c| c.test.is_none())) {
            Some(i) => i,
            None => return Completion::Normal(JsValue::Undefined),
        };
        // fall through from the selected clause, default included
        for case in &s.cases[start..] {
            for stmt in &case.consequent {
                match self.exec_statement(stmt, env) {
                    Completion::Normal(_) => {}
                    Completion::Break(None) => return Completion::Normal(JsValue::Undefined),
                    other => return other,
                }
            }
        }
        Completion::Normal(JsValue::Undefined)
    }
}

enum LoopStep {
    Continue,
    Break,
    Abrupt(Completion),
}

fn collect_declarations(
    stmts: &[Statement],
    vars: &mut Vec<String>,
    funcs: &mut Vec<Rc<FunctionLiteral>>,
) {
    for stmt in stmts {
        collect_from_kind(&stmt.kind, vars, funcs);
    }
}

// Walks every statement position without descending into nested functions.
fn collect_from_kind(
    kind: &StatementKind,
    vars: &mut Vec<String>,
    funcs: &mut Vec<Rc<FunctionLiteral>>,
) {
    match kind {
        StatementKind::Variable(decls) => {
            for d in decls {
                vars.push(d.name.clone());
            }
        }
        StatementKind::FunctionDeclaration(f) => funcs.push(f.clone()),
        StatementKind::Block(stmts) => collect_declarations(stmts, vars, funcs),
        StatementKind::If(s) => {
            collect_from_kind(&s.consequent.kind, vars, funcs);
            if let Some(alt) = &s.alternate {
                collect_from_kind(&alt.kind, vars, funcs);
            }
        }
        StatementKind::While(s) => collect_from_kind(&s.body.kind, vars, funcs),
        StatementKind::DoWhile(s) => collect_from_kind(&s.body.kind, vars, funcs),
        StatementKind::For(s) => {
            if let Some(ForInit::Variable(decls)) = &s.init {
                for d in decls {
                    vars.push(d.name.clone());
                }
            }
            collect_from_kind(&s.body.kind, vars, funcs);
        }
        StatementKind::ForIn(s) => {
            if let ForInLeft::Variable(name, _) = &s.left {
                vars.push(name.clone());
            }
            collect_from_kind(&s.body.kind, vars, funcs);
        }
        StatementKind::Try(t) => {
            collect_declarations(&t.block, vars, funcs);
            if let Some(handler) = &t.handler {
                collect_declarations(&handler.body, vars, funcs);
            }
            if let Some(finalizer) = &t.finalizer {
                collect_declarations(finalizer, vars, funcs);
            }
        }
        StatementKind::Switch(s) => {
            for case in &s.cases {
                collect_declarations(&case.consequent, vars, funcs);
            }
        }
        StatementKind::Labeled(_, inner) => collect_from_kind(&inner.kind, vars, funcs),
        StatementKind::With(_, body) => collect_from_kind(&body.kind, vars, funcs),
        _ => {}
    }
}
