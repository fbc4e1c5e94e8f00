use super::*;

impl Interpreter {
    pub(crate) fn allocate_object_slot(&mut self, obj: ObjRef) -> u64 {
        self.gc_alloc_count += 1;
        let id = if let Some(idx) = self.free_list.pop() {
            self.objects[idx] = Some(obj.clone());
            idx as u64
        } else {
            let idx = self.objects.len();
            self.objects.push(Some(obj.clone()));
            idx as u64
        };
        obj.borrow_mut().id = Some(id);
        id
    }

    /// Keep an object alive across script re-entry while it is only held
    /// from native code (e.g. a map accumulator between callback calls).
    /// Callers truncate `gc_temp_roots` back to their saved mark.
    pub(crate) fn root_temp(&mut self, val: &JsValue) {
        if let JsValue::Object(o) = val {
            self.gc_temp_roots.push(o.id);
        }
    }

    /// Threshold-triggered mark-sweep over the arena. The `Rc` graph frees
    /// acyclic garbage on its own; this pass reclaims the slots and breaks
    /// closure/object cycles.
    pub(crate) fn maybe_gc(&mut self) {
        if self.gc_alloc_count < GC_THRESHOLD {
            return;
        }
        self.gc_alloc_count = 0;
        let obj_count = self.objects.len();
        let mut marks = vec![false; obj_count];

        let mut worklist: Vec<u64> = Vec::new();
        Self::collect_env_roots(&self.global_env, &mut worklist);
        for proto in [
            &self.global_object,
            &self.object_prototype,
            &self.function_prototype,
            &self.array_prototype,
            &self.string_prototype,
            &self.number_prototype,
            &self.boolean_prototype,
            &self.date_prototype,
            &self.regexp_prototype,
            &self.error_prototype,
            &self.type_error_prototype,
            &self.reference_error_prototype,
            &self.syntax_error_prototype,
            &self.range_error_prototype,
            &self.uri_error_prototype,
            &self.eval_error_prototype,
        ] {
            if let Some(p) = proto
                && let Some(id) = p.borrow().id
            {
                worklist.push(id);
            }
        }
        for frame in &self.call_stack {
            Self::collect_env_roots(&frame.env, &mut worklist);
        }
        worklist.extend_from_slice(&self.gc_temp_roots);

        while let Some(id) = worklist.pop() {
            let idx = id as usize;
            if idx >= obj_count || marks[idx] {
                continue;
            }
            marks[idx] = true;
            let obj_rc = match &self.objects[idx] {
                Some(rc) => rc.clone(),
                None => continue,
            };
            let obj = obj_rc.borrow();

            if let Some(ref proto) = obj.prototype
                && let Some(pid) = proto.borrow().id
            {
                worklist.push(pid);
            }
            for desc in obj.properties.values() {
                if let Some(ref v) = desc.value {
                    Self::collect_value_roots(v, &mut worklist);
                }
                if let Some(ref v) = desc.get {
                    Self::collect_value_roots(v, &mut worklist);
                }
                if let Some(ref v) = desc.set {
                    Self::collect_value_roots(v, &mut worklist);
                }
            }
            if let Some(ref v) = obj.primitive_value {
                Self::collect_value_roots(v, &mut worklist);
            }
            match obj.callable {
                Some(JsFunction::User { ref closure, .. }) => {
                    Self::collect_env_roots(closure, &mut worklist);
                }
                Some(JsFunction::Bound {
                    ref target,
                    ref this,
                    ref args,
                }) => {
                    Self::collect_value_roots(target, &mut worklist);
                    Self::collect_value_roots(this, &mut worklist);
                    for v in args {
                        Self::collect_value_roots(v, &mut worklist);
                    }
                }
                _ => {}
            }
            if let Some(ref map) = obj.parameter_map {
                for (env, _) in map.values() {
                    Self::collect_env_roots(env, &mut worklist);
                }
            }
        }

        for i in 0..obj_count {
            if !marks[i] && self.objects[i].is_some() {
                self.objects[i] = None;
                self.free_list.push(i);
            }
        }
    }

    fn collect_value_roots(val: &JsValue, worklist: &mut Vec<u64>) {
        if let JsValue::Object(o) = val {
            worklist.push(o.id);
        }
    }

    fn collect_env_roots(env: &EnvRef, worklist: &mut Vec<u64>) {
        let mut seen = std::collections::HashSet::new();
        let mut current = Some(env.clone());
        while let Some(e) = current {
            let ptr = Rc::as_ptr(&e) as usize;
            if !seen.insert(ptr) {
                break;
            }
            let borrowed = e.borrow();
            if let Some(ref obj) = borrowed.object
                && let Some(id) = obj.borrow().id
            {
                worklist.push(id);
            }
            for binding in borrowed.bindings.values() {
                Self::collect_value_roots(&binding.value, worklist);
            }
            current = borrowed.parent.clone();
        }
    }
}
