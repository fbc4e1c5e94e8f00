use super::*;
use crate::vm::InterruptSlot;

/// Bookkeeping for one deep-copy pass. The target arena keeps the source's
/// slot layout so object ids survive the clone; environments are memoized
/// by pointer because closures form cycles through them.
struct CloneState {
    objects: Vec<Option<ObjRef>>,
    env_map: HashMap<usize, EnvRef>,
}

impl Interpreter {
    /// Deep copy: the clone shares no mutable state with the source.
    /// Functions and closures are recreated against the clone's
    /// environment graph; the interrupt slot starts empty.
    pub(crate) fn deep_clone(&self) -> Interpreter {
        let mut state = CloneState {
            objects: vec![None; self.objects.len()],
            env_map: HashMap::new(),
        };

        let global_env = self.clone_env(&mut state, &self.global_env);
        let global_object = self
            .global_object
            .as_ref()
            .and_then(|o| self.clone_obj(&mut state, o));

        let object_prototype = self.clone_proto(&mut state, &self.object_prototype);
        let function_prototype = self.clone_proto(&mut state, &self.function_prototype);
        let array_prototype = self.clone_proto(&mut state, &self.array_prototype);
        let string_prototype = self.clone_proto(&mut state, &self.string_prototype);
        let number_prototype = self.clone_proto(&mut state, &self.number_prototype);
        let boolean_prototype = self.clone_proto(&mut state, &self.boolean_prototype);
        let date_prototype = self.clone_proto(&mut state, &self.date_prototype);
        let regexp_prototype = self.clone_proto(&mut state, &self.regexp_prototype);
        let error_prototype = self.clone_proto(&mut state, &self.error_prototype);
        let type_error_prototype = self.clone_proto(&mut state, &self.type_error_prototype);
        let reference_error_prototype =
            self.clone_proto(&mut state, &self.reference_error_prototype);
        let syntax_error_prototype = self.clone_proto(&mut state, &self.syntax_error_prototype);
        let range_error_prototype = self.clone_proto(&mut state, &self.range_error_prototype);
        let uri_error_prototype = self.clone_proto(&mut state, &self.uri_error_prototype);
        let eval_error_prototype = self.clone_proto(&mut state, &self.eval_error_prototype);

        let free_list = state
            .objects
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect();

        Interpreter {
            objects: state.objects,
            free_list,
            gc_alloc_count: 0,
            gc_temp_roots: Vec::new(),
            global_env,
            global_object,
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            date_prototype,
            regexp_prototype,
            error_prototype,
            type_error_prototype,
            reference_error_prototype,
            syntax_error_prototype,
            range_error_prototype,
            uri_error_prototype,
            eval_error_prototype,
            // slot layout is preserved, so the intrinsic keeps its id
            eval_function_id: self.eval_function_id,
            call_stack: Vec::new(),
            stack_depth_limit: self.stack_depth_limit,
            interrupt_armed: Arc::new(AtomicBool::new(false)),
            interrupt_slot: InterruptSlot::default(),
            lowercase_keys: self.lowercase_keys,
            filename: self.filename.clone(),
            current_line: 0,
            current_column: 0,
        }
    }

    fn clone_proto(&self, state: &mut CloneState, proto: &Option<ObjRef>) -> Option<ObjRef> {
        proto.as_ref().and_then(|o| self.clone_obj(state, o))
    }

    fn clone_obj(&self, state: &mut CloneState, obj: &ObjRef) -> Option<ObjRef> {
        let id = obj.borrow().id?;
        self.clone_object_by_id(state, id)
    }

    fn clone_object_by_id(&self, state: &mut CloneState, id: u64) -> Option<ObjRef> {
        let idx = id as usize;
        if let Some(Some(existing)) = state.objects.get(idx) {
            return Some(existing.clone());
        }
        let src_obj = self.objects.get(idx)?.clone()?;

        let new_obj = Rc::new(RefCell::new(JsObjectData::new()));
        new_obj.borrow_mut().id = Some(id);
        state.objects[idx] = Some(new_obj.clone());

        let src = src_obj.borrow();
        let prototype = src
            .prototype
            .as_ref()
            .and_then(|p| self.clone_obj(state, p));
        let mut properties = HashMap::with_capacity(src.properties.len());
        for (key, desc) in &src.properties {
            properties.insert(key.clone(), self.clone_descriptor(state, desc));
        }
        let callable = src
            .callable
            .as_ref()
            .map(|f| self.clone_function(state, f));
        let primitive_value = src
            .primitive_value
            .as_ref()
            .map(|v| self.clone_value(state, v));
        let parameter_map = src.parameter_map.as_ref().map(|map| {
            map.iter()
                .map(|(k, (env, param))| {
                    (k.clone(), (self.clone_env(state, env), param.clone()))
                })
                .collect()
        });

        {
            let mut dst = new_obj.borrow_mut();
            dst.class_name = src.class_name.clone();
            dst.extensible = src.extensible;
            dst.property_order = src.property_order.clone();
            dst.prototype = prototype;
            dst.properties = properties;
            dst.callable = callable;
            dst.primitive_value = primitive_value;
            dst.parameter_map = parameter_map;
            dst.regexp = src.regexp.clone();
        }
        Some(new_obj)
    }

    fn clone_descriptor(
        &self,
        state: &mut CloneState,
        desc: &PropertyDescriptor,
    ) -> PropertyDescriptor {
        PropertyDescriptor {
            value: desc.value.as_ref().map(|v| self.clone_value(state, v)),
            writable: desc.writable,
            get: desc.get.as_ref().map(|v| self.clone_value(state, v)),
            set: desc.set.as_ref().map(|v| self.clone_value(state, v)),
            enumerable: desc.enumerable,
            configurable: desc.configurable,
        }
    }

    fn clone_value(&self, state: &mut CloneState, val: &JsValue) -> JsValue {
        if let JsValue::Object(o) = val {
            // materialize the referent at the same id; dead references
            // (already collected slots) are carried over as-is
            self.clone_object_by_id(state, o.id);
        }
        val.clone()
    }

    fn clone_function(&self, state: &mut CloneState, func: &JsFunction) -> JsFunction {
        match func {
            JsFunction::User { decl, closure } => JsFunction::User {
                decl: decl.clone(),
                closure: self.clone_env(state, closure),
            },
            // native closures are immutable and shared
            JsFunction::Native {
                name,
                length,
                func,
                constructor,
            } => JsFunction::Native {
                name: name.clone(),
                length: *length,
                func: func.clone(),
                constructor: *constructor,
            },
            JsFunction::Bound { target, this, args } => JsFunction::Bound {
                target: Box::new(self.clone_value(state, target)),
                this: Box::new(self.clone_value(state, this)),
                args: args.iter().map(|v| self.clone_value(state, v)).collect(),
            },
        }
    }

    fn clone_env(&self, state: &mut CloneState, env: &EnvRef) -> EnvRef {
        let ptr = Rc::as_ptr(env) as usize;
        if let Some(existing) = state.env_map.get(&ptr) {
            return existing.clone();
        }
        let new_env = Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            parent: None,
            object: None,
            provide_this: env.borrow().provide_this,
        }));
        // memoize before filling: closures cycle back through their scope
        state.env_map.insert(ptr, new_env.clone());

        let parent = env
            .borrow()
            .parent
            .as_ref()
            .map(|p| self.clone_env(state, p));
        let object = env
            .borrow()
            .object
            .as_ref()
            .and_then(|o| self.clone_obj(state, o));
        let bindings: Vec<(String, Binding)> = env
            .borrow()
            .bindings
            .iter()
            .map(|(name, binding)| {
                (
                    name.clone(),
                    Binding {
                        value: self.clone_value(state, &binding.value),
                        mutable: binding.mutable,
                    },
                )
            })
            .collect();

        {
            let mut dst = new_env.borrow_mut();
            dst.parent = parent;
            dst.object = object;
            dst.bindings = bindings.into_iter().collect();
        }
        new_env
    }
}
