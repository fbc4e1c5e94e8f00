use serde::{Deserialize, Serialize};
use skua::{Error, Signal, Value, Vm};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

fn eval_string(vm: &mut Vm, source: &str) -> String {
    let value = vm.run(source).expect("script failed");
    value.to_string_value(vm).expect("ToString failed")
}

fn eval_number(vm: &mut Vm, source: &str) -> f64 {
    vm.run(source)
        .expect("script failed")
        .as_f64()
        .expect("expected a number")
}

fn eval_bool(vm: &mut Vm, source: &str) -> bool {
    vm.run(source)
        .expect("script failed")
        .as_bool()
        .expect("expected a boolean")
}

#[test]
fn call_on_function_expression() {
    let mut vm = Vm::new();
    assert_eq!(eval_number(&mut vm, "(function(){ return 1 }).call(this)"), 1.0);
}

#[test]
fn math_pow() {
    let mut vm = Vm::new();
    assert_eq!(eval_number(&mut vm, "Math.pow(3, 2)"), 9.0);
}

#[test]
fn equality_and_typeof() {
    let mut vm = Vm::new();
    assert!(eval_bool(&mut vm, "1 == '1'"));
    assert!(!eval_bool(&mut vm, "1 === '1'"));
    assert_eq!(eval_string(&mut vm, "typeof null"), "object");
    assert_eq!(eval_string(&mut vm, "typeof function(){}"), "function");
    assert_eq!(eval_string(&mut vm, "typeof neverDeclared"), "undefined");
}

#[test]
fn for_loop_with_continue() {
    let mut vm = Vm::new();
    assert_eq!(
        eval_number(
            &mut vm,
            "var a=0; for(i=0;i<3;i++){ if(i==2) continue; a+=1 } a"
        ),
        2.0
    );
}

#[test]
fn do_while_continue_through_finally() {
    let mut vm = Vm::new();
    let source = r#"
        var abc = false, def = 0;
        do {
            def += 1;
            if (def > 100) break;
            try { continue; } finally { abc = true; }
        } while (!abc && def < 10)
        def
    "#;
    assert_eq!(eval_number(&mut vm, source), 1.0);
}

#[test]
fn array_concat() {
    let mut vm = Vm::new();
    assert_eq!(eval_string(&mut vm, "[1,2,3].concat(4,[5,6])"), "1,2,3,4,5,6");
}

#[test]
fn direct_and_indirect_eval() {
    let mut vm = Vm::new();
    let source = r#"
        var a = 'global';
        (function(){
            var _e = eval;
            var a = 'local';
            return [_e("a"), eval("a")];
        })()
    "#;
    assert_eq!(eval_string(&mut vm, source), "global,local");
}

#[test]
fn stack_depth_limit_boundaries() {
    let code = r#"
        function a() {}
        function b() { a(); }
        function c() { b(); }
        function d() { c(); }
        function e() { d(); }
        e();
    "#;

    let mut vm = Vm::new();
    assert!(vm.run(code).is_ok());

    let mut vm = Vm::new();
    vm.set_stack_depth_limit(2);
    assert!(vm.run(code).is_err());

    let mut vm = Vm::new();
    vm.set_stack_depth_limit(5);
    let err = vm.run(code).expect_err("six-deep chain must overflow");
    match err {
        Error::Script(e) => assert!(e.message.starts_with("RangeError"), "{}", e.message),
        other => panic!("unexpected error {other:?}"),
    }

    let mut vm = Vm::new();
    vm.set_stack_depth_limit(6);
    assert!(vm.run(code).is_ok());

    // resetting to zero removes the limit
    let mut vm = Vm::new();
    vm.set_stack_depth_limit(1);
    vm.set_stack_depth_limit(0);
    assert!(vm.run(code).is_ok());
}

#[test]
fn stack_overflow_is_catchable() {
    let mut vm = Vm::new();
    vm.set_stack_depth_limit(4);
    let caught = eval_string(
        &mut vm,
        r#"
            function f() { return f(); }
            var result = 'none';
            try { f(); } catch (e) { result = e.name; }
            result
        "#,
    );
    assert_eq!(caught, "RangeError");
}

#[test]
fn strict_equality_edge_cases() {
    let mut vm = Vm::new();
    assert!(eval_bool(&mut vm, "+0 === -0"));
    assert!(!eval_bool(&mut vm, "NaN === NaN"));
    assert!(eval_bool(&mut vm, "NaN != NaN"));
    assert!(eval_bool(&mut vm, "null == undefined"));
    assert!(!eval_bool(&mut vm, "null === undefined"));
}

#[test]
fn delete_then_in() {
    let mut vm = Vm::new();
    assert!(!eval_bool(
        &mut vm,
        "var o = { k: 1 }; delete o.k; 'k' in o"
    ));
    // inherited properties survive delete on the receiver
    assert!(eval_bool(
        &mut vm,
        "var o = {}; delete o.toString; 'toString' in o"
    ));
    // non-configurable properties do not delete
    assert!(eval_bool(
        &mut vm,
        r#"
            var o = {};
            Object.defineProperty(o, 'k', { value: 1, configurable: false });
            [delete o.k, 'k' in o].join() === 'false,true'
        "#
    ));
}

#[test]
fn arguments_aliases_parameters() {
    let mut vm = Vm::new();
    let source = r#"
        (function(a, b) {
            var before = [arguments.length, arguments[0], arguments[1]];
            arguments[0] = 'x';
            b = 'y';
            return before.concat([a, arguments[1], b]).join();
        })(1, 2, 3)
    "#;
    assert_eq!(eval_string(&mut vm, source), "3,1,2,x,y,y");
}

#[test]
fn try_finally_override_matrix() {
    let mut vm = Vm::new();
    // finally completing normally keeps the try completion
    assert_eq!(
        eval_number(
            &mut vm,
            "(function(){ try { return 1; } finally { var x = 2; } })()"
        ),
        1.0
    );
    // an abrupt finally wins over return
    assert_eq!(
        eval_number(
            &mut vm,
            "(function(){ try { return 1; } finally { return 2; } })()"
        ),
        2.0
    );
    // an abrupt finally wins over throw
    assert_eq!(
        eval_number(
            &mut vm,
            "(function(){ try { throw 'boom'; } finally { return 3; } })()"
        ),
        3.0
    );
    // break pending through finally
    assert_eq!(
        eval_number(
            &mut vm,
            "var n = 0; while (true) { try { break; } finally { n += 1; } } n"
        ),
        1.0
    );
    // throw in finally replaces the original throw
    assert_eq!(
        eval_string(
            &mut vm,
            r#"
                var seen = '';
                try {
                    try { throw 'first'; } finally { throw 'second'; }
                } catch (e) { seen = e; }
                seen
            "#
        ),
        "second"
    );
}

#[test]
fn labelled_break_through_switch() {
    let mut vm = Vm::new();
    let source = r#"
        var log = [];
        outer: while (true) {
            switch (1) {
            case 1:
                log.push('in');
                break outer;
            }
            log.push('unreachable');
        }
        log.push('out');
        log.join()
    "#;
    assert_eq!(eval_string(&mut vm, source), "in,out");
}

#[test]
fn labelled_continue_targets_outer_loop() {
    let mut vm = Vm::new();
    let source = r#"
        var hits = 0;
        outer: for (var i = 0; i < 3; i++) {
            for (var j = 0; j < 3; j++) {
                if (j > i) continue outer;
                hits += 1;
            }
        }
        hits
    "#;
    assert_eq!(eval_number(&mut vm, source), 6.0);
}

#[test]
fn switch_fall_through_and_default() {
    let mut vm = Vm::new();
    let source = r#"
        function pick(x) {
            var out = [];
            switch (x) {
            case 1: out.push(1);
            default: out.push('d');
            case 2: out.push(2); break;
            case 3: out.push(3);
            }
            return out.join();
        }
        [pick(1), pick(2), pick(3), pick(9)].join('|')
    "#;
    assert_eq!(eval_string(&mut vm, source), "1,d,2|2|3|d,2");
}

#[test]
fn for_in_walks_prototype_once_per_key() {
    let mut vm = Vm::new();
    let source = r#"
        function Base() {}
        Base.prototype.inherited = 1;
        Base.prototype.shadowed = 2;
        var o = new Base();
        o.own = 3;
        o.shadowed = 4;
        var keys = [];
        for (var k in o) { keys.push(k); }
        keys.sort().join()
    "#;
    assert_eq!(eval_string(&mut vm, source), "inherited,own,shadowed");
}

#[test]
fn for_in_skips_deleted_keys() {
    let mut vm = Vm::new();
    let source = r#"
        var o = { a: 1, b: 2, c: 3 };
        var seen = [];
        for (var k in o) {
            seen.push(k);
            delete o.c;
        }
        seen.join()
    "#;
    assert_eq!(eval_string(&mut vm, source), "a,b");
}

#[test]
fn with_statement_scoping() {
    let mut vm = Vm::new();
    let source = r#"
        var o = { x: 1 };
        var x = 'outer';
        var seen = [];
        with (o) {
            seen.push(x);
            x = 2;
        }
        seen.push(o.x, x);
        seen.join()
    "#;
    assert_eq!(eval_string(&mut vm, source), "1,2,outer");
}

#[test]
fn this_binding_forms() {
    let mut vm = Vm::new();
    let source = r#"
        var results = [];
        var o = {
            name: 'o',
            m: function () { return this.name; }
        };
        results.push(o.m());
        var f = o.m;
        var name = 'global';
        results.push(f());
        function Ctor() { this.name = 'made'; }
        results.push(new Ctor().name);
        results.join()
    "#;
    assert_eq!(eval_string(&mut vm, source), "o,global,made");
}

#[test]
fn getters_and_setters() {
    let mut vm = Vm::new();
    let source = r#"
        var store = 0;
        var o = {
            get twice() { return store * 2; },
            set twice(v) { store = v; }
        };
        o.twice = 21;
        o.twice
    "#;
    assert_eq!(eval_number(&mut vm, source), 42.0);
}

#[test]
fn json_round_trip() {
    let mut vm = Vm::new();
    assert_eq!(
        eval_string(
            &mut vm,
            r#"JSON.stringify({ b: [1, 2], a: 'x', skipped: undefined })"#
        ),
        r#"{"b":[1,2],"a":"x"}"#
    );
    assert_eq!(
        eval_number(&mut vm, r#"JSON.parse('{"a": {"b": 41.5}}').a.b + 1"#),
        42.5
    );
    assert_eq!(
        eval_string(
            &mut vm,
            r#"JSON.stringify({a: 1, b: {c: 2}}, null, 2)"#
        ),
        "{\n  \"a\": 1,\n  \"b\": {\n    \"c\": 2\n  }\n}"
    );
    let err = vm
        .run("var cyc = {}; cyc.self = cyc; JSON.stringify(cyc)")
        .expect_err("cycles must be rejected");
    match err {
        Error::Script(e) => assert!(e.message.starts_with("TypeError"), "{}", e.message),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn vm_copy_is_independent() {
    let mut vm0 = Vm::new();
    vm0.run(
        r#"
            var abc = function() { return "Xyzzy"; };
            function def() { return abc() + (0 + {}); }
        "#,
    )
    .unwrap();
    assert_eq!(eval_string(&mut vm0, "def()"), "Xyzzy0[object Object]");

    let mut vm1 = vm0.copy();
    assert_eq!(eval_string(&mut vm1, "def()"), "Xyzzy0[object Object]");

    vm1.run("abc = function() { return 3.14159; };").unwrap();
    assert_eq!(eval_string(&mut vm1, "def()"), "3.141590[object Object]");
    assert_eq!(eval_string(&mut vm0, "def()"), "Xyzzy0[object Object]");
}

#[test]
fn vm_copy_recreates_closures() {
    let mut vm0 = Vm::new();
    vm0.run(
        r#"
            var global = (function () { return this; }());
            var abc = 0;
            var vm = "vm0";
            var def = (function(){
                var jkl = 0;
                var bump = function() {
                    global.abc += 1;
                    jkl += 1;
                    return 1;
                };
                return function() { return [vm, global.abc, jkl, bump()].join(); };
            })();
        "#,
    )
    .unwrap();
    assert_eq!(eval_string(&mut vm0, "def()"), "vm0,0,0,1");

    let mut vm1 = vm0.copy();
    vm1.set("vm", "vm1").unwrap();
    assert_eq!(eval_string(&mut vm1, "def()"), "vm1,1,1,1");
    assert_eq!(eval_string(&mut vm0, "def()"), "vm0,1,1,1");
    assert_eq!(eval_string(&mut vm1, "def()"), "vm1,2,2,1");
}

#[test]
fn interrupt_aborts_infinite_loops() {
    for script in ["for(;;) {}", "do {} while (true)"] {
        let (tx, rx) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let mut vm = Vm::new();
            tx.send(vm.interrupt_handle()).expect("send handle");
            vm.run(script)
        });
        let handle = rx.recv().expect("receive handle");
        std::thread::sleep(std::time::Duration::from_millis(50));
        handle.interrupt(|| Signal::Halt);
        let result = worker.join().expect("worker panicked");
        assert!(
            matches!(result, Err(Error::Interrupted)),
            "expected interrupt, got {result:?}"
        );
    }
}

#[test]
fn interrupt_is_not_catchable() {
    let (tx, rx) = std::sync::mpsc::channel();
    let worker = std::thread::spawn(move || {
        let mut vm = Vm::new();
        tx.send(vm.interrupt_handle()).expect("send handle");
        vm.run("for(;;) { try { } finally { } }")
    });
    let handle = rx.recv().expect("receive handle");
    std::thread::sleep(std::time::Duration::from_millis(50));
    handle.interrupt(|| Signal::Halt);
    let result = worker.join().expect("worker panicked");
    assert!(matches!(result, Err(Error::Interrupted)));
}

#[test]
fn host_functions_and_values() {
    let mut vm = Vm::new();
    vm.set_function("add", |mut inv| {
        let a = inv.argument(0).as_f64().unwrap_or(f64::NAN);
        let b = inv.argument(1).as_f64().unwrap_or(f64::NAN);
        inv.value(a + b)
    })
    .unwrap();
    assert_eq!(eval_number(&mut vm, "add(40, 2)"), 42.0);

    vm.set("limit", 10).unwrap();
    assert!(eval_bool(&mut vm, "limit === 10"));

    let got = vm.get("limit").unwrap();
    assert_eq!(got.as_f64(), Some(10.0));
}

#[test]
fn eval_runs_in_callers_scope() {
    let mut vm = Vm::new();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let obs = observed.clone();
    vm.set_function("probe", move |mut inv| {
        let v = inv.eval("a")?;
        obs.borrow_mut().push(v.as_f64().unwrap_or(f64::NAN));
        Ok(Value::undefined())
    })
    .unwrap();

    let obs = observed.clone();
    vm.set_function("mutate", move |mut inv| {
        inv.eval("a = 2; null")?;
        obs.borrow_mut().push(-1.0);
        Ok(Value::undefined())
    })
    .unwrap();

    vm.run(
        r#"
            (function t() {
                var a = 1;
                probe();
                mutate();
                probe();
            }())
        "#,
    )
    .unwrap();
    assert_eq!(*observed.borrow(), vec![1.0, -1.0, 2.0]);

    // with no script scope on the stack, eval falls back to the global one
    vm.set("a", 1).unwrap();
    vm.set("b", 2).unwrap();
    let v = vm.eval("a + b").unwrap();
    assert_eq!(v.as_f64(), Some(3.0));
}

#[test]
fn context_snapshot_inside_call_chain() {
    let mut vm = Vm::new();
    let captured = Rc::new(RefCell::new(None));

    let cap = captured.clone();
    vm.set_function("get_context", move |inv| {
        *cap.borrow_mut() = Some(inv.context());
        Ok(Value::undefined())
    })
    .unwrap();

    vm.run(
        r#"
            (function t() {
                var a = 1;
                function f1() {
                    var j = 2;
                    get_context();
                }
                function f2() { f1(); }
                f2();
            }())
        "#,
    )
    .unwrap();

    let ctx = captured.borrow_mut().take().expect("context captured");
    assert_eq!(ctx.callee, "f1");
    assert_eq!(ctx.filename, "<anonymous>");
    assert_eq!(ctx.stacktrace.len(), 4);
    assert!(ctx.stacktrace[0].starts_with("f1 (<anonymous>:"));
    assert!(ctx.stacktrace[1].starts_with("f2 (<anonymous>:"));
    assert!(ctx.stacktrace[2].starts_with("t (<anonymous>:"));
    assert_eq!(ctx.symbols.get("j").and_then(|v| v.as_f64()), Some(2.0));
    assert_eq!(ctx.symbols.get("a").and_then(|v| v.as_f64()), Some(1.0));
    assert!(ctx.symbols.contains_key("arguments"));
    assert!(ctx.symbols.get("f2").is_some_and(|v| v.is_function()));
}

#[test]
fn call_resolves_dotted_paths_and_new() {
    let mut vm = Vm::new();
    vm.run("var abc = { ghi: 10, def: function(x) { return this.ghi + x; } };")
        .unwrap();

    let five = vm.value(5).unwrap();
    let result = vm.call("abc.def", None, &[five]).unwrap();
    assert_eq!(result.as_f64(), Some(15.0));

    let three = vm.value(3).unwrap();
    let two = vm.value(2).unwrap();
    let nine = vm.call("Math.pow", None, &[three, two]).unwrap();
    assert_eq!(nine.as_f64(), Some(9.0));

    let fresh = vm.call("new Object", None, &[]).unwrap();
    assert!(fresh.is_object());

    vm.run("var a = { make: function B(x) { this.x = x; } }")
        .unwrap();
    let one = vm.value(1).unwrap();
    let made = vm.call("new a.make", None, &[one]).unwrap();
    let obj = made.object().expect("constructed object");
    assert_eq!(obj.get(&mut vm, "x").unwrap().as_f64(), Some(1.0));
}

#[test]
fn object_handle_surface() {
    let mut vm = Vm::new();
    vm.run("var o = { a: 1, b: 2, speak: function() { return 'hi ' + this.a; } };")
        .unwrap();
    let obj = vm.object("o").unwrap();
    assert_eq!(obj.class_name(), "Object");
    assert_eq!(obj.keys(), vec!["a", "b", "speak"]);
    assert!(obj.keys_by_parent().len() >= 2);

    assert_eq!(obj.get(&mut vm, "b").unwrap().as_f64(), Some(2.0));
    obj.set(&mut vm, "a", 7).unwrap();
    let spoken = obj.call(&mut vm, "speak", &[]).unwrap();
    assert_eq!(spoken.as_str().as_deref(), Some("hi 7"));
}

#[derive(Serialize)]
struct Job {
    #[serde(rename = "label")]
    name: String,
    hours: f64,
    #[serde(skip)]
    internal: u32,
}

#[test]
fn bridge_honours_serde_field_tags() {
    let mut vm = Vm::new();
    vm.set(
        "job",
        Job {
            name: "weld".to_string(),
            hours: 7.5,
            internal: 99,
        },
    )
    .unwrap();
    assert_eq!(eval_string(&mut vm, "job.label"), "weld");
    assert_eq!(eval_number(&mut vm, "job.hours"), 7.5);
    assert_eq!(eval_string(&mut vm, "typeof job.internal"), "undefined");
    assert_eq!(eval_string(&mut vm, "typeof job.name"), "undefined");
}

#[test]
fn bridge_lowercase_aliases() {
    let mut vm = Vm::new();
    vm.set_lowercase_keys(true);
    let mut record = HashMap::new();
    record.insert("Total".to_string(), 3);
    vm.set("rec", record).unwrap();
    assert!(eval_bool(&mut vm, "rec.total === 3 && rec.Total === 3"));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Exported {
    items: Vec<i64>,
    tag: String,
}

#[test]
fn bridge_exports_objects() {
    let mut vm = Vm::new();
    let value = vm.run("({ items: [1, 2, 3], tag: 'ok' })").unwrap();
    let exported: Exported = value.export(&mut vm).unwrap();
    assert_eq!(
        exported,
        Exported {
            items: vec![1, 2, 3],
            tag: "ok".to_string(),
        }
    );

    let n: f64 = vm.run("6 * 7").unwrap().export(&mut vm).unwrap();
    assert_eq!(n, 42.0);
}

#[test]
fn uncaught_throw_surfaces_with_kind_prefix() {
    let mut vm = Vm::new();
    let err = vm.run("undefinedVariable").expect_err("must throw");
    match err {
        Error::Script(e) => {
            assert!(
                e.message.starts_with("ReferenceError:"),
                "unexpected message {}",
                e.message
            );
            assert!(e.value.is_object());
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = vm.run("throw { custom: true }").expect_err("must throw");
    match err {
        Error::Script(e) => assert!(e.value.is_object()),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn parse_errors_collect_positions() {
    let mut vm = Vm::new();
    let err = vm
        .run("var = ;\nvar ok = 1;\nvar = 2;")
        .expect_err("must fail to parse");
    match err {
        Error::Parse(list) => {
            assert!(list.errors.len() >= 2);
            assert_eq!(list.errors[0].line, 1);
            let text = list.to_string();
            assert!(text.starts_with("SyntaxError: (<anonymous>): Line 1:"), "{text}");
            assert!(text.contains("more errors"), "{text}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn compiled_scripts_are_reusable() {
    let mut vm = Vm::new();
    let script = vm
        .compile("counter.js", "var abc; if (!abc) abc = 0; abc += 2; abc;")
        .unwrap();
    assert_eq!(vm.run_script(&script).unwrap().as_f64(), Some(2.0));
    assert_eq!(vm.run_script(&script).unwrap().as_f64(), Some(4.0));
    assert_eq!(vm.run_script(&script).unwrap().as_f64(), Some(6.0));
}

#[test]
fn host_can_swallow_script_throws() {
    let mut vm = Vm::new();
    vm.run("function boom() { throw new TypeError('bad'); }")
        .unwrap();
    vm.set_function("swallow", |mut inv| {
        // the callee throws; the host discards it and reports calm
        let result = inv.call("boom", None, &[]);
        assert!(result.is_err());
        inv.value("calm")
    })
    .unwrap();
    assert_eq!(eval_string(&mut vm, "swallow()"), "calm");
    // the VM stays healthy afterwards
    assert_eq!(eval_number(&mut vm, "1 + 1"), 2.0);
}

#[test]
fn host_errors_become_type_errors_in_script() {
    let mut vm = Vm::new();
    vm.set_function("fail", |_inv| {
        Err(Error::Interrupted)
    })
    .unwrap();
    let result = vm.run("fail()");
    assert!(matches!(result, Err(Error::Interrupted)));

    vm.set_function("fussy", |mut inv| {
        let wanted: Result<i64, Error> = inv.export(&inv.argument(0));
        wanted.map(|_| Value::undefined())
    })
    .unwrap();
    assert_eq!(
        eval_string(
            &mut vm,
            "var got = 'none'; try { fussy(function(){}) } catch (e) { got = e.name } got"
        ),
        "TypeError"
    );
}

#[test]
fn primitive_boxing_and_string_indexing() {
    let mut vm = Vm::new();
    assert_eq!(eval_number(&mut vm, "'hello'.length"), 5.0);
    assert_eq!(eval_string(&mut vm, "'hello'[1]"), "e");
    assert_eq!(eval_string(&mut vm, "new String('abcdefghi').length + ''"), "9");
    assert_eq!(eval_string(&mut vm, "(5.5).toFixed(1)"), "5.5");
    assert_eq!(eval_string(&mut vm, "(255).toString(16)"), "ff");
}

#[test]
fn array_length_truncation() {
    let mut vm = Vm::new();
    let source = r#"
        var a = [1, 2, 3, 4, 5];
        a.length = 2;
        [a.length, a[0], a[1], typeof a[2], a.join()].join('|')
    "#;
    assert_eq!(eval_string(&mut vm, source), "2|1|2|undefined|1,2");
    assert_eq!(
        eval_string(&mut vm, "var b = []; b[4] = 'x'; b.length + ''"),
        "5"
    );
}

#[test]
fn regexp_literals_and_methods() {
    let mut vm = Vm::new();
    assert!(eval_bool(&mut vm, "/ab+c/.test('xabbbcx')"));
    assert!(!eval_bool(&mut vm, "/^q/.test('xq')"));
    assert_eq!(
        eval_string(&mut vm, "'a1b22c'.replace(/[0-9]+/g, '#')"),
        "a#b#c"
    );
    assert_eq!(eval_string(&mut vm, "/x/gi.toString()"), "/x/gi");
    assert_eq!(
        eval_string(&mut vm, "var m = /(\\w+)@(\\w+)/.exec('to bob@host'); m[1] + ':' + m[2]"),
        "bob:host"
    );
}

#[test]
fn hoisting_and_shadowing() {
    let mut vm = Vm::new();
    assert_eq!(
        eval_string(&mut vm, "typeof later; var later = 1; typeof later"),
        "number"
    );
    assert_eq!(eval_number(&mut vm, "hoisted(); function hoisted() { return 2; } hoisted()"), 2.0);
    // var declarations are visible before their statement runs
    assert_eq!(
        eval_string(
            &mut vm,
            "(function(){ var seen = typeof x; var x = 1; return seen; })()"
        ),
        "undefined"
    );
}

#[test]
fn global_var_is_non_configurable() {
    let mut vm = Vm::new();
    assert!(!eval_bool(&mut vm, "var fixed = 1; delete fixed"));
    assert!(eval_bool(&mut vm, "loose = 1; delete loose"));
}
