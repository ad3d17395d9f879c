//! End-to-end scenarios from spec.md §8's "Concrete scenarios" and
//! "Invariants" lists, run through the full parse/compile/run pipeline the
//! same way `apex-cli`'s batch mode does.

use apex::{compile, Interner, Parser, Registry, Value, Vm};

/// Parses, compiles, and runs `src`, returning both the result `Value` and a
/// `Vm` that is still alive (so `Str`/`Arr` results can be rendered through
/// the same heap/interner that produced them).
fn run_vm(src: &str, argv: &[String]) -> (Value, Vm) {
    let mut interner = Interner::new();
    let result = Parser::new(src, "<test>", &mut interner, false).parse();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let output = compile(&result.program, &mut interner).unwrap_or_else(|errs| panic!("{errs:?}"));
    let mut vm = Vm::new(output, interner, Registry::with_builtins());
    vm.set_program_args(argv);
    let value = vm.run().unwrap_or_else(|err| panic!("{err}"));
    (value, vm)
}

fn run(src: &str) -> Value {
    run_vm(src, &[]).0
}

/// Renders a result the way `io:print` would, resolving `Str`/`Arr` payloads
/// through the `Vm` that produced them.
fn display(src: &str) -> String {
    let (value, vm) = run_vm(src, &[]);
    value.display_string(vm.heap(), vm.interner())
}

#[test]
fn arithmetic_and_mixed_types() {
    assert_eq!(display("return 1 + 2.0 * 3;"), "7");
}

#[test]
fn foreach_with_key_and_value() {
    assert_eq!(
        display(
            r#"
            a = [10, 20, "x" => 30];
            ks = array:keys(a);
            vs = array:values(a);
            return array:join(ks, ",") + "|" + array:join(vs, ",");
            "#,
        ),
        "0,1,x|10,20,30"
    );
}

#[test]
fn foreach_binds_key_and_value_in_body() {
    assert_eq!(
        display(
            r#"
            a = [10, 20, "x" => 30];
            out = [];
            foreach (k, val in a) {
                array:push(out, k);
                array:push(out, val);
            }
            return array:join(out, ",");
            "#,
        ),
        "0,10,1,20,x,30"
    );
}

#[test]
fn variadic_sum() {
    let v = run("fn sum(*xs) { s = 0; foreach (v in xs) { s += v; } return s; } return sum(1,2,3,4);");
    assert_eq!(v, Value::Int(10));
}

#[test]
fn object_construction_with_method_and_independent_instances() {
    let v = run(
        r"
        Point { x = 0, y = 0 }
        fn Point.new(a, b) { this.x = a; this.y = b; }
        fn Point.norm2() { return this.x*this.x + this.y*this.y; }
        p = Point.new(3, 4);
        return p.norm2();
        ",
    );
    assert_eq!(v, Value::Int(25));
}

#[test]
fn mutating_an_instance_field_does_not_alter_the_type() {
    let v = run(
        r"
        Point { x = 0, y = 0 }
        p = Point.new();
        p.x = 99;
        q = Point.new();
        return q.x;
        ",
    );
    assert_eq!(v, Value::Int(0));
}

#[test]
fn string_identity_via_interning() {
    let v = run(r#"return "ab" == "a" + "b";"#);
    assert_eq!(v, Value::Bool(true));
}

#[test]
fn switch_with_default() {
    assert_eq!(
        display(
            r#"
            fn f(n) { switch (n) { case 1: return "one"; case 2: return "two"; default: return "other"; } }
            return f(2) + "," + f(7);
            "#,
        ),
        "two,other"
    );
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let v = run(
        r"
        count = 0;
        i = 0;
        while (i < 3) {
            j = 0;
            while (j < 3) {
                if (j == 1) { break; }
                count += 1;
                j += 1;
            }
            i += 1;
        }
        return count;
        ",
    );
    assert_eq!(v, Value::Int(3));
}

#[test]
fn continue_jumps_to_the_update_step() {
    let v = run(
        r"
        total = 0;
        i = 0;
        while (i < 5) {
            i += 1;
            if (i == 3) { continue; }
            total += i;
        }
        return total;
        ",
    );
    assert_eq!(v, Value::Int(12));
}

#[test]
fn compound_assignment_evaluates_the_target_index_once() {
    let v = run(
        r"
        a = [10, 20, 30];
        i = 0;
        a[i] += 5;
        i = 99;
        return a[0];
        ",
    );
    assert_eq!(v, Value::Int(15));
}

#[test]
fn fixed_arity_mismatch_is_a_runtime_error() {
    let result = apex::run_script("fn f(a,b) { return a+b; } f(1);", "<test>", &[]);
    assert!(result.is_err());
}

#[test]
fn program_args_are_exposed_as_an_array() {
    let argv = vec!["script.ap".to_owned(), "hello".to_owned()];
    let (value, vm) = run_vm("return @args[1];", &argv);
    assert_eq!(value.display_string(vm.heap(), vm.interner()), "hello");
}
