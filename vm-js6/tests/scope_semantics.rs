use vm_js6::eval;
use vm_js6::JsValue;

fn str(s: &str) -> JsValue {
  JsValue::Str(s.to_string())
}

#[test]
fn var_hoists_to_function_scope() {
  assert_eq!(
    eval("function f() { if (true) { var x = 1; } return x; } f()").unwrap(),
    JsValue::Int(1)
  );
  assert_eq!(eval("'' + v; var v = 3;").unwrap(), str("undefined"));
}

#[test]
fn function_declarations_hoist_with_their_value() {
  assert_eq!(eval("f(); function f() { return 7; }").unwrap(), JsValue::Int(7));
}

#[test]
fn let_is_block_scoped() {
  assert_eq!(
    eval("let x = 'outer'; { let x = 'inner'; } x").unwrap(),
    str("outer")
  );
  let err = eval("{ let y = 1; } y").unwrap_err();
  assert_eq!(err.message, "y is not defined");
}

#[test]
fn closures_capture_the_environment_not_a_snapshot() {
  assert_eq!(
    eval(
      "function counter() {\n\
         let n = 0;\n\
         return function () { n = n + 1; return n; };\n\
       }\n\
       let next = counter();\n\
       next(); next(); next()"
    )
    .unwrap(),
    JsValue::Int(3)
  );
}

#[test]
fn sibling_closures_share_one_frame() {
  assert_eq!(
    eval(
      "function make() {\n\
         let n = 0;\n\
         return {inc: function () { n += 1; }, get: function () { return n; }};\n\
       }\n\
       let c = make();\n\
       c.inc(); c.inc(); c.get()"
    )
    .unwrap(),
    JsValue::Int(2)
  );
}

#[test]
fn for_let_iterations_get_fresh_bindings() {
  assert_eq!(
    eval(
      "let fns = [];\n\
       for (let i = 0; i < 3; i++) { fns.push(() => i); }\n\
       fns.map(f => f()).join(',')"
    )
    .unwrap(),
    str("0,1,2")
  );
  // Mutations in the body are visible to the update expression.
  assert_eq!(
    eval("let s = ''; for (let i = 0; i < 10; i++) { s += i; i += 1; } s").unwrap(),
    str("02468")
  );
  // `var` loop bindings keep the shared-binding behavior.
  assert_eq!(
    eval(
      "let fns = [];\n\
       for (var v = 0; v < 3; v++) { fns.push(function () { return v; }); }\n\
       fns.map(f => f()).join(',')"
    )
    .unwrap(),
    str("3,3,3")
  );
}

#[test]
fn for_of_iterations_get_fresh_bindings() {
  assert_eq!(
    eval(
      "let fns = [];\n\
       for (const v of [1, 2, 3]) { fns.push(function () { return v; }); }\n\
       fns.map(function (f) { return f(); }).join(',')"
    )
    .unwrap(),
    str("1,2,3")
  );
}

#[test]
fn default_parameters_and_rest() {
  assert_eq!(
    eval("function f(a, b = a + 1) { return a + b; } f(2)").unwrap(),
    JsValue::Int(5)
  );
  assert_eq!(
    eval("function f(first, ...rest) { return first + ':' + rest.join(','); } f(1, 2, 3)").unwrap(),
    str("1:2,3")
  );
  assert_eq!(
    eval("function f(a, b) { return '' + b; } f(1)").unwrap(),
    str("undefined")
  );
}

#[test]
fn destructuring_bindings() {
  assert_eq!(
    eval("let [a, , b = 9, ...rest] = [1, 2, undefined, 4, 5]; a + ':' + b + ':' + rest.join(',')")
      .unwrap(),
    str("1:9:4,5")
  );
  assert_eq!(
    eval("let {x, y: {z}, w = 4} = {x: 1, y: {z: 2}}; x + z + w").unwrap(),
    JsValue::Int(7)
  );
  assert_eq!(
    eval("function dist({x, y}) { return Math.sqrt(x * x + y * y); } dist({x: 3, y: 4})").unwrap(),
    JsValue::Int(5)
  );
  assert_eq!(eval("let [c1, c2] = 'hi'; c1 + c2").unwrap(), str("hi"));
}

#[test]
fn arrow_functions_are_lexically_transparent() {
  assert_eq!(
    eval(
      "function outer() {\n\
         return (() => this === undefined)();\n\
       }\n\
       outer()"
    )
    .unwrap(),
    JsValue::Bool(true)
  );
  assert_eq!(
    eval(
      "let o = {\n\
         tag: 'obj',\n\
         read() { return (() => this.tag)(); }\n\
       };\n\
       o.read()"
    )
    .unwrap(),
    str("obj")
  );
  assert_eq!(
    eval("function f() { return (() => arguments.length)(); } f(1, 2, 3)").unwrap(),
    JsValue::Int(3)
  );
}

#[test]
fn this_binds_to_the_method_receiver() {
  assert_eq!(
    eval("let o = {n: 41, next() { return this.n + 1; }}; o.next()").unwrap(),
    JsValue::Int(42)
  );
}

#[test]
fn new_constructs_fresh_instances() {
  assert_eq!(
    eval(
      "function Point(x, y) { this.x = x; this.y = y; }\n\
       let p = new Point(3, 4);\n\
       p.x + p.y"
    )
    .unwrap(),
    JsValue::Int(7)
  );
  assert_eq!(
    eval("function F() { return {override: true}; } new F().override").unwrap(),
    JsValue::Bool(true)
  );
  assert_eq!(
    eval("function F() { return 42; } typeof new F()").unwrap(),
    str("object")
  );
}

#[test]
fn arguments_object_reflects_call_arguments() {
  assert_eq!(
    eval("function f() { return arguments.length; } f('a', 'b')").unwrap(),
    JsValue::Int(2)
  );
  assert_eq!(
    eval("function f(a) { return arguments[1]; } f(1, 'second')").unwrap(),
    str("second")
  );
}

#[test]
fn for_loops_and_labels() {
  assert_eq!(
    eval("let s = 0; for (let i = 1; i <= 4; i++) { s += i; } s").unwrap(),
    JsValue::Int(10)
  );
  assert_eq!(
    eval("let s = 0; for (const n of [1, 2, 3]) { s += n; } s").unwrap(),
    JsValue::Int(6)
  );
  assert_eq!(
    eval("let keys = []; for (const k in {a: 1, b: 2}) { keys.push(k); } keys.join(',')").unwrap(),
    str("a,b")
  );
  assert_eq!(
    eval(
      "let hits = 0;\n\
       outer: for (let i = 0; i < 3; i++) {\n\
         for (let j = 0; j < 3; j++) {\n\
           if (j > i) { continue outer; }\n\
           if (i === 2 && j === 1) { break outer; }\n\
           hits++;\n\
         }\n\
       }\n\
       hits"
    )
    .unwrap(),
    JsValue::Int(4)
  );
}

#[test]
fn while_do_while_and_break() {
  assert_eq!(
    eval("let n = 0; while (n < 5) { n++; if (n === 3) { break; } } n").unwrap(),
    JsValue::Int(3)
  );
  assert_eq!(
    eval("let n = 0; do { n++; } while (n < 3)\nn").unwrap(),
    JsValue::Int(3)
  );
}

#[test]
fn switch_matches_strictly_and_falls_through() {
  let source = "\
    function classify(v) {\n\
      let out = [];\n\
      switch (v) {\n\
        case 1:\n\
          out.push('one');\n\
        case 2:\n\
          out.push('two');\n\
          break;\n\
        case '1':\n\
          out.push('string');\n\
          break;\n\
        default:\n\
          out.push('other');\n\
      }\n\
      return out.join(',');\n\
    }\n\
    classify(1) + '|' + classify('1') + '|' + classify(9)";
  assert_eq!(eval(source).unwrap(), str("one,two|string|other"));
}

#[test]
fn for_in_over_arrays_yields_indices() {
  assert_eq!(
    eval("let keys = []; for (const k in ['a', 'b']) { keys.push(k); } keys.join(',')").unwrap(),
    str("0,1")
  );
}

#[test]
fn delete_removes_properties() {
  assert_eq!(
    eval("let o = {a: 1, b: 2}; delete o.a; Object.keys(o).join(',')").unwrap(),
    str("b")
  );
  assert_eq!(
    eval("let a = [1, 2, 3]; delete a[1]; a.length + ':' + ('' + a[1])").unwrap(),
    str("3:undefined")
  );
  assert_eq!(eval("'a' in {a: 1}").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("'q' in {a: 1}").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("1 in ['x', 'y']").unwrap(), JsValue::Bool(true));
}

#[test]
fn computed_object_keys_and_shorthand() {
  assert_eq!(
    eval("let k = 'dyn'; let v = 5; let o = {[k + '1']: 2, v}; o.dyn1 + o.v").unwrap(),
    JsValue::Int(7)
  );
}

#[test]
fn spread_in_calls() {
  assert_eq!(
    eval("function add3(a, b, c) { return a + b + c; } add3(...[1, 2, 3])").unwrap(),
    JsValue::Int(6)
  );
  assert_eq!(eval("Math.max(...[3, 1, 4])").unwrap(), JsValue::Int(4));
}
