use vm_js6::eval;
use vm_js6::eval_with;
use vm_js6::parse;
use vm_js6::parse_with_info;
use vm_js6::EvalErrorKind;
use vm_js6::EvalOpts;
use vm_js6::JsValue;
use vm_js6::LimitKind;
use vm_js6::ScriptInfo;

#[test]
fn syntax_errors_carry_line_and_column() {
  let err = parse("let x = ;").unwrap_err();
  assert_eq!(err.line, 1);
  assert!(err.column > 1);
  let rendered = err.to_string();
  assert!(
    rendered.starts_with(&format!("[line: 1, column: {}]", err.column)),
    "unexpected format: {rendered}"
  );
}

#[test]
fn syntax_error_position_tracks_lines() {
  let err = parse("let a = 1;\nlet b = ;\n").unwrap_err();
  assert_eq!(err.line, 2);
}

#[test]
fn regex_literals_are_syntax_errors() {
  let err = parse("/a/.test('a')").unwrap_err();
  assert!(err.message.contains("regular expressions are not supported"));
}

#[test]
fn null_property_access_reports_exact_message() {
  let err = eval("let o = null; o.x").unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Runtime);
  assert_eq!(err.message, "Type NULL has no properties");

  let err = eval("let u = undefined; u.x").unwrap_err();
  assert_eq!(err.message, "Type UNDEFINED has no properties");
}

#[test]
fn uncaught_error_carries_bottom_up_call_stack() {
  let source = "\nfunction a(foo){foo.x=1}\n\n\nfunction b(x){\na(x)\n}\n\nb(null)";
  let script = parse_with_info(source, ScriptInfo::new("my-script.js")).unwrap();
  let err = script.eval().unwrap_err();

  assert_eq!(err.message, "Type NULL has no properties");
  let frames: Vec<String> = err.stack.iter().map(|f| f.to_string()).collect();
  assert_eq!(frames, vec![
    "foo.x = 1 (my-script.js:2)",
    "a(x) (my-script.js:6)",
    "b(null) (my-script.js:9)",
  ]);

  let rendered = err.to_string();
  assert!(rendered.starts_with("Type NULL has no properties\n"));
  assert!(rendered.contains("a(x) (my-script.js:6)"));
}

#[test]
fn script_throws_are_catchable() {
  assert_eq!(
    eval("try { throw 'boom'; } catch (e) { e }").unwrap(),
    JsValue::Str("boom".to_string())
  );
  assert_eq!(
    eval("try { null.x } catch (e) { e.message }").unwrap(),
    JsValue::Str("Type NULL has no properties".to_string())
  );
  assert_eq!(
    eval("try { missing() } catch (e) { e.name }").unwrap(),
    JsValue::Str("ReferenceError".to_string())
  );
}

#[test]
fn uncaught_throw_of_plain_value() {
  let err = eval("throw 42;").unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Runtime);
  assert_eq!(err.message, "42");
}

#[test]
fn error_shaped_throws_render_name_and_message() {
  let err = eval("throw {name: 'CustomError', message: 'details'};").unwrap_err();
  assert_eq!(err.message, "CustomError: details");
}

#[test]
fn finally_runs_after_throw_and_return() {
  assert_eq!(
    eval(
      "let log = [];\n\
       function f() {\n\
         try { return 'ret'; } finally { log.push('finally'); }\n\
       }\n\
       f() + ':' + log.join(',')"
    )
    .unwrap(),
    JsValue::Str("ret:finally".to_string())
  );

  assert_eq!(
    eval(
      "let log = [];\n\
       try {\n\
         try { throw 'x'; } finally { log.push('inner'); }\n\
       } catch (e) { log.push('caught'); }\n\
       log.join(',')"
    )
    .unwrap(),
    JsValue::Str("inner,caught".to_string())
  );
}

#[test]
fn limit_faults_skip_finally_and_cannot_be_caught() {
  let opts = EvalOpts {
    max_ops: 5_000,
    ..EvalOpts::default()
  };
  let err = eval_with(
    "let reached = false;\n\
     try {\n\
       while (true) { }\n\
     } catch (e) { reached = true; } finally { reached = true; }\n\
     reached",
    opts,
  )
  .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Ops));
}

#[test]
fn rethrow_from_catch_propagates() {
  let err = eval("try { throw 'original'; } catch (e) { throw 'rewrapped'; }").unwrap_err();
  assert_eq!(err.message, "rewrapped");
}

#[test]
fn tdz_and_const_violations_are_reference_and_type_errors() {
  let err = eval("{ x; let x = 1; }").unwrap_err();
  assert_eq!(err.message, "Cannot access 'x' before initialization");

  let err = eval("const c = 1; c = 2;").unwrap_err();
  assert_eq!(err.message, "Assignment to constant variable.");

  let err = eval("missing").unwrap_err();
  assert_eq!(err.message, "missing is not defined");
}

#[test]
fn new_regexp_is_a_runtime_error() {
  let err = eval("new RegExp('a')").unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Runtime);
  assert!(err.message.contains("Regular expressions are not supported"));

  let err = eval("'x'.match('x')").unwrap_err();
  assert!(err.message.contains("Regular expressions are not supported"));
}

#[test]
fn calling_a_non_function_is_a_type_error() {
  let err = eval("let x = 1; x()").unwrap_err();
  assert!(err.message.contains("is not a function"));

  let err = eval("let o = {}; o.m()").unwrap_err();
  assert_eq!(err.message, "m is not a function");
}
