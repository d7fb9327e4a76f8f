use vm_js6::eval;
use vm_js6::eval_with;
use vm_js6::parse;
use vm_js6::EvalOpts;
use vm_js6::JsValue;

#[test]
fn evaluates_arithmetic() {
  assert_eq!(eval("20 + 30").unwrap(), JsValue::Int(50));
  assert_eq!(eval("7 / 2").unwrap(), JsValue::Float(3.5));
  assert_eq!(eval("10 % 3").unwrap(), JsValue::Int(1));
  assert_eq!(eval("2 * 3 + 4").unwrap(), JsValue::Int(10));
  assert_eq!(eval("-(5)").unwrap(), JsValue::Int(-5));
}

#[test]
fn reports_stats_for_trivial_scripts() {
  let script = parse("20 + 30").unwrap();
  let evaluation = script.eval_with_details(EvalOpts::default()).unwrap();
  assert_eq!(evaluation.value, JsValue::Int(50));
  assert!(evaluation.stats.ops > 0);
  assert!(evaluation.stats.mem_bytes > 0);
}

#[test]
fn result_is_the_last_statement_value() {
  assert_eq!(eval("let x = 1; ++x").unwrap(), JsValue::Int(2));
  assert_eq!(eval("1; if (true) {}").unwrap(), JsValue::Int(1));
  assert_eq!(eval("let a = 5;").unwrap(), JsValue::Undefined);
}

#[test]
fn repeated_eval_of_one_parse_is_deterministic() {
  let script = parse("let x = 1; ++x").unwrap();
  let first = script.eval_with_details(EvalOpts::default()).unwrap();
  let second = script.eval_with_details(EvalOpts::default()).unwrap();
  assert_eq!(first.value, JsValue::Int(2));
  assert_eq!(second.value, JsValue::Int(2));
  assert_eq!(first.stats, second.stats);
}

#[test]
fn custom_globals_are_visible() {
  let opts = EvalOpts {
    custom_globals: vec![
      ("X".to_string(), JsValue::Int(100)),
      ("Y".to_string(), JsValue::Int(200)),
    ],
    ..EvalOpts::default()
  };
  assert_eq!(eval_with("X + Y", opts).unwrap(), JsValue::Int(300));
}

#[test]
fn string_concatenation_dispatch() {
  assert_eq!(eval("'a' + 'b'").unwrap(), JsValue::Str("ab".to_string()));
  assert_eq!(eval("1 + '2'").unwrap(), JsValue::Str("12".to_string()));
  assert_eq!(eval("'' + 1.5").unwrap(), JsValue::Str("1.5".to_string()));
  assert_eq!(eval("'' + null").unwrap(), JsValue::Str("null".to_string()));
  assert_eq!(
    eval("'' + undefined").unwrap(),
    JsValue::Str("undefined".to_string())
  );
  assert_eq!(eval("'' + [1, 2]").unwrap(), JsValue::Str("1,2".to_string()));
  assert_eq!(
    eval("'' + {}").unwrap(),
    JsValue::Str("[object Object]".to_string())
  );
}

#[test]
fn equality_semantics() {
  assert_eq!(eval("1 == '1'").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("1 === '1'").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("null == undefined").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("null === undefined").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("NaN === NaN").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("true == 1").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("({}) === ({})").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("let o = {}; o === o").unwrap(), JsValue::Bool(true));
}

#[test]
fn number_formatting_follows_to_string() {
  assert_eq!(eval("'' + 0.1").unwrap(), JsValue::Str("0.1".to_string()));
  assert_eq!(
    eval("'' + 1e21").unwrap(),
    JsValue::Str("1e+21".to_string())
  );
  assert_eq!(
    eval("'' + 0.0000001").unwrap(),
    JsValue::Str("1e-7".to_string())
  );
  assert_eq!(eval("'' + (0/0)").unwrap(), JsValue::Str("NaN".to_string()));
  assert_eq!(
    eval("'' + (1/0)").unwrap(),
    JsValue::Str("Infinity".to_string())
  );
}

#[test]
fn typeof_reports_value_kinds() {
  assert_eq!(eval("typeof 1").unwrap(), JsValue::Str("number".to_string()));
  assert_eq!(eval("typeof 'x'").unwrap(), JsValue::Str("string".to_string()));
  assert_eq!(eval("typeof true").unwrap(), JsValue::Str("boolean".to_string()));
  assert_eq!(eval("typeof {}").unwrap(), JsValue::Str("object".to_string()));
  assert_eq!(eval("typeof null").unwrap(), JsValue::Str("object".to_string()));
  assert_eq!(
    eval("typeof undefined").unwrap(),
    JsValue::Str("undefined".to_string())
  );
  assert_eq!(
    eval("typeof function () {}").unwrap(),
    JsValue::Str("function".to_string())
  );
  // Unresolved identifiers do not throw under typeof.
  assert_eq!(
    eval("typeof missing").unwrap(),
    JsValue::Str("undefined".to_string())
  );
}

#[test]
fn template_literals_interpolate() {
  assert_eq!(
    eval("let name = 'world'; `hello ${name}!`").unwrap(),
    JsValue::Str("hello world!".to_string())
  );
  assert_eq!(
    eval("`${1 + 2} and ${'x'}`").unwrap(),
    JsValue::Str("3 and x".to_string())
  );
}

#[test]
fn conditional_and_logical_operators() {
  assert_eq!(eval("true ? 1 : 2").unwrap(), JsValue::Int(1));
  assert_eq!(eval("0 || 'fallback'").unwrap(), JsValue::Str("fallback".to_string()));
  assert_eq!(eval("1 && 2").unwrap(), JsValue::Int(2));
  assert_eq!(eval("0 && 2").unwrap(), JsValue::Int(0));
}

#[test]
fn bitwise_and_shift_operators() {
  assert_eq!(eval("5 & 3").unwrap(), JsValue::Int(1));
  assert_eq!(eval("5 | 3").unwrap(), JsValue::Int(7));
  assert_eq!(eval("5 ^ 3").unwrap(), JsValue::Int(6));
  assert_eq!(eval("~5").unwrap(), JsValue::Int(-6));
  assert_eq!(eval("1 << 4").unwrap(), JsValue::Int(16));
  assert_eq!(eval("-8 >> 1").unwrap(), JsValue::Int(-4));
  assert_eq!(eval("-1 >>> 28").unwrap(), JsValue::Int(15));
}

#[test]
fn comma_and_compound_assignment() {
  assert_eq!(eval("let a = (1, 2); a").unwrap(), JsValue::Int(2));
  assert_eq!(eval("let x = 10; x += 5; x -= 1; x *= 2; x").unwrap(), JsValue::Int(28));
  assert_eq!(eval("let s = 'a'; s += 'b'; s").unwrap(), JsValue::Str("ab".to_string()));
}

#[test]
fn numeric_literal_radixes() {
  assert_eq!(eval("0xff").unwrap(), JsValue::Int(255));
  assert_eq!(eval("0b101").unwrap(), JsValue::Int(5));
  assert_eq!(eval("0o17").unwrap(), JsValue::Int(15));
  assert_eq!(eval("1.5e2").unwrap(), JsValue::Int(150));
}
