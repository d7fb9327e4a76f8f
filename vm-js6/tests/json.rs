use vm_js6::eval;
use vm_js6::JsValue;

fn str(s: &str) -> JsValue {
  JsValue::Str(s.to_string())
}

#[test]
fn parses_scalars_arrays_and_objects() {
  assert_eq!(eval("JSON.parse('1.5')").unwrap(), JsValue::Float(1.5));
  assert_eq!(eval("JSON.parse('\"x\"')").unwrap(), str("x"));
  assert_eq!(eval("JSON.parse('true')").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("JSON.parse('null')").unwrap(), JsValue::Null);
  assert_eq!(
    eval("JSON.parse('[1, 2, 3]').join(',')").unwrap(),
    str("1,2,3")
  );
  assert_eq!(
    eval("JSON.parse('{\"a\": {\"b\": [1]}}').a.b[0]").unwrap(),
    JsValue::Int(1)
  );
}

#[test]
fn parse_preserves_key_order() {
  assert_eq!(
    eval("Object.keys(JSON.parse('{\"z\": 1, \"a\": 2}')).join(',')").unwrap(),
    str("z,a")
  );
}

#[test]
fn malformed_json_throws_catchable_syntax_error() {
  assert_eq!(
    eval("try { JSON.parse('{bad'); } catch (e) { e.name }").unwrap(),
    str("SyntaxError")
  );
}

#[test]
fn stringifies_values() {
  assert_eq!(eval("JSON.stringify(1)").unwrap(), str("1"));
  assert_eq!(eval("JSON.stringify('x')").unwrap(), str("\"x\""));
  assert_eq!(eval("JSON.stringify(null)").unwrap(), str("null"));
  assert_eq!(eval("JSON.stringify([1, 'a', true])").unwrap(), str("[1,\"a\",true]"));
  assert_eq!(
    eval("JSON.stringify({a: 1, b: [2, 3]})").unwrap(),
    str("{\"a\":1,\"b\":[2,3]}")
  );
  assert_eq!(eval("typeof JSON.stringify(undefined)").unwrap(), str("undefined"));
  // Unserializable values are elided from objects and nulled in arrays.
  assert_eq!(
    eval("JSON.stringify({f: function () {}, a: 1})").unwrap(),
    str("{\"a\":1}")
  );
  assert_eq!(
    eval("JSON.stringify([undefined, function () {}])").unwrap(),
    str("[null,null]")
  );
  assert_eq!(eval("JSON.stringify({n: 0/0})").unwrap(), str("{\"n\":null}"));
}

#[test]
fn stringify_escapes_strings() {
  assert_eq!(
    eval("JSON.stringify('a\\\\b\\n\"c\"')").unwrap(),
    str("\"a\\\\b\\n\\\"c\\\"\"")
  );
}

#[test]
fn stringify_supports_indentation() {
  assert_eq!(
    eval("JSON.stringify({a: [1]}, null, 2)").unwrap(),
    str("{\n  \"a\": [\n    1\n  ]\n}")
  );
}

#[test]
fn circular_structures_are_type_errors() {
  assert_eq!(
    eval("let o = {}; o.self = o; try { JSON.stringify(o); } catch (e) { e.name }").unwrap(),
    str("TypeError")
  );
}

#[test]
fn round_trip_preserves_structure() {
  let source = "\
    let v = {num: 1.5, s: 'txt', flag: true, none: null, list: [1, 'two', {deep: []}]};\n\
    let round = JSON.parse(JSON.stringify(v));\n\
    JSON.stringify(round) === JSON.stringify(v)";
  assert_eq!(eval(source).unwrap(), JsValue::Bool(true));
}

#[test]
fn dates_stringify_as_iso_strings() {
  assert_eq!(
    eval("JSON.stringify({t: new Date(0)})").unwrap(),
    str("{\"t\":\"1970-01-01T00:00:00.000Z\"}")
  );
}
