use vm_js6::eval;
use vm_js6::JsValue;

fn str(s: &str) -> JsValue {
  JsValue::Str(s.to_string())
}

#[test]
fn string_length_and_indexing_use_utf16_units() {
  assert_eq!(eval("'abc'.length").unwrap(), JsValue::Int(3));
  assert_eq!(eval("'abc'[1]").unwrap(), str("b"));
  assert_eq!(eval("'a\\u{1F600}'.length").unwrap(), JsValue::Int(3));
  assert_eq!(eval("'abc'.charAt(2)").unwrap(), str("c"));
  assert_eq!(eval("'abc'.charAt(9)").unwrap(), str(""));
  assert_eq!(eval("'abc'.charCodeAt(0)").unwrap(), JsValue::Int(97));
  assert_eq!(eval("'' + 'abc'.charCodeAt(9)").unwrap(), str("NaN"));
}

#[test]
fn case_trim_and_repeat() {
  assert_eq!(eval("'aBc'.toUpperCase()").unwrap(), str("ABC"));
  assert_eq!(eval("'aBc'.toLowerCase()").unwrap(), str("abc"));
  assert_eq!(eval("'  x  '.trim()").unwrap(), str("x"));
  assert_eq!(eval("'  x'.trimStart() + '|'").unwrap(), str("x|"));
  assert_eq!(eval("'x  '.trimEnd() + '|'").unwrap(), str("x|"));
  assert_eq!(eval("'ab'.repeat(3)").unwrap(), str("ababab"));
  assert_eq!(eval("'ab'.repeat(0)").unwrap(), str(""));
}

#[test]
fn slice_and_substring() {
  assert_eq!(eval("'hello'.slice(1, 3)").unwrap(), str("el"));
  assert_eq!(eval("'hello'.slice(-2)").unwrap(), str("lo"));
  assert_eq!(eval("'hello'.substring(3, 1)").unwrap(), str("el"));
  assert_eq!(eval("'hello'.substring(-5, 2)").unwrap(), str("he"));
}

#[test]
fn search_and_affix_predicates() {
  assert_eq!(eval("'banana'.indexOf('na')").unwrap(), JsValue::Int(2));
  assert_eq!(eval("'banana'.lastIndexOf('na')").unwrap(), JsValue::Int(4));
  assert_eq!(eval("'banana'.indexOf('q')").unwrap(), JsValue::Int(-1));
  assert_eq!(eval("'banana'.includes('nan')").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("'banana'.startsWith('ba')").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("'banana'.endsWith('na')").unwrap(), JsValue::Bool(true));
}

#[test]
fn split_replace_pad_concat() {
  assert_eq!(eval("'a,b,c'.split(',').length").unwrap(), JsValue::Int(3));
  assert_eq!(eval("'abc'.split('').join('-')").unwrap(), str("a-b-c"));
  assert_eq!(eval("'abc'.split(undefined).length").unwrap(), JsValue::Int(1));
  // String search patterns replace the first occurrence only.
  assert_eq!(eval("'aXbX'.replace('X', '_')").unwrap(), str("a_bX"));
  assert_eq!(eval("'5'.padStart(3, '0')").unwrap(), str("005"));
  assert_eq!(eval("'5'.padEnd(3, '.')").unwrap(), str("5.."));
  assert_eq!(eval("'a'.concat('b', 1)").unwrap(), str("ab1"));
  assert_eq!(eval("String.fromCharCode(104, 105)").unwrap(), str("hi"));
}

#[test]
fn conversion_functions() {
  assert_eq!(eval("String(12)").unwrap(), str("12"));
  assert_eq!(eval("Number('0x10')").unwrap(), JsValue::Int(16));
  assert_eq!(eval("'' + Number('bogus')").unwrap(), str("NaN"));
  assert_eq!(eval("Boolean('')").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("Boolean('x')").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("parseInt('42px')").unwrap(), JsValue::Int(42));
  assert_eq!(eval("parseInt('ff', 16)").unwrap(), JsValue::Int(255));
  assert_eq!(eval("parseInt('0x1f')").unwrap(), JsValue::Int(31));
  assert_eq!(eval("'' + parseInt('zz')").unwrap(), str("NaN"));
  assert_eq!(eval("parseFloat('3.5rem')").unwrap(), JsValue::Float(3.5));
  assert_eq!(eval("isNaN('not a number')").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("isFinite('12')").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("isFinite(1/0)").unwrap(), JsValue::Bool(false));
}

#[test]
fn number_namespace_and_methods() {
  assert_eq!(
    eval("Number.MAX_SAFE_INTEGER").unwrap(),
    JsValue::Int(9_007_199_254_740_991)
  );
  assert_eq!(eval("Number.isInteger(4)").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("Number.isInteger(4.5)").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("Number.isInteger('4')").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("Number.isNaN(0/0)").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("(1.005).toFixed(2)").unwrap(), str("1.00"));
  assert_eq!(eval("(255).toString(16)").unwrap(), str("ff"));
  assert_eq!(eval("(6).toString(2)").unwrap(), str("110"));
}

#[test]
fn math_constants_and_functions() {
  assert_eq!(eval("Math.abs(-4)").unwrap(), JsValue::Int(4));
  assert_eq!(eval("Math.floor(2.9)").unwrap(), JsValue::Int(2));
  assert_eq!(eval("Math.ceil(2.1)").unwrap(), JsValue::Int(3));
  assert_eq!(eval("Math.round(2.5)").unwrap(), JsValue::Int(3));
  assert_eq!(eval("Math.round(-2.5)").unwrap(), JsValue::Int(-2));
  assert_eq!(eval("Math.trunc(-2.7)").unwrap(), JsValue::Int(-2));
  assert_eq!(eval("Math.sign(-9)").unwrap(), JsValue::Int(-1));
  assert_eq!(eval("Math.max(1, 9, 4)").unwrap(), JsValue::Int(9));
  assert_eq!(eval("Math.min(1, 9, 4)").unwrap(), JsValue::Int(1));
  assert_eq!(eval("Math.pow(2, 10)").unwrap(), JsValue::Int(1024));
  assert_eq!(eval("Math.sqrt(81)").unwrap(), JsValue::Int(9));
  assert_eq!(eval("Math.hypot(3, 4)").unwrap(), JsValue::Int(5));
  assert_eq!(eval("Math.floor(Math.PI)").unwrap(), JsValue::Int(3));
  assert_eq!(
    eval("let r = Math.random(); r >= 0 && r < 1").unwrap(),
    JsValue::Bool(true)
  );
}

#[test]
fn dates_expose_utc_components() {
  assert_eq!(
    eval("new Date(0).toISOString()").unwrap(),
    str("1970-01-01T00:00:00.000Z")
  );
  assert_eq!(eval("new Date(86400000).getDate()").unwrap(), JsValue::Int(2));
  assert_eq!(
    eval("let d = new Date(2024, 0, 15); d.getFullYear() + ':' + d.getMonth() + ':' + d.getDate()")
      .unwrap(),
    str("2024:0:15")
  );
  assert_eq!(
    eval("new Date('2024-06-01T12:30:00Z').getHours()").unwrap(),
    JsValue::Int(12)
  );
  assert_eq!(eval("new Date(1234).getTime()").unwrap(), JsValue::Int(1234));
  assert_eq!(eval("new Date(1234).valueOf()").unwrap(), JsValue::Int(1234));
  assert_eq!(
    eval("typeof Date.now()").unwrap(),
    str("number")
  );
  assert_eq!(
    eval("Date.now() - Date.now() <= 0").unwrap(),
    JsValue::Bool(true)
  );
  assert_eq!(eval("'' + new Date('garbage').getTime()").unwrap(), str("NaN"));
}

#[test]
fn string_regex_flavored_methods_are_rejected() {
  for source in ["'x'.match('x')", "'x'.search('x')"] {
    let err = eval(source).unwrap_err();
    assert!(
      err.message.contains("Regular expressions are not supported"),
      "unexpected message for {source}: {}",
      err.message
    );
  }
}
