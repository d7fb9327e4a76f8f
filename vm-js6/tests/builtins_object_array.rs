use vm_js6::eval;
use vm_js6::JsValue;

fn str(s: &str) -> JsValue {
  JsValue::Str(s.to_string())
}

#[test]
fn object_keys_values_entries() {
  assert_eq!(
    eval("Object.keys({b: 1, a: 2}).join(',')").unwrap(),
    str("b,a")
  );
  assert_eq!(
    eval("Object.values({b: 1, a: 2}).join(',')").unwrap(),
    str("1,2")
  );
  assert_eq!(
    eval("Object.entries({x: 1}).map(function (e) { return e[0] + '=' + e[1]; }).join(';')")
      .unwrap(),
    str("x=1")
  );
}

#[test]
fn enumeration_orders_integer_keys_first() {
  assert_eq!(
    eval("Object.keys({b: 1, 2: 'two', a: 3, 0: 'zero'}).join(',')").unwrap(),
    str("0,2,b,a")
  );
}

#[test]
fn object_assign_copies_own_properties() {
  assert_eq!(
    eval("let t = {a: 1}; Object.assign(t, {b: 2}, {a: 3}); t.a + ':' + t.b").unwrap(),
    str("3:2")
  );
}

#[test]
fn object_freeze_blocks_writes() {
  assert_eq!(
    eval("let o = {a: 1}; Object.freeze(o); Object.isFrozen(o)").unwrap(),
    JsValue::Bool(true)
  );
  let err = eval("let o = Object.freeze({a: 1}); o.a = 2;").unwrap_err();
  assert!(err.message.contains("read only"));
  assert_eq!(eval("Object.isFrozen(1)").unwrap(), JsValue::Bool(true));
}

#[test]
fn array_literals_and_length() {
  assert_eq!(eval("[1, 2, 3].length").unwrap(), JsValue::Int(3));
  assert_eq!(eval("let a = [1, , 3]; '' + a[1]").unwrap(), str("undefined"));
  assert_eq!(eval("[...[1, 2], 3].join('-')").unwrap(), str("1-2-3"));
}

#[test]
fn indexed_writes_reify_length_with_holes() {
  assert_eq!(
    eval("let a = []; a[4] = 'x'; a.length + ':' + ('' + a[2])").unwrap(),
    str("5:undefined")
  );
  assert_eq!(eval("let a = [1, 2, 3]; a.length = 1; a.join(',')").unwrap(), str("1"));
}

#[test]
fn out_of_range_integer_keys_are_string_properties() {
  // Beyond the array-index range, writes become ordinary properties and
  // `length` is untouched.
  assert_eq!(
    eval("let a = [1]; a[1e20] = 'x'; a.length + ':' + a[1e20]").unwrap(),
    str("1:x")
  );
  assert_eq!(eval("let a = []; a[4294967296] = 1; a.length").unwrap(), JsValue::Int(0));
  assert_eq!(
    eval("let a = []; a['4294967295'] = 'edge'; a.length + ':' + a[4294967295]").unwrap(),
    str("0:edge")
  );
  assert_eq!(eval("let a = []; a[-1] = 'neg'; a.length + ':' + a[-1]").unwrap(), str("0:neg"));
  assert_eq!(
    eval("let a = ['first']; a['01'] = 'pad'; a[0] + ':' + ('' + a[1]) + ':' + a['01']").unwrap(),
    str("first:undefined:pad")
  );
}

#[test]
fn push_pop_shift_unshift() {
  assert_eq!(
    eval("let a = [2]; a.push(3); a.unshift(1); a.join(',')").unwrap(),
    str("1,2,3")
  );
  assert_eq!(eval("let a = [1, 2]; a.pop() + ':' + a.length").unwrap(), str("2:1"));
  assert_eq!(eval("let a = [1, 2]; a.shift() + ':' + a.length").unwrap(), str("1:1"));
}

#[test]
fn search_methods() {
  assert_eq!(eval("[1, 2, 3].indexOf(2)").unwrap(), JsValue::Int(1));
  assert_eq!(eval("[1, 2, 3].indexOf(9)").unwrap(), JsValue::Int(-1));
  assert_eq!(eval("[1, 2, 1].lastIndexOf(1)").unwrap(), JsValue::Int(2));
  assert_eq!(eval("[1, NaN].includes(NaN)").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("[1, 2].includes(3)").unwrap(), JsValue::Bool(false));
  assert_eq!(eval("Array.isArray([])").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("Array.isArray('no')").unwrap(), JsValue::Bool(false));
}

#[test]
fn slice_concat_reverse_fill() {
  assert_eq!(eval("[1, 2, 3, 4].slice(1, 3).join(',')").unwrap(), str("2,3"));
  assert_eq!(eval("[1, 2, 3].slice(-2).join(',')").unwrap(), str("2,3"));
  assert_eq!(eval("[1].concat([2, 3], 4).join(',')").unwrap(), str("1,2,3,4"));
  assert_eq!(eval("[1, 2, 3].reverse().join(',')").unwrap(), str("3,2,1"));
  assert_eq!(eval("[1, 2, 3].fill(0, 1).join(',')").unwrap(), str("1,0,0"));
}

#[test]
fn splice_removes_and_inserts() {
  assert_eq!(
    eval("let a = [1, 2, 3, 4]; let cut = a.splice(1, 2, 'x'); cut.join(',') + '|' + a.join(',')")
      .unwrap(),
    str("2,3|1,x,4")
  );
}

#[test]
fn callback_iteration_methods() {
  assert_eq!(
    eval("[1, 2, 3].map(function (n) { return n * 2; }).join(',')").unwrap(),
    str("2,4,6")
  );
  assert_eq!(
    eval("[1, 2, 3, 4].filter(n => n % 2 === 0).join(',')").unwrap(),
    str("2,4")
  );
  assert_eq!(
    eval("[1, 2, 3].reduce(function (acc, n) { return acc + n; }, 10)").unwrap(),
    JsValue::Int(16)
  );
  assert_eq!(
    eval("[1, 2, 3].reduce(function (acc, n) { return acc + n; })").unwrap(),
    JsValue::Int(6)
  );
  assert_eq!(
    eval("let seen = []; [7, 8].forEach(function (n, i) { seen.push(i + ':' + n); }); seen.join(',')")
      .unwrap(),
    str("0:7,1:8")
  );
  assert_eq!(eval("[1, 2, 3].find(n => n > 1)").unwrap(), JsValue::Int(2));
  assert_eq!(eval("[1, 2, 3].findIndex(n => n > 1)").unwrap(), JsValue::Int(1));
  assert_eq!(eval("[1, 2].some(n => n > 1)").unwrap(), JsValue::Bool(true));
  assert_eq!(eval("[1, 2].every(n => n > 1)").unwrap(), JsValue::Bool(false));
}

#[test]
fn map_callbacks_receive_index_and_array() {
  assert_eq!(
    eval("['a', 'b'].map(function (v, i, arr) { return i + v + arr.length; }).join(',')").unwrap(),
    str("0a2,1b2")
  );
}

#[test]
fn sort_defaults_to_string_order() {
  assert_eq!(eval("[10, 1, 5].sort().join(',')").unwrap(), str("1,10,5"));
  assert_eq!(
    eval("[10, 1, 5].sort(function (a, b) { return a - b; }).join(',')").unwrap(),
    str("1,5,10")
  );
  assert_eq!(
    eval("[3, undefined, 1].sort().join(',')").unwrap(),
    // Undefined sorts last and joins as the empty string.
    str("1,3,")
  );
}

#[test]
fn reduce_of_empty_array_without_initial_throws() {
  let err = eval("[].reduce(function (a, b) { return a + b; })").unwrap_err();
  assert!(err.message.contains("Reduce of empty array"));
}

#[test]
fn arrays_hold_mixed_values_and_nest() {
  assert_eq!(
    eval("let a = [[1, 2], [3]]; a[1][0] + a[0][1]").unwrap(),
    JsValue::Int(5)
  );
  assert_eq!(
    eval("let a = [1, 'x', true, null]; typeof a[1] + ':' + a.length").unwrap(),
    str("string:4")
  );
}

#[test]
fn array_constructor_forms() {
  assert_eq!(eval("new Array(3).length").unwrap(), JsValue::Int(3));
  assert_eq!(eval("Array.of(1, 2).join(',')").unwrap(), str("1,2"));
  assert_eq!(eval("Array(1, 2, 3).length").unwrap(), JsValue::Int(3));
}
