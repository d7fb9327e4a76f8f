use crate::ctx::EvalCtx;
use crate::env::BindingKind;
use crate::error::Fault;
use crate::error::VmResult;
use crate::func::Callable;
use crate::func::NativeFn;
use crate::heap::ObjKind;
use crate::ops;
use crate::value::JsStr;
use crate::value::ObjId;
use crate::value::Value;

/// Installs the default global scope: value constants, conversion functions,
/// and the builtin namespaces. Everything allocated here is charged to the
/// context like any script allocation.
pub(crate) fn seed_globals(ctx: &mut EvalCtx) -> VmResult<()> {
  let global = ctx.global_env;

  ctx.declare_binding(global, "NaN", BindingKind::Var, Value::Number(f64::NAN), true)?;
  ctx.declare_binding(
    global,
    "Infinity",
    BindingKind::Var,
    Value::Number(f64::INFINITY),
    true,
  )?;

  for (name, f) in [
    ("parseInt", native_parse_int as NativeFn),
    ("parseFloat", native_parse_float),
    ("isNaN", native_is_nan),
    ("isFinite", native_is_finite),
  ] {
    let func = make_native(ctx, name, f)?;
    ctx.declare_binding(global, name, BindingKind::Fn, func, true)?;
  }

  install_object_namespace(ctx)?;
  install_array_namespace(ctx)?;
  install_string_namespace(ctx)?;
  install_number_namespace(ctx)?;
  install_boolean_namespace(ctx)?;
  install_math_namespace(ctx)?;
  crate::json::install_json_namespace(ctx)?;
  crate::date::install_date_namespace(ctx)?;

  // The regex engine is deliberately absent; the constructor is a tombstone
  // that reports the feature as unsupported.
  let regexp = make_native(ctx, "RegExp", native_regexp_unsupported)?;
  ctx.declare_binding(global, "RegExp", BindingKind::Fn, regexp, true)?;

  Ok(())
}

fn make_native(ctx: &mut EvalCtx, name: &'static str, f: NativeFn) -> VmResult<Value> {
  let id = ctx.alloc(ObjKind::Function(Callable::Native { name, f }))?;
  Ok(Value::Object(id))
}

fn add_method(ctx: &mut EvalCtx, target: ObjId, name: &'static str, f: NativeFn) -> VmResult<()> {
  let func = make_native(ctx, name, f)?;
  let key = ctx.new_str_value(name)?;
  ctx.heap.set_prop(target, key, func).map_err(Fault::limit)?;
  Ok(())
}

fn add_constant(ctx: &mut EvalCtx, target: ObjId, name: &'static str, value: Value) -> VmResult<()> {
  let key = ctx.new_str_value(name)?;
  ctx.heap.set_prop(target, key, value).map_err(Fault::limit)?;
  Ok(())
}

fn install_namespace_fn(
  ctx: &mut EvalCtx,
  name: &'static str,
  call: NativeFn,
) -> VmResult<ObjId> {
  let id = ctx.alloc(ObjKind::Function(Callable::Native { name, f: call }))?;
  ctx.declare_binding(ctx.global_env, name, BindingKind::Fn, Value::Object(id), true)?;
  Ok(id)
}

// ---- Argument helpers ----

fn arg(args: &[Value], i: usize) -> Value {
  args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn arg_to_number(ctx: &mut EvalCtx, args: &[Value], i: usize) -> VmResult<f64> {
  let value = arg(args, i);
  ops::to_number(ctx, &value)
}

fn arg_to_str(ctx: &mut EvalCtx, args: &[Value], i: usize) -> VmResult<JsStr> {
  let value = arg(args, i);
  ops::to_str(ctx, &value)
}

fn this_str(ctx: &mut EvalCtx, this: &Value) -> VmResult<JsStr> {
  ops::to_str(ctx, this)
}

fn this_array(ctx: &mut EvalCtx, this: &Value) -> VmResult<ObjId> {
  if let Value::Object(id) = this {
    if matches!(ctx.heap.obj(*id).kind, ObjKind::Array(_)) {
      return Ok(*id);
    }
  }
  Err(ctx.throw_type_error("Receiver is not an array"))
}

fn array_elems(ctx: &EvalCtx, id: ObjId) -> Vec<Value> {
  match &ctx.heap.obj(id).kind {
    ObjKind::Array(elems) => elems.clone(),
    _ => Vec::new(),
  }
}

// ---- Global conversion functions ----

fn native_parse_int(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let s = arg_to_str(ctx, args, 0)?;
  let radix = match arg(args, 1) {
    Value::Undefined => 0,
    v => ops::to_number(ctx, &v)? as i64,
  };
  Ok(Value::Number(parse_int_impl(&s, radix)))
}

fn parse_int_impl(s: &str, radix: i64) -> f64 {
  let trimmed = s.trim_start();
  let (negative, rest) = match trimmed.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
  };

  let mut radix = radix;
  let mut digits = rest;
  if radix == 16 || radix == 0 {
    if let Some(stripped) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
      digits = stripped;
      radix = 16;
    }
  }
  if radix == 0 {
    radix = 10;
  }
  if !(2..=36).contains(&radix) {
    return f64::NAN;
  }

  let mut value = 0.0f64;
  let mut any = false;
  for c in digits.chars() {
    let Some(digit) = c.to_digit(36) else {
      break;
    };
    if digit as i64 >= radix {
      break;
    }
    value = value * radix as f64 + digit as f64;
    any = true;
  }
  if !any {
    return f64::NAN;
  }
  if negative {
    -value
  } else {
    value
  }
}

fn native_parse_float(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let s = arg_to_str(ctx, args, 0)?;
  Ok(Value::Number(parse_float_impl(&s)))
}

fn parse_float_impl(s: &str) -> f64 {
  let trimmed = s.trim_start();
  // Longest prefix that parses as a decimal literal.
  let bytes = trimmed.as_bytes();
  let mut end = 0;
  let mut seen_dot = false;
  let mut seen_e = false;
  for (i, &b) in bytes.iter().enumerate() {
    match b {
      b'0'..=b'9' => end = i + 1,
      b'+' | b'-' if i == 0 || matches!(bytes[i - 1], b'e' | b'E') => {}
      b'.' if !seen_dot && !seen_e => seen_dot = true,
      b'e' | b'E' if !seen_e && end > 0 => seen_e = true,
      _ => break,
    }
  }
  if trimmed.starts_with("Infinity") || trimmed.starts_with("+Infinity") {
    return f64::INFINITY;
  }
  if trimmed.starts_with("-Infinity") {
    return f64::NEG_INFINITY;
  }
  trimmed[..end.min(trimmed.len())]
    .parse::<f64>()
    .unwrap_or(f64::NAN)
}

fn native_is_nan(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let n = arg_to_number(ctx, args, 0)?;
  Ok(Value::Bool(n.is_nan()))
}

fn native_is_finite(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let n = arg_to_number(ctx, args, 0)?;
  Ok(Value::Bool(n.is_finite()))
}

fn native_regexp_unsupported(ctx: &mut EvalCtx, _this: Value, _args: &[Value]) -> VmResult<Value> {
  Err(ctx.throw_error("Regular expressions are not supported"))
}

// ---- Object ----

fn install_object_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let ns = install_namespace_fn(ctx, "Object", native_object_call)?;
  add_method(ctx, ns, "keys", native_object_keys)?;
  add_method(ctx, ns, "values", native_object_values)?;
  add_method(ctx, ns, "entries", native_object_entries)?;
  add_method(ctx, ns, "assign", native_object_assign)?;
  add_method(ctx, ns, "freeze", native_object_freeze)?;
  add_method(ctx, ns, "isFrozen", native_object_is_frozen)?;
  Ok(())
}

fn native_object_call(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  match arg(args, 0) {
    Value::Undefined | Value::Null => Ok(Value::Object(ctx.alloc(ObjKind::Ordinary)?)),
    other => Ok(other),
  }
}

fn require_object_arg(ctx: &mut EvalCtx, args: &[Value], i: usize) -> VmResult<ObjId> {
  match arg(args, i) {
    Value::Object(id) => Ok(id),
    other => {
      let message = format!("{} is not an object", ctx.display_value(&other));
      Err(ctx.throw_type_error(&message))
    }
  }
}

fn native_object_keys(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let id = require_object_arg(ctx, args, 0)?;
  let keys = ctx.own_keys(id)?;
  let elems: Vec<Value> = keys.into_iter().map(Value::Str).collect();
  ctx.alloc_array(elems)
}

fn native_object_values(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let id = require_object_arg(ctx, args, 0)?;
  let keys = ctx.own_keys(id)?;
  let base = Value::Object(id);
  let mut elems = Vec::with_capacity(keys.len());
  for key in keys {
    elems.push(ctx.get_property(&base, &key)?);
  }
  ctx.alloc_array(elems)
}

fn native_object_entries(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let id = require_object_arg(ctx, args, 0)?;
  let keys = ctx.own_keys(id)?;
  let base = Value::Object(id);
  let mut elems = Vec::with_capacity(keys.len());
  for key in keys {
    let value = ctx.get_property(&base, &key)?;
    elems.push(ctx.alloc_array(vec![Value::Str(key), value])?);
  }
  ctx.alloc_array(elems)
}

fn native_object_assign(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let target = arg(args, 0);
  if target.is_nullish() {
    return Err(ctx.throw_type_error("Cannot convert undefined or null to object"));
  }
  for source in args.iter().skip(1) {
    let Value::Object(source_id) = source else {
      continue;
    };
    let keys = ctx.own_keys(*source_id)?;
    for key in keys {
      let value = ctx.get_property(source, &key)?;
      ctx.set_property(&target, &key, value)?;
    }
  }
  Ok(target)
}

fn native_object_freeze(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let target = arg(args, 0);
  if let Value::Object(id) = &target {
    ctx.heap.obj_mut(*id).frozen = true;
  }
  Ok(target)
}

fn native_object_is_frozen(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  Ok(Value::Bool(match arg(args, 0) {
    Value::Object(id) => ctx.heap.obj(id).frozen,
    // Primitives are trivially frozen.
    _ => true,
  }))
}

// ---- Array ----

fn install_array_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let ns = install_namespace_fn(ctx, "Array", native_array_call)?;
  add_method(ctx, ns, "isArray", native_array_is_array)?;
  add_method(ctx, ns, "of", native_array_of)?;
  Ok(())
}

fn native_array_call(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  if args.len() == 1 {
    if let Value::Number(n) = &args[0] {
      if n.fract() != 0.0 || *n < 0.0 || *n > u32::MAX as f64 {
        return Err(ctx.throw_range_error("Invalid array length"));
      }
      // Grow through the accountant so a huge requested length trips the
      // memory budget instead of attempting the allocation.
      let array = ctx.alloc_array(Vec::new())?;
      if let Value::Object(id) = &array {
        ctx.array_set_length(*id, *n as usize)?;
      }
      return Ok(array);
    }
  }
  ctx.alloc_array(args.to_vec())
}

fn native_array_is_array(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  Ok(Value::Bool(match arg(args, 0) {
    Value::Object(id) => matches!(ctx.heap.obj(id).kind, ObjKind::Array(_)),
    _ => false,
  }))
}

fn native_array_of(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  ctx.alloc_array(args.to_vec())
}

pub(crate) fn array_method_fn(name: &str) -> Option<NativeFn> {
  Some(match name {
    "concat" => native_array_concat,
    "every" => native_array_every,
    "fill" => native_array_fill,
    "filter" => native_array_filter,
    "find" => native_array_find,
    "findIndex" => native_array_find_index,
    "forEach" => native_array_for_each,
    "includes" => native_array_includes,
    "indexOf" => native_array_index_of,
    "join" => native_array_join,
    "lastIndexOf" => native_array_last_index_of,
    "map" => native_array_map,
    "pop" => native_array_pop,
    "push" => native_array_push,
    "reduce" => native_array_reduce,
    "reverse" => native_array_reverse,
    "shift" => native_array_shift,
    "slice" => native_array_slice,
    "some" => native_array_some,
    "sort" => native_array_sort,
    "splice" => native_array_splice,
    "toString" => native_array_to_string,
    "unshift" => native_array_unshift,
    _ => return None,
  })
}

fn native_array_push(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let mut len = 0;
  for value in args {
    len = ctx.array_push(id, value.clone())?;
  }
  if args.is_empty() {
    len = array_elems(ctx, id).len();
  }
  Ok(Value::Number(len as f64))
}

fn native_array_pop(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  if let ObjKind::Array(elems) = &mut ctx.heap.obj_mut(id).kind {
    return Ok(elems.pop().unwrap_or(Value::Undefined));
  }
  Ok(Value::Undefined)
}

fn native_array_shift(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  if let ObjKind::Array(elems) = &mut ctx.heap.obj_mut(id).kind {
    if elems.is_empty() {
      return Ok(Value::Undefined);
    }
    return Ok(elems.remove(0));
  }
  Ok(Value::Undefined)
}

fn native_array_unshift(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  ctx.charge(args.len().saturating_mul(crate::heap::ELEM_SLOT_BYTES))?;
  if let ObjKind::Array(elems) = &mut ctx.heap.obj_mut(id).kind {
    for (i, value) in args.iter().enumerate() {
      elems.insert(i, value.clone());
    }
    return Ok(Value::Number(elems.len() as f64));
  }
  Ok(Value::Undefined)
}

fn native_array_index_of(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let needle = arg(args, 0);
  let elems = array_elems(ctx, id);
  for (i, elem) in elems.iter().enumerate() {
    ctx.tick()?;
    if ops::strict_equals(elem, &needle) {
      return Ok(Value::Number(i as f64));
    }
  }
  Ok(Value::Number(-1.0))
}

fn native_array_last_index_of(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let needle = arg(args, 0);
  let elems = array_elems(ctx, id);
  for (i, elem) in elems.iter().enumerate().rev() {
    ctx.tick()?;
    if ops::strict_equals(elem, &needle) {
      return Ok(Value::Number(i as f64));
    }
  }
  Ok(Value::Number(-1.0))
}

fn native_array_includes(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let needle = arg(args, 0);
  let elems = array_elems(ctx, id);
  for elem in &elems {
    ctx.tick()?;
    // SameValueZero: like `===` but NaN matches NaN.
    let matched = ops::strict_equals(elem, &needle)
      || matches!(
        (elem, &needle),
        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan()
      );
    if matched {
      return Ok(Value::Bool(true));
    }
  }
  Ok(Value::Bool(false))
}

fn native_array_join(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let separator = match arg(args, 0) {
    Value::Undefined => ctx.new_str_value(",")?,
    other => ops::to_str(ctx, &other)?,
  };
  let elems = array_elems(ctx, id);
  let mut out = String::new();
  for (i, elem) in elems.iter().enumerate() {
    ctx.tick()?;
    if i > 0 {
      out.push_str(&separator);
    }
    if !elem.is_nullish() {
      let s = ops::to_str(ctx, elem)?;
      out.push_str(&s);
    }
  }
  Ok(Value::Str(ctx.new_str_from_string(out)?))
}

fn native_array_to_string(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  native_array_join(ctx, this, &[])
}

/// Normalizes a relative index argument (negative counts from the end).
fn relative_index(n: f64, len: usize) -> usize {
  if n.is_nan() {
    return 0;
  }
  if n < 0.0 {
    let from_end = (-n) as usize;
    len.saturating_sub(from_end)
  } else {
    (n as usize).min(len)
  }
}

fn native_array_slice(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let elems = array_elems(ctx, id);
  let len = elems.len();
  let start = match arg(args, 0) {
    Value::Undefined => 0,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  let end = match arg(args, 1) {
    Value::Undefined => len,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  let out: Vec<Value> = if start < end {
    elems[start..end].to_vec()
  } else {
    Vec::new()
  };
  ctx.alloc_array(out)
}

fn native_array_splice(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let len = array_elems(ctx, id).len();
  let start = match arg(args, 0) {
    Value::Undefined => 0,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  let delete_count = match arg(args, 1) {
    Value::Undefined => len - start,
    v => {
      let n = ops::to_number(ctx, &v)?;
      if n.is_nan() || n < 0.0 {
        0
      } else {
        (n as usize).min(len - start)
      }
    }
  };
  let inserted: Vec<Value> = args.iter().skip(2).cloned().collect();
  ctx.charge(inserted.len().saturating_mul(crate::heap::ELEM_SLOT_BYTES))?;
  let removed: Vec<Value> = if let ObjKind::Array(elems) = &mut ctx.heap.obj_mut(id).kind {
    elems.splice(start..start + delete_count, inserted).collect()
  } else {
    Vec::new()
  };
  ctx.alloc_array(removed)
}

fn native_array_concat(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let mut out = array_elems(ctx, id);
  for value in args {
    match value {
      Value::Object(other) if matches!(ctx.heap.obj(*other).kind, ObjKind::Array(_)) => {
        out.extend(array_elems(ctx, *other));
      }
      other => out.push(other.clone()),
    }
  }
  ctx.alloc_array(out)
}

fn native_array_reverse(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  if let ObjKind::Array(elems) = &mut ctx.heap.obj_mut(id).kind {
    elems.reverse();
  }
  Ok(this)
}

fn native_array_fill(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let len = array_elems(ctx, id).len();
  let value = arg(args, 0);
  let start = match arg(args, 1) {
    Value::Undefined => 0,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  let end = match arg(args, 2) {
    Value::Undefined => len,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  if let ObjKind::Array(elems) = &mut ctx.heap.obj_mut(id).kind {
    if start < end {
      for slot in elems[start..end.min(len)].iter_mut() {
        *slot = value.clone();
      }
    }
  }
  Ok(this)
}

fn require_callable_arg(ctx: &mut EvalCtx, args: &[Value], i: usize) -> VmResult<Value> {
  let value = arg(args, i);
  let callable = match &value {
    Value::Object(id) => matches!(ctx.heap.obj(*id).kind, ObjKind::Function(_)),
    _ => false,
  };
  if !callable {
    let message = format!("{} is not a function", ctx.display_value(&value));
    return Err(ctx.throw_type_error(&message));
  }
  Ok(value)
}

fn native_array_for_each(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    ctx.call_value(
      f.clone(),
      None,
      vec![elem, Value::Number(i as f64), this.clone()],
      false,
    )?;
  }
  Ok(Value::Undefined)
}

fn native_array_map(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  let mut out = Vec::with_capacity(len);
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    let mapped = ctx.call_value(
      f.clone(),
      None,
      vec![elem, Value::Number(i as f64), this.clone()],
      false,
    )?;
    out.push(mapped);
  }
  ctx.alloc_array(out)
}

fn native_array_filter(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  let mut out = Vec::new();
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    let keep = ctx.call_value(
      f.clone(),
      None,
      vec![elem.clone(), Value::Number(i as f64), this.clone()],
      false,
    )?;
    if ops::to_boolean(&keep) {
      out.push(elem);
    }
  }
  ctx.alloc_array(out)
}

fn native_array_reduce(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  let mut i = 0usize;
  let mut acc = if args.len() > 1 {
    arg(args, 1)
  } else {
    if len == 0 {
      return Err(ctx.throw_type_error("Reduce of empty array with no initial value"));
    }
    i = 1;
    array_elems(ctx, id)[0].clone()
  };
  while i < len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    acc = ctx.call_value(
      f.clone(),
      None,
      vec![acc, elem, Value::Number(i as f64), this.clone()],
      false,
    )?;
    i += 1;
  }
  Ok(acc)
}

fn native_array_find(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    let matched = ctx.call_value(
      f.clone(),
      None,
      vec![elem.clone(), Value::Number(i as f64), this.clone()],
      false,
    )?;
    if ops::to_boolean(&matched) {
      return Ok(elem);
    }
  }
  Ok(Value::Undefined)
}

fn native_array_find_index(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    let matched = ctx.call_value(
      f.clone(),
      None,
      vec![elem, Value::Number(i as f64), this.clone()],
      false,
    )?;
    if ops::to_boolean(&matched) {
      return Ok(Value::Number(i as f64));
    }
  }
  Ok(Value::Number(-1.0))
}

fn native_array_some(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    let matched = ctx.call_value(
      f.clone(),
      None,
      vec![elem, Value::Number(i as f64), this.clone()],
      false,
    )?;
    if ops::to_boolean(&matched) {
      return Ok(Value::Bool(true));
    }
  }
  Ok(Value::Bool(false))
}

fn native_array_every(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let f = require_callable_arg(ctx, args, 0)?;
  let len = array_elems(ctx, id).len();
  for i in 0..len {
    let elem = array_elems(ctx, id).get(i).cloned().unwrap_or(Value::Undefined);
    let matched = ctx.call_value(
      f.clone(),
      None,
      vec![elem, Value::Number(i as f64), this.clone()],
      false,
    )?;
    if !ops::to_boolean(&matched) {
      return Ok(Value::Bool(false));
    }
  }
  Ok(Value::Bool(true))
}

fn native_array_sort(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let id = this_array(ctx, &this)?;
  let comparator = match arg(args, 0) {
    Value::Undefined => None,
    other => Some(require_callable_arg(ctx, &[other], 0)?),
  };

  let mut elems = array_elems(ctx, id);

  // Insertion sort so script comparators (which may throw or exhaust budgets)
  // can propagate faults; every comparison ticks.
  let mut i = 1;
  while i < elems.len() {
    let mut j = i;
    while j > 0 {
      ctx.tick()?;
      let ordered = sort_leq(ctx, &comparator, &elems[j - 1], &elems[j])?;
      if ordered {
        break;
      }
      elems.swap(j - 1, j);
      j -= 1;
    }
    i += 1;
  }

  if let ObjKind::Array(slot) = &mut ctx.heap.obj_mut(id).kind {
    *slot = elems;
  }
  Ok(this)
}

fn sort_leq(
  ctx: &mut EvalCtx,
  comparator: &Option<Value>,
  a: &Value,
  b: &Value,
) -> VmResult<bool> {
  // Undefined sorts last, always.
  if b.is_undefined() {
    return Ok(true);
  }
  if a.is_undefined() {
    return Ok(false);
  }
  match comparator {
    Some(f) => {
      let result = ctx.call_value(f.clone(), None, vec![a.clone(), b.clone()], false)?;
      let n = ops::to_number(ctx, &result)?;
      Ok(n <= 0.0 || n.is_nan())
    }
    None => {
      let sa = ops::to_str(ctx, a)?;
      let sb = ops::to_str(ctx, b)?;
      Ok(sa <= sb)
    }
  }
}

// ---- String ----

fn install_string_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let ns = install_namespace_fn(ctx, "String", native_string_call)?;
  add_method(ctx, ns, "fromCharCode", native_string_from_char_code)?;
  Ok(())
}

fn native_string_call(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  match args.first() {
    None => Ok(Value::Str(ctx.new_str_value("")?)),
    Some(value) => Ok(Value::Str(ops::to_str(ctx, value)?)),
  }
}

fn native_string_from_char_code(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let mut units = Vec::with_capacity(args.len());
  for value in args {
    let n = ops::to_number(ctx, value)?;
    units.push(ops::to_uint32(n) as u16);
  }
  let s = String::from_utf16_lossy(&units);
  Ok(Value::Str(ctx.new_str_from_string(s)?))
}

/// Character at a UTF-16 index, as a one-unit string.
pub(crate) fn string_char_at(s: &str, index: usize) -> Option<String> {
  let unit = s.encode_utf16().nth(index)?;
  Some(String::from_utf16_lossy(&[unit]))
}

pub(crate) fn string_method_fn(name: &str) -> Option<NativeFn> {
  Some(match name {
    "charAt" => native_string_char_at,
    "charCodeAt" => native_string_char_code_at,
    "codePointAt" => native_string_code_point_at,
    "concat" => native_string_concat,
    "endsWith" => native_string_ends_with,
    "includes" => native_string_includes,
    "indexOf" => native_string_index_of,
    "lastIndexOf" => native_string_last_index_of,
    "padEnd" => native_string_pad_end,
    "padStart" => native_string_pad_start,
    "repeat" => native_string_repeat,
    "replace" => native_string_replace,
    "slice" => native_string_slice,
    "split" => native_string_split,
    "startsWith" => native_string_starts_with,
    "substring" => native_string_substring,
    "toLowerCase" => native_string_to_lower_case,
    "toString" => native_string_to_string,
    "toUpperCase" => native_string_to_upper_case,
    "trim" => native_string_trim,
    "trimEnd" => native_string_trim_end,
    "trimStart" => native_string_trim_start,
    "valueOf" => native_string_to_string,
    // These require the regex engine, which is deliberately absent.
    "match" => native_string_regex_unsupported,
    "matchAll" => native_string_regex_unsupported,
    "search" => native_string_regex_unsupported,
    _ => return None,
  })
}

fn native_string_regex_unsupported(
  ctx: &mut EvalCtx,
  _this: Value,
  _args: &[Value],
) -> VmResult<Value> {
  Err(ctx.throw_error("Regular expressions are not supported"))
}

fn utf16_units(s: &str) -> Vec<u16> {
  s.encode_utf16().collect()
}

fn native_string_char_at(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let i = arg_to_number(ctx, args, 0)?;
  let i = if i.is_nan() { 0.0 } else { i.trunc() };
  if i < 0.0 {
    return Ok(Value::Str(ctx.new_str_value("")?));
  }
  match string_char_at(&s, i as usize) {
    Some(c) => Ok(Value::Str(ctx.new_str_from_string(c)?)),
    None => Ok(Value::Str(ctx.new_str_value("")?)),
  }
}

fn native_string_char_code_at(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let i = arg_to_number(ctx, args, 0)?;
  let i = if i.is_nan() { 0.0 } else { i };
  if i < 0.0 {
    return Ok(Value::Number(f64::NAN));
  }
  match s.encode_utf16().nth(i as usize) {
    Some(unit) => Ok(Value::Number(unit as f64)),
    None => Ok(Value::Number(f64::NAN)),
  }
}

fn native_string_code_point_at(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let i = arg_to_number(ctx, args, 0)?;
  if i < 0.0 || i.is_nan() {
    return Ok(Value::Undefined);
  }
  let units = utf16_units(&s);
  let index = i as usize;
  if index >= units.len() {
    return Ok(Value::Undefined);
  }
  let decoded: Vec<char> = char::decode_utf16(units[index..].iter().copied())
    .map(|r| r.unwrap_or('\u{FFFD}'))
    .take(1)
    .collect();
  match decoded.first() {
    Some(c) => Ok(Value::Number(*c as u32 as f64)),
    None => Ok(Value::Undefined),
  }
}

fn native_string_concat(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let mut out = s.to_string();
  for value in args {
    let part = ops::to_str(ctx, value)?;
    out.push_str(&part);
  }
  Ok(Value::Str(ctx.new_str_from_string(out)?))
}

fn slice_units(ctx: &mut EvalCtx, units: &[u16], start: usize, end: usize) -> VmResult<Value> {
  let out = if start < end {
    String::from_utf16_lossy(&units[start..end])
  } else {
    String::new()
  };
  Ok(Value::Str(ctx.new_str_from_string(out)?))
}

fn native_string_slice(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let units = utf16_units(&s);
  let len = units.len();
  let start = match arg(args, 0) {
    Value::Undefined => 0,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  let end = match arg(args, 1) {
    Value::Undefined => len,
    v => relative_index(ops::to_number(ctx, &v)?, len),
  };
  slice_units(ctx, &units, start, end)
}

fn native_string_substring(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let units = utf16_units(&s);
  let len = units.len();
  let clamp = |n: f64| -> usize {
    if n.is_nan() || n < 0.0 {
      0
    } else {
      (n as usize).min(len)
    }
  };
  let a = match arg(args, 0) {
    Value::Undefined => 0,
    v => clamp(ops::to_number(ctx, &v)?),
  };
  let b = match arg(args, 1) {
    Value::Undefined => len,
    v => clamp(ops::to_number(ctx, &v)?),
  };
  // `substring` swaps out-of-order bounds.
  slice_units(ctx, &units, a.min(b), a.max(b))
}

fn native_string_to_upper_case(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  Ok(Value::Str(ctx.new_str_from_string(s.to_uppercase())?))
}

fn native_string_to_lower_case(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  Ok(Value::Str(ctx.new_str_from_string(s.to_lowercase())?))
}

fn native_string_to_string(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  Ok(Value::Str(this_str(ctx, &this)?))
}

fn native_string_trim(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  Ok(Value::Str(ctx.new_str_value(s.trim())?))
}

fn native_string_trim_start(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  Ok(Value::Str(ctx.new_str_value(s.trim_start())?))
}

fn native_string_trim_end(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  Ok(Value::Str(ctx.new_str_value(s.trim_end())?))
}

fn native_string_repeat(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let n = arg_to_number(ctx, args, 0)?;
  if n < 0.0 || !n.is_finite() {
    return Err(ctx.throw_range_error("Invalid count value"));
  }
  let count = n as usize;
  // Charge before building: this is the canonical way scripts flood memory.
  ctx.charge(s.len().saturating_mul(count))?;
  Ok(Value::Str(ctx.new_str_from_string(s.repeat(count))?))
}

fn string_pattern_arg(ctx: &mut EvalCtx, args: &[Value], i: usize) -> VmResult<JsStr> {
  // A regex pattern argument would need the absent engine; only strings are
  // accepted.
  arg_to_str(ctx, args, i)
}

fn native_string_includes(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let needle = string_pattern_arg(ctx, args, 0)?;
  Ok(Value::Bool(s.contains(&*needle)))
}

fn native_string_starts_with(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let needle = string_pattern_arg(ctx, args, 0)?;
  Ok(Value::Bool(s.starts_with(&*needle)))
}

fn native_string_ends_with(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let needle = string_pattern_arg(ctx, args, 0)?;
  Ok(Value::Bool(s.ends_with(&*needle)))
}

fn utf16_index_of(haystack: &str, needle: &str) -> Option<usize> {
  let byte_index = haystack.find(needle)?;
  Some(haystack[..byte_index].encode_utf16().count())
}

fn native_string_index_of(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let needle = string_pattern_arg(ctx, args, 0)?;
  Ok(Value::Number(
    utf16_index_of(&s, &needle).map(|i| i as f64).unwrap_or(-1.0),
  ))
}

fn native_string_last_index_of(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let needle = string_pattern_arg(ctx, args, 0)?;
  match s.rfind(&*needle) {
    Some(byte_index) => Ok(Value::Number(s[..byte_index].encode_utf16().count() as f64)),
    None => Ok(Value::Number(-1.0)),
  }
}

fn native_string_replace(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  // Only string search patterns: replaces the first occurrence.
  let search = string_pattern_arg(ctx, args, 0)?;
  let replacement = arg_to_str(ctx, args, 1)?;
  let out = s.replacen(&*search, &replacement, 1);
  Ok(Value::Str(ctx.new_str_from_string(out)?))
}

fn native_string_split(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  match arg(args, 0) {
    Value::Undefined => {
      let whole = Value::Str(s);
      ctx.alloc_array(vec![whole])
    }
    separator => {
      let separator = ops::to_str(ctx, &separator)?;
      let parts: Vec<String> = if separator.is_empty() {
        s.chars().map(|c| c.to_string()).collect()
      } else {
        s.split(&*separator).map(|p| p.to_string()).collect()
      };
      let mut elems = Vec::with_capacity(parts.len());
      for part in parts {
        elems.push(Value::Str(ctx.new_str_from_string(part)?));
      }
      ctx.alloc_array(elems)
    }
  }
}

fn pad_string(
  ctx: &mut EvalCtx,
  this: Value,
  args: &[Value],
  at_start: bool,
) -> VmResult<Value> {
  let s = this_str(ctx, &this)?;
  let target = arg_to_number(ctx, args, 0)?;
  let pad = match arg(args, 1) {
    Value::Undefined => ctx.new_str_value(" ")?,
    v => ops::to_str(ctx, &v)?,
  };
  let len = s.encode_utf16().count();
  let target = if target.is_nan() || target < 0.0 {
    0
  } else {
    target as usize
  };
  if target <= len || pad.is_empty() {
    return Ok(Value::Str(s));
  }
  let missing = target - len;
  ctx.charge(missing)?;
  let pad_units: Vec<u16> = pad.encode_utf16().collect();
  let filler: Vec<u16> = pad_units.iter().copied().cycle().take(missing).collect();
  let filler = String::from_utf16_lossy(&filler);
  let out = if at_start {
    format!("{filler}{s}")
  } else {
    format!("{s}{filler}")
  };
  Ok(Value::Str(ctx.new_str_from_string(out)?))
}

fn native_string_pad_start(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  pad_string(ctx, this, args, true)
}

fn native_string_pad_end(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  pad_string(ctx, this, args, false)
}

// ---- Number / Boolean ----

fn install_number_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let ns = install_namespace_fn(ctx, "Number", native_number_call)?;
  add_constant(ctx, ns, "MAX_SAFE_INTEGER", Value::Number(9_007_199_254_740_991.0))?;
  add_constant(ctx, ns, "MIN_SAFE_INTEGER", Value::Number(-9_007_199_254_740_991.0))?;
  add_constant(ctx, ns, "MAX_VALUE", Value::Number(f64::MAX))?;
  add_constant(ctx, ns, "MIN_VALUE", Value::Number(5e-324))?;
  add_constant(ctx, ns, "EPSILON", Value::Number(f64::EPSILON))?;
  add_constant(ctx, ns, "POSITIVE_INFINITY", Value::Number(f64::INFINITY))?;
  add_constant(ctx, ns, "NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY))?;
  add_constant(ctx, ns, "NaN", Value::Number(f64::NAN))?;
  add_method(ctx, ns, "isInteger", native_number_is_integer)?;
  add_method(ctx, ns, "isSafeInteger", native_number_is_safe_integer)?;
  add_method(ctx, ns, "isFinite", native_number_is_finite)?;
  add_method(ctx, ns, "isNaN", native_number_is_nan)?;
  add_method(ctx, ns, "parseFloat", native_parse_float)?;
  add_method(ctx, ns, "parseInt", native_parse_int)?;
  Ok(())
}

fn native_number_call(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  match args.first() {
    None => Ok(Value::Number(0.0)),
    Some(value) => Ok(Value::Number(ops::to_number(ctx, value)?)),
  }
}

fn native_number_is_integer(_ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  Ok(Value::Bool(matches!(
    arg(args, 0),
    Value::Number(n) if n.is_finite() && n.fract() == 0.0
  )))
}

fn native_number_is_safe_integer(
  _ctx: &mut EvalCtx,
  _this: Value,
  args: &[Value],
) -> VmResult<Value> {
  Ok(Value::Bool(matches!(
    arg(args, 0),
    Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0
  )))
}

fn native_number_is_finite(_ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  Ok(Value::Bool(
    matches!(arg(args, 0), Value::Number(n) if n.is_finite()),
  ))
}

fn native_number_is_nan(_ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  Ok(Value::Bool(
    matches!(arg(args, 0), Value::Number(n) if n.is_nan()),
  ))
}

fn install_boolean_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  install_namespace_fn(ctx, "Boolean", native_boolean_call)?;
  Ok(())
}

fn native_boolean_call(_ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  Ok(Value::Bool(ops::to_boolean(&arg(args, 0))))
}

pub(crate) fn primitive_method_fn(value: &Value, name: &str) -> Option<NativeFn> {
  match value {
    Value::Number(_) => Some(match name {
      "toFixed" => native_number_to_fixed,
      "toString" => native_number_to_string_method,
      "valueOf" => native_value_of_self,
      _ => return None,
    }),
    Value::Bool(_) => Some(match name {
      "toString" => native_primitive_to_string,
      "valueOf" => native_value_of_self,
      _ => return None,
    }),
    _ => None,
  }
}

fn native_value_of_self(_ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  Ok(this)
}

fn native_primitive_to_string(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  Ok(Value::Str(ops::to_str(ctx, &this)?))
}

fn native_number_to_fixed(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let n = ops::to_number(ctx, &this)?;
  let digits = arg_to_number(ctx, args, 0)?;
  if !(0.0..=100.0).contains(&digits) {
    return Err(ctx.throw_range_error("toFixed() digits argument must be between 0 and 100"));
  }
  let s = format!("{:.*}", digits as usize, n);
  Ok(Value::Str(ctx.new_str_from_string(s)?))
}

fn native_number_to_string_method(ctx: &mut EvalCtx, this: Value, args: &[Value]) -> VmResult<Value> {
  let n = ops::to_number(ctx, &this)?;
  let radix = match arg(args, 0) {
    Value::Undefined => 10,
    v => ops::to_number(ctx, &v)? as u32,
  };
  if radix == 10 {
    return Ok(Value::Str(ctx.new_str_from_string(ops::number_to_string(n))?));
  }
  if !(2..=36).contains(&radix) {
    return Err(ctx.throw_range_error("toString() radix must be between 2 and 36"));
  }
  // Non-decimal radix rendering covers integers; fractional digits are
  // truncated.
  let negative = n < 0.0;
  let mut int = n.abs().trunc() as u64;
  let mut digits = Vec::new();
  loop {
    let digit = (int % radix as u64) as u32;
    digits.push(char::from_digit(digit, radix).unwrap_or('0'));
    int /= radix as u64;
    if int == 0 {
      break;
    }
  }
  if negative {
    digits.push('-');
  }
  let s: String = digits.into_iter().rev().collect();
  Ok(Value::Str(ctx.new_str_from_string(s)?))
}

// ---- Math ----

fn install_math_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let id = ctx.alloc(ObjKind::Ordinary)?;
  ctx.declare_binding(ctx.global_env, "Math", BindingKind::Fn, Value::Object(id), true)?;

  add_constant(ctx, id, "E", Value::Number(std::f64::consts::E))?;
  add_constant(ctx, id, "LN2", Value::Number(std::f64::consts::LN_2))?;
  add_constant(ctx, id, "LN10", Value::Number(std::f64::consts::LN_10))?;
  add_constant(ctx, id, "LOG2E", Value::Number(std::f64::consts::LOG2_E))?;
  add_constant(ctx, id, "LOG10E", Value::Number(std::f64::consts::LOG10_E))?;
  add_constant(ctx, id, "PI", Value::Number(std::f64::consts::PI))?;
  add_constant(ctx, id, "SQRT1_2", Value::Number(std::f64::consts::FRAC_1_SQRT_2))?;
  add_constant(ctx, id, "SQRT2", Value::Number(std::f64::consts::SQRT_2))?;

  add_method(ctx, id, "abs", |ctx, _this, args| math1(ctx, args, f64::abs))?;
  add_method(ctx, id, "acos", |ctx, _this, args| math1(ctx, args, f64::acos))?;
  add_method(ctx, id, "asin", |ctx, _this, args| math1(ctx, args, f64::asin))?;
  add_method(ctx, id, "atan", |ctx, _this, args| math1(ctx, args, f64::atan))?;
  add_method(ctx, id, "cbrt", |ctx, _this, args| math1(ctx, args, f64::cbrt))?;
  add_method(ctx, id, "ceil", |ctx, _this, args| math1(ctx, args, f64::ceil))?;
  add_method(ctx, id, "cos", |ctx, _this, args| math1(ctx, args, f64::cos))?;
  add_method(ctx, id, "exp", |ctx, _this, args| math1(ctx, args, f64::exp))?;
  add_method(ctx, id, "floor", |ctx, _this, args| math1(ctx, args, f64::floor))?;
  add_method(ctx, id, "log", |ctx, _this, args| math1(ctx, args, f64::ln))?;
  add_method(ctx, id, "log2", |ctx, _this, args| math1(ctx, args, f64::log2))?;
  add_method(ctx, id, "log10", |ctx, _this, args| math1(ctx, args, f64::log10))?;
  add_method(ctx, id, "sin", |ctx, _this, args| math1(ctx, args, f64::sin))?;
  add_method(ctx, id, "sqrt", |ctx, _this, args| math1(ctx, args, f64::sqrt))?;
  add_method(ctx, id, "tan", |ctx, _this, args| math1(ctx, args, f64::tan))?;
  add_method(ctx, id, "trunc", |ctx, _this, args| math1(ctx, args, f64::trunc))?;
  add_method(ctx, id, "sign", |ctx, _this, args| {
    math1(ctx, args, |n| {
      if n.is_nan() || n == 0.0 {
        n
      } else if n > 0.0 {
        1.0
      } else {
        -1.0
      }
    })
  })?;
  add_method(ctx, id, "round", |ctx, _this, args| math1(ctx, args, js_round))?;
  add_method(ctx, id, "atan2", native_math_atan2)?;
  add_method(ctx, id, "pow", native_math_pow)?;
  add_method(ctx, id, "hypot", native_math_hypot)?;
  add_method(ctx, id, "max", native_math_max)?;
  add_method(ctx, id, "min", native_math_min)?;
  add_method(ctx, id, "random", native_math_random)?;
  Ok(())
}

fn math1(ctx: &mut EvalCtx, args: &[Value], f: impl FnOnce(f64) -> f64) -> VmResult<Value> {
  let n = arg_to_number(ctx, args, 0)?;
  Ok(Value::Number(f(n)))
}

/// `Math.round` semantics: ties round towards +Infinity, -0 is preserved.
fn js_round(n: f64) -> f64 {
  if n.is_nan() || n.is_infinite() || n == 0.0 {
    return n;
  }
  let floor = n.floor();
  if n - floor >= 0.5 {
    floor + 1.0
  } else {
    floor
  }
}

fn native_math_atan2(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let y = arg_to_number(ctx, args, 0)?;
  let x = arg_to_number(ctx, args, 1)?;
  Ok(Value::Number(y.atan2(x)))
}

fn native_math_pow(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let base = arg_to_number(ctx, args, 0)?;
  let exp = arg_to_number(ctx, args, 1)?;
  Ok(Value::Number(js_pow(base, exp)))
}

/// `Number::exponentiate` edge cases that differ from IEEE `powf`.
fn js_pow(base: f64, exp: f64) -> f64 {
  if exp.is_nan() {
    return f64::NAN;
  }
  if exp == 0.0 {
    return 1.0;
  }
  if base.abs() == 1.0 && exp.is_infinite() {
    return f64::NAN;
  }
  base.powf(exp)
}

fn native_math_hypot(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let mut sum = 0.0f64;
  for value in args {
    let n = ops::to_number(ctx, value)?;
    sum += n * n;
  }
  Ok(Value::Number(sum.sqrt()))
}

fn native_math_max(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let mut best = f64::NEG_INFINITY;
  for value in args {
    let n = ops::to_number(ctx, value)?;
    if n.is_nan() {
      return Ok(Value::Number(f64::NAN));
    }
    if n > best {
      best = n;
    }
  }
  Ok(Value::Number(best))
}

fn native_math_min(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let mut best = f64::INFINITY;
  for value in args {
    let n = ops::to_number(ctx, value)?;
    if n.is_nan() {
      return Ok(Value::Number(f64::NAN));
    }
    if n < best {
      best = n;
    }
  }
  Ok(Value::Number(best))
}

fn native_math_random(ctx: &mut EvalCtx, _this: Value, _args: &[Value]) -> VmResult<Value> {
  Ok(Value::Number(ctx.next_random()))
}
