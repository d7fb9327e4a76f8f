use crate::ctx::EvalCtx;
use crate::error::VmResult;
use crate::heap::ObjKind;
use crate::value::JsStr;
use crate::value::Value;
use parse_js6::num::JsNumber;

/// ECMAScript abstract operations used by expression evaluation.

pub(crate) fn type_of(ctx: &EvalCtx, value: &Value) -> &'static str {
  match value {
    Value::Undefined => "undefined",
    Value::Null => "object",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::Str(_) => "string",
    Value::Object(id) => match ctx.heap.obj(*id).kind {
      ObjKind::Function(_) => "function",
      _ => "object",
    },
  }
}

pub(crate) fn to_boolean(value: &Value) -> bool {
  match value {
    Value::Undefined | Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => *n != 0.0 && !n.is_nan(),
    Value::Str(s) => !s.is_empty(),
    Value::Object(_) => true,
  }
}

/// `ToPrimitive`. `NumberHint` is used by arithmetic; everything else uses the
/// default (string-flavored) conversion, matching how `Date` participates in
/// `+`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimitiveHint {
  Default,
  Number,
}

pub(crate) fn to_primitive(
  ctx: &mut EvalCtx,
  value: &Value,
  hint: PrimitiveHint,
) -> VmResult<Value> {
  let Value::Object(id) = value else {
    return Ok(value.clone());
  };
  match &ctx.heap.obj(*id).kind {
    ObjKind::Date(epoch) => match hint {
      PrimitiveHint::Number => Ok(Value::Number(*epoch)),
      PrimitiveHint::Default => {
        let s = crate::date::format_date_string(*epoch);
        Ok(Value::Str(ctx.new_str_value(&s)?))
      }
    },
    ObjKind::Array(_) => {
      let joined = array_join_for_coercion(ctx, *id, 0)?;
      Ok(Value::Str(ctx.new_str_from_string(joined)?))
    }
    ObjKind::Function(_) => Ok(Value::Str(ctx.new_str_value("function () { ... }")?)),
    _ => Ok(Value::Str(ctx.new_str_value("[object Object]")?)),
  }
}

// `Array.prototype.toString` flavor used during coercion. Depth-capped so a
// self-referential array terminates with an error instead of recursing.
fn array_join_for_coercion(ctx: &mut EvalCtx, id: crate::value::ObjId, depth: u32) -> VmResult<String> {
  if depth > 32 {
    return Err(ctx.throw_range_error("Maximum coercion depth exceeded"));
  }
  let len = match &ctx.heap.obj(id).kind {
    ObjKind::Array(elems) => elems.len(),
    _ => 0,
  };
  let mut out = String::new();
  for i in 0..len {
    if i > 0 {
      out.push(',');
    }
    let elem = match &ctx.heap.obj(id).kind {
      ObjKind::Array(elems) => elems[i].clone(),
      _ => Value::Undefined,
    };
    match elem {
      Value::Undefined | Value::Null => {}
      Value::Object(inner) if matches!(ctx.heap.obj(inner).kind, ObjKind::Array(_)) => {
        out.push_str(&array_join_for_coercion(ctx, inner, depth + 1)?);
      }
      other => {
        let s = to_str(ctx, &other)?;
        out.push_str(&s);
      }
    }
  }
  Ok(out)
}

pub(crate) fn to_number(ctx: &mut EvalCtx, value: &Value) -> VmResult<f64> {
  match value {
    Value::Undefined => Ok(f64::NAN),
    Value::Null => Ok(0.0),
    Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
    Value::Number(n) => Ok(*n),
    Value::Str(s) => Ok(string_to_number(s)),
    Value::Object(_) => {
      let prim = to_primitive(ctx, value, PrimitiveHint::Number)?;
      match prim {
        Value::Object(_) => Ok(f64::NAN),
        other => to_number(ctx, &other),
      }
    }
  }
}

pub(crate) fn string_to_number(raw: &str) -> f64 {
  let trimmed = raw.trim_matches(is_ecma_whitespace);

  if trimmed.is_empty() {
    return 0.0;
  }

  // Infinity is case-sensitive in ECMAScript string numeric literals.
  match trimmed {
    "Infinity" | "+Infinity" => return f64::INFINITY,
    "-Infinity" => return f64::NEG_INFINITY,
    _ => {}
  }

  // Guard against Rust accepting "inf"/"infinity" case-insensitively.
  let rest = trimmed
    .strip_prefix('+')
    .or_else(|| trimmed.strip_prefix('-'))
    .unwrap_or(trimmed);
  if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
    return f64::NAN;
  }

  if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
    return parse_ascii_int_radix(hex, 16).unwrap_or(f64::NAN);
  }
  if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
    return parse_ascii_int_radix(bin, 2).unwrap_or(f64::NAN);
  }
  if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
    return parse_ascii_int_radix(oct, 8).unwrap_or(f64::NAN);
  }

  trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_ascii_int_radix(s: &str, radix: u32) -> Option<f64> {
  if s.is_empty() {
    return None;
  }
  let radix_f = radix as f64;
  let mut value = 0.0f64;
  for b in s.bytes() {
    let digit = match b {
      b'0'..=b'9' => (b - b'0') as u32,
      b'a'..=b'f' => (b - b'a' + 10) as u32,
      b'A'..=b'F' => (b - b'A' + 10) as u32,
      _ => return None,
    };
    if digit >= radix {
      return None;
    }
    value = value * radix_f + digit as f64;
  }
  Some(value)
}

fn is_ecma_whitespace(c: char) -> bool {
  matches!(
    c,
    '\u{0009}'
      | '\u{000A}'
      | '\u{000B}'
      | '\u{000C}'
      | '\u{000D}'
      | '\u{0020}'
      | '\u{00A0}'
      | '\u{1680}'
      | '\u{2000}'..='\u{200A}'
      | '\u{2028}'
      | '\u{2029}'
      | '\u{202F}'
      | '\u{205F}'
      | '\u{3000}'
      | '\u{FEFF}'
  )
}

pub(crate) fn number_to_string(n: f64) -> String {
  JsNumber(n).to_string()
}

/// `ToString`, charging the accountant for any newly built string.
pub(crate) fn to_str(ctx: &mut EvalCtx, value: &Value) -> VmResult<JsStr> {
  match value {
    Value::Undefined => ctx.new_str_value("undefined"),
    Value::Null => ctx.new_str_value("null"),
    Value::Bool(true) => ctx.new_str_value("true"),
    Value::Bool(false) => ctx.new_str_value("false"),
    Value::Number(n) => ctx.new_str_from_string(number_to_string(*n)),
    Value::Str(s) => Ok(s.clone()),
    Value::Object(_) => {
      let prim = to_primitive(ctx, value, PrimitiveHint::Default)?;
      match prim {
        Value::Object(_) => ctx.new_str_value("[object Object]"),
        other => to_str(ctx, &other),
      }
    }
  }
}

/// `ToInt32` (ECMA-262 7.1.6).
pub(crate) fn to_int32(n: f64) -> i32 {
  to_uint32(n) as i32
}

/// `ToUint32` (ECMA-262 7.1.7).
pub(crate) fn to_uint32(n: f64) -> u32 {
  if n.is_nan() || n == 0.0 || !n.is_finite() {
    return 0;
  }
  const TWO_32: f64 = 4_294_967_296.0;
  let mut int = n.trunc() % TWO_32;
  if int < 0.0 {
    int += TWO_32;
  }
  int as u32
}

/// Strict Equality Comparison (`===`).
pub(crate) fn strict_equals(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Undefined, Value::Undefined) => true,
    (Value::Null, Value::Null) => true,
    (Value::Bool(x), Value::Bool(y)) => x == y,
    (Value::Number(x), Value::Number(y)) => x == y,
    (Value::Str(x), Value::Str(y)) => x == y,
    (Value::Object(x), Value::Object(y)) => x == y,
    _ => false,
  }
}

/// Abstract Equality Comparison (`==`).
pub(crate) fn abstract_equality(ctx: &mut EvalCtx, a: &Value, b: &Value) -> VmResult<bool> {
  let mut a = a.clone();
  let mut b = b.clone();

  loop {
    match (&a, &b) {
      // Same-type comparisons use Strict Equality Comparison.
      (Value::Undefined, Value::Undefined)
      | (Value::Null, Value::Null)
      | (Value::Bool(_), Value::Bool(_))
      | (Value::Number(_), Value::Number(_))
      | (Value::Str(_), Value::Str(_))
      | (Value::Object(_), Value::Object(_)) => return Ok(strict_equals(&a, &b)),

      // `null == undefined`
      (Value::Undefined, Value::Null) | (Value::Null, Value::Undefined) => return Ok(true),

      // Number/string conversions.
      (Value::Number(_), Value::Str(s)) => {
        b = Value::Number(string_to_number(s));
      }
      (Value::Str(s), Value::Number(_)) => {
        a = Value::Number(string_to_number(s));
      }

      // Boolean conversions.
      (Value::Bool(x), _) => {
        a = Value::Number(if *x { 1.0 } else { 0.0 });
      }
      (_, Value::Bool(y)) => {
        b = Value::Number(if *y { 1.0 } else { 0.0 });
      }

      // Object-to-primitive conversions.
      (Value::Object(_), Value::Str(_) | Value::Number(_)) => {
        let prim = to_primitive(ctx, &a, PrimitiveHint::Default)?;
        if matches!(prim, Value::Object(_)) {
          return Ok(false);
        }
        a = prim;
      }
      (Value::Str(_) | Value::Number(_), Value::Object(_)) => {
        let prim = to_primitive(ctx, &b, PrimitiveHint::Default)?;
        if matches!(prim, Value::Object(_)) {
          return Ok(false);
        }
        b = prim;
      }

      _ => return Ok(false),
    }
  }
}

/// The `+` operator: string concatenation when either primitive is a string,
/// numeric addition otherwise.
pub(crate) fn add_values(ctx: &mut EvalCtx, a: &Value, b: &Value) -> VmResult<Value> {
  let pa = to_primitive(ctx, a, PrimitiveHint::Default)?;
  let pb = to_primitive(ctx, b, PrimitiveHint::Default)?;
  if matches!(pa, Value::Str(_)) || matches!(pb, Value::Str(_)) {
    let sa = to_str(ctx, &pa)?;
    let sb = to_str(ctx, &pb)?;
    let mut out = String::with_capacity(sa.len() + sb.len());
    out.push_str(&sa);
    out.push_str(&sb);
    return Ok(Value::Str(ctx.new_str_from_string(out)?));
  }
  let na = to_number(ctx, &pa)?;
  let nb = to_number(ctx, &pb)?;
  Ok(Value::Number(na + nb))
}

/// Abstract Relational Comparison. `None` means "undefined" (a NaN operand).
pub(crate) fn less_than(ctx: &mut EvalCtx, a: &Value, b: &Value) -> VmResult<Option<bool>> {
  let pa = to_primitive(ctx, a, PrimitiveHint::Number)?;
  let pb = to_primitive(ctx, b, PrimitiveHint::Number)?;
  if let (Value::Str(x), Value::Str(y)) = (&pa, &pb) {
    return Ok(Some(x.as_ref() < y.as_ref()));
  }
  let na = to_number(ctx, &pa)?;
  let nb = to_number(ctx, &pb)?;
  if na.is_nan() || nb.is_nan() {
    return Ok(None);
  }
  Ok(Some(na < nb))
}
