use crate::ctx::EvalCtx;
use crate::env::BindingKind;
use crate::error::Fault;
use crate::error::VmResult;
use crate::func::Callable;
use crate::heap::ObjKind;
use crate::ops;
use crate::value::ObjId;
use crate::value::Value;

pub(crate) fn install_json_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let id = ctx.alloc(ObjKind::Ordinary)?;
  ctx.declare_binding(ctx.global_env, "JSON", BindingKind::Fn, Value::Object(id), true)?;

  for (name, f) in [
    ("parse", native_json_parse as crate::func::NativeFn),
    ("stringify", native_json_stringify),
  ] {
    let func = ctx.alloc(ObjKind::Function(Callable::Native { name, f }))?;
    let key = ctx.new_str_value(name)?;
    ctx
      .heap
      .set_prop(id, key, Value::Object(func))
      .map_err(Fault::limit)?;
  }
  Ok(())
}

fn native_json_parse(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let text = match args.first() {
    Some(value) => ops::to_str(ctx, value)?,
    None => return Err(ctx.make_error_fault("SyntaxError", "Unexpected end of JSON input")),
  };
  if args.get(1).is_some_and(|v| !v.is_undefined()) {
    return Err(ctx.throw_type_error("JSON.parse reviver functions are not supported"));
  }

  let parsed: serde_json::Value = match serde_json::from_str(&text) {
    Ok(parsed) => parsed,
    Err(err) => {
      let message = format!("JSON.parse: {err}");
      return Err(ctx.make_error_fault("SyntaxError", &message));
    }
  };
  json_to_value(ctx, &parsed)
}

fn json_to_value(ctx: &mut EvalCtx, json: &serde_json::Value) -> VmResult<Value> {
  Ok(match json {
    serde_json::Value::Null => Value::Null,
    serde_json::Value::Bool(b) => Value::Bool(*b),
    serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
    serde_json::Value::String(s) => Value::Str(ctx.new_str_value(s)?),
    serde_json::Value::Array(values) => {
      let mut elems = Vec::with_capacity(values.len());
      for value in values {
        elems.push(json_to_value(ctx, value)?);
      }
      ctx.alloc_array(elems)?
    }
    serde_json::Value::Object(map) => {
      let id = ctx.alloc(ObjKind::Ordinary)?;
      for (key, value) in map {
        let value = json_to_value(ctx, value)?;
        let key = ctx.new_str_value(key)?;
        ctx.heap.set_prop(id, key, value).map_err(Fault::limit)?;
      }
      Value::Object(id)
    }
  })
}

fn native_json_stringify(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let value = args.first().cloned().unwrap_or(Value::Undefined);
  if args.get(1).is_some_and(|v| !v.is_nullish()) {
    return Err(ctx.throw_type_error("JSON.stringify replacer functions are not supported"));
  }

  let indent = match args.get(2) {
    None | Some(Value::Undefined) | Some(Value::Null) => String::new(),
    Some(Value::Number(n)) => {
      let count = (*n as usize).min(10);
      " ".repeat(count)
    }
    Some(Value::Str(s)) => s.chars().take(10).collect(),
    Some(_) => String::new(),
  };

  let mut visiting: Vec<ObjId> = Vec::new();
  let mut out = String::new();
  let wrote = stringify_value(ctx, &value, &indent, 0, &mut visiting, &mut out)?;
  if !wrote {
    return Ok(Value::Undefined);
  }
  Ok(Value::Str(ctx.new_str_from_string(out)?))
}

/// Serializes `value` into `out`. Returns `false` for values JSON omits
/// entirely (`undefined` and functions).
fn stringify_value(
  ctx: &mut EvalCtx,
  value: &Value,
  indent: &str,
  depth: usize,
  visiting: &mut Vec<ObjId>,
  out: &mut String,
) -> VmResult<bool> {
  match value {
    Value::Undefined => Ok(false),
    Value::Null => {
      out.push_str("null");
      Ok(true)
    }
    Value::Bool(b) => {
      out.push_str(if *b { "true" } else { "false" });
      Ok(true)
    }
    Value::Number(n) => {
      if n.is_finite() {
        out.push_str(&ops::number_to_string(*n));
      } else {
        out.push_str("null");
      }
      Ok(true)
    }
    Value::Str(s) => {
      push_json_string(out, s);
      Ok(true)
    }
    Value::Object(id) => {
      if visiting.contains(id) {
        return Err(ctx.throw_type_error("Converting circular structure to JSON"));
      }
      match &ctx.heap.obj(*id).kind {
        ObjKind::Function(_) => return Ok(false),
        ObjKind::Date(epoch) => {
          match crate::date::format_iso_string(*epoch) {
            Some(iso) => push_json_string(out, &iso),
            None => out.push_str("null"),
          }
          return Ok(true);
        }
        _ => {}
      }

      visiting.push(*id);
      let result = stringify_object(ctx, *id, indent, depth, visiting, out);
      visiting.pop();
      result
    }
  }
}

fn stringify_object(
  ctx: &mut EvalCtx,
  id: ObjId,
  indent: &str,
  depth: usize,
  visiting: &mut Vec<ObjId>,
  out: &mut String,
) -> VmResult<bool> {
  let is_array = matches!(ctx.heap.obj(id).kind, ObjKind::Array(_));

  if is_array {
    let elems = match &ctx.heap.obj(id).kind {
      ObjKind::Array(elems) => elems.clone(),
      _ => Vec::new(),
    };
    out.push('[');
    for (i, elem) in elems.iter().enumerate() {
      ctx.tick()?;
      if i > 0 {
        out.push(',');
      }
      push_newline_indent(out, indent, depth + 1);
      // Array holes and unserializable elements become null.
      if !stringify_value(ctx, elem, indent, depth + 1, visiting, out)? {
        out.push_str("null");
      }
    }
    if !elems.is_empty() {
      push_newline_indent(out, indent, depth);
    }
    out.push(']');
    return Ok(true);
  }

  let keys = ctx.own_keys(id)?;
  let base = Value::Object(id);
  out.push('{');
  let mut wrote_any = false;
  for key in keys {
    ctx.tick()?;
    let value = ctx.get_property(&base, &key)?;
    let mut piece = String::new();
    if !stringify_value(ctx, &value, indent, depth + 1, visiting, &mut piece)? {
      continue;
    }
    if wrote_any {
      out.push(',');
    }
    push_newline_indent(out, indent, depth + 1);
    push_json_string(out, &key);
    out.push(':');
    if !indent.is_empty() {
      out.push(' ');
    }
    out.push_str(&piece);
    wrote_any = true;
  }
  if wrote_any {
    push_newline_indent(out, indent, depth);
  }
  out.push('}');
  Ok(true)
}

fn push_newline_indent(out: &mut String, indent: &str, depth: usize) {
  if indent.is_empty() {
    return;
  }
  out.push('\n');
  for _ in 0..depth {
    out.push_str(indent);
  }
}

fn push_json_string(out: &mut String, s: &str) {
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\u{0008}' => out.push_str("\\b"),
      '\u{000C}' => out.push_str("\\f"),
      c if (c as u32) < 0x20 => {
        out.push_str(&format!("\\u{:04x}", c as u32));
      }
      c => out.push(c),
    }
  }
  out.push('"');
}
