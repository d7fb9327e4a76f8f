use crate::ctx::EvalCtx;
use crate::env::BindingKind;
use crate::error::Fault;
use crate::error::VmResult;
use crate::func::Callable;
use crate::func::NativeFn;
use crate::heap::ObjKind;
use crate::ops;
use crate::value::Value;
use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Timelike;
use chrono::Utc;

/// Dates are a UTC epoch-milliseconds payload; all getters and formatting are
/// UTC so executions behave identically regardless of host timezone.

pub(crate) fn install_date_namespace(ctx: &mut EvalCtx) -> VmResult<()> {
  let id = ctx.alloc(ObjKind::Function(Callable::Native {
    name: "Date",
    f: native_date_call,
  }))?;
  ctx.declare_binding(ctx.global_env, "Date", BindingKind::Fn, Value::Object(id), true)?;

  let now = ctx.alloc(ObjKind::Function(Callable::Native {
    name: "now",
    f: native_date_now,
  }))?;
  let key = ctx.new_str_value("now")?;
  ctx
    .heap
    .set_prop(id, key, Value::Object(now))
    .map_err(Fault::limit)?;
  Ok(())
}

fn now_ms() -> f64 {
  Utc::now().timestamp_millis() as f64
}

fn native_date_now(_ctx: &mut EvalCtx, _this: Value, _args: &[Value]) -> VmResult<Value> {
  Ok(Value::Number(now_ms()))
}

fn native_date_call(ctx: &mut EvalCtx, _this: Value, args: &[Value]) -> VmResult<Value> {
  let epoch = match args.len() {
    0 => now_ms(),
    1 => match &args[0] {
      Value::Str(s) => parse_date_string(s).unwrap_or(f64::NAN),
      Value::Object(id) => match &ctx.heap.obj(*id).kind {
        ObjKind::Date(epoch) => *epoch,
        _ => f64::NAN,
      },
      other => ops::to_number(ctx, other)?,
    },
    _ => {
      let mut parts = [0.0f64; 7];
      // new Date(y, m, d = 1, h = 0, min = 0, s = 0, ms = 0)
      parts[2] = 1.0;
      for (i, slot) in parts.iter_mut().enumerate() {
        if let Some(value) = args.get(i) {
          *slot = ops::to_number(ctx, value)?;
        }
      }
      epoch_from_components(parts).unwrap_or(f64::NAN)
    }
  };
  Ok(Value::Object(ctx.alloc(ObjKind::Date(epoch))?))
}

fn epoch_from_components(parts: [f64; 7]) -> Option<f64> {
  if parts.iter().any(|p| p.is_nan() || p.is_infinite()) {
    return None;
  }
  let mut year = parts[0] as i64;
  // Two-digit years mean 19xx.
  if (0..=99).contains(&year) {
    year += 1900;
  }
  let month = parts[1] as i64;
  // Month is zero-based and overflows into the year.
  year += month.div_euclid(12);
  let month0 = month.rem_euclid(12);

  let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month0 as u32 + 1, 1)?;
  let base = Utc
    .from_utc_datetime(&date.and_hms_opt(0, 0, 0)?)
    .timestamp_millis() as f64;

  let day_ms = 86_400_000.0;
  let total = base
    + (parts[2] - 1.0) * day_ms
    + parts[3] * 3_600_000.0
    + parts[4] * 60_000.0
    + parts[5] * 1_000.0
    + parts[6];
  Some(total)
}

fn parse_date_string(s: &str) -> Option<f64> {
  let trimmed = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
    return Some(dt.timestamp_millis() as f64);
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(Utc.from_utc_datetime(&dt).timestamp_millis() as f64);
  }
  if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
    let dt = date.and_hms_opt(0, 0, 0)?;
    return Some(Utc.from_utc_datetime(&dt).timestamp_millis() as f64);
  }
  None
}

fn this_date(ctx: &mut EvalCtx, this: &Value) -> VmResult<f64> {
  if let Value::Object(id) = this {
    if let ObjKind::Date(epoch) = &ctx.heap.obj(*id).kind {
      return Ok(*epoch);
    }
  }
  Err(ctx.throw_type_error("Receiver is not a Date"))
}

fn date_time(epoch: f64) -> Option<DateTime<Utc>> {
  if epoch.is_nan() || epoch.is_infinite() {
    return None;
  }
  Utc.timestamp_millis_opt(epoch as i64).single()
}

pub(crate) fn format_iso_string(epoch: f64) -> Option<String> {
  date_time(epoch).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

pub(crate) fn format_date_string(epoch: f64) -> String {
  match date_time(epoch) {
    Some(dt) => dt
      .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
      .to_string(),
    None => "Invalid Date".to_string(),
  }
}

pub(crate) fn date_method_fn(name: &str) -> Option<NativeFn> {
  Some(match name {
    "getDate" => native_date_get_date,
    "getDay" => native_date_get_day,
    "getFullYear" => native_date_get_full_year,
    "getHours" => native_date_get_hours,
    "getMilliseconds" => native_date_get_milliseconds,
    "getMinutes" => native_date_get_minutes,
    "getMonth" => native_date_get_month,
    "getSeconds" => native_date_get_seconds,
    "getTime" => native_date_get_time,
    "toISOString" => native_date_to_iso_string,
    "toString" => native_date_to_string,
    "valueOf" => native_date_get_time,
    _ => return None,
  })
}

fn native_date_get_date(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.day() as f64)
}

fn native_date_get_day(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.weekday().num_days_from_sunday() as f64)
}

fn native_date_get_full_year(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.year() as f64)
}

fn native_date_get_hours(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.hour() as f64)
}

fn native_date_get_milliseconds(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.timestamp_subsec_millis() as f64)
}

fn native_date_get_minutes(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.minute() as f64)
}

fn native_date_get_month(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.month0() as f64)
}

fn native_date_get_seconds(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  date_part(ctx, &this, |dt| dt.second() as f64)
}

fn date_part(ctx: &mut EvalCtx, this: &Value, f: impl FnOnce(DateTime<Utc>) -> f64) -> VmResult<Value> {
  let epoch = this_date(ctx, this)?;
  Ok(Value::Number(date_time(epoch).map(f).unwrap_or(f64::NAN)))
}

fn native_date_get_time(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let epoch = this_date(ctx, &this)?;
  Ok(Value::Number(epoch))
}

fn native_date_to_iso_string(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let epoch = this_date(ctx, &this)?;
  match format_iso_string(epoch) {
    Some(s) => Ok(Value::Str(ctx.new_str_from_string(s)?)),
    None => Err(ctx.throw_range_error("Invalid time value")),
  }
}

fn native_date_to_string(ctx: &mut EvalCtx, this: Value, _args: &[Value]) -> VmResult<Value> {
  let epoch = this_date(ctx, &this)?;
  let s = format_date_string(epoch);
  Ok(Value::Str(ctx.new_str_from_string(s)?))
}
