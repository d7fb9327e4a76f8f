use crate::budget::Budget;
use crate::budget::InterruptToken;
use crate::env::BindingKind;
use crate::env::Binding;
use crate::env::EnvArena;
use crate::env::EnvId;
use crate::env::BINDING_BYTES;
use crate::env::ENV_FRAME_BYTES;
use crate::error::Fault;
use crate::error::LimitKind;
use crate::error::VmResult;
use crate::func::Callable;
use crate::heap::Heap;
use crate::heap::ObjKind;
use crate::heap::ELEM_SLOT_BYTES;
use crate::host::HostError;
use crate::host::JsValue;
use crate::ops;
use crate::script::ScriptData;
use crate::value::JsStr;
use crate::value::ObjId;
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;

/// A single execution's runtime state: object heap, environment arena, budget
/// counters, and the shared (immutable) parsed script.
///
/// Created per evaluation, confined to one thread, and dropped wholesale at
/// the end; two executions of the same [`crate::ParsedScript`] share nothing
/// but the AST.
pub struct EvalCtx {
  pub(crate) heap: Heap,
  pub(crate) envs: EnvArena,
  pub(crate) global_env: EnvId,
  /// The currently active lexical environment frame.
  pub(crate) lexical_env: EnvId,
  pub(crate) budget: Budget,
  pub(crate) call_depth: usize,
  pub(crate) max_call_depth: usize,
  pub(crate) script: Arc<ScriptData>,
  /// Set when a budget trips inside a host-facing API that cannot return a
  /// fault directly; the interpreter re-raises it as an uncatchable limit as
  /// soon as control returns.
  pub(crate) pending_limit: Option<LimitKind>,
  /// `Math.random` state (xorshift64*); seeded from the wall clock at context
  /// creation.
  rng_state: u64,
}

impl EvalCtx {
  pub(crate) fn new(
    script: Arc<ScriptData>,
    max_ops: u64,
    max_mem_bytes: usize,
    timeout: Duration,
    max_call_depth: usize,
    check_time_every: u32,
    interrupt: InterruptToken,
  ) -> Result<EvalCtx, LimitKind> {
    let mut heap = Heap::new(max_mem_bytes);
    let mut envs = EnvArena::new();
    heap.charge(ENV_FRAME_BYTES)?;
    let global_env = envs.create(None);

    let seed = std::time::SystemTime::now()
      .duration_since(std::time::UNIX_EPOCH)
      .map(|d| d.as_nanos() as u64)
      .unwrap_or(0x9E37_79B9_7F4A_7C15)
      | 1;

    Ok(EvalCtx {
      heap,
      envs,
      global_env,
      lexical_env: global_env,
      budget: Budget::new(max_ops, timeout, check_time_every, interrupt),
      call_depth: 0,
      max_call_depth,
      script,
      pending_limit: None,
      rng_state: seed,
    })
  }

  /// A uniform sample in `[0, 1)` from a per-context xorshift64* generator.
  pub(crate) fn next_random(&mut self) -> f64 {
    let mut x = self.rng_state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    self.rng_state = x;
    let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
    (bits >> 11) as f64 / (1u64 << 53) as f64
  }

  // ---- Metering ----

  #[inline]
  pub(crate) fn tick(&mut self) -> VmResult<()> {
    self.budget.tick().map_err(Fault::limit)
  }

  pub(crate) fn charge(&mut self, bytes: usize) -> VmResult<()> {
    self.heap.charge(bytes).map_err(Fault::limit)
  }

  pub fn ops(&self) -> u64 {
    self.budget.ops()
  }

  pub fn mem_bytes(&self) -> usize {
    self.heap.allocated_bytes()
  }

  // ---- Allocation ----

  pub(crate) fn new_str_value(&mut self, s: &str) -> VmResult<JsStr> {
    self.heap.new_str(s).map_err(Fault::limit)
  }

  pub(crate) fn new_str_from_string(&mut self, s: String) -> VmResult<JsStr> {
    self.heap.new_str_from_string(s).map_err(Fault::limit)
  }

  pub(crate) fn alloc(&mut self, kind: ObjKind) -> VmResult<ObjId> {
    self.heap.alloc(kind).map_err(Fault::limit)
  }

  pub(crate) fn alloc_array(&mut self, elems: Vec<Value>) -> VmResult<Value> {
    Ok(Value::Object(self.alloc(ObjKind::Array(elems))?))
  }

  pub(crate) fn new_env(&mut self, parent: Option<EnvId>) -> VmResult<EnvId> {
    self.charge(ENV_FRAME_BYTES)?;
    Ok(self.envs.create(parent))
  }

  /// Creates (or re-initializes) a binding in `env`, charging for new slots.
  pub(crate) fn declare_binding(
    &mut self,
    env: EnvId,
    name: &str,
    kind: BindingKind,
    value: Value,
    initialized: bool,
  ) -> VmResult<()> {
    if !self.envs.frame(env).bindings.contains_key(name) {
      self.charge(BINDING_BYTES + name.len())?;
    }
    self.envs.frame_mut(env).bindings.insert(name.to_string(), Binding {
      kind,
      value,
      initialized,
    });
    Ok(())
  }

  // ---- Errors ----

  /// Builds a thrown error object `{name, message}` and the fault carrying it.
  /// If even that allocation exceeds the memory budget, the memory limit wins.
  pub(crate) fn make_error_fault(&mut self, name: &str, message: &str) -> Fault {
    match self.build_error_value(name, message) {
      Ok(value) => Fault::thrown(value, message.to_string()),
      Err(fault) => fault,
    }
  }

  fn build_error_value(&mut self, name: &str, message: &str) -> VmResult<Value> {
    let id = self.alloc(ObjKind::Ordinary)?;
    let name_key = self.new_str_value("name")?;
    let name_value = self.new_str_value(name)?;
    let message_key = self.new_str_value("message")?;
    let message_value = self.new_str_value(message)?;
    self.heap.set_prop(id, name_key, Value::Str(name_value)).map_err(Fault::limit)?;
    self
      .heap
      .set_prop(id, message_key, Value::Str(message_value))
      .map_err(Fault::limit)?;
    Ok(Value::Object(id))
  }

  pub(crate) fn throw_type_error(&mut self, message: &str) -> Fault {
    self.make_error_fault("TypeError", message)
  }

  pub(crate) fn throw_range_error(&mut self, message: &str) -> Fault {
    self.make_error_fault("RangeError", message)
  }

  pub(crate) fn throw_reference_error(&mut self, message: &str) -> Fault {
    self.make_error_fault("ReferenceError", message)
  }

  pub(crate) fn throw_error(&mut self, message: &str) -> Fault {
    self.make_error_fault("Error", message)
  }

  pub(crate) fn nullish_property_fault(&mut self, base: &Value) -> Fault {
    let message = match base {
      Value::Null => "Type NULL has no properties",
      _ => "Type UNDEFINED has no properties",
    };
    self.throw_type_error(message)
  }

  /// A host-visible description of a value, for error messages and
  /// extraction. Never charges the accountant.
  pub(crate) fn display_value(&self, value: &Value) -> String {
    match value {
      Value::Undefined => "undefined".to_string(),
      Value::Null => "null".to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Number(n) => ops::number_to_string(*n),
      Value::Str(s) => s.to_string(),
      Value::Object(id) => match &self.heap.obj(*id).kind {
        ObjKind::Function(callable) => match callable.name() {
          Some(name) => format!("function {name}() {{ ... }}"),
          None => "function () { ... }".to_string(),
        },
        ObjKind::Date(epoch) => crate::date::format_date_string(*epoch),
        ObjKind::Ordinary => "[object Object]".to_string(),
        kind => format!("[object {}]", kind.class_name()),
      },
    }
  }

  /// The message reported when an arbitrary script value is thrown and never
  /// caught: error-shaped objects render as `Name: message`.
  pub(crate) fn thrown_message(&self, value: &Value) -> String {
    if let Value::Object(id) = value {
      let obj = self.heap.obj(*id);
      if let (Some(Value::Str(name)), Some(Value::Str(message))) =
        (obj.props.get("name"), obj.props.get("message"))
      {
        return format!("{name}: {message}");
      }
    }
    self.display_value(value)
  }

  // ---- Property operations ----

  pub(crate) fn get_property(&mut self, base: &Value, key: &str) -> VmResult<Value> {
    match base {
      Value::Undefined | Value::Null => Err(self.nullish_property_fault(base)),
      Value::Str(s) => self.get_string_property(s.clone(), key),
      Value::Number(_) | Value::Bool(_) => {
        match crate::builtins::primitive_method_fn(base, key) {
          Some(f) => self.alloc_bound_native(key, base.clone(), f),
          None => Ok(Value::Undefined),
        }
      }
      Value::Object(id) => self.get_object_property(*id, base, key),
    }
  }

  fn get_string_property(&mut self, s: JsStr, key: &str) -> VmResult<Value> {
    if key == "length" {
      return Ok(Value::Number(s.encode_utf16().count() as f64));
    }
    if let Some(index) = crate::heap::array_index_key(key) {
      return match crate::builtins::string_char_at(&s, index as usize) {
        Some(c) => Ok(Value::Str(self.new_str_from_string(c)?)),
        None => Ok(Value::Undefined),
      };
    }
    match crate::builtins::string_method_fn(key) {
      Some(f) => self.alloc_bound_native(key, Value::Str(s), f),
      None => Ok(Value::Undefined),
    }
  }

  fn get_object_property(&mut self, id: ObjId, base: &Value, key: &str) -> VmResult<Value> {
    // Dynamic objects dispatch every access through the resolver.
    if let ObjKind::Dynamic(resolver) = &self.heap.obj(id).kind {
      let resolver = resolver.clone();
      let got = resolver.get(self, key);
      return match self.host_outcome(got)? {
        Some(value) => Ok(value),
        None => Ok(Value::Undefined),
      };
    }

    if let Some(value) = self.heap.obj(id).props.get(key) {
      return Ok(value.clone());
    }

    match &self.heap.obj(id).kind {
      ObjKind::Array(elems) => {
        if key == "length" {
          return Ok(Value::Number(elems.len() as f64));
        }
        if let Some(index) = crate::heap::array_index_key(key) {
          return Ok(elems.get(index as usize).cloned().unwrap_or(Value::Undefined));
        }
        match crate::builtins::array_method_fn(key) {
          Some(f) => self.alloc_bound_native(key, base.clone(), f),
          None => Ok(Value::Undefined),
        }
      }
      ObjKind::Date(_) => match crate::date::date_method_fn(key) {
        Some(f) => self.alloc_bound_native(key, base.clone(), f),
        None => Ok(Value::Undefined),
      },
      ObjKind::Function(callable) => {
        if key == "name" {
          let name = callable.name().unwrap_or("").to_string();
          return Ok(Value::Str(self.new_str_from_string(name)?));
        }
        Ok(Value::Undefined)
      }
      ObjKind::Host(data) => match data.method(key) {
        Some(method) => {
          let method = method.clone();
          let name = self.new_str_value(key)?;
          let id = self.alloc(ObjKind::Function(Callable::Host { name, method }))?;
          Ok(Value::Object(id))
        }
        None => Ok(Value::Undefined),
      },
      ObjKind::Ordinary | ObjKind::Dynamic(_) => Ok(Value::Undefined),
    }
  }

  fn alloc_bound_native(
    &mut self,
    name: &str,
    recv: Value,
    f: crate::func::NativeFn,
  ) -> VmResult<Value> {
    let name = self.new_str_value(name)?;
    let id = self.alloc(ObjKind::Function(Callable::BoundNative { name, recv, f }))?;
    Ok(Value::Object(id))
  }

  pub(crate) fn set_property(&mut self, base: &Value, key: &str, value: Value) -> VmResult<()> {
    match base {
      Value::Undefined | Value::Null => Err(self.nullish_property_fault(base)),
      Value::Str(_) | Value::Number(_) | Value::Bool(_) => {
        let message = format!(
          "Cannot create property '{key}' on {}",
          ops::type_of(self, base)
        );
        Err(self.throw_type_error(&message))
      }
      Value::Object(id) => self.set_object_property(*id, key, value),
    }
  }

  fn set_object_property(&mut self, id: ObjId, key: &str, value: Value) -> VmResult<()> {
    if let ObjKind::Dynamic(resolver) = &self.heap.obj(id).kind {
      let resolver = resolver.clone();
      let outcome = resolver.set(self, key, value);
      let accepted = self.host_outcome(outcome)?;
      if !accepted {
        let message = format!("Cannot set property '{key}'");
        return Err(self.throw_type_error(&message));
      }
      return Ok(());
    }

    if self.heap.obj(id).frozen {
      let message = format!("Cannot assign to read only property '{key}' of object");
      return Err(self.throw_type_error(&message));
    }

    if let ObjKind::Array(_) = &self.heap.obj(id).kind {
      if key == "length" {
        let new_len = match &value {
          Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => {
            *n as usize
          }
          _ => return Err(self.throw_range_error("Invalid array length")),
        };
        return self.array_set_length(id, new_len);
      }
      if let Some(index) = crate::heap::array_index_key(key) {
        return self.array_set_index(id, index as usize, value);
      }
      // Out-of-range and non-canonical integer keys fall through to ordinary
      // string-keyed property storage; `length` is unaffected.
    }

    let key = self.new_str_value(key)?;
    self.heap.set_prop(id, key, value).map_err(Fault::limit)?;
    Ok(())
  }

  /// Indexed array write; growing writes reify `length` and fill gaps with
  /// `undefined` holes, charging a slot per element.
  pub(crate) fn array_set_index(&mut self, id: ObjId, index: usize, value: Value) -> VmResult<()> {
    let len = match &self.heap.obj(id).kind {
      ObjKind::Array(elems) => elems.len(),
      _ => return Ok(()),
    };
    if index >= len {
      let grown = index + 1 - len;
      self.charge(grown.saturating_mul(ELEM_SLOT_BYTES))?;
    }
    if let ObjKind::Array(elems) = &mut self.heap.obj_mut(id).kind {
      if index >= elems.len() {
        elems.resize(index + 1, Value::Undefined);
      }
      elems[index] = value;
    }
    Ok(())
  }

  pub(crate) fn array_set_length(&mut self, id: ObjId, new_len: usize) -> VmResult<()> {
    let len = match &self.heap.obj(id).kind {
      ObjKind::Array(elems) => elems.len(),
      _ => return Ok(()),
    };
    if new_len > len {
      self.charge((new_len - len).saturating_mul(ELEM_SLOT_BYTES))?;
    }
    if let ObjKind::Array(elems) = &mut self.heap.obj_mut(id).kind {
      elems.resize(new_len, Value::Undefined);
    }
    Ok(())
  }

  pub(crate) fn array_push(&mut self, id: ObjId, value: Value) -> VmResult<usize> {
    self.charge(ELEM_SLOT_BYTES)?;
    if let ObjKind::Array(elems) = &mut self.heap.obj_mut(id).kind {
      elems.push(value);
      Ok(elems.len())
    } else {
      Ok(0)
    }
  }

  pub(crate) fn delete_property(&mut self, base: &Value, key: &str) -> VmResult<bool> {
    let Value::Object(id) = base else {
      if base.is_nullish() {
        return Err(self.nullish_property_fault(base));
      }
      return Ok(true);
    };

    if let ObjKind::Dynamic(resolver) = &self.heap.obj(*id).kind {
      let resolver = resolver.clone();
      let outcome = resolver.delete(self, key);
      return self.host_outcome(outcome);
    }

    if self.heap.obj(*id).frozen {
      let message = format!("Cannot delete property '{key}' of object");
      return Err(self.throw_type_error(&message));
    }

    if let ObjKind::Array(elems) = &mut self.heap.obj_mut(*id).kind {
      if let Some(index) = crate::heap::array_index_key(key) {
        if (index as usize) < elems.len() {
          // `delete arr[i]` leaves a hole; `length` is unchanged.
          elems[index as usize] = Value::Undefined;
          return Ok(true);
        }
      }
    }

    Ok(self.heap.obj_mut(*id).props.remove(key))
  }

  pub(crate) fn has_property(&mut self, base: &Value, key: &str) -> VmResult<bool> {
    match base {
      Value::Object(id) => {
        if let ObjKind::Dynamic(resolver) = &self.heap.obj(*id).kind {
          let resolver = resolver.clone();
          let got = resolver.get(self, key);
          return Ok(self.host_outcome(got)?.is_some());
        }
        if self.heap.obj(*id).props.contains(key) {
          return Ok(true);
        }
        match &self.heap.obj(*id).kind {
          ObjKind::Array(elems) => {
            if key == "length" {
              return Ok(true);
            }
            Ok(crate::heap::array_index_key(key).is_some_and(|i| (i as usize) < elems.len()))
          }
          ObjKind::Host(data) => Ok(data.method(key).is_some()),
          _ => Ok(false),
        }
      }
      _ => {
        let message = format!(
          "Cannot use 'in' operator to search for '{key}' in {}",
          self.display_value(base)
        );
        Err(self.throw_type_error(&message))
      }
    }
  }

  /// Own enumerable keys, in enumeration order (integer keys ascending, then
  /// string keys in insertion order; dynamic objects use the resolver's
  /// order).
  pub(crate) fn own_keys(&mut self, id: ObjId) -> VmResult<Vec<JsStr>> {
    match &self.heap.obj(id).kind {
      ObjKind::Dynamic(resolver) => {
        let resolver = resolver.clone();
        let outcome = resolver.enumerate(self);
        let entries = self.host_outcome(outcome)?;
        let mut keys = Vec::with_capacity(entries.len());
        for (name, _) in entries {
          keys.push(self.new_str_from_string(name)?);
        }
        Ok(keys)
      }
      ObjKind::Array(elems) => {
        let len = elems.len();
        let mut keys = Vec::with_capacity(len + self.heap.obj(id).props.len());
        for i in 0..len {
          keys.push(self.new_str_from_string(i.to_string())?);
        }
        keys.extend(self.heap.obj(id).props.keys_ordered());
        Ok(keys)
      }
      ObjKind::Host(data) => {
        let mut keys: Vec<JsStr> = self.heap.obj(id).props.keys_ordered();
        let method_names: Vec<JsStr> = data.methods.iter().map(|(name, _)| name.clone()).collect();
        keys.extend(method_names);
        Ok(keys)
      }
      _ => Ok(self.heap.obj(id).props.keys_ordered()),
    }
  }

  // ---- Host boundary ----

  /// Maps a host-callback result into the fault channel, re-raising any limit
  /// that tripped while the host held the context.
  pub(crate) fn host_outcome<T>(&mut self, result: Result<T, HostError>) -> VmResult<T> {
    if let Some(kind) = self.pending_limit.take() {
      return Err(Fault::limit(kind));
    }
    match result {
      Ok(value) => Ok(value),
      Err(err) => Err(self.make_error_fault("Error", &err.message)),
    }
  }

  fn host_guard<T>(&mut self, result: VmResult<T>) -> Result<T, HostError> {
    match result {
      Ok(value) => Ok(value),
      Err(fault) => match fault.kind {
        crate::error::FaultKind::Limit(kind) => {
          // Remember the tripped budget so the interpreter re-raises it as an
          // uncatchable fault once the host callback returns.
          self.pending_limit = Some(kind);
          Err(HostError::new(kind.message()))
        }
        crate::error::FaultKind::Thrown { message, .. } => Err(HostError::new(message)),
      },
    }
  }

  /// Marshals a host value tree into context values, charging the accountant
  /// for every allocation.
  pub fn make(&mut self, value: &JsValue) -> Result<Value, HostError> {
    let result = self.make_value(value);
    self.host_guard(result)
  }

  pub(crate) fn make_value(&mut self, value: &JsValue) -> VmResult<Value> {
    Ok(match value {
      JsValue::Undefined => Value::Undefined,
      JsValue::Null => Value::Null,
      JsValue::Bool(b) => Value::Bool(*b),
      JsValue::Int(n) => Value::Number(*n as f64),
      JsValue::Float(n) => Value::Number(*n),
      JsValue::Str(s) => Value::Str(self.new_str_value(s)?),
      JsValue::Array(values) => {
        let mut elems = Vec::with_capacity(values.len());
        for v in values {
          elems.push(self.make_value(v)?);
        }
        self.alloc_array(elems)?
      }
      JsValue::Object(entries) => {
        let id = self.alloc(ObjKind::Ordinary)?;
        for (key, v) in entries {
          let value = self.make_value(v)?;
          let key = self.new_str_value(key)?;
          self.heap.set_prop(id, key, value).map_err(Fault::limit)?;
        }
        Value::Object(id)
      }
    })
  }

  /// Deep-copies a context value out to the host. Functions become
  /// `undefined`; a reference that cycles back to a visited object becomes
  /// `null`. Host-bound output is not charged to the script accountant.
  pub fn take(&mut self, value: &Value) -> JsValue {
    let mut visiting = Vec::new();
    self.take_inner(value, &mut visiting)
  }

  fn take_inner(&mut self, value: &Value, visiting: &mut Vec<ObjId>) -> JsValue {
    match value {
      Value::Undefined => JsValue::Undefined,
      Value::Null => JsValue::Null,
      Value::Bool(b) => JsValue::Bool(*b),
      Value::Number(n) => number_to_js_value(*n),
      Value::Str(s) => JsValue::Str(s.to_string()),
      Value::Object(id) => {
        if visiting.contains(id) {
          return JsValue::Null;
        }
        visiting.push(*id);
        let result = match &self.heap.obj(*id).kind {
          ObjKind::Function(_) => JsValue::Undefined,
          ObjKind::Date(epoch) => JsValue::Float(*epoch),
          ObjKind::Array(elems) => {
            let elems = elems.clone();
            JsValue::Array(
              elems
                .iter()
                .map(|v| self.take_inner(v, visiting))
                .collect(),
            )
          }
          ObjKind::Dynamic(resolver) => {
            let resolver = resolver.clone();
            match resolver.enumerate(self) {
              Ok(entries) => JsValue::Object(
                entries
                  .iter()
                  .map(|(k, v)| (k.clone(), self.take_inner(v, visiting)))
                  .collect(),
              ),
              Err(_) => JsValue::Object(Vec::new()),
            }
          }
          _ => {
            let entries: Vec<(JsStr, Value)> = self
              .heap
              .obj(*id)
              .props
              .keys_ordered()
              .into_iter()
              .filter_map(|k| self.heap.obj(*id).props.get(&k).map(|v| (k.clone(), v.clone())))
              .collect();
            JsValue::Object(
              entries
                .iter()
                .map(|(k, v)| (k.to_string(), self.take_inner(v, visiting)))
                .collect(),
            )
          }
        };
        visiting.pop();
        result
      }
    }
  }

  // ---- Coercing extraction for host methods ----

  pub fn as_f64(&mut self, value: &Value) -> Result<f64, HostError> {
    let result = ops::to_number(self, value);
    self.host_guard(result)
  }

  pub fn as_i64(&mut self, value: &Value) -> Result<i64, HostError> {
    Ok(self.as_f64(value)?.trunc() as i64)
  }

  pub fn as_bool(&self, value: &Value) -> bool {
    ops::to_boolean(value)
  }

  pub fn as_str(&mut self, value: &Value) -> Result<String, HostError> {
    let result = ops::to_str(self, value);
    self.host_guard(result).map(|s| s.to_string())
  }

  /// Builds a script string from host data (charged).
  pub fn str_value(&mut self, s: &str) -> Result<Value, HostError> {
    let result = self.new_str_value(s);
    self.host_guard(result).map(Value::Str)
  }
}

pub(crate) fn number_to_js_value(n: f64) -> JsValue {
  const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
  if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
    JsValue::Int(n as i64)
  } else {
    JsValue::Float(n)
  }
}

impl std::fmt::Debug for EvalCtx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EvalCtx")
      .field("ops", &self.budget.ops())
      .field("mem_bytes", &self.heap.allocated_bytes())
      .field("call_depth", &self.call_depth)
      .finish_non_exhaustive()
  }
}
