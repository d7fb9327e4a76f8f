use crate::ctx::EvalCtx;
use crate::value::JsStr;
use crate::value::Value;
use std::fmt;
use std::fmt::Display;
use std::rc::Rc;

/// An owned, host-side value tree: the type of custom globals going into an
/// execution and of results coming out. Contains no handles into any context.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
  Undefined,
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  Array(Vec<JsValue>),
  Object(Vec<(String, JsValue)>),
}

impl JsValue {
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      JsValue::Int(n) => Some(*n as f64),
      JsValue::Float(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      JsValue::Str(s) => Some(s),
      _ => None,
    }
  }
}

impl From<i64> for JsValue {
  fn from(n: i64) -> JsValue {
    JsValue::Int(n)
  }
}

impl From<i32> for JsValue {
  fn from(n: i32) -> JsValue {
    JsValue::Int(n as i64)
  }
}

impl From<f64> for JsValue {
  fn from(n: f64) -> JsValue {
    JsValue::Float(n)
  }
}

impl From<bool> for JsValue {
  fn from(b: bool) -> JsValue {
    JsValue::Bool(b)
  }
}

impl From<&str> for JsValue {
  fn from(s: &str) -> JsValue {
    JsValue::Str(s.to_string())
  }
}

impl From<String> for JsValue {
  fn from(s: String) -> JsValue {
    JsValue::Str(s)
  }
}

impl<T: Into<JsValue>> From<Vec<T>> for JsValue {
  fn from(values: Vec<T>) -> JsValue {
    JsValue::Array(values.into_iter().map(Into::into).collect())
  }
}

/// A failure reported by host code (methods, resolvers). It surfaces to the
/// script as a catchable thrown error; budget exhaustion is never reported
/// this way.
#[derive(Debug, Clone)]
pub struct HostError {
  pub message: String,
}

impl HostError {
  pub fn new(message: impl Into<String>) -> HostError {
    HostError {
      message: message.into(),
    }
  }
}

impl Display for HostError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl std::error::Error for HostError {}

pub type HostResult = Result<Value, HostError>;

type HostFnDyn = dyn Fn(&mut EvalCtx, &[Value]) -> HostResult;

/// A host-registered callable: fixed arity (missing arguments are padded with
/// `undefined`, extras dropped) or varargs.
#[derive(Clone)]
pub struct HostMethod {
  pub(crate) arity: Option<u8>,
  pub(crate) f: Rc<HostFnDyn>,
}

impl HostMethod {
  pub(crate) fn invoke(&self, ctx: &mut EvalCtx, args: &[Value]) -> HostResult {
    match self.arity {
      None => (self.f)(ctx, args),
      Some(arity) => {
        let mut fixed: Vec<Value> = Vec::with_capacity(arity as usize);
        for i in 0..arity as usize {
          fixed.push(args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        (self.f)(ctx, &fixed)
      }
    }
  }
}

/// Builder for a host object exposed to scripts as a global: named constants
/// (marshalled once at context startup), fixed-arity methods, and varargs
/// methods. Dispatch is a plain per-object table; nothing here is reflective.
#[derive(Clone)]
pub struct HostObjectDef {
  pub(crate) name: String,
  pub(crate) constants: Vec<(String, JsValue)>,
  pub(crate) methods: Vec<(String, HostMethod)>,
}

impl HostObjectDef {
  pub fn new(name: impl Into<String>) -> HostObjectDef {
    HostObjectDef {
      name: name.into(),
      constants: Vec::new(),
      methods: Vec::new(),
    }
  }

  pub fn constant(mut self, name: impl Into<String>, value: JsValue) -> Self {
    self.constants.push((name.into(), value));
    self
  }

  pub fn method0(mut self, name: impl Into<String>, f: impl Fn(&mut EvalCtx) -> HostResult + 'static) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: Some(0),
      f: Rc::new(move |ctx, _args| f(ctx)),
    }));
    self
  }

  pub fn method1(
    mut self,
    name: impl Into<String>,
    f: impl Fn(&mut EvalCtx, Value) -> HostResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: Some(1),
      f: Rc::new(move |ctx, args| {
        let a = args.first().cloned().unwrap_or(Value::Undefined);
        f(ctx, a)
      }),
    }));
    self
  }

  pub fn method2(
    mut self,
    name: impl Into<String>,
    f: impl Fn(&mut EvalCtx, Value, Value) -> HostResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: Some(2),
      f: Rc::new(move |ctx, args| {
        let a = args.first().cloned().unwrap_or(Value::Undefined);
        let b = args.get(1).cloned().unwrap_or(Value::Undefined);
        f(ctx, a, b)
      }),
    }));
    self
  }

  pub fn method3(
    mut self,
    name: impl Into<String>,
    f: impl Fn(&mut EvalCtx, Value, Value, Value) -> HostResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: Some(3),
      f: Rc::new(move |ctx, args| {
        let a = args.first().cloned().unwrap_or(Value::Undefined);
        let b = args.get(1).cloned().unwrap_or(Value::Undefined);
        let c = args.get(2).cloned().unwrap_or(Value::Undefined);
        f(ctx, a, b, c)
      }),
    }));
    self
  }

  pub fn method4(
    mut self,
    name: impl Into<String>,
    f: impl Fn(&mut EvalCtx, Value, Value, Value, Value) -> HostResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: Some(4),
      f: Rc::new(move |ctx, args| {
        let a = args.first().cloned().unwrap_or(Value::Undefined);
        let b = args.get(1).cloned().unwrap_or(Value::Undefined);
        let c = args.get(2).cloned().unwrap_or(Value::Undefined);
        let d = args.get(3).cloned().unwrap_or(Value::Undefined);
        f(ctx, a, b, c, d)
      }),
    }));
    self
  }

  pub fn method5(
    mut self,
    name: impl Into<String>,
    f: impl Fn(&mut EvalCtx, Value, Value, Value, Value, Value) -> HostResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: Some(5),
      f: Rc::new(move |ctx, args| {
        let a = args.first().cloned().unwrap_or(Value::Undefined);
        let b = args.get(1).cloned().unwrap_or(Value::Undefined);
        let c = args.get(2).cloned().unwrap_or(Value::Undefined);
        let d = args.get(3).cloned().unwrap_or(Value::Undefined);
        let e = args.get(4).cloned().unwrap_or(Value::Undefined);
        f(ctx, a, b, c, d, e)
      }),
    }));
    self
  }

  /// Registers a varargs method: the callback receives every argument the
  /// script passed, in order.
  pub fn varargs(
    mut self,
    name: impl Into<String>,
    f: impl Fn(&mut EvalCtx, &[Value]) -> HostResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), HostMethod {
      arity: None,
      f: Rc::new(move |ctx, args| f(ctx, args)),
    }));
    self
  }
}

/// Host-supplied property resolver backing a single dynamic-property object.
///
/// Reads, writes, deletes, and enumeration on that object dispatch here
/// instead of touching heap property storage. Implementations needing
/// mutability use interior mutability (the interpreter is single-threaded per
/// context).
pub trait PropResolver {
  /// `None` means the property does not exist (reads produce `undefined`).
  fn get(&self, ctx: &mut EvalCtx, name: &str) -> Result<Option<Value>, HostError>;
  /// Returns whether the write was accepted.
  fn set(&self, ctx: &mut EvalCtx, name: &str, value: Value) -> Result<bool, HostError>;
  /// Returns whether the property existed.
  fn delete(&self, ctx: &mut EvalCtx, name: &str) -> Result<bool, HostError>;
  /// All current properties, in the order the host wants them enumerated.
  fn enumerate(&self, ctx: &mut EvalCtx) -> Result<Vec<(String, Value)>, HostError>;
}

/// Heap payload of a host object built from a [`HostObjectDef`]: constants are
/// materialized as ordinary properties at creation; methods live here.
pub(crate) struct HostObjectData {
  pub methods: Vec<(JsStr, HostMethod)>,
}

impl HostObjectData {
  pub fn method(&self, name: &str) -> Option<&HostMethod> {
    self
      .methods
      .iter()
      .find(|(method_name, _)| &**method_name == name)
      .map(|(_, method)| method)
  }
}
