use crate::ctx::EvalCtx;
use crate::env::EnvId;
use crate::error::VmResult;
use crate::host::HostMethod;
use crate::value::JsStr;
use crate::value::Value;
use parse_js6::ast::FuncId;

/// A builtin implemented in Rust. `this` is the receiver (or `Undefined`).
pub(crate) type NativeFn = fn(&mut EvalCtx, Value, &[Value]) -> VmResult<Value>;

/// The callable payload of a function object.
#[derive(Clone)]
pub(crate) enum Callable {
  /// A script closure: an executable body in the program's function table
  /// plus the captured environment frame. Both are plain ids, so function
  /// objects hold no references into the shared AST.
  Script {
    func: FuncId,
    env: EnvId,
    name: Option<JsStr>,
  },
  /// A builtin (e.g. `parseInt`, `Object.keys`).
  Native { name: &'static str, f: NativeFn },
  /// A builtin method read off its receiver (`const p = arr.push`): carries
  /// the receiver so a later bare call still dispatches correctly.
  BoundNative {
    name: JsStr,
    recv: Value,
    f: NativeFn,
  },
  /// A host-registered method (fixed arity or varargs).
  Host { name: JsStr, method: HostMethod },
}

impl Callable {
  pub fn name(&self) -> Option<&str> {
    match self {
      Callable::Script { name, .. } => name.as_deref(),
      Callable::Native { name, .. } => Some(name),
      Callable::BoundNative { name, .. } => Some(name),
      Callable::Host { name, .. } => Some(name),
    }
  }
}
