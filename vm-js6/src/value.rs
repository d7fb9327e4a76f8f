use std::rc::Rc;

/// An immutable script string.
///
/// Stored as UTF-8; operations with UTF-16 semantics (`charCodeAt`, `slice`
/// indices, …) convert on the fly. Cloning is a reference-count bump and is
/// never charged to the memory accountant; only newly built strings are.
pub type JsStr = Rc<str>;

/// Handle into the per-context object heap.
///
/// The heap is an arena: slots are never freed during an execution, so a
/// handle obtained from an allocation is valid for the lifetime of its
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjId(pub(crate) u32);

/// A script value.
#[derive(Debug, Clone)]
pub enum Value {
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  Str(JsStr),
  Object(ObjId),
}

impl Value {
  pub fn str(s: impl AsRef<str>) -> Value {
    Value::Str(Rc::from(s.as_ref()))
  }

  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  pub fn is_nullish(&self) -> bool {
    matches!(self, Value::Undefined | Value::Null)
  }

  pub fn as_object(&self) -> Option<ObjId> {
    match self {
      Value::Object(id) => Some(*id),
      _ => None,
    }
  }
}
