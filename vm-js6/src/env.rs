use crate::value::Value;
use ahash::HashMap;
use ahash::HashMapExt;
use core::mem;

/// Identifier of an environment frame within its context's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct EnvId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
  Var,
  Let,
  Const,
  Param,
  Fn,
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
  pub kind: BindingKind,
  pub value: Value,
  /// `false` between block entry and the `let`/`const` declaration (the temporal dead zone).
  pub initialized: bool,
}

impl Binding {
  pub fn mutable(&self) -> bool {
    !matches!(self.kind, BindingKind::Const)
  }
}

pub(crate) struct EnvFrame {
  pub parent: Option<EnvId>,
  pub bindings: HashMap<String, Binding>,
  /// `this` for the activation that created this frame. Arrow-function frames
  /// leave it unset so lookups continue into the captured chain.
  pub this_value: Option<Value>,
}

pub(crate) const ENV_FRAME_BYTES: usize = mem::size_of::<EnvFrame>();
pub(crate) const BINDING_BYTES: usize = mem::size_of::<Binding>() + mem::size_of::<String>();

/// Arena of environment frames.
///
/// Frames reference parents by index, so closure cycles (function → frame →
/// function) never need tracing: the arena is dropped wholesale with its
/// context. Byte charging is done by the caller (the context owns the
/// accountant).
pub(crate) struct EnvArena {
  frames: Vec<EnvFrame>,
}

impl EnvArena {
  pub fn new() -> EnvArena {
    EnvArena { frames: Vec::new() }
  }

  pub fn create(&mut self, parent: Option<EnvId>) -> EnvId {
    let id = EnvId(self.frames.len() as u32);
    self.frames.push(EnvFrame {
      parent,
      bindings: HashMap::new(),
      this_value: None,
    });
    id
  }

  pub fn frame(&self, id: EnvId) -> &EnvFrame {
    &self.frames[id.0 as usize]
  }

  pub fn frame_mut(&mut self, id: EnvId) -> &mut EnvFrame {
    &mut self.frames[id.0 as usize]
  }

  /// Finds the nearest frame in the chain that declares `name`.
  pub fn resolve(&self, env: EnvId, name: &str) -> Option<EnvId> {
    let mut current = Some(env);
    while let Some(id) = current {
      let frame = self.frame(id);
      if frame.bindings.contains_key(name) {
        return Some(id);
      }
      current = frame.parent;
    }
    None
  }

  /// Resolves `this` through the chain (arrow frames are transparent).
  pub fn this_value(&self, env: EnvId) -> Value {
    let mut current = Some(env);
    while let Some(id) = current {
      let frame = self.frame(id);
      if let Some(this) = &frame.this_value {
        return this.clone();
      }
      current = frame.parent;
    }
    Value::Undefined
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolves_through_parent_chain() {
    let mut envs = EnvArena::new();
    let root = envs.create(None);
    let child = envs.create(Some(root));
    envs.frame_mut(root).bindings.insert("x".to_string(), Binding {
      kind: BindingKind::Let,
      value: Value::Number(1.0),
      initialized: true,
    });
    assert_eq!(envs.resolve(child, "x"), Some(root));
    assert_eq!(envs.resolve(child, "y"), None);
  }

  #[test]
  fn this_lookup_skips_frames_without_this() {
    let mut envs = EnvArena::new();
    let root = envs.create(None);
    envs.frame_mut(root).this_value = Some(Value::Bool(true));
    let arrow = envs.create(Some(root));
    assert!(matches!(envs.this_value(arrow), Value::Bool(true)));
  }
}
