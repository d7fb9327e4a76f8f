pub mod expr;
pub mod func;
pub mod pat;
pub mod stmt;

use crate::loc::Loc;
use func::Func;
use stmt::Stmt;
use std::ops::Deref;

/// A syntax node: a source location plus the boxed syntax payload.
#[derive(Debug)]
pub struct Node<T> {
  pub loc: Loc,
  pub stx: Box<T>,
}

impl<T> Node<T> {
  pub fn new(loc: Loc, stx: T) -> Node<T> {
    Node {
      loc,
      stx: Box::new(stx),
    }
  }
}

impl<T> Deref for Node<T> {
  type Target = T;

  fn deref(&self) -> &Self::Target {
    &self.stx
  }
}

/// The parsed program.
///
/// All function bodies (declarations, expressions, arrows, object-literal
/// methods) live in `funcs` and are referenced by [`FuncId`]; closures created
/// at runtime hold ids rather than references into the tree.
#[derive(Debug)]
pub struct TopLevel {
  pub body: Vec<Node<Stmt>>,
  pub funcs: Vec<Func>,
}

/// Identifier for a function's executable body within [`TopLevel::funcs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FuncId(pub u32);
