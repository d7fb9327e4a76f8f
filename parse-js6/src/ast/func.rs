use super::expr::Expr;
use super::pat::Pat;
use super::stmt::Stmt;
use super::Node;
use crate::loc::Loc;

#[derive(Debug)]
pub struct Func {
  pub name: Option<String>,
  pub params: Vec<Node<ParamDecl>>,
  pub body: FuncBody,
  pub arrow: bool,
  /// Whether the body references `arguments` (directly or through nested
  /// arrow functions). Lets evaluators skip materializing the array.
  pub uses_arguments: bool,
  pub loc: Loc,
}

#[derive(Debug)]
pub enum FuncBody {
  Block(Vec<Node<Stmt>>),
  // Arrow functions with a bare expression body.
  Expr(Node<Expr>),
}

#[derive(Debug)]
pub struct ParamDecl {
  pub pat: Node<Pat>,
  pub default: Option<Node<Expr>>,
  pub rest: bool,
}
