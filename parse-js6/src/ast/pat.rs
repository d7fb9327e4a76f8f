use super::expr::Expr;
use super::Node;

/// A binding pattern: declaration, parameter, or catch-clause target.
#[derive(Debug)]
pub enum Pat {
  Id(IdPat),
  Arr(ArrPat),
  Obj(ObjPat),
}

#[derive(Debug)]
pub struct IdPat {
  pub name: String,
}

#[derive(Debug)]
pub struct ArrPat {
  // `None` entries are elisions (`[, x]`).
  pub elements: Vec<Option<ArrPatElem>>,
  pub rest: Option<Node<Pat>>,
}

#[derive(Debug)]
pub struct ArrPatElem {
  pub target: Node<Pat>,
  pub default: Option<Node<Expr>>,
}

#[derive(Debug)]
pub struct ObjPat {
  pub properties: Vec<ObjPatProp>,
}

#[derive(Debug)]
pub struct ObjPatProp {
  pub key: String,
  pub target: Node<Pat>,
  pub default: Option<Node<Expr>>,
  pub shorthand: bool,
}
