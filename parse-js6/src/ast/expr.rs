use super::FuncId;
use super::Node;
use crate::num::JsNumber;
use crate::operator::OperatorName;

#[derive(Debug)]
pub enum Expr {
  ArrowFunc(ArrowFuncExpr),
  Binary(BinaryExpr),
  Call(CallExpr),
  ComputedMember(ComputedMemberExpr),
  Cond(CondExpr),
  Func(FuncExpr),
  Id(IdExpr),
  Member(MemberExpr),
  New(NewExpr),
  This(ThisExpr),
  Unary(UnaryExpr),
  UnaryPostfix(UnaryPostfixExpr),

  // Literals.
  LitArr(LitArrExpr),
  LitBool(LitBoolExpr),
  LitNull(LitNullExpr),
  LitNum(LitNumExpr),
  LitObj(LitObjExpr),
  LitStr(LitStrExpr),
  LitTemplate(LitTemplateExpr),
  LitUndefined(LitUndefinedExpr),
}

#[derive(Debug)]
pub struct ArrowFuncExpr {
  pub func: FuncId,
}

#[derive(Debug)]
pub struct BinaryExpr {
  pub operator: OperatorName,
  pub left: Node<Expr>,
  pub right: Node<Expr>,
}

#[derive(Debug)]
pub struct CallArg {
  pub spread: bool,
  pub value: Node<Expr>,
}

#[derive(Debug)]
pub struct CallExpr {
  pub callee: Node<Expr>,
  pub arguments: Vec<CallArg>,
}

#[derive(Debug)]
pub struct ComputedMemberExpr {
  pub object: Node<Expr>,
  pub member: Node<Expr>,
}

#[derive(Debug)]
pub struct CondExpr {
  pub test: Node<Expr>,
  pub consequent: Node<Expr>,
  pub alternate: Node<Expr>,
}

#[derive(Debug)]
pub struct FuncExpr {
  pub func: FuncId,
}

#[derive(Debug)]
pub struct IdExpr {
  pub name: String,
}

#[derive(Debug)]
pub struct MemberExpr {
  pub left: Node<Expr>,
  pub right: String,
}

#[derive(Debug)]
pub struct NewExpr {
  pub callee: Node<Expr>,
  pub arguments: Vec<CallArg>,
}

#[derive(Debug)]
pub struct ThisExpr {}

#[derive(Debug)]
pub struct UnaryExpr {
  pub operator: OperatorName,
  pub argument: Node<Expr>,
}

#[derive(Debug)]
pub struct UnaryPostfixExpr {
  pub operator: OperatorName,
  pub argument: Node<Expr>,
}

#[derive(Debug)]
pub enum ArrElem {
  Single(Node<Expr>),
  Spread(Node<Expr>),
  // An elision (`[1, , 3]`); evaluates to an `undefined` hole.
  Empty,
}

#[derive(Debug)]
pub struct LitArrExpr {
  pub elements: Vec<ArrElem>,
}

#[derive(Debug)]
pub struct LitBoolExpr {
  pub value: bool,
}

#[derive(Debug)]
pub struct LitNullExpr {}

#[derive(Debug)]
pub struct LitNumExpr {
  pub value: JsNumber,
}

#[derive(Debug)]
pub enum PropKey {
  Direct(String),
  Computed(Node<Expr>),
}

#[derive(Debug)]
pub enum ObjMember {
  Prop { key: PropKey, value: Node<Expr> },
  Method { key: PropKey, func: FuncId },
  Shorthand { name: String },
}

#[derive(Debug)]
pub struct LitObjExpr {
  pub members: Vec<Node<ObjMember>>,
}

#[derive(Debug)]
pub struct LitStrExpr {
  pub value: String,
}

#[derive(Debug)]
pub enum TemplatePart {
  Str(String),
  Expr(Node<Expr>),
}

#[derive(Debug)]
pub struct LitTemplateExpr {
  pub parts: Vec<TemplatePart>,
}

#[derive(Debug)]
pub struct LitUndefinedExpr {}
