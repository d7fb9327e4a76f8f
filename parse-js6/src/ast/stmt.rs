use super::expr::Expr;
use super::pat::Pat;
use super::FuncId;
use super::Node;

#[derive(Debug)]
pub enum Stmt {
  Block(BlockStmt),
  Break(BreakStmt),
  Continue(ContinueStmt),
  DoWhile(DoWhileStmt),
  Empty(EmptyStmt),
  Expr(ExprStmt),
  ForInOf(ForInOfStmt),
  ForTriple(ForTripleStmt),
  FunctionDecl(FunctionDeclStmt),
  If(IfStmt),
  Label(LabelStmt),
  Return(ReturnStmt),
  Switch(SwitchStmt),
  Throw(ThrowStmt),
  Try(TryStmt),
  VarDecl(VarDecl),
  While(WhileStmt),
}

#[derive(Debug)]
pub struct BlockStmt {
  pub body: Vec<Node<Stmt>>,
}

#[derive(Debug)]
pub struct BreakStmt {
  pub label: Option<String>,
}

#[derive(Debug)]
pub struct ContinueStmt {
  pub label: Option<String>,
}

#[derive(Debug)]
pub struct DoWhileStmt {
  pub condition: Node<Expr>,
  pub body: Node<Stmt>,
}

#[derive(Debug)]
pub struct EmptyStmt {}

#[derive(Debug)]
pub struct ExprStmt {
  pub expr: Node<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForInOfMode {
  In,
  Of,
}

#[derive(Debug)]
pub struct ForInOfStmt {
  pub mode: ForInOfMode,
  // `None` when the loop assigns to an existing binding (`for (x of xs)`).
  pub decl_mode: Option<VarDeclMode>,
  pub pat: Node<Pat>,
  pub rhs: Node<Expr>,
  pub body: Node<Stmt>,
}

#[derive(Debug)]
pub enum ForTripleInit {
  None,
  Expr(Node<Expr>),
  Decl(Node<VarDecl>),
}

#[derive(Debug)]
pub struct ForTripleStmt {
  pub init: ForTripleInit,
  pub cond: Option<Node<Expr>>,
  pub post: Option<Node<Expr>>,
  pub body: Node<Stmt>,
}

#[derive(Debug)]
pub struct FunctionDeclStmt {
  pub name: String,
  pub func: FuncId,
}

#[derive(Debug)]
pub struct IfStmt {
  pub test: Node<Expr>,
  pub consequent: Node<Stmt>,
  pub alternate: Option<Node<Stmt>>,
}

#[derive(Debug)]
pub struct LabelStmt {
  pub name: String,
  // Restricted to loops and switch by the parser.
  pub statement: Node<Stmt>,
}

#[derive(Debug)]
pub struct ReturnStmt {
  pub value: Option<Node<Expr>>,
}

#[derive(Debug)]
pub struct SwitchBranch {
  // `None` is the `default` clause.
  pub case: Option<Node<Expr>>,
  pub body: Vec<Node<Stmt>>,
}

#[derive(Debug)]
pub struct SwitchStmt {
  pub test: Node<Expr>,
  pub branches: Vec<SwitchBranch>,
}

#[derive(Debug)]
pub struct ThrowStmt {
  pub value: Node<Expr>,
}

#[derive(Debug)]
pub struct CatchBlock {
  pub parameter: Option<Node<Pat>>,
  pub body: Vec<Node<Stmt>>,
}

#[derive(Debug)]
pub struct TryStmt {
  pub wrapped: Vec<Node<Stmt>>,
  pub catch: Option<CatchBlock>,
  pub finally: Option<Vec<Node<Stmt>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDeclMode {
  Const,
  Let,
  Var,
}

#[derive(Debug)]
pub struct VarDeclarator {
  pub pattern: Node<Pat>,
  pub initializer: Option<Node<Expr>>,
}

#[derive(Debug)]
pub struct VarDecl {
  pub mode: VarDeclMode,
  pub declarators: Vec<VarDeclarator>,
}

#[derive(Debug)]
pub struct WhileStmt {
  pub condition: Node<Expr>,
  pub body: Node<Stmt>,
}
