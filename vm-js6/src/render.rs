//! Renders AST nodes back to compact one-line source for stack-trace frames.
//!
//! Statement bodies are elided as `...`; the goal is a recognizable call
//! site (`b(null)`, `foo.x = 1`), not a faithful pretty-printer.

use parse_js6::ast::expr::ArrElem;
use parse_js6::ast::expr::Expr;
use parse_js6::ast::expr::ObjMember;
use parse_js6::ast::expr::PropKey;
use parse_js6::ast::expr::TemplatePart;
use parse_js6::ast::pat::Pat;
use parse_js6::ast::stmt::ForTripleInit;
use parse_js6::ast::stmt::Stmt;
use parse_js6::ast::stmt::VarDecl;
use parse_js6::ast::stmt::VarDeclMode;
use parse_js6::operator::OperatorName;
use parse_js6::operator::OPERATORS;

fn operator_symbol(name: OperatorName) -> &'static str {
  use OperatorName::*;
  match name {
    Addition => "+",
    Assignment => "=",
    AssignmentAddition => "+=",
    AssignmentBitwiseAnd => "&=",
    AssignmentBitwiseLeftShift => "<<=",
    AssignmentBitwiseOr => "|=",
    AssignmentBitwiseRightShift => ">>=",
    AssignmentBitwiseUnsignedRightShift => ">>>=",
    AssignmentBitwiseXor => "^=",
    AssignmentDivision => "/=",
    AssignmentMultiplication => "*=",
    AssignmentRemainder => "%=",
    AssignmentSubtraction => "-=",
    BitwiseAnd => "&",
    BitwiseLeftShift => "<<",
    BitwiseNot => "~",
    BitwiseOr => "|",
    BitwiseRightShift => ">>",
    BitwiseUnsignedRightShift => ">>>",
    BitwiseXor => "^",
    Comma => ",",
    Delete => "delete",
    Division => "/",
    Equality => "==",
    GreaterThan => ">",
    GreaterThanOrEqual => ">=",
    In => "in",
    Inequality => "!=",
    LessThan => "<",
    LessThanOrEqual => "<=",
    LogicalAnd => "&&",
    LogicalNot => "!",
    LogicalOr => "||",
    Multiplication => "*",
    PostfixDecrement | PrefixDecrement => "--",
    PostfixIncrement | PrefixIncrement => "++",
    Remainder => "%",
    StrictEquality => "===",
    StrictInequality => "!==",
    Subtraction => "-",
    Typeof => "typeof",
    UnaryNegation => "-",
    UnaryPlus => "+",
    Call | ComputedMemberAccess | MemberAccess | Conditional | New => "",
  }
}

fn precedence(name: OperatorName) -> u8 {
  OPERATORS.get(&name).map(|op| op.precedence).unwrap_or(0)
}

pub(crate) fn render_stmt(stmt: &Stmt) -> String {
  match stmt {
    Stmt::Block(_) => "{ ... }".to_string(),
    Stmt::Break(b) => match &b.label {
      Some(label) => format!("break {label}"),
      None => "break".to_string(),
    },
    Stmt::Continue(c) => match &c.label {
      Some(label) => format!("continue {label}"),
      None => "continue".to_string(),
    },
    Stmt::DoWhile(s) => format!("do ... while ({})", render_expr(&s.condition)),
    Stmt::Empty(_) => ";".to_string(),
    Stmt::Expr(s) => render_expr(&s.expr),
    Stmt::ForInOf(s) => {
      let decl = match s.decl_mode {
        Some(VarDeclMode::Const) => "const ",
        Some(VarDeclMode::Let) => "let ",
        Some(VarDeclMode::Var) => "var ",
        None => "",
      };
      let mode = match s.mode {
        parse_js6::ast::stmt::ForInOfMode::In => "in",
        parse_js6::ast::stmt::ForInOfMode::Of => "of",
      };
      format!(
        "for ({decl}{} {mode} {}) ...",
        render_pat(&s.pat),
        render_expr(&s.rhs)
      )
    }
    Stmt::ForTriple(s) => {
      let init = match &s.init {
        ForTripleInit::None => String::new(),
        ForTripleInit::Expr(e) => render_expr(e),
        ForTripleInit::Decl(d) => render_var_decl(d),
      };
      let cond = s.cond.as_ref().map(|e| render_expr(e)).unwrap_or_default();
      let post = s.post.as_ref().map(|e| render_expr(e)).unwrap_or_default();
      format!("for ({init}; {cond}; {post}) ...")
    }
    Stmt::FunctionDecl(s) => format!("function {}(...) {{ ... }}", s.name),
    Stmt::If(s) => format!("if ({}) ...", render_expr(&s.test)),
    Stmt::Label(s) => format!("{}: ...", s.name),
    Stmt::Return(s) => match &s.value {
      Some(value) => format!("return {}", render_expr(value)),
      None => "return".to_string(),
    },
    Stmt::Switch(s) => format!("switch ({}) {{ ... }}", render_expr(&s.test)),
    Stmt::Throw(s) => format!("throw {}", render_expr(&s.value)),
    Stmt::Try(_) => "try { ... }".to_string(),
    Stmt::VarDecl(s) => render_var_decl_plain(s),
    Stmt::While(s) => format!("while ({}) ...", render_expr(&s.condition)),
  }
}

fn render_var_decl(decl: &parse_js6::ast::Node<VarDecl>) -> String {
  render_var_decl_plain(decl)
}

fn render_var_decl_plain(decl: &VarDecl) -> String {
  let keyword = match decl.mode {
    VarDeclMode::Const => "const",
    VarDeclMode::Let => "let",
    VarDeclMode::Var => "var",
  };
  let declarators = decl
    .declarators
    .iter()
    .map(|d| match &d.initializer {
      Some(init) => format!("{} = {}", render_pat(&d.pattern), render_expr(init)),
      None => render_pat(&d.pattern),
    })
    .collect::<Vec<_>>()
    .join(", ");
  format!("{keyword} {declarators}")
}

pub(crate) fn render_pat(pat: &Pat) -> String {
  match pat {
    Pat::Id(id) => id.name.clone(),
    Pat::Arr(arr) => {
      let mut parts: Vec<String> = arr
        .elements
        .iter()
        .map(|e| match e {
          Some(elem) => render_pat(&elem.target),
          None => String::new(),
        })
        .collect();
      if let Some(rest) = &arr.rest {
        parts.push(format!("...{}", render_pat(rest)));
      }
      format!("[{}]", parts.join(", "))
    }
    Pat::Obj(obj) => {
      let parts: Vec<String> = obj
        .properties
        .iter()
        .map(|p| {
          if p.shorthand {
            p.key.clone()
          } else {
            format!("{}: {}", p.key, render_pat(&p.target))
          }
        })
        .collect();
      format!("{{{}}}", parts.join(", "))
    }
  }
}

pub(crate) fn render_expr(expr: &Expr) -> String {
  render_expr_prec(expr, 0)
}

fn render_expr_prec(expr: &Expr, parent_prec: u8) -> String {
  match expr {
    Expr::ArrowFunc(_) => "(...) => ...".to_string(),
    Expr::Binary(b) => {
      let prec = precedence(b.operator);
      let symbol = operator_symbol(b.operator);
      let rendered = if b.operator == OperatorName::Comma {
        format!(
          "{}, {}",
          render_expr_prec(&b.left, prec),
          render_expr_prec(&b.right, prec)
        )
      } else {
        format!(
          "{} {symbol} {}",
          render_expr_prec(&b.left, prec),
          render_expr_prec(&b.right, prec + 1)
        )
      };
      if prec < parent_prec {
        format!("({rendered})")
      } else {
        rendered
      }
    }
    Expr::Call(c) => {
      let args = c
        .arguments
        .iter()
        .map(|a| {
          let rendered = render_expr_prec(&a.value, 2);
          if a.spread {
            format!("...{rendered}")
          } else {
            rendered
          }
        })
        .collect::<Vec<_>>()
        .join(", ");
      format!("{}({args})", render_expr_prec(&c.callee, 19))
    }
    Expr::ComputedMember(m) => {
      format!(
        "{}[{}]",
        render_expr_prec(&m.object, 19),
        render_expr(&m.member)
      )
    }
    Expr::Cond(c) => {
      let rendered = format!(
        "{} ? {} : {}",
        render_expr_prec(&c.test, 5),
        render_expr_prec(&c.consequent, 3),
        render_expr_prec(&c.alternate, 3)
      );
      if 4 < parent_prec {
        format!("({rendered})")
      } else {
        rendered
      }
    }
    Expr::Func(_) => "function () { ... }".to_string(),
    Expr::Id(id) => id.name.clone(),
    Expr::Member(m) => format!("{}.{}", render_expr_prec(&m.left, 19), m.right),
    Expr::New(n) => {
      let args = n
        .arguments
        .iter()
        .map(|a| render_expr_prec(&a.value, 2))
        .collect::<Vec<_>>()
        .join(", ");
      format!("new {}({args})", render_expr_prec(&n.callee, 19))
    }
    Expr::This(_) => "this".to_string(),
    Expr::Unary(u) => {
      let symbol = operator_symbol(u.operator);
      let space = if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        " "
      } else {
        ""
      };
      format!("{symbol}{space}{}", render_expr_prec(&u.argument, 15))
    }
    Expr::UnaryPostfix(u) => {
      format!(
        "{}{}",
        render_expr_prec(&u.argument, 16),
        operator_symbol(u.operator)
      )
    }
    Expr::LitArr(arr) => {
      let parts = arr
        .elements
        .iter()
        .map(|e| match e {
          ArrElem::Single(v) => render_expr_prec(v, 2),
          ArrElem::Spread(v) => format!("...{}", render_expr_prec(v, 2)),
          ArrElem::Empty => String::new(),
        })
        .collect::<Vec<_>>()
        .join(", ");
      format!("[{parts}]")
    }
    Expr::LitBool(b) => b.value.to_string(),
    Expr::LitNull(_) => "null".to_string(),
    Expr::LitNum(n) => n.value.to_string(),
    Expr::LitObj(obj) => {
      let parts = obj
        .members
        .iter()
        .map(|m| match &**m {
          ObjMember::Prop { key, value } => {
            format!("{}: {}", render_prop_key(key), render_expr_prec(value, 2))
          }
          ObjMember::Method { key, .. } => format!("{}() {{ ... }}", render_prop_key(key)),
          ObjMember::Shorthand { name } => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
      format!("{{{parts}}}")
    }
    Expr::LitStr(s) => render_string_literal(&s.value),
    Expr::LitTemplate(t) => {
      let mut out = String::from("`");
      for part in &t.parts {
        match part {
          TemplatePart::Str(s) => out.push_str(s),
          TemplatePart::Expr(e) => {
            out.push_str("${");
            out.push_str(&render_expr(e));
            out.push('}');
          }
        }
      }
      out.push('`');
      out
    }
    Expr::LitUndefined(_) => "undefined".to_string(),
  }
}

fn render_prop_key(key: &PropKey) -> String {
  match key {
    PropKey::Direct(name) => name.clone(),
    PropKey::Computed(expr) => format!("[{}]", render_expr(expr)),
  }
}

fn render_string_literal(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('\'');
  for c in value.chars() {
    match c {
      '\'' => out.push_str("\\'"),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c => out.push(c),
    }
  }
  out.push('\'');
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use parse_js6::ast::stmt::Stmt;
  use parse_js6::parse;

  fn render_first_stmt(source: &str) -> String {
    let top = parse(source).expect("should parse");
    render_stmt(&top.stx.body[0].stx)
  }

  #[test]
  fn renders_assignment_with_canonical_spacing() {
    assert_eq!(render_first_stmt("foo.x=1"), "foo.x = 1");
  }

  #[test]
  fn renders_calls() {
    assert_eq!(render_first_stmt("b(null)"), "b(null)");
    assert_eq!(render_first_stmt("a(x)"), "a(x)");
    assert_eq!(render_first_stmt("o.m(1, 'two')"), "o.m(1, 'two')");
  }

  #[test]
  fn renders_declarations_and_control_flow() {
    assert_eq!(render_first_stmt("let x=1,y"), "let x = 1, y");
    assert_eq!(render_first_stmt("if(a>2){b()}"), "if (a > 2) ...");
    assert_eq!(render_first_stmt("throw {code:1}"), "throw {code: 1}");
  }

  #[test]
  fn renders_nested_precedence_with_parens() {
    assert_eq!(render_first_stmt("(a+b)*c"), "(a + b) * c");
    assert_eq!(render_first_stmt("a+b*c"), "a + b * c");
  }

  #[test]
  fn renders_function_decl_elided() {
    let top = parse("function f(a) { return a; }").expect("should parse");
    let Stmt::FunctionDecl(_) = &*top.stx.body[0].stx else {
      panic!("expected function decl");
    };
    assert_eq!(render_first_stmt("function f(a) { return a; }"), "function f(...) { ... }");
  }
}
