use crate::ast::expr::Expr;
use crate::ast::func::FuncBody;
use crate::ast::stmt::ForInOfMode;
use crate::ast::stmt::Stmt;
use crate::ast::stmt::VarDeclMode;
use crate::ast::TopLevel;
use crate::error::SyntaxErrorType;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::operator::OperatorName;
use crate::parse;
use crate::parse::Parser;
use crate::token::TT;

fn parse_ok(source: &str) -> TopLevel {
  *parse(source).expect("should parse").stx
}

fn parse_err(source: &str) -> SyntaxErrorType {
  parse(source).expect_err("should fail to parse").typ
}

#[test]
fn parser_buffers_and_restores_tokens() {
  let lexer = Lexer::new("let x = 1;");
  let mut p = Parser::new(lexer);
  let cp = p.checkpoint();

  assert_eq!(p.peek().typ, TT::KeywordLet);
  assert_eq!(p.consume().typ, TT::KeywordLet);
  assert_eq!(p.consume().typ, TT::Identifier);

  p.restore_checkpoint(cp);
  assert_eq!(p.peek().typ, TT::KeywordLet);
}

#[test]
fn parser_relexes_on_mode_change() {
  let lexer = Lexer::new("`a${x}b`");
  let mut p = Parser::new(lexer);
  assert_eq!(p.consume().typ, TT::TemplateStart);
  assert_eq!(p.consume().typ, TT::Identifier);
  // Peeking in standard mode buffers a `}` punctuator...
  assert_eq!(p.peek().typ, TT::BraceClose);
  // ...which is relexed as a template continuation on request.
  assert_eq!(
    p.consume_with_mode(LexMode::TemplateStrContinue).typ,
    TT::TemplateEnd
  );
}

#[test]
fn parses_var_decl_forms() {
  let top = parse_ok("let a = 1, b; const c = 2; var d;");
  assert_eq!(top.body.len(), 3);
  let Stmt::VarDecl(decl) = &*top.body[0].stx else {
    panic!("expected var decl");
  };
  assert_eq!(decl.mode, VarDeclMode::Let);
  assert_eq!(decl.declarators.len(), 2);
}

#[test]
fn parses_destructuring_declarations() {
  parse_ok("let [a, , b = 2, ...rest] = xs;");
  parse_ok("const {x, y: {z} = {}, w = 3} = o;");
}

#[test]
fn parses_expression_precedence() {
  let top = parse_ok("a + b * c;");
  let Stmt::Expr(stmt) = &*top.body[0].stx else {
    panic!("expected expression statement");
  };
  let Expr::Binary(add) = &*stmt.expr.stx else {
    panic!("expected binary expression");
  };
  assert_eq!(add.operator, OperatorName::Addition);
  let Expr::Binary(mul) = &*add.right.stx else {
    panic!("expected nested multiplication");
  };
  assert_eq!(mul.operator, OperatorName::Multiplication);
}

#[test]
fn parses_assignment_right_associative() {
  let top = parse_ok("a = b = 1;");
  let Stmt::Expr(stmt) = &*top.body[0].stx else {
    panic!("expected expression statement");
  };
  let Expr::Binary(outer) = &*stmt.expr.stx else {
    panic!("expected assignment");
  };
  assert_eq!(outer.operator, OperatorName::Assignment);
  assert!(matches!(&*outer.right.stx, Expr::Binary(inner) if inner.operator == OperatorName::Assignment));
}

#[test]
fn parses_member_call_chains() {
  parse_ok("a.b.c(1)[d](2, ...e);");
  parse_ok("new a.B(1).c;");
}

#[test]
fn parses_arrow_functions() {
  let top = parse_ok("const f = (a, b = 1) => a + b; const g = x => x; const h = () => ({});");
  assert_eq!(top.funcs.len(), 3);
  assert!(top.funcs.iter().all(|f| f.arrow));
  assert!(matches!(top.funcs[0].body, FuncBody::Expr(_)));
}

#[test]
fn parses_function_forms() {
  let top = parse_ok("function f(a, ...rest) { return a; } const g = function () {};");
  assert_eq!(top.funcs.len(), 2);
  assert_eq!(top.funcs[0].name.as_deref(), Some("f"));
  assert!(top.funcs[0].params[1].rest);
}

#[test]
fn parses_object_literals() {
  parse_ok("const o = {a: 1, b, 'c d': 2, 3: x, [k]: v, m() { return 1; }};");
}

#[test]
fn parses_control_flow() {
  parse_ok("if (a) { b(); } else c();");
  parse_ok("while (a) break;");
  parse_ok("do { a(); } while (b)");
  parse_ok("for (let i = 0; i < 10; i++) {}");
  parse_ok("for (;;) {}");
  parse_ok("for (const k in o) {}");
  parse_ok("for (const v of xs) {}");
  parse_ok("for (x of xs) {}");
  parse_ok("outer: while (a) { continue outer; }");
  parse_ok("switch (a) { case 1: b(); break; default: c(); }");
  parse_ok("try { a(); } catch (e) { b(); } finally { c(); }");
}

#[test]
fn applies_automatic_semicolon_insertion() {
  parse_ok("let a = 1\nlet b = 2");
  parse_ok("a()\nb()");
  // ASI does not split a statement that continues on the next line.
  let top = parse_ok("let x = 1 +\n2");
  assert_eq!(top.body.len(), 1);
}

#[test]
fn rejects_regex_literals() {
  assert_eq!(parse_err("/a/.test('a')"), SyntaxErrorType::RegexUnsupported);
  assert_eq!(parse_err("let x = /ab/;"), SyntaxErrorType::RegexUnsupported);
}

#[test]
fn rejects_reserved_words() {
  assert_eq!(parse_err("class A {}"), SyntaxErrorType::ReservedWord);
  assert_eq!(parse_err("let yield = 1;"), SyntaxErrorType::ExpectedSyntax("binding pattern"));
  assert_eq!(parse_err("await x;"), SyntaxErrorType::ReservedWord);
  assert_eq!(parse_err("void 0;"), SyntaxErrorType::ReservedWord);
}

#[test]
fn rejects_invalid_constructs() {
  assert_eq!(parse_err("return 1;"), SyntaxErrorType::ReturnOutsideFunction);
  assert_eq!(parse_err("1 = 2;"), SyntaxErrorType::InvalidAssigmentTarget);
  assert_eq!(parse_err("x: y();"), SyntaxErrorType::LabelNotALoop);
  assert_eq!(parse_err("try { a(); }"), SyntaxErrorType::TryStatementHasNoCatchOrFinally);
  assert_eq!(parse_err("let x = 08;"), SyntaxErrorType::MalformedLiteralNumber);
  assert_eq!(
    parse_err("throw\nx;"),
    SyntaxErrorType::LineTerminatorAfterThrow
  );
}

#[test]
fn parses_template_literals() {
  let top = parse_ok("let s = `a${1 + 2}b${x}`;");
  let Stmt::VarDecl(decl) = &*top.body[0].stx else {
    panic!("expected var decl");
  };
  let init = decl.declarators[0].initializer.as_ref().unwrap();
  let Expr::LitTemplate(template) = &*init.stx else {
    panic!("expected template literal");
  };
  // str, expr, str, expr, str
  assert_eq!(template.parts.len(), 5);
}

#[test]
fn parses_for_in_of_modes() {
  let top = parse_ok("for (const k in o) {} for (const v of xs) {}");
  let Stmt::ForInOf(fin) = &*top.body[0].stx else {
    panic!("expected for-in");
  };
  assert_eq!(fin.mode, ForInOfMode::In);
  let Stmt::ForInOf(fof) = &*top.body[1].stx else {
    panic!("expected for-of");
  };
  assert_eq!(fof.mode, ForInOfMode::Of);
}
