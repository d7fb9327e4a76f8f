use super::ParseCtx;
use super::Parser;
use crate::ast::expr::Expr;
use crate::ast::pat::IdPat;
use crate::ast::pat::Pat;
use crate::ast::stmt::BlockStmt;
use crate::ast::stmt::BreakStmt;
use crate::ast::stmt::CatchBlock;
use crate::ast::stmt::ContinueStmt;
use crate::ast::stmt::DoWhileStmt;
use crate::ast::stmt::EmptyStmt;
use crate::ast::stmt::ExprStmt;
use crate::ast::stmt::ForInOfMode;
use crate::ast::stmt::ForInOfStmt;
use crate::ast::stmt::ForTripleInit;
use crate::ast::stmt::ForTripleStmt;
use crate::ast::stmt::FunctionDeclStmt;
use crate::ast::stmt::IfStmt;
use crate::ast::stmt::LabelStmt;
use crate::ast::stmt::ReturnStmt;
use crate::ast::stmt::Stmt;
use crate::ast::stmt::SwitchBranch;
use crate::ast::stmt::SwitchStmt;
use crate::ast::stmt::ThrowStmt;
use crate::ast::stmt::TryStmt;
use crate::ast::stmt::VarDecl;
use crate::ast::stmt::VarDeclMode;
use crate::ast::stmt::VarDeclarator;
use crate::ast::stmt::WhileStmt;
use crate::ast::Node;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::TT;

impl<'a> Parser<'a> {
  pub fn parse_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let token = self.peek();
    match token.typ {
      TT::BraceOpen => self.parse_block_stmt(ctx),
      TT::KeywordBreak => self.parse_break(ctx),
      TT::KeywordConst | TT::KeywordLet | TT::KeywordVar => {
        let decl = self.parse_var_decl(ctx, false)?;
        self.require_semicolon()?;
        let loc = decl.loc;
        Ok(Node::new(loc, Stmt::VarDecl(*decl.stx)))
      }
      TT::KeywordContinue => self.parse_continue(ctx),
      TT::KeywordDo => self.parse_do_while(ctx),
      TT::KeywordFor => self.parse_for(ctx),
      TT::KeywordFunction => {
        let (name, func, loc) = self.parse_function_literal(ctx, true)?;
        // The name is always present when required.
        let name = name.unwrap_or_default();
        Ok(Node::new(loc, Stmt::FunctionDecl(FunctionDeclStmt { name, func })))
      }
      TT::KeywordIf => self.parse_if(ctx),
      TT::KeywordReturn => self.parse_return(ctx),
      TT::KeywordSwitch => self.parse_switch(ctx),
      TT::KeywordThrow => self.parse_throw(ctx),
      TT::KeywordTry => self.parse_try(ctx),
      TT::KeywordWhile => self.parse_while(ctx),
      TT::Semicolon => {
        self.consume();
        Ok(Node::new(token.loc, Stmt::Empty(EmptyStmt {})))
      }
      TT::Identifier if self.peek_n(1).typ == TT::Colon => self.parse_label(ctx),
      _ => {
        let expr = self.parse_expr(ctx.with_include_in(true))?;
        self.require_semicolon()?;
        let loc = expr.loc;
        Ok(Node::new(loc, Stmt::Expr(ExprStmt { expr })))
      }
    }
  }

  fn parse_block_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::BraceOpen)?;
    let mut body = Vec::new();
    let end = loop {
      if let Some(end) = self.consume_if(TT::BraceClose).match_loc() {
        break end;
      }
      body.push(self.parse_stmt(ctx)?);
    };
    Ok(Node::new(start.loc + end, Stmt::Block(BlockStmt { body })))
  }

  /// Parses a `var`/`let`/`const` declaration without the trailing semicolon.
  ///
  /// With `for_header` set, initializers must not treat `in` as an operator so that
  /// `for (var x in o)` can be disambiguated by the caller.
  fn parse_var_decl(&mut self, ctx: ParseCtx, for_header: bool) -> SyntaxResult<Node<VarDecl>> {
    let start = self.consume();
    let mode = match start.typ {
      TT::KeywordConst => VarDeclMode::Const,
      TT::KeywordLet => VarDeclMode::Let,
      TT::KeywordVar => VarDeclMode::Var,
      typ => {
        return Err(
          start
            .loc
            .error(SyntaxErrorType::ExpectedSyntax("declaration"), Some(typ)),
        )
      }
    };
    let decl_ctx = ctx.with_include_in(!for_header);

    let mut declarators = Vec::<VarDeclarator>::new();
    let mut loc = start.loc;
    loop {
      let pattern = self.parse_pat(ctx)?;
      loc += pattern.loc;
      let initializer = if self.consume_if(TT::Equals).is_match() {
        let init = self.parse_expr_assignment(decl_ctx)?;
        loc += init.loc;
        Some(init)
      } else {
        None
      };
      if mode == VarDeclMode::Const && initializer.is_none() && !for_header {
        return Err(
          pattern
            .loc
            .error(SyntaxErrorType::ExpectedSyntax("const initializer"), None),
        );
      }
      declarators.push(VarDeclarator {
        pattern,
        initializer,
      });
      if for_header && matches!(self.peek().typ, TT::KeywordIn | TT::KeywordOf) {
        break;
      }
      if !self.consume_if(TT::Comma).is_match() {
        break;
      }
    }

    Ok(Node::new(loc, VarDecl { mode, declarators }))
  }

  fn parse_break(&mut self, _ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordBreak)?;
    let label = self.parse_optional_label();
    self.require_semicolon()?;
    Ok(Node::new(start.loc, Stmt::Break(BreakStmt { label })))
  }

  fn parse_continue(&mut self, _ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordContinue)?;
    let label = self.parse_optional_label();
    self.require_semicolon()?;
    Ok(Node::new(start.loc, Stmt::Continue(ContinueStmt { label })))
  }

  fn parse_optional_label(&mut self) -> Option<String> {
    let token = self.peek();
    // A label must be on the same line (ASI would otherwise terminate the statement).
    if token.typ == TT::Identifier && !token.preceded_by_line_terminator {
      self.consume();
      Some(self.string(token.loc))
    } else {
      None
    }
  }

  fn parse_if(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordIf)?;
    self.require(TT::ParenthesisOpen)?;
    let test = self.parse_expr(ctx.with_include_in(true))?;
    self.require(TT::ParenthesisClose)?;
    let consequent = self.parse_stmt(ctx)?;
    let mut loc = start.loc + consequent.loc;
    let alternate = if self.consume_if(TT::KeywordElse).is_match() {
      let alternate = self.parse_stmt(ctx)?;
      loc += alternate.loc;
      Some(alternate)
    } else {
      None
    };
    Ok(Node::new(loc, Stmt::If(IfStmt {
      test,
      consequent,
      alternate,
    })))
  }

  fn parse_while(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordWhile)?;
    self.require(TT::ParenthesisOpen)?;
    let condition = self.parse_expr(ctx.with_include_in(true))?;
    self.require(TT::ParenthesisClose)?;
    let body = self.parse_stmt(ctx)?;
    let loc = start.loc + body.loc;
    Ok(Node::new(loc, Stmt::While(WhileStmt { condition, body })))
  }

  fn parse_do_while(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordDo)?;
    let body = self.parse_stmt(ctx)?;
    self.require(TT::KeywordWhile)?;
    self.require(TT::ParenthesisOpen)?;
    let condition = self.parse_expr(ctx.with_include_in(true))?;
    let end = self.require(TT::ParenthesisClose)?;
    // The trailing semicolon after `do..while(..)` is always optional.
    let _ = self.consume_if(TT::Semicolon);
    let loc = start.loc + end.loc;
    Ok(Node::new(loc, Stmt::DoWhile(DoWhileStmt { condition, body })))
  }

  fn parse_for(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordFor)?;
    self.require(TT::ParenthesisOpen)?;
    let header_ctx = ctx.with_include_in(false);

    // Disambiguate the three `for` forms by parsing the init clause first.
    let token = self.peek();
    let init: ForTripleInit = match token.typ {
      TT::Semicolon => ForTripleInit::None,
      TT::KeywordConst | TT::KeywordLet | TT::KeywordVar => {
        let decl = self.parse_var_decl(ctx, true)?;
        let next = self.peek();
        if let Some(mode) = Self::for_in_of_mode(next.typ) {
          self.consume();
          return self.parse_for_in_of_tail(ctx, start.loc, decl, mode);
        }
        ForTripleInit::Decl(decl)
      }
      _ => {
        let expr = self.parse_expr(header_ctx)?;
        let next = self.peek();
        if let Some(mode) = Self::for_in_of_mode(next.typ) {
          self.consume();
          // Only plain identifier targets are accepted for a declaration-less loop binding.
          let pat = match &*expr.stx {
            Expr::Id(id) => Node::new(expr.loc, Pat::Id(IdPat {
              name: id.name.clone(),
            })),
            _ => return Err(expr.loc.error(SyntaxErrorType::ForLoopHeaderHasInvalidLhs, None)),
          };
          let rhs = self.parse_expr(ctx.with_include_in(true))?;
          self.require(TT::ParenthesisClose)?;
          let body = self.parse_stmt(ctx)?;
          let loc = start.loc + body.loc;
          return Ok(Node::new(loc, Stmt::ForInOf(ForInOfStmt {
            mode,
            decl_mode: None,
            pat,
            rhs,
            body,
          })));
        }
        ForTripleInit::Expr(expr)
      }
    };

    self.require(TT::Semicolon)?;
    let cond = if self.peek().typ == TT::Semicolon {
      None
    } else {
      Some(self.parse_expr(ctx.with_include_in(true))?)
    };
    self.require(TT::Semicolon)?;
    let post = if self.peek().typ == TT::ParenthesisClose {
      None
    } else {
      Some(self.parse_expr(ctx.with_include_in(true))?)
    };
    self.require(TT::ParenthesisClose)?;
    let body = self.parse_stmt(ctx)?;
    let loc = start.loc + body.loc;
    Ok(Node::new(loc, Stmt::ForTriple(ForTripleStmt {
      init,
      cond,
      post,
      body,
    })))
  }

  fn for_in_of_mode(typ: TT) -> Option<ForInOfMode> {
    match typ {
      TT::KeywordIn => Some(ForInOfMode::In),
      TT::KeywordOf => Some(ForInOfMode::Of),
      _ => None,
    }
  }

  fn parse_for_in_of_tail(
    &mut self,
    ctx: ParseCtx,
    start: Loc,
    decl: Node<VarDecl>,
    mode: ForInOfMode,
  ) -> SyntaxResult<Node<Stmt>> {
    let decl_stx = *decl.stx;
    let mut declarators = decl_stx.declarators;
    let declarator = match (declarators.pop(), declarators.is_empty()) {
      (Some(declarator), true) => declarator,
      _ => return Err(decl.loc.error(SyntaxErrorType::ForLoopHeaderHasInvalidLhs, None)),
    };
    if declarator.initializer.is_some() {
      return Err(decl.loc.error(SyntaxErrorType::ForLoopHeaderHasInvalidLhs, None));
    }

    let rhs = self.parse_expr(ctx.with_include_in(true))?;
    self.require(TT::ParenthesisClose)?;
    let body = self.parse_stmt(ctx)?;
    let loc = start + body.loc;
    Ok(Node::new(loc, Stmt::ForInOf(ForInOfStmt {
      mode,
      decl_mode: Some(decl_stx.mode),
      pat: declarator.pattern,
      rhs,
      body,
    })))
  }

  fn parse_return(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordReturn)?;
    if !ctx.in_function {
      return Err(start.loc.error(SyntaxErrorType::ReturnOutsideFunction, None));
    }
    let next = self.peek();
    let value = if matches!(next.typ, TT::Semicolon | TT::BraceClose | TT::EOF)
      || next.preceded_by_line_terminator
    {
      None
    } else {
      Some(self.parse_expr(ctx.with_include_in(true))?)
    };
    self.require_semicolon()?;
    let loc = start.loc.add_option(value.as_ref().map(|v| v.loc));
    Ok(Node::new(loc, Stmt::Return(ReturnStmt { value })))
  }

  fn parse_throw(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordThrow)?;
    let next = self.peek();
    if next.preceded_by_line_terminator {
      return Err(
        next
          .loc
          .error(SyntaxErrorType::LineTerminatorAfterThrow, Some(next.typ)),
      );
    }
    let value = self.parse_expr(ctx.with_include_in(true))?;
    self.require_semicolon()?;
    let loc = start.loc + value.loc;
    Ok(Node::new(loc, Stmt::Throw(ThrowStmt { value })))
  }

  fn parse_switch(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordSwitch)?;
    self.require(TT::ParenthesisOpen)?;
    let test = self.parse_expr(ctx.with_include_in(true))?;
    self.require(TT::ParenthesisClose)?;
    self.require(TT::BraceOpen)?;

    let mut branches = Vec::<SwitchBranch>::new();
    let end = loop {
      if let Some(end) = self.consume_if(TT::BraceClose).match_loc() {
        break end;
      }
      let case = if self.consume_if(TT::KeywordCase).is_match() {
        let case = self.parse_expr(ctx.with_include_in(true))?;
        Some(case)
      } else {
        self.require(TT::KeywordDefault)?;
        None
      };
      self.require(TT::Colon)?;
      let mut body = Vec::new();
      while !matches!(
        self.peek().typ,
        TT::KeywordCase | TT::KeywordDefault | TT::BraceClose
      ) {
        body.push(self.parse_stmt(ctx)?);
      }
      branches.push(SwitchBranch { case, body });
    };

    let loc = start.loc + end;
    Ok(Node::new(loc, Stmt::Switch(SwitchStmt { test, branches })))
  }

  fn parse_try(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.require(TT::KeywordTry)?;
    let wrapped = self.parse_brace_block(ctx)?;
    let mut loc = start.loc;

    let catch = if self.consume_if(TT::KeywordCatch).is_match() {
      let parameter = if self.consume_if(TT::ParenthesisOpen).is_match() {
        let pat = self.parse_pat(ctx)?;
        self.require(TT::ParenthesisClose)?;
        Some(pat)
      } else {
        None
      };
      let body = self.parse_brace_block(ctx)?;
      Some(CatchBlock { parameter, body })
    } else {
      None
    };

    let finally = if self.consume_if(TT::KeywordFinally).is_match() {
      Some(self.parse_brace_block(ctx)?)
    } else {
      None
    };

    if catch.is_none() && finally.is_none() {
      return Err(
        start
          .loc
          .error(SyntaxErrorType::TryStatementHasNoCatchOrFinally, None),
      );
    }

    loc.1 = self.lexer_position_hint();
    Ok(Node::new(loc, Stmt::Try(TryStmt {
      wrapped,
      catch,
      finally,
    })))
  }

  fn lexer_position_hint(&mut self) -> usize {
    // Best-effort end position: the start of the next token.
    self.peek().loc.0
  }

  fn parse_brace_block(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<Stmt>>> {
    self.require(TT::BraceOpen)?;
    let mut body = Vec::new();
    loop {
      if self.consume_if(TT::BraceClose).is_match() {
        break;
      }
      body.push(self.parse_stmt(ctx)?);
    }
    Ok(body)
  }

  fn parse_label(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let name_token = self.require(TT::Identifier)?;
    let name = self.string(name_token.loc);
    self.require(TT::Colon)?;
    let statement = self.parse_stmt(ctx)?;
    // Labels are only meaningful on iteration statements and switch; anything else is outside the
    // accepted subset.
    match &*statement.stx {
      Stmt::DoWhile(_) | Stmt::ForInOf(_) | Stmt::ForTriple(_) | Stmt::Switch(_)
      | Stmt::While(_) => {}
      _ => return Err(statement.loc.error(SyntaxErrorType::LabelNotALoop, None)),
    }
    let loc = name_token.loc + statement.loc;
    Ok(Node::new(loc, Stmt::Label(LabelStmt { name, statement })))
  }
}
