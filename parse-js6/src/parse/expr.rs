use super::ParseCtx;
use super::Parser;
use crate::ast::expr::ArrElem;
use crate::ast::expr::ArrowFuncExpr;
use crate::ast::expr::BinaryExpr;
use crate::ast::expr::CallArg;
use crate::ast::expr::CallExpr;
use crate::ast::expr::ComputedMemberExpr;
use crate::ast::expr::CondExpr;
use crate::ast::expr::Expr;
use crate::ast::expr::FuncExpr;
use crate::ast::expr::IdExpr;
use crate::ast::expr::LitArrExpr;
use crate::ast::expr::LitBoolExpr;
use crate::ast::expr::LitNullExpr;
use crate::ast::expr::LitNumExpr;
use crate::ast::expr::LitObjExpr;
use crate::ast::expr::LitStrExpr;
use crate::ast::expr::LitTemplateExpr;
use crate::ast::expr::LitUndefinedExpr;
use crate::ast::expr::MemberExpr;
use crate::ast::expr::NewExpr;
use crate::ast::expr::ObjMember;
use crate::ast::expr::PropKey;
use crate::ast::expr::TemplatePart;
use crate::ast::expr::ThisExpr;
use crate::ast::expr::UnaryExpr;
use crate::ast::expr::UnaryPostfixExpr;
use crate::ast::Node;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::decode_str_body;
use crate::lex::DecodeStrError;
use crate::lex::LexMode;
use crate::loc::Loc;
use crate::num::JsNumber;
use crate::operator::is_assignment_operator;
use crate::operator::OperatorName;
use crate::operator::MULTARY_OPERATOR_MAPPING;
use crate::operator::UNARY_OPERATOR_MAPPING;
use crate::token::TT;

/// Whether a token is an identifier-like word, usable as a property name after `.` or as an
/// object-literal key (ECMAScript allows keywords there).
fn tt_is_word(typ: TT) -> bool {
  matches!(
    typ,
    TT::Identifier
      | TT::ReservedWord
      | TT::KeywordBreak
      | TT::KeywordCase
      | TT::KeywordCatch
      | TT::KeywordConst
      | TT::KeywordContinue
      | TT::KeywordDefault
      | TT::KeywordDelete
      | TT::KeywordDo
      | TT::KeywordElse
      | TT::KeywordFalse
      | TT::KeywordFinally
      | TT::KeywordFor
      | TT::KeywordFunction
      | TT::KeywordIf
      | TT::KeywordIn
      | TT::KeywordLet
      | TT::KeywordNew
      | TT::KeywordNull
      | TT::KeywordOf
      | TT::KeywordReturn
      | TT::KeywordSwitch
      | TT::KeywordThis
      | TT::KeywordThrow
      | TT::KeywordTrue
      | TT::KeywordTry
      | TT::KeywordTypeof
      | TT::KeywordUndefined
      | TT::KeywordVar
      | TT::KeywordWhile
  )
}

impl<'a> Parser<'a> {
  /// Parses a full expression, including the comma operator.
  pub fn parse_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    self.parse_expr_with_min_prec(ctx, 1)
  }

  /// Parses an AssignmentExpression (no top-level comma operator).
  pub fn parse_expr_assignment(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    self.parse_expr_with_min_prec(ctx, 2)
  }

  pub fn parse_expr_with_min_prec(
    &mut self,
    ctx: ParseCtx,
    min_prec: u8,
  ) -> SyntaxResult<Node<Expr>> {
    let mut left = self.parse_expr_unary(ctx, min_prec)?;

    loop {
      let token = self.peek();
      let Some(op) = MULTARY_OPERATOR_MAPPING.get(&token.typ) else {
        break;
      };
      // Member access, computed member access, and calls are consumed by the operand chain in
      // `parse_expr_unary`; they never reach this loop.
      if op.precedence < min_prec {
        break;
      }
      if op.name == OperatorName::In && !ctx.include_in {
        break;
      }

      self.consume();

      left = match op.name {
        OperatorName::Conditional => {
          let consequent = self.parse_expr_assignment(ctx.with_include_in(true))?;
          self.require(TT::Colon)?;
          let alternate = self.parse_expr_with_min_prec(ctx, op.precedence)?;
          let loc = left.loc + alternate.loc;
          Node::new(loc, Expr::Cond(CondExpr {
            test: left,
            consequent,
            alternate,
          }))
        }
        name if is_assignment_operator(name) => {
          self.require_assignment_target(&left)?;
          // Right-associative: parse the right side at the same precedence.
          let right = self.parse_expr_with_min_prec(ctx, op.precedence)?;
          let loc = left.loc + right.loc;
          Node::new(loc, Expr::Binary(BinaryExpr {
            operator: name,
            left,
            right,
          }))
        }
        name => {
          let right = self.parse_expr_with_min_prec(ctx, op.precedence + 1)?;
          let loc = left.loc + right.loc;
          Node::new(loc, Expr::Binary(BinaryExpr {
            operator: name,
            left,
            right,
          }))
        }
      };
    }

    Ok(left)
  }

  fn require_assignment_target(&self, target: &Node<Expr>) -> SyntaxResult<()> {
    match &*target.stx {
      Expr::Id(_) | Expr::Member(_) | Expr::ComputedMember(_) => Ok(()),
      _ => Err(
        target
          .loc
          .error(SyntaxErrorType::InvalidAssigmentTarget, None),
      ),
    }
  }

  fn parse_expr_unary(&mut self, ctx: ParseCtx, min_prec: u8) -> SyntaxResult<Node<Expr>> {
    let token = self.peek();

    if token.typ == TT::KeywordNew {
      let new_expr = self.parse_new(ctx)?;
      return self.parse_operand_chain(ctx, new_expr, min_prec);
    }

    if let Some(op) = UNARY_OPERATOR_MAPPING.get(&token.typ) {
      self.consume();
      let argument = self.parse_expr_unary(ctx, op.precedence)?;
      if matches!(
        op.name,
        OperatorName::PrefixIncrement | OperatorName::PrefixDecrement
      ) {
        self.require_assignment_target(&argument)?;
      }
      let loc = token.loc + argument.loc;
      return Ok(Node::new(loc, Expr::Unary(UnaryExpr {
        operator: op.name,
        argument,
      })));
    }

    let operand = self.parse_expr_operand(ctx)?;
    self.parse_operand_chain(ctx, operand, min_prec)
  }

  /// Consumes the member-access / computed-member / call / postfix chain following an operand.
  fn parse_operand_chain(
    &mut self,
    ctx: ParseCtx,
    mut left: Node<Expr>,
    min_prec: u8,
  ) -> SyntaxResult<Node<Expr>> {
    loop {
      let token = self.peek();
      match token.typ {
        TT::Dot => {
          self.consume();
          let name_token = self.peek();
          if !tt_is_word(name_token.typ) {
            return Err(name_token.loc.error(
              SyntaxErrorType::ExpectedSyntax("property name"),
              Some(name_token.typ),
            ));
          }
          self.consume();
          let right = self.string(name_token.loc);
          let loc = left.loc + name_token.loc;
          left = Node::new(loc, Expr::Member(MemberExpr { left, right }));
        }
        TT::BracketOpen => {
          self.consume();
          let member = self.parse_expr(ctx.with_include_in(true))?;
          let end = self.require(TT::BracketClose)?.loc;
          let loc = left.loc + end;
          left = Node::new(loc, Expr::ComputedMember(ComputedMemberExpr {
            object: left,
            member,
          }));
        }
        TT::ParenthesisOpen => {
          let (arguments, end) = self.parse_call_args(ctx)?;
          let loc = left.loc + end;
          left = Node::new(loc, Expr::Call(CallExpr {
            callee: left,
            arguments,
          }));
        }
        TT::PlusPlus | TT::HyphenHyphen
          if !token.preceded_by_line_terminator && min_prec <= 16 =>
        {
          self.consume();
          self.require_assignment_target(&left)?;
          let operator = if token.typ == TT::PlusPlus {
            OperatorName::PostfixIncrement
          } else {
            OperatorName::PostfixDecrement
          };
          let loc = left.loc + token.loc;
          left = Node::new(loc, Expr::UnaryPostfix(UnaryPostfixExpr {
            operator,
            argument: left,
          }));
          break;
        }
        TT::TemplateNoSub | TT::TemplateStart => {
          return Err(
            token
              .loc
              .error(SyntaxErrorType::UnsupportedSyntax("tagged template"), None),
          );
        }
        _ => break,
      }
    }
    Ok(left)
  }

  fn parse_call_args(&mut self, ctx: ParseCtx) -> SyntaxResult<(Vec<CallArg>, Loc)> {
    self.require(TT::ParenthesisOpen)?;
    let arg_ctx = ctx.with_include_in(true);
    let mut arguments = Vec::<CallArg>::new();
    let end = loop {
      if let Some(end) = self.consume_if(TT::ParenthesisClose).match_loc() {
        break end;
      }
      let spread = self.consume_if(TT::DotDotDot).is_match();
      let value = self.parse_expr_assignment(arg_ctx)?;
      arguments.push(CallArg { spread, value });
      if !self.consume_if(TT::Comma).is_match() {
        break self.require(TT::ParenthesisClose)?.loc;
      }
    };
    Ok((arguments, end))
  }

  fn parse_new(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let start = self.require(TT::KeywordNew)?;

    // The callee of `new` binds member accesses but not calls: `new a.b.C()` constructs `a.b.C`.
    let mut callee = if self.peek().typ == TT::KeywordNew {
      self.parse_new(ctx)?
    } else {
      self.parse_expr_operand(ctx)?
    };
    loop {
      let token = self.peek();
      match token.typ {
        TT::Dot => {
          self.consume();
          let name_token = self.peek();
          if !tt_is_word(name_token.typ) {
            return Err(name_token.loc.error(
              SyntaxErrorType::ExpectedSyntax("property name"),
              Some(name_token.typ),
            ));
          }
          self.consume();
          let right = self.string(name_token.loc);
          let loc = callee.loc + name_token.loc;
          callee = Node::new(loc, Expr::Member(MemberExpr { left: callee, right }));
        }
        TT::BracketOpen => {
          self.consume();
          let member = self.parse_expr(ctx.with_include_in(true))?;
          let end = self.require(TT::BracketClose)?.loc;
          let loc = callee.loc + end;
          callee = Node::new(loc, Expr::ComputedMember(ComputedMemberExpr {
            object: callee,
            member,
          }));
        }
        _ => break,
      }
    }

    let (arguments, end) = if self.peek().typ == TT::ParenthesisOpen {
      self.parse_call_args(ctx)?
    } else {
      (Vec::new(), callee.loc)
    };
    let loc = start.loc + end;
    Ok(Node::new(loc, Expr::New(NewExpr { callee, arguments })))
  }

  fn parse_expr_operand(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let operand_ctx = ctx.with_include_in(true);
    let token = self.peek();
    match token.typ {
      TT::ParenthesisOpen => self.parse_parenthesized_or_arrow(operand_ctx),
      TT::Identifier => {
        self.consume();
        let next = self.peek();
        if next.typ == TT::EqualsChevronRight && !next.preceded_by_line_terminator {
          // Single-parameter arrow function: `x => ...`.
          self.consume();
          let name = self.string(token.loc);
          let param = Node::new(token.loc, crate::ast::func::ParamDecl {
            pat: Node::new(token.loc, crate::ast::pat::Pat::Id(crate::ast::pat::IdPat { name })),
            default: None,
            rest: false,
          });
          let (func, loc) = self.parse_arrow_function_body(ctx, vec![param], token.loc)?;
          return Ok(Node::new(loc, Expr::ArrowFunc(ArrowFuncExpr { func })));
        }
        let name = self.string(token.loc);
        if name == "arguments" {
          self.note_arguments_reference();
        }
        Ok(Node::new(token.loc, Expr::Id(IdExpr { name })))
      }
      TT::KeywordFunction => {
        let (_, func, loc) = self.parse_function_literal(ctx, false)?;
        Ok(Node::new(loc, Expr::Func(FuncExpr { func })))
      }
      TT::KeywordThis => {
        self.consume();
        Ok(Node::new(token.loc, Expr::This(ThisExpr {})))
      }
      TT::KeywordTrue | TT::KeywordFalse => {
        self.consume();
        Ok(Node::new(token.loc, Expr::LitBool(LitBoolExpr {
          value: token.typ == TT::KeywordTrue,
        })))
      }
      TT::KeywordNull => {
        self.consume();
        Ok(Node::new(token.loc, Expr::LitNull(LitNullExpr {})))
      }
      TT::KeywordUndefined => {
        self.consume();
        Ok(Node::new(token.loc, Expr::LitUndefined(LitUndefinedExpr {})))
      }
      TT::LiteralNumber => {
        self.consume();
        let value = self.decode_literal_number(token.loc)?;
        Ok(Node::new(token.loc, Expr::LitNum(LitNumExpr { value })))
      }
      TT::LiteralString => {
        self.consume();
        let value = self.decode_literal_string(token.loc)?;
        Ok(Node::new(token.loc, Expr::LitStr(LitStrExpr { value })))
      }
      TT::TemplateNoSub | TT::TemplateStart => self.parse_template(operand_ctx),
      TT::BracketOpen => self.parse_arr_literal(operand_ctx),
      TT::BraceOpen => self.parse_obj_literal(operand_ctx),
      TT::Slash | TT::SlashEquals => {
        Err(token.loc.error(SyntaxErrorType::RegexUnsupported, None))
      }
      TT::ReservedWord => Err(token.loc.error(SyntaxErrorType::ReservedWord, None)),
      TT::EOF => Err(token.loc.error(SyntaxErrorType::UnexpectedEnd, None)),
      typ => Err(token.loc.error(
        SyntaxErrorType::ExpectedSyntax("expression operand"),
        Some(typ),
      )),
    }
  }

  fn parse_parenthesized_or_arrow(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    // Covered grammar: `(a, b = 1)` is either a parameter list or a parenthesized expression.
    // Try the parameter-list reading; commit to an arrow function only once `=>` is seen.
    let cp = self.checkpoint();
    let start = self.peek().loc;
    if let Some(params) = self.try_parse_arrow_params(ctx) {
      let (func, loc) = self.parse_arrow_function_body(ctx, params, start)?;
      return Ok(Node::new(loc, Expr::ArrowFunc(ArrowFuncExpr { func })));
    }
    self.restore_checkpoint(cp);

    self.require(TT::ParenthesisOpen)?;
    let expr = self.parse_expr(ctx)?;
    self.require(TT::ParenthesisClose)?;
    Ok(expr)
  }

  fn try_parse_arrow_params(
    &mut self,
    ctx: ParseCtx,
  ) -> Option<Vec<Node<crate::ast::func::ParamDecl>>> {
    let params = self.parse_func_params(ctx).ok()?;
    let arrow = self.peek();
    if arrow.typ != TT::EqualsChevronRight || arrow.preceded_by_line_terminator {
      return None;
    }
    self.consume();
    Some(params)
  }

  fn parse_template(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let head = self.consume();
    let mut parts = Vec::<TemplatePart>::new();
    let mut loc = head.loc;

    match head.typ {
      TT::TemplateNoSub => {
        // Strip the surrounding backticks.
        let body = self.string(Loc(head.loc.0 + 1, head.loc.1 - 1));
        parts.push(TemplatePart::Str(self.decode_template_segment(head.loc, &body)?));
      }
      TT::TemplateStart => {
        // Strip the leading backtick and trailing `${`.
        let body = self.string(Loc(head.loc.0 + 1, head.loc.1 - 2));
        parts.push(TemplatePart::Str(self.decode_template_segment(head.loc, &body)?));
        loop {
          let expr = self.parse_expr(ctx)?;
          parts.push(TemplatePart::Expr(expr));
          let cont = self.consume_with_mode(LexMode::TemplateStrContinue);
          match cont.typ {
            TT::TemplateMiddle => {
              let body = self.string(Loc(cont.loc.0 + 1, cont.loc.1 - 2));
              parts.push(TemplatePart::Str(self.decode_template_segment(cont.loc, &body)?));
            }
            TT::TemplateEnd => {
              let body = self.string(Loc(cont.loc.0 + 1, cont.loc.1 - 1));
              parts.push(TemplatePart::Str(self.decode_template_segment(cont.loc, &body)?));
              loc += cont.loc;
              break;
            }
            _ => return Err(cont.loc.error(SyntaxErrorType::UnexpectedEnd, Some(cont.typ))),
          }
        }
      }
      _ => unreachable!(),
    }

    Ok(Node::new(loc, Expr::LitTemplate(LitTemplateExpr { parts })))
  }

  fn decode_template_segment(&self, loc: Loc, body: &str) -> SyntaxResult<String> {
    decode_str_body(body, true).map_err(|err| match err {
      DecodeStrError::InvalidEscape => loc.error(SyntaxErrorType::InvalidCharacterEscape, None),
      DecodeStrError::LineTerminator => loc.error(SyntaxErrorType::LineTerminatorInString, None),
    })
  }

  pub fn decode_literal_string(&self, loc: Loc) -> SyntaxResult<String> {
    let raw = self.str(loc);
    // Strip the quotes.
    let body = &raw[1..raw.len() - 1];
    decode_str_body(body, false).map_err(|err| match err {
      DecodeStrError::InvalidEscape => loc.error(SyntaxErrorType::InvalidCharacterEscape, None),
      DecodeStrError::LineTerminator => loc.error(SyntaxErrorType::LineTerminatorInString, None),
    })
  }

  pub fn decode_literal_number(&self, loc: Loc) -> SyntaxResult<JsNumber> {
    JsNumber::from_literal(self.str(loc))
      .ok_or_else(|| loc.error(SyntaxErrorType::MalformedLiteralNumber, None))
  }

  fn parse_arr_literal(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let start = self.require(TT::BracketOpen)?;
    let mut elements = Vec::<ArrElem>::new();
    let end = loop {
      if let Some(end) = self.consume_if(TT::BracketClose).match_loc() {
        break end;
      }
      if self.consume_if(TT::Comma).is_match() {
        elements.push(ArrElem::Empty);
        continue;
      }
      if self.consume_if(TT::DotDotDot).is_match() {
        elements.push(ArrElem::Spread(self.parse_expr_assignment(ctx)?));
      } else {
        elements.push(ArrElem::Single(self.parse_expr_assignment(ctx)?));
      }
      if !self.consume_if(TT::Comma).is_match() {
        break self.require(TT::BracketClose)?.loc;
      }
    };
    Ok(Node::new(start.loc + end, Expr::LitArr(LitArrExpr { elements })))
  }

  fn parse_obj_literal(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let start = self.require(TT::BraceOpen)?;
    let mut members = Vec::<Node<ObjMember>>::new();
    let end = loop {
      if let Some(end) = self.consume_if(TT::BraceClose).match_loc() {
        break end;
      }
      members.push(self.parse_obj_member(ctx)?);
      if !self.consume_if(TT::Comma).is_match() {
        break self.require(TT::BraceClose)?.loc;
      }
    };
    Ok(Node::new(start.loc + end, Expr::LitObj(LitObjExpr { members })))
  }

  fn parse_obj_member(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ObjMember>> {
    let key_token = self.peek();
    let (key, key_loc, word_key) = match key_token.typ {
      typ if tt_is_word(typ) => {
        self.consume();
        (
          PropKey::Direct(self.string(key_token.loc)),
          key_token.loc,
          typ == TT::Identifier,
        )
      }
      TT::LiteralString => {
        self.consume();
        (
          PropKey::Direct(self.decode_literal_string(key_token.loc)?),
          key_token.loc,
          false,
        )
      }
      TT::LiteralNumber => {
        self.consume();
        let num = self.decode_literal_number(key_token.loc)?;
        (PropKey::Direct(num.to_string()), key_token.loc, false)
      }
      TT::BracketOpen => {
        self.consume();
        let expr = self.parse_expr_assignment(ctx)?;
        let end = self.require(TT::BracketClose)?.loc;
        (PropKey::Computed(expr), key_token.loc + end, false)
      }
      typ => {
        return Err(
          key_token
            .loc
            .error(SyntaxErrorType::ExpectedSyntax("property name"), Some(typ)),
        )
      }
    };

    let next = self.peek();
    match next.typ {
      TT::Colon => {
        self.consume();
        let value = self.parse_expr_assignment(ctx)?;
        let loc = key_loc + value.loc;
        Ok(Node::new(loc, ObjMember::Prop { key, value }))
      }
      TT::ParenthesisOpen => {
        // Method shorthand.
        self.push_func_flags(false);
        let body_ctx = ctx.with_in_function();
        let body_result: SyntaxResult<(
          Vec<Node<crate::ast::func::ParamDecl>>,
          Vec<Node<crate::ast::stmt::Stmt>>,
          crate::loc::Loc,
        )> = (|| {
          let params = self.parse_func_params(ctx)?;
          self.require(TT::BraceOpen)?;
          let mut body = Vec::new();
          let end = loop {
            if let Some(end) = self.consume_if(TT::BraceClose).match_loc() {
              break end;
            }
            body.push(self.parse_stmt(body_ctx)?);
          };
          Ok((params, body, end))
        })();
        let uses_arguments = self.pop_func_flags();
        let (params, body, end) = body_result?;
        let name = match &key {
          PropKey::Direct(name) => Some(name.clone()),
          PropKey::Computed(_) => None,
        };
        let loc = key_loc + end;
        let func = self.add_func(crate::ast::func::Func {
          name,
          params,
          body: crate::ast::func::FuncBody::Block(body),
          arrow: false,
          uses_arguments,
          loc,
        });
        Ok(Node::new(loc, ObjMember::Method { key, func }))
      }
      _ if word_key => {
        let name = match key {
          PropKey::Direct(name) => name,
          PropKey::Computed(_) => unreachable!(),
        };
        Ok(Node::new(key_loc, ObjMember::Shorthand { name }))
      }
      typ => Err(
        next
          .loc
          .error(SyntaxErrorType::ExpectedSyntax("property value"), Some(typ)),
      ),
    }
  }
}
