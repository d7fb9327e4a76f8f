use super::ParseCtx;
use super::Parser;
use crate::ast::func::Func;
use crate::ast::func::FuncBody;
use crate::ast::func::ParamDecl;
use crate::ast::FuncId;
use crate::ast::Node;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// Parses a parenthesized parameter list, including the parentheses.
  pub fn parse_func_params(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<ParamDecl>>> {
    self.require(TT::ParenthesisOpen)?;
    let mut params = Vec::<Node<ParamDecl>>::new();
    loop {
      if self.consume_if(TT::ParenthesisClose).is_match() {
        break;
      }
      if let Some(rest_loc) = self.consume_if(TT::DotDotDot).match_loc() {
        let pat = self.parse_pat(ctx)?;
        let loc = rest_loc + pat.loc;
        params.push(Node::new(loc, ParamDecl {
          pat,
          default: None,
          rest: true,
        }));
        self.require(TT::ParenthesisClose)?;
        break;
      }
      let pat = self.parse_pat(ctx)?;
      let default = if self.consume_if(TT::Equals).is_match() {
        Some(self.parse_expr_assignment(ctx.with_include_in(true))?)
      } else {
        None
      };
      let loc = pat.loc.add_option(default.as_ref().map(|d| d.loc));
      params.push(Node::new(loc, ParamDecl {
        pat,
        default,
        rest: false,
      }));
      if !self.consume_if(TT::Comma).is_match() {
        self.require(TT::ParenthesisClose)?;
        break;
      }
    }
    Ok(params)
  }

  /// Parses `function name?(params) { body }` starting at the `function` keyword. Used for both
  /// declarations (name required) and function expressions.
  pub fn parse_function_literal(
    &mut self,
    ctx: ParseCtx,
    name_required: bool,
  ) -> SyntaxResult<(Option<String>, FuncId, Loc)> {
    let start = self.require(TT::KeywordFunction)?;
    let name = match self.peek().typ {
      TT::Identifier => {
        let token = self.consume();
        Some(self.string(token.loc))
      }
      _ if name_required => {
        let token = self.peek();
        return Err(token.loc.error(
          SyntaxErrorType::ExpectedSyntax("function name"),
          Some(token.typ),
        ));
      }
      _ => None,
    };

    let params = self.parse_func_params(ctx)?;
    let body_ctx = ctx.with_in_function();
    // Balanced with the pop below even when body parsing fails: errors stay
    // inside `body_result` until the flags are popped.
    self.push_func_flags(false);
    let body_result: SyntaxResult<(Vec<Node<crate::ast::stmt::Stmt>>, Loc)> = (|| {
      self.require(TT::BraceOpen)?;
      let mut body = Vec::new();
      let end = loop {
        if let Some(end) = self.consume_if(TT::BraceClose).match_loc() {
          break end;
        }
        body.push(self.parse_stmt(body_ctx)?);
      };
      Ok((body, end))
    })();
    let uses_arguments = self.pop_func_flags();
    let (body, end) = body_result?;

    let loc = start.loc + end;
    let func = self.add_func(Func {
      name: name.clone(),
      params,
      body: FuncBody::Block(body),
      arrow: false,
      uses_arguments,
      loc,
    });
    Ok((name, func, loc))
  }

  /// Parses an arrow function's body (after `=>`) and registers the function.
  pub fn parse_arrow_function_body(
    &mut self,
    ctx: ParseCtx,
    params: Vec<Node<ParamDecl>>,
    start: Loc,
  ) -> SyntaxResult<(FuncId, Loc)> {
    let body_ctx = ctx.with_in_function();
    self.push_func_flags(true);
    let body_result: SyntaxResult<(FuncBody, Loc)> = (|| {
      if self.peek().typ == TT::BraceOpen {
        self.consume();
        let mut body = Vec::new();
        let end = loop {
          if let Some(end) = self.consume_if(TT::BraceClose).match_loc() {
            break end;
          }
          body.push(self.parse_stmt(body_ctx)?);
        };
        Ok((FuncBody::Block(body), end))
      } else {
        let expr = self.parse_expr_assignment(body_ctx.with_include_in(true))?;
        let end = expr.loc;
        Ok((FuncBody::Expr(expr), end))
      }
    })();
    let uses_arguments = self.pop_func_flags();
    let (body, end) = body_result?;

    let loc = start + end;
    let func = self.add_func(Func {
      name: None,
      params,
      body,
      arrow: true,
      uses_arguments,
      loc,
    });
    Ok((func, loc))
  }
}
