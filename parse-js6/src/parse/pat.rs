use super::ParseCtx;
use super::Parser;
use crate::ast::expr::Expr;
use crate::ast::pat::ArrPat;
use crate::ast::pat::ArrPatElem;
use crate::ast::pat::IdPat;
use crate::ast::pat::ObjPat;
use crate::ast::pat::ObjPatProp;
use crate::ast::pat::Pat;
use crate::ast::Node;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::token::TT;

impl<'a> Parser<'a> {
  pub fn parse_pat(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pat>> {
    let token = self.peek();
    match token.typ {
      TT::Identifier => {
        self.consume();
        let name = self.string(token.loc);
        Ok(Node::new(token.loc, Pat::Id(IdPat { name })))
      }
      TT::BracketOpen => self.parse_arr_pat(ctx),
      TT::BraceOpen => self.parse_obj_pat(ctx),
      typ => Err(
        token
          .loc
          .error(SyntaxErrorType::ExpectedSyntax("binding pattern"), Some(typ)),
      ),
    }
  }

  fn parse_arr_pat(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pat>> {
    let start = self.require(TT::BracketOpen)?;
    let mut elements = Vec::<Option<ArrPatElem>>::new();
    let mut rest = None;
    loop {
      if self.consume_if(TT::BracketClose).is_match() {
        break;
      }
      // Elision.
      if self.consume_if(TT::Comma).is_match() {
        elements.push(None);
        continue;
      }
      if self.consume_if(TT::DotDotDot).is_match() {
        rest = Some(self.parse_pat(ctx)?);
        self.require(TT::BracketClose)?;
        break;
      }
      let target = self.parse_pat(ctx)?;
      let default = self.parse_pat_default(ctx)?;
      elements.push(Some(ArrPatElem { target, default }));
      if !self.consume_if(TT::Comma).is_match() {
        self.require(TT::BracketClose)?;
        break;
      }
    }
    let loc = start.loc + Self::prev_loc_hint(&elements, &rest).unwrap_or(start.loc);
    Ok(Node::new(loc, Pat::Arr(ArrPat { elements, rest })))
  }

  fn prev_loc_hint(
    elements: &[Option<ArrPatElem>],
    rest: &Option<Node<Pat>>,
  ) -> Option<crate::loc::Loc> {
    if let Some(rest) = rest {
      return Some(rest.loc);
    }
    elements
      .iter()
      .rev()
      .find_map(|e| e.as_ref().map(|e| e.target.loc))
  }

  fn parse_obj_pat(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pat>> {
    let start = self.require(TT::BraceOpen)?;
    let mut properties = Vec::<ObjPatProp>::new();
    let mut end = start.loc;
    loop {
      if let Some(loc) = self.consume_if(TT::BraceClose).match_loc() {
        end = loc;
        break;
      }
      let key_token = self.peek();
      let key = match key_token.typ {
        TT::Identifier => {
          self.consume();
          self.string(key_token.loc)
        }
        TT::LiteralString => {
          self.consume();
          self.decode_literal_string(key_token.loc)?
        }
        typ => {
          return Err(
            key_token
              .loc
              .error(SyntaxErrorType::ExpectedSyntax("property name"), Some(typ)),
          )
        }
      };

      if self.consume_if(TT::Colon).is_match() {
        let target = self.parse_pat(ctx)?;
        let default = self.parse_pat_default(ctx)?;
        properties.push(ObjPatProp {
          key,
          target,
          default,
          shorthand: false,
        });
      } else {
        // Shorthand requires an identifier key.
        if key_token.typ != TT::Identifier {
          return Err(key_token.loc.error(
            SyntaxErrorType::ExpectedSyntax("destructuring target"),
            Some(key_token.typ),
          ));
        }
        let default = self.parse_pat_default(ctx)?;
        properties.push(ObjPatProp {
          key: key.clone(),
          target: Node::new(key_token.loc, Pat::Id(IdPat { name: key })),
          default,
          shorthand: true,
        });
      }

      if !self.consume_if(TT::Comma).is_match() {
        end = self.require(TT::BraceClose)?.loc;
        break;
      }
    }
    Ok(Node::new(start.loc + end, Pat::Obj(ObjPat { properties })))
  }

  fn parse_pat_default(&mut self, ctx: ParseCtx) -> SyntaxResult<Option<Node<Expr>>> {
    if !self.consume_if(TT::Equals).is_match() {
      return Ok(None);
    }
    Ok(Some(self.parse_expr_assignment(ctx)?))
  }
}
