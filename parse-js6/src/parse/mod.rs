use crate::ast::func::Func;
use crate::ast::FuncId;
use crate::ast::Node;
use crate::ast::TopLevel;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex_next;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;

pub mod expr;
pub mod func;
pub mod pat;
pub mod stmt;
#[cfg(test)]
mod tests;

/// Parse-time context passed by value through the grammar functions. Copies are cheap and callers
/// alter it by passing a modified copy rather than mutating shared state.
#[derive(Clone, Copy)]
pub struct ParseCtx {
  pub in_function: bool,
  // `in` must not be treated as a binary operator directly inside a `for (...)` header.
  pub include_in: bool,
}

impl ParseCtx {
  pub fn with_in_function(self) -> ParseCtx {
    ParseCtx {
      in_function: true,
      include_in: true,
    }
  }

  pub fn with_include_in(self, include_in: bool) -> ParseCtx {
    ParseCtx {
      include_in,
      ..self
    }
  }
}

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  typ: TT,
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn loc(&self) -> Loc {
    self.loc
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }

  pub fn error(&self, err: SyntaxErrorType) -> SyntaxError {
    debug_assert!(!self.matched);
    self.loc.error(err, Some(self.typ))
  }
}

pub struct ParserCheckpoint {
  next_tok_i: usize,
}

struct BufferedToken {
  token: Token,
  lex_mode: LexMode,
}

pub(crate) struct FuncFlags {
  pub arrow: bool,
  pub uses_arguments: bool,
}

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<BufferedToken>,
  next_tok_i: usize,
  funcs: Vec<Func>,
  func_flags: Vec<FuncFlags>,
}

impl<'a> Parser<'a> {
  pub fn new(lexer: Lexer<'a>) -> Parser<'a> {
    Parser {
      lexer,
      buf: Vec::new(),
      next_tok_i: 0,
      funcs: Vec::new(),
      func_flags: Vec::new(),
    }
  }

  pub(crate) fn push_func_flags(&mut self, arrow: bool) {
    self.func_flags.push(FuncFlags {
      arrow,
      uses_arguments: false,
    });
  }

  pub(crate) fn pop_func_flags(&mut self) -> bool {
    self.func_flags.pop().map(|f| f.uses_arguments).unwrap_or(false)
  }

  /// Records that the expression being parsed references `arguments`. The
  /// nearest enclosing non-arrow function materializes the array at call
  /// time; arrow functions are transparent.
  pub(crate) fn note_arguments_reference(&mut self) {
    for flags in self.func_flags.iter_mut().rev() {
      if !flags.arrow {
        flags.uses_arguments = true;
        return;
      }
    }
  }

  pub fn source_range(&self) -> Loc {
    self.lexer.source_range()
  }

  pub fn str(&self, loc: Loc) -> &str {
    &self.lexer[loc]
  }

  pub fn string(&self, loc: Loc) -> String {
    self.str(loc).to_string()
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
    }
  }

  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
  }

  pub fn add_func(&mut self, func: Func) -> FuncId {
    let id = FuncId(self.funcs.len() as u32);
    self.funcs.push(func);
    id
  }

  fn reset_to(&mut self, n: usize) {
    self.next_tok_i = n;
    self.buf.truncate(n);
    match self.buf.last() {
      Some(t) => self.lexer.set_next(t.token.loc.1),
      None => self.lexer.set_next(0),
    };
  }

  /// Returns the token at `next_tok_i + skip`, lexing forward as necessary. If an already-buffered
  /// token was produced under a different lex mode, the buffer is truncated there and re-lexed.
  fn forward(&mut self, skip: usize, mode: LexMode) -> Token {
    let target = self.next_tok_i + skip;
    if let Some(buffered) = self.buf.get(target) {
      if buffered.lex_mode == mode {
        return buffered.token;
      }
      self.reset_to(target);
    }
    while self.buf.len() <= target {
      // Tokens leading up to the target are lexed in Standard mode; only the target itself uses
      // the requested mode. (In practice `skip > 0` is only ever used with Standard.)
      let tok_mode = if self.buf.len() == target {
        mode
      } else {
        LexMode::Standard
      };
      let token = lex_next(&mut self.lexer, tok_mode);
      self.buf.push(BufferedToken {
        token,
        lex_mode: tok_mode,
      });
    }
    self.buf[target].token
  }

  pub fn peek(&mut self) -> Token {
    self.forward(0, LexMode::Standard)
  }

  pub fn peek_n(&mut self, skip: usize) -> Token {
    self.forward(skip, LexMode::Standard)
  }

  pub fn peek_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(0, mode)
  }

  pub fn consume(&mut self) -> Token {
    let token = self.peek();
    self.next_tok_i += 1;
    token
  }

  pub fn consume_with_mode(&mut self, mode: LexMode) -> Token {
    let token = self.peek_with_mode(mode);
    self.next_tok_i += 1;
    token
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    let token = self.peek();
    let matched = token.typ == typ;
    if matched {
      self.next_tok_i += 1;
    }
    MaybeToken {
      typ: token.typ,
      loc: token.loc,
      matched,
    }
  }

  pub fn require(&mut self, typ: TT) -> SyntaxResult<Token> {
    let token = self.peek();
    if token.typ != typ {
      return Err(token.loc.error(
        SyntaxErrorType::RequiredTokenNotFound(typ),
        Some(token.typ),
      ));
    }
    self.next_tok_i += 1;
    Ok(token)
  }

  /// Consumes a `;`, or applies automatic semicolon insertion: a `}`/EOF terminator or a preceding
  /// line terminator ends the statement.
  pub fn require_semicolon(&mut self) -> SyntaxResult<()> {
    let token = self.peek();
    match token.typ {
      TT::Semicolon => {
        self.next_tok_i += 1;
        Ok(())
      }
      TT::BraceClose | TT::EOF => Ok(()),
      _ if token.preceded_by_line_terminator => Ok(()),
      typ => Err(
        token
          .loc
          .error(SyntaxErrorType::ExpectedSyntax("semicolon"), Some(typ)),
      ),
    }
  }

  pub fn parse_top_level(&mut self) -> SyntaxResult<Node<TopLevel>> {
    let ctx = ParseCtx {
      in_function: false,
      include_in: true,
    };
    let mut body = Vec::new();
    while self.peek().typ != TT::EOF {
      body.push(self.parse_stmt(ctx)?);
    }
    let loc = self.source_range();
    let funcs = std::mem::take(&mut self.funcs);
    Ok(Node::new(loc, TopLevel { body, funcs }))
  }
}
