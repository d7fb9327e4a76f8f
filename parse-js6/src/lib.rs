//! Lexer + parser for a sandboxed subset of ECMAScript 6.
//!
//! The produced AST is immutable, `Send + Sync`, and carries no interior
//! references: function bodies are stored in a program-level table addressed
//! by [`ast::FuncId`], so downstream evaluators can hold closures as plain
//! ids. Parse once, evaluate any number of times.
//!
//! Deliberately outside the accepted grammar (each is a [`error::SyntaxError`]
//! naming the construct): regex literals, classes, generators, `async`/
//! `await`, modules, `with`, `void`, `instanceof`, optional chaining and
//! nullish coalescing, exponentiation, and labels on non-loop statements.

use ast::Node;
use ast::TopLevel;
use error::SyntaxResult;
use lex::Lexer;
use parse::Parser;

pub mod ast;
pub mod char;
pub mod error;
pub mod lex;
pub mod loc;
pub mod num;
pub mod operator;
pub mod parse;
pub mod token;

pub fn parse(source: &str) -> SyntaxResult<Node<TopLevel>> {
  let lexer = Lexer::new(source);
  let mut parser = Parser::new(lexer);
  parser.parse_top_level()
}
