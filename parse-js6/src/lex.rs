use crate::char::is_line_terminator;
use crate::char::is_whitespace;
use crate::char::CharFilter;
use crate::char::DIGIT;
use crate::char::DIGIT_BIN;
use crate::char::DIGIT_HEX;
use crate::char::DIGIT_OCT;
use crate::char::ID_CONTINUE;
use crate::char::ID_START;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use ahash::HashSetExt;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::AhoCorasickKind;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use memchr::memchr3;
use once_cell::sync::Lazy;

/// Lexing modes. There is deliberately no "slash is regex" mode: `/` always
/// lexes as division punctuation and the parser rejects it in operand
/// position, which is what keeps regular expressions out of the language.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LexMode {
  Standard,
  // Re-lex from a `}` that closes a template substitution.
  TemplateStrContinue,
}

#[derive(Copy, Clone)]
pub struct LexerCheckpoint {
  next: usize,
}

pub struct Lexer<'a> {
  source: &'a str,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(code: &'a str) -> Lexer<'a> {
    Lexer {
      source: code,
      next: 0,
    }
  }

  pub fn next(&self) -> usize {
    self.next
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  pub fn source_range(&self) -> Loc {
    Loc(0, self.end())
  }

  fn peek_or_eof(&self, n: usize) -> Option<char> {
    self.source[self.next..].chars().nth(n)
  }

  pub fn set_next(&mut self, next: usize) {
    self.next = next;
  }

  pub fn checkpoint(&self) -> LexerCheckpoint {
    LexerCheckpoint { next: self.next }
  }

  pub fn since_checkpoint(&self, checkpoint: LexerCheckpoint) -> Loc {
    Loc(checkpoint.next, self.next)
  }

  fn consume_next(&mut self) -> Option<char> {
    let c = self.peek_or_eof(0)?;
    self.next += c.len_utf8();
    Some(c)
  }

  fn consume_if_char(&mut self, c: char) -> bool {
    if self.peek_or_eof(0) == Some(c) {
      self.next += c.len_utf8();
      true
    } else {
      false
    }
  }

  fn consume_while(&mut self, chars: &CharFilter) -> usize {
    let mut len = 0;
    for ch in self.source[self.next..].chars() {
      if chars.has(ch) {
        len += ch.len_utf8();
      } else {
        break;
      }
    }
    self.next += len;
    len
  }
}

impl<'a> std::ops::Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

pub static KEYWORDS_MAPPING: Lazy<HashMap<&'static str, TT>> = Lazy::new(|| {
  let mut map = HashMap::<&'static str, TT>::new();
  map.insert("break", TT::KeywordBreak);
  map.insert("case", TT::KeywordCase);
  map.insert("catch", TT::KeywordCatch);
  map.insert("const", TT::KeywordConst);
  map.insert("continue", TT::KeywordContinue);
  map.insert("default", TT::KeywordDefault);
  map.insert("delete", TT::KeywordDelete);
  map.insert("do", TT::KeywordDo);
  map.insert("else", TT::KeywordElse);
  map.insert("false", TT::KeywordFalse);
  map.insert("finally", TT::KeywordFinally);
  map.insert("for", TT::KeywordFor);
  map.insert("function", TT::KeywordFunction);
  map.insert("if", TT::KeywordIf);
  map.insert("in", TT::KeywordIn);
  map.insert("let", TT::KeywordLet);
  map.insert("new", TT::KeywordNew);
  map.insert("null", TT::KeywordNull);
  map.insert("of", TT::KeywordOf);
  map.insert("return", TT::KeywordReturn);
  map.insert("switch", TT::KeywordSwitch);
  map.insert("this", TT::KeywordThis);
  map.insert("throw", TT::KeywordThrow);
  map.insert("true", TT::KeywordTrue);
  map.insert("try", TT::KeywordTry);
  map.insert("typeof", TT::KeywordTypeof);
  map.insert("undefined", TT::KeywordUndefined);
  map.insert("var", TT::KeywordVar);
  map.insert("while", TT::KeywordWhile);
  map
});

/// Words outside the accepted subset that must never be usable as identifiers. The lexer tags
/// them [`TT::ReservedWord`]; the parser reports the construct by name.
pub static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  let mut set = HashSet::<&'static str>::new();
  for word in [
    "async",
    "await",
    "class",
    "debugger",
    "enum",
    "eval",
    "export",
    "extends",
    "implements",
    "import",
    "instanceof",
    "interface",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "super",
    "void",
    "with",
    "yield",
  ] {
    set.insert(word);
  }
  set
});

#[rustfmt::skip]
static PUNCTUATORS: &[(TT, &str)] = &[
  (TT::Ampersand, "&"),
  (TT::AmpersandAmpersand, "&&"),
  (TT::AmpersandEquals, "&="),
  (TT::Asterisk, "*"),
  (TT::AsteriskEquals, "*="),
  (TT::Bar, "|"),
  (TT::BarBar, "||"),
  (TT::BarEquals, "|="),
  (TT::BraceClose, "}"),
  (TT::BraceOpen, "{"),
  (TT::BracketClose, "]"),
  (TT::BracketOpen, "["),
  (TT::Caret, "^"),
  (TT::CaretEquals, "^="),
  (TT::ChevronLeft, "<"),
  (TT::ChevronLeftChevronLeft, "<<"),
  (TT::ChevronLeftChevronLeftEquals, "<<="),
  (TT::ChevronLeftEquals, "<="),
  (TT::ChevronRight, ">"),
  (TT::ChevronRightChevronRight, ">>"),
  (TT::ChevronRightChevronRightChevronRight, ">>>"),
  (TT::ChevronRightChevronRightChevronRightEquals, ">>>="),
  (TT::ChevronRightChevronRightEquals, ">>="),
  (TT::ChevronRightEquals, ">="),
  (TT::Colon, ":"),
  (TT::Comma, ","),
  (TT::Dot, "."),
  (TT::DotDotDot, "..."),
  (TT::Equals, "="),
  (TT::EqualsChevronRight, "=>"),
  (TT::EqualsEquals, "=="),
  (TT::EqualsEqualsEquals, "==="),
  (TT::Exclamation, "!"),
  (TT::ExclamationEquals, "!="),
  (TT::ExclamationEqualsEquals, "!=="),
  (TT::Hyphen, "-"),
  (TT::HyphenEquals, "-="),
  (TT::HyphenHyphen, "--"),
  (TT::ParenthesisClose, ")"),
  (TT::ParenthesisOpen, "("),
  (TT::Percent, "%"),
  (TT::PercentEquals, "%="),
  (TT::Plus, "+"),
  (TT::PlusEquals, "+="),
  (TT::PlusPlus, "++"),
  (TT::Question, "?"),
  (TT::Semicolon, ";"),
  (TT::Slash, "/"),
  (TT::SlashEquals, "/="),
  (TT::Tilde, "~"),
];

struct PatternMatcher {
  patterns: Vec<TT>,
  matcher: AhoCorasick,
}

impl PatternMatcher {
  fn new(patterns: &[(TT, &str)]) -> Self {
    let (tts, syns): (Vec<_>, Vec<_>) = patterns.iter().copied().unzip();
    let matcher = AhoCorasickBuilder::new()
      .start_kind(StartKind::Anchored)
      .kind(Some(AhoCorasickKind::DFA))
      .match_kind(MatchKind::LeftmostLongest)
      .build(syns)
      .unwrap();
    PatternMatcher {
      patterns: tts,
      matcher,
    }
  }

  fn find(&self, lexer: &Lexer) -> Option<(TT, usize)> {
    self
      .matcher
      .find(Input::new(&lexer.source[lexer.next..]).anchored(Anchored::Yes))
      .map(|m| (self.patterns[m.pattern().as_usize()], m.end()))
  }
}

static PUNCTUATOR_MATCHER: Lazy<PatternMatcher> = Lazy::new(|| PatternMatcher::new(PUNCTUATORS));

/// Lexes the next token.
///
/// Malformed input produces a [`TT::Invalid`] token covering the offending
/// bytes instead of an error, so peeking during parsing never requires error
/// handling.
pub fn lex_next(lexer: &mut Lexer, mode: LexMode) -> Token {
  let preceded_by_line_terminator = skip_trivia(lexer);
  let cp = lexer.checkpoint();

  let typ = match mode {
    LexMode::TemplateStrContinue => lex_template_continue(lexer),
    LexMode::Standard => lex_standard(lexer),
  };

  Token {
    loc: lexer.since_checkpoint(cp),
    typ,
    preceded_by_line_terminator,
  }
}

fn skip_trivia(lexer: &mut Lexer) -> bool {
  let mut saw_line_terminator = false;
  loop {
    let Some(c) = lexer.peek_or_eof(0) else {
      break;
    };
    if is_line_terminator(c) {
      saw_line_terminator = true;
      lexer.consume_next();
      continue;
    }
    if is_whitespace(c) {
      lexer.consume_next();
      continue;
    }
    if c == '/' {
      match lexer.peek_or_eof(1) {
        Some('/') => {
          lexer.next += 2;
          while let Some(c) = lexer.peek_or_eof(0) {
            if is_line_terminator(c) {
              break;
            }
            lexer.consume_next();
          }
          continue;
        }
        Some('*') => {
          lexer.next += 2;
          let rest = &lexer.source[lexer.next..];
          match rest.find("*/") {
            Some(pos) => {
              if rest[..pos].chars().any(is_line_terminator) {
                saw_line_terminator = true;
              }
              lexer.next += pos + 2;
            }
            None => {
              // Unterminated comment: consume to EOF; the EOF token follows.
              lexer.next = lexer.end();
            }
          }
          continue;
        }
        _ => break,
      }
    }
    break;
  }
  saw_line_terminator
}

fn lex_standard(lexer: &mut Lexer) -> TT {
  let Some(c) = lexer.peek_or_eof(0) else {
    return TT::EOF;
  };

  if ID_START.has(c) {
    return lex_identifier_or_keyword(lexer);
  }

  if DIGIT.has(c) || (c == '.' && lexer.peek_or_eof(1).is_some_and(|c| DIGIT.has(c))) {
    return lex_number(lexer);
  }

  if c == '"' || c == '\'' {
    return lex_string(lexer, c);
  }

  if c == '`' {
    lexer.consume_next();
    return match lex_template_body(lexer) {
      TemplateBodyEnd::Backtick => TT::TemplateNoSub,
      TemplateBodyEnd::Substitution => TT::TemplateStart,
      TemplateBodyEnd::Eof => TT::Invalid,
    };
  }

  match PUNCTUATOR_MATCHER.find(lexer) {
    Some((typ, len)) => {
      lexer.next += len;
      typ
    }
    None => {
      lexer.consume_next();
      TT::Invalid
    }
  }
}

fn lex_identifier_or_keyword(lexer: &mut Lexer) -> TT {
  let cp = lexer.checkpoint();
  lexer.consume_while(&ID_CONTINUE);
  let name = &lexer[lexer.since_checkpoint(cp)];
  if let Some(&typ) = KEYWORDS_MAPPING.get(name) {
    return typ;
  }
  if RESERVED_WORDS.contains(name) {
    return TT::ReservedWord;
  }
  TT::Identifier
}

fn lex_number(lexer: &mut Lexer) -> TT {
  if lexer.consume_if_char('0') {
    let radix = match lexer.peek_or_eof(0) {
      Some('x') | Some('X') => Some(&*DIGIT_HEX),
      Some('o') | Some('O') => Some(&*DIGIT_OCT),
      Some('b') | Some('B') => Some(&*DIGIT_BIN),
      _ => None,
    };
    if let Some(radix) = radix {
      lexer.consume_next();
      if lexer.consume_while(radix) == 0 {
        return TT::Invalid;
      }
      return finish_number(lexer);
    }
    // Fall through: `0`, `0.5`, `0e3`, or the rejected legacy `0123` form (the literal parser
    // reports the latter).
  }

  lexer.consume_while(&DIGIT);
  if lexer.consume_if_char('.') {
    lexer.consume_while(&DIGIT);
  }
  if matches!(lexer.peek_or_eof(0), Some('e') | Some('E')) {
    lexer.consume_next();
    if matches!(lexer.peek_or_eof(0), Some('+') | Some('-')) {
      lexer.consume_next();
    }
    if lexer.consume_while(&DIGIT) == 0 {
      return TT::Invalid;
    }
  }
  finish_number(lexer)
}

fn finish_number(lexer: &mut Lexer) -> TT {
  // A literal immediately followed by an identifier character (`123abc`) is malformed.
  if lexer.peek_or_eof(0).is_some_and(|c| ID_CONTINUE.has(c)) {
    lexer.consume_while(&ID_CONTINUE);
    return TT::Invalid;
  }
  TT::LiteralNumber
}

fn lex_string(lexer: &mut Lexer, quote: char) -> TT {
  lexer.consume_next();
  loop {
    let Some(c) = lexer.consume_next() else {
      return TT::Invalid;
    };
    if c == quote {
      return TT::LiteralString;
    }
    if c == '\\' {
      // The escaped character is consumed blindly here; escape validity (and legal escaped line
      // terminators) is checked when the literal body is decoded.
      lexer.consume_next();
      continue;
    }
    if is_line_terminator(c) {
      return TT::Invalid;
    }
  }
}

enum TemplateBodyEnd {
  Backtick,
  Substitution,
  Eof,
}

fn lex_template_body(lexer: &mut Lexer) -> TemplateBodyEnd {
  loop {
    // Fast-forward to the next interesting byte; `$`, backtick, and backslash are all ASCII.
    let rest = lexer.source[lexer.next..].as_bytes();
    let Some(pos) = memchr3(b'`', b'$', b'\\', rest) else {
      lexer.next = lexer.end();
      return TemplateBodyEnd::Eof;
    };
    lexer.next += pos;

    match lexer.consume_next() {
      Some('`') => return TemplateBodyEnd::Backtick,
      Some('$') => {
        if lexer.consume_if_char('{') {
          return TemplateBodyEnd::Substitution;
        }
      }
      Some('\\') => {
        lexer.consume_next();
      }
      _ => return TemplateBodyEnd::Eof,
    }
  }
}

fn lex_template_continue(lexer: &mut Lexer) -> TT {
  if !lexer.consume_if_char('}') {
    return TT::Invalid;
  }
  match lex_template_body(lexer) {
    TemplateBodyEnd::Backtick => TT::TemplateEnd,
    TemplateBodyEnd::Substitution => TT::TemplateMiddle,
    TemplateBodyEnd::Eof => TT::Invalid,
  }
}

/// Decodes the body of a string literal or template string segment, resolving escape sequences.
///
/// `allow_line_terminators` is true for template segments, where raw line terminators are legal.
pub fn decode_str_body(raw: &str, allow_line_terminators: bool) -> Result<String, DecodeStrError> {
  let mut out = String::with_capacity(raw.len());
  let mut chars = raw.chars().peekable();
  while let Some(c) = chars.next() {
    if is_line_terminator(c) && !allow_line_terminators {
      return Err(DecodeStrError::LineTerminator);
    }
    if c != '\\' {
      out.push(c);
      continue;
    }
    let Some(esc) = chars.next() else {
      return Err(DecodeStrError::InvalidEscape);
    };
    match esc {
      'n' => out.push('\n'),
      't' => out.push('\t'),
      'r' => out.push('\r'),
      'b' => out.push('\u{0008}'),
      'f' => out.push('\u{000C}'),
      'v' => out.push('\u{000B}'),
      '0' => {
        // `\0` only when not followed by a digit (otherwise it is a legacy octal escape).
        if chars.peek().is_some_and(|c| c.is_ascii_digit()) {
          return Err(DecodeStrError::InvalidEscape);
        }
        out.push('\0');
      }
      '1'..='9' => return Err(DecodeStrError::InvalidEscape),
      'x' => {
        let hi = chars.next().and_then(|c| c.to_digit(16));
        let lo = chars.next().and_then(|c| c.to_digit(16));
        match (hi, lo) {
          (Some(hi), Some(lo)) => {
            out.push(char::from_u32(hi * 16 + lo).ok_or(DecodeStrError::InvalidEscape)?)
          }
          _ => return Err(DecodeStrError::InvalidEscape),
        }
      }
      'u' => {
        let code = if chars.peek() == Some(&'{') {
          chars.next();
          let mut value: u32 = 0;
          let mut any = false;
          loop {
            match chars.next() {
              Some('}') => break,
              Some(c) => {
                let digit = c.to_digit(16).ok_or(DecodeStrError::InvalidEscape)?;
                value = value
                  .checked_mul(16)
                  .and_then(|v| v.checked_add(digit))
                  .ok_or(DecodeStrError::InvalidEscape)?;
                any = true;
              }
              None => return Err(DecodeStrError::InvalidEscape),
            }
          }
          if !any {
            return Err(DecodeStrError::InvalidEscape);
          }
          value
        } else {
          let mut value: u32 = 0;
          for _ in 0..4 {
            let digit = chars
              .next()
              .and_then(|c| c.to_digit(16))
              .ok_or(DecodeStrError::InvalidEscape)?;
            value = value * 16 + digit;
          }
          value
        };
        // Lone surrogates cannot be represented in a Rust string; map them to the replacement
        // character rather than rejecting the script.
        out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
      }
      c if is_line_terminator(c) => {
        // Line continuation: the terminator is elided. CRLF counts as one terminator.
        if c == '\r' && chars.peek() == Some(&'\n') {
          chars.next();
        }
      }
      c => out.push(c),
    }
  }
  Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrError {
  InvalidEscape,
  LineTerminator,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lex_all(source: &str) -> Vec<TT> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
      let t = lex_next(&mut lexer, LexMode::Standard);
      if t.typ == TT::EOF {
        break;
      }
      tokens.push(t.typ);
      if t.typ == TT::Invalid {
        break;
      }
    }
    tokens
  }

  #[test]
  fn lexes_keywords_identifiers_and_punctuators() {
    assert_eq!(lex_all("let x = y => y + 1;"), vec![
      TT::KeywordLet,
      TT::Identifier,
      TT::Equals,
      TT::Identifier,
      TT::EqualsChevronRight,
      TT::Identifier,
      TT::Plus,
      TT::LiteralNumber,
      TT::Semicolon,
    ]);
  }

  #[test]
  fn lexes_longest_punctuator() {
    assert_eq!(lex_all("a >>>= b"), vec![
      TT::Identifier,
      TT::ChevronRightChevronRightChevronRightEquals,
      TT::Identifier,
    ]);
    assert_eq!(lex_all("a === b"), vec![
      TT::Identifier,
      TT::EqualsEqualsEquals,
      TT::Identifier,
    ]);
  }

  #[test]
  fn lexes_number_forms() {
    assert_eq!(lex_all("0x1f 0b10 0o17 1.5e-3 .5"), vec![
      TT::LiteralNumber,
      TT::LiteralNumber,
      TT::LiteralNumber,
      TT::LiteralNumber,
      TT::LiteralNumber,
    ]);
    assert_eq!(lex_all("0x"), vec![TT::Invalid]);
    assert_eq!(lex_all("123abc"), vec![TT::Invalid]);
  }

  #[test]
  fn hex_literal_does_not_swallow_following_operator() {
    assert_eq!(lex_all("0x1e+5"), vec![
      TT::LiteralNumber,
      TT::Plus,
      TT::LiteralNumber,
    ]);
  }

  #[test]
  fn reserved_words_are_tagged() {
    assert_eq!(lex_all("class"), vec![TT::ReservedWord]);
    assert_eq!(lex_all("await"), vec![TT::ReservedWord]);
    assert_eq!(lex_all("classic"), vec![TT::Identifier]);
  }

  #[test]
  fn tracks_line_terminators_through_comments() {
    let mut lexer = Lexer::new("a // x\nb /* y */ c /*\n*/ d");
    let a = lex_next(&mut lexer, LexMode::Standard);
    let b = lex_next(&mut lexer, LexMode::Standard);
    let c = lex_next(&mut lexer, LexMode::Standard);
    let d = lex_next(&mut lexer, LexMode::Standard);
    assert!(!a.preceded_by_line_terminator);
    assert!(b.preceded_by_line_terminator);
    assert!(!c.preceded_by_line_terminator);
    assert!(d.preceded_by_line_terminator);
  }

  #[test]
  fn lexes_template_literals() {
    assert_eq!(lex_all("`abc`"), vec![TT::TemplateNoSub]);

    let mut lexer = Lexer::new("`a${x}b${y}c`");
    assert_eq!(lex_next(&mut lexer, LexMode::Standard).typ, TT::TemplateStart);
    assert_eq!(lex_next(&mut lexer, LexMode::Standard).typ, TT::Identifier);
    assert_eq!(
      lex_next(&mut lexer, LexMode::TemplateStrContinue).typ,
      TT::TemplateMiddle
    );
    assert_eq!(lex_next(&mut lexer, LexMode::Standard).typ, TT::Identifier);
    assert_eq!(
      lex_next(&mut lexer, LexMode::TemplateStrContinue).typ,
      TT::TemplateEnd
    );
  }

  #[test]
  fn unterminated_string_is_invalid() {
    assert_eq!(lex_all("'abc"), vec![TT::Invalid]);
    assert_eq!(lex_all("'ab\ncd'"), vec![TT::Invalid]);
  }

  #[test]
  fn decodes_escapes() {
    assert_eq!(decode_str_body("a\\nb", false), Ok("a\nb".to_string()));
    assert_eq!(decode_str_body("\\u0041", false), Ok("A".to_string()));
    assert_eq!(decode_str_body("\\u{1F600}", false), Ok("\u{1F600}".to_string()));
    assert_eq!(decode_str_body("\\x41", false), Ok("A".to_string()));
    assert_eq!(decode_str_body("\\q", false), Ok("q".to_string()));
    assert_eq!(
      decode_str_body("\\8", false),
      Err(DecodeStrError::InvalidEscape)
    );
  }
}
