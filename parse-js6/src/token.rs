use crate::loc::Loc;

/// Token types for the accepted subset.
///
/// Multi-character punctuators are named by spelling out their characters
/// (`EqualsChevronRight` is `=>`), which keeps the enum grep-able without a
/// second symbolic name for every punctuator.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum TT {
  // Special token used to represent the end of the source code. Easier than using and handling
  // Option everywhere.
  EOF,
  // Special token used to represent invalid source code. Easier than having to propagate
  // SyntaxError from the lexer level, which means even peeking during parsing requires error
  // handling.
  Invalid,

  Ampersand,
  AmpersandAmpersand,
  AmpersandEquals,
  Asterisk,
  AsteriskEquals,
  Bar,
  BarBar,
  BarEquals,
  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  Caret,
  CaretEquals,
  ChevronLeft,
  ChevronLeftChevronLeft,
  ChevronLeftChevronLeftEquals,
  ChevronLeftEquals,
  ChevronRight,
  ChevronRightChevronRight,
  ChevronRightChevronRightChevronRight,
  ChevronRightChevronRightChevronRightEquals,
  ChevronRightChevronRightEquals,
  ChevronRightEquals,
  Colon,
  Comma,
  Dot,
  DotDotDot,
  Equals,
  EqualsChevronRight,
  EqualsEquals,
  EqualsEqualsEquals,
  Exclamation,
  ExclamationEquals,
  ExclamationEqualsEquals,
  Hyphen,
  HyphenEquals,
  HyphenHyphen,
  ParenthesisClose,
  ParenthesisOpen,
  Percent,
  PercentEquals,
  Plus,
  PlusEquals,
  PlusPlus,
  Question,
  Semicolon,
  Slash,
  SlashEquals,
  Tilde,

  Identifier,
  KeywordBreak,
  KeywordCase,
  KeywordCatch,
  KeywordConst,
  KeywordContinue,
  KeywordDefault,
  KeywordDelete,
  KeywordDo,
  KeywordElse,
  KeywordFalse,
  KeywordFinally,
  KeywordFor,
  KeywordFunction,
  KeywordIf,
  KeywordIn,
  KeywordLet,
  KeywordNew,
  KeywordNull,
  KeywordOf,
  KeywordReturn,
  KeywordSwitch,
  KeywordThis,
  KeywordThrow,
  KeywordTrue,
  KeywordTry,
  KeywordTypeof,
  KeywordUndefined,
  KeywordVar,
  KeywordWhile,
  // Recognized so it can never be used as an identifier; always rejected by the parser.
  ReservedWord,

  LiteralNumber,
  LiteralString,
  // Template literal segments. `...` is the string part, `${`/`}` are substitution delimiters.
  // TemplateNoSub:  `...`
  // TemplateStart:  `...${
  // TemplateMiddle: }...${
  // TemplateEnd:    }...`
  TemplateEnd,
  TemplateMiddle,
  TemplateNoSub,
  TemplateStart,
}

#[derive(Clone, Copy, Debug)]
pub struct Token {
  pub loc: Loc,
  pub typ: TT,
  pub preceded_by_line_terminator: bool,
}
