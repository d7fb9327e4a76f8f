use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use once_cell::sync::Lazy;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum OperatorName {
  Addition,
  Assignment,
  AssignmentAddition,
  AssignmentBitwiseAnd,
  AssignmentBitwiseLeftShift,
  AssignmentBitwiseOr,
  AssignmentBitwiseRightShift,
  AssignmentBitwiseUnsignedRightShift,
  AssignmentBitwiseXor,
  AssignmentDivision,
  AssignmentMultiplication,
  AssignmentRemainder,
  AssignmentSubtraction,
  BitwiseAnd,
  BitwiseLeftShift,
  BitwiseNot,
  BitwiseOr,
  BitwiseRightShift,
  BitwiseUnsignedRightShift,
  BitwiseXor,
  Call,
  Comma,
  ComputedMemberAccess,
  Conditional,
  Delete,
  Division,
  Equality,
  GreaterThan,
  GreaterThanOrEqual,
  In,
  Inequality,
  LessThan,
  LessThanOrEqual,
  LogicalAnd,
  LogicalNot,
  LogicalOr,
  MemberAccess,
  Multiplication,
  New,
  PostfixDecrement,
  PostfixIncrement,
  PrefixDecrement,
  PrefixIncrement,
  Remainder,
  StrictEquality,
  StrictInequality,
  Subtraction,
  Typeof,
  UnaryNegation,
  UnaryPlus,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Associativity {
  Left,
  Right,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Arity {
  Unary,
  Binary,
  Ternary,
}

#[derive(Clone, Debug)]
pub struct Operator {
  pub name: OperatorName,
  pub arity: Arity,
  pub associativity: Associativity,
  pub precedence: u8,
}

/// Whether this operator is one of the compound assignment forms (`+=`, `<<=`, ...), and if so,
/// the underlying binary operator applied before assignment.
pub fn assignment_operand_operator(name: OperatorName) -> Option<OperatorName> {
  use OperatorName::*;
  Some(match name {
    AssignmentAddition => Addition,
    AssignmentBitwiseAnd => BitwiseAnd,
    AssignmentBitwiseLeftShift => BitwiseLeftShift,
    AssignmentBitwiseOr => BitwiseOr,
    AssignmentBitwiseRightShift => BitwiseRightShift,
    AssignmentBitwiseUnsignedRightShift => BitwiseUnsignedRightShift,
    AssignmentBitwiseXor => BitwiseXor,
    AssignmentDivision => Division,
    AssignmentMultiplication => Multiplication,
    AssignmentRemainder => Remainder,
    AssignmentSubtraction => Subtraction,
    _ => return None,
  })
}

pub fn is_assignment_operator(name: OperatorName) -> bool {
  name == OperatorName::Assignment || assignment_operand_operator(name).is_some()
}

#[rustfmt::skip]
pub static OPERATORS: Lazy<HashMap<OperatorName, Operator>> = Lazy::new(|| {
  use Arity::*;
  use Associativity::*;
  use OperatorName::*;

  let mut map = HashMap::<OperatorName, Operator>::new();
  let mut op = |name: OperatorName, arity: Arity, associativity: Associativity, precedence: u8| {
    map.insert(name, Operator { name, arity, associativity, precedence });
  };

  // Precedence levels follow the ECMAScript operator table; higher binds tighter.
  op(Comma,                               Binary,  Left,  1);
  op(Assignment,                          Binary,  Right, 3);
  op(AssignmentAddition,                  Binary,  Right, 3);
  op(AssignmentBitwiseAnd,                Binary,  Right, 3);
  op(AssignmentBitwiseLeftShift,          Binary,  Right, 3);
  op(AssignmentBitwiseOr,                 Binary,  Right, 3);
  op(AssignmentBitwiseRightShift,         Binary,  Right, 3);
  op(AssignmentBitwiseUnsignedRightShift, Binary,  Right, 3);
  op(AssignmentBitwiseXor,                Binary,  Right, 3);
  op(AssignmentDivision,                  Binary,  Right, 3);
  op(AssignmentMultiplication,            Binary,  Right, 3);
  op(AssignmentRemainder,                 Binary,  Right, 3);
  op(AssignmentSubtraction,               Binary,  Right, 3);
  op(Conditional,                         Ternary, Right, 4);
  op(LogicalOr,                           Binary,  Left,  5);
  op(LogicalAnd,                          Binary,  Left,  6);
  op(BitwiseOr,                           Binary,  Left,  7);
  op(BitwiseXor,                          Binary,  Left,  8);
  op(BitwiseAnd,                          Binary,  Left,  9);
  op(Equality,                            Binary,  Left,  10);
  op(Inequality,                          Binary,  Left,  10);
  op(StrictEquality,                      Binary,  Left,  10);
  op(StrictInequality,                    Binary,  Left,  10);
  op(GreaterThan,                         Binary,  Left,  11);
  op(GreaterThanOrEqual,                  Binary,  Left,  11);
  op(In,                                  Binary,  Left,  11);
  op(LessThan,                            Binary,  Left,  11);
  op(LessThanOrEqual,                     Binary,  Left,  11);
  op(BitwiseLeftShift,                    Binary,  Left,  12);
  op(BitwiseRightShift,                   Binary,  Left,  12);
  op(BitwiseUnsignedRightShift,           Binary,  Left,  12);
  op(Addition,                            Binary,  Left,  13);
  op(Subtraction,                         Binary,  Left,  13);
  op(Division,                            Binary,  Left,  14);
  op(Multiplication,                      Binary,  Left,  14);
  op(Remainder,                           Binary,  Left,  14);
  op(BitwiseNot,                          Unary,   Right, 15);
  op(Delete,                              Unary,   Right, 15);
  op(LogicalNot,                          Unary,   Right, 15);
  op(PrefixDecrement,                     Unary,   Right, 15);
  op(PrefixIncrement,                     Unary,   Right, 15);
  op(Typeof,                              Unary,   Right, 15);
  op(UnaryNegation,                       Unary,   Right, 15);
  op(UnaryPlus,                           Unary,   Right, 15);
  op(PostfixDecrement,                    Unary,   Left,  16);
  op(PostfixIncrement,                    Unary,   Left,  16);
  op(New,                                 Unary,   Right, 18);
  op(Call,                                Binary,  Left,  19);
  op(ComputedMemberAccess,                Binary,  Left,  19);
  op(MemberAccess,                        Binary,  Left,  19);
  map
});

#[rustfmt::skip]
pub static MULTARY_OPERATOR_MAPPING: Lazy<HashMap<TT, &'static Operator>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static Operator>::new();
  map.insert(TT::Plus, &OPERATORS[&OperatorName::Addition]);
  map.insert(TT::Equals, &OPERATORS[&OperatorName::Assignment]);
  map.insert(TT::PlusEquals, &OPERATORS[&OperatorName::AssignmentAddition]);
  map.insert(TT::AmpersandEquals, &OPERATORS[&OperatorName::AssignmentBitwiseAnd]);
  map.insert(TT::ChevronLeftChevronLeftEquals, &OPERATORS[&OperatorName::AssignmentBitwiseLeftShift]);
  map.insert(TT::BarEquals, &OPERATORS[&OperatorName::AssignmentBitwiseOr]);
  map.insert(TT::ChevronRightChevronRightEquals, &OPERATORS[&OperatorName::AssignmentBitwiseRightShift]);
  map.insert(TT::ChevronRightChevronRightChevronRightEquals, &OPERATORS[&OperatorName::AssignmentBitwiseUnsignedRightShift]);
  map.insert(TT::CaretEquals, &OPERATORS[&OperatorName::AssignmentBitwiseXor]);
  map.insert(TT::SlashEquals, &OPERATORS[&OperatorName::AssignmentDivision]);
  map.insert(TT::AsteriskEquals, &OPERATORS[&OperatorName::AssignmentMultiplication]);
  map.insert(TT::PercentEquals, &OPERATORS[&OperatorName::AssignmentRemainder]);
  map.insert(TT::HyphenEquals, &OPERATORS[&OperatorName::AssignmentSubtraction]);
  map.insert(TT::Ampersand, &OPERATORS[&OperatorName::BitwiseAnd]);
  map.insert(TT::ChevronLeftChevronLeft, &OPERATORS[&OperatorName::BitwiseLeftShift]);
  map.insert(TT::Bar, &OPERATORS[&OperatorName::BitwiseOr]);
  map.insert(TT::ChevronRightChevronRight, &OPERATORS[&OperatorName::BitwiseRightShift]);
  map.insert(TT::ChevronRightChevronRightChevronRight, &OPERATORS[&OperatorName::BitwiseUnsignedRightShift]);
  map.insert(TT::Caret, &OPERATORS[&OperatorName::BitwiseXor]);
  map.insert(TT::ParenthesisOpen, &OPERATORS[&OperatorName::Call]);
  map.insert(TT::Comma, &OPERATORS[&OperatorName::Comma]);
  map.insert(TT::BracketOpen, &OPERATORS[&OperatorName::ComputedMemberAccess]);
  map.insert(TT::Question, &OPERATORS[&OperatorName::Conditional]);
  map.insert(TT::Slash, &OPERATORS[&OperatorName::Division]);
  map.insert(TT::EqualsEquals, &OPERATORS[&OperatorName::Equality]);
  map.insert(TT::ChevronRight, &OPERATORS[&OperatorName::GreaterThan]);
  map.insert(TT::ChevronRightEquals, &OPERATORS[&OperatorName::GreaterThanOrEqual]);
  map.insert(TT::KeywordIn, &OPERATORS[&OperatorName::In]);
  map.insert(TT::ExclamationEquals, &OPERATORS[&OperatorName::Inequality]);
  map.insert(TT::ChevronLeft, &OPERATORS[&OperatorName::LessThan]);
  map.insert(TT::ChevronLeftEquals, &OPERATORS[&OperatorName::LessThanOrEqual]);
  map.insert(TT::AmpersandAmpersand, &OPERATORS[&OperatorName::LogicalAnd]);
  map.insert(TT::BarBar, &OPERATORS[&OperatorName::LogicalOr]);
  map.insert(TT::Dot, &OPERATORS[&OperatorName::MemberAccess]);
  map.insert(TT::Asterisk, &OPERATORS[&OperatorName::Multiplication]);
  map.insert(TT::Percent, &OPERATORS[&OperatorName::Remainder]);
  map.insert(TT::EqualsEqualsEquals, &OPERATORS[&OperatorName::StrictEquality]);
  map.insert(TT::ExclamationEqualsEquals, &OPERATORS[&OperatorName::StrictInequality]);
  map.insert(TT::Hyphen, &OPERATORS[&OperatorName::Subtraction]);
  map
});

#[rustfmt::skip]
pub static UNARY_OPERATOR_MAPPING: Lazy<HashMap<TT, &'static Operator>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static Operator>::new();
  // Postfix{Increment,Decrement} are handled manually by the expression parser.
  map.insert(TT::Tilde, &OPERATORS[&OperatorName::BitwiseNot]);
  map.insert(TT::KeywordDelete, &OPERATORS[&OperatorName::Delete]);
  map.insert(TT::Exclamation, &OPERATORS[&OperatorName::LogicalNot]);
  map.insert(TT::KeywordNew, &OPERATORS[&OperatorName::New]);
  map.insert(TT::HyphenHyphen, &OPERATORS[&OperatorName::PrefixDecrement]);
  map.insert(TT::PlusPlus, &OPERATORS[&OperatorName::PrefixIncrement]);
  map.insert(TT::Hyphen, &OPERATORS[&OperatorName::UnaryNegation]);
  map.insert(TT::Plus, &OPERATORS[&OperatorName::UnaryPlus]);
  map.insert(TT::KeywordTypeof, &OPERATORS[&OperatorName::Typeof]);
  map
});
