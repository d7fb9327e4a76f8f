use crate::value::Value;
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

/// Which execution budget was exceeded.
///
/// The display strings are load-bearing: hosts match on them, so they are
/// fixed literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
  Ops,
  Memory,
  CallDepth,
  Timeout,
}

impl LimitKind {
  pub fn message(&self) -> &'static str {
    match self {
      LimitKind::Ops => "Reached the execution limit!",
      LimitKind::Memory => "Reached the memory limit!",
      LimitKind::CallDepth => "Reached the call stack limit!",
      LimitKind::Timeout => "Reached the timeout!",
    }
  }
}

impl Display for LimitKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.message())
  }
}

/// One script-level stack frame: the re-rendered source of the statement
/// active in its activation, plus the script position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
  pub call_site: String,
  pub filename: Arc<str>,
  pub line: u32,
}

impl Display for StackFrame {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{call_site} ({filename}:{line})",
      call_site = self.call_site,
      filename = self.filename,
      line = self.line
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
  /// A runtime fault or an uncaught script `throw`; was catchable by script `try`.
  Runtime,
  /// An exceeded execution budget; never catchable by scripts.
  Limit(LimitKind),
}

/// A failed execution: message plus the script-level call stack, innermost
/// frame first.
#[derive(Debug, Clone)]
pub struct EvalError {
  pub kind: EvalErrorKind,
  pub message: String,
  pub stack: Vec<StackFrame>,
}

impl EvalError {
  pub fn is_limit(&self) -> bool {
    matches!(self.kind, EvalErrorKind::Limit(_))
  }
}

impl Display for EvalError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)?;
    for frame in &self.stack {
      write!(f, "\n{frame}")?;
    }
    Ok(())
  }
}

impl std::error::Error for EvalError {}

/// A lex/parse failure, positioned at the offending source location (1-based).
#[derive(Debug, Clone, thiserror::Error)]
#[error("[line: {line}, column: {column}] {message}")]
pub struct SyntaxError {
  pub line: u32,
  pub column: u32,
  pub message: String,
}

/// Either error family, as returned by the one-shot [`crate::eval`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Syntax(#[from] SyntaxError),
  #[error(transparent)]
  Eval(#[from] EvalError),
}

/// Internal propagation of abrupt non-control-flow outcomes.
///
/// Script `throw` and runtime faults travel as `Thrown` and are catchable by
/// script `try`. Exceeded budgets travel as `Limit` and unwind past every
/// `try`/`finally` to the host.
///
/// `stack` accumulates one frame per activation as the fault propagates:
/// whenever `pending_frame` is set, the next enclosing statement evaluator
/// appends itself and clears the flag; call boundaries re-set it.
#[derive(Debug, Clone)]
pub(crate) struct Fault {
  pub kind: FaultKind,
  pub stack: Vec<StackFrame>,
  pub pending_frame: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum FaultKind {
  Thrown { value: Value, message: String },
  Limit(LimitKind),
}

impl Fault {
  pub fn thrown(value: Value, message: String) -> Fault {
    Fault {
      kind: FaultKind::Thrown { value, message },
      stack: Vec::new(),
      pending_frame: true,
    }
  }

  pub fn limit(kind: LimitKind) -> Fault {
    Fault {
      kind: FaultKind::Limit(kind),
      stack: Vec::new(),
      pending_frame: true,
    }
  }

  pub fn is_catchable(&self) -> bool {
    matches!(self.kind, FaultKind::Thrown { .. })
  }

  pub fn into_eval_error(self) -> EvalError {
    match self.kind {
      FaultKind::Thrown { message, .. } => EvalError {
        kind: EvalErrorKind::Runtime,
        message,
        stack: self.stack,
      },
      FaultKind::Limit(kind) => EvalError {
        kind: EvalErrorKind::Limit(kind),
        message: kind.message().to_string(),
        stack: self.stack,
      },
    }
  }
}

impl From<LimitKind> for Fault {
  fn from(kind: LimitKind) -> Fault {
    Fault::limit(kind)
  }
}

pub(crate) type VmResult<T> = Result<T, Fault>;
