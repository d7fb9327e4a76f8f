use crate::budget::InterruptToken;
use crate::ctx::EvalCtx;
use crate::env::BindingKind;
use crate::error::Error;
use crate::error::EvalError;
use crate::error::EvalErrorKind;
use crate::error::Fault;
use crate::error::LimitKind;
use crate::error::SyntaxError;
use crate::error::VmResult;
use crate::heap::ObjKind;
use crate::host::HostObjectData;
use crate::host::HostObjectDef;
use crate::host::JsValue;
use crate::host::PropResolver;
use crate::source::SourceText;
use crate::value::Value;
use parse_js6::ast::TopLevel;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Script metadata supplied at parse time.
#[derive(Debug, Clone)]
pub struct ScriptInfo {
  /// Filename reported in stack traces.
  pub filename: String,
}

impl ScriptInfo {
  pub fn new(filename: impl Into<String>) -> ScriptInfo {
    ScriptInfo {
      filename: filename.into(),
    }
  }
}

impl Default for ScriptInfo {
  fn default() -> Self {
    ScriptInfo {
      filename: "<anonymous>".to_string(),
    }
  }
}

/// The immutable payload behind a [`ParsedScript`]: the AST (with its
/// function table) plus the indexed source text.
#[derive(Debug)]
pub(crate) struct ScriptData {
  pub top: TopLevel,
  pub source: SourceText,
}

/// A parsed script: immutable, cheap to clone, safe to share across threads,
/// and reusable for any number of independent executions.
#[derive(Debug, Clone)]
pub struct ParsedScript {
  data: Arc<ScriptData>,
}

/// Final counters of a finished execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStats {
  /// Total interpreter operations charged.
  pub ops: u64,
  /// Cumulative bytes charged to the memory accountant (monotonic; equals the
  /// peak).
  pub mem_bytes: usize,
}

/// Result value plus execution counters.
#[derive(Debug, Clone)]
pub struct Evaluation {
  pub value: JsValue,
  pub stats: ExecutionStats,
}

/// Per-execution configuration.
#[derive(Clone)]
pub struct EvalOpts {
  /// Extra bindings installed into the global scope, marshalled at startup.
  pub custom_globals: Vec<(String, JsValue)>,
  /// Host objects (constants + typed/varargs methods) installed as globals.
  pub custom_definitions: Vec<HostObjectDef>,
  /// Dynamic-property objects installed as globals; every property access
  /// dispatches through the resolver.
  pub dynamic_objects: Vec<(String, Rc<dyn PropResolver>)>,
  /// Op budget for the execution.
  pub max_ops: u64,
  /// Cumulative allocation budget in bytes.
  pub max_mem_bytes: usize,
  /// Wall-clock budget.
  pub timeout: Duration,
  /// Script call-stack depth cap.
  pub max_call_depth: usize,
  /// How many ops elapse between wall-clock checks.
  pub check_time_every: u32,
  /// Optional externally-owned cancellation flag; setting it to `true` from
  /// any thread terminates the execution at the next budget check.
  pub interrupt_flag: Option<Arc<AtomicBool>>,
}

impl Default for EvalOpts {
  fn default() -> Self {
    EvalOpts {
      custom_globals: Vec::new(),
      custom_definitions: Vec::new(),
      dynamic_objects: Vec::new(),
      max_ops: 10_000_000,
      max_mem_bytes: 1 << 23,
      timeout: Duration::from_millis(5000),
      max_call_depth: 300,
      check_time_every: 100,
      interrupt_flag: None,
    }
  }
}

/// Parses `source` with default script metadata.
pub fn parse(source: &str) -> Result<ParsedScript, SyntaxError> {
  parse_with_info(source, ScriptInfo::default())
}

/// Parses `source`, reporting failures with 1-based line/column positions.
pub fn parse_with_info(source: &str, info: ScriptInfo) -> Result<ParsedScript, SyntaxError> {
  let source_text = SourceText::new(info.filename, source);
  match parse_js6::parse(source) {
    Ok(top) => Ok(ParsedScript {
      data: Arc::new(ScriptData {
        top: *top.stx,
        source: source_text,
      }),
    }),
    Err(err) => {
      let (line, column) = source_text.line_col(err.loc.0);
      Err(SyntaxError {
        line,
        column,
        message: err.message(),
      })
    }
  }
}

/// Parses and evaluates in one step, with default options.
pub fn eval(source: &str) -> Result<JsValue, Error> {
  eval_with(source, EvalOpts::default())
}

pub fn eval_with(source: &str, opts: EvalOpts) -> Result<JsValue, Error> {
  let script = parse(source)?;
  Ok(script.eval_with(opts)?)
}

impl ParsedScript {
  /// Evaluates with default options.
  pub fn eval(&self) -> Result<JsValue, EvalError> {
    self.eval_with(EvalOpts::default())
  }

  pub fn eval_with(&self, opts: EvalOpts) -> Result<JsValue, EvalError> {
    self.eval_with_details(opts).map(|evaluation| evaluation.value)
  }

  /// Evaluates and also returns the final execution counters.
  pub fn eval_with_details(&self, opts: EvalOpts) -> Result<Evaluation, EvalError> {
    let interrupt = match &opts.interrupt_flag {
      Some(flag) => InterruptToken::from_shared_flag(flag.clone()).0,
      None => InterruptToken::new().0,
    };

    let mut ctx = EvalCtx::new(
      self.data.clone(),
      opts.max_ops,
      opts.max_mem_bytes,
      opts.timeout,
      opts.max_call_depth,
      opts.check_time_every,
      interrupt,
    )
    .map_err(limit_eval_error)?;

    let setup = install_environment(&mut ctx, &opts);
    if let Err(fault) = setup {
      return Err(fault.into_eval_error());
    }

    match ctx.run_program() {
      Ok(value) => {
        let value = ctx.take(&value);
        Ok(Evaluation {
          value,
          stats: ExecutionStats {
            ops: ctx.ops(),
            mem_bytes: ctx.mem_bytes(),
          },
        })
      }
      Err(fault) => Err(fault.into_eval_error()),
    }
  }
}

fn limit_eval_error(kind: LimitKind) -> EvalError {
  EvalError {
    kind: EvalErrorKind::Limit(kind),
    message: kind.message().to_string(),
    stack: Vec::new(),
  }
}

fn install_environment(ctx: &mut EvalCtx, opts: &EvalOpts) -> VmResult<()> {
  crate::builtins::seed_globals(ctx)?;

  for (name, value) in &opts.custom_globals {
    let value = ctx.make_value(value)?;
    ctx.declare_binding(ctx.global_env, name, BindingKind::Var, value, true)?;
  }

  for def in &opts.custom_definitions {
    let mut methods = Vec::with_capacity(def.methods.len());
    for (name, method) in &def.methods {
      methods.push((ctx.new_str_value(name)?, method.clone()));
    }
    let id = ctx.alloc(ObjKind::Host(HostObjectData { methods }))?;
    for (name, constant) in &def.constants {
      let value = ctx.make_value(constant)?;
      let key = ctx.new_str_value(name)?;
      ctx.heap.set_prop(id, key, value).map_err(Fault::limit)?;
    }
    ctx.declare_binding(
      ctx.global_env,
      &def.name,
      BindingKind::Var,
      Value::Object(id),
      true,
    )?;
  }

  for (name, resolver) in &opts.dynamic_objects {
    let id = ctx.alloc(ObjKind::Dynamic(resolver.clone()))?;
    ctx.declare_binding(ctx.global_env, name, BindingKind::Var, Value::Object(id), true)?;
  }

  Ok(())
}
