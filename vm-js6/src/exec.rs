use crate::ctx::EvalCtx;
use crate::env::BindingKind;
use crate::env::EnvId;
use crate::error::Fault;
use crate::error::LimitKind;
use crate::error::StackFrame;
use crate::error::VmResult;
use crate::func::Callable;
use crate::heap::ObjKind;
use crate::ops;
use crate::render;
use crate::value::Value;
use parse_js6::ast::expr::ArrElem;
use parse_js6::ast::expr::CallArg;
use parse_js6::ast::expr::Expr;
use parse_js6::ast::expr::ObjMember;
use parse_js6::ast::expr::PropKey;
use parse_js6::ast::expr::TemplatePart;
use parse_js6::ast::func::Func;
use parse_js6::ast::func::FuncBody;
use parse_js6::ast::pat::Pat;
use parse_js6::ast::stmt::CatchBlock;
use parse_js6::ast::stmt::DoWhileStmt;
use parse_js6::ast::stmt::ForInOfMode;
use parse_js6::ast::stmt::ForInOfStmt;
use parse_js6::ast::stmt::ForTripleInit;
use parse_js6::ast::stmt::ForTripleStmt;
use parse_js6::ast::stmt::IfStmt;
use parse_js6::ast::stmt::LabelStmt;
use parse_js6::ast::stmt::Stmt;
use parse_js6::ast::stmt::SwitchStmt;
use parse_js6::ast::stmt::TryStmt;
use parse_js6::ast::stmt::VarDecl;
use parse_js6::ast::stmt::VarDeclMode;
use parse_js6::ast::FuncId;
use parse_js6::ast::Node;
use parse_js6::operator::assignment_operand_operator;
use parse_js6::operator::OperatorName;

/// An ECMAScript completion record.
///
/// The "empty" completion value is modeled explicitly as `None` so statement
/// lists can implement `UpdateEmpty` (e.g. `1; if (true) {}` evaluates to
/// `1`). Script `throw` does not appear here: thrown values (and uncatchable
/// limit faults) travel in the `Err` arm of [`VmResult`].
#[derive(Clone, Debug)]
pub(crate) enum Completion {
  Normal(Option<Value>),
  Return(Value),
  Break(Option<String>, Option<Value>),
  Continue(Option<String>, Option<Value>),
}

impl Completion {
  pub fn empty() -> Self {
    Completion::Normal(None)
  }

  pub fn normal(value: Value) -> Self {
    Completion::Normal(Some(value))
  }

  pub fn is_abrupt(&self) -> bool {
    !matches!(self, Completion::Normal(_))
  }

  pub fn value(&self) -> Option<Value> {
    match self {
      Completion::Normal(v) => v.clone(),
      Completion::Return(v) => Some(v.clone()),
      Completion::Break(_, v) => v.clone(),
      Completion::Continue(_, v) => v.clone(),
    }
  }

  /// `UpdateEmpty(completion, value)`.
  pub fn update_empty(self, value: Option<Value>) -> Self {
    match self {
      Completion::Normal(None) => Completion::Normal(value),
      Completion::Break(target, None) => Completion::Break(target, value),
      Completion::Continue(target, None) => Completion::Continue(target, value),
      other => other,
    }
  }
}

/// Where a pattern's bound names land.
#[derive(Clone, Copy)]
enum BindMode {
  /// Create (or initialize a hoisted) binding in the given frame.
  Declare { env: EnvId, kind: BindingKind },
  /// Assign to existing bindings through the scope chain.
  Assign,
}

impl EvalCtx {
  // ---- Program entry ----

  pub(crate) fn run_program(&mut self) -> VmResult<Value> {
    let script = self.script.clone();
    self.hoist_var_decls(self.global_env, &script.top.body)?;
    self.hoist_lexical_decls(self.global_env, &script.top.body)?;
    match self.eval_stmt_list(&script.top.body)? {
      Completion::Normal(v) => Ok(v.unwrap_or(Value::Undefined)),
      Completion::Break(..) => Err(self.make_error_fault("SyntaxError", "Illegal break statement")),
      Completion::Continue(..) => {
        Err(self.make_error_fault("SyntaxError", "Illegal continue statement"))
      }
      Completion::Return(_) => {
        Err(self.make_error_fault("SyntaxError", "Return statements are only valid inside functions"))
      }
    }
  }

  // ---- Hoisting ----

  /// Declares every `var` name in this scope (function or program body) with
  /// an `undefined` value. Nested functions are not entered.
  fn hoist_var_decls(&mut self, env: EnvId, stmts: &[Node<Stmt>]) -> VmResult<()> {
    let mut names = Vec::<String>::new();
    for stmt in stmts {
      collect_var_names(&stmt.stx, &mut names);
    }
    for name in names {
      if !self.envs.frame(env).bindings.contains_key(&name) {
        self.declare_binding(env, &name, BindingKind::Var, Value::Undefined, true)?;
      }
    }
    Ok(())
  }

  /// Creates the lexical bindings of a statement list: `let`/`const` start
  /// uninitialized (the TDZ), function declarations are bound and defined
  /// immediately.
  fn hoist_lexical_decls(&mut self, env: EnvId, stmts: &[Node<Stmt>]) -> VmResult<()> {
    for stmt in stmts {
      match &*stmt.stx {
        Stmt::VarDecl(decl) if decl.mode != VarDeclMode::Var => {
          let kind = match decl.mode {
            VarDeclMode::Let => BindingKind::Let,
            _ => BindingKind::Const,
          };
          let mut names = Vec::new();
          for declarator in &decl.declarators {
            collect_pat_names(&declarator.pattern.stx, &mut names);
          }
          for name in names {
            self.declare_binding(env, &name, kind, Value::Undefined, false)?;
          }
        }
        Stmt::FunctionDecl(decl) => {
          let closure = self.instantiate_closure(decl.func)?;
          self.declare_binding(env, &decl.name, BindingKind::Fn, closure, true)?;
        }
        _ => {}
      }
    }
    Ok(())
  }

  // ---- Statements ----

  pub(crate) fn eval_stmt_list(&mut self, stmts: &[Node<Stmt>]) -> VmResult<Completion> {
    let mut last: Option<Value> = None;
    for stmt in stmts {
      let completion = self.eval_stmt(stmt)?.update_empty(last.clone());
      match completion {
        Completion::Normal(v) => {
          if v.is_some() {
            last = v;
          }
        }
        abrupt => return Ok(abrupt),
      }
    }
    Ok(Completion::Normal(last))
  }

  fn eval_stmt(&mut self, stmt: &Node<Stmt>) -> VmResult<Completion> {
    // One tick per statement.
    let result = self.tick().and_then(|_| self.eval_stmt_inner(stmt));
    match result {
      Err(mut fault) if fault.pending_frame => {
        fault.pending_frame = false;
        fault.stack.push(self.stack_frame_for_stmt(stmt));
        Err(fault)
      }
      other => other,
    }
  }

  fn stack_frame_for_stmt(&self, stmt: &Node<Stmt>) -> StackFrame {
    StackFrame {
      call_site: render::render_stmt(&stmt.stx),
      filename: self.script.source.name.clone(),
      line: self.script.source.line_of(stmt.loc.0),
    }
  }

  fn eval_stmt_inner(&mut self, stmt: &Node<Stmt>) -> VmResult<Completion> {
    match &*stmt.stx {
      Stmt::Empty(_) => Ok(Completion::empty()),
      Stmt::Expr(s) => {
        let value = self.eval_expr(&s.expr)?;
        Ok(Completion::normal(value))
      }
      Stmt::VarDecl(decl) => self.eval_var_decl(decl),
      Stmt::Block(block) => self.eval_block(&block.body),
      Stmt::FunctionDecl(_) => Ok(Completion::empty()),
      Stmt::If(s) => self.eval_if(s),
      Stmt::While(s) => self.eval_while(s, None),
      Stmt::DoWhile(s) => self.eval_do_while(s, None),
      Stmt::ForTriple(s) => self.eval_for_triple(s, None),
      Stmt::ForInOf(s) => self.eval_for_in_of(s, None),
      Stmt::Switch(s) => self.eval_switch(s),
      Stmt::Label(s) => self.eval_label(s),
      Stmt::Break(s) => Ok(Completion::Break(s.label.clone(), None)),
      Stmt::Continue(s) => Ok(Completion::Continue(s.label.clone(), None)),
      Stmt::Return(s) => {
        let value = match &s.value {
          Some(expr) => self.eval_expr(expr)?,
          None => Value::Undefined,
        };
        Ok(Completion::Return(value))
      }
      Stmt::Throw(s) => {
        let value = self.eval_expr(&s.value)?;
        let message = self.thrown_message(&value);
        Err(Fault::thrown(value, message))
      }
      Stmt::Try(s) => self.eval_try(s),
    }
  }

  fn eval_block(&mut self, stmts: &[Node<Stmt>]) -> VmResult<Completion> {
    // Blocks without lexical declarations run in the enclosing frame, so a
    // busy loop over `{}` exhausts the op budget, not the memory budget.
    if !block_needs_env(stmts) {
      return self.eval_stmt_list(stmts);
    }
    let outer = self.lexical_env;
    let env = self.new_env(Some(outer))?;
    self.lexical_env = env;
    let result = self
      .hoist_lexical_decls(env, stmts)
      .and_then(|_| self.eval_stmt_list(stmts));
    self.lexical_env = outer;
    result
  }

  fn eval_var_decl(&mut self, decl: &VarDecl) -> VmResult<Completion> {
    for declarator in &decl.declarators {
      let value = match &declarator.initializer {
        Some(init) => self.eval_expr(init)?,
        None => Value::Undefined,
      };
      match decl.mode {
        VarDeclMode::Var => {
          // The binding was hoisted to `undefined`; only initializers assign.
          if declarator.initializer.is_some() {
            self.bind_pattern(&declarator.pattern, value, BindMode::Assign)?;
          }
        }
        VarDeclMode::Let | VarDeclMode::Const => {
          let kind = if decl.mode == VarDeclMode::Let {
            BindingKind::Let
          } else {
            BindingKind::Const
          };
          let env = self.lexical_env;
          self.bind_pattern(&declarator.pattern, value, BindMode::Declare { env, kind })?;
        }
      }
    }
    Ok(Completion::empty())
  }

  fn eval_if(&mut self, stmt: &IfStmt) -> VmResult<Completion> {
    let test = self.eval_expr(&stmt.test)?;
    if ops::to_boolean(&test) {
      self.eval_stmt(&stmt.consequent)
    } else if let Some(alternate) = &stmt.alternate {
      self.eval_stmt(alternate)
    } else {
      Ok(Completion::empty())
    }
  }

  fn eval_while(
    &mut self,
    stmt: &parse_js6::ast::stmt::WhileStmt,
    active_label: Option<&str>,
  ) -> VmResult<Completion> {
    loop {
      let test = self.eval_expr(&stmt.condition)?;
      if !ops::to_boolean(&test) {
        break;
      }
      match self.eval_stmt(&stmt.body)? {
        Completion::Normal(_) => {}
        Completion::Continue(None, _) => continue,
        Completion::Continue(Some(ref l), _) if active_label == Some(l.as_str()) => continue,
        Completion::Break(None, _) => break,
        Completion::Break(Some(ref l), _) if active_label == Some(l.as_str()) => break,
        other => return Ok(other),
      }
    }
    Ok(Completion::empty())
  }

  fn eval_do_while(
    &mut self,
    stmt: &DoWhileStmt,
    active_label: Option<&str>,
  ) -> VmResult<Completion> {
    loop {
      match self.eval_stmt(&stmt.body)? {
        Completion::Normal(_) => {}
        Completion::Continue(None, _) => {}
        Completion::Continue(Some(ref l), _) if active_label == Some(l.as_str()) => {}
        Completion::Break(None, _) => break,
        Completion::Break(Some(ref l), _) if active_label == Some(l.as_str()) => break,
        other => return Ok(other),
      }
      let test = self.eval_expr(&stmt.condition)?;
      if !ops::to_boolean(&test) {
        break;
      }
    }
    Ok(Completion::empty())
  }

  fn eval_for_triple(
    &mut self,
    stmt: &ForTripleStmt,
    active_label: Option<&str>,
  ) -> VmResult<Completion> {
    let outer = self.lexical_env;

    let result = (|| {
      // Bound names of a `let`/`const` init. Each iteration runs in a fresh
      // frame holding copies of these bindings, so closures created in the
      // body capture that iteration's values.
      let mut per_iteration_names: Option<Vec<String>> = None;

      match &stmt.init {
        ForTripleInit::None => {}
        ForTripleInit::Expr(expr) => {
          let _ = self.eval_expr(expr)?;
        }
        ForTripleInit::Decl(decl) => {
          if decl.stx.mode != VarDeclMode::Var {
            let env = self.new_env(Some(outer))?;
            self.lexical_env = env;
            let kind = if decl.stx.mode == VarDeclMode::Let {
              BindingKind::Let
            } else {
              BindingKind::Const
            };
            let mut names = Vec::new();
            for declarator in &decl.stx.declarators {
              collect_pat_names(&declarator.pattern.stx, &mut names);
            }
            for name in &names {
              self.declare_binding(env, name, kind, Value::Undefined, false)?;
            }
            per_iteration_names = Some(names);
          }
          let _ = self.eval_var_decl(&decl.stx)?;
        }
      }

      if let Some(names) = &per_iteration_names {
        self.copy_loop_bindings(names, outer)?;
      }

      loop {
        if let Some(cond) = &stmt.cond {
          let test = self.eval_expr(cond)?;
          if !ops::to_boolean(&test) {
            break;
          }
        } else {
          // `for(;;)` has no per-iteration condition node; tick explicitly so
          // the budget still observes every iteration.
          self.tick()?;
        }

        match self.eval_stmt(&stmt.body)? {
          Completion::Normal(_) => {}
          Completion::Continue(None, _) => {}
          Completion::Continue(Some(ref l), _) if active_label == Some(l.as_str()) => {}
          Completion::Break(None, _) => break,
          Completion::Break(Some(ref l), _) if active_label == Some(l.as_str()) => break,
          other => return Ok(other),
        }

        // The update expression runs against the next iteration's copies.
        if let Some(names) = &per_iteration_names {
          self.copy_loop_bindings(names, outer)?;
        }
        if let Some(post) = &stmt.post {
          let _ = self.eval_expr(post)?;
        }
      }
      Ok(Completion::empty())
    })();

    self.lexical_env = outer;
    result
  }

  /// CreatePerIterationEnvironment: snapshots the named loop bindings from
  /// the active frame into a fresh frame, which becomes the active lexical
  /// environment.
  fn copy_loop_bindings(&mut self, names: &[String], outer: EnvId) -> VmResult<()> {
    let current = self.lexical_env;
    let env = self.new_env(Some(outer))?;
    for name in names {
      let binding = self.envs.frame(current).bindings.get(name).cloned();
      if let Some(binding) = binding {
        self.declare_binding(env, name, binding.kind, binding.value, binding.initialized)?;
      }
    }
    self.lexical_env = env;
    Ok(())
  }

  fn eval_for_in_of(
    &mut self,
    stmt: &ForInOfStmt,
    active_label: Option<&str>,
  ) -> VmResult<Completion> {
    let rhs = self.eval_expr(&stmt.rhs)?;

    match stmt.mode {
      ForInOfMode::Of => self.run_for_of(stmt, rhs, active_label),
      ForInOfMode::In => {
        let keys: Vec<Value> = match &rhs {
          Value::Object(id) => {
            let keys = self.own_keys(*id)?;
            keys.into_iter().map(Value::Str).collect()
          }
          Value::Str(s) => {
            let count = s.encode_utf16().count();
            let mut keys = Vec::with_capacity(count);
            for i in 0..count {
              keys.push(Value::Str(self.new_str_from_string(i.to_string())?));
            }
            keys
          }
          // `for (k in 1)` and friends iterate nothing.
          _ => Vec::new(),
        };
        self.run_for_in_of_items(stmt, keys.into_iter(), active_label)
      }
    }
  }

  fn run_for_of(
    &mut self,
    stmt: &ForInOfStmt,
    rhs: Value,
    active_label: Option<&str>,
  ) -> VmResult<Completion> {
    match &rhs {
      Value::Object(id) if matches!(self.heap.obj(*id).kind, ObjKind::Array(_)) => {
        // Live iteration: growth during the loop is observed, like an array
        // iterator.
        let id = *id;
        let mut i = 0usize;
        loop {
          let elem = match &self.heap.obj(id).kind {
            ObjKind::Array(elems) if i < elems.len() => elems[i].clone(),
            _ => break,
          };
          i += 1;
          match self.run_for_in_of_iteration(stmt, elem, active_label)? {
            IterationOutcome::Continue => {}
            IterationOutcome::Break => break,
            IterationOutcome::Abrupt(completion) => return Ok(completion),
          }
        }
        Ok(Completion::empty())
      }
      Value::Str(s) => {
        let chars: Vec<String> = s.chars().map(|c| c.to_string()).collect();
        let mut items = Vec::with_capacity(chars.len());
        for c in chars {
          items.push(Value::Str(self.new_str_from_string(c)?));
        }
        self.run_for_in_of_items(stmt, items.into_iter(), active_label)
      }
      other => {
        let message = format!("{} is not iterable", self.display_value(other));
        Err(self.throw_type_error(&message))
      }
    }
  }

  fn run_for_in_of_items(
    &mut self,
    stmt: &ForInOfStmt,
    items: impl Iterator<Item = Value>,
    active_label: Option<&str>,
  ) -> VmResult<Completion> {
    for item in items {
      match self.run_for_in_of_iteration(stmt, item, active_label)? {
        IterationOutcome::Continue => {}
        IterationOutcome::Break => break,
        IterationOutcome::Abrupt(completion) => return Ok(completion),
      }
    }
    Ok(Completion::empty())
  }

  fn run_for_in_of_iteration(
    &mut self,
    stmt: &ForInOfStmt,
    item: Value,
    active_label: Option<&str>,
  ) -> VmResult<IterationOutcome> {
    let outer = self.lexical_env;
    let result = (|| {
      match stmt.decl_mode {
        Some(mode) => {
          // A fresh frame per iteration so closures capture distinct bindings.
          let env = self.new_env(Some(outer))?;
          self.lexical_env = env;
          let kind = match mode {
            VarDeclMode::Const => BindingKind::Const,
            VarDeclMode::Let => BindingKind::Let,
            VarDeclMode::Var => BindingKind::Var,
          };
          if mode == VarDeclMode::Var {
            self.bind_pattern(&stmt.pat, item, BindMode::Assign)?;
          } else {
            self.bind_pattern(&stmt.pat, item, BindMode::Declare { env, kind })?;
          }
        }
        None => {
          self.bind_pattern(&stmt.pat, item, BindMode::Assign)?;
        }
      }

      Ok(match self.eval_stmt(&stmt.body)? {
        Completion::Normal(_) => IterationOutcome::Continue,
        Completion::Continue(None, _) => IterationOutcome::Continue,
        Completion::Continue(Some(ref l), _) if active_label == Some(l.as_str()) => {
          IterationOutcome::Continue
        }
        Completion::Break(None, _) => IterationOutcome::Break,
        Completion::Break(Some(ref l), _) if active_label == Some(l.as_str()) => {
          IterationOutcome::Break
        }
        other => IterationOutcome::Abrupt(other),
      })
    })();
    self.lexical_env = outer;
    result
  }

  fn eval_switch(&mut self, stmt: &SwitchStmt) -> VmResult<Completion> {
    let discriminant = self.eval_expr(&stmt.test)?;

    let outer = self.lexical_env;
    let needs_env = stmt.branches.iter().any(|b| block_needs_env(&b.body));
    let result: VmResult<Completion> = (|| {
      if needs_env {
        let env = self.new_env(Some(outer))?;
        self.lexical_env = env;
        // `switch` shares one lexical frame across all case clauses.
        for branch in &stmt.branches {
          self.hoist_lexical_decls(env, &branch.body)?;
        }
      }

      // Select the first strictly-equal clause, or `default` if none match.
      let mut default_idx: Option<usize> = None;
      let mut start_idx: Option<usize> = None;
      for (i, branch) in stmt.branches.iter().enumerate() {
        match &branch.case {
          None => {
            if default_idx.is_none() {
              default_idx = Some(i);
            }
          }
          Some(case_expr) => {
            let case_value = self.eval_expr(case_expr)?;
            if ops::strict_equals(&discriminant, &case_value) {
              start_idx = Some(i);
              break;
            }
          }
        }
      }
      let Some(start_idx) = start_idx.or(default_idx) else {
        return Ok(Completion::empty());
      };

      let mut last: Option<Value> = None;
      for branch in stmt.branches.iter().skip(start_idx) {
        for stmt in &branch.body {
          let completion = self.eval_stmt(stmt)?.update_empty(last.clone());
          match completion {
            Completion::Normal(v) => {
              if v.is_some() {
                last = v;
              }
            }
            abrupt => return Ok(abrupt),
          }
        }
      }
      Ok(Completion::Normal(last))
    })();

    self.lexical_env = outer;
    let completion = result?;
    Ok(match completion {
      Completion::Break(None, v) => Completion::Normal(v),
      other => other,
    })
  }

  fn eval_label(&mut self, stmt: &LabelStmt) -> VmResult<Completion> {
    let label = stmt.name.as_str();

    // The parser restricts labels to loops and switch; pass the active label
    // through so `continue <label>` resumes the right loop.
    let completion = match &*stmt.statement.stx {
      Stmt::While(inner) => {
        // One tick for the labelled statement itself (normally charged by
        // `eval_stmt`).
        self.tick()?;
        self.eval_while(inner, Some(label))?
      }
      Stmt::DoWhile(inner) => {
        self.tick()?;
        self.eval_do_while(inner, Some(label))?
      }
      Stmt::ForTriple(inner) => {
        self.tick()?;
        self.eval_for_triple(inner, Some(label))?
      }
      Stmt::ForInOf(inner) => {
        self.tick()?;
        self.eval_for_in_of(inner, Some(label))?
      }
      _ => self.eval_stmt(&stmt.statement)?,
    };

    Ok(match completion {
      Completion::Break(Some(target), v) if target == label => Completion::Normal(v),
      other => other,
    })
  }

  fn eval_try(&mut self, stmt: &TryStmt) -> VmResult<Completion> {
    let mut outcome = match self.eval_block(&stmt.wrapped) {
      Ok(completion) => Ok(completion),
      Err(fault) if !fault.is_catchable() => return Err(fault),
      Err(fault) => match &stmt.catch {
        Some(catch) => self.eval_catch(catch, fault),
        None => Err(fault),
      },
    };

    if let Some(finally) = &stmt.finally {
      match self.eval_block(finally) {
        // A fault in `finally` (or an uncatchable one propagating into it)
        // replaces the pending outcome.
        Err(fault) => return Err(fault),
        Ok(completion) if completion.is_abrupt() => return Ok(completion),
        Ok(completion) => {
          outcome = match outcome {
            Ok(pending) => Ok(pending.update_empty(completion.value())),
            err => err,
          };
        }
      }
    }

    outcome
  }

  fn eval_catch(&mut self, catch: &CatchBlock, fault: Fault) -> VmResult<Completion> {
    let thrown = match fault.kind {
      crate::error::FaultKind::Thrown { value, .. } => value,
      // Unreachable: callers only pass catchable faults.
      crate::error::FaultKind::Limit(kind) => return Err(Fault::limit(kind)),
    };

    let outer = self.lexical_env;
    let env = self.new_env(Some(outer))?;
    self.lexical_env = env;
    let result = (|| {
      if let Some(parameter) = &catch.parameter {
        self.bind_pattern(parameter, thrown, BindMode::Declare {
          env,
          kind: BindingKind::Let,
        })?;
      }
      self.hoist_lexical_decls(env, &catch.body)?;
      self.eval_stmt_list(&catch.body)
    })();
    self.lexical_env = outer;
    result
  }

  // ---- Patterns and variables ----

  fn bind_pattern(&mut self, pat: &Node<Pat>, value: Value, mode: BindMode) -> VmResult<()> {
    match &*pat.stx {
      Pat::Id(id) => match mode {
        BindMode::Declare { env, kind } => self.declare_binding(env, &id.name, kind, value, true),
        BindMode::Assign => self.set_var(&id.name, value),
      },
      Pat::Arr(arr) => {
        if value.is_nullish() {
          let message = format!("Cannot destructure {}", self.display_value(&value));
          return Err(self.throw_type_error(&message));
        }
        for (i, element) in arr.elements.iter().enumerate() {
          let Some(element) = element else {
            continue;
          };
          let mut item = self.get_index(&value, i)?;
          if item.is_undefined() {
            if let Some(default) = &element.default {
              item = self.eval_expr(default)?;
            }
          }
          self.bind_pattern(&element.target, item, mode)?;
        }
        if let Some(rest) = &arr.rest {
          let start = arr.elements.len();
          let len = self.sequence_len(&value)?;
          let mut items = Vec::new();
          for i in start..len {
            items.push(self.get_index(&value, i)?);
          }
          let rest_value = self.alloc_array(items)?;
          self.bind_pattern(rest, rest_value, mode)?;
        }
        Ok(())
      }
      Pat::Obj(obj) => {
        if value.is_nullish() {
          let message = format!("Cannot destructure {}", self.display_value(&value));
          return Err(self.throw_type_error(&message));
        }
        for prop in &obj.properties {
          let mut item = self.get_property(&value, &prop.key)?;
          if item.is_undefined() {
            if let Some(default) = &prop.default {
              item = self.eval_expr(default)?;
            }
          }
          self.bind_pattern(&prop.target, item, mode)?;
        }
        Ok(())
      }
    }
  }

  fn sequence_len(&mut self, value: &Value) -> VmResult<usize> {
    Ok(match value {
      Value::Str(s) => s.encode_utf16().count(),
      Value::Object(id) => match &self.heap.obj(*id).kind {
        ObjKind::Array(elems) => elems.len(),
        _ => 0,
      },
      _ => 0,
    })
  }

  fn get_index(&mut self, value: &Value, index: usize) -> VmResult<Value> {
    match value {
      Value::Object(id) => match &self.heap.obj(*id).kind {
        ObjKind::Array(elems) => Ok(elems.get(index).cloned().unwrap_or(Value::Undefined)),
        _ => {
          let key = index.to_string();
          self.get_property(value, &key)
        }
      },
      Value::Str(s) => match crate::builtins::string_char_at(s, index) {
        Some(c) => Ok(Value::Str(self.new_str_from_string(c)?)),
        None => Ok(Value::Undefined),
      },
      _ => {
        let message = format!("{} is not iterable", self.display_value(value));
        Err(self.throw_type_error(&message))
      }
    }
  }

  fn get_var(&mut self, name: &str) -> VmResult<Value> {
    match self.lookup_var(name)? {
      Some(value) => Ok(value),
      None => {
        let message = format!("{name} is not defined");
        Err(self.throw_reference_error(&message))
      }
    }
  }

  fn lookup_var(&mut self, name: &str) -> VmResult<Option<Value>> {
    let Some(env) = self.envs.resolve(self.lexical_env, name) else {
      return Ok(None);
    };
    let binding = &self.envs.frame(env).bindings[name];
    if !binding.initialized {
      let message = format!("Cannot access '{name}' before initialization");
      return Err(self.throw_reference_error(&message));
    }
    Ok(Some(binding.value.clone()))
  }

  fn set_var(&mut self, name: &str, value: Value) -> VmResult<()> {
    let Some(env) = self.envs.resolve(self.lexical_env, name) else {
      let message = format!("{name} is not defined");
      return Err(self.throw_reference_error(&message));
    };
    let (initialized, mutable, kind) = {
      let binding = &self.envs.frame(env).bindings[name];
      (binding.initialized, binding.mutable(), binding.kind)
    };
    if !initialized {
      let message = format!("Cannot access '{name}' before initialization");
      return Err(self.throw_reference_error(&message));
    }
    if !mutable {
      return Err(self.throw_type_error("Assignment to constant variable."));
    }
    if let Some(binding) = self.envs.frame_mut(env).bindings.get_mut(name) {
      binding.value = value;
      binding.initialized = true;
      debug_assert!(binding.kind == kind);
    }
    Ok(())
  }

  // ---- Expressions ----

  pub(crate) fn eval_expr(&mut self, expr: &Node<Expr>) -> VmResult<Value> {
    // One tick per expression.
    self.tick()?;

    match &*expr.stx {
      Expr::LitNum(n) => Ok(Value::Number(n.value.0)),
      Expr::LitBool(b) => Ok(Value::Bool(b.value)),
      Expr::LitNull(_) => Ok(Value::Null),
      Expr::LitUndefined(_) => Ok(Value::Undefined),
      Expr::LitStr(s) => Ok(Value::Str(self.new_str_value(&s.value)?)),
      Expr::LitTemplate(t) => self.eval_template(t),
      Expr::LitArr(arr) => self.eval_arr_literal(arr),
      Expr::LitObj(obj) => self.eval_obj_literal(obj),
      Expr::Id(id) => self.get_var(&id.name),
      Expr::This(_) => Ok(self.envs.this_value(self.lexical_env)),
      Expr::Member(m) => {
        let base = self.eval_expr(&m.left)?;
        self.get_property(&base, &m.right)
      }
      Expr::ComputedMember(m) => {
        let base = self.eval_expr(&m.object)?;
        let key = self.eval_expr(&m.member)?;
        self.get_by_value(&base, &key)
      }
      Expr::Call(call) => self.eval_call(call),
      Expr::New(new) => {
        let callee = self.eval_expr(&new.callee)?;
        let args = self.eval_call_args(&new.arguments)?;
        self.call_value(callee, None, args, true)
      }
      Expr::Func(f) => self.instantiate_closure(f.func),
      Expr::ArrowFunc(f) => self.instantiate_closure(f.func),
      Expr::Cond(cond) => {
        let test = self.eval_expr(&cond.test)?;
        if ops::to_boolean(&test) {
          self.eval_expr(&cond.consequent)
        } else {
          self.eval_expr(&cond.alternate)
        }
      }
      Expr::Unary(u) => self.eval_unary(u),
      Expr::UnaryPostfix(u) => self.eval_unary_postfix(u),
      Expr::Binary(b) => self.eval_binary(b),
    }
  }

  fn eval_template(&mut self, t: &parse_js6::ast::expr::LitTemplateExpr) -> VmResult<Value> {
    let mut out = String::new();
    for part in &t.parts {
      match part {
        TemplatePart::Str(s) => out.push_str(s),
        TemplatePart::Expr(e) => {
          let value = self.eval_expr(e)?;
          let s = ops::to_str(self, &value)?;
          out.push_str(&s);
        }
      }
    }
    Ok(Value::Str(self.new_str_from_string(out)?))
  }

  fn eval_arr_literal(&mut self, arr: &parse_js6::ast::expr::LitArrExpr) -> VmResult<Value> {
    let mut elems = Vec::<Value>::new();
    for element in &arr.elements {
      match element {
        ArrElem::Empty => elems.push(Value::Undefined),
        ArrElem::Single(e) => {
          let value = self.eval_expr(e)?;
          elems.push(value);
        }
        ArrElem::Spread(e) => {
          let value = self.eval_expr(e)?;
          self.spread_into(&value, &mut elems)?;
        }
      }
    }
    self.alloc_array(elems)
  }

  fn spread_into(&mut self, value: &Value, out: &mut Vec<Value>) -> VmResult<()> {
    match value {
      Value::Object(id) => {
        let elems = match &self.heap.obj(*id).kind {
          ObjKind::Array(elems) => elems.clone(),
          _ => {
            let message = format!("{} is not iterable", self.display_value(value));
            return Err(self.throw_type_error(&message));
          }
        };
        out.extend(elems);
        Ok(())
      }
      Value::Str(s) => {
        let chars: Vec<String> = s.chars().map(|c| c.to_string()).collect();
        for c in chars {
          out.push(Value::Str(self.new_str_from_string(c)?));
        }
        Ok(())
      }
      other => {
        let message = format!("{} is not iterable", self.display_value(other));
        Err(self.throw_type_error(&message))
      }
    }
  }

  fn eval_obj_literal(&mut self, obj: &parse_js6::ast::expr::LitObjExpr) -> VmResult<Value> {
    let id = self.alloc(ObjKind::Ordinary)?;
    for member in &obj.members {
      let (key, value) = match &**member {
        ObjMember::Prop { key, value } => {
          let key = self.eval_prop_key(key)?;
          let value = self.eval_expr(value)?;
          (key, value)
        }
        ObjMember::Method { key, func } => {
          let key = self.eval_prop_key(key)?;
          let value = self.instantiate_closure(*func)?;
          (key, value)
        }
        ObjMember::Shorthand { name } => {
          let value = self.get_var(name)?;
          (self.new_str_value(name)?, value)
        }
      };
      self.heap.set_prop(id, key, value).map_err(Fault::limit)?;
    }
    Ok(Value::Object(id))
  }

  fn eval_prop_key(&mut self, key: &PropKey) -> VmResult<crate::value::JsStr> {
    match key {
      PropKey::Direct(name) => self.new_str_value(name),
      PropKey::Computed(expr) => {
        let value = self.eval_expr(expr)?;
        ops::to_str(self, &value)
      }
    }
  }

  pub(crate) fn instantiate_closure(&mut self, func: FuncId) -> VmResult<Value> {
    let func_name = self.script.top.funcs[func.0 as usize].name.clone();
    let name = match func_name {
      Some(n) => Some(self.new_str_value(&n)?),
      None => None,
    };
    let id = self.alloc(ObjKind::Function(Callable::Script {
      func,
      env: self.lexical_env,
      name,
    }))?;
    Ok(Value::Object(id))
  }

  fn eval_unary(&mut self, u: &parse_js6::ast::expr::UnaryExpr) -> VmResult<Value> {
    match u.operator {
      OperatorName::Typeof => {
        // `typeof` tolerates unresolved identifiers.
        if let Expr::Id(id) = &*u.argument.stx {
          match self.lookup_var(&id.name)? {
            Some(value) => return Ok(Value::str(ops::type_of(self, &value))),
            None => return Ok(Value::str("undefined")),
          }
        }
        let value = self.eval_expr(&u.argument)?;
        Ok(Value::str(ops::type_of(self, &value)))
      }
      OperatorName::Delete => match &*u.argument.stx {
        Expr::Member(m) => {
          let base = self.eval_expr(&m.left)?;
          let deleted = self.delete_property(&base, &m.right)?;
          Ok(Value::Bool(deleted))
        }
        Expr::ComputedMember(m) => {
          let base = self.eval_expr(&m.object)?;
          let key = self.eval_expr(&m.member)?;
          let key = ops::to_str(self, &key)?;
          let deleted = self.delete_property(&base, &key)?;
          Ok(Value::Bool(deleted))
        }
        _ => Err(self.make_error_fault(
          "SyntaxError",
          "Delete of an unqualified identifier in strict mode.",
        )),
      },
      OperatorName::LogicalNot => {
        let value = self.eval_expr(&u.argument)?;
        Ok(Value::Bool(!ops::to_boolean(&value)))
      }
      OperatorName::BitwiseNot => {
        let value = self.eval_expr(&u.argument)?;
        let n = ops::to_number(self, &value)?;
        Ok(Value::Number(!ops::to_int32(n) as f64))
      }
      OperatorName::UnaryPlus => {
        let value = self.eval_expr(&u.argument)?;
        Ok(Value::Number(ops::to_number(self, &value)?))
      }
      OperatorName::UnaryNegation => {
        let value = self.eval_expr(&u.argument)?;
        Ok(Value::Number(-ops::to_number(self, &value)?))
      }
      OperatorName::PrefixIncrement => {
        let (_, new) = self.step_target(&u.argument, 1.0)?;
        Ok(new)
      }
      OperatorName::PrefixDecrement => {
        let (_, new) = self.step_target(&u.argument, -1.0)?;
        Ok(new)
      }
      _ => {
        let message = format!("Unsupported unary operator {:?}", u.operator);
        Err(self.throw_type_error(&message))
      }
    }
  }

  fn eval_unary_postfix(&mut self, u: &parse_js6::ast::expr::UnaryPostfixExpr) -> VmResult<Value> {
    let delta = if u.operator == OperatorName::PostfixIncrement {
      1.0
    } else {
      -1.0
    };
    let (old, _) = self.step_target(&u.argument, delta)?;
    Ok(old)
  }

  /// `++`/`--`: reads the target once, writes `old + delta`, returns both.
  fn step_target(&mut self, target: &Node<Expr>, delta: f64) -> VmResult<(Value, Value)> {
    match &*target.stx {
      Expr::Id(id) => {
        let current = self.get_var(&id.name)?;
        let old = ops::to_number(self, &current)?;
        let new = Value::Number(old + delta);
        self.set_var(&id.name, new.clone())?;
        Ok((Value::Number(old), new))
      }
      Expr::Member(m) => {
        let base = self.eval_expr(&m.left)?;
        let current = self.get_property(&base, &m.right)?;
        let old = ops::to_number(self, &current)?;
        let new = Value::Number(old + delta);
        self.set_property(&base, &m.right, new.clone())?;
        Ok((Value::Number(old), new))
      }
      Expr::ComputedMember(m) => {
        let base = self.eval_expr(&m.object)?;
        let key = self.eval_expr(&m.member)?;
        let key = ops::to_str(self, &key)?;
        let current = self.get_property(&base, &key)?;
        let old = ops::to_number(self, &current)?;
        let new = Value::Number(old + delta);
        self.set_property(&base, &key, new.clone())?;
        Ok((Value::Number(old), new))
      }
      _ => Err(self.throw_type_error("Invalid increment/decrement target")),
    }
  }

  fn eval_binary(&mut self, b: &parse_js6::ast::expr::BinaryExpr) -> VmResult<Value> {
    match b.operator {
      OperatorName::Assignment => {
        let value = match &*b.left.stx {
          Expr::Id(id) => {
            let value = self.eval_expr(&b.right)?;
            self.set_var(&id.name, value.clone())?;
            value
          }
          Expr::Member(m) => {
            let base = self.eval_expr(&m.left)?;
            let value = self.eval_expr(&b.right)?;
            self.set_property(&base, &m.right, value.clone())?;
            value
          }
          Expr::ComputedMember(m) => {
            let base = self.eval_expr(&m.object)?;
            let key = self.eval_expr(&m.member)?;
            let value = self.eval_expr(&b.right)?;
            self.set_by_value(&base, &key, value.clone())?;
            value
          }
          _ => return Err(self.throw_type_error("Invalid assignment target")),
        };
        Ok(value)
      }
      OperatorName::LogicalAnd => {
        let left = self.eval_expr(&b.left)?;
        if !ops::to_boolean(&left) {
          return Ok(left);
        }
        self.eval_expr(&b.right)
      }
      OperatorName::LogicalOr => {
        let left = self.eval_expr(&b.left)?;
        if ops::to_boolean(&left) {
          return Ok(left);
        }
        self.eval_expr(&b.right)
      }
      OperatorName::Comma => {
        let _ = self.eval_expr(&b.left)?;
        self.eval_expr(&b.right)
      }
      operator => {
        if let Some(op) = assignment_operand_operator(operator) {
          return self.eval_compound_assignment(b, op);
        }
        let left = self.eval_expr(&b.left)?;
        let right = self.eval_expr(&b.right)?;
        self.apply_binary(operator, &left, &right)
      }
    }
  }

  fn eval_compound_assignment(
    &mut self,
    b: &parse_js6::ast::expr::BinaryExpr,
    op: OperatorName,
  ) -> VmResult<Value> {
    match &*b.left.stx {
      Expr::Id(id) => {
        let current = self.get_var(&id.name)?;
        let rhs = self.eval_expr(&b.right)?;
        let value = self.apply_binary(op, &current, &rhs)?;
        self.set_var(&id.name, value.clone())?;
        Ok(value)
      }
      Expr::Member(m) => {
        let base = self.eval_expr(&m.left)?;
        let current = self.get_property(&base, &m.right)?;
        let rhs = self.eval_expr(&b.right)?;
        let value = self.apply_binary(op, &current, &rhs)?;
        self.set_property(&base, &m.right, value.clone())?;
        Ok(value)
      }
      Expr::ComputedMember(m) => {
        let base = self.eval_expr(&m.object)?;
        let key = self.eval_expr(&m.member)?;
        let key = ops::to_str(self, &key)?;
        let current = self.get_property(&base, &key)?;
        let rhs = self.eval_expr(&b.right)?;
        let value = self.apply_binary(op, &current, &rhs)?;
        self.set_property(&base, &key, value.clone())?;
        Ok(value)
      }
      _ => Err(self.throw_type_error("Invalid assignment target")),
    }
  }

  fn apply_binary(&mut self, op: OperatorName, a: &Value, b: &Value) -> VmResult<Value> {
    use OperatorName::*;
    Ok(match op {
      Addition => ops::add_values(self, a, b)?,
      Subtraction => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number(x - y)
      }
      Multiplication => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number(x * y)
      }
      Division => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number(x / y)
      }
      Remainder => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number(x % y)
      }
      Equality => Value::Bool(ops::abstract_equality(self, a, b)?),
      Inequality => Value::Bool(!ops::abstract_equality(self, a, b)?),
      StrictEquality => Value::Bool(ops::strict_equals(a, b)),
      StrictInequality => Value::Bool(!ops::strict_equals(a, b)),
      LessThan => Value::Bool(ops::less_than(self, a, b)?.unwrap_or(false)),
      GreaterThan => Value::Bool(ops::less_than(self, b, a)?.unwrap_or(false)),
      LessThanOrEqual => Value::Bool(matches!(ops::less_than(self, b, a)?, Some(false))),
      GreaterThanOrEqual => Value::Bool(matches!(ops::less_than(self, a, b)?, Some(false))),
      BitwiseAnd => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number((ops::to_int32(x) & ops::to_int32(y)) as f64)
      }
      BitwiseOr => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number((ops::to_int32(x) | ops::to_int32(y)) as f64)
      }
      BitwiseXor => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number((ops::to_int32(x) ^ ops::to_int32(y)) as f64)
      }
      BitwiseLeftShift => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number((ops::to_int32(x) << (ops::to_uint32(y) & 31)) as f64)
      }
      BitwiseRightShift => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number((ops::to_int32(x) >> (ops::to_uint32(y) & 31)) as f64)
      }
      BitwiseUnsignedRightShift => {
        let (x, y) = self.numeric_operands(a, b)?;
        Value::Number((ops::to_uint32(x) >> (ops::to_uint32(y) & 31)) as f64)
      }
      In => {
        let key = ops::to_str(self, a)?;
        Value::Bool(self.has_property(b, &key)?)
      }
      other => {
        let message = format!("Unsupported binary operator {other:?}");
        return Err(self.throw_type_error(&message));
      }
    })
  }

  fn numeric_operands(&mut self, a: &Value, b: &Value) -> VmResult<(f64, f64)> {
    let x = ops::to_number(self, a)?;
    let y = ops::to_number(self, b)?;
    Ok((x, y))
  }

  // ---- Calls ----

  fn eval_call(&mut self, call: &parse_js6::ast::expr::CallExpr) -> VmResult<Value> {
    match &*call.callee.stx {
      // Method call: resolve through the receiver so `this` binds and builtin
      // methods dispatch without materializing a function object.
      Expr::Member(m) => {
        let base = self.eval_expr(&m.left)?;
        let args = self.eval_call_args(&call.arguments)?;
        self.call_method(base, &m.right, args)
      }
      Expr::ComputedMember(m) => {
        let base = self.eval_expr(&m.object)?;
        let key = self.eval_expr(&m.member)?;
        let key = ops::to_str(self, &key)?;
        let args = self.eval_call_args(&call.arguments)?;
        self.call_method(base, &key, args)
      }
      _ => {
        let callee = self.eval_expr(&call.callee)?;
        let args = self.eval_call_args(&call.arguments)?;
        self.call_value(callee, None, args, false)
      }
    }
  }

  fn eval_call_args(&mut self, arguments: &[CallArg]) -> VmResult<Vec<Value>> {
    let mut args = Vec::with_capacity(arguments.len());
    for arg in arguments {
      let value = self.eval_expr(&arg.value)?;
      if arg.spread {
        self.spread_into(&value, &mut args)?;
      } else {
        args.push(value);
      }
    }
    Ok(args)
  }

  pub(crate) fn call_method(
    &mut self,
    base: Value,
    name: &str,
    args: Vec<Value>,
  ) -> VmResult<Value> {
    match &base {
      Value::Undefined | Value::Null => Err(self.nullish_property_fault(&base)),
      Value::Str(_) => match crate::builtins::string_method_fn(name) {
        Some(f) => self.enter_call(|ctx| f(ctx, base.clone(), &args)),
        None => self.not_a_function(name),
      },
      Value::Number(_) | Value::Bool(_) => {
        match crate::builtins::primitive_method_fn(&base, name) {
          Some(f) => self.enter_call(|ctx| f(ctx, base.clone(), &args)),
          None => self.not_a_function(name),
        }
      }
      Value::Object(id) => {
        let id = *id;
        // Dynamic objects resolve the method through the host first.
        if let ObjKind::Dynamic(resolver) = &self.heap.obj(id).kind {
          let resolver = resolver.clone();
          let got = resolver.get(self, name);
          let value = self.host_outcome(got)?;
          return match value {
            Some(callee) => self.call_value(callee, Some(base), args, false),
            None => self.not_a_function(name),
          };
        }

        if let Some(value) = self.heap.obj(id).props.get(name) {
          let callee = value.clone();
          return self.call_value(callee, Some(base), args, false);
        }

        // Calling a function stored in an array slot (`handlers[0]()`).
        if let ObjKind::Array(elems) = &self.heap.obj(id).kind {
          if let Some(index) = crate::heap::array_index_key(name) {
            let callee = elems.get(index as usize).cloned().unwrap_or(Value::Undefined);
            return self.call_value(callee, Some(base), args, false);
          }
        }

        enum MethodSlot {
          Native(crate::func::NativeFn),
          Host(crate::host::HostMethod),
          Missing,
        }
        let slot = match &self.heap.obj(id).kind {
          ObjKind::Array(_) => match crate::builtins::array_method_fn(name) {
            Some(f) => MethodSlot::Native(f),
            None => MethodSlot::Missing,
          },
          ObjKind::Date(_) => match crate::date::date_method_fn(name) {
            Some(f) => MethodSlot::Native(f),
            None => MethodSlot::Missing,
          },
          ObjKind::Host(data) => match data.method(name) {
            Some(method) => MethodSlot::Host(method.clone()),
            None => MethodSlot::Missing,
          },
          _ => MethodSlot::Missing,
        };

        match slot {
          MethodSlot::Native(f) => self.enter_call(|ctx| f(ctx, base.clone(), &args)),
          MethodSlot::Host(method) => self.enter_call(|ctx| {
            let outcome = method.invoke(ctx, &args);
            ctx.host_outcome(outcome)
          }),
          MethodSlot::Missing => self.not_a_function(name),
        }
      }
    }
  }

  fn not_a_function(&mut self, name: &str) -> VmResult<Value> {
    let message = format!("{name} is not a function");
    Err(self.throw_type_error(&message))
  }

  /// Calls a function value. `construct` implements `new`.
  pub(crate) fn call_value(
    &mut self,
    callee: Value,
    this: Option<Value>,
    args: Vec<Value>,
    construct: bool,
  ) -> VmResult<Value> {
    let callable = match &callee {
      Value::Object(id) => match &self.heap.obj(*id).kind {
        ObjKind::Function(callable) => callable.clone(),
        _ => {
          let message = format!("{} is not a function", self.display_value(&callee));
          return Err(self.throw_type_error(&message));
        }
      },
      _ => {
        let message = format!("{} is not a function", self.display_value(&callee));
        return Err(self.throw_type_error(&message));
      }
    };

    self.enter_call(|ctx| match &callable {
      Callable::Script { func, env, .. } => {
        ctx.invoke_script_function(*func, *env, this.clone(), &args, construct)
      }
      Callable::Native { f, .. } => f(ctx, this.clone().unwrap_or(Value::Undefined), &args),
      Callable::BoundNative { recv, f, .. } => f(ctx, recv.clone(), &args),
      Callable::Host { method, .. } => {
        let outcome = method.invoke(ctx, &args);
        ctx.host_outcome(outcome)
      }
    })
  }

  /// Shared call bookkeeping: a tick, the depth cap, and re-arming the
  /// pending stack frame when a fault crosses back over this boundary.
  fn enter_call<R>(&mut self, f: impl FnOnce(&mut Self) -> VmResult<R>) -> VmResult<R> {
    self.tick()?;
    if self.call_depth >= self.max_call_depth {
      return Err(Fault::limit(LimitKind::CallDepth));
    }
    self.call_depth += 1;
    let result = f(self);
    self.call_depth -= 1;
    result.map_err(|mut fault| {
      fault.pending_frame = true;
      fault
    })
  }

  fn invoke_script_function(
    &mut self,
    func_id: FuncId,
    captured_env: EnvId,
    this: Option<Value>,
    args: &[Value],
    construct: bool,
  ) -> VmResult<Value> {
    let script = self.script.clone();
    let func = &script.top.funcs[func_id.0 as usize];

    let env = self.new_env(Some(captured_env))?;
    let mut construct_this: Option<Value> = None;
    if func.arrow {
      if construct {
        return Err(self.throw_type_error("Arrow functions are not constructors"));
      }
    } else {
      let this_value = if construct {
        let obj = Value::Object(self.alloc(ObjKind::Ordinary)?);
        construct_this = Some(obj.clone());
        obj
      } else {
        this.unwrap_or(Value::Undefined)
      };
      self.envs.frame_mut(env).this_value = Some(this_value);
    }

    let outer = self.lexical_env;
    self.lexical_env = env;
    let result = self.run_function_body(func, env, args);
    self.lexical_env = outer;
    let value = result?;

    if construct {
      // A constructor returning an object overrides the fresh instance.
      if matches!(value, Value::Object(_)) {
        return Ok(value);
      }
      return Ok(construct_this.unwrap_or(Value::Undefined));
    }
    Ok(value)
  }

  fn run_function_body(&mut self, func: &Func, env: EnvId, args: &[Value]) -> VmResult<Value> {
    if !func.arrow && func.uses_arguments {
      let arr = self.alloc_array(args.to_vec())?;
      self.declare_binding(env, "arguments", BindingKind::Param, arr, true)?;
    }

    for (i, param) in func.params.iter().enumerate() {
      if param.rest {
        let rest: Vec<Value> = args.get(i..).unwrap_or(&[]).to_vec();
        let rest_value = self.alloc_array(rest)?;
        self.bind_pattern(&param.pat, rest_value, BindMode::Declare {
          env,
          kind: BindingKind::Param,
        })?;
        break;
      }
      let mut value = args.get(i).cloned().unwrap_or(Value::Undefined);
      if value.is_undefined() {
        if let Some(default) = &param.default {
          value = self.eval_expr(default)?;
        }
      }
      self.bind_pattern(&param.pat, value, BindMode::Declare {
        env,
        kind: BindingKind::Param,
      })?;
    }

    match &func.body {
      FuncBody::Expr(expr) => self.eval_expr(expr),
      FuncBody::Block(stmts) => {
        self.hoist_var_decls(env, stmts)?;
        self.hoist_lexical_decls(env, stmts)?;
        match self.eval_stmt_list(stmts)? {
          Completion::Return(value) => Ok(value),
          Completion::Normal(_) => Ok(Value::Undefined),
          Completion::Break(..) => {
            Err(self.make_error_fault("SyntaxError", "Illegal break statement"))
          }
          Completion::Continue(..) => {
            Err(self.make_error_fault("SyntaxError", "Illegal continue statement"))
          }
        }
      }
    }
  }

  fn get_by_value(&mut self, base: &Value, key: &Value) -> VmResult<Value> {
    // Fast path: an in-range element index into arrays and strings, no key
    // string built. Out-of-range integers (`arr[1e20]`) are string keys.
    if let Value::Number(n) = key {
      if let Some(index) = crate::heap::array_index_from_f64(*n) {
        match base {
          Value::Object(id) => {
            if let ObjKind::Array(elems) = &self.heap.obj(*id).kind {
              return Ok(elems.get(index).cloned().unwrap_or(Value::Undefined));
            }
          }
          Value::Str(s) => {
            return match crate::builtins::string_char_at(s, index) {
              Some(c) => Ok(Value::Str(self.new_str_from_string(c)?)),
              None => Ok(Value::Undefined),
            };
          }
          _ => {}
        }
      }
    }
    if base.is_nullish() {
      return Err(self.nullish_property_fault(base));
    }
    let key = ops::to_str(self, key)?;
    self.get_property(base, &key)
  }

  fn set_by_value(&mut self, base: &Value, key: &Value, value: Value) -> VmResult<()> {
    if let (Value::Number(n), Value::Object(id)) = (key, base) {
      if matches!(self.heap.obj(*id).kind, ObjKind::Array(_)) {
        if let Some(index) = crate::heap::array_index_from_f64(*n) {
          return self.array_set_index(*id, index, value);
        }
      }
    }
    if base.is_nullish() {
      return Err(self.nullish_property_fault(base));
    }
    let key = ops::to_str(self, key)?;
    self.set_property(base, &key, value)
  }
}

enum IterationOutcome {
  Continue,
  Break,
  Abrupt(Completion),
}

fn block_needs_env(stmts: &[Node<Stmt>]) -> bool {
  stmts.iter().any(|stmt| {
    matches!(
      &*stmt.stx,
      Stmt::FunctionDecl(_)
    ) || matches!(&*stmt.stx, Stmt::VarDecl(decl) if decl.mode != VarDeclMode::Var)
  })
}

fn collect_var_names(stmt: &Stmt, out: &mut Vec<String>) {
  match stmt {
    Stmt::VarDecl(decl) => {
      if decl.mode != VarDeclMode::Var {
        return;
      }
      for declarator in &decl.declarators {
        collect_pat_names(&declarator.pattern.stx, out);
      }
    }
    Stmt::Block(block) => {
      for stmt in &block.body {
        collect_var_names(&stmt.stx, out);
      }
    }
    Stmt::If(stmt) => {
      collect_var_names(&stmt.consequent.stx, out);
      if let Some(alternate) = &stmt.alternate {
        collect_var_names(&alternate.stx, out);
      }
    }
    Stmt::Try(stmt) => {
      for s in &stmt.wrapped {
        collect_var_names(&s.stx, out);
      }
      if let Some(catch) = &stmt.catch {
        for s in &catch.body {
          collect_var_names(&s.stx, out);
        }
      }
      if let Some(finally) = &stmt.finally {
        for s in finally {
          collect_var_names(&s.stx, out);
        }
      }
    }
    Stmt::While(stmt) => collect_var_names(&stmt.body.stx, out),
    Stmt::DoWhile(stmt) => collect_var_names(&stmt.body.stx, out),
    Stmt::ForTriple(stmt) => {
      if let ForTripleInit::Decl(decl) = &stmt.init {
        if decl.stx.mode == VarDeclMode::Var {
          for declarator in &decl.stx.declarators {
            collect_pat_names(&declarator.pattern.stx, out);
          }
        }
      }
      collect_var_names(&stmt.body.stx, out);
    }
    Stmt::ForInOf(stmt) => {
      if stmt.decl_mode == Some(VarDeclMode::Var) {
        collect_pat_names(&stmt.pat.stx, out);
      }
      collect_var_names(&stmt.body.stx, out);
    }
    Stmt::Label(stmt) => collect_var_names(&stmt.statement.stx, out),
    Stmt::Switch(stmt) => {
      for branch in &stmt.branches {
        for s in &branch.body {
          collect_var_names(&s.stx, out);
        }
      }
    }
    // Nested function declarations keep their `var` bindings to themselves.
    Stmt::FunctionDecl(_) => {}
    _ => {}
  }
}

fn collect_pat_names(pat: &Pat, out: &mut Vec<String>) {
  match pat {
    Pat::Id(id) => out.push(id.name.clone()),
    Pat::Arr(arr) => {
      for element in arr.elements.iter().flatten() {
        collect_pat_names(&element.target.stx, out);
      }
      if let Some(rest) = &arr.rest {
        collect_pat_names(&rest.stx, out);
      }
    }
    Pat::Obj(obj) => {
      for prop in &obj.properties {
        collect_pat_names(&prop.target.stx, out);
      }
    }
  }
}
