use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vm_js6::eval_with;
use vm_js6::parse;
use vm_js6::EvalErrorKind;
use vm_js6::EvalOpts;
use vm_js6::JsValue;
use vm_js6::LimitKind;

fn opts() -> EvalOpts {
  EvalOpts::default()
}

#[test]
fn busy_loop_hits_a_limit_under_default_budgets() {
  let err = eval_with("while (true) { }", opts()).unwrap_err();
  assert!(err.is_limit());
  // Whichever budget fires first, the message is one of the fixed literals.
  assert!(
    err.message == "Reached the execution limit!" || err.message == "Reached the timeout!",
    "unexpected message: {}",
    err.message
  );
}

#[test]
fn ops_budget_produces_execution_limit_message() {
  let err = eval_with("while (true) { }", EvalOpts {
    max_ops: 10_000,
    ..opts()
  })
  .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Ops));
  assert_eq!(err.message, "Reached the execution limit!");
}

#[test]
fn ops_budget_bounds_total_work() {
  let script = parse("let i = 0; while (true) { i = i + 1; }").unwrap();
  let err = script
    .eval_with(EvalOpts {
      max_ops: 5_000,
      ..opts()
    })
    .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Ops));
}

#[test]
fn string_flood_hits_the_memory_limit() {
  let err = eval_with("'x'.repeat(100000000)", opts()).unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Memory));
  assert_eq!(err.message, "Reached the memory limit!");
}

#[test]
fn allocation_loop_hits_the_memory_limit() {
  // Intermediate strings become unreachable, but the accountant never credits
  // back, so the loop still trips the budget.
  let err = eval_with(
    "let s = 'xxxxxxxxxxxxxxxx'; while (true) { let t = s + s; }",
    EvalOpts {
      max_mem_bytes: 1 << 16,
      ..opts()
    },
  )
  .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Memory));
}

#[test]
fn deep_recursion_hits_the_call_stack_limit() {
  let err = eval_with("function f() { return f(); } f()", opts()).unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::CallDepth));
  assert_eq!(err.message, "Reached the call stack limit!");
}

#[test]
fn call_depth_cap_is_configurable() {
  let source = "function f(n) { return n === 0 ? 0 : f(n - 1); } f(50)";
  let shallow = eval_with(source, EvalOpts {
    max_call_depth: 10,
    ..opts()
  })
  .unwrap_err();
  assert_eq!(shallow.kind, EvalErrorKind::Limit(LimitKind::CallDepth));

  let deep = eval_with(source, EvalOpts {
    max_call_depth: 300,
    ..opts()
  })
  .unwrap();
  assert_eq!(deep, JsValue::Int(0));
}

#[test]
fn deadline_produces_timeout_message() {
  let err = eval_with("while (true) { }", EvalOpts {
    max_ops: u64::MAX,
    timeout: Duration::from_millis(50),
    ..opts()
  })
  .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Timeout));
  assert_eq!(err.message, "Reached the timeout!");
}

#[test]
fn interrupt_flag_cancels_from_another_thread() {
  let flag = Arc::new(AtomicBool::new(false));
  let setter = {
    let flag = flag.clone();
    thread::spawn(move || {
      thread::sleep(Duration::from_millis(50));
      flag.store(true, Ordering::Relaxed);
    })
  };

  let err = eval_with("while (true) { }", EvalOpts {
    max_ops: u64::MAX,
    timeout: Duration::from_secs(60),
    interrupt_flag: Some(flag),
    ..opts()
  })
  .unwrap_err();
  setter.join().unwrap();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Timeout));
}

#[test]
fn ops_exhaustion_wins_over_an_expired_deadline() {
  // Both budgets are exhausted on the same tick; the op counter is checked
  // first.
  let err = eval_with("while (true) { }", EvalOpts {
    max_ops: 0,
    timeout: Duration::from_millis(0),
    check_time_every: 1,
    ..opts()
  })
  .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Ops));
}

#[test]
fn limits_include_the_script_stack() {
  let err = eval_with(
    "function burn() { while (true) { } }\nburn()",
    EvalOpts {
      max_ops: 10_000,
      ..opts()
    },
  )
  .unwrap_err();
  assert_eq!(err.kind, EvalErrorKind::Limit(LimitKind::Ops));
  assert_eq!(err.stack.len(), 2);
  assert_eq!(err.stack[1].call_site, "burn()");
}

#[test]
fn stats_report_final_counters() {
  let script = parse("let total = 0; for (let i = 0; i < 10; i++) { total += i; } total").unwrap();
  let evaluation = script.eval_with_details(opts()).unwrap();
  assert_eq!(evaluation.value, JsValue::Int(45));
  assert!(evaluation.stats.ops > 50);
  assert!(evaluation.stats.mem_bytes > 0);
}
