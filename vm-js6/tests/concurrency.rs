use std::thread;
use vm_js6::parse;
use vm_js6::EvalOpts;
use vm_js6::JsValue;

#[test]
fn one_parsed_script_runs_on_many_threads() {
  let script = parse(
    "let total = 0;\n\
     for (let i = 0; i < 100; i++) { total += i; }\n\
     total",
  )
  .unwrap();

  let mut handles = Vec::new();
  for _ in 0..8 {
    let script = script.clone();
    handles.push(thread::spawn(move || script.eval().unwrap()));
  }
  for handle in handles {
    assert_eq!(handle.join().unwrap(), JsValue::Int(4950));
  }

  // The shared AST observed no per-execution mutation: a subsequent run on
  // this thread matches the parallel ones.
  assert_eq!(script.eval().unwrap(), JsValue::Int(4950));
}

#[test]
fn parallel_executions_do_not_share_state() {
  let script = parse("let xs = []; xs.push(1); xs.length").unwrap();
  let mut handles = Vec::new();
  for _ in 0..8 {
    let script = script.clone();
    handles.push(thread::spawn(move || {
      for _ in 0..50 {
        assert_eq!(script.eval().unwrap(), JsValue::Int(1));
      }
    }));
  }
  for handle in handles {
    handle.join().unwrap();
  }
}

#[test]
fn identical_globals_give_identical_results_and_stats() {
  let script = parse("A * B").unwrap();
  let opts = || EvalOpts {
    custom_globals: vec![
      ("A".to_string(), JsValue::Int(6)),
      ("B".to_string(), JsValue::Int(7)),
    ],
    ..EvalOpts::default()
  };
  let first = script.eval_with_details(opts()).unwrap();
  let second = script.eval_with_details(opts()).unwrap();
  assert_eq!(first.value, JsValue::Int(42));
  assert_eq!(second.value, JsValue::Int(42));
  assert_eq!(first.stats, second.stats);
}
