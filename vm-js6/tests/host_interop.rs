use std::cell::RefCell;
use std::rc::Rc;
use vm_js6::eval_with;
use vm_js6::EvalCtx;
use vm_js6::EvalOpts;
use vm_js6::HostError;
use vm_js6::HostObjectDef;
use vm_js6::JsValue;
use vm_js6::PropResolver;
use vm_js6::Value;

fn opts() -> EvalOpts {
  EvalOpts::default()
}

#[test]
fn host_object_constants_are_visible() {
  let def = HostObjectDef::new("config")
    .constant("retries", JsValue::Int(3))
    .constant("name", JsValue::Str("primary".to_string()));
  let opts = EvalOpts {
    custom_definitions: vec![def],
    ..opts()
  };
  assert_eq!(
    eval_with("config.retries + ':' + config.name", opts).unwrap(),
    JsValue::Str("3:primary".to_string())
  );
}

#[test]
fn fixed_arity_methods_receive_padded_arguments() {
  let def = HostObjectDef::new("calc")
    .method0("zero", |_ctx| Ok(Value::Number(0.0)))
    .method2("add", |ctx: &mut EvalCtx, a, b| {
      let a = ctx.as_f64(&a)?;
      let b = ctx.as_f64(&b)?;
      Ok(Value::Number(a + b))
    })
    .method2("describe", |ctx: &mut EvalCtx, a, b| {
      // Missing arguments surface as `undefined`.
      let a = ctx.as_str(&a)?;
      let b = ctx.as_str(&b)?;
      ctx.str_value(&format!("{a}/{b}"))
    });
  let opts = EvalOpts {
    custom_definitions: vec![def],
    ..opts()
  };
  assert_eq!(
    eval_with("calc.zero() + calc.add(2, 3)", opts.clone()).unwrap(),
    JsValue::Int(5)
  );
  // Extra arguments are dropped; missing ones become undefined.
  assert_eq!(
    eval_with("calc.describe('only')", opts.clone()).unwrap(),
    JsValue::Str("only/undefined".to_string())
  );
  assert_eq!(
    eval_with("calc.add(1, 2, 99)", opts).unwrap(),
    JsValue::Int(3)
  );
}

#[test]
fn varargs_methods_receive_every_argument() {
  let def = HostObjectDef::new("agg").varargs("sum", |ctx: &mut EvalCtx, args| {
    let mut total = 0.0;
    for arg in args {
      total += ctx.as_f64(arg)?;
    }
    Ok(Value::Number(total))
  });
  let opts = EvalOpts {
    custom_definitions: vec![def],
    ..opts()
  };
  assert_eq!(
    eval_with("agg.sum(1, 2, 3, 4, 5)", opts.clone()).unwrap(),
    JsValue::Int(15)
  );
  assert_eq!(eval_with("agg.sum()", opts).unwrap(), JsValue::Int(0));
}

#[test]
fn host_errors_are_catchable_script_errors() {
  let def = HostObjectDef::new("io").method0("fail", |_ctx| {
    Err(HostError::new("backend unavailable"))
  });
  let opts = EvalOpts {
    custom_definitions: vec![def],
    ..opts()
  };
  assert_eq!(
    eval_with(
      "try { io.fail(); } catch (e) { e.message }",
      opts.clone()
    )
    .unwrap(),
    JsValue::Str("backend unavailable".to_string())
  );

  let err = eval_with("io.fail()", opts).unwrap_err();
  assert_eq!(err.message, "backend unavailable");
}

#[test]
fn methods_marshal_structured_results() {
  let def = HostObjectDef::new("db").method1("lookup", |ctx: &mut EvalCtx, key| {
    let key = ctx.as_str(&key)?;
    ctx.make(&JsValue::Object(vec![
      ("key".to_string(), JsValue::Str(key)),
      ("hits".to_string(), JsValue::Int(2)),
      (
        "tags".to_string(),
        JsValue::Array(vec![JsValue::Str("a".to_string()), JsValue::Str("b".to_string())]),
      ),
    ]))
  });
  let opts = EvalOpts {
    custom_definitions: vec![def],
    ..opts()
  };
  assert_eq!(
    eval_with(
      "let row = db.lookup('users'); row.key + ':' + row.hits + ':' + row.tags.join('+')",
      opts
    )
    .unwrap(),
    JsValue::Str("users:2:a+b".to_string())
  );
}

/// Resolver backed by a host-side map, logging every dispatch.
struct MapResolver {
  entries: RefCell<Vec<(String, JsValue)>>,
  log: RefCell<Vec<String>>,
}

impl MapResolver {
  fn new(entries: Vec<(&str, JsValue)>) -> Rc<MapResolver> {
    Rc::new(MapResolver {
      entries: RefCell::new(
        entries
          .into_iter()
          .map(|(k, v)| (k.to_string(), v))
          .collect(),
      ),
      log: RefCell::new(Vec::new()),
    })
  }
}

impl PropResolver for MapResolver {
  fn get(&self, ctx: &mut EvalCtx, name: &str) -> Result<Option<Value>, HostError> {
    self.log.borrow_mut().push(format!("get:{name}"));
    let entries = self.entries.borrow();
    match entries.iter().find(|(k, _)| k == name) {
      Some((_, value)) => {
        let value = value.clone();
        drop(entries);
        Ok(Some(ctx.make(&value)?))
      }
      None => Ok(None),
    }
  }

  fn set(&self, ctx: &mut EvalCtx, name: &str, value: Value) -> Result<bool, HostError> {
    self.log.borrow_mut().push(format!("set:{name}"));
    let value = ctx.take(&value);
    let mut entries = self.entries.borrow_mut();
    match entries.iter_mut().find(|(k, _)| k == name) {
      Some((_, slot)) => *slot = value,
      None => entries.push((name.to_string(), value)),
    }
    Ok(true)
  }

  fn delete(&self, _ctx: &mut EvalCtx, name: &str) -> Result<bool, HostError> {
    self.log.borrow_mut().push(format!("delete:{name}"));
    let mut entries = self.entries.borrow_mut();
    let before = entries.len();
    entries.retain(|(k, _)| k != name);
    Ok(entries.len() != before)
  }

  fn enumerate(&self, ctx: &mut EvalCtx) -> Result<Vec<(String, Value)>, HostError> {
    self.log.borrow_mut().push("enumerate".to_string());
    let entries = self.entries.borrow().clone();
    let mut out = Vec::with_capacity(entries.len());
    for (key, value) in entries {
      out.push((key, ctx.make(&value)?));
    }
    Ok(out)
  }
}

#[test]
fn dynamic_object_dispatches_through_the_resolver() {
  let resolver = MapResolver::new(vec![
    ("firstName", JsValue::Str("John".to_string())),
    ("lastName", JsValue::Str("Doe".to_string())),
  ]);
  let opts = EvalOpts {
    dynamic_objects: vec![("env".to_string(), resolver.clone())],
    ..opts()
  };

  let result = eval_with(
    "const f = env.firstName.toUpperCase();\n\
     const l = env.lastName.toUpperCase();\n\
     env.fullName = f + ' ' + l;\n\
     Object.keys(env);",
    opts,
  )
  .unwrap();

  assert_eq!(
    result,
    JsValue::Array(vec![
      JsValue::Str("firstName".to_string()),
      JsValue::Str("lastName".to_string()),
      JsValue::Str("fullName".to_string()),
    ])
  );

  let log = resolver.log.borrow();
  assert!(log.contains(&"get:firstName".to_string()));
  assert!(log.contains(&"get:lastName".to_string()));
  assert!(log.contains(&"set:fullName".to_string()));
  assert!(log.contains(&"enumerate".to_string()));

  let full_name = resolver
    .entries
    .borrow()
    .iter()
    .find(|(k, _)| k == "fullName")
    .map(|(_, v)| v.clone());
  assert_eq!(full_name, Some(JsValue::Str("JOHN DOE".to_string())));
}

#[test]
fn dynamic_object_supports_delete_and_in() {
  let resolver = MapResolver::new(vec![("a", JsValue::Int(1)), ("b", JsValue::Int(2))]);
  let opts = EvalOpts {
    dynamic_objects: vec![("env".to_string(), resolver.clone())],
    ..opts()
  };
  assert_eq!(
    eval_with(
      "let had = 'a' in env; delete env.a; had + ':' + ('a' in env)",
      opts
    )
    .unwrap(),
    JsValue::Str("true:false".to_string())
  );
  assert!(resolver.log.borrow().contains(&"delete:a".to_string()));
}

#[test]
fn for_in_over_dynamic_object_uses_enumerate() {
  let resolver = MapResolver::new(vec![("x", JsValue::Int(1)), ("y", JsValue::Int(2))]);
  let opts = EvalOpts {
    dynamic_objects: vec![("env".to_string(), resolver.clone())],
    ..opts()
  };
  assert_eq!(
    eval_with(
      "let keys = []; for (const k in env) { keys.push(k); } keys.join(',')",
      opts
    )
    .unwrap(),
    JsValue::Str("x,y".to_string())
  );
}
